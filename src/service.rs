//! Service lifecycle registry.
//!
//! Agent subsystems implement [`BootService`] and register with a
//! [`ServiceRegistry`], which drives the boot protocol phase by phase:
//! every service's `prepare`, then every `start`, then every `after_start`.
//! A failure in any phase aborts the boot and surfaces to the process
//! starter; shutdown runs in reverse registration order and never aborts.
//!
//! Cross-service collaboration goes through an explicit [`AgentContext`]
//! passed into every phase instead of a process-global locator.

use crate::channel::ChannelManager;
use crate::config::ReporterConfig;
use crate::registration::RegistrationGate;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info};

/// Registry lookup and registration errors.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServiceError {
    #[error("service not found: {name}")]
    NotFound { name: String },

    #[error("service already registered: {name}")]
    Duplicate { name: String },
}

/// Shared collaborators available to every service during boot.
pub struct AgentContext {
    config: ReporterConfig,
    gate: Arc<RegistrationGate>,
    channel: Arc<ChannelManager>,
}

impl AgentContext {
    /// Builds the context from a validated configuration.
    pub fn new(config: ReporterConfig) -> Self {
        let channel = Arc::new(ChannelManager::new(config.collector.clone()));
        Self {
            config,
            gate: Arc::new(RegistrationGate::new()),
            channel,
        }
    }

    pub fn config(&self) -> &ReporterConfig {
        &self.config
    }

    pub fn gate(&self) -> Arc<RegistrationGate> {
        Arc::clone(&self.gate)
    }

    pub fn channel(&self) -> Arc<ChannelManager> {
        Arc::clone(&self.channel)
    }
}

/// A bootable agent subsystem.
///
/// Phases run in order across all registered services: `prepare`, `start`,
/// `after_start`. Phase errors at boot are fatal; `shutdown` errors are
/// logged and swallowed.
#[async_trait]
pub trait BootService: Send + Sync {
    /// Stable name used for lookup and logging.
    fn name(&self) -> &'static str;

    /// Wiring phase: resolve collaborators, allocate buffers. No work runs.
    async fn prepare(&mut self, _ctx: &AgentContext) -> Result<()> {
        Ok(())
    }

    /// Starts the service's workers.
    async fn start(&mut self, ctx: &AgentContext) -> Result<()>;

    /// Runs after every service has started.
    async fn after_start(&mut self, _ctx: &AgentContext) -> Result<()> {
        Ok(())
    }

    /// Cancels the service's workers. Unsent buffered data is dropped.
    async fn shutdown(&mut self) -> Result<()>;
}

/// Holds all registered services and drives their lifecycle.
pub struct ServiceRegistry {
    services: Vec<Box<dyn BootService>>,
}

impl ServiceRegistry {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
        }
    }

    /// Registers a service. Names must be unique.
    pub fn register(&mut self, service: Box<dyn BootService>) -> Result<(), ServiceError> {
        let name = service.name();
        if self.services.iter().any(|s| s.name() == name) {
            return Err(ServiceError::Duplicate {
                name: name.to_owned(),
            });
        }
        info!(service = name, "registering service");
        self.services.push(service);
        Ok(())
    }

    /// Looks a registered service up by name.
    pub fn find(&self, name: &str) -> Result<&dyn BootService, ServiceError> {
        self.services
            .iter()
            .find(|s| s.name() == name)
            .map(|s| &**s)
            .ok_or_else(|| ServiceError::NotFound {
                name: name.to_owned(),
            })
    }

    /// Number of registered services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Runs the boot protocol across all services.
    ///
    /// # Errors
    ///
    /// The first failing phase aborts the sequence; boot failures are fatal
    /// to process startup and are not retried.
    pub async fn boot_all(&mut self, ctx: &AgentContext) -> Result<()> {
        for service in &mut self.services {
            service
                .prepare(ctx)
                .await
                .with_context(|| format!("service '{}' failed to prepare", service.name()))?;
        }

        for service in &mut self.services {
            service
                .start(ctx)
                .await
                .with_context(|| format!("service '{}' failed to start", service.name()))?;
        }

        for service in &mut self.services {
            service
                .after_start(ctx)
                .await
                .with_context(|| format!("service '{}' failed after start", service.name()))?;
        }

        info!(services = self.services.len(), "all services booted");
        Ok(())
    }

    /// Shuts every service down in reverse registration order.
    ///
    /// Individual shutdown failures are logged and do not stop the sweep.
    pub async fn shutdown_all(&mut self) {
        for service in self.services.iter_mut().rev() {
            if let Err(err) = service.shutdown().await {
                error!(service = service.name(), error = %err, "service shutdown failed");
            }
        }
        info!("all services shut down");
    }
}

impl Default for ServiceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the channel manager's reconnect loop as a lifecycle-managed service.
pub struct ChannelService {
    task: Option<crate::task::PeriodicTask>,
}

impl ChannelService {
    pub fn new() -> Self {
        Self { task: None }
    }
}

impl Default for ChannelService {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BootService for ChannelService {
    fn name(&self) -> &'static str {
        "channel-manager"
    }

    async fn start(&mut self, ctx: &AgentContext) -> Result<()> {
        self.task = Some(ctx.channel().start());
        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        if let Some(task) = self.task.take() {
            task.join().await;
        }
        Ok(())
    }
}
