//! # Reporter Core
//!
//! An in-process telemetry reporting framework for agent processes that
//! stream runtime metrics to a remote collector over a persistent framed
//! connection of unreliable connectivity.
//!
//! ## Overview
//!
//! The framework provides:
//! - A [`service::ServiceRegistry`] driving a phased boot protocol
//!   (`prepare` → `start` → `after_start` → `shutdown`) over registered
//!   [`service::BootService`] implementations
//! - A [`registration::RegistrationGate`] that keeps every stream silent
//!   until the registration flow has assigned both dictionary ids
//! - A [`channel::ChannelManager`] owning the single outbound collector
//!   connection, with an independent reconnect loop and atomically published
//!   status/handle snapshots
//! - The producer/buffer/sender reporting pattern
//!   ([`report::MetricReportService`]) over a bounded drop-oldest
//!   [`buffer::ReportBuffer`]
//! - Fault-isolated fixed-rate scheduling ([`task::spawn_periodic`]) where
//!   no single tick failure can kill a schedule
//!
//! The host application observes zero behavioral change regardless of
//! telemetry-pipeline health: every steady-state failure is logged and
//! converted into "try again next tick".
//!
//! ## Data flow
//!
//! ```text
//! providers -> producer (gated) -> buffer (drop-oldest)
//!           -> sender (gated, channel-aware) -> batch -> collector
//! ```
//!
//! ## Example
//!
//! ```rust,no_run
//! use reporter_core::config::ReporterConfig;
//! use reporter_core::probe::{ProbeError, RuntimeProbe};
//! use reporter_core::report::MetricReportService;
//! use reporter_core::service::{AgentContext, ChannelService, ServiceRegistry};
//! use reporter_core::wire::{CpuMetric, GcMetric, MemoryMetric, MemoryPoolMetric};
//! use std::sync::Arc;
//!
//! struct HostProbe;
//!
//! impl RuntimeProbe for HostProbe {
//!     fn cpu(&self) -> Result<CpuMetric, ProbeError> {
//!         Ok(CpuMetric { usage_percent: 0.0 })
//!     }
//!     fn memory(&self) -> Result<Vec<MemoryMetric>, ProbeError> {
//!         Ok(Vec::new())
//!     }
//!     fn memory_pools(&self) -> Result<Vec<MemoryPoolMetric>, ProbeError> {
//!         Ok(Vec::new())
//!     }
//!     fn gc(&self) -> Result<Vec<GcMetric>, ProbeError> {
//!         Ok(Vec::new())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ReporterConfig::default()
//!         .with_endpoint("collector.internal:11800")
//!         .apply_env_overrides();
//!     config.validate()?;
//!
//!     let ctx = AgentContext::new(config);
//!     let mut registry = ServiceRegistry::new();
//!     registry.register(Box::new(ChannelService::new()))?;
//!     registry.register(Box::new(MetricReportService::new(Arc::new(HostProbe))))?;
//!
//!     registry.boot_all(&ctx).await?;
//!     // ... registration flow assigns ids via ctx.gate().assign(..) ...
//!     Ok(())
//! }
//! ```

pub mod buffer;
pub mod channel;
pub mod client;
pub mod codec;
pub mod config;
pub mod probe;
pub mod registration;
pub mod report;
pub mod service;
pub mod task;
pub mod wire;

// Re-export main types for convenience
pub use buffer::{EnqueueOutcome, ReportBuffer};
pub use channel::{ChannelManager, ChannelState, ChannelStatus, ChannelWatch};
pub use client::{CollectorClient, TcpCollectorClient};
pub use codec::{FrameCodec, WireError, WireResult};
pub use config::{CollectorConfig, ReporterConfig, StreamConfig};
pub use probe::{ProbeError, RuntimeProbe};
pub use registration::{DictionaryId, RegistrationGate, UNASSIGNED};
pub use report::MetricReportService;
pub use service::{AgentContext, BootService, ChannelService, ServiceError, ServiceRegistry};
pub use task::{spawn_periodic, PeriodicTask};
pub use wire::{CollectAck, MetricBatch, MetricRecord};
