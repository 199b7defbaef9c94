//! Reporting service: producer, buffer, and sender for one telemetry stream.
//!
//! The runtime-metrics stream is the concrete instantiation; trace segments
//! and other streams follow the same shape. A producer task samples on its
//! own fixed rate and appends to the stream's buffer under the drop-oldest
//! policy; a sender task, on an independent rate, drains the buffer into one
//! batch and delivers it when the collector channel is connected. Both sides
//! check the registration gate first and do nothing while it is closed.
//!
//! Reliability is window-based: a failed send is logged and its batch
//! discarded; the next sampling window supplies fresh data.

use crate::buffer::{EnqueueOutcome, ReportBuffer};
use crate::channel::{ChannelManager, ChannelStatus, ChannelWatch};
use crate::probe::{sample, RuntimeProbe};
use crate::registration::RegistrationGate;
use crate::service::{AgentContext, BootService};
use crate::task::{spawn_periodic, PeriodicTask};
use crate::wire::{MetricBatch, MetricRecord};
use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, warn};

/// Collaborators resolved from the context during `prepare`.
struct Wiring {
    gate: Arc<RegistrationGate>,
    channel: Arc<ChannelManager>,
    watch: ChannelWatch,
    buffer: Arc<ReportBuffer<MetricRecord>>,
}

/// Periodically samples runtime metrics and ships them to the collector.
pub struct MetricReportService {
    probe: Arc<dyn RuntimeProbe>,
    wiring: Option<Wiring>,
    tasks: Vec<PeriodicTask>,
}

impl MetricReportService {
    /// Creates the service around the given metric providers.
    pub fn new(probe: Arc<dyn RuntimeProbe>) -> Self {
        Self {
            probe,
            wiring: None,
            tasks: Vec::new(),
        }
    }
}

#[async_trait]
impl BootService for MetricReportService {
    fn name(&self) -> &'static str {
        "metric-report"
    }

    async fn prepare(&mut self, ctx: &AgentContext) -> Result<()> {
        let channel = ctx.channel();
        let watch = channel.subscribe();
        self.wiring = Some(Wiring {
            gate: ctx.gate(),
            channel,
            watch,
            buffer: Arc::new(ReportBuffer::new(ctx.config().metrics.buffer_capacity)),
        });
        Ok(())
    }

    async fn start(&mut self, ctx: &AgentContext) -> Result<()> {
        let wiring = self
            .wiring
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("metric-report started before prepare"))?;

        let stream = &ctx.config().metrics;

        let gate = Arc::clone(&wiring.gate);
        let probe = Arc::clone(&self.probe);
        let buffer = Arc::clone(&wiring.buffer);
        self.tasks.push(spawn_periodic(
            "metric-produce",
            stream.producer_interval,
            move || {
                let gate = Arc::clone(&gate);
                let probe = Arc::clone(&probe);
                let buffer = Arc::clone(&buffer);
                async move {
                    producer_tick(&gate, probe.as_ref(), &buffer);
                    Ok(())
                }
            },
        ));

        let gate = Arc::clone(&wiring.gate);
        let channel = Arc::clone(&wiring.channel);
        let watch = wiring.watch.clone();
        let buffer = Arc::clone(&wiring.buffer);
        self.tasks.push(spawn_periodic(
            "metric-send",
            stream.sender_interval,
            move || {
                let gate = Arc::clone(&gate);
                let channel = Arc::clone(&channel);
                let watch = watch.clone();
                let buffer = Arc::clone(&buffer);
                async move {
                    sender_tick(&gate, &channel, &watch, &buffer).await;
                    Ok(())
                }
            },
        ));

        Ok(())
    }

    async fn shutdown(&mut self) -> Result<()> {
        // No flush: telemetry still buffered at shutdown is lost by design.
        for task in self.tasks.drain(..) {
            task.join().await;
        }
        Ok(())
    }
}

/// One producer pass: sample the probe and enqueue the record.
///
/// A closed gate is a silent no-op; a provider failure is logged and yields
/// no record for this tick.
fn producer_tick(
    gate: &RegistrationGate,
    probe: &dyn RuntimeProbe,
    buffer: &ReportBuffer<MetricRecord>,
) {
    if !gate.is_registered() {
        return;
    }

    match sample(probe) {
        Ok(record) => match buffer.push_evicting(record) {
            EnqueueOutcome::Stored => {}
            EnqueueOutcome::StoredAfterEviction => {
                debug!("metric buffer full, evicted oldest record");
            }
            EnqueueOutcome::Dropped => {
                debug!("metric buffer refilled during eviction, dropped newest record");
            }
        },
        Err(err) => {
            warn!(error = %err, "runtime metric collection failed");
        }
    }
}

/// One sender pass: drain the buffer and deliver a single batch.
///
/// While the channel is disconnected the buffer is left untouched; records
/// keep accumulating under the producer's overflow policy. A failed send is
/// logged, reported to the channel manager, and its batch discarded.
async fn sender_tick(
    gate: &RegistrationGate,
    channel: &ChannelManager,
    watch: &ChannelWatch,
    buffer: &ReportBuffer<MetricRecord>,
) {
    if !gate.is_registered() {
        return;
    }

    // The watched state pairs status with the matching client handle, so
    // observing Connected here guarantees a usable handle below.
    let state = watch.borrow().clone();
    if state.status != ChannelStatus::Connected {
        return;
    }
    let Some(client) = state.client() else {
        return;
    };

    let records = buffer.drain();
    if records.is_empty() {
        return;
    }

    let batch = MetricBatch {
        instance_id: gate.instance_id().0,
        records,
    };
    let record_count = batch.records.len();

    match client.collect(batch).await {
        Ok(_) => {
            debug!(records = record_count, "metric batch delivered");
        }
        Err(err) => {
            warn!(records = record_count, error = %err, "metric batch delivery failed, discarding");
            channel.report_failure();
        }
    }
}
