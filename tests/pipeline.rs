//! End-to-end pipeline tests against a loopback fake collector.

use reporter_core::codec::FrameCodec;
use reporter_core::config::ReporterConfig;
use reporter_core::probe::{ProbeError, RuntimeProbe};
use reporter_core::registration::DictionaryId;
use reporter_core::report::MetricReportService;
use reporter_core::service::{AgentContext, ChannelService, ServiceRegistry};
use reporter_core::wire::{CollectAck, CpuMetric, GcMetric, MemoryMetric, MemoryPoolMetric, MetricBatch};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::timeout;

struct TestProbe;

impl RuntimeProbe for TestProbe {
    fn cpu(&self) -> Result<CpuMetric, ProbeError> {
        Ok(CpuMetric { usage_percent: 7.0 })
    }

    fn memory(&self) -> Result<Vec<MemoryMetric>, ProbeError> {
        Ok(vec![MemoryMetric {
            is_heap: true,
            init: 1,
            max: 4,
            used: 2,
            committed: 3,
        }])
    }

    fn memory_pools(&self) -> Result<Vec<MemoryPoolMetric>, ProbeError> {
        Ok(Vec::new())
    }

    fn gc(&self) -> Result<Vec<GcMetric>, ProbeError> {
        Ok(Vec::new())
    }
}

/// Accepts connections and acknowledges every batch, forwarding each to the
/// test through a channel. `drop_after` limits how many batches one
/// connection serves before it is closed mid-session.
fn spawn_fake_collector(
    listener: TcpListener,
    batches_tx: mpsc::UnboundedSender<MetricBatch>,
    drop_after: Option<usize>,
) {
    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                return;
            };
            let tx = batches_tx.clone();
            let mut codec = FrameCodec::default();
            let mut served = 0usize;

            loop {
                let batch: MetricBatch = match codec
                    .read_frame(&mut socket, Duration::from_secs(5))
                    .await
                {
                    Ok(batch) => batch,
                    Err(_) => break,
                };
                if codec
                    .write_frame(&mut socket, &CollectAck {}, Duration::from_secs(5))
                    .await
                    .is_err()
                {
                    break;
                }
                let _ = tx.send(batch);

                served += 1;
                if drop_after.is_some_and(|limit| served >= limit) {
                    break;
                }
            }
        }
    });
}

fn test_config(endpoint: String) -> ReporterConfig {
    ReporterConfig::default()
        .with_endpoint(endpoint)
        .with_buffer_capacity(64)
        .with_producer_interval(Duration::from_millis(20))
        .with_sender_interval(Duration::from_millis(40))
        .with_reconnect_interval(Duration::from_millis(20))
}

#[tokio::test]
async fn reports_sampled_metrics_once_registered() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let endpoint = listener.local_addr().expect("local addr").to_string();
    let (batches_tx, mut batches_rx) = mpsc::unbounded_channel();
    spawn_fake_collector(listener, batches_tx, None);

    let config = test_config(endpoint);
    config.validate().expect("valid config");

    let ctx = AgentContext::new(config);
    let mut registry = ServiceRegistry::new();
    registry
        .register(Box::new(ChannelService::new()))
        .expect("register channel service");
    registry
        .register(Box::new(MetricReportService::new(Arc::new(TestProbe))))
        .expect("register report service");
    registry.boot_all(&ctx).await.expect("boot");

    // Before registration nothing may reach the collector, even though the
    // channel connects and both schedules are running.
    tokio::time::sleep(Duration::from_millis(150)).await;
    assert!(
        batches_rx.try_recv().is_err(),
        "no batch may be sent before registration"
    );

    ctx.gate().assign(DictionaryId(5), DictionaryId(23));

    let batch = timeout(Duration::from_secs(5), batches_rx.recv())
        .await
        .expect("batch within deadline")
        .expect("collector channel open");

    assert_eq!(batch.instance_id, 23);
    assert!(!batch.records.is_empty());
    let record = &batch.records[0];
    assert!(record.time_millis > 0);
    assert_eq!(
        record.cpu.expect("cpu reading present").usage_percent,
        7.0
    );
    assert_eq!(record.memory.len(), 1);

    // Record order inside a batch follows sampling order.
    let times: Vec<i64> = batch.records.iter().map(|r| r.time_millis).collect();
    let mut sorted = times.clone();
    sorted.sort_unstable();
    assert_eq!(times, sorted);

    registry.shutdown_all().await;
}

#[tokio::test]
async fn pipeline_survives_connection_loss_and_reconnects() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let endpoint = listener.local_addr().expect("local addr").to_string();
    let (batches_tx, mut batches_rx) = mpsc::unbounded_channel();
    // Each connection is dropped after a single batch, forcing the agent
    // through a full failure -> reconnect -> resend cycle.
    spawn_fake_collector(listener, batches_tx, Some(1));

    let ctx = AgentContext::new(test_config(endpoint));
    let mut registry = ServiceRegistry::new();
    registry
        .register(Box::new(ChannelService::new()))
        .expect("register channel service");
    registry
        .register(Box::new(MetricReportService::new(Arc::new(TestProbe))))
        .expect("register report service");
    registry.boot_all(&ctx).await.expect("boot");

    ctx.gate().assign(DictionaryId(5), DictionaryId(23));

    let first = timeout(Duration::from_secs(5), batches_rx.recv())
        .await
        .expect("first batch within deadline")
        .expect("collector channel open");
    let second = timeout(Duration::from_secs(5), batches_rx.recv())
        .await
        .expect("second batch within deadline")
        .expect("collector channel open");

    assert_eq!(first.instance_id, 23);
    assert_eq!(second.instance_id, 23);

    registry.shutdown_all().await;
}
