//! Runtime metric providers.
//!
//! Concrete providers (CPU, memory, memory pools, GC) live outside this
//! crate; they are cheap, synchronous, side-effect-free data sources. This
//! module defines the seam they plug into and assembles their readings into
//! one immutable [`MetricRecord`] per sampling instant.

use crate::wire::{CpuMetric, GcMetric, MemoryMetric, MemoryPoolMetric, MetricRecord};
use thiserror::Error;

/// A provider failed to produce a reading.
///
/// Collection failures are never fatal: the current tick produces no record
/// and the next tick is unaffected.
#[derive(Debug, Error)]
#[error("metric collection failed: {0}")]
pub struct ProbeError(pub String);

impl ProbeError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Synchronous readings of the instrumented runtime.
///
/// Implementations must not block; every method is invoked on the producer's
/// schedule once per tick.
pub trait RuntimeProbe: Send + Sync {
    fn cpu(&self) -> Result<CpuMetric, ProbeError>;

    fn memory(&self) -> Result<Vec<MemoryMetric>, ProbeError>;

    fn memory_pools(&self) -> Result<Vec<MemoryPoolMetric>, ProbeError>;

    fn gc(&self) -> Result<Vec<GcMetric>, ProbeError>;
}

/// Assembles one timestamped record from the probe's current readings.
///
/// Any provider failure aborts the whole sample; a partially filled record
/// is never produced.
pub fn sample(probe: &dyn RuntimeProbe) -> Result<MetricRecord, ProbeError> {
    let time_millis = chrono::Utc::now().timestamp_millis();

    Ok(MetricRecord {
        time_millis,
        cpu: Some(probe.cpu()?),
        memory: probe.memory()?,
        memory_pool: probe.memory_pools()?,
        gc: probe.gc()?,
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// Probe returning fixed readings, optionally failing on demand.
    pub struct FixedProbe {
        pub fail: AtomicBool,
    }

    impl FixedProbe {
        pub fn new() -> Self {
            Self {
                fail: AtomicBool::new(false),
            }
        }
    }

    impl RuntimeProbe for FixedProbe {
        fn cpu(&self) -> Result<CpuMetric, ProbeError> {
            if self.fail.load(Ordering::SeqCst) {
                return Err(ProbeError::new("cpu reader unavailable"));
            }
            Ok(CpuMetric { usage_percent: 3.5 })
        }

        fn memory(&self) -> Result<Vec<MemoryMetric>, ProbeError> {
            Ok(vec![MemoryMetric {
                is_heap: true,
                init: 16,
                max: 1024,
                used: 128,
                committed: 256,
            }])
        }

        fn memory_pools(&self) -> Result<Vec<MemoryPoolMetric>, ProbeError> {
            Ok(Vec::new())
        }

        fn gc(&self) -> Result<Vec<GcMetric>, ProbeError> {
            Ok(Vec::new())
        }
    }
}
