//! Wire messages exchanged with the collector.
//!
//! These types mirror the collector's protocol-buffer schema. They are
//! declared with `prost` derives so the crate carries no build-time codegen
//! step; field tags are part of the interop contract and must not be
//! renumbered.

use prost::Message;

/// One CPU reading at a sampling instant.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct CpuMetric {
    /// CPU usage of the instrumented process, in percent.
    #[prost(double, tag = "1")]
    pub usage_percent: f64,
}

/// One memory-region reading (heap or off-heap).
#[derive(Clone, Copy, PartialEq, Message)]
pub struct MemoryMetric {
    /// Whether this region is the managed heap.
    #[prost(bool, tag = "1")]
    pub is_heap: bool,

    #[prost(int64, tag = "2")]
    pub init: i64,

    #[prost(int64, tag = "3")]
    pub max: i64,

    #[prost(int64, tag = "4")]
    pub used: i64,

    #[prost(int64, tag = "5")]
    pub committed: i64,
}

/// Well-known memory pool kinds reported by runtime providers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PoolType {
    CodeCache = 0,
    NewGen = 1,
    OldGen = 2,
    Survivor = 3,
    PermGen = 4,
    Metaspace = 5,
}

/// One memory-pool reading.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct MemoryPoolMetric {
    #[prost(enumeration = "PoolType", tag = "1")]
    pub pool_type: i32,

    #[prost(int64, tag = "2")]
    pub init: i64,

    #[prost(int64, tag = "3")]
    pub max: i64,

    #[prost(int64, tag = "4")]
    pub used: i64,

    #[prost(int64, tag = "5")]
    pub committed: i64,
}

/// Garbage-collection generation a [`GcMetric`] refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum GcPhase {
    Minor = 0,
    Major = 1,
}

/// Accumulated garbage-collection counters for one phase.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct GcMetric {
    #[prost(enumeration = "GcPhase", tag = "1")]
    pub phase: i32,

    #[prost(int64, tag = "2")]
    pub count: i64,

    #[prost(int64, tag = "3")]
    pub time_millis: i64,
}

/// An immutable snapshot of all runtime readings taken at one sampling
/// instant. Created once per producer tick, enqueued once, consumed exactly
/// once (sent in a batch or discarded by overflow eviction).
#[derive(Clone, PartialEq, Message)]
pub struct MetricRecord {
    /// Sampling timestamp, milliseconds since the Unix epoch.
    #[prost(int64, tag = "1")]
    pub time_millis: i64,

    #[prost(message, optional, tag = "2")]
    pub cpu: Option<CpuMetric>,

    #[prost(message, repeated, tag = "3")]
    pub memory: Vec<MemoryMetric>,

    #[prost(message, repeated, tag = "4")]
    pub memory_pool: Vec<MemoryPoolMetric>,

    #[prost(message, repeated, tag = "5")]
    pub gc: Vec<GcMetric>,
}

/// One drained, ordered group of records delivered in a single RPC call.
#[derive(Clone, PartialEq, Message)]
pub struct MetricBatch {
    /// Instance dictionary id assigned by the registration flow.
    #[prost(int32, tag = "1")]
    pub instance_id: i32,

    #[prost(message, repeated, tag = "2")]
    pub records: Vec<MetricRecord>,
}

/// Collector acknowledgement for a delivered batch. Carries no payload
/// today; kept as a message so the contract can grow without breaking.
#[derive(Clone, Copy, PartialEq, Message)]
pub struct CollectAck {}
