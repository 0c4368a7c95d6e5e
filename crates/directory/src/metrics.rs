//! Per-hop latency metrics for the resolution path.
//!
//! Every lookup on the query path is timed and reported twice: as a
//! structured `tracing` event at the call site, and as an aggregate here.
//! [`HopMetrics`] keeps, per [`Hop`], a call count, an error count, the
//! cumulative latency and a bounded window of recent samples from which
//! p50/p95/p99 are computed at snapshot time.
//!
//! The values are diagnostics. Nothing on the request path reads them.
//!
//! # Memory Ordering
//!
//! All counters use `Ordering::Relaxed`: each is an independent monotonic
//! counter, and a snapshot only needs each value to be untorn, not mutually
//! consistent with the others.
//!
//! # Usage
//!
//! ```
//! use std::time::Duration;
//! use crosschain_directory::metrics::{Hop, HopMetrics};
//!
//! let metrics = HopMetrics::new();
//! metrics.record(Hop::IndexLookup, Duration::from_micros(120), true);
//!
//! let snapshot = metrics.snapshot(Hop::IndexLookup);
//! assert_eq!(snapshot.count, 1);
//! assert_eq!(snapshot.percentiles.p50, 120);
//! ```

use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use parking_lot::Mutex;

/// Number of latency samples retained per hop.
const HISTOGRAM_WINDOW_SIZE: usize = 1024;

/// A timed step on the resolution path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Hop {
    /// A regional shard reading one of its own records.
    RegionalRead,
    /// The directory reading or querying its own index.
    IndexLookup,
    /// The directory's call into a regional shard.
    CrossShard,
    /// A complete two-hop resolution, end to end.
    Resolve,
}

impl Hop {
    const ALL: [Hop; 4] = [Hop::RegionalRead, Hop::IndexLookup, Hop::CrossShard, Hop::Resolve];

    fn index(self) -> usize {
        match self {
            Hop::RegionalRead => 0,
            Hop::IndexLookup => 1,
            Hop::CrossShard => 2,
            Hop::Resolve => 3,
        }
    }

    /// Stable name used in log fields.
    pub fn as_str(self) -> &'static str {
        match self {
            Hop::RegionalRead => "regional_read",
            Hop::IndexLookup => "index_lookup",
            Hop::CrossShard => "cross_shard",
            Hop::Resolve => "resolve",
        }
    }
}

impl fmt::Display for Hop {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Latency percentiles for a single hop, in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LatencyPercentiles {
    /// 50th percentile (median) latency in microseconds.
    pub p50: u64,
    /// 95th percentile latency in microseconds.
    pub p95: u64,
    /// 99th percentile latency in microseconds.
    pub p99: u64,
}

/// Bounded sliding window of latency samples.
struct LatencyHistogram {
    inner: Mutex<HistogramInner>,
}

struct HistogramInner {
    buf: Vec<u64>,
    pos: usize,
    capacity: usize,
}

impl LatencyHistogram {
    fn new(capacity: usize) -> Self {
        Self { inner: Mutex::new(HistogramInner { buf: Vec::with_capacity(capacity), pos: 0, capacity }) }
    }

    fn record(&self, value_us: u64) {
        let mut inner = self.inner.lock();
        let pos = inner.pos;
        if inner.buf.len() < inner.capacity {
            inner.buf.push(value_us);
        } else {
            inner.buf[pos] = value_us;
        }
        inner.pos = (pos + 1) % inner.capacity;
    }

    fn percentiles(&self) -> LatencyPercentiles {
        let mut sorted = self.inner.lock().buf.clone();
        if sorted.is_empty() {
            return LatencyPercentiles::default();
        }
        sorted.sort_unstable();
        let len = sorted.len();
        LatencyPercentiles {
            p50: sorted[percentile_index(len, 50)],
            p95: sorted[percentile_index(len, 95)],
            p99: sorted[percentile_index(len, 99)],
        }
    }

}

/// Nearest-rank index: `ceil(percentile/100 * len) - 1`, clamped.
fn percentile_index(len: usize, percentile: u32) -> usize {
    if len == 0 {
        return 0;
    }
    let rank = (u64::from(percentile) * len as u64).div_ceil(100) as usize;
    rank.saturating_sub(1).min(len - 1)
}

struct HopCounters {
    count: AtomicU64,
    errors: AtomicU64,
    latency_us: AtomicU64,
    histogram: LatencyHistogram,
}

impl HopCounters {
    fn new() -> Self {
        Self {
            count: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            latency_us: AtomicU64::new(0),
            histogram: LatencyHistogram::new(HISTOGRAM_WINDOW_SIZE),
        }
    }
}

/// Point-in-time view of one hop's counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HopSnapshot {
    /// Completed calls, successful or not.
    pub count: u64,
    /// Calls that returned an error.
    pub errors: u64,
    /// Cumulative latency in microseconds.
    pub latency_us: u64,
    /// Percentiles over the recent sample window.
    pub percentiles: LatencyPercentiles,
}

impl HopSnapshot {
    /// Average latency in microseconds, or 0 with no calls.
    pub fn avg_latency_us(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.latency_us as f64 / self.count as f64 }
    }
}

/// Shared per-hop latency collector.
///
/// Cheap to clone; all clones record into the same counters.
#[derive(Clone)]
pub struct HopMetrics {
    inner: Arc<[HopCounters; 4]>,
}

impl HopMetrics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self { inner: Arc::new(std::array::from_fn(|_| HopCounters::new())) }
    }

    /// Records one completed hop.
    pub fn record(&self, hop: Hop, elapsed: Duration, ok: bool) {
        let counters = &self.inner[hop.index()];
        let us = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        counters.count.fetch_add(1, Ordering::Relaxed);
        counters.latency_us.fetch_add(us, Ordering::Relaxed);
        if !ok {
            counters.errors.fetch_add(1, Ordering::Relaxed);
        }
        counters.histogram.record(us);
    }

    /// Snapshot of a single hop.
    #[must_use]
    pub fn snapshot(&self, hop: Hop) -> HopSnapshot {
        let counters = &self.inner[hop.index()];
        HopSnapshot {
            count: counters.count.load(Ordering::Relaxed),
            errors: counters.errors.load(Ordering::Relaxed),
            latency_us: counters.latency_us.load(Ordering::Relaxed),
            percentiles: counters.histogram.percentiles(),
        }
    }

    /// Logs every hop that has recorded at least one call, at INFO level.
    pub fn log_metrics(&self) {
        for hop in Hop::ALL {
            let snapshot = self.snapshot(hop);
            if snapshot.count == 0 {
                continue;
            }
            tracing::info!(
                hop = hop.as_str(),
                count = snapshot.count,
                errors = snapshot.errors,
                avg_latency_us = snapshot.avg_latency_us(),
                p50 = snapshot.percentiles.p50,
                p95 = snapshot.percentiles.p95,
                p99 = snapshot.percentiles.p99,
                "Hop latency snapshot"
            );
        }
    }
}

impl Default for HopMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for HopMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut map = f.debug_map();
        for hop in Hop::ALL {
            map.entry(&hop.as_str(), &self.snapshot(hop).count);
        }
        map.finish()
    }
}
