//! Lock-free roster metrics and periodic reporting
//!
//! Counters are plain atomics updated on the request path; `report()` swaps
//! the per-interval ones to zero for the periodic log line while monotonic
//! totals keep counting for Prometheus.
//!
//! NOTE: All atomics use Relaxed ordering - these are statistics only and
//! must never drive roster decisions.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Operation latency bucket boundaries (microseconds)
/// Buckets: ≤100, ≤200, ≤400, ≤800, ≤1600, ≤3200, ≤6400, ≤12800, ≤25600, ≤51200, >51200
pub const LATENCY_BUCKET_BOUNDS: [u64; 10] =
    [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200];
pub const NUM_BUCKETS: usize = 11;

/// Stable rejection codes, in counter order
pub const REJECTION_KINDS: [&str; 6] =
    ["not_found", "already_registered", "not_registered", "outside_window", "busy", "storage"];

#[inline]
fn bucket_index(latency_us: u64) -> usize {
    LATENCY_BUCKET_BOUNDS.partition_point(|&bound| bound < latency_us)
}

/// Update an atomic max value using compare-and-swap loop
#[inline]
fn update_atomic_max(atomic_max: &AtomicU64, new_value: u64) {
    let mut current_max = atomic_max.load(Ordering::Relaxed);
    while new_value > current_max {
        match atomic_max.compare_exchange_weak(
            current_max,
            new_value,
            Ordering::Relaxed,
            Ordering::Relaxed,
        ) {
            Ok(_) => break,
            Err(actual) => current_max = actual,
        }
    }
}

fn load_all<const N: usize>(counters: &[AtomicU64; N]) -> [u64; N] {
    std::array::from_fn(|i| counters[i].load(Ordering::Relaxed))
}

/// Percentile from histogram buckets, reported as the bucket's upper bound
fn percentile_from_buckets(buckets: &[u64; NUM_BUCKETS], percentile: f64) -> u64 {
    let total: u64 = buckets.iter().sum();
    if total == 0 {
        return 0;
    }

    let target = ((total as f64 * percentile).ceil() as u64).max(1);
    let mut cumulative = 0u64;

    // Last bucket uses 2x the previous bound
    const BUCKET_UPPER_BOUNDS: [u64; NUM_BUCKETS] =
        [100, 200, 400, 800, 1600, 3200, 6400, 12800, 25600, 51200, 102400];

    for (i, &count) in buckets.iter().enumerate() {
        cumulative += count;
        if cumulative >= target {
            return BUCKET_UPPER_BOUNDS[i];
        }
    }
    BUCKET_UPPER_BOUNDS[NUM_BUCKETS - 1]
}

/// Roster operations, in counter order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    GetDetails,
    Register,
    CheckIn,
    Remove,
    ListTrips,
    CallerView,
}

impl Operation {
    pub const ALL: [Operation; 6] = [
        Operation::GetDetails,
        Operation::Register,
        Operation::CheckIn,
        Operation::Remove,
        Operation::ListTrips,
        Operation::CallerView,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::GetDetails => "get_details",
            Operation::Register => "register",
            Operation::CheckIn => "check_in",
            Operation::Remove => "remove",
            Operation::ListTrips => "list_trips",
            Operation::CallerView => "caller_view",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

pub struct Metrics {
    /// Operations handled, by `Operation` (monotonic)
    ops_total: [AtomicU64; 6],
    /// Operations since last report (reset on report)
    ops_since_report: AtomicU64,
    /// Operation latency histogram (monotonic, for Prometheus)
    latency_buckets: [AtomicU64; NUM_BUCKETS],
    /// Sum of operation latencies (monotonic)
    latency_sum_us: AtomicU64,
    /// Max latency since last report (reset on report)
    latency_max_us: AtomicU64,
    /// Registrations that got a seat (monotonic)
    seated_total: AtomicU64,
    /// Registrations that went to the waitlist (monotonic)
    waitlisted_total: AtomicU64,
    check_ins_total: AtomicU64,
    removals_total: AtomicU64,
    /// Waitlist heads moved onto the bus (monotonic)
    promotions_total: AtomicU64,
    /// Rejections by `REJECTION_KINDS` index (monotonic)
    rejections: [AtomicU64; 6],
    last_report_time: parking_lot::Mutex<Instant>,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            ops_total: std::array::from_fn(|_| AtomicU64::new(0)),
            ops_since_report: AtomicU64::new(0),
            latency_buckets: std::array::from_fn(|_| AtomicU64::new(0)),
            latency_sum_us: AtomicU64::new(0),
            latency_max_us: AtomicU64::new(0),
            seated_total: AtomicU64::new(0),
            waitlisted_total: AtomicU64::new(0),
            check_ins_total: AtomicU64::new(0),
            removals_total: AtomicU64::new(0),
            promotions_total: AtomicU64::new(0),
            rejections: std::array::from_fn(|_| AtomicU64::new(0)),
            last_report_time: parking_lot::Mutex::new(Instant::now()),
        }
    }

    /// Record one finished operation, successful or not
    #[inline]
    pub fn record_operation(&self, op: Operation, latency_us: u64) {
        self.ops_total[op.index()].fetch_add(1, Ordering::Relaxed);
        self.ops_since_report.fetch_add(1, Ordering::Relaxed);
        self.latency_sum_us.fetch_add(latency_us, Ordering::Relaxed);
        self.latency_buckets[bucket_index(latency_us)].fetch_add(1, Ordering::Relaxed);
        update_atomic_max(&self.latency_max_us, latency_us);
    }

    #[inline]
    pub fn record_registration(&self, seated: bool) {
        if seated {
            self.seated_total.fetch_add(1, Ordering::Relaxed);
        } else {
            self.waitlisted_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    #[inline]
    pub fn record_check_in(&self) {
        self.check_ins_total.fetch_add(1, Ordering::Relaxed);
    }

    #[inline]
    pub fn record_removal(&self, promotions: usize) {
        self.removals_total.fetch_add(1, Ordering::Relaxed);
        self.record_promotions(promotions);
    }

    #[inline]
    pub fn record_promotions(&self, count: usize) {
        if count > 0 {
            self.promotions_total.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    /// Record a rejected operation by its stable kind code
    ///
    /// Unknown codes are ignored.
    #[inline]
    pub fn record_rejection(&self, kind: &str) {
        if let Some(idx) = REJECTION_KINDS.iter().position(|k| *k == kind) {
            self.rejections[idx].fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn ops_total(&self, op: Operation) -> u64 {
        self.ops_total[op.index()].load(Ordering::Relaxed)
    }

    pub fn rejections(&self, kind: &str) -> u64 {
        REJECTION_KINDS
            .iter()
            .position(|k| *k == kind)
            .map(|idx| self.rejections[idx].load(Ordering::Relaxed))
            .unwrap_or(0)
    }

    /// Take a summary, resetting the per-interval counters
    pub fn report(&self) -> MetricsSummary {
        let ops_count = self.ops_since_report.swap(0, Ordering::Relaxed);
        let max_latency = self.latency_max_us.swap(0, Ordering::Relaxed);

        let elapsed = {
            let mut last = self.last_report_time.lock();
            let elapsed = last.elapsed();
            *last = Instant::now();
            elapsed
        };

        let ops_per_sec = if elapsed.as_secs_f64() > 0.0 {
            ops_count as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let mut summary = self.snapshot();
        summary.ops_per_sec = ops_per_sec;
        summary.max_latency_us = max_latency;
        summary
    }

    /// Read every counter without resetting anything
    pub fn snapshot(&self) -> MetricsSummary {
        let ops_total = load_all(&self.ops_total);
        let lat_buckets = load_all(&self.latency_buckets);
        let latency_sum_us = self.latency_sum_us.load(Ordering::Relaxed);
        let ops_all: u64 = ops_total.iter().sum();

        MetricsSummary {
            ops_total,
            ops_per_sec: 0.0,
            latency_sum_us,
            avg_latency_us: if ops_all > 0 { latency_sum_us / ops_all } else { 0 },
            max_latency_us: self.latency_max_us.load(Ordering::Relaxed),
            lat_p50_us: percentile_from_buckets(&lat_buckets, 0.50),
            lat_p99_us: percentile_from_buckets(&lat_buckets, 0.99),
            lat_buckets,
            seated_total: self.seated_total.load(Ordering::Relaxed),
            waitlisted_total: self.waitlisted_total.load(Ordering::Relaxed),
            check_ins_total: self.check_ins_total.load(Ordering::Relaxed),
            removals_total: self.removals_total.load(Ordering::Relaxed),
            promotions_total: self.promotions_total.load(Ordering::Relaxed),
            rejections: load_all(&self.rejections),
        }
    }
}

/// Point-in-time copy of the roster metrics
#[derive(Debug, Clone)]
pub struct MetricsSummary {
    /// Indexed like `Operation::ALL`
    pub ops_total: [u64; 6],
    pub ops_per_sec: f64,
    pub latency_sum_us: u64,
    pub avg_latency_us: u64,
    pub max_latency_us: u64,
    /// Bounds: `LATENCY_BUCKET_BOUNDS`, last bucket is overflow
    pub lat_buckets: [u64; NUM_BUCKETS],
    pub lat_p50_us: u64,
    pub lat_p99_us: u64,
    pub seated_total: u64,
    pub waitlisted_total: u64,
    pub check_ins_total: u64,
    pub removals_total: u64,
    pub promotions_total: u64,
    /// Indexed like `REJECTION_KINDS`
    pub rejections: [u64; 6],
}

impl MetricsSummary {
    pub fn log(&self) {
        let ops: u64 = self.ops_total.iter().sum();
        let rejections: u64 = self.rejections.iter().sum();
        info!(
            ops_total = %ops,
            ops_per_sec = format!("{:.1}", self.ops_per_sec),
            avg_latency_us = %self.avg_latency_us,
            max_latency_us = %self.max_latency_us,
            p99_us = %self.lat_p99_us,
            seated = %self.seated_total,
            waitlisted = %self.waitlisted_total,
            check_ins = %self.check_ins_total,
            removals = %self.removals_total,
            promotions = %self.promotions_total,
            rejections = %rejections,
            "metrics"
        );
    }
}
