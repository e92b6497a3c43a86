//! Delivery metrics for the transaction producer.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::info;

/// Counters maintained by the delivery client
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
    /// Records accepted by the stream
    records_sent: AtomicU64,
    /// Records given up on
    records_failed: AtomicU64,
    /// Batch requests answered by the stream
    batches_sent: AtomicU64,
    /// Payload bytes of accepted records
    bytes_sent: AtomicU64,
}

impl DeliveryMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_sent(&self, records: u64, bytes: u64) {
        self.records_sent.fetch_add(records, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn record_failed(&self, records: u64) {
        self.records_failed.fetch_add(records, Ordering::Relaxed);
    }

    pub fn record_batch(&self) {
        self.batches_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Copy of the current counter values
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            records_sent: self.records_sent.load(Ordering::Relaxed),
            records_failed: self.records_failed.load(Ordering::Relaxed),
            batches_sent: self.batches_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
        }
    }

    /// Zero all counters
    pub fn reset(&self) {
        self.records_sent.store(0, Ordering::Relaxed);
        self.records_failed.store(0, Ordering::Relaxed);
        self.batches_sent.store(0, Ordering::Relaxed);
        self.bytes_sent.store(0, Ordering::Relaxed);
    }
}

/// Point-in-time copy of [`DeliveryMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub records_sent: u64,
    pub records_failed: u64,
    pub batches_sent: u64,
    pub bytes_sent: u64,
}

impl MetricsSnapshot {
    /// Share of attempted records that were delivered, in percent
    pub fn delivery_rate(&self) -> f64 {
        let attempted = self.records_sent + self.records_failed;
        if attempted > 0 {
            (self.records_sent as f64 / attempted as f64) * 100.0
        } else {
            0.0
        }
    }
}

/// Final report of a producer run
#[derive(Debug, Clone)]
pub struct RunSummary {
    /// Records delivered during the run
    pub total_sent: u64,
    pub batches: u64,
    pub elapsed: Duration,
    pub records_per_second: f64,
    pub metrics: MetricsSnapshot,
    /// True when the run stopped on cancellation before reaching its target
    pub cancelled: bool,
}

impl RunSummary {
    pub fn new(
        total_sent: u64,
        batches: u64,
        elapsed: Duration,
        metrics: MetricsSnapshot,
        cancelled: bool,
    ) -> Self {
        let secs = elapsed.as_secs_f64();
        let records_per_second = if secs > 0.0 {
            total_sent as f64 / secs
        } else {
            0.0
        };

        Self {
            total_sent,
            batches,
            elapsed,
            records_per_second,
            metrics,
            cancelled,
        }
    }

    /// Print summary statistics
    pub fn print_summary(&self) {
        info!("╔══════════════════════════════════════════════════════════════╗");
        info!("║         FRAUD TRANSACTION PRODUCER - DELIVERY SUMMARY        ║");
        info!("╠══════════════════════════════════════════════════════════════╣");
        info!(
            "║ Records Delivered: {:>10}  │  Throughput: {:>8.1} rec/s ║",
            self.total_sent, self.records_per_second
        );
        info!(
            "║ Records Failed:    {:>10}  │  Delivery Rate: {:>6.1}%    ║",
            self.metrics.records_failed,
            self.metrics.delivery_rate()
        );
        info!(
            "║ Batches:           {:>10}  │  Bytes Sent: {:>12}  ║",
            self.metrics.batches_sent, self.metrics.bytes_sent
        );
        info!(
            "║ Elapsed: {:>8.2}s  │  Cancelled: {:<5}                        ║",
            self.elapsed.as_secs_f64(),
            self.cancelled
        );
        info!("╚══════════════════════════════════════════════════════════════╝");
    }
}
