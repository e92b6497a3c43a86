//! Producer loop: generate, deliver, pace, repeat until the target is met.

use crate::delivery::DeliveryClient;
use crate::generator::TransactionGenerator;
use crate::metrics::RunSummary;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Settings for [`ProducerLoop`]
#[derive(Debug, Clone)]
pub struct LoopSettings {
    /// Records to deliver before stopping
    pub target: u64,
    pub batch_size: usize,
    /// Pause between batches (zero disables pacing)
    pub batch_interval: Duration,
    /// Stop after this many consecutive batches deliver nothing (0 = never)
    pub max_consecutive_empty_batches: u32,
}

impl Default for LoopSettings {
    fn default() -> Self {
        Self {
            target: 100,
            batch_size: 10,
            batch_interval: Duration::from_secs(1),
            max_consecutive_empty_batches: 0,
        }
    }
}

/// Drives the generator and the delivery client one batch at a time
pub struct ProducerLoop {
    generator: TransactionGenerator,
    client: DeliveryClient,
    settings: LoopSettings,
}

impl ProducerLoop {
    pub fn new(generator: TransactionGenerator, client: DeliveryClient, settings: LoopSettings) -> Self {
        Self {
            generator,
            client,
            settings,
        }
    }

    /// Run until `target` records are delivered or `cancel` fires.
    ///
    /// Cancellation is observed between batches and during the pacing
    /// sleep; an in-flight send always completes.
    pub async fn run(mut self, cancel: CancellationToken) -> RunSummary {
        let target = self.settings.target;
        let batch_size = self.settings.batch_size.max(1) as u64;

        info!(
            stream_name = %self.client.stream_name(),
            target,
            batch_size,
            batch_interval_ms = self.settings.batch_interval.as_millis() as u64,
            fraud_ratio = self.generator.fraud_ratio(),
            "Starting producer"
        );

        let start = Instant::now();
        let mut total_sent = 0u64;
        let mut batches = 0u64;
        let mut empty_streak = 0u32;
        let mut cancelled = false;

        while total_sent < target {
            if cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            let current_batch_size = batch_size.min(target - total_sent) as usize;
            let transactions = self.generator.generate_batch(current_batch_size);
            batches += 1;

            let stats = TransactionGenerator::fraud_statistics(&transactions);
            info!(
                batch_number = batches,
                batch_size = current_batch_size,
                fraud_count = stats.fraud_count,
                fraud_percentage = stats.fraud_percentage,
                "Generated batch"
            );

            let outcome = self.client.send_batch(&transactions).await;
            total_sent += outcome.successful as u64;

            info!(
                total_sent,
                target,
                progress_pct = format!("{:.1}", total_sent as f64 / target as f64 * 100.0),
                "Batch delivered"
            );

            if outcome.successful == 0 {
                empty_streak += 1;
                let limit = self.settings.max_consecutive_empty_batches;
                if limit > 0 && empty_streak >= limit {
                    warn!(
                        consecutive_empty_batches = empty_streak,
                        "No records delivered, stopping producer"
                    );
                    break;
                }
            } else {
                empty_streak = 0;
            }

            if total_sent < target && !self.settings.batch_interval.is_zero() {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        cancelled = true;
                        break;
                    }
                    _ = tokio::time::sleep(self.settings.batch_interval) => {}
                }
            }
        }

        let elapsed = start.elapsed();
        let metrics = self.client.close();
        let summary = RunSummary::new(total_sent, batches, elapsed, metrics, cancelled);

        info!(
            elapsed_seconds = format!("{:.2}", elapsed.as_secs_f64()),
            total_records = total_sent,
            batches,
            records_per_second = format!("{:.2}", summary.records_per_second),
            bytes_sent = metrics.bytes_sent,
            failed_records = metrics.records_failed,
            cancelled,
            "Producer finished"
        );

        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::delivery::DeliverySettings;
    use crate::generator::GeneratorSettings;
    use crate::stream::MemoryStream;
    use std::sync::Arc;

    const STREAM: &str = "fraud-transactions";

    fn generator() -> TransactionGenerator {
        TransactionGenerator::new(GeneratorSettings {
            fraud_ratio: 0.2,
            num_merchants: 20,
            num_customers: 50,
            seed: Some(11),
        })
        .unwrap()
    }

    fn client(memory: &Arc<MemoryStream>) -> DeliveryClient {
        DeliveryClient::new(
            memory.clone(),
            DeliverySettings {
                retry_delay: Duration::ZERO,
                ..DeliverySettings::default()
            },
        )
    }

    fn settings(target: u64, batch_size: usize) -> LoopSettings {
        LoopSettings {
            target,
            batch_size,
            batch_interval: Duration::ZERO,
            max_consecutive_empty_batches: 0,
        }
    }

    #[tokio::test]
    async fn test_reaches_target_with_trailing_partial_batch() {
        let memory = Arc::new(MemoryStream::with_active_stream(STREAM, 2));
        let producer = ProducerLoop::new(generator(), client(&memory), settings(25, 10));

        let summary = producer.run(CancellationToken::new()).await;

        assert_eq!(summary.total_sent, 25);
        assert_eq!(summary.batches, 3);
        assert!(!summary.cancelled);
        assert_eq!(summary.metrics.records_sent, 25);
        assert_eq!(summary.metrics.batches_sent, 3);
        assert_eq!(memory.records(STREAM).len(), 25);
    }

    #[tokio::test]
    async fn test_rejected_records_are_retried_within_batch() {
        let memory = Arc::new(MemoryStream::with_active_stream(STREAM, 1));
        memory.reject_next_batch([0, 4]);
        let producer = ProducerLoop::new(generator(), client(&memory), settings(10, 5));

        let summary = producer.run(CancellationToken::new()).await;

        assert_eq!(summary.total_sent, 10);
        assert_eq!(summary.batches, 2);
        assert_eq!(memory.put_calls(), 3);
    }

    #[tokio::test]
    async fn test_pre_cancelled_token_sends_nothing() {
        let memory = Arc::new(MemoryStream::with_active_stream(STREAM, 1));
        let producer = ProducerLoop::new(generator(), client(&memory), settings(100, 10));

        let cancel = CancellationToken::new();
        cancel.cancel();
        let summary = producer.run(cancel).await;

        assert!(summary.cancelled);
        assert_eq!(summary.total_sent, 0);
        assert_eq!(summary.batches, 0);
        assert_eq!(memory.put_calls(), 0);
    }

    #[tokio::test]
    async fn test_cancel_interrupts_pacing_sleep() {
        let memory = Arc::new(MemoryStream::with_active_stream(STREAM, 1));
        let producer = ProducerLoop::new(
            generator(),
            client(&memory),
            LoopSettings {
                batch_interval: Duration::from_secs(3600),
                ..settings(100, 10)
            },
        );

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let summary = tokio::time::timeout(Duration::from_secs(10), producer.run(cancel))
            .await
            .expect("pacing sleep was not interrupted");

        assert!(summary.cancelled);
        assert_eq!(summary.total_sent, 10);
        assert_eq!(summary.batches, 1);
    }

    #[tokio::test]
    async fn test_stops_after_consecutive_empty_batches() {
        // No stream exists, so every put fails
        let memory = Arc::new(MemoryStream::new());
        let producer = ProducerLoop::new(
            generator(),
            client(&memory),
            LoopSettings {
                max_consecutive_empty_batches: 3,
                ..settings(100, 10)
            },
        );

        let summary = producer.run(CancellationToken::new()).await;

        assert!(!summary.cancelled);
        assert_eq!(summary.total_sent, 0);
        assert_eq!(summary.batches, 3);
        assert_eq!(summary.metrics.records_failed, 30);
        assert_eq!(summary.metrics.batches_sent, 0);
    }

    #[tokio::test]
    async fn test_zero_target_is_a_no_op() {
        let memory = Arc::new(MemoryStream::with_active_stream(STREAM, 1));
        let producer = ProducerLoop::new(generator(), client(&memory), settings(0, 10));

        let summary = producer.run(CancellationToken::new()).await;

        assert_eq!(summary.batches, 0);
        assert_eq!(summary.records_per_second, 0.0);
        assert!(!summary.cancelled);
    }
}
