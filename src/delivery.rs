//! Delivery client for the transaction stream
//!
//! Serializes records to JSON, derives partition keys, and hands them to the
//! log service. Partial batch failures are retried for the rejected subset
//! only; transport failures are counted and swallowed so a bad batch never
//! stops the producer.

use crate::error::{ProducerError, Result, ServiceError};
use crate::metrics::{DeliveryMetrics, MetricsSnapshot};
use crate::stream::{RecordEntry, StreamService};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Partition key used when the record has no usable key field
pub const DEFAULT_PARTITION_KEY: &str = "default";

/// Settings for [`DeliveryClient`]
#[derive(Debug, Clone)]
pub struct DeliverySettings {
    pub stream_name: String,
    /// Top-level record field used as partition key
    pub partition_key_field: String,
    /// Resubmissions of rejected records after the first attempt
    pub max_retries: u32,
    pub retry_delay: Duration,
    /// Describe calls made while waiting for a new stream
    pub stream_ready_attempts: u32,
    pub stream_poll_interval: Duration,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            stream_name: "fraud-transactions".to_string(),
            partition_key_field: "transaction_id".to_string(),
            max_retries: 3,
            retry_delay: Duration::from_millis(500),
            stream_ready_attempts: 30,
            stream_poll_interval: Duration::from_secs(1),
        }
    }
}

/// Outcome of a batch send, after retries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub successful: usize,
    pub failed: usize,
}

/// Sends records to a stream and tracks delivery metrics
pub struct DeliveryClient {
    service: Arc<dyn StreamService>,
    settings: DeliverySettings,
    metrics: DeliveryMetrics,
}

impl DeliveryClient {
    pub fn new(service: Arc<dyn StreamService>, settings: DeliverySettings) -> Self {
        info!(
            stream_name = %settings.stream_name,
            service = service.service_name(),
            partition_key_field = %settings.partition_key_field,
            "Delivery client initialized"
        );

        Self {
            service,
            settings,
            metrics: DeliveryMetrics::new(),
        }
    }

    pub fn stream_name(&self) -> &str {
        &self.settings.stream_name
    }

    /// True if the stream exists and is ACTIVE. A missing stream is not an error.
    pub async fn verify_stream_active(&self) -> Result<bool> {
        match self.service.describe_stream(&self.settings.stream_name).await {
            Ok(status) => {
                info!(
                    stream_name = %self.settings.stream_name,
                    status = ?status,
                    "Stream status checked"
                );
                Ok(status.is_active())
            }
            Err(ServiceError::ResourceNotFound(_)) => {
                warn!(stream_name = %self.settings.stream_name, "Stream not found");
                Ok(false)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Create the stream unless it is already active, then wait until it is.
    pub async fn ensure_stream_exists(&self, shard_count: u32) -> Result<()> {
        let stream_name = &self.settings.stream_name;

        if self.verify_stream_active().await? {
            info!(stream_name = %stream_name, "Stream already exists");
            return Ok(());
        }

        info!(stream_name = %stream_name, shard_count, "Creating stream");
        match self.service.create_stream(stream_name, shard_count).await {
            Ok(()) => {}
            Err(ServiceError::ResourceInUse(_)) => {
                info!(stream_name = %stream_name, "Stream already exists (concurrent creation)");
            }
            Err(e) => {
                error!(stream_name = %stream_name, error = %e, "Failed to create stream");
                return Err(e.into());
            }
        }

        for attempt in 1..=self.settings.stream_ready_attempts {
            match self.service.describe_stream(stream_name).await {
                Ok(status) if status.is_active() => {
                    info!(stream_name = %stream_name, attempt, "Stream is active");
                    return Ok(());
                }
                Ok(status) => {
                    debug!(stream_name = %stream_name, attempt, status = ?status, "Waiting for stream");
                }
                Err(ServiceError::ResourceNotFound(_)) => {
                    debug!(stream_name = %stream_name, attempt, "Stream not visible yet");
                }
                Err(e) => return Err(e.into()),
            }

            if attempt < self.settings.stream_ready_attempts {
                tokio::time::sleep(self.settings.stream_poll_interval).await;
            }
        }

        Err(ProducerError::StreamNotReady {
            stream: stream_name.clone(),
            attempts: self.settings.stream_ready_attempts,
        })
    }

    /// Send one record. Failures are logged and counted, never raised.
    pub async fn send_single<T: Serialize>(
        &self,
        record: &T,
        partition_key: Option<&str>,
    ) -> bool {
        let entry = match self.encode(record) {
            Ok(mut entry) => {
                if let Some(key) = partition_key {
                    entry.partition_key = key.to_string();
                }
                entry
            }
            Err(e) => {
                error!(error = %e, "Failed to serialize record");
                self.metrics.record_failed(1);
                return false;
            }
        };

        let key = entry.partition_key.clone();
        let bytes = entry.data.len() as u64;

        match self.service.put_record(&self.settings.stream_name, entry).await {
            Ok(output) => {
                self.metrics.record_sent(1, bytes);
                debug!(
                    shard_id = %output.shard_id,
                    sequence_number = %output.sequence_number,
                    "Record sent"
                );
                true
            }
            Err(e) => {
                error!(error = %e, record_id = %key, "Failed to send record");
                self.metrics.record_failed(1);
                false
            }
        }
    }

    /// Send a batch of records in one request per attempt.
    ///
    /// The service's failed record count decides how many records succeeded.
    /// Records carrying an error code are resubmitted after `retry_delay`, up
    /// to `max_retries` times. When the count and the error codes disagree
    /// the attempt sequence stops without a retry. A transport failure ends the attempt
    /// sequence and counts every record of that attempt as failed.
    pub async fn send_batch<T: Serialize>(&self, records: &[T]) -> BatchOutcome {
        if records.is_empty() {
            return BatchOutcome::default();
        }

        let mut encoded = Vec::with_capacity(records.len());
        let mut pending = Vec::with_capacity(records.len());
        for (index, record) in records.iter().enumerate() {
            match self.encode(record) {
                Ok(entry) => {
                    encoded.push(Some(entry));
                    pending.push(index);
                }
                Err(e) => {
                    error!(index, error = %e, "Failed to serialize record, dropping it");
                    encoded.push(None);
                }
            }
        }

        let mut successful = 0usize;
        let mut bytes = 0u64;
        let mut attempt = 0u32;

        while !pending.is_empty() {
            let entries: Vec<RecordEntry> = pending
                .iter()
                .filter_map(|&index| encoded[index].clone())
                .collect();

            let output = match self
                .service
                .put_records(&self.settings.stream_name, entries)
                .await
            {
                Ok(output) => output,
                Err(e) => {
                    error!(
                        error = %e,
                        batch_size = pending.len(),
                        attempt,
                        "Failed to send batch"
                    );
                    break;
                }
            };
            self.metrics.record_batch();

            // The service's failed count decides success; error codes pick what to retry
            let failed_count = output.failed_record_count.min(pending.len());
            successful += pending.len() - failed_count;

            let mut rejected = Vec::with_capacity(failed_count);
            for (position, &index) in pending.iter().enumerate() {
                match output.records.get(position) {
                    Some(result) if result.is_failed() => {
                        warn!(
                            error_code = result.error_code.as_deref().unwrap_or_default(),
                            error_message = result.error_message.as_deref().unwrap_or_default(),
                            "Record failed"
                        );
                        rejected.push(index);
                    }
                    _ => {
                        bytes += encoded[index].as_ref().map_or(0, |e| e.data.len() as u64);
                    }
                }
            }

            if rejected.len() != failed_count {
                warn!(
                    failed_record_count = output.failed_record_count,
                    flagged = rejected.len(),
                    "Failed record count does not match flagged records, not retrying"
                );
                break;
            }

            pending = rejected;
            if pending.is_empty() || attempt >= self.settings.max_retries {
                break;
            }

            attempt += 1;
            info!(count = pending.len(), attempt, "Retrying failed records");
            tokio::time::sleep(self.settings.retry_delay).await;
        }

        let failed = records.len() - successful;

        self.metrics.record_sent(successful as u64, bytes);
        self.metrics.record_failed(failed as u64);

        info!(
            batch_size = records.len(),
            successful,
            failed,
            attempts = attempt + 1,
            "Batch sent"
        );

        BatchOutcome { successful, failed }
    }

    /// Copy of the delivery counters
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    pub fn reset_metrics(&self) {
        self.metrics.reset();
        info!("Metrics reset");
    }

    /// Log the final metrics and release the client
    pub fn close(self) -> MetricsSnapshot {
        let metrics = self.metrics.snapshot();
        info!(
            records_sent = metrics.records_sent,
            records_failed = metrics.records_failed,
            batches_sent = metrics.batches_sent,
            bytes_sent = metrics.bytes_sent,
            "Closing delivery client"
        );
        metrics
    }

    fn encode<T: Serialize>(&self, record: &T) -> Result<RecordEntry> {
        let value = serde_json::to_value(record)?;
        let partition_key = partition_key_for(&value, &self.settings.partition_key_field);
        let data = serde_json::to_vec(&value)?;
        Ok(RecordEntry {
            data,
            partition_key,
        })
    }
}

/// Partition key from a top-level field: strings as-is, other values
/// stringified, missing or null fields map to [`DEFAULT_PARTITION_KEY`].
pub fn partition_key_for(record: &serde_json::Value, field: &str) -> String {
    match record.get(field) {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(serde_json::Value::Null) | None => DEFAULT_PARTITION_KEY.to_string(),
        Some(other) => other.to_string(),
    }
}
