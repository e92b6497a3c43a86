//! Log service boundary
//!
//! The producer talks to a Kinesis-style partitioned log through the
//! [`StreamService`] trait. [`KinesisClient`] speaks the Kinesis JSON
//! protocol over HTTP; [`MemoryStream`] keeps everything in process for
//! dry runs and tests.

pub mod kinesis;
pub mod memory;

use crate::error::ServiceError;
use async_trait::async_trait;
use serde::Deserialize;

pub use kinesis::KinesisClient;
pub use memory::MemoryStream;

/// Stream status as reported by the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StreamStatus {
    Creating,
    Active,
    Updating,
    Deleting,
}

impl StreamStatus {
    pub fn is_active(&self) -> bool {
        matches!(self, StreamStatus::Active)
    }
}

/// A single encoded record ready to be put on the stream
#[derive(Debug, Clone, PartialEq)]
pub struct RecordEntry {
    pub data: Vec<u8>,
    pub partition_key: String,
}

/// Result of a single-record put
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRecordOutput {
    pub shard_id: String,
    pub sequence_number: String,
}

/// Per-record outcome within a batch put. Failed entries carry an error code.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRecordsResultEntry {
    #[serde(default)]
    pub shard_id: Option<String>,
    #[serde(default)]
    pub sequence_number: Option<String>,
    #[serde(default)]
    pub error_code: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
}

impl PutRecordsResultEntry {
    pub fn accepted(shard_id: impl Into<String>, sequence_number: impl Into<String>) -> Self {
        Self {
            shard_id: Some(shard_id.into()),
            sequence_number: Some(sequence_number.into()),
            ..Self::default()
        }
    }

    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error_code: Some(code.into()),
            error_message: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error_code.is_some()
    }
}

/// Result of a batch put. `records` is positionally aligned with the request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PutRecordsOutput {
    #[serde(default)]
    pub failed_record_count: usize,
    #[serde(default)]
    pub records: Vec<PutRecordsResultEntry>,
}

/// Operations the producer needs from a partitioned log service
#[async_trait]
pub trait StreamService: Send + Sync {
    /// Current status of the stream
    async fn describe_stream(&self, stream_name: &str) -> Result<StreamStatus, ServiceError>;

    /// Request creation of a stream with the given number of shards
    async fn create_stream(&self, stream_name: &str, shard_count: u32) -> Result<(), ServiceError>;

    /// Put a single record
    async fn put_record(
        &self,
        stream_name: &str,
        entry: RecordEntry,
    ) -> Result<PutRecordOutput, ServiceError>;

    /// Put many records in one request
    async fn put_records(
        &self,
        stream_name: &str,
        entries: Vec<RecordEntry>,
    ) -> Result<PutRecordsOutput, ServiceError>;

    /// Service name for logging
    fn service_name(&self) -> &'static str;
}
