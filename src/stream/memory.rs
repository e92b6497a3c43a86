//! In-process stream used for dry runs and tests
//!
//! Mimics the observable behaviour of a Kinesis stream: creation goes
//! through CREATING before ACTIVE, records are routed to shards by partition
//! key and receive increasing sequence numbers. Failures can be injected to
//! exercise partial-batch and transport-level error paths.

use super::{
    PutRecordOutput, PutRecordsOutput, PutRecordsResultEntry, RecordEntry, StreamService,
    StreamStatus,
};
use crate::error::ServiceError;
use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

const THROUGHPUT_EXCEEDED: &str = "ProvisionedThroughputExceededException";

/// A record accepted by the memory stream
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    pub shard_id: String,
    pub sequence_number: String,
    pub partition_key: String,
    pub data: Vec<u8>,
}

struct StreamState {
    status: StreamStatus,
    /// Describe calls left before a CREATING stream turns ACTIVE
    pending_describes: u32,
    shards: Vec<Vec<StoredRecord>>,
    next_sequence: u64,
}

impl StreamState {
    fn new(shard_count: u32, status: StreamStatus) -> Self {
        Self {
            status,
            pending_describes: 1,
            shards: vec![Vec::new(); shard_count.max(1) as usize],
            next_sequence: 1,
        }
    }

    fn append(&mut self, entry: RecordEntry) -> PutRecordOutput {
        let mut hasher = DefaultHasher::new();
        entry.partition_key.hash(&mut hasher);
        let shard = (hasher.finish() % self.shards.len() as u64) as usize;

        let output = PutRecordOutput {
            shard_id: format!("shardId-{:012}", shard),
            sequence_number: format!("{:021}", self.next_sequence),
        };
        self.next_sequence += 1;

        self.shards[shard].push(StoredRecord {
            shard_id: output.shard_id.clone(),
            sequence_number: output.sequence_number.clone(),
            partition_key: entry.partition_key,
            data: entry.data,
        });

        output
    }
}

/// Failure injected into one upcoming put call
enum InjectedFailure {
    /// Reject the records at these positions. When `reported` is false the
    /// rejections are flagged per record but left out of the failed count.
    Reject { positions: Vec<usize>, reported: bool },
    /// Fail the whole call at the transport level
    Transport,
}

/// In-memory partitioned stream
#[derive(Default)]
pub struct MemoryStream {
    streams: Mutex<HashMap<String, StreamState>>,
    /// Consumed one entry per put call, in order
    failures: Mutex<VecDeque<InjectedFailure>>,
    put_calls: AtomicUsize,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MemoryStream {
    pub fn new() -> Self {
        Self::default()
    }

    /// A memory stream with one stream already ACTIVE
    pub fn with_active_stream(stream_name: &str, shard_count: u32) -> Self {
        let memory = Self::new();
        lock(&memory.streams).insert(
            stream_name.to_string(),
            StreamState::new(shard_count, StreamStatus::Active),
        );
        memory
    }

    /// Reject the given record positions on an upcoming put call.
    /// Injected failures apply to put calls in the order they were queued.
    pub fn reject_next_batch(&self, positions: impl IntoIterator<Item = usize>) {
        lock(&self.failures).push_back(InjectedFailure::Reject {
            positions: positions.into_iter().collect(),
            reported: true,
        });
    }

    /// Like [`Self::reject_next_batch`], but the response reports a failed
    /// record count of zero.
    pub fn reject_unreported(&self, positions: impl IntoIterator<Item = usize>) {
        lock(&self.failures).push_back(InjectedFailure::Reject {
            positions: positions.into_iter().collect(),
            reported: false,
        });
    }

    /// Fail `count` upcoming put calls with a transport error
    pub fn fail_next_calls(&self, count: usize) {
        let mut failures = lock(&self.failures);
        for _ in 0..count {
            failures.push_back(InjectedFailure::Transport);
        }
    }

    /// Number of put calls received, including failed ones
    pub fn put_calls(&self) -> usize {
        self.put_calls.load(Ordering::Relaxed)
    }

    /// All stored records of a stream, grouped by shard
    pub fn records(&self, stream_name: &str) -> Vec<StoredRecord> {
        lock(&self.streams)
            .get(stream_name)
            .map(|state| state.shards.iter().flatten().cloned().collect())
            .unwrap_or_default()
    }

    fn next_failure(&self) -> Option<InjectedFailure> {
        lock(&self.failures).pop_front()
    }
}

fn active_stream<'a>(
    streams: &'a mut HashMap<String, StreamState>,
    stream_name: &str,
) -> Result<&'a mut StreamState, ServiceError> {
    match streams.get_mut(stream_name) {
        Some(state) if state.status.is_active() => Ok(state),
        _ => Err(ServiceError::ResourceNotFound(format!(
            "Stream {} under account 000000000000 not found.",
            stream_name
        ))),
    }
}

fn connection_reset() -> ServiceError {
    ServiceError::Transport("connection reset by peer".to_string())
}

#[async_trait]
impl StreamService for MemoryStream {
    async fn describe_stream(&self, stream_name: &str) -> Result<StreamStatus, ServiceError> {
        let mut streams = lock(&self.streams);
        let state = streams.get_mut(stream_name).ok_or_else(|| {
            ServiceError::ResourceNotFound(format!("Stream {} not found", stream_name))
        })?;

        if state.status == StreamStatus::Creating {
            if state.pending_describes == 0 {
                state.status = StreamStatus::Active;
            } else {
                state.pending_describes -= 1;
            }
        }
        Ok(state.status)
    }

    async fn create_stream(&self, stream_name: &str, shard_count: u32) -> Result<(), ServiceError> {
        let mut streams = lock(&self.streams);
        if streams.contains_key(stream_name) {
            return Err(ServiceError::ResourceInUse(format!(
                "Stream {} already exists",
                stream_name
            )));
        }
        streams.insert(
            stream_name.to_string(),
            StreamState::new(shard_count, StreamStatus::Creating),
        );
        Ok(())
    }

    async fn put_record(
        &self,
        stream_name: &str,
        entry: RecordEntry,
    ) -> Result<PutRecordOutput, ServiceError> {
        self.put_calls.fetch_add(1, Ordering::Relaxed);
        match self.next_failure() {
            Some(InjectedFailure::Transport) => return Err(connection_reset()),
            Some(InjectedFailure::Reject { .. }) => {
                return Err(ServiceError::from_code(THROUGHPUT_EXCEEDED, "Rate exceeded for shard"))
            }
            None => {}
        }

        let mut streams = lock(&self.streams);
        Ok(active_stream(&mut streams, stream_name)?.append(entry))
    }

    async fn put_records(
        &self,
        stream_name: &str,
        entries: Vec<RecordEntry>,
    ) -> Result<PutRecordsOutput, ServiceError> {
        self.put_calls.fetch_add(1, Ordering::Relaxed);
        let (rejected, reported) = match self.next_failure() {
            Some(InjectedFailure::Transport) => return Err(connection_reset()),
            Some(InjectedFailure::Reject {
                positions,
                reported,
            }) => (positions, reported),
            None => (Vec::new(), true),
        };

        let mut streams = lock(&self.streams);
        let state = active_stream(&mut streams, stream_name)?;

        let mut output = PutRecordsOutput::default();
        for (position, entry) in entries.into_iter().enumerate() {
            if rejected.contains(&position) {
                if reported {
                    output.failed_record_count += 1;
                }
                output
                    .records
                    .push(PutRecordsResultEntry::rejected(THROUGHPUT_EXCEEDED, "Rate exceeded for shard"));
            } else {
                let put = state.append(entry);
                output
                    .records
                    .push(PutRecordsResultEntry::accepted(put.shard_id, put.sequence_number));
            }
        }

        Ok(output)
    }

    fn service_name(&self) -> &'static str {
        "memory"
    }
}
