//! Fraud Transaction Producer Library
//!
//! Generates labeled synthetic credit card transactions and streams them
//! in batches to a Kinesis-compatible partitioned log.

pub mod config;
pub mod delivery;
pub mod error;
pub mod generator;
pub mod metrics;
pub mod pipeline;
pub mod stream;
pub mod types;

pub use config::AppConfig;
pub use delivery::{BatchOutcome, DeliveryClient, DeliverySettings};
pub use error::{ProducerError, ServiceError};
pub use generator::{EntityPool, GeneratorSettings, TransactionGenerator};
pub use metrics::{MetricsSnapshot, RunSummary};
pub use pipeline::{LoopSettings, ProducerLoop};
pub use stream::{KinesisClient, MemoryStream, StreamService};
pub use types::Transaction;
