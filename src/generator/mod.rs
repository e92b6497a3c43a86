//! Synthetic transaction generation

pub mod pool;
pub mod transaction;

pub use pool::EntityPool;
pub use transaction::{AmountRange, FraudStatistics, GeneratorSettings, TransactionGenerator};
