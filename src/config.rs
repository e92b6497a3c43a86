//! Configuration management for the transaction producer

use crate::delivery::DeliverySettings;
use crate::error::{ProducerError, Result as ProducerResult};
use crate::generator::GeneratorSettings;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Default configuration file, relative to the working directory
pub const DEFAULT_CONFIG_PATH: &str = "config/config.toml";

/// Prefix for environment overrides, e.g. `FRAUD_PRODUCER__PRODUCER__BATCH_SIZE`
pub const ENV_PREFIX: &str = "FRAUD_PRODUCER";

/// PutRecords accepts at most this many records per request
pub const MAX_BATCH_SIZE: usize = 500;

/// Main application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub producer: ProducerConfig,
    #[serde(default)]
    pub aws: AwsConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Synthetic data generation and streaming configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ProducerConfig {
    /// Name of the target stream
    pub stream_name: String,
    /// Record field used as partition key
    pub partition_key_field: String,
    /// Records per PutRecords request
    pub batch_size: usize,
    /// Pause between batches in milliseconds (0 disables pacing)
    pub batch_interval_ms: u64,
    /// Proportion of fraudulent transactions (0.0 to 1.0)
    pub fraud_ratio: f64,
    pub num_merchants: usize,
    pub num_customers: usize,
    /// Seed for reproducible output
    pub seed: Option<u64>,
    /// Stop after this many consecutive batches deliver nothing (0 = never)
    pub max_consecutive_empty_batches: u32,
}

impl Default for ProducerConfig {
    fn default() -> Self {
        Self {
            stream_name: "fraud-transactions".to_string(),
            partition_key_field: "transaction_id".to_string(),
            batch_size: 10,
            batch_interval_ms: 1000,
            fraud_ratio: 0.05,
            num_merchants: 1000,
            num_customers: 5000,
            seed: None,
            max_consecutive_empty_batches: 0,
        }
    }
}

/// Log service endpoint configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AwsConfig {
    pub region: String,
    /// Kinesis-compatible endpoint (LocalStack by default)
    pub endpoint_url: String,
    /// Access key placed in the credential scope
    pub access_key_id: String,
    pub request_timeout_ms: u64,
}

impl Default for AwsConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint_url: "http://localhost:4566".to_string(),
            access_key_id: "test".to_string(),
            request_timeout_ms: 10_000,
        }
    }
}

/// Delivery retry and stream provisioning configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Resubmissions of rejected records per batch
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Shards for a newly created stream
    pub shard_count: u32,
    /// Status polls while waiting for a new stream
    pub stream_ready_attempts: u32,
    pub stream_poll_interval_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay_ms: 500,
            shard_count: 1,
            stream_ready_attempts: 30,
            stream_poll_interval_ms: 1000,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
    /// Log format (json, pretty)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
        }
    }
}

impl LoggingConfig {
    /// True when log lines should be emitted as JSON
    pub fn is_json(&self) -> bool {
        self.format.eq_ignore_ascii_case("json")
    }
}

impl AppConfig {
    /// Load configuration from the default file, if present, and the environment
    pub fn load() -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(DEFAULT_CONFIG_PATH).required(false))
            .add_source(Self::environment())
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    /// Load configuration from a specific path
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Self::environment())
            .build()
            .context("Failed to build configuration")?;

        config
            .try_deserialize()
            .context("Failed to deserialize configuration")
    }

    fn environment() -> Environment {
        Environment::with_prefix(ENV_PREFIX)
            .prefix_separator("__")
            .separator("__")
    }

    /// Reject values the producer cannot run with
    pub fn validate(&self) -> ProducerResult<()> {
        let producer = &self.producer;

        if !(0.0..=1.0).contains(&producer.fraud_ratio) {
            return Err(ProducerError::Config(format!(
                "fraud_ratio must be between 0 and 1, got {}",
                producer.fraud_ratio
            )));
        }
        if producer.batch_size == 0 || producer.batch_size > MAX_BATCH_SIZE {
            return Err(ProducerError::Config(format!(
                "batch_size must be between 1 and {}, got {}",
                MAX_BATCH_SIZE, producer.batch_size
            )));
        }
        if producer.num_merchants == 0 || producer.num_customers == 0 {
            return Err(ProducerError::Config(
                "num_merchants and num_customers must be greater than 0".to_string(),
            ));
        }
        if producer.stream_name.trim().is_empty() {
            return Err(ProducerError::Config("stream_name must not be empty".to_string()));
        }
        if self.delivery.shard_count == 0 {
            return Err(ProducerError::Config(
                "shard_count must be greater than 0".to_string(),
            ));
        }
        if self.delivery.stream_ready_attempts == 0 {
            return Err(ProducerError::Config(
                "stream_ready_attempts must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn generator_settings(&self) -> GeneratorSettings {
        GeneratorSettings {
            fraud_ratio: self.producer.fraud_ratio,
            num_merchants: self.producer.num_merchants,
            num_customers: self.producer.num_customers,
            seed: self.producer.seed,
        }
    }

    pub fn delivery_settings(&self) -> DeliverySettings {
        DeliverySettings {
            stream_name: self.producer.stream_name.clone(),
            partition_key_field: self.producer.partition_key_field.clone(),
            max_retries: self.delivery.max_retries,
            retry_delay: Duration::from_millis(self.delivery.retry_delay_ms),
            stream_ready_attempts: self.delivery.stream_ready_attempts,
            stream_poll_interval: Duration::from_millis(self.delivery.stream_poll_interval_ms),
        }
    }

    pub fn batch_interval(&self) -> Duration {
        Duration::from_millis(self.producer.batch_interval_ms)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.aws.request_timeout_ms)
    }
}
