//! Fraud Transaction Producer - Main Entry Point
//!
//! Generates synthetic labeled transactions and streams them to a
//! Kinesis-compatible log until the requested count is delivered.

use anyhow::{Context, Result};
use clap::Parser;
use fraud_transaction_producer::{
    config::{AppConfig, LoggingConfig},
    pipeline::{LoopSettings, ProducerLoop},
    stream::{KinesisClient, MemoryStream, StreamService},
    DeliveryClient, TransactionGenerator,
};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "fraud-producer")]
#[command(about = "Stream synthetic credit card transactions to a Kinesis-compatible log")]
#[command(version)]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of transactions to deliver
    #[arg(short = 'n', long, default_value_t = 100)]
    num_transactions: u64,

    /// Records per batch (overrides config)
    #[arg(short, long)]
    batch_size: Option<usize>,

    /// Target stream name (overrides config)
    #[arg(short, long)]
    stream_name: Option<String>,

    /// Service endpoint URL (overrides config)
    #[arg(long)]
    endpoint: Option<String>,

    /// Seed for reproducible output (overrides config)
    #[arg(long)]
    seed: Option<u64>,

    /// Deliver to an in-process stream instead of the network
    #[arg(long)]
    dry_run: bool,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(batch_size) = self.batch_size {
            config.producer.batch_size = batch_size;
        }
        if let Some(stream_name) = &self.stream_name {
            config.producer.stream_name = stream_name.clone();
        }
        if let Some(endpoint) = &self.endpoint {
            config.aws.endpoint_url = endpoint.clone();
        }
        if self.seed.is_some() {
            config.producer.seed = self.seed;
        }
    }
}

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&logging.level)
            .with_context(|| format!("Invalid log level: {}", logging.level))?,
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if logging.is_json() {
        builder.json().init();
    } else {
        builder.pretty().init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Load configuration
    let mut config = match &args.config {
        Some(path) => AppConfig::load_from_path(path)
            .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
        None => AppConfig::load()?,
    };
    args.apply(&mut config);
    config.validate().context("Invalid configuration")?;

    init_logging(&config.logging)?;

    info!("Starting Fraud Transaction Producer");
    info!(
        stream_name = %config.producer.stream_name,
        batch_size = config.producer.batch_size,
        fraud_ratio = config.producer.fraud_ratio,
        num_transactions = args.num_transactions,
        dry_run = args.dry_run,
        "Configuration loaded"
    );

    let generator = TransactionGenerator::new(config.generator_settings())
        .context("Failed to initialize transaction generator")?;
    info!(
        merchants = generator.pool().merchant_count(),
        customers = generator.pool().customer_count(),
        "Entity pool initialized"
    );

    let service: Arc<dyn StreamService> = if args.dry_run {
        Arc::new(MemoryStream::new())
    } else {
        Arc::new(
            KinesisClient::new(
                &config.aws.endpoint_url,
                &config.aws.region,
                &config.aws.access_key_id,
                config.request_timeout(),
            )
            .context("Failed to build Kinesis client")?,
        )
    };

    let client = DeliveryClient::new(service, config.delivery_settings());
    client
        .ensure_stream_exists(config.delivery.shard_count)
        .await
        .with_context(|| format!("Stream {} is not available", config.producer.stream_name))?;

    let cancel = CancellationToken::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Shutdown signal received, finishing current batch");
            shutdown.cancel();
        }
    });

    let producer = ProducerLoop::new(
        generator,
        client,
        LoopSettings {
            target: args.num_transactions,
            batch_size: config.producer.batch_size,
            batch_interval: config.batch_interval(),
            max_consecutive_empty_batches: config.producer.max_consecutive_empty_batches,
        },
    );

    let summary = producer.run(cancel).await;

    // Box summary is for human-readable output only
    if !config.logging.is_json() {
        summary.print_summary();
    }

    Ok(())
}
