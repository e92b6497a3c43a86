//! Sample Transaction Generator
//!
//! Prints generated transactions as JSON for inspection, without touching
//! any stream.

use clap::Parser;
use fraud_transaction_producer::generator::{GeneratorSettings, TransactionGenerator};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "sample-transactions")]
#[command(about = "Print synthetic transactions and their fraud statistics")]
struct Args {
    /// Number of transactions to generate
    #[arg(short = 'n', long, default_value_t = 100)]
    count: usize,

    /// Proportion of fraudulent transactions
    #[arg(short, long, default_value_t = 0.05)]
    fraud_ratio: f64,

    /// Print every Nth transaction after the first ten
    #[arg(long, default_value_t = 10)]
    every: usize,

    #[arg(long, default_value_t = 1000)]
    num_merchants: usize,

    #[arg(long, default_value_t = 5000)]
    num_customers: usize,

    /// Seed for reproducible output
    #[arg(long)]
    seed: Option<u64>,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("sample_transactions=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    info!(
        count = args.count,
        fraud_ratio = args.fraud_ratio,
        seed = ?args.seed,
        "Generating sample transactions"
    );

    let mut generator = TransactionGenerator::new(GeneratorSettings {
        fraud_ratio: args.fraud_ratio,
        num_merchants: args.num_merchants,
        num_customers: args.num_customers,
        seed: args.seed,
    })?;

    let transactions = generator.generate_batch(args.count);
    let every = args.every.max(1);

    for (i, transaction) in transactions.iter().enumerate() {
        if i < 10 || (i + 1) % every == 0 {
            println!("{}", serde_json::to_string_pretty(transaction)?);
        }
    }

    let stats = TransactionGenerator::fraud_statistics(&transactions);
    println!("{}", serde_json::to_string_pretty(&stats)?);

    info!(
        total = stats.total,
        fraud_count = stats.fraud_count,
        legitimate_count = stats.legitimate_count,
        fraud_percentage = stats.fraud_percentage,
        "Done"
    );

    Ok(())
}
