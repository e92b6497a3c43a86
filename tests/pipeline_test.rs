//! End-to-end producer run against the in-process stream

use fraud_transaction_producer::{
    AppConfig, DeliveryClient, LoopSettings, MemoryStream, ProducerLoop, Transaction,
    TransactionGenerator,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_provision_and_stream_transactions() {
    let mut config = AppConfig::default();
    config.producer.stream_name = "integration-stream".to_string();
    config.producer.fraud_ratio = 0.3;
    config.producer.num_merchants = 25;
    config.producer.num_customers = 100;
    config.producer.seed = Some(2024);
    config.delivery.shard_count = 4;
    config.delivery.stream_poll_interval_ms = 0;
    config.validate().unwrap();

    let memory = Arc::new(MemoryStream::new());
    let client = DeliveryClient::new(memory.clone(), config.delivery_settings());
    client
        .ensure_stream_exists(config.delivery.shard_count)
        .await
        .unwrap();

    let generator = TransactionGenerator::new(config.generator_settings()).unwrap();
    let producer = ProducerLoop::new(
        generator,
        client,
        LoopSettings {
            target: 57,
            batch_size: 20,
            batch_interval: Duration::ZERO,
            max_consecutive_empty_batches: 0,
        },
    );

    let summary = producer.run(CancellationToken::new()).await;

    assert_eq!(summary.total_sent, 57);
    assert_eq!(summary.batches, 3);
    assert!(!summary.cancelled);
    assert_eq!(summary.metrics.records_failed, 0);

    let stored = memory.records("integration-stream");
    assert_eq!(stored.len(), 57);
    assert_eq!(
        summary.metrics.bytes_sent,
        stored.iter().map(|r| r.data.len() as u64).sum::<u64>()
    );

    let mut ids = HashSet::new();
    let mut fraud = 0;
    for record in &stored {
        let transaction: Transaction = serde_json::from_slice(&record.data).unwrap();
        assert_eq!(record.partition_key, transaction.transaction_id);
        assert!(transaction.transaction_id.starts_with('T'));
        assert_eq!(transaction.currency, "USD");
        if transaction.is_fraud {
            fraud += 1;
        }
        ids.insert(transaction.transaction_id);
    }
    assert_eq!(ids.len(), 57);
    assert!(fraud > 0 && fraud < 57);

    let shards: HashSet<_> = stored.iter().map(|r| r.shard_id.clone()).collect();
    assert!(shards.len() > 1);
}

#[tokio::test]
async fn test_same_seed_same_records() {
    let mut config = AppConfig::default();
    config.producer.seed = Some(99);
    config.producer.num_merchants = 10;
    config.producer.num_customers = 10;

    let mut first = TransactionGenerator::new(config.generator_settings()).unwrap();
    let mut second = TransactionGenerator::new(config.generator_settings()).unwrap();

    let now = chrono::Utc::now();
    for _ in 0..20 {
        assert_eq!(
            first.generate_transaction_at(now, None),
            second.generate_transaction_at(now, None)
        );
    }
}
