//! Transaction generator with fraud-pattern injection
//!
//! Legitimate amounts follow a clamped normal distribution over a
//! per-category range. Half of the fraudulent transactions carry a
//! high-value amount; the other half look amount-normal and are only
//! distinguishable through secondary signals (distance, hour).

use super::pool::{random_id, EntityPool};
use crate::error::{ProducerError, Result};
use crate::types::{CardType, Location, MerchantCategory, Transaction};
use chrono::{DateTime, Duration, Timelike, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};
use serde::Serialize;

/// Width of the timestamp window behind "now"
const TIMESTAMP_WINDOW_SECS: i64 = 86_400;

/// Share of fraudulent transactions that get a high-value amount
const HIGH_VALUE_FRAUD_PROBABILITY: f64 = 0.5;

const HIGH_VALUE_FRAUD_MIN: f64 = 3_000.0;
const HIGH_VALUE_FRAUD_MAX: f64 = 10_000.0;

/// Kilometres per degree at the equator
const KM_PER_DEGREE: f64 = 111.0;

const UNUSUAL_HOUR_START: u32 = 2;
const UNUSUAL_HOUR_END: u32 = 5;

const TRANSACTION_ID_LEN: usize = 32;

/// Inclusive amount range for legitimate transactions
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AmountRange {
    pub min: f64,
    pub max: f64,
}

impl AmountRange {
    /// Range used when a category name is not recognized
    pub const FALLBACK: AmountRange = AmountRange {
        min: 10.0,
        max: 200.0,
    };

    pub fn for_category(category: MerchantCategory) -> Self {
        let (min, max) = match category {
            MerchantCategory::Grocery => (20.0, 150.0),
            MerchantCategory::Restaurant => (15.0, 100.0),
            MerchantCategory::GasStation => (30.0, 80.0),
            MerchantCategory::OnlineRetail => (25.0, 300.0),
            MerchantCategory::Entertainment => (20.0, 150.0),
            MerchantCategory::Travel => (100.0, 1000.0),
            MerchantCategory::Electronics => (50.0, 800.0),
            MerchantCategory::Clothing => (30.0, 250.0),
            MerchantCategory::Healthcare => (50.0, 500.0),
            MerchantCategory::Utilities => (50.0, 300.0),
        };
        Self { min, max }
    }

    /// Range for a category given by wire name, falling back to [`Self::FALLBACK`]
    pub fn for_category_name(name: &str) -> Self {
        MerchantCategory::from_name(name)
            .map(Self::for_category)
            .unwrap_or(Self::FALLBACK)
    }

    pub fn contains(&self, amount: f64) -> bool {
        amount >= self.min && amount <= self.max
    }

    /// Draw from N((min+max)/2, (max-min)/4), clamped into the range.
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        let mean = (self.min + self.max) / 2.0;
        let std_dev = (self.max - self.min) / 4.0;
        match Normal::new(mean, std_dev) {
            Ok(normal) => normal.sample(rng).clamp(self.min, self.max),
            Err(_) => mean,
        }
    }
}

/// Settings for [`TransactionGenerator`]
#[derive(Debug, Clone)]
pub struct GeneratorSettings {
    /// Proportion of fraudulent transactions, within [0, 1]
    pub fraud_ratio: f64,
    pub num_merchants: usize,
    pub num_customers: usize,
    /// Seed for reproducible output
    pub seed: Option<u64>,
}

impl Default for GeneratorSettings {
    fn default() -> Self {
        Self {
            fraud_ratio: 0.05,
            num_merchants: 1000,
            num_customers: 5000,
            seed: None,
        }
    }
}

/// Fraud breakdown of a set of transactions
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FraudStatistics {
    pub total: usize,
    pub fraud_count: usize,
    pub legitimate_count: usize,
    /// Percentage of fraudulent transactions, rounded to 2 decimals
    pub fraud_percentage: f64,
}

/// Generates labeled synthetic transactions from a fixed entity pool.
pub struct TransactionGenerator {
    fraud_ratio: f64,
    pool: EntityPool,
    rng: StdRng,
}

impl TransactionGenerator {
    /// Validate the settings and build the entity pool.
    pub fn new(settings: GeneratorSettings) -> Result<Self> {
        if !(0.0..=1.0).contains(&settings.fraud_ratio) {
            return Err(ProducerError::Config(format!(
                "fraud_ratio must be between 0 and 1, got {}",
                settings.fraud_ratio
            )));
        }

        let mut rng = match settings.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let pool = EntityPool::initialize(settings.num_merchants, settings.num_customers, &mut rng)?;

        Ok(Self {
            fraud_ratio: settings.fraud_ratio,
            pool,
            rng,
        })
    }

    pub fn fraud_ratio(&self) -> f64 {
        self.fraud_ratio
    }

    pub fn pool(&self) -> &EntityPool {
        &self.pool
    }

    /// Generate one transaction. `force_fraud` overrides the random fraud decision.
    pub fn generate_transaction(&mut self, force_fraud: Option<bool>) -> Transaction {
        self.generate_transaction_at(Utc::now(), force_fraud)
    }

    /// Generate one transaction relative to the given clock reading.
    pub fn generate_transaction_at(
        &mut self,
        now: DateTime<Utc>,
        force_fraud: Option<bool>,
    ) -> Transaction {
        let rng = &mut self.rng;

        let is_fraud = force_fraud.unwrap_or_else(|| rng.gen::<f64>() < self.fraud_ratio);

        let customer = self.pool.choose_customer(rng);
        let merchant = self.pool.choose_merchant(rng);

        let offset = rng.gen_range(0..=TIMESTAMP_WINDOW_SECS);
        let timestamp = now - Duration::seconds(offset);

        let range = AmountRange::for_category(merchant.category);
        let amount = if is_fraud && rng.gen_bool(HIGH_VALUE_FRAUD_PROBABILITY) {
            rng.gen_range(HIGH_VALUE_FRAUD_MIN..=HIGH_VALUE_FRAUD_MAX)
        } else {
            range.sample(rng)
        };

        let distance = planar_distance_km(&customer.home_location, &merchant.location);
        let card_type = CardType::ALL[rng.gen_range(0..CardType::ALL.len())];

        Transaction {
            transaction_id: random_id('T', TRANSACTION_ID_LEN, rng),
            timestamp,
            customer_id: customer.customer_id.clone(),
            merchant_id: merchant.merchant_id.clone(),
            merchant_name: merchant.name.clone(),
            merchant_category: merchant.category,
            amount: round_cents(amount),
            currency: "USD".to_string(),
            merchant_location: merchant.location.clone(),
            distance_from_home_km: round_cents(distance),
            is_unusual_hour: is_unusual_hour(&timestamp),
            card_type,
            is_fraud,
        }
    }

    /// Generate `batch_size` transactions in emission order.
    pub fn generate_batch(&mut self, batch_size: usize) -> Vec<Transaction> {
        let now = Utc::now();
        (0..batch_size)
            .map(|_| self.generate_transaction_at(now, None))
            .collect()
    }

    /// Aggregate fraud counts over a set of transactions.
    pub fn fraud_statistics(transactions: &[Transaction]) -> FraudStatistics {
        let total = transactions.len();
        let fraud_count = transactions.iter().filter(|t| t.is_fraud).count();

        // Empty input reports 0% rather than dividing by zero
        let fraud_percentage = if total > 0 {
            round_cents(fraud_count as f64 / total as f64 * 100.0)
        } else {
            0.0
        };

        FraudStatistics {
            total,
            fraud_count,
            legitimate_count: total - fraud_count,
            fraud_percentage,
        }
    }
}

/// Planar approximation of the distance between two points, in km.
pub fn planar_distance_km(a: &Location, b: &Location) -> f64 {
    let lat_diff = a.latitude - b.latitude;
    let lon_diff = a.longitude - b.longitude;
    (lat_diff.powi(2) + lon_diff.powi(2)).sqrt() * KM_PER_DEGREE
}

fn is_unusual_hour(timestamp: &DateTime<Utc>) -> bool {
    (UNUSUAL_HOUR_START..UNUSUAL_HOUR_END).contains(&timestamp.hour())
}

fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
