//! Transaction data structures emitted to the stream

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Merchant category. Each category has its own legitimate amount range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MerchantCategory {
    Grocery,
    Restaurant,
    GasStation,
    OnlineRetail,
    Entertainment,
    Travel,
    Electronics,
    Clothing,
    Healthcare,
    Utilities,
}

impl MerchantCategory {
    pub const ALL: [MerchantCategory; 10] = [
        MerchantCategory::Grocery,
        MerchantCategory::Restaurant,
        MerchantCategory::GasStation,
        MerchantCategory::OnlineRetail,
        MerchantCategory::Entertainment,
        MerchantCategory::Travel,
        MerchantCategory::Electronics,
        MerchantCategory::Clothing,
        MerchantCategory::Healthcare,
        MerchantCategory::Utilities,
    ];

    /// Wire name of the category
    pub fn as_str(&self) -> &'static str {
        match self {
            MerchantCategory::Grocery => "grocery",
            MerchantCategory::Restaurant => "restaurant",
            MerchantCategory::GasStation => "gas_station",
            MerchantCategory::OnlineRetail => "online_retail",
            MerchantCategory::Entertainment => "entertainment",
            MerchantCategory::Travel => "travel",
            MerchantCategory::Electronics => "electronics",
            MerchantCategory::Clothing => "clothing",
            MerchantCategory::Healthcare => "healthcare",
            MerchantCategory::Utilities => "utilities",
        }
    }

    /// Look up a category by its wire name
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == name)
    }
}

/// Card brand
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CardType {
    Visa,
    Mastercard,
    Amex,
    Discover,
}

impl CardType {
    pub const ALL: [CardType; 4] = [
        CardType::Visa,
        CardType::Mastercard,
        CardType::Amex,
        CardType::Discover,
    ];
}

/// Geographic location of a merchant or a customer's home
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub city: String,
    /// State abbreviation
    #[serde(rename = "state")]
    pub region: String,
    pub country: String,
    pub latitude: f64,
    pub longitude: f64,
}

/// A synthetic credit card transaction, labeled with its ground truth
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier (also the default partition key)
    pub transaction_id: String,

    /// Event time, up to 24 hours before generation
    pub timestamp: DateTime<Utc>,

    pub customer_id: String,
    pub merchant_id: String,
    pub merchant_name: String,
    pub merchant_category: MerchantCategory,

    /// Amount in `currency`, rounded to cents
    pub amount: f64,

    pub currency: String,

    /// Snapshot of the merchant location at generation time
    pub merchant_location: Location,

    /// Planar distance between the customer's home and the merchant
    pub distance_from_home_km: f64,

    /// True when the transaction falls between 02:00 and 05:00 UTC
    pub is_unusual_hour: bool,

    pub card_type: CardType,

    /// Ground truth label for model training
    pub is_fraud: bool,
}

impl Transaction {
    /// Canonical JSON encoding, as sent to the stream
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample() -> Transaction {
        Transaction {
            transaction_id: "T0123456789abcdef0123456789abcdef".to_string(),
            timestamp: Utc.with_ymd_and_hms(2024, 3, 1, 3, 15, 0).unwrap(),
            customer_id: "C0123456789ab".to_string(),
            merchant_id: "M0123456789ab".to_string(),
            merchant_name: "Acme Corp".to_string(),
            merchant_category: MerchantCategory::GasStation,
            amount: 42.5,
            currency: "USD".to_string(),
            merchant_location: Location {
                city: "Springfield".to_string(),
                region: "IL".to_string(),
                country: "US".to_string(),
                latitude: 39.78,
                longitude: -89.65,
            },
            distance_from_home_km: 12.34,
            is_unusual_hour: true,
            card_type: CardType::Mastercard,
            is_fraud: false,
        }
    }

    #[test]
    fn test_transaction_wire_format() {
        let json: serde_json::Value = serde_json::from_str(&sample().to_json().unwrap()).unwrap();

        assert_eq!(json["merchant_category"], "gas_station");
        assert_eq!(json["card_type"], "mastercard");
        assert_eq!(json["merchant_location"]["state"], "IL");
        assert_eq!(json["timestamp"], "2024-03-01T03:15:00Z");
        assert_eq!(json["is_fraud"], false);
    }

    #[test]
    fn test_category_names() {
        for category in MerchantCategory::ALL {
            assert_eq!(MerchantCategory::from_name(category.as_str()), Some(category));
        }
        assert_eq!(MerchantCategory::from_name("casino"), None);
    }
}
