//! Merchant and customer entities held by the entity pool

use super::transaction::{Location, MerchantCategory};
use serde::{Deserialize, Serialize};

/// A merchant that transactions are made against
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Merchant {
    /// `M` followed by 12 hex characters
    pub merchant_id: String,
    pub name: String,
    pub category: MerchantCategory,
    pub location: Location,
}

/// A card holder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    /// `C` followed by 12 hex characters
    pub customer_id: String,
    pub name: String,
    pub email: String,
    pub phone: String,
    pub home_location: Location,
}
