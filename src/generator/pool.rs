//! Fixed population of merchants and customers
//!
//! The pool is generated once from the generator's RNG and never mutated,
//! so a seeded generator always sees the same population.

use crate::error::{ProducerError, Result};
use crate::types::{Customer, Location, Merchant, MerchantCategory};
use fake::faker::address::en::{CityName, StateAbbr};
use fake::faker::company::en::CompanyName;
use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::faker::phone_number::en::PhoneNumber;
use fake::Fake;
use rand::Rng;

/// Hex characters kept for merchant and customer identifiers
const ENTITY_ID_LEN: usize = 12;

/// Pre-generated merchants and customers reused across transactions.
#[derive(Debug, Clone)]
pub struct EntityPool {
    merchants: Vec<Merchant>,
    customers: Vec<Customer>,
}

impl EntityPool {
    /// Build the pool. Both counts must be non-zero.
    pub fn initialize<R: Rng + ?Sized>(
        num_merchants: usize,
        num_customers: usize,
        rng: &mut R,
    ) -> Result<Self> {
        if num_merchants == 0 {
            return Err(ProducerError::Config(
                "num_merchants must be greater than 0".to_string(),
            ));
        }
        if num_customers == 0 {
            return Err(ProducerError::Config(
                "num_customers must be greater than 0".to_string(),
            ));
        }

        let merchants = (0..num_merchants).map(|_| generate_merchant(rng)).collect();
        let customers = (0..num_customers).map(|_| generate_customer(rng)).collect();

        Ok(Self {
            merchants,
            customers,
        })
    }

    pub fn merchants(&self) -> &[Merchant] {
        &self.merchants
    }

    pub fn customers(&self) -> &[Customer] {
        &self.customers
    }

    pub fn merchant(&self, index: usize) -> Option<&Merchant> {
        self.merchants.get(index)
    }

    pub fn customer(&self, index: usize) -> Option<&Customer> {
        self.customers.get(index)
    }

    pub fn merchant_count(&self) -> usize {
        self.merchants.len()
    }

    pub fn customer_count(&self) -> usize {
        self.customers.len()
    }

    /// Pick a merchant uniformly at random
    pub fn choose_merchant<R: Rng + ?Sized>(&self, rng: &mut R) -> &Merchant {
        &self.merchants[rng.gen_range(0..self.merchants.len())]
    }

    /// Pick a customer uniformly at random
    pub fn choose_customer<R: Rng + ?Sized>(&self, rng: &mut R) -> &Customer {
        &self.customers[rng.gen_range(0..self.customers.len())]
    }
}

/// Identifier made of `prefix` and `len` hex characters drawn from `rng`.
pub(crate) fn random_id<R: Rng + ?Sized>(prefix: char, len: usize, rng: &mut R) -> String {
    let uuid = uuid::Builder::from_random_bytes(rng.gen()).into_uuid();
    let hex = uuid.simple().to_string();
    format!("{}{}", prefix, &hex[..len.min(hex.len())])
}

fn generate_location<R: Rng + ?Sized>(rng: &mut R) -> Location {
    Location {
        city: CityName().fake_with_rng(rng),
        region: StateAbbr().fake_with_rng(rng),
        country: "US".to_string(),
        latitude: rng.gen_range(-90.0..=90.0),
        longitude: rng.gen_range(-180.0..=180.0),
    }
}

fn generate_merchant<R: Rng + ?Sized>(rng: &mut R) -> Merchant {
    Merchant {
        merchant_id: random_id('M', ENTITY_ID_LEN, rng),
        name: CompanyName().fake_with_rng(rng),
        category: MerchantCategory::ALL[rng.gen_range(0..MerchantCategory::ALL.len())],
        location: generate_location(rng),
    }
}

fn generate_customer<R: Rng + ?Sized>(rng: &mut R) -> Customer {
    Customer {
        customer_id: random_id('C', ENTITY_ID_LEN, rng),
        name: Name().fake_with_rng(rng),
        email: SafeEmail().fake_with_rng(rng),
        phone: PhoneNumber().fake_with_rng(rng),
        home_location: generate_location(rng),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_pool_sizes() {
        let mut rng = StdRng::seed_from_u64(7);
        let pool = EntityPool::initialize(100, 200, &mut rng).unwrap();

        assert_eq!(pool.merchants().len(), 100);
        assert_eq!(pool.customers().len(), 200);
        assert_eq!(pool.merchant_count(), 100);
        assert_eq!(pool.customer_count(), 200);
    }

    #[test]
    fn test_indexed_access() {
        let mut rng = StdRng::seed_from_u64(3);
        let pool = EntityPool::initialize(5, 8, &mut rng).unwrap();

        assert_eq!(pool.merchant(4), pool.merchants().last());
        assert_eq!(pool.customer(0), pool.customers().first());
        assert!(pool.merchant(5).is_none());
        assert!(pool.customer(8).is_none());
    }

    #[test]
    fn test_zero_counts_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        assert!(matches!(
            EntityPool::initialize(0, 10, &mut rng),
            Err(ProducerError::Config(_))
        ));
        assert!(matches!(
            EntityPool::initialize(10, 0, &mut rng),
            Err(ProducerError::Config(_))
        ));
    }

    #[test]
    fn test_entity_shape() {
        let mut rng = StdRng::seed_from_u64(11);
        let pool = EntityPool::initialize(20, 20, &mut rng).unwrap();

        for merchant in pool.merchants() {
            assert_eq!(merchant.merchant_id.len(), 1 + ENTITY_ID_LEN);
            assert!(merchant.merchant_id.starts_with('M'));
            assert!(merchant.merchant_id[1..].chars().all(|c| c.is_ascii_hexdigit()));
            assert!((-90.0..=90.0).contains(&merchant.location.latitude));
            assert!((-180.0..=180.0).contains(&merchant.location.longitude));
            assert_eq!(merchant.location.country, "US");
        }
        for customer in pool.customers() {
            assert!(customer.customer_id.starts_with('C'));
            assert!(customer.email.contains('@'));
        }
    }

    #[test]
    fn test_seeded_pools_match() {
        let a = EntityPool::initialize(30, 30, &mut StdRng::seed_from_u64(99)).unwrap();
        let b = EntityPool::initialize(30, 30, &mut StdRng::seed_from_u64(99)).unwrap();

        assert_eq!(a.merchants(), b.merchants());
        assert_eq!(a.customers(), b.customers());
    }
}
