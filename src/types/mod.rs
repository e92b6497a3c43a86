//! Type definitions for the transaction producer

pub mod entity;
pub mod transaction;

pub use entity::{Customer, Merchant};
pub use transaction::{CardType, Location, MerchantCategory, Transaction};
