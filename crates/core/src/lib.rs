//! Domain vocabulary for the fundbridge crowdfunding platform.
//!
//! This crate has no internal dependencies so it can be shared by the
//! persistence layer, the funding engine, and the HTTP surface. It holds
//! identifiers, the error taxonomy, status enums with their transition
//! tables, and the pure arithmetic behind the campaign ledger.

pub mod audit;
pub mod campaign;
pub mod donation;
pub mod error;
pub mod hashing;
pub mod money;
pub mod notification;
pub mod roles;
pub mod task;
pub mod types;
