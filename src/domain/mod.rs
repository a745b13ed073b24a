//! Core domain types and logic.

pub mod record;
pub mod month;
pub mod aggregate;
pub mod interchange;
pub mod display;
pub mod brokers;
pub mod ledger;
pub mod config_validation;
pub mod error;
