//! Bookledger
//!
//! Bookledger is the order ledger for a small online bookstore: fixed-point
//! pricing, commission and royalty splits, purchase records, checkout through
//! a simulated card gateway, and author and admin reporting.

pub mod books;
pub mod cart;
pub mod checkout;
pub mod config;
pub mod downloads;
pub mod fixtures;
pub mod ledger;
pub mod payments;
pub mod prelude;
pub mod pricing;
pub mod receipt;
pub mod reports;
pub mod store;
pub mod users;
pub mod utils;
