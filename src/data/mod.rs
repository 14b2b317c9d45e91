//! Data layer module
//!
//! Handles all data persistence:
//! - SQLite credential store (users, accounts)

mod database;
mod models;

pub use database::Database;
pub use models::*;
