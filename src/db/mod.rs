//! Database module: models, schema and queries for persistent storage.
//!
//! Layout:
//! - `models.rs`: Rust structs mirroring DB rows
//! - `schema.rs`: SQL DDL for initializing the database (SQLite-first)
//! - `sqlite.rs`: pool, schema bootstrap, accounts and sessions
//! - `vaults.rs`, `billing.rs`, `scans.rs`: per-area queries on the same storage

pub mod billing;
pub mod models;
pub mod scans;
pub mod schema;
pub mod sqlite;
pub mod vaults;

pub use billing::AdminStats;
pub use schema::SQLITE_INIT;
pub use sqlite::{SqlitePool, VaultStorage};
pub use vaults::{EntryInsert, NewPassword, NewVault, PasswordPatch, VaultPatch};
