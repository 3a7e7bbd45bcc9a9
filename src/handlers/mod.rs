//! HTTP handlers, one module per API area.

pub mod admin;
pub mod auth;
pub mod billing;
pub mod health;
pub mod passwords;
pub mod security;
pub mod vaults;
