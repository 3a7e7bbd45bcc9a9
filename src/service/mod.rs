pub mod breach;
pub mod credentials;
pub mod entitlements;
pub mod password_gen;
pub mod password_health;
pub mod threat;
