pub mod breach;
pub mod plans;
pub mod upi;
