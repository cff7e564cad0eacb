pub mod aggregate;
pub mod checkins;
pub mod coverage;
pub mod engine;
pub mod historical;
pub mod reconcile;
