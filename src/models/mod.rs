//! Data models for the delivery slots server

pub mod delivery_slot;
pub mod user;

// Re-export commonly used types
pub use delivery_slot::{DayAvailability, DaySchedule, TimeWindow};
pub use user::{Role, UserClaims};
