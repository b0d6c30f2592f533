//! Domain models - trips, registrants and the roster state machine
//!
//! - `Trip` - one trip's bus list and waitlist, with register/check-in/remove
//! - `Registrant` - a person on a trip and their check-in flag
//! - `Email` - case-insensitive registrant key
//! - `Caller` - verified identity driving an operation

pub mod trip;
pub mod types;

// Re-export commonly used types at module level
pub use trip::{Placement, RegistrationStatus, Removal, Trip, TripError, TripSummary};
pub use types::{Caller, CheckInStatus, Email, ListKind, Registrant};
