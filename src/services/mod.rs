//! Services - roster state and the clock it decides against
//!
//! - `roster` - per-trip locked registration, check-in and removal
//! - `clock` - calendar-date source (system or fixed)

pub mod clock;
pub mod roster;

pub use clock::{Clock, FixedClock, SystemClock};
pub use roster::{CallerView, RosterError, TripRoster};
