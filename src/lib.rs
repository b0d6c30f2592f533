//! Trip roster library
//!
//! Exposes modules for integration testing and the `rosterctl` client.

pub mod domain;
pub mod infra;
pub mod io;
pub mod services;
