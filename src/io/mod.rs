//! IO modules - everything that crosses the process boundary
//!
//! - `api` - HTTP API and Prometheus endpoint (hyper)
//! - `store` - trip persistence (JSON files or memory)
//! - `identity` - caller identity from proxy headers

pub mod api;
pub mod identity;
pub mod store;

pub use api::{serve, start_api_server, ApiState};
pub use identity::{HeaderIdentity, IdentityError, IdentityProvider};
pub use store::{JsonDirStore, MemoryStore, StoreError, TripStore};
