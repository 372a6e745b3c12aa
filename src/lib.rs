//! Vitalog: food journal and diet tracker.
//!
//! The library side of this package is the sync server; the client logic
//! lives in `vitalog-core`.

pub mod server;
