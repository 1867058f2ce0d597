//! # Tictac Testkit
//!
//! Test utilities for the game store.
//!
//! This crate provides:
//! - Fixtures: sample players and games, and temporary file stores
//! - [`FaultyStore`], a store wrapper that rejects chosen operations or
//!   goes offline after a number of calls
//! - Property-based test generators using proptest
//!
//! ## Usage
//!
//! ```rust
//! use tictac_testkit::prelude::*;
//! use tictac_store::{InMemoryStore, StoreClient};
//!
//! let store = FaultyStore::new(InMemoryStore::new()).offline_after(0);
//! assert!(store.list_collection_names().is_err());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod faulty;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::faulty::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use faulty::*;
pub use fixtures::*;
pub use generators::*;
