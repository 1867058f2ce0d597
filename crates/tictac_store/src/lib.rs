//! # Tictac Store
//!
//! The store capability the reconciliation engine is given, and two
//! implementations of it.
//!
//! The engine never reaches a store ambiently: it is handed something that
//! implements [`StoreClient`]. Stores are expected to make each individual
//! operation atomic. Nothing here coordinates concurrent callers beyond
//! that.
//!
//! ## Available Stores
//!
//! - [`InMemoryStore`] - For tests and ephemeral use. Enforces validators
//!   at their level and action, and unique/sparse/partial indexes.
//! - [`FileStore`] - The same semantics, persisted as JSON in a locked
//!   directory.
//!
//! ## Example
//!
//! ```rust
//! use tictac_schema::CollectionOptions;
//! use tictac_store::{InMemoryStore, StoreClient};
//!
//! let store = InMemoryStore::new();
//! store.create_collection("players", &CollectionOptions::default()).unwrap();
//! assert!(store.list_collection_names().unwrap().contains("players"));
//! assert!(store.list_index_names("players").unwrap().contains("_id_"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod client;
mod error;
mod file;
mod memory;

pub use client::StoreClient;
pub use error::{StoreError, StoreResult};
pub use file::FileStore;
pub use memory::{CollectionState, InMemoryStore, StoreState, ID_INDEX_NAME};
