//! # Tictac Reconcile
//!
//! Brings a live document store in line with a declared set of collections,
//! validators and indexes.
//!
//! A pass is sequential and idempotent: it re-reads live state for every
//! item instead of trusting anything remembered from an earlier run, so it
//! is safe to invoke on every deployment and after a concurrent partial
//! success.
//!
//! ## Outcomes
//!
//! Every declared collection and index gets exactly one [`Outcome`] in the
//! [`ReconcileReport`]. A rejection of one item never stops the others.
//! Losing the store itself ends the pass with
//! [`ReconcileError::Connectivity`].
//!
//! ## Example
//!
//! ```rust
//! use tictac_reconcile::{ReconcileConfig, Reconciler};
//! use tictac_schema::declarations::game_store;
//! use tictac_store::InMemoryStore;
//!
//! let store = InMemoryStore::new();
//! let reconciler = Reconciler::new(ReconcileConfig::default(), &store);
//!
//! let first = reconciler.reconcile(&game_store()).unwrap();
//! assert!(first.is_success());
//!
//! let second = reconciler.reconcile(&game_store()).unwrap();
//! assert!(second.is_success());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod report;

pub use config::{IndexCheck, ReconcileConfig, ValidatorWrites};
pub use engine::{reconcile, Reconciler};
pub use error::{ReconcileError, ReconcileResult};
pub use report::{Outcome, OutcomeKind, ReconcileItem, ReconcileReport, Target};
