//! # Tictac Schema
//!
//! Declarative schema for the tic-tac-toe game store.
//!
//! This crate provides:
//! - A document [`Value`] model shared by validators, indexes and stores
//! - Validator rule trees ([`Rule`], [`Validator`]) with rule evaluation
//! - Index key specifications and deterministic index name derivation
//! - The versioned declaration set for `players`, `games` and `scores`
//! - The typed data model ([`Player`], [`Game`], [`Score`]) and the domain
//!   invariants that structural validation cannot express
//!
//! Nothing in this crate talks to a store. Declarations are pure data and
//! are consumed by `tictac_reconcile`.
//!
//! ## Example
//!
//! ```rust
//! use tictac_schema::{derive_index_name, KeySpec};
//!
//! let keys = KeySpec::new().asc("winner").desc("ended_at");
//! assert_eq!(derive_index_name(&keys), "winner_1_ended_at_-1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod collection;
pub mod declarations;
mod error;
mod index;
pub mod model;
mod rule;
mod value;

pub use collection::{CollectionOptions, ValidationAction, ValidationLevel};
pub use declarations::{CollectionDeclaration, SchemaDeclaration, SCHEMA_VERSION};
pub use error::{SchemaError, SchemaResult};
pub use index::{derive_index_name, Filter, IndexDirection, IndexModel, IndexOptions, KeySpec};
pub use model::{Game, Move, Outcome, Player, Score, Scoreboard, Seat, Winner};
pub use rule::{BsonType, ObjectRule, Property, Rule, Validator, Violation};
pub use value::{Document, UnixMillis, Value};
