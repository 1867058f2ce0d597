//! The versioned schema and index declarations of the game store.
//!
//! ```text
//! players  username (unique), email (unique, sparse)
//! games    ended_at desc, (winner, ended_at desc), (playerX, playerO)
//! scores   user (unique), (wins desc, draws desc)
//! ```
//!
//! Every collection is declared with the `moderate` level and the `warn`
//! action, so tightening a rule never rejects writes against documents
//! that predate it.

use crate::collection::{CollectionOptions, ValidationAction, ValidationLevel};
use crate::error::{SchemaError, SchemaResult};
use crate::index::{IndexModel, IndexOptions, KeySpec};
use crate::rule::{BsonType, ObjectRule, Rule, Validator};
use crate::value::Value;
use std::collections::BTreeSet;

/// Current version of the declaration set.
pub const SCHEMA_VERSION: u32 = 1;

/// Name of the players collection.
pub const PLAYERS: &str = "players";
/// Name of the games collection.
pub const GAMES: &str = "games";
/// Name of the scores collection.
pub const SCORES: &str = "scores";

/// Pattern a player email must match.
pub const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

/// Minimum username length, in characters.
pub const USERNAME_MIN_LEN: usize = 3;
/// Maximum username length, in characters.
pub const USERNAME_MAX_LEN: usize = 64;

/// A declared collection with its validator policy and indexes.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionDeclaration {
    /// Collection name.
    pub name: String,
    /// Validator, level and action.
    pub options: CollectionOptions,
    /// Required indexes, in creation order.
    pub indexes: Vec<IndexModel>,
}

impl CollectionDeclaration {
    /// Declares a collection with no indexes.
    pub fn new(name: impl Into<String>, options: CollectionOptions) -> Self {
        Self {
            name: name.into(),
            options,
            indexes: Vec::new(),
        }
    }

    /// Adds a required index.
    #[must_use]
    pub fn index(mut self, model: IndexModel) -> Self {
        self.indexes.push(model);
        self
    }

    /// Checks the validator and every index for declaration errors.
    ///
    /// # Errors
    ///
    /// Returns the first declaration error found.
    pub fn verify(&self) -> SchemaResult<()> {
        if self.name.is_empty() {
            return Err(SchemaError::invalid_rule("$", "collection name is empty"));
        }
        self.options.validator.verify()?;
        let mut seen = BTreeSet::new();
        for model in &self.indexes {
            model.verify()?;
            let name = model.resolved_name();
            if !seen.insert(name.clone()) {
                return Err(SchemaError::DuplicateIndex {
                    collection: self.name.clone(),
                    name,
                });
            }
        }
        Ok(())
    }
}

/// The full set of declared collections and indexes.
#[derive(Debug, Clone, PartialEq)]
pub struct SchemaDeclaration {
    /// Declaration set version.
    pub version: u32,
    /// Declared collections, in reconciliation order.
    pub collections: Vec<CollectionDeclaration>,
}

impl SchemaDeclaration {
    /// Creates an empty declaration set.
    pub fn new(version: u32) -> Self {
        Self {
            version,
            collections: Vec::new(),
        }
    }

    /// Adds a collection.
    #[must_use]
    pub fn collection(mut self, collection: CollectionDeclaration) -> Self {
        self.collections.push(collection);
        self
    }

    /// Looks up a declared collection by name.
    pub fn get(&self, name: &str) -> Option<&CollectionDeclaration> {
        self.collections.iter().find(|c| c.name == name)
    }

    /// Returns the number of declared indexes across all collections.
    pub fn index_count(&self) -> usize {
        self.collections.iter().map(|c| c.indexes.len()).sum()
    }

    /// Checks the whole declaration set.
    ///
    /// # Errors
    ///
    /// Returns the first declaration error, including collections declared
    /// more than once.
    pub fn verify(&self) -> SchemaResult<()> {
        let mut seen = BTreeSet::new();
        for collection in &self.collections {
            if !seen.insert(collection.name.as_str()) {
                return Err(SchemaError::DuplicateCollection {
                    name: collection.name.clone(),
                });
            }
            collection.verify()?;
        }
        Ok(())
    }
}

/// Returns the declaration set of the tic-tac-toe game store.
pub fn game_store() -> SchemaDeclaration {
    SchemaDeclaration::new(SCHEMA_VERSION)
        .collection(players())
        .collection(games())
        .collection(scores())
}

fn policy(validator: Validator) -> CollectionOptions {
    CollectionOptions::new(validator)
        .level(ValidationLevel::Moderate)
        .action(ValidationAction::Warn)
}

fn optional(ty: BsonType) -> Rule {
    Rule::types([ty, BsonType::Null])
}

fn id_rule() -> Rule {
    Rule::of(BsonType::ObjectId)
}

fn players() -> CollectionDeclaration {
    let validator = Validator::new(
        ObjectRule::new()
            .required(["username"])
            .field("_id", id_rule())
            .property(
                "username",
                Rule::all([
                    Rule::of(BsonType::String),
                    Rule::length(USERNAME_MIN_LEN, USERNAME_MAX_LEN),
                ]),
                "Unique username used to identify a player",
            )
            .property(
                "email",
                Rule::all([optional(BsonType::String), Rule::pattern(EMAIL_PATTERN)]),
                "Optional email for the player",
            )
            .property(
                "password_hash",
                optional(BsonType::String),
                "Optional password hash if authentication is enabled",
            )
            .property("created_at", Rule::of(BsonType::Date), "Creation timestamp")
            .property(
                "display_name",
                optional(BsonType::String),
                "Optional name for UI",
            )
            .property(
                "avatar_url",
                optional(BsonType::String),
                "Optional avatar image URL",
            ),
    );

    CollectionDeclaration::new(PLAYERS, policy(validator))
        .index(IndexModel::new(
            KeySpec::new().asc("username"),
            IndexOptions::new().name("ux_players_username").unique(),
        ))
        .index(IndexModel::new(
            KeySpec::new().asc("email"),
            IndexOptions::new().name("ux_players_email").unique().sparse(),
        ))
}

fn games() -> CollectionDeclaration {
    let seat = || Rule::one_of([Value::from("X"), Value::from("O")]);
    let move_rule = ObjectRule::new()
        .required(["cell", "player", "at"])
        .property(
            "cell",
            Rule::all([Rule::of(BsonType::Int), Rule::between(0.0, 8.0)]),
            "Board cell index 0..8",
        )
        .property(
            "player",
            Rule::all([Rule::of(BsonType::String), seat()]),
            "Player making the move",
        )
        .property("at", Rule::of(BsonType::Date), "Timestamp of the move")
        .additional_properties(false);

    let validator = Validator::new(
        ObjectRule::new()
            .required(["started_at"])
            .field("_id", id_rule())
            .property("started_at", Rule::of(BsonType::Date), "Game start time")
            .property("ended_at", optional(BsonType::Date), "Game end time")
            .property(
                "playerX",
                optional(BsonType::String),
                "Username or guest identifier for X",
            )
            .property(
                "playerO",
                optional(BsonType::String),
                "Username or guest identifier for O",
            )
            .property(
                "playerX_id",
                optional(BsonType::ObjectId),
                "Player id for X (optional)",
            )
            .property(
                "playerO_id",
                optional(BsonType::ObjectId),
                "Player id for O (optional)",
            )
            .property(
                "winner",
                Rule::all([
                    optional(BsonType::String),
                    Rule::one_of([
                        Value::from("X"),
                        Value::from("O"),
                        Value::from("draw"),
                        Value::Null,
                    ]),
                ]),
                "Winner of the game",
            )
            .property(
                "moves",
                Rule::all([
                    Rule::of(BsonType::Array),
                    Rule::items(Rule::all([
                        Rule::of(BsonType::Object),
                        Rule::Object(move_rule),
                    ])),
                ]),
                "List of moves in the game",
            ),
    );

    CollectionDeclaration::new(GAMES, policy(validator))
        .index(IndexModel::new(
            KeySpec::new().desc("ended_at"),
            IndexOptions::new().name("ix_games_ended_at_desc"),
        ))
        .index(IndexModel::new(
            KeySpec::new().asc("winner").desc("ended_at"),
            IndexOptions::new().name("ix_games_winner_ended"),
        ))
        .index(IndexModel::new(
            KeySpec::new().asc("playerX").asc("playerO"),
            IndexOptions::new().name("ix_games_players"),
        ))
}

fn scores() -> CollectionDeclaration {
    let counter = |description| {
        (
            Rule::all([Rule::of(BsonType::Int), Rule::minimum(0.0)]),
            description,
        )
    };
    let (wins, wins_desc) = counter("Total wins");
    let (losses, losses_desc) = counter("Total losses");
    let (draws, draws_desc) = counter("Total draws");

    let validator = Validator::new(
        ObjectRule::new()
            .required(["user", "wins", "losses", "draws", "last_updated"])
            .field("_id", id_rule())
            .property(
                "user",
                Rule::of(BsonType::String),
                "Username or guest identifier, unique",
            )
            .property(
                "user_id",
                optional(BsonType::ObjectId),
                "Reference to players._id (optional)",
            )
            .property("wins", wins, wins_desc)
            .property("losses", losses, losses_desc)
            .property("draws", draws, draws_desc)
            .property(
                "last_updated",
                Rule::of(BsonType::Date),
                "Last updated timestamp",
            ),
    );

    CollectionDeclaration::new(SCORES, policy(validator))
        .index(IndexModel::new(
            KeySpec::new().asc("user"),
            IndexOptions::new().name("ux_scores_user").unique(),
        ))
        .index(IndexModel::new(
            KeySpec::new().desc("wins").desc("draws"),
            IndexOptions::new().name("ix_scores_leaderboard"),
        ))
}
