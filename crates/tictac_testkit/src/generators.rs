//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data
//! that maintains required invariants.

use proptest::prelude::*;
use tictac_schema::{Game, IndexDirection, IndexModel, KeySpec};

use crate::fixtures::EPOCH;

/// Seat labels games are drawn from, so that users recur across games.
pub const LABELS: [&str; 4] = ["alice", "bob", "carol", "dave"];

/// Strategy for generating valid usernames.
pub fn username_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-z][a-z0-9_]{2,15}").expect("Invalid regex")
}

/// Strategy for generating index directions other than text.
pub fn direction_strategy() -> impl Strategy<Value = IndexDirection> {
    prop_oneof![
        Just(IndexDirection::Ascending),
        Just(IndexDirection::Descending),
        Just(IndexDirection::Hashed),
    ]
}

/// Strategy for generating valid key specs: one to three distinct fields.
pub fn key_spec_strategy() -> impl Strategy<Value = KeySpec> {
    (
        prop::collection::btree_set("[a-z][a-z_]{0,11}", 1..4),
        prop::collection::vec(direction_strategy(), 3),
    )
        .prop_map(|(fields, directions)| {
            fields
                .into_iter()
                .zip(directions)
                .fold(KeySpec::new(), |spec, (field, dir)| spec.key(field, dir))
        })
}

/// Strategy for generating index models with derived names.
pub fn index_model_strategy() -> impl Strategy<Value = IndexModel> {
    key_spec_strategy().prop_map(IndexModel::on)
}

/// Strategy for generating an order in which to visit all nine cells.
pub fn cell_order_strategy() -> impl Strategy<Value = Vec<u8>> {
    Just((0u8..9).collect::<Vec<_>>()).prop_shuffle()
}

/// Strategy for generating legal games, finished or not.
///
/// Cells are played in a random order until the game ends or the chosen
/// number of moves is reached. Seats are two distinct labels from
/// [`LABELS`], or occasionally an unlabelled opponent.
pub fn game_strategy() -> impl Strategy<Value = Game> {
    (
        0..LABELS.len(),
        1..LABELS.len(),
        any::<bool>(),
        cell_order_strategy(),
        0usize..=9,
        0i64..86_400_000,
    )
        .prop_map(|(x, offset, labelled_o, cells, moves, start)| {
            let player_x = LABELS[x].to_string();
            let player_o = labelled_o.then(|| LABELS[(x + offset) % LABELS.len()].to_string());
            let started_at = EPOCH + start;
            let mut game = Game::start(started_at)
                .with_players(Some(player_x), player_o)
                .expect("labels are distinct");
            for (i, cell) in cells.into_iter().take(moves).enumerate() {
                if game.is_finished() {
                    break;
                }
                game.play(cell, started_at + 1_000 * (i as i64 + 1))
                    .expect("cells are unused and in range");
            }
            game
        })
}

/// Strategy for generating a history of games.
pub fn games_strategy() -> impl Strategy<Value = Vec<Game>> {
    prop::collection::vec(game_strategy(), 0..16)
}
