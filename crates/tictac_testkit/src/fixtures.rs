//! Test fixtures and store helpers.
//!
//! Provides sample records and temporary stores for tests.

use std::ops::Deref;
use tempfile::TempDir;
use tictac_schema::{Game, Player, UnixMillis};
use tictac_store::FileStore;

/// Base timestamp for fixture records (2024-01-01T00:00:00Z).
pub const EPOCH: UnixMillis = 1_704_067_200_000;

/// A file store in a temporary directory, removed on drop.
pub struct TestFileStore {
    /// The store instance.
    pub store: FileStore,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: TempDir,
}

impl TestFileStore {
    /// Creates an empty file store.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let store = FileStore::open(temp_dir.path(), true).expect("Failed to open file store");
        Self {
            store,
            _temp_dir: temp_dir,
        }
    }
}

impl Default for TestFileStore {
    fn default() -> Self {
        Self::new()
    }
}

impl Deref for TestFileStore {
    type Target = FileStore;

    fn deref(&self) -> &Self::Target {
        &self.store
    }
}

/// Creates a player with a valid username.
pub fn player(username: &str) -> Player {
    Player::new(username, EPOCH).expect("fixture username must be valid")
}

/// Three players, one with an email address.
pub fn sample_players() -> Vec<Player> {
    vec![
        player("alice")
            .with_email("alice@example.com")
            .expect("fixture email must be valid"),
        player("bob"),
        player("carol").with_display_name("Carol"),
    ]
}

/// Plays `cells` in order from a fresh game between `x` and `o`.
///
/// Moves are one second apart, starting one second after `started_at`.
pub fn played_game(x: &str, o: &str, started_at: UnixMillis, cells: &[u8]) -> Game {
    let mut game = Game::start(started_at)
        .with_players(Some(x.to_string()), Some(o.to_string()))
        .expect("fixture seats must differ");
    for (i, &cell) in cells.iter().enumerate() {
        let at = started_at + 1_000 * (i as i64 + 1);
        game.play(cell, at).expect("fixture move must be legal");
    }
    game
}

/// Four games: an X win, an O win, a draw, and one still in progress.
pub fn sample_games() -> Vec<Game> {
    vec![
        played_game("alice", "bob", EPOCH, &[0, 3, 1, 4, 2]),
        played_game("bob", "carol", EPOCH + 60_000, &[0, 4, 1, 2, 6, 3, 8, 5]),
        played_game("carol", "alice", EPOCH + 120_000, &[0, 1, 2, 4, 3, 5, 7, 6, 8]),
        played_game("alice", "carol", EPOCH + 180_000, &[4, 0]),
    ]
}
