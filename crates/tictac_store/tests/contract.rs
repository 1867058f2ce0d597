//! Store behaviour against the game-store declarations, for both stores.

use tictac_schema::declarations::{game_store, GAMES, PLAYERS, SCORES};
use tictac_schema::{Document, Game, Player, Scoreboard, Value};
use tictac_store::{FileStore, InMemoryStore, StoreClient, StoreError, StoreResult};

/// Creates every declared collection and index directly through the client.
fn install(store: &impl StoreClient) {
    for collection in &game_store().collections {
        store
            .create_collection(&collection.name, &collection.options)
            .unwrap();
        for index in &collection.indexes {
            store.create_index(&collection.name, index).unwrap();
        }
    }
}

fn player(username: &str) -> Document {
    Player::new(username, 1_700_000_000_000).unwrap().to_document()
}

fn check_uniqueness(insert: impl Fn(&str, Document) -> StoreResult<Value>) {
    insert(PLAYERS, player("alice")).unwrap();
    let second = insert(PLAYERS, player("alice"));
    assert!(matches!(
        second,
        Err(StoreError::DuplicateKey { ref index, .. }) if index == "ux_players_username"
    ));

    // Neither player has an email: the sparse unique index skips both.
    insert(PLAYERS, player("bob")).unwrap();
    insert(PLAYERS, player("carol")).unwrap();

    let dave = Player::new("dave", 0).unwrap().with_email("d@x.io").unwrap();
    let erin = Player::new("erin", 0).unwrap().with_email("d@x.io").unwrap();
    insert(PLAYERS, dave.to_document()).unwrap();
    assert!(matches!(
        insert(PLAYERS, erin.to_document()),
        Err(StoreError::DuplicateKey { ref index, .. }) if index == "ux_players_email"
    ));
}

#[test]
fn memory_store_enforces_declared_uniqueness() {
    let store = InMemoryStore::new();
    install(&store);
    check_uniqueness(|c, d| store.insert(c, d));
    assert_eq!(store.count(PLAYERS).unwrap(), 4);
}

#[test]
fn file_store_enforces_declared_uniqueness() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::open(dir.path(), true).unwrap();
    install(&store);
    check_uniqueness(|c, d| store.insert(c, d));
    drop(store);

    let reopened = FileStore::open(dir.path(), false).unwrap();
    assert_eq!(reopened.count(PLAYERS).unwrap(), 4);
}

#[test]
fn declared_index_names_are_listed() {
    let store = InMemoryStore::new();
    install(&store);
    let games = store.list_index_names(GAMES).unwrap();
    for name in ["_id_", "ix_games_ended_at_desc", "ix_games_winner_ended", "ix_games_players"] {
        assert!(games.contains(name), "missing {name}");
    }
    let scores = store.list_index_names(SCORES).unwrap();
    assert!(scores.contains("ux_scores_user"));
    assert!(scores.contains("ix_scores_leaderboard"));
}

#[test]
fn games_and_scores_round_trip_through_store() {
    let store = InMemoryStore::new();
    install(&store);

    let mut game = Game::start(10)
        .with_players(Some("alice".into()), Some("bob".into()))
        .unwrap();
    for (i, cell) in [0, 4, 1, 5, 2].into_iter().enumerate() {
        game.play(cell, 20 + i as i64).unwrap();
    }
    store.insert(GAMES, game.to_document()).unwrap();

    let board = Scoreboard::from_games(std::slice::from_ref(&game));
    for score in board.iter() {
        store.insert(SCORES, score.to_document()).unwrap();
    }
    assert_eq!(store.count(SCORES).unwrap(), 2);

    let dup = board.get("alice").unwrap().to_document();
    assert!(matches!(
        store.insert(SCORES, dup),
        Err(StoreError::DuplicateKey { .. })
    ));
}

#[test]
fn warn_action_accepts_non_conforming_player() {
    let store = InMemoryStore::new();
    install(&store);
    // Too short for the validator; the declared action only warns.
    store
        .insert(PLAYERS, Document::new().with("username", "al"))
        .unwrap();
    assert_eq!(store.count(PLAYERS).unwrap(), 1);
}
