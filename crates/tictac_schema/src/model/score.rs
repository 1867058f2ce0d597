//! Aggregated scores.

use super::game::{Game, Seat};
use crate::error::{SchemaError, SchemaResult};
use crate::value::{Document, UnixMillis, Value};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Result of a finished game from one participant's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The participant completed a line.
    Win,
    /// The opponent completed a line.
    Loss,
    /// Nobody completed a line.
    Draw,
}

/// Running totals for one user.
///
/// Counters only ever grow, and `wins + losses + draws` equals the number
/// of completed games the user took part in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    /// Store-assigned identifier, once persisted.
    pub id: Option<Uuid>,
    /// Aggregation key: a username or a guest tag.
    pub user: String,
    /// Player id, when the user is registered.
    pub user_id: Option<Uuid>,
    /// Games won.
    pub wins: u32,
    /// Games lost.
    pub losses: u32,
    /// Games drawn.
    pub draws: u32,
    /// Time of the last change.
    pub last_updated: UnixMillis,
}

impl Score {
    /// Creates an empty score.
    pub fn new(user: impl Into<String>, created_at: UnixMillis) -> Self {
        Self {
            id: None,
            user: user.into(),
            user_id: None,
            wins: 0,
            losses: 0,
            draws: 0,
            last_updated: created_at,
        }
    }

    /// Adds one result.
    pub fn record(&mut self, outcome: Outcome, at: UnixMillis) {
        match outcome {
            Outcome::Win => self.wins += 1,
            Outcome::Loss => self.losses += 1,
            Outcome::Draw => self.draws += 1,
        }
        self.last_updated = self.last_updated.max(at);
    }

    /// Returns the number of recorded results.
    pub fn total(&self) -> u64 {
        u64::from(self.wins) + u64::from(self.losses) + u64::from(self.draws)
    }

    /// Converts the score into a stored document.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(id) = self.id {
            doc.insert("_id", id);
        }
        doc.insert("user", self.user.as_str());
        if let Some(id) = self.user_id {
            doc.insert("user_id", id);
        }
        doc.insert("wins", self.wins);
        doc.insert("losses", self.losses);
        doc.insert("draws", self.draws);
        doc.insert("last_updated", Value::Timestamp(self.last_updated));
        doc
    }
}

/// Scores keyed by user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Scoreboard {
    scores: BTreeMap<String, Score>,
}

impl Scoreboard {
    /// Creates an empty scoreboard.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Aggregates every finished game into per-user scores.
    ///
    /// Seats without a label (an AI or anonymous opponent) are not scored.
    pub fn from_games(games: &[Game]) -> Self {
        let mut board = Self::new();
        for game in games {
            board.record_game(game);
        }
        board
    }

    /// Records the outcome of one game for each labelled participant.
    ///
    /// Unfinished games are ignored. A finished game missing `ended_at` is
    /// stamped with its last move, or its start if it has none.
    pub fn record_game(&mut self, game: &Game) {
        if !game.is_finished() {
            return;
        }
        let ended_at = game
            .ended_at
            .or_else(|| game.moves.last().map(|m| m.at))
            .unwrap_or(game.started_at);
        for (seat, label) in game.participants() {
            let Some(outcome) = game.outcome_for(label) else {
                continue;
            };
            let score = self
                .scores
                .entry(label.to_string())
                .or_insert_with(|| Score::new(label, ended_at));
            if score.user_id.is_none() {
                score.user_id = match seat {
                    Seat::X => game.player_x_id,
                    Seat::O => game.player_o_id,
                };
            }
            score.record(outcome, ended_at);
        }
    }

    /// Inserts or replaces a score.
    pub fn insert(&mut self, score: Score) {
        self.scores.insert(score.user.clone(), score);
    }

    /// Returns a user's score.
    pub fn get(&self, user: &str) -> Option<&Score> {
        self.scores.get(user)
    }

    /// Iterates over scores ordered by user.
    pub fn iter(&self) -> impl Iterator<Item = &Score> {
        self.scores.values()
    }

    /// Returns the number of users with a score.
    pub fn len(&self) -> usize {
        self.scores.len()
    }

    /// Returns true if no user has a score.
    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    /// Returns scores ordered by wins, then draws, both descending.
    pub fn leaderboard(&self) -> Vec<&Score> {
        let mut ranked: Vec<_> = self.scores.values().collect();
        ranked.sort_by(|a, b| b.wins.cmp(&a.wins).then(b.draws.cmp(&a.draws)));
        ranked
    }

    /// Checks that every user's totals match the completed games.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::InconsistentScore`] for the first user whose
    /// `wins + losses + draws` differs from the number of completed games
    /// they took part in.
    pub fn check_against(&self, games: &[Game]) -> SchemaResult<()> {
        let mut expected: BTreeMap<&str, u64> = BTreeMap::new();
        for game in games.iter().filter(|g| g.is_finished()) {
            for (_, label) in game.participants() {
                *expected.entry(label).or_default() += 1;
            }
        }
        for score in self.scores.values() {
            let want = expected.remove(score.user.as_str()).unwrap_or(0);
            if score.total() != want {
                return Err(SchemaError::InconsistentScore {
                    user: score.user.clone(),
                    recorded: score.total(),
                    expected: want,
                });
            }
        }
        if let Some((user, want)) = expected.into_iter().next() {
            return Err(SchemaError::InconsistentScore {
                user: user.to_string(),
                recorded: 0,
                expected: want,
            });
        }
        Ok(())
    }
}
