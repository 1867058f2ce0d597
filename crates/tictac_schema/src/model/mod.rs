//! Typed data model for players, games and scores.
//!
//! Validators only enforce the structural shape of stored documents. The
//! rules of play (move alternation, unique cells, consistent winners) and
//! the score aggregate invariant live here.

mod game;
mod player;
mod score;

pub use game::{Game, Move, Seat, Winner, WINNING_LINES};
pub use player::Player;
pub use score::{Outcome, Score, Scoreboard};
