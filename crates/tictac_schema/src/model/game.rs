//! Games and moves.

use super::score::Outcome;
use crate::error::{SchemaError, SchemaResult};
use crate::value::{Document, UnixMillis, Value};
use uuid::Uuid;

/// The eight lines that win a game.
pub const WINNING_LINES: [[u8; 3]; 8] = [
    [0, 1, 2],
    [3, 4, 5],
    [6, 7, 8],
    [0, 3, 6],
    [1, 4, 7],
    [2, 5, 8],
    [0, 4, 8],
    [2, 4, 6],
];

const CELLS: usize = 9;

/// One of the two seats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Seat {
    /// Moves first.
    X,
    /// Moves second.
    O,
}

impl Seat {
    /// Returns the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Seat::X => "X",
            Seat::O => "O",
        }
    }

    /// Returns the opposing seat.
    pub fn other(&self) -> Seat {
        match self {
            Seat::X => Seat::O,
            Seat::O => Seat::X,
        }
    }
}

/// Final result of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Winner {
    /// X completed a line.
    X,
    /// O completed a line.
    O,
    /// The board filled up without a line.
    Draw,
}

impl Winner {
    /// Returns the stored representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Winner::X => "X",
            Winner::O => "O",
            Winner::Draw => "draw",
        }
    }
}

impl From<Seat> for Winner {
    fn from(seat: Seat) -> Self {
        match seat {
            Seat::X => Winner::X,
            Seat::O => Winner::O,
        }
    }
}

/// A single move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Move {
    /// Board cell, 0 through 8, row-major.
    pub cell: u8,
    /// Seat that played.
    pub player: Seat,
    /// When the move was played.
    pub at: UnixMillis,
}

impl Move {
    /// Converts the move into its stored form.
    pub fn to_document(&self) -> Document {
        Document::new()
            .with("cell", i64::from(self.cell))
            .with("player", self.player.as_str())
            .with("at", Value::Timestamp(self.at))
    }
}

/// A game between two seats.
///
/// Games are built up through [`Game::play`], which enforces the rules of
/// play and settles the winner. Loaded games can be re-checked with
/// [`Game::validate`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    /// Store-assigned identifier, once persisted.
    pub id: Option<Uuid>,
    /// When the game started.
    pub started_at: UnixMillis,
    /// When the game ended; absent while in progress.
    pub ended_at: Option<UnixMillis>,
    /// Username or guest tag holding X.
    pub player_x: Option<String>,
    /// Username or guest tag holding O.
    pub player_o: Option<String>,
    /// Player id holding X, when registered.
    pub player_x_id: Option<Uuid>,
    /// Player id holding O, when registered.
    pub player_o_id: Option<Uuid>,
    /// Result; absent while in progress.
    pub winner: Option<Winner>,
    /// Moves in play order.
    pub moves: Vec<Move>,
}

impl Game {
    /// Starts a game with no moves and empty seats.
    pub fn start(started_at: UnixMillis) -> Self {
        Self {
            id: None,
            started_at,
            ended_at: None,
            player_x: None,
            player_o: None,
            player_x_id: None,
            player_o_id: None,
            winner: None,
            moves: Vec::new(),
        }
    }

    /// Assigns seat labels.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::SameSeatLabels`] if both seats carry the same
    /// label.
    pub fn with_players(
        mut self,
        player_x: Option<String>,
        player_o: Option<String>,
    ) -> SchemaResult<Self> {
        if let (Some(x), Some(o)) = (&player_x, &player_o) {
            if x == o {
                return Err(SchemaError::SameSeatLabels { label: x.clone() });
            }
        }
        self.player_x = player_x;
        self.player_o = player_o;
        Ok(self)
    }

    /// Links seats to registered player ids.
    #[must_use]
    pub fn with_player_ids(mut self, player_x_id: Option<Uuid>, player_o_id: Option<Uuid>) -> Self {
        self.player_x_id = player_x_id;
        self.player_o_id = player_o_id;
        self
    }

    /// Returns true once a winner or draw has been settled.
    pub fn is_finished(&self) -> bool {
        self.winner.is_some()
    }

    /// Returns the seat to move, or `None` if the game is over.
    pub fn next_seat(&self) -> Option<Seat> {
        if self.is_finished() {
            return None;
        }
        Some(if self.moves.len() % 2 == 0 {
            Seat::X
        } else {
            Seat::O
        })
    }

    /// Returns the board as cell occupants.
    pub fn board(&self) -> [Option<Seat>; CELLS] {
        let mut board = [None; CELLS];
        for m in &self.moves {
            if let Some(cell) = board.get_mut(usize::from(m.cell)) {
                *cell = Some(m.player);
            }
        }
        board
    }

    /// Plays the next move for whichever seat is due.
    ///
    /// Returns the winner if this move ended the game.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::IllegalMove`] if the game is over, the cell is
    /// out of range or taken, or `at` is earlier than the previous move.
    pub fn play(&mut self, cell: u8, at: UnixMillis) -> SchemaResult<Option<Winner>> {
        let seat = self
            .next_seat()
            .ok_or_else(|| SchemaError::illegal_move("game is already finished"))?;
        if usize::from(cell) >= CELLS {
            return Err(SchemaError::illegal_move(format!(
                "cell {cell} is outside the board"
            )));
        }
        let board = self.board();
        if board[usize::from(cell)].is_some() {
            return Err(SchemaError::illegal_move(format!("cell {cell} is taken")));
        }
        let previous = self.moves.last().map_or(self.started_at, |m| m.at);
        if at < previous {
            return Err(SchemaError::illegal_move(format!(
                "move at {at} precedes {previous}"
            )));
        }

        self.moves.push(Move {
            cell,
            player: seat,
            at,
        });

        let board = self.board();
        let won = WINNING_LINES
            .iter()
            .any(|line| line.iter().all(|&c| board[usize::from(c)] == Some(seat)));
        if won {
            self.finish(Winner::from(seat), at);
        } else if self.moves.len() == CELLS {
            self.finish(Winner::Draw, at);
        }
        Ok(self.winner)
    }

    fn finish(&mut self, winner: Winner, at: UnixMillis) {
        self.winner = Some(winner);
        self.ended_at = Some(at);
    }

    /// Re-checks every domain invariant of a loaded game.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::SameSeatLabels`] for equal seat labels,
    /// [`SchemaError::IllegalMove`] if the move list could not have been
    /// played, and [`SchemaError::InconsistentGame`] if `winner` or
    /// `ended_at` disagree with the moves.
    pub fn validate(&self) -> SchemaResult<()> {
        let mut replay = Game::start(self.started_at)
            .with_players(self.player_x.clone(), self.player_o.clone())?;
        for (i, m) in self.moves.iter().enumerate() {
            if Some(m.player) != replay.next_seat() && !replay.is_finished() {
                return Err(SchemaError::illegal_move(format!(
                    "move {i} is played by {} out of turn",
                    m.player.as_str()
                )));
            }
            replay.play(m.cell, m.at)?;
        }

        if self.ended_at.is_some() != self.winner.is_some() {
            return Err(SchemaError::inconsistent_game(
                "ended_at and winner must be set together",
            ));
        }
        if self.winner != replay.winner {
            return Err(SchemaError::inconsistent_game(format!(
                "recorded winner {:?} but the moves give {:?}",
                self.winner.map(|w| w.as_str()),
                replay.winner.map(|w| w.as_str())
            )));
        }
        if let (Some(ended), Some(last)) = (self.ended_at, self.moves.last()) {
            if ended < last.at {
                return Err(SchemaError::inconsistent_game(
                    "game ended before its last move",
                ));
            }
        }
        Ok(())
    }

    /// Returns the seat labels that are present.
    pub fn participants(&self) -> impl Iterator<Item = (Seat, &str)> {
        [(Seat::X, &self.player_x), (Seat::O, &self.player_o)]
            .into_iter()
            .filter_map(|(seat, label)| label.as_deref().map(|l| (seat, l)))
    }

    /// Returns the outcome for the seat labelled `label`, if the game is
    /// finished and `label` took part.
    pub fn outcome_for(&self, label: &str) -> Option<Outcome> {
        let winner = self.winner?;
        let (seat, _) = self.participants().find(|(_, l)| *l == label)?;
        Some(match winner {
            Winner::Draw => Outcome::Draw,
            w if w == Winner::from(seat) => Outcome::Win,
            _ => Outcome::Loss,
        })
    }

    /// Converts the game into a stored document.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::new();
        if let Some(id) = self.id {
            doc.insert("_id", id);
        }
        doc.insert("started_at", Value::Timestamp(self.started_at));
        if let Some(ended) = self.ended_at {
            doc.insert("ended_at", Value::Timestamp(ended));
        }
        if let Some(x) = &self.player_x {
            doc.insert("playerX", x.as_str());
        }
        if let Some(o) = &self.player_o {
            doc.insert("playerO", o.as_str());
        }
        if let Some(id) = self.player_x_id {
            doc.insert("playerX_id", id);
        }
        if let Some(id) = self.player_o_id {
            doc.insert("playerO_id", id);
        }
        if let Some(winner) = self.winner {
            doc.insert("winner", winner.as_str());
        }
        let moves: Vec<Value> = self.moves.iter().map(|m| m.to_document().into()).collect();
        doc.insert("moves", moves);
        doc
    }
}
