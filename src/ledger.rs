use crate::board::{PlayedMove, Position};
use crate::error::MoveError;

/// The mainline of one game and the cursor currently on display.
///
/// `cursor` is 1-based and always within `1..=len()`. Navigation only moves
/// the cursor; the chain is changed solely by [`Ledger::append`], which
/// drops any positions past the cursor first (there are no variations).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ledger {
    positions: Vec<Position>,
    cursor: usize,
}

impl Default for Ledger {
    fn default() -> Self { Self::new(Position::startpos()) }
}

impl Ledger {
    pub fn new(start: Position) -> Self {
        Self { positions: vec![start.detached()], cursor: 1 }
    }

    /// Rebuilds a ledger, checking its shape (not move legality).
    pub fn from_parts(positions: Vec<Position>, cursor: usize) -> Result<Self, MoveError> {
        let broken = |index: usize, reason: &str| MoveError::BrokenChain { index, reason: reason.to_string() };
        match positions.first() {
            None => return Err(broken(0, "empty ledger")),
            Some(p) if p.last_move().is_some() => return Err(broken(0, "starting position carries a move")),
            _ => {}
        }
        if let Some(i) = positions.iter().skip(1).position(|p| p.last_move().is_none()) {
            return Err(broken(i + 1, "position without a move"));
        }
        if cursor == 0 || cursor > positions.len() {
            return Err(broken(cursor, "cursor out of range"));
        }
        Ok(Self { positions, cursor })
    }

    pub fn current(&self) -> &Position { &self.positions[self.cursor - 1] }

    pub fn last(&self) -> &Position { &self.positions[self.positions.len() - 1] }

    pub fn cursor(&self) -> usize { self.cursor }

    pub fn len(&self) -> usize { self.positions.len() }

    pub fn is_empty(&self) -> bool { false }

    pub fn positions(&self) -> &[Position] { &self.positions }

    /// Positions up to and including the cursor.
    pub fn visible(&self) -> &[Position] { &self.positions[..self.cursor] }

    pub fn at_end(&self) -> bool { self.cursor == self.positions.len() }

    /// Whole mainline in order, regardless of the cursor.
    pub fn moves(&self) -> impl Iterator<Item = PlayedMove> + '_ {
        self.positions.iter().filter_map(|p| p.last_move())
    }

    pub fn append(&mut self, position: Position) {
        if !self.at_end() {
            log::debug!("ledger: dropping {} positions past cursor {}", self.positions.len() - self.cursor, self.cursor);
            self.positions.truncate(self.cursor);
        }
        self.positions.push(position);
        self.cursor = self.positions.len();
    }

    pub fn step_back(&mut self) -> bool {
        if self.cursor > 1 { self.cursor -= 1; true } else { false }
    }

    pub fn step_forward(&mut self) -> bool {
        if self.cursor < self.positions.len() { self.cursor += 1; true } else { false }
    }

    pub fn seek(&mut self, cursor: usize) -> bool {
        if cursor == 0 || cursor > self.positions.len() || cursor == self.cursor { return false; }
        self.cursor = cursor;
        true
    }
}
