//! Move validation and game-over detection over cozy-chess.

use cozy_chess::{Board, Color, Piece, Rank, Square};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::board::{PlayedMove, Position};
use crate::config::Side;
use crate::error::MoveError;
use crate::ledger::Ledger;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Checkmate { winner: Side },
    Stalemate,
    InsufficientMaterial,
    Repetition,
    FiftyMoveRule,
}

impl Outcome {
    pub fn winner(self) -> Option<Side> {
        match self { Outcome::Checkmate { winner } => Some(winner), _ => None }
    }

    pub fn is_draw(self) -> bool { self.winner().is_none() }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Checkmate { winner } => write!(f, "checkmate, {winner} wins"),
            Outcome::Stalemate => f.write_str("draw by stalemate"),
            Outcome::InsufficientMaterial => f.write_str("draw by insufficient material"),
            Outcome::Repetition => f.write_str("draw by threefold repetition"),
            Outcome::FiftyMoveRule => f.write_str("draw by the fifty-move rule"),
        }
    }
}

/// Validates `from`-`to` against the displayed position and appends the
/// result. A pawn reaching the last rank promotes to a queen unless told
/// otherwise. Rejection leaves the ledger untouched.
pub fn try_move(ledger: &mut Ledger, from: Square, to: Square, promotion: Option<Piece>) -> Result<Position, MoveError> {
    let promotion = promotion.or_else(|| default_promotion(ledger.current().board(), from, to));
    apply(ledger, PlayedMove::new(from, to, promotion))
}

pub fn apply(ledger: &mut Ledger, mv: PlayedMove) -> Result<Position, MoveError> {
    let current = ledger.current();
    let next = current.child(mv).ok_or_else(|| MoveError::Illegal { mv, fen: current.fen() })?;
    ledger.append(next.clone());
    Ok(next)
}

fn default_promotion(board: &Board, from: Square, to: Square) -> Option<Piece> {
    let last = if board.side_to_move() == Color::White { Rank::Eighth } else { Rank::First };
    (board.piece_on(from) == Some(Piece::Pawn) && to.rank() == last).then_some(Piece::Queen)
}

pub fn legal_moves(position: &Position) -> Vec<PlayedMove> { position.legal_moves() }

/// Destination squares reachable from `from`.
pub fn legal_targets(position: &Position, from: Square) -> Vec<Square> {
    let mut out: Vec<Square> = Vec::new();
    for m in position.legal_moves() {
        if m.from == from && !out.contains(&m.to) { out.push(m.to); }
    }
    out
}

/// Outcome at the ledger's cursor, repetition included.
pub fn outcome(ledger: &Ledger) -> Option<Outcome> {
    position_outcome(ledger.current()).or_else(|| is_threefold(ledger.visible()).then_some(Outcome::Repetition))
}

/// Outcome at the end of the mainline, wherever the cursor is.
pub fn final_outcome(ledger: &Ledger) -> Option<Outcome> {
    position_outcome(ledger.last()).or_else(|| is_threefold(ledger.positions()).then_some(Outcome::Repetition))
}

/// Outcome decidable from the position alone (everything but repetition).
pub fn position_outcome(position: &Position) -> Option<Outcome> {
    let board = position.board();
    if !position.has_legal_move() {
        if position.in_check() {
            let winner = Side::from_color(board.side_to_move()).opposite();
            return Some(Outcome::Checkmate { winner });
        }
        return Some(Outcome::Stalemate);
    }
    if insufficient_material(board) { return Some(Outcome::InsufficientMaterial); }
    if board.halfmove_clock() >= 100 { return Some(Outcome::FiftyMoveRule); }
    None
}

fn is_threefold(history: &[Position]) -> bool {
    let Some(last) = history.last() else { return false };
    let key = last.board().hash();
    // Nothing before the last capture or pawn move can repeat.
    let window = last.board().halfmove_clock() as usize + 1;
    history.iter().rev().take(window).filter(|p| p.board().hash() == key).count() >= 3
}

fn square_shade(sq: Square) -> u8 { (sq.file() as u8 + sq.rank() as u8) % 2 }

/// Neither side can ever mate: bare kings, a single minor piece, or only
/// bishops all standing on one colour.
pub fn insufficient_material(board: &Board) -> bool {
    let heavy = board.pieces(Piece::Pawn) | board.pieces(Piece::Rook) | board.pieces(Piece::Queen);
    if !heavy.is_empty() { return false; }
    let knights = board.pieces(Piece::Knight);
    let bishops = board.pieces(Piece::Bishop);
    if (knights | bishops).into_iter().count() <= 1 { return true; }
    if !knights.is_empty() { return false; }
    let mut shades = bishops.into_iter().map(square_shade);
    let first = shades.next();
    shades.all(|s| Some(s) == first)
}

/// Checks that every stored move turns its predecessor into its successor.
pub fn verify_chain(positions: &[Position]) -> Result<(), MoveError> {
    for (i, pair) in positions.windows(2).enumerate() {
        let index = i + 1;
        let broken = |reason: String| MoveError::BrokenChain { index, reason };
        let mv = pair[1].last_move().ok_or_else(|| broken("missing move".to_string()))?;
        let child = pair[0].child(mv).ok_or_else(|| broken(format!("{mv} is illegal")))?;
        if child.fen() != pair[1].fen() {
            return Err(broken(format!("{mv} leads to {} not {}", child.fen(), pair[1].fen())));
        }
    }
    Ok(())
}
