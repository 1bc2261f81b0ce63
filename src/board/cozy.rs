use cozy_chess::{Board as CozyBoard, Color, File, Move, Piece, Square};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PositionError;

/// A move in UCI long algebraic notation. Castling is the king's
/// two-square move (`e1g1`), never cozy-chess's king-takes-rook form.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PlayedMove {
    pub from: Square,
    pub to: Square,
    pub promotion: Option<Piece>,
}

impl PlayedMove {
    pub fn new(from: Square, to: Square, promotion: Option<Piece>) -> Self { Self { from, to, promotion } }
}

fn promotion_char(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

fn promotion_piece(c: char) -> Option<Piece> {
    match c.to_ascii_lowercase() {
        'n' => Some(Piece::Knight),
        'b' => Some(Piece::Bishop),
        'r' => Some(Piece::Rook),
        'q' => Some(Piece::Queen),
        _ => None,
    }
}

impl fmt::Display for PlayedMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.from, self.to)?;
        if let Some(p) = self.promotion { write!(f, "{}", promotion_char(p))?; }
        Ok(())
    }
}

impl FromStr for PlayedMove {
    type Err = PositionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bad = || PositionError::Notation(s.to_string());
        if !s.is_ascii() || !(4..=5).contains(&s.len()) { return Err(bad()); }
        let from = Square::from_str(&s[0..2]).map_err(|_| bad())?;
        let to = Square::from_str(&s[2..4]).map_err(|_| bad())?;
        let promotion = match s[4..].chars().next() {
            Some(c) => Some(promotion_piece(c).ok_or_else(bad)?),
            None => None,
        };
        Ok(Self { from, to, promotion })
    }
}

impl TryFrom<String> for PlayedMove {
    type Error = PositionError;
    fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<PlayedMove> for String {
    fn from(m: PlayedMove) -> Self { m.to_string() }
}

/// A complete board snapshot plus the move that produced it.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "PositionRecord", into = "PositionRecord")]
pub struct Position {
    board: CozyBoard,
    last_move: Option<PlayedMove>,
}

#[derive(Serialize, Deserialize)]
struct PositionRecord {
    fen: String,
    #[serde(rename = "move")]
    last_move: Option<PlayedMove>,
}

impl TryFrom<PositionRecord> for Position {
    type Error = PositionError;
    fn try_from(r: PositionRecord) -> Result<Self, Self::Error> {
        let mut pos = Position::from_fen(&r.fen)?;
        pos.last_move = r.last_move;
        Ok(pos)
    }
}

impl From<Position> for PositionRecord {
    fn from(p: Position) -> Self { PositionRecord { fen: p.fen(), last_move: p.last_move } }
}

impl PartialEq for Position {
    fn eq(&self, other: &Self) -> bool { self.last_move == other.last_move && self.fen() == other.fen() }
}

impl Eq for Position {}

impl Position {
    pub fn startpos() -> Self {
        Self { board: CozyBoard::default(), last_move: None }
    }

    pub fn from_fen(fen: &str) -> Result<Self, PositionError> {
        CozyBoard::from_fen(fen.trim(), false)
            .map(|b| Self { board: b, last_move: None })
            .map_err(|e| PositionError::Fen(format!("{e:?} in {fen:?}")))
    }

    pub fn board(&self) -> &CozyBoard { &self.board }

    pub fn fen(&self) -> String { format!("{}", self.board) }

    pub fn last_move(&self) -> Option<PlayedMove> { self.last_move }

    pub fn side_to_move(&self) -> Color { self.board.side_to_move() }

    pub fn in_check(&self) -> bool { !self.board.checkers().is_empty() }

    /// Same board, forgetting how it was reached.
    pub fn detached(&self) -> Self { Self { board: self.board.clone(), last_move: None } }

    pub fn legal_moves(&self) -> Vec<PlayedMove> {
        let mut out = Vec::new();
        self.board.generate_moves(|moves| {
            for m in moves { out.push(to_standard(&self.board, m)); }
            false
        });
        out
    }

    pub fn has_legal_move(&self) -> bool {
        self.board.generate_moves(|moves| !moves.is_empty())
    }

    /// The cozy-chess move for `mv` if it is legal here.
    pub fn resolve(&self, mv: PlayedMove) -> Option<Move> {
        let wanted = to_cozy(&self.board, mv);
        let mut found = None;
        self.board.generate_moves(|moves| {
            for m in moves { if m == wanted { found = Some(m); break; } }
            found.is_some()
        });
        found
    }

    /// The position after `mv`, or `None` when `mv` is illegal here.
    pub fn child(&self, mv: PlayedMove) -> Option<Position> {
        let m = self.resolve(mv)?;
        let mut board = self.board.clone();
        board.play(m);
        Some(Self { board, last_move: Some(mv) })
    }

    pub fn standard(&self, mv: Move) -> PlayedMove { to_standard(&self.board, mv) }
}

fn castling_king_target(from: Square, rook: Square) -> Square {
    let file = if (rook.file() as u8) > (from.file() as u8) { File::G } else { File::C };
    Square::new(file, from.rank())
}

/// cozy-chess encodes castling as the king capturing its own rook.
pub fn to_standard(board: &CozyBoard, mv: Move) -> PlayedMove {
    if board.color_on(mv.to) == Some(board.side_to_move()) {
        return PlayedMove::new(mv.from, castling_king_target(mv.from, mv.to), None);
    }
    PlayedMove::new(mv.from, mv.to, mv.promotion)
}

pub fn to_cozy(board: &CozyBoard, mv: PlayedMove) -> Move {
    let is_king = board.piece_on(mv.from) == Some(Piece::King);
    let two_files = mv.from.file() == File::E && (mv.to.file() == File::G || mv.to.file() == File::C);
    if is_king && two_files && mv.from.rank() == mv.to.rank() {
        let rook_file = if mv.to.file() == File::G { File::H } else { File::A };
        return Move { from: mv.from, to: Square::new(rook_file, mv.from.rank()), promotion: None };
    }
    Move { from: mv.from, to: mv.to, promotion: mv.promotion }
}
