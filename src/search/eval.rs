use cozy_chess::{Board, Color, Piece};

const VALUES: [(Piece, i32); 5] = [
    (Piece::Pawn, 100),
    (Piece::Knight, 320),
    (Piece::Bishop, 330),
    (Piece::Rook, 500),
    (Piece::Queen, 900),
];

pub const MATE_SCORE: i32 = 30_000;
pub const DRAW_SCORE: i32 = 0;

fn count(board: &Board, color: Color, piece: Piece) -> i32 {
    (board.colors(color) & board.pieces(piece)).into_iter().count() as i32
}

pub fn piece_value(piece: Piece) -> i32 {
    VALUES.iter().find(|(p, _)| *p == piece).map_or(0, |(_, v)| *v)
}

// Positive means White has more material.
pub fn material_white_cp(board: &Board) -> i32 {
    VALUES.iter().map(|&(p, v)| (count(board, Color::White, p) - count(board, Color::Black, p)) * v).sum()
}

// Side-to-move perspective (negamax-friendly)
pub fn material_eval_cp(board: &Board) -> i32 {
    let base = material_white_cp(board);
    if board.side_to_move() == Color::White { base } else { -base }
}

pub fn terminal_score(board: &Board, ply: i32) -> i32 {
    if !board.checkers().is_empty() { return -MATE_SCORE + ply; }
    DRAW_SCORE
}
