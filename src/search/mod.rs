//! Small alpha-beta searcher behind the sparring engine. Strength follows
//! the UCI `Skill Level`: it caps the depth and widens the window of
//! near-best moves a pick is drawn from.

pub mod eval;

use cozy_chess::{Board, Move};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::time::{Duration, Instant};

use crate::config::MAX_SKILL;
use eval::{material_eval_cp, piece_value, terminal_score, DRAW_SCORE, MATE_SCORE};

#[derive(Clone, Copy, Debug)]
pub struct SearchParams {
    pub skill: u8,
    pub movetime: Option<Duration>,
    /// Overrides the skill's depth cap when set.
    pub depth: Option<u32>,
}

impl Default for SearchParams {
    fn default() -> Self { Self { skill: MAX_SKILL, movetime: None, depth: None } }
}

#[derive(Default, Debug, Clone)]
pub struct SearchResult {
    pub bestmove: Option<Move>,
    pub score_cp: i32,
    pub depth: u32,
    pub nodes: u64,
}

pub fn depth_for_skill(skill: u8) -> u32 { 1 + skill.min(MAX_SKILL) as u32 / 5 }

/// Centipawns a pick may trail the best move by.
pub fn margin_for_skill(skill: u8) -> i32 { (MAX_SKILL - skill.min(MAX_SKILL)) as i32 * 15 }

pub struct Sparring {
    rng: SmallRng,
    nodes: u64,
    deadline: Option<Instant>,
    aborted: bool,
}

impl Default for Sparring {
    fn default() -> Self { Self::with_rng(SmallRng::from_entropy()) }
}

impl Sparring {
    pub fn seeded(seed: u64) -> Self { Self::with_rng(SmallRng::seed_from_u64(seed)) }

    fn with_rng(rng: SmallRng) -> Self { Self { rng, nodes: 0, deadline: None, aborted: false } }

    pub fn search(&mut self, board: &Board, params: SearchParams) -> SearchResult {
        self.nodes = 0;
        self.aborted = false;
        self.deadline = params.movetime.map(|t| Instant::now() + t);

        let mut moves: Vec<Move> = Vec::with_capacity(64);
        board.generate_moves(|ml| { for m in ml { moves.push(m); } false });
        if moves.is_empty() {
            return SearchResult { bestmove: None, score_cp: terminal_score(board, 0), depth: 0, nodes: 0 };
        }
        order_moves(board, &mut moves);

        let max_depth = params.depth.unwrap_or_else(|| depth_for_skill(params.skill)).max(1);
        let mut scored: Vec<(Move, i32)> = Vec::new();
        let mut reached = 0;
        for depth in 1..=max_depth {
            let mut iteration = Vec::with_capacity(moves.len());
            for &m in &moves {
                let mut child = board.clone();
                child.play(m);
                let score = -self.negamax(&child, depth - 1, -MATE_SCORE, MATE_SCORE, 1);
                if self.aborted { break; }
                iteration.push((m, score));
            }
            // A cut-short iteration only counts when nothing better exists.
            if self.aborted && !scored.is_empty() { break; }
            scored = iteration;
            reached = depth;
            if self.aborted { break; }
            // Best first for the next iteration.
            scored.sort_by_key(|&(_, s)| -s);
            moves = scored.iter().map(|&(m, _)| m).collect();
        }
        if scored.is_empty() { scored.push((moves[0], material_eval_cp(board))); }

        let best = scored.iter().map(|&(_, s)| s).max().unwrap_or(DRAW_SCORE);
        let margin = margin_for_skill(params.skill);
        let pool: Vec<(Move, i32)> = scored.iter().copied().filter(|&(_, s)| s >= best - margin).collect();
        let (bestmove, score_cp) = pool[self.rng.gen_range(0..pool.len())];
        SearchResult { bestmove: Some(bestmove), score_cp, depth: reached, nodes: self.nodes }
    }

    fn out_of_time(&mut self) -> bool {
        if let Some(dl) = self.deadline {
            if Instant::now() >= dl { self.aborted = true; }
        }
        self.aborted
    }

    fn negamax(&mut self, board: &Board, depth: u32, mut alpha: i32, beta: i32, ply: i32) -> i32 {
        self.nodes += 1;
        if self.out_of_time() { return DRAW_SCORE; }
        let mut moves: Vec<Move> = Vec::with_capacity(64);
        board.generate_moves(|ml| { for m in ml { moves.push(m); } false });
        if moves.is_empty() { return terminal_score(board, ply); }
        if board.halfmove_clock() >= 100 { return DRAW_SCORE; }
        if depth == 0 { return material_eval_cp(board); }
        order_moves(board, &mut moves);
        for m in moves {
            let mut child = board.clone();
            child.play(m);
            let score = -self.negamax(&child, depth - 1, -beta, -alpha, ply + 1);
            if score >= beta { return beta; }
            if score > alpha { alpha = score; }
        }
        alpha
    }
}

fn capture_value(board: &Board, m: Move) -> i32 {
    let enemy = !board.side_to_move();
    if board.color_on(m.to) != Some(enemy) { return 0; }
    board.piece_on(m.to).map_or(0, piece_value)
}

// Most valuable victim first; promotions count as captures of their piece.
fn order_moves(board: &Board, moves: &mut [Move]) {
    moves.sort_by_key(|&m| -(capture_value(board, m) + m.promotion.map_or(0, piece_value)));
}
