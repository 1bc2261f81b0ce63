use cozy_chess::Board;
use matchline::opponent::process::ProcessLauncher;
use matchline::search::{depth_for_skill, margin_for_skill, SearchParams, Sparring};
use matchline::uci::SparringEngine;
use matchline::{Difficulty, MatchEvent, MatchSession, MemoryStore, Persistence, Position, Side, SkillTable};
use pretty_assertions::assert_eq;
use std::io::Cursor;
use std::time::Duration;

fn run_engine(script: &str) -> Vec<String> {
    let mut engine = SparringEngine::new(Sparring::seeded(7));
    let mut out = Vec::new();
    engine.run(Cursor::new(script.to_string()), &mut out).expect("io");
    String::from_utf8(out).expect("utf8").lines().map(str::to_string).collect()
}

#[test]
fn skill_shapes_depth_and_margin() {
    assert_eq!(depth_for_skill(0), 1);
    assert_eq!(depth_for_skill(20), 5);
    assert_eq!(margin_for_skill(20), 0);
    assert!(margin_for_skill(0) > margin_for_skill(10));
}

#[test]
fn search_prefers_winning_queen_capture() {
    let b = Board::from_fen("k7/8/8/8/8/8/3qQ3/7K w - - 0 1", false).expect("valid fen");
    let mut s = Sparring::seeded(1);
    let res = s.search(&b, SearchParams { depth: Some(2), ..SearchParams::default() });
    let bm = res.bestmove.expect("expected a best move");
    assert_eq!(format!("{bm}"), "e2d2");
    assert!(res.score_cp >= 800);
}

#[test]
fn search_finds_back_rank_mate() {
    let b = Board::from_fen("6k1/5ppp/8/8/8/8/5PPP/R5K1 w - - 0 1", false).expect("valid fen");
    let res = Sparring::seeded(3).search(&b, SearchParams { depth: Some(2), ..SearchParams::default() });
    assert_eq!(res.bestmove.map(|m| m.to_string()).as_deref(), Some("a1a8"));
}

#[test]
fn mated_side_reports_no_move() {
    let b = Board::from_fen("R5k1/5ppp/8/8/8/8/5PPP/6K1 b - - 1 1", false).expect("valid fen");
    let res = Sparring::default().search(&b, SearchParams::default());
    assert!(res.bestmove.is_none());
}

#[test]
fn engine_answers_the_handshake() {
    let lines = run_engine("uci\nsetoption name Skill Level value 4\nucinewgame\nisready\nquit\n");
    assert!(lines.iter().any(|l| l.starts_with("id name")));
    assert!(lines.contains(&"uciok".to_string()));
    assert_eq!(lines.last().map(String::as_str), Some("readyok"));
}

#[test]
fn engine_plays_from_fen() {
    let lines = run_engine("position fen k7/8/8/8/8/8/3qQ3/7K w - - 0 1\ngo depth 2\n");
    assert_eq!(lines.last().map(String::as_str), Some("bestmove e2d2"));
}

#[test]
fn engine_moves_are_legal_in_standard_notation() {
    let fen = "r3k2r/8/8/8/8/8/8/R3K2R w KQkq - 0 1";
    let lines = run_engine(&format!("position fen {fen}\ngo depth 1\n"));
    let best = lines.last().and_then(|l| l.strip_prefix("bestmove ")).expect("bestmove line");
    let pos = Position::from_fen(fen).expect("fen");
    assert!(pos.child(best.parse().expect("notation")).is_some(), "{best} is not legal");
}

#[test]
fn engine_keeps_skill_in_range() {
    let mut engine = SparringEngine::default();
    let mut sink = Vec::new();
    engine.run(Cursor::new("setoption name Skill Level value 99\n"), &mut sink).expect("io");
    assert_eq!(engine.skill(), 20);
    engine.run(Cursor::new("setoption name Skill Level value 3\nposition startpos moves e2e4\n"), &mut sink).expect("io");
    assert_eq!(engine.skill(), 3);
    assert_eq!(engine.position().last_move().map(|m| m.to_string()).as_deref(), Some("e2e4"));
}

#[test]
fn full_match_against_the_bundled_engine() {
    let launcher = ProcessLauncher::new(env!("CARGO_BIN_EXE_sparring")).arg("--seed").arg("11");
    let mut session = match MatchSession::open(Persistence::new(MemoryStore::new()), Box::new(launcher), SkillTable::default(), Difficulty::Easy, Side::Black) {
        Ok(s) => s,
        Err(e) => panic!("open: {e}"),
    };
    let events = session.wait_for_opponent(Duration::from_secs(20)).expect("reply");
    assert!(matches!(events.first(), Some(MatchEvent::OpponentMoved(_))));
    assert_eq!(session.ledger().len(), 2);

    let mv = session.legal_moves()[0];
    session.player_move(mv.from, mv.to, mv.promotion).expect("legal");
    session.wait_for_opponent(Duration::from_secs(20)).expect("reply");
    assert_eq!(session.ledger().len(), 4);
    assert!(session.is_player_turn());
}
