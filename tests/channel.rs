mod common;

use matchline::opponent::{ChannelState, OpponentChannel, Reply};
use matchline::{Difficulty, OpponentError, Position, SkillTable};
use pretty_assertions::assert_eq;
use std::time::Duration;

fn ready_channel(script: &common::Shared) -> OpponentChannel {
    let mut ch = OpponentChannel::new(SkillTable::default().get(Difficulty::Intermediate));
    ch.start(common::launcher(script).as_ref()).expect("handshake");
    ch
}

#[test]
fn handshake_configures_skill_before_ready() {
    let script = common::script();
    let ch = ready_channel(&script);
    assert_eq!(ch.state(), ChannelState::Ready);
    assert_eq!(script.borrow().sent, vec!["uci", "setoption name Skill Level value 8", "ucinewgame", "isready"]);
}

#[test]
fn request_before_start_is_refused() {
    let mut ch = OpponentChannel::new(SkillTable::default().get(Difficulty::Easy));
    let err = ch.request_move(&Position::startpos()).unwrap_err();
    assert_eq!(err, OpponentError::NotReady(ChannelState::Uninitialized));
}

#[test]
fn request_sends_fen_and_movetime() {
    let script = common::script();
    let mut ch = ready_channel(&script);
    let gen = ch.request_move(&Position::startpos()).expect("sent").expect("game not over");
    assert_eq!(ch.state(), ChannelState::Thinking);
    assert!(ch.awaiting_reply());
    let s = script.borrow();
    let tail: Vec<&str> = s.sent.iter().rev().take(2).rev().map(String::as_str).collect();
    assert_eq!(tail, vec![format!("position fen {}", Position::startpos().fen()).as_str(), "go movetime 600"]);
    assert_eq!(gen, ch.generation());
}

#[test]
fn reply_is_delivered_with_its_generation() {
    let script = common::script();
    let mut ch = ready_channel(&script);
    let gen = ch.request_move(&Position::startpos()).expect("sent").expect("live");
    assert_eq!(ch.poll(None).expect("poll"), None, "nothing released yet");
    script.borrow_mut().release();
    let reply = ch.poll(None).expect("poll").expect("reply");
    assert_eq!(reply.generation, gen);
    assert!(reply.best.is_some());
    assert_eq!(ch.state(), ChannelState::Ready);
}

#[test]
fn older_reply_after_newer_request_is_dropped() {
    let script = common::script();
    let mut ch = ready_channel(&script);
    let a = Position::startpos();
    let b = a.child("e2e4".parse().expect("move")).expect("legal");
    ch.request_move(&a).expect("sent A");
    let gen_b = ch.request_move(&b).expect("sent B").expect("live");
    assert_eq!(script.borrow().count_sent("stop"), 1, "first search stopped");

    script.borrow_mut().release();
    assert_eq!(ch.poll(None).expect("poll"), None, "answer to A is stale");
    assert_eq!(ch.state(), ChannelState::Thinking, "B still outstanding");

    script.borrow_mut().release();
    let reply = ch.poll(None).expect("poll").expect("answer to B");
    assert_eq!(reply.generation, gen_b);
}

#[test]
fn supersede_discards_outstanding_reply() {
    let script = common::script();
    let mut ch = ready_channel(&script);
    ch.request_move(&Position::startpos()).expect("sent");
    ch.supersede();
    assert!(!ch.awaiting_reply());
    script.borrow_mut().release();
    assert_eq!(ch.poll(Some(Duration::from_millis(5))).expect("poll"), None);
    assert_eq!(ch.state(), ChannelState::Ready);
}

#[test]
fn finished_position_is_not_sent() {
    let script = common::script();
    let mut ch = ready_channel(&script);
    let mated = Position::from_fen("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3").expect("fen");
    let before = script.borrow().sent.len();
    assert_eq!(ch.request_move(&mated).expect("no error"), None);
    assert_eq!(script.borrow().sent.len(), before);
    assert_eq!(ch.state(), ChannelState::Ready);
}

#[test]
fn unparseable_reply_counts_as_no_move() {
    let script = common::script();
    let mut ch = ready_channel(&script);
    let gen = ch.request_move(&Position::startpos()).expect("sent").expect("live");
    script.borrow_mut().release_with("bestmove zz99");
    assert_eq!(ch.poll(None).expect("poll"), Some(Reply { generation: gen, best: None }));
    assert_eq!(ch.state(), ChannelState::Ready);
}

#[test]
fn stale_unparseable_reply_is_dropped() {
    let script = common::script();
    let mut ch = ready_channel(&script);
    ch.request_move(&Position::startpos()).expect("sent");
    ch.supersede();
    script.borrow_mut().release_with("bestmove zz99");
    assert_eq!(ch.poll(None).expect("poll"), None);
}

#[test]
fn failed_request_terminates_the_channel() {
    let script = common::script();
    let mut ch = ready_channel(&script);
    script.borrow_mut().broken = true;
    let err = ch.request_move(&Position::startpos()).unwrap_err();
    assert!(matches!(err, OpponentError::Unavailable(_)));
    assert_eq!(ch.state(), ChannelState::Terminated);
    assert!(!ch.awaiting_reply());
    assert_eq!(script.borrow().terminations, 1);
}

#[test]
fn no_legal_move_reply_decodes_to_none() {
    let script = common::script();
    let mut ch = ready_channel(&script);
    ch.request_move(&Position::startpos()).expect("sent");
    script.borrow_mut().release_with("bestmove (none)");
    let reply = ch.poll(None).expect("poll").expect("reply");
    assert_eq!(reply.best, None);
}

#[test]
fn skill_change_restarts_the_engine() {
    let script = common::script();
    let mut ch = ready_channel(&script);
    ch.request_move(&Position::startpos()).expect("sent");
    let hard = SkillTable::default().get(Difficulty::Hard);
    ch.change_skill(hard, common::launcher(&script).as_ref()).expect("restart");

    let s = script.borrow();
    assert_eq!(s.launches, 2);
    assert_eq!(s.terminations, 1);
    assert!(s.sent.iter().any(|l| l == "setoption name Skill Level value 14"));
    drop(s);
    assert_eq!(ch.state(), ChannelState::Ready);
    assert_eq!(ch.level(), hard);
    assert!(!ch.awaiting_reply());
}

#[test]
fn launch_failure_reports_unavailable() {
    let script = common::script();
    script.borrow_mut().fail_launch = true;
    let mut ch = OpponentChannel::new(SkillTable::default().get(Difficulty::Easy));
    let err = ch.start(common::launcher(&script).as_ref()).unwrap_err();
    assert!(matches!(err, OpponentError::Unavailable(_)));
    assert_eq!(ch.state(), ChannelState::Terminated);
}

#[test]
fn lost_process_terminates_the_channel() {
    let script = common::script();
    let mut ch = ready_channel(&script);
    ch.request_move(&Position::startpos()).expect("sent");
    script.borrow_mut().broken = true;
    assert!(ch.poll(None).is_err());
    assert_eq!(ch.state(), ChannelState::Terminated);
    assert_eq!(script.borrow().terminations, 1);
    assert!(matches!(ch.request_move(&Position::startpos()), Err(OpponentError::NotReady(ChannelState::Terminated))));
}

#[test]
fn terminate_is_idempotent() {
    let script = common::script();
    let mut ch = ready_channel(&script);
    ch.terminate();
    ch.terminate();
    drop(ch);
    assert_eq!(script.borrow().terminations, 1);
}
