#![allow(dead_code)]
// In-process stand-in for a UCI engine whose replies the test releases by hand.
use matchline::opponent::process::{Launcher, OpponentProcess};
use matchline::opponent::protocol::{EngineCommand, PositionSpec};
use matchline::{OpponentError, Position};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;
use std::time::Duration;

#[derive(Default)]
pub struct Script {
    /// Every command the channel sent, as wire text.
    pub sent: Vec<String>,
    pub outbox: VecDeque<String>,
    /// FENs of searches still waiting for `release`.
    pub held: VecDeque<String>,
    pub auto_reply: bool,
    pub fail_launch: bool,
    /// Makes every `send` and `recv` fail as if the pipe closed.
    pub broken: bool,
    pub launches: usize,
    pub terminations: usize,
    last_fen: Option<String>,
}

pub type Shared = Rc<RefCell<Script>>;

pub fn script() -> Shared { Rc::new(RefCell::new(Script::default())) }

pub fn auto_script() -> Shared {
    let s = script();
    s.borrow_mut().auto_reply = true;
    s
}

fn first_legal(fen: &str) -> String {
    let pos = Position::from_fen(fen).expect("engine got a valid fen");
    match pos.legal_moves().first() {
        Some(m) => format!("bestmove {m}"),
        None => "bestmove (none)".to_string(),
    }
}

impl Script {
    /// Answers the oldest held search with its first legal move.
    pub fn release(&mut self) -> bool {
        match self.held.pop_front() {
            Some(fen) => { let line = first_legal(&fen); self.outbox.push_back(line); true }
            None => false,
        }
    }

    /// Answers the oldest held search with an arbitrary line.
    pub fn release_with(&mut self, line: &str) -> bool {
        if self.held.pop_front().is_none() { return false; }
        self.outbox.push_back(line.to_string());
        true
    }

    pub fn count_sent(&self, prefix: &str) -> usize { self.sent.iter().filter(|l| l.starts_with(prefix)).count() }
}

pub struct ScriptedProcess {
    script: Shared,
}

impl OpponentProcess for ScriptedProcess {
    fn send(&mut self, cmd: &EngineCommand) -> Result<(), OpponentError> {
        let mut s = self.script.borrow_mut();
        if s.broken { return Err(OpponentError::Unavailable("scripted pipe closed".to_string())); }
        s.sent.push(cmd.to_string());
        match cmd {
            EngineCommand::Uci => {
                s.outbox.push_back("id name Scripted".to_string());
                s.outbox.push_back("uciok".to_string());
            }
            EngineCommand::IsReady => s.outbox.push_back("readyok".to_string()),
            EngineCommand::Position { spec: PositionSpec::Fen(fen), .. } => s.last_fen = Some(fen.clone()),
            EngineCommand::Position { spec: PositionSpec::StartPos, .. } => s.last_fen = Some(Position::startpos().fen()),
            EngineCommand::Go(_) => {
                let fen = s.last_fen.clone().expect("go without position");
                if s.auto_reply {
                    let line = first_legal(&fen);
                    s.outbox.push_back(line);
                } else {
                    s.held.push_back(fen);
                }
            }
            _ => {}
        }
        Ok(())
    }

    fn recv(&mut self, _wait: Option<Duration>) -> Result<Option<String>, OpponentError> {
        let mut s = self.script.borrow_mut();
        if s.broken { return Err(OpponentError::Unavailable("scripted pipe closed".to_string())); }
        Ok(s.outbox.pop_front())
    }

    fn terminate(&mut self) { self.script.borrow_mut().terminations += 1; }
}

pub struct ScriptedLauncher {
    pub script: Shared,
}

impl Launcher for ScriptedLauncher {
    fn launch(&self) -> Result<Box<dyn OpponentProcess>, OpponentError> {
        let mut s = self.script.borrow_mut();
        if s.fail_launch { return Err(OpponentError::Unavailable("scripted launch failure".to_string())); }
        s.launches += 1;
        s.outbox.clear();
        s.held.clear();
        Ok(Box::new(ScriptedProcess { script: self.script.clone() }))
    }
}

pub fn launcher(script: &Shared) -> Box<ScriptedLauncher> { Box::new(ScriptedLauncher { script: script.clone() }) }
