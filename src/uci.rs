// UCI front end of the bundled sparring engine
use std::io::{self, BufRead, Write};
use std::time::Duration;

use crate::board::{PlayedMove, Position};
use crate::config::MAX_SKILL;
use crate::opponent::protocol::{EngineCommand, EngineMessage, GoLimits, PositionSpec};
use crate::search::{SearchParams, Sparring};

pub struct SparringEngine {
    pos: Position,
    skill: u8,
    searcher: Sparring,
}

impl Default for SparringEngine {
    fn default() -> Self { Self::new(Sparring::default()) }
}

impl SparringEngine {
    pub fn new(searcher: Sparring) -> Self { Self { pos: Position::startpos(), skill: MAX_SKILL, searcher } }

    pub fn skill(&self) -> u8 { self.skill }

    pub fn position(&self) -> &Position { &self.pos }

    fn cmd_uci(&self, out: &mut impl Write) -> io::Result<()> {
        writeln!(out, "{}", EngineMessage::Id("name Matchline Sparring".to_string()))?;
        writeln!(out, "{}", EngineMessage::Id("author Matchline Team".to_string()))?;
        writeln!(out, "{}", EngineMessage::Option(format!("name Skill Level type spin default {MAX_SKILL} min 0 max {MAX_SKILL}")))?;
        writeln!(out, "{}", EngineMessage::UciOk)
    }

    fn cmd_setoption(&mut self, name: &str, value: Option<&str>) {
        if !name.eq_ignore_ascii_case("skill level") {
            log::debug!("ignoring option {name:?}");
            return;
        }
        match value.and_then(|v| v.trim().parse::<u8>().ok()) {
            Some(s) => self.skill = s.min(MAX_SKILL),
            None => log::warn!("bad Skill Level value {value:?}"),
        }
    }

    fn cmd_position(&mut self, spec: &PositionSpec, moves: &[String]) {
        let base = match spec {
            PositionSpec::StartPos => Position::startpos(),
            PositionSpec::Fen(fen) => match Position::from_fen(fen) {
                Ok(p) => p,
                Err(e) => { log::warn!("{e}"); return; }
            },
        };
        let mut pos = base;
        for m in moves {
            let next = m.parse::<PlayedMove>().ok().and_then(|mv| pos.child(mv));
            match next {
                Some(p) => pos = p,
                None => { log::warn!("illegal move {m} in position command"); return; }
            }
        }
        self.pos = pos;
    }

    fn cmd_go(&mut self, limits: GoLimits, out: &mut impl Write) -> io::Result<()> {
        let params = SearchParams {
            skill: self.skill,
            movetime: limits.movetime_ms.map(Duration::from_millis),
            depth: limits.depth,
        };
        let res = self.searcher.search(self.pos.board(), params);
        writeln!(out, "{}", EngineMessage::Info(format!("depth {} score cp {} nodes {}", res.depth, res.score_cp, res.nodes)))?;
        let best = res.bestmove.map(|m| self.pos.standard(m));
        writeln!(out, "{}", EngineMessage::BestMove(best))
    }

    /// Serves commands until `quit` or end of input.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, mut out: W) -> io::Result<()> {
        for line in input.lines() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() { continue; }
            let Some(cmd) = EngineCommand::parse(line) else {
                log::debug!("unknown command {line:?}");
                continue;
            };
            match cmd {
                EngineCommand::Uci => self.cmd_uci(&mut out)?,
                EngineCommand::IsReady => writeln!(out, "{}", EngineMessage::ReadyOk)?,
                EngineCommand::UciNewGame => self.pos = Position::startpos(),
                EngineCommand::SetOption { name, value } => self.cmd_setoption(&name, value.as_deref()),
                EngineCommand::Position { spec, moves } => self.cmd_position(&spec, &moves),
                EngineCommand::Go(limits) => self.cmd_go(limits, &mut out)?,
                // searches are synchronous; nothing to interrupt
                EngineCommand::Stop => {}
                EngineCommand::Quit => break,
            }
            out.flush()?;
        }
        Ok(())
    }

    pub fn run_loop(&mut self) -> io::Result<()> {
        let stdin = io::stdin();
        let stdout = io::stdout();
        self.run(stdin.lock(), stdout.lock())
    }
}
