//! Request/reply bridge to a UCI opponent process.
//!
//! Every search request gets a generation number. UCI answers each `go`
//! with exactly one `bestmove`, in order, so replies are matched to
//! requests by position in the `in_flight` queue; a reply whose generation
//! is no longer current is dropped. This is the only cancellation
//! mechanism.

pub mod process;
pub mod protocol;

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use crate::board::{PlayedMove, Position};
use crate::config::SkillLevel;
use crate::error::OpponentError;
use crate::rules;
use process::{Launcher, OpponentProcess};
use protocol::{EngineCommand, EngineMessage, GoLimits};

pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChannelState {
    Uninitialized,
    Ready,
    Thinking,
    Terminated,
}

/// A decoded answer to the current request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Reply {
    pub generation: u64,
    /// `None`: the engine found no legal move, or its answer was unusable.
    pub best: Option<PlayedMove>,
}

pub struct OpponentChannel {
    process: Option<Box<dyn OpponentProcess>>,
    state: ChannelState,
    level: SkillLevel,
    generation: u64,
    in_flight: VecDeque<u64>,
    handshake_timeout: Duration,
}

impl OpponentChannel {
    pub fn new(level: SkillLevel) -> Self {
        Self {
            process: None,
            state: ChannelState::Uninitialized,
            level,
            generation: 0,
            in_flight: VecDeque::new(),
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self { self.handshake_timeout = timeout; self }

    pub fn state(&self) -> ChannelState { self.state }

    pub fn level(&self) -> SkillLevel { self.level }

    pub fn generation(&self) -> u64 { self.generation }

    /// A search for the current generation is outstanding.
    pub fn awaiting_reply(&self) -> bool { self.in_flight.back() == Some(&self.generation) }

    /// Launches the engine and configures it; `Ready` on success.
    pub fn start(&mut self, launcher: &dyn Launcher) -> Result<(), OpponentError> {
        if matches!(self.state, ChannelState::Ready | ChannelState::Thinking) { return Ok(()); }
        match self.handshake(launcher) {
            Ok(()) => {
                self.state = ChannelState::Ready;
                log::info!("opponent ready (skill {}, {} ms/move)", self.level.skill, self.level.movetime_ms);
                Ok(())
            }
            Err(e) => {
                log::error!("opponent failed to start: {e}");
                self.terminate();
                Err(e)
            }
        }
    }

    fn handshake(&mut self, launcher: &dyn Launcher) -> Result<(), OpponentError> {
        self.process = Some(launcher.launch()?);
        self.in_flight.clear();
        let deadline = Instant::now() + self.handshake_timeout;
        self.send(&EngineCommand::Uci)?;
        self.await_message(deadline, EngineMessage::UciOk)?;
        self.send(&EngineCommand::skill_level(self.level.skill))?;
        self.send(&EngineCommand::UciNewGame)?;
        self.send(&EngineCommand::IsReady)?;
        self.await_message(deadline, EngineMessage::ReadyOk)
    }

    fn await_message(&mut self, deadline: Instant, wanted: EngineMessage) -> Result<(), OpponentError> {
        loop {
            let left = deadline.saturating_duration_since(Instant::now());
            if left.is_zero() {
                return Err(OpponentError::Unavailable(format!("no {wanted} within {:?}", self.handshake_timeout)));
            }
            let Some(line) = self.process_mut()?.recv(Some(left))? else { continue };
            if EngineMessage::parse(&line).map_or(false, |m| m == wanted) { return Ok(()); }
        }
    }

    fn process_mut(&mut self) -> Result<&mut Box<dyn OpponentProcess>, OpponentError> {
        self.process.as_mut().ok_or_else(|| OpponentError::Unavailable("no opponent process".to_string()))
    }

    fn send(&mut self, cmd: &EngineCommand) -> Result<(), OpponentError> {
        self.process_mut()?.send(cmd)
    }

    fn send_or_terminate(&mut self, cmd: &EngineCommand) -> Result<(), OpponentError> {
        let sent = self.send(cmd);
        if let Err(e) = &sent {
            log::error!("opponent lost: {e}");
            self.terminate();
        }
        sent
    }

    /// Asks for a move in `position`. Returns the request's generation, or
    /// `None` without sending anything when the position is already over.
    pub fn request_move(&mut self, position: &Position) -> Result<Option<u64>, OpponentError> {
        if !matches!(self.state, ChannelState::Ready | ChannelState::Thinking) {
            return Err(OpponentError::NotReady(self.state));
        }
        if let Some(outcome) = rules::position_outcome(position) {
            log::debug!("not asking the opponent: {outcome}");
            return Ok(None);
        }
        if self.state == ChannelState::Thinking { self.send_or_terminate(&EngineCommand::Stop)?; }
        self.generation += 1;
        self.send_or_terminate(&EngineCommand::position_fen(position.fen()))?;
        self.send_or_terminate(&EngineCommand::Go(GoLimits::movetime(self.level.movetime_ms)))?;
        self.in_flight.push_back(self.generation);
        self.state = ChannelState::Thinking;
        log::debug!("opponent request #{} for {}", self.generation, position.fen());
        Ok(Some(self.generation))
    }

    /// Invalidates any outstanding request.
    pub fn supersede(&mut self) {
        if self.state == ChannelState::Terminated { return; }
        self.generation += 1;
        if self.state == ChannelState::Thinking {
            if let Err(e) = self.send(&EngineCommand::Stop) { log::warn!("stop not delivered: {e}"); }
        }
    }

    /// Supersedes and tells the engine a new game begins.
    pub fn new_game(&mut self) -> Result<(), OpponentError> {
        self.supersede();
        if matches!(self.state, ChannelState::Ready | ChannelState::Thinking) {
            self.send(&EngineCommand::UciNewGame)?;
        }
        Ok(())
    }

    /// Collects the reply to the current request, if any. Waits up to
    /// `wait` for engine output; `None` never blocks. A current reply that
    /// cannot be decoded comes back as "no move".
    pub fn poll(&mut self, wait: Option<Duration>) -> Result<Option<Reply>, OpponentError> {
        if !matches!(self.state, ChannelState::Ready | ChannelState::Thinking) { return Ok(None); }
        let deadline = wait.map(|w| Instant::now() + w);
        loop {
            let left = deadline.map(|d| d.saturating_duration_since(Instant::now()));
            let received = self.process_mut().and_then(|p| p.recv(left));
            let line = match received {
                Ok(Some(l)) => l,
                Ok(None) => return Ok(None),
                Err(e) => {
                    log::error!("opponent lost: {e}");
                    self.terminate();
                    return Err(e);
                }
            };
            let is_bestmove = line.trim_start().starts_with("bestmove");
            let parsed = EngineMessage::parse(&line);
            if !is_bestmove { continue; }
            let tag = self.in_flight.pop_front();
            if self.in_flight.is_empty() { self.state = ChannelState::Ready; }
            if tag != Some(self.generation) {
                log::debug!("dropping stale reply {line:?} (request {tag:?}, current {})", self.generation);
                continue;
            }
            let best = match parsed {
                Ok(EngineMessage::BestMove(best)) => best,
                Ok(other) => {
                    log::warn!("unexpected opponent reply {other}; treating as no move");
                    None
                }
                Err(e) => {
                    log::warn!("{e}; treating as no move");
                    None
                }
            };
            return Ok(Some(Reply { generation: self.generation, best }));
        }
    }

    /// Tears the engine down and restarts it at `level`. Whatever was in
    /// flight is lost.
    pub fn change_skill(&mut self, level: SkillLevel, launcher: &dyn Launcher) -> Result<(), OpponentError> {
        self.terminate();
        self.level = level;
        self.start(launcher)
    }

    pub fn terminate(&mut self) {
        if let Some(mut p) = self.process.take() {
            p.terminate();
            log::info!("opponent terminated");
        }
        self.in_flight.clear();
        self.generation += 1;
        self.state = ChannelState::Terminated;
    }
}

impl Drop for OpponentChannel {
    fn drop(&mut self) { self.terminate(); }
}
