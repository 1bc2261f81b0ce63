//! One game against the computer: owns the ledger, the configuration, the
//! persistence slot and the opponent channel, and keeps them in step.

use cozy_chess::{Piece, Square};
use std::time::Duration;

use crate::board::{PlayedMove, Position};
use crate::config::{Difficulty, GameConfig, Side, SkillTable};
use crate::error::{MatchError, OpponentError};
use crate::ledger::Ledger;
use crate::opponent::process::Launcher;
use crate::opponent::{ChannelState, OpponentChannel, Reply};
use crate::persist::{KvStore, Persistence};
use crate::rules::{self, Outcome};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Active,
    Resigned,
    Finished(Outcome),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MatchEvent {
    OpponentMoved(Position),
    OpponentHasNoMove,
    GameOver(Outcome),
}

pub type Listener = Box<dyn FnMut(&MatchEvent)>;

pub struct MatchSession<S: KvStore> {
    ledger: Ledger,
    config: GameConfig,
    phase: Phase,
    persistence: Persistence<S>,
    opponent: OpponentChannel,
    launcher: Box<dyn Launcher>,
    skills: SkillTable,
    listener: Option<Listener>,
}

impl<S: KvStore> MatchSession<S> {
    /// Restores the stored match for `difficulty` (keeping its stored side)
    /// or starts a fresh one with `side`, then brings the opponent up.
    pub fn open(
        persistence: Persistence<S>,
        launcher: Box<dyn Launcher>,
        skills: SkillTable,
        difficulty: Difficulty,
        side: Side,
    ) -> Result<Self, MatchError> {
        let restored = persistence.load(difficulty);
        let mut config = restored.config;
        if !restored.restored { config.side = side; }
        let ledger = restored.ledger;
        let phase = rules::final_outcome(&ledger).map_or(Phase::Active, Phase::Finished);

        let mut opponent = OpponentChannel::new(skills.get(config.difficulty));
        opponent.start(launcher.as_ref())?;
        log::info!("match opened: {} as {}, {} positions{}", config.difficulty, config.side, ledger.len(), if restored.restored { " (restored)" } else { "" });

        let mut session = Self { ledger, config, phase, persistence, opponent, launcher, skills, listener: None };
        session.persist();
        session.drive_opponent()?;
        Ok(session)
    }

    pub fn set_listener(&mut self, listener: impl FnMut(&MatchEvent) + 'static) { self.listener = Some(Box::new(listener)); }

    pub fn ledger(&self) -> &Ledger { &self.ledger }

    pub fn current(&self) -> &Position { self.ledger.current() }

    pub fn config(&self) -> GameConfig { self.config }

    pub fn phase(&self) -> Phase { self.phase }

    pub fn persistence(&self) -> &Persistence<S> { &self.persistence }

    pub fn opponent_state(&self) -> ChannelState { self.opponent.state() }

    pub fn opponent_generation(&self) -> u64 { self.opponent.generation() }

    pub fn is_over(&self) -> bool { self.phase != Phase::Active }

    /// How the game ended, if it has.
    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase { Phase::Finished(o) => Some(o), _ => None }
    }

    /// Game-over status of the displayed position.
    pub fn outcome_at_cursor(&self) -> Option<Outcome> { rules::outcome(&self.ledger) }

    pub fn history(&self) -> Vec<PlayedMove> { self.ledger.moves().collect() }

    pub fn legal_moves(&self) -> Vec<PlayedMove> { rules::legal_moves(self.ledger.current()) }

    pub fn legal_targets(&self, from: Square) -> Vec<Square> { rules::legal_targets(self.ledger.current(), from) }

    pub fn is_player_turn(&self) -> bool { self.ledger.current().side_to_move() == self.config.side.color() }

    /// Whether a destructive change would throw away a game in progress.
    pub fn would_discard(&self) -> bool { self.phase == Phase::Active && self.ledger.len() > 1 }

    /// A search for the displayed position is outstanding.
    pub fn awaiting_opponent(&self) -> bool { self.opponent.awaiting_reply() }

    pub fn player_move(&mut self, from: Square, to: Square, promotion: Option<Piece>) -> Result<Position, MatchError> {
        if self.is_over() { return Err(MatchError::GameOver); }
        if !self.is_player_turn() { return Err(MatchError::NotYourTurn); }
        self.ensure_opponent()?;
        let branching = !self.ledger.at_end();
        let pos = rules::try_move(&mut self.ledger, from, to, promotion)?;
        if branching { self.opponent.supersede(); }
        self.config.started = true;
        let mut events = Vec::new();
        self.after_append(&mut events);
        self.dispatch(&events);
        self.drive_opponent()?;
        Ok(pos)
    }

    pub fn undo(&mut self) -> bool {
        if !self.ledger.step_back() { return false; }
        self.opponent.supersede();
        self.persist();
        true
    }

    pub fn redo(&mut self) -> Result<bool, MatchError> {
        self.ensure_opponent()?;
        if !self.ledger.step_forward() { return Ok(false); }
        self.persist();
        self.drive_opponent()?;
        Ok(true)
    }

    /// Jumps to a 1-based cursor in the move history.
    pub fn seek(&mut self, cursor: usize) -> Result<bool, MatchError> {
        self.ensure_opponent()?;
        if !self.ledger.seek(cursor) { return Ok(false); }
        self.opponent.supersede();
        self.persist();
        self.drive_opponent()?;
        Ok(true)
    }

    /// Ends the game. The ledger stays for review; the stored slot is
    /// cleared so the next open starts a new game.
    pub fn resign(&mut self) -> bool {
        if self.is_over() { return false; }
        let discarded = self.would_discard();
        self.phase = Phase::Resigned;
        self.opponent.supersede();
        self.config = GameConfig::fresh(self.config.difficulty, self.config.side);
        if let Err(e) = self.persistence.save(&Ledger::default(), &self.config) { log::warn!("could not clear saved match: {e}"); }
        log::info!("player resigned after {} plies", self.ledger.len() - 1);
        discarded
    }

    pub fn new_game(&mut self) -> Result<bool, MatchError> {
        self.ensure_opponent()?;
        let discarded = self.would_discard();
        self.reset(self.config.difficulty, self.config.side);
        self.opponent.new_game()?;
        self.persist();
        self.drive_opponent()?;
        Ok(discarded)
    }

    /// Restarts the opponent at the new tier with a fresh game.
    pub fn change_difficulty(&mut self, difficulty: Difficulty) -> Result<bool, MatchError> {
        if difficulty == self.config.difficulty { return Ok(false); }
        self.opponent.change_skill(self.skills.get(difficulty), self.launcher.as_ref())?;
        let discarded = self.would_discard();
        self.reset(difficulty, self.config.side);
        self.persist();
        self.drive_opponent()?;
        Ok(discarded)
    }

    pub fn change_side(&mut self, side: Side) -> Result<bool, MatchError> {
        if side == self.config.side { return Ok(false); }
        self.ensure_opponent()?;
        let discarded = self.would_discard();
        self.reset(self.config.difficulty, side);
        self.opponent.new_game()?;
        self.persist();
        self.drive_opponent()?;
        Ok(discarded)
    }

    /// Restarts a lost engine if needed, then asks again when the opponent
    /// is to move and nothing is outstanding. Returns whether a search was
    /// issued.
    pub fn retry_opponent(&mut self) -> Result<bool, MatchError> {
        if !matches!(self.opponent.state(), ChannelState::Ready | ChannelState::Thinking) {
            self.opponent.change_skill(self.skills.get(self.config.difficulty), self.launcher.as_ref())?;
        }
        let before = self.opponent.generation();
        self.drive_opponent()?;
        Ok(self.opponent.generation() != before)
    }

    /// Applies whatever the opponent has answered so far; never blocks.
    pub fn pump(&mut self) -> Result<Vec<MatchEvent>, MatchError> { self.collect(None) }

    /// Like [`MatchSession::pump`] but waits up to `timeout` for a reply.
    pub fn wait_for_opponent(&mut self, timeout: Duration) -> Result<Vec<MatchEvent>, MatchError> { self.collect(Some(timeout)) }

    fn collect(&mut self, mut wait: Option<Duration>) -> Result<Vec<MatchEvent>, MatchError> {
        let mut events = Vec::new();
        while let Some(reply) = self.opponent.poll(wait.take())? {
            self.accept_reply(reply, &mut events);
        }
        self.dispatch(&events);
        Ok(events)
    }

    fn accept_reply(&mut self, reply: Reply, events: &mut Vec<MatchEvent>) {
        let current = reply.generation == self.opponent.generation();
        if !current || self.is_over() || !self.ledger.at_end() || self.is_player_turn() {
            log::debug!("ignoring opponent reply #{} in this state", reply.generation);
            return;
        }
        match reply.best {
            None => {
                events.push(MatchEvent::OpponentHasNoMove);
                match rules::outcome(&self.ledger) {
                    Some(o) => {
                        self.phase = Phase::Finished(o);
                        events.push(MatchEvent::GameOver(o));
                    }
                    None => log::warn!("opponent reports no move in a live position {}", self.ledger.current().fen()),
                }
                self.persist();
            }
            Some(mv) => match rules::apply(&mut self.ledger, mv) {
                Ok(pos) => {
                    events.push(MatchEvent::OpponentMoved(pos));
                    self.config.started = true;
                    self.after_append(events);
                }
                Err(e) => {
                    log::warn!("opponent move rejected, treating as no move: {e}");
                    events.push(MatchEvent::OpponentHasNoMove);
                }
            },
        }
    }

    fn after_append(&mut self, events: &mut Vec<MatchEvent>) {
        if let Some(o) = rules::outcome(&self.ledger) {
            log::info!("game over: {o}");
            self.phase = Phase::Finished(o);
            events.push(MatchEvent::GameOver(o));
        }
        self.persist();
    }

    /// Issues a search when the opponent is to move at the live end.
    fn drive_opponent(&mut self) -> Result<(), MatchError> {
        if self.is_over() || !self.ledger.at_end() || self.is_player_turn() || self.opponent.awaiting_reply() {
            return Ok(());
        }
        self.opponent.request_move(self.ledger.current())?;
        Ok(())
    }

    // Checked before any state change.
    fn ensure_opponent(&self) -> Result<(), MatchError> {
        match self.opponent.state() {
            ChannelState::Ready | ChannelState::Thinking => Ok(()),
            state => Err(OpponentError::Unavailable(format!("opponent channel is {state:?}")).into()),
        }
    }

    fn reset(&mut self, difficulty: Difficulty, side: Side) {
        self.ledger = Ledger::default();
        self.config = GameConfig::fresh(difficulty, side);
        self.phase = Phase::Active;
    }

    fn persist(&mut self) {
        if let Err(e) = self.persistence.save(&self.ledger, &self.config) {
            log::warn!("could not save match: {e}");
        }
    }

    fn dispatch(&mut self, events: &[MatchEvent]) {
        if let Some(l) = self.listener.as_mut() {
            for e in events { l(e); }
        }
    }
}
