use crate::board::PlayedMove;
use crate::opponent::ChannelState;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PositionError {
    #[error("FEN error: {0}")]
    Fen(String),
    #[error("bad move notation: {0:?}")]
    Notation(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    /// Expected, recoverable input: nothing changed.
    #[error("illegal move {mv} in {fen}")]
    Illegal { mv: PlayedMove, fen: String },
    #[error("position chain broken at index {index}: {reason}")]
    BrokenChain { index: usize, reason: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum PersistError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("stored match state is corrupt: {0}")]
    Corrupt(String),
    #[error("cannot encode match state: {0}")]
    Encode(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpponentError {
    /// Process could not be started, failed its handshake, or went away.
    #[error("opponent process unavailable: {0}")]
    Unavailable(String),
    #[error("unparseable opponent reply: {0:?}")]
    Unparseable(String),
    #[error("opponent channel is {0:?}, cannot accept a search request")]
    NotReady(ChannelState),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("unknown difficulty tier {0:?}")]
    UnknownTier(String),
    #[error("unknown side {0:?} (use 'w' or 'b')")]
    UnknownSide(String),
    #[error("skill table is missing tier {0:?}")]
    MissingTier(String),
    #[error("skill {skill} for tier {tier:?} is outside 0..=20")]
    SkillOutOfRange { tier: String, skill: u8 },
    #[error("skill table is not monotonic at tier {0:?}")]
    NotMonotonic(String),
    #[error("skill table parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Error)]
pub enum MatchError {
    #[error(transparent)]
    Move(#[from] MoveError),
    #[error(transparent)]
    Opponent(#[from] OpponentError),
    #[error("it is not the player's turn")]
    NotYourTurn,
    #[error("the game is over")]
    GameOver,
}
