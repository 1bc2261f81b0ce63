// Chess match core: ledger, rules, persistence, UCI opponent channel
pub mod board;
pub mod config;
pub mod error;
pub mod ledger;
pub mod opponent;
pub mod persist;
pub mod rules;
pub mod search;
pub mod session;
pub mod uci;

// Re-exports kept minimal for hosts
pub use board::{PlayedMove, Position};
pub use config::{Difficulty, GameConfig, Side, SkillLevel, SkillTable};
pub use error::{MatchError, MoveError, OpponentError};
pub use ledger::Ledger;
pub use persist::{FileStore, KvStore, MemoryStore, Persistence};
pub use rules::Outcome;
pub use session::{MatchEvent, MatchSession, Phase};
