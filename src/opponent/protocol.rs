//! UCI wire format. Commands flow host -> engine, messages engine -> host;
//! both sides of the crate (channel and sparring engine) use this codec.

use std::fmt;

use crate::board::PlayedMove;
use crate::error::OpponentError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PositionSpec {
    StartPos,
    Fen(String),
}

/// Limits carried by `go`. Unset fields are omitted on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct GoLimits {
    pub movetime_ms: Option<u64>,
    pub depth: Option<u32>,
    pub nodes: Option<u64>,
}

impl GoLimits {
    pub fn movetime(ms: u64) -> Self { Self { movetime_ms: Some(ms), ..Self::default() } }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineCommand {
    Uci,
    IsReady,
    UciNewGame,
    SetOption { name: String, value: Option<String> },
    Position { spec: PositionSpec, moves: Vec<String> },
    Go(GoLimits),
    Stop,
    Quit,
}

impl EngineCommand {
    pub fn skill_level(skill: u8) -> Self {
        EngineCommand::SetOption { name: "Skill Level".to_string(), value: Some(skill.to_string()) }
    }

    pub fn position_fen(fen: impl Into<String>) -> Self {
        EngineCommand::Position { spec: PositionSpec::Fen(fen.into()), moves: Vec::new() }
    }

    /// Engine-side parse; unknown commands yield `None`.
    pub fn parse(line: &str) -> Option<Self> {
        let mut tokens = line.split_whitespace();
        let cmd = match tokens.next()? {
            "uci" => EngineCommand::Uci,
            "isready" => EngineCommand::IsReady,
            "ucinewgame" => EngineCommand::UciNewGame,
            "stop" => EngineCommand::Stop,
            "quit" => EngineCommand::Quit,
            "setoption" => {
                let rest: Vec<&str> = tokens.collect();
                if rest.first() != Some(&"name") { return None; }
                let split = rest.iter().position(|t| *t == "value");
                let name_end = split.unwrap_or(rest.len());
                let name = rest[1..name_end].join(" ");
                let value = split.map(|i| rest[i + 1..].join(" "));
                EngineCommand::SetOption { name, value }
            }
            "position" => {
                let spec = match tokens.next()? {
                    "startpos" => PositionSpec::StartPos,
                    "fen" => {
                        // FEN is 6 fields; tolerate EPD-style 4 by stopping at "moves"
                        let fields: Vec<&str> = tokens.by_ref().take_while(|t| *t != "moves").collect();
                        if fields.len() < 4 { return None; }
                        let moves: Vec<String> = tokens.map(str::to_string).collect();
                        return Some(EngineCommand::Position { spec: PositionSpec::Fen(fields.join(" ")), moves });
                    }
                    _ => return None,
                };
                let moves = match tokens.next() {
                    Some("moves") => tokens.map(str::to_string).collect(),
                    _ => Vec::new(),
                };
                EngineCommand::Position { spec, moves }
            }
            "go" => {
                let mut limits = GoLimits::default();
                while let Some(tok) = tokens.next() {
                    match tok {
                        "movetime" => limits.movetime_ms = tokens.next().and_then(|s| s.parse().ok()),
                        "depth" => limits.depth = tokens.next().and_then(|s| s.parse().ok()),
                        "nodes" => limits.nodes = tokens.next().and_then(|s| s.parse().ok()),
                        _ => {}
                    }
                }
                EngineCommand::Go(limits)
            }
            _ => return None,
        };
        Some(cmd)
    }
}

impl fmt::Display for EngineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineCommand::Uci => f.write_str("uci"),
            EngineCommand::IsReady => f.write_str("isready"),
            EngineCommand::UciNewGame => f.write_str("ucinewgame"),
            EngineCommand::Stop => f.write_str("stop"),
            EngineCommand::Quit => f.write_str("quit"),
            EngineCommand::SetOption { name, value } => {
                write!(f, "setoption name {name}")?;
                if let Some(v) = value { write!(f, " value {v}")?; }
                Ok(())
            }
            EngineCommand::Position { spec, moves } => {
                match spec {
                    PositionSpec::StartPos => f.write_str("position startpos")?,
                    PositionSpec::Fen(fen) => write!(f, "position fen {fen}")?,
                }
                if !moves.is_empty() { write!(f, " moves {}", moves.join(" "))?; }
                Ok(())
            }
            EngineCommand::Go(l) => {
                f.write_str("go")?;
                if let Some(ms) = l.movetime_ms { write!(f, " movetime {ms}")?; }
                if let Some(d) = l.depth { write!(f, " depth {d}")?; }
                if let Some(n) = l.nodes { write!(f, " nodes {n}")?; }
                Ok(())
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EngineMessage {
    Id(String),
    UciOk,
    ReadyOk,
    /// `None` for `bestmove (none)` / `bestmove 0000`: no legal move.
    BestMove(Option<PlayedMove>),
    Info(String),
    Option(String),
    Other(String),
}

impl EngineMessage {
    pub fn parse(line: &str) -> Result<Self, OpponentError> {
        let line = line.trim();
        let (head, rest) = match line.split_once(char::is_whitespace) {
            Some((h, r)) => (h, r.trim()),
            None => (line, ""),
        };
        let msg = match head {
            "uciok" => EngineMessage::UciOk,
            "readyok" => EngineMessage::ReadyOk,
            "id" => EngineMessage::Id(rest.to_string()),
            "info" => EngineMessage::Info(rest.to_string()),
            "option" => EngineMessage::Option(rest.to_string()),
            "bestmove" => match rest.split_whitespace().next() {
                None => return Err(OpponentError::Unparseable(line.to_string())),
                Some("(none)") | Some("0000") => EngineMessage::BestMove(None),
                Some(mv) => EngineMessage::BestMove(Some(mv.parse().map_err(|_| OpponentError::Unparseable(line.to_string()))?)),
            },
            _ => EngineMessage::Other(line.to_string()),
        };
        Ok(msg)
    }
}

impl fmt::Display for EngineMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineMessage::Id(s) => write!(f, "id {s}"),
            EngineMessage::UciOk => f.write_str("uciok"),
            EngineMessage::ReadyOk => f.write_str("readyok"),
            EngineMessage::BestMove(Some(m)) => write!(f, "bestmove {m}"),
            EngineMessage::BestMove(None) => f.write_str("bestmove (none)"),
            EngineMessage::Info(s) => write!(f, "info {s}"),
            EngineMessage::Option(s) => write!(f, "option {s}"),
            EngineMessage::Other(s) => f.write_str(s),
        }
    }
}
