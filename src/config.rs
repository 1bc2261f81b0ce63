use cozy_chess::Color;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use crate::error::ConfigError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Intermediate,
    Hard,
    Expert,
}

impl Difficulty {
    pub const ALL: [Difficulty; 4] = [Difficulty::Easy, Difficulty::Intermediate, Difficulty::Hard, Difficulty::Expert];

    /// Tier used when a lenient caller hands over an unrecognised name.
    pub const FALLBACK: Difficulty = Difficulty::Intermediate;

    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Intermediate => "intermediate",
            Difficulty::Hard => "hard",
            Difficulty::Expert => "expert",
        }
    }

    fn index(self) -> usize { self as usize }

    /// Lenient parse: unknown names map to [`Difficulty::FALLBACK`] with a warning.
    /// Prefer `str::parse`, which rejects them.
    pub fn parse_or_default(s: &str) -> Difficulty {
        s.parse().unwrap_or_else(|e: ConfigError| {
            log::warn!("{e}; falling back to {}", Difficulty::FALLBACK);
            Difficulty::FALLBACK
        })
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(self.as_str()) }
}

impl FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Difficulty::ALL.into_iter().find(|d| d.as_str() == key).ok_or_else(|| ConfigError::UnknownTier(s.to_string()))
    }
}

/// The colour the human plays.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    White,
    Black,
}

impl Side {
    pub fn color(self) -> Color {
        match self { Side::White => Color::White, Side::Black => Color::Black }
    }

    pub fn from_color(c: Color) -> Self {
        if c == Color::White { Side::White } else { Side::Black }
    }

    pub fn opposite(self) -> Self {
        match self { Side::White => Side::Black, Side::Black => Side::White }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self { Side::White => "white", Side::Black => "black" })
    }
}

impl FromStr for Side {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "w" | "white" => Ok(Side::White),
            "b" | "black" => Ok(Side::Black),
            _ => Err(ConfigError::UnknownSide(s.to_string())),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameConfig {
    pub difficulty: Difficulty,
    pub side: Side,
    /// A move has been made since the game was configured.
    pub started: bool,
}

impl GameConfig {
    pub fn fresh(difficulty: Difficulty, side: Side) -> Self { Self { difficulty, side, started: false } }
}

/// Engine strength for one tier: UCI `Skill Level` plus a fixed move time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillLevel {
    pub skill: u8,
    pub movetime_ms: u64,
}

pub const MAX_SKILL: u8 = 20;

/// Difficulty -> engine configuration. Every tier is present and both
/// skill and budget are non-decreasing with difficulty.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SkillTable {
    levels: [SkillLevel; 4],
}

impl Default for SkillTable {
    fn default() -> Self {
        Self {
            levels: [
                SkillLevel { skill: 2, movetime_ms: 300 },
                SkillLevel { skill: 8, movetime_ms: 600 },
                SkillLevel { skill: 14, movetime_ms: 1000 },
                SkillLevel { skill: 20, movetime_ms: 1500 },
            ],
        }
    }
}

impl SkillTable {
    pub fn new(levels: [SkillLevel; 4]) -> Result<Self, ConfigError> {
        let table = Self { levels };
        table.validate()?;
        Ok(table)
    }

    pub fn get(&self, d: Difficulty) -> SkillLevel { self.levels[d.index()] }

    /// Parses `{"easy": {"skill": 2, "movetime_ms": 300}, ...}`.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let raw: BTreeMap<String, SkillLevel> = serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        let mut levels: [Option<SkillLevel>; 4] = [None; 4];
        for (name, level) in raw {
            let d: Difficulty = name.parse()?;
            levels[d.index()] = Some(level);
        }
        let mut out = [SkillLevel { skill: 0, movetime_ms: 0 }; 4];
        for d in Difficulty::ALL {
            out[d.index()] = levels[d.index()].ok_or_else(|| ConfigError::MissingTier(d.as_str().to_string()))?;
        }
        Self::new(out)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| ConfigError::Parse(format!("{}: {e}", path.as_ref().display())))?;
        Self::from_json(&text)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut prev: Option<SkillLevel> = None;
        for d in Difficulty::ALL {
            let lvl = self.get(d);
            if lvl.skill > MAX_SKILL {
                return Err(ConfigError::SkillOutOfRange { tier: d.as_str().to_string(), skill: lvl.skill });
            }
            if let Some(p) = prev {
                if lvl.skill < p.skill || lvl.movetime_ms < p.movetime_ms {
                    return Err(ConfigError::NotMonotonic(d.as_str().to_string()));
                }
            }
            prev = Some(lvl);
        }
        Ok(())
    }
}
