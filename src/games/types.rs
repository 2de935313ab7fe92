use crate::submission::address::Address;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of chambers on the wheel.
pub const CHAMBERS: u8 = 6;

/// Upper bound on simultaneously loaded chambers.
pub const MAX_BULLETS: u32 = 5;

/// Points awarded on `start`.
pub const STARTING_POINTS: u128 = 10;

/// Score multiplier for each survived round.
pub const SURVIVAL_MULTIPLIER: u128 = 10;

/// Session lifecycle phase
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Idle,
    Armed,
    Resolving,
    Dead,
    CashedOut,
}

impl Phase {
    /// Dead and CashedOut accept nothing but a fresh start.
    pub fn is_terminal(self) -> bool {
        matches!(self, Phase::Dead | Phase::CashedOut)
    }

    /// Armed or Resolving: a round is being played.
    pub fn is_live(self) -> bool {
        matches!(self, Phase::Armed | Phase::Resolving)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Idle => write!(f, "idle"),
            Phase::Armed => write!(f, "armed"),
            Phase::Resolving => write!(f, "resolving"),
            Phase::Dead => write!(f, "dead"),
            Phase::CashedOut => write!(f, "cashed out"),
        }
    }
}

/// Set of chamber indices in `0..6`, stored as a bitmask
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "Vec<u8>", try_from = "Vec<u8>")]
pub struct ChamberSet(u8);

impl ChamberSet {
    pub const EMPTY: ChamberSet = ChamberSet(0);

    /// Returns `None` when `chamber` is outside the wheel.
    pub fn with(self, chamber: u8) -> Option<Self> {
        if chamber >= CHAMBERS {
            return None;
        }
        Some(ChamberSet(self.0 | (1 << chamber)))
    }

    pub fn contains(&self, chamber: u8) -> bool {
        chamber < CHAMBERS && self.0 & (1 << chamber) != 0
    }

    pub fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        (0..CHAMBERS).filter(move |c| self.contains(*c))
    }
}

impl From<ChamberSet> for Vec<u8> {
    fn from(set: ChamberSet) -> Self {
        set.iter().collect()
    }
}

impl TryFrom<Vec<u8>> for ChamberSet {
    type Error = String;

    fn try_from(chambers: Vec<u8>) -> Result<Self, Self::Error> {
        chambers.into_iter().try_fold(ChamberSet::EMPTY, |set, c| {
            set.with(c)
                .ok_or_else(|| format!("chamber {} outside 0..{}", c, CHAMBERS))
        })
    }
}

impl FromIterator<u8> for ChamberSet {
    /// Out-of-range chambers are ignored.
    fn from_iter<I: IntoIterator<Item = u8>>(iter: I) -> Self {
        iter.into_iter()
            .fold(ChamberSet::EMPTY, |set, c| set.with(c).unwrap_or(set))
    }
}

/// Number of loaded chambers for a level: `min(level, 5)`, 0 while idle.
pub fn bullets_for_level(level: u32) -> usize {
    level.min(MAX_BULLETS) as usize
}

/// One player's game progress. Replaced wholesale on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub phase: Phase,
    pub level: u32,
    pub points: u128,
    pub bullet_positions: ChamberSet,
    pub last_roll: Option<u8>,
}

impl Session {
    pub const IDLE: Session = Session {
        phase: Phase::Idle,
        level: 0,
        points: 0,
        bullet_positions: ChamberSet::EMPTY,
        last_roll: None,
    };

    pub fn alive(&self) -> bool {
        self.phase.is_live()
    }

    /// Loaded chambers expressed as "n/6" risk.
    pub fn risk(&self) -> (usize, u8) {
        (self.bullet_positions.len(), CHAMBERS)
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::IDLE
    }
}

/// Verified player identity supplied by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIdentity {
    pub address: Address,
    pub confirmed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

/// Finalized score handed from the engine to the relay on cash-out
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreSubmission {
    pub player: Address,
    pub score: u128,
    pub transaction_count: u64,
}

impl ScoreSubmission {
    pub fn new(player: Address, score: u128) -> Self {
        Self {
            player,
            score,
            transaction_count: 1,
        }
    }
}

/// Relay acknowledgement for a submitted score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionResult {
    pub hash: String,
    pub accepted: bool,
}
