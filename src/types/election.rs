use std::fmt;

use serde::{Deserialize, Serialize};

use super::CountyId;

/// Round of a presidential election.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Round {
    First,
    Runoff,
}

impl Round {
    pub fn number(&self) -> u8 {
        match self {
            Round::First => 1,
            Round::Runoff => 2,
        }
    }
}

impl TryFrom<u8> for Round {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Round::First),
            2 => Ok(Round::Runoff),
            other => Err(format!("election round must be 1 or 2, got {other}")),
        }
    }
}

impl From<Round> for u8 {
    fn from(round: Round) -> u8 { round.number() }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

/// Turnout observed in one county, in one round of one election.
/// Counts are already reconciled onto the current county set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElectionResult {
    county: CountyId,
    year: i32,
    round: Round,
    authorized_voters: u64,
    votes_cast: u64,
}

impl ElectionResult {
    /// Fails if nobody was eligible or more ballots were cast than voters were eligible.
    pub fn new(county: CountyId, year: i32, round: Round, authorized_voters: u64, votes_cast: u64) -> Result<Self, String> {
        if authorized_voters == 0 {
            return Err("authorized_voters must be positive".into());
        }
        if votes_cast > authorized_voters {
            return Err(format!("votes_cast ({votes_cast}) exceeds authorized_voters ({authorized_voters})"));
        }
        Ok(Self { county, year, round, authorized_voters, votes_cast })
    }

    #[inline] pub fn county(&self) -> &CountyId { &self.county }
    #[inline] pub fn year(&self) -> i32 { self.year }
    #[inline] pub fn round(&self) -> Round { self.round }
    #[inline] pub fn authorized_voters(&self) -> u64 { self.authorized_voters }
    #[inline] pub fn votes_cast(&self) -> u64 { self.votes_cast }

    /// Fraction of eligible voters who cast a ballot, in `[0, 1]`.
    #[inline] pub fn turnout(&self) -> f64 {
        self.votes_cast as f64 / self.authorized_voters as f64
    }
}
