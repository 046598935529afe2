use serde::{Deserialize, Serialize};

/// Administrative level a raw table is published at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Voivodeship,    // Highest-level entity
    #[default]
    County,         // County -> Voivodeship
}

impl Level {
    /// Number of leading TERC digits identifying a unit at this level.
    pub fn code_len(&self) -> usize {
        match self {
            Level::Voivodeship => 2,
            Level::County => 4,
        }
    }
}
