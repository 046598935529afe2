use std::{fmt, sync::Arc};

use ahash::AHashMap;
use geo::MultiPolygon;
use serde::{Deserialize, Serialize};

use super::Level;

/// Canonical county key: the 4-digit TERC code of a current-era powiat.
/// Keeps the code as text (with leading zeros) and shares the allocation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CountyId(Arc<str>);

impl CountyId {
    /// Normalize a raw TERC/TERYT code to a unit code at `level`.
    ///
    /// Accepts codes that lost their leading zero to numeric parsing
    /// ("201" -> "0201") and longer TERYT codes, which are truncated to the
    /// county (or voivodeship) prefix. Returns `None` for anything else.
    pub fn parse(raw: &str, level: Level) -> Option<CountyId> {
        let digits = raw.trim();
        // Numeric columns come back as "201.0" from some exports.
        let digits = digits.strip_suffix(".0").unwrap_or(digits);
        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) { return None }

        let len = level.code_len();
        let code = match digits.len() {
            n if n == len => digits.to_string(),
            n if n == len - 1 => format!("{digits:0>len$}"),
            // TERYT gmina codes (7) and their 6-digit form without the type digit.
            6 | 7 if level == Level::County => digits[..len].to_string(),
            4 | 6 | 7 if level == Level::Voivodeship => digits[..len].to_string(),
            _ => return None,
        };
        Some(CountyId(Arc::from(code)))
    }

    /// Build an id from an already-normalized code.
    pub fn new(code: &str) -> CountyId {
        CountyId(Arc::from(code))
    }

    #[inline] pub fn as_str(&self) -> &str { &self.0 }

    /// Two-digit voivodeship prefix of this code.
    #[inline] pub fn voivodeship(&self) -> &str { &self.0[..self.0.len().min(2)] }
}

impl fmt::Display for CountyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a unit in a historical boundary vintage.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HistoricalId {
    pub vintage: i32,
    pub id: Arc<str>,
}

impl fmt::Display for HistoricalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.vintage)
    }
}

/// A current-era county with its boundary.
#[derive(Debug, Clone)]
pub struct County {
    pub id: CountyId,
    pub name: String,
    pub geometry: MultiPolygon<f64>,
    /// Historical units (of any vintage) attributed, wholly or partly, to this county.
    pub historical: Vec<HistoricalId>,
}

/// The current county set, in a stable order (ascending by id).
#[derive(Debug, Clone, Default)]
pub struct CountySet {
    counties: Vec<County>,
    index: AHashMap<CountyId, usize>,
}

impl CountySet {
    /// Sorts by id; later duplicates of an id are dropped and returned.
    pub fn new(mut counties: Vec<County>) -> (Self, Vec<County>) {
        counties.sort_by(|a, b| a.id.cmp(&b.id));
        let mut kept: Vec<County> = Vec::with_capacity(counties.len());
        let mut duplicates = Vec::new();
        for county in counties {
            if kept.last().is_some_and(|last| last.id == county.id) {
                duplicates.push(county);
            } else {
                kept.push(county);
            }
        }
        let index = kept.iter().enumerate().map(|(i, c)| (c.id.clone(), i)).collect();
        (Self { counties: kept, index }, duplicates)
    }

    #[inline] pub fn len(&self) -> usize { self.counties.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.counties.is_empty() }

    #[inline] pub fn iter(&self) -> impl Iterator<Item = &County> { self.counties.iter() }

    #[inline] pub fn as_slice(&self) -> &[County] { &self.counties }

    #[inline] pub fn contains(&self, id: &CountyId) -> bool { self.index.contains_key(id) }

    #[inline] pub fn position(&self, id: &CountyId) -> Option<usize> { self.index.get(id).copied() }

    pub fn get(&self, id: &CountyId) -> Option<&County> {
        self.position(id).map(|i| &self.counties[i])
    }

    pub fn get_mut(&mut self, id: &CountyId) -> Option<&mut County> {
        self.position(id).map(|i| &mut self.counties[i])
    }

    /// Counties whose code starts with the given voivodeship prefix.
    pub fn in_voivodeship<'a>(&'a self, prefix: &'a str) -> impl Iterator<Item = &'a County> + 'a {
        self.counties.iter().filter(move |c| c.id.voivodeship() == prefix)
    }

    pub fn ids(&self) -> impl Iterator<Item = &CountyId> { self.counties.iter().map(|c| &c.id) }
}
