//! Unit harmonization and split/merge weighting of raw observations.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Result, ensure};

use crate::common::parse_number;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::io::csv::TextTable;

/// Consumer price index by year, used to express money in base-year prices.
#[derive(Debug, Clone, Default)]
pub struct PriceIndex {
    name: String,
    by_year: BTreeMap<i32, f64>,
}

impl PriceIndex {
    pub fn new(name: &str, by_year: BTreeMap<i32, f64>) -> Self {
        Self { name: name.to_string(), by_year }
    }

    /// Read a `year,index` table. Non-positive or unparseable index values
    /// are reported and left out.
    pub fn read(path: &Path, diagnostics: &mut Diagnostics) -> Result<Self> {
        let table = TextTable::read(path, ',')?;
        let years = table.column("year")?;
        let values = table.column("index")?;

        let mut by_year = BTreeMap::new();
        for row in 0..table.height() {
            let line = TextTable::line(row);
            let violation = |column: &str, reason: String| Diagnostic::SchemaViolation {
                table: table.name().to_string(), line, column: column.into(), reason,
            };
            let year = match parse_year(years.get(row).unwrap_or_default()) {
                Ok(y) => y,
                Err(e) => { diagnostics.push(violation("year", e)); continue }
            };
            match parse_number(values.get(row).unwrap_or_default(), false) {
                Ok(Some(v)) if v > 0.0 => { by_year.insert(year, v); }
                Ok(Some(v)) => diagnostics.push(violation("index", format!("non-positive index {v}"))),
                Ok(None) => {}
                Err(e) => diagnostics.push(violation("index", e)),
            }
        }
        ensure!(!by_year.is_empty(), "[indicators::normalize] Price index {} has no usable rows", path.display());
        Ok(Self { name: table.name().to_string(), by_year })
    }

    #[inline] pub fn name(&self) -> &str { &self.name }

    /// `value` in `base_year` prices; `None` when either year has no index.
    pub fn deflate(&self, value: f64, year: i32, base_year: i32) -> Option<f64> {
        let base = self.by_year.get(&base_year)?;
        let current = self.by_year.get(&year)?;
        Some(value * base / current)
    }
}

/// Parse an integer year, tolerating a `.0` suffix from numeric exports.
pub(crate) fn parse_year(raw: &str) -> Result<i32, String> {
    let trimmed = raw.trim();
    let digits = trimmed.strip_suffix(".0").unwrap_or(trimmed);
    digits.parse::<i32>()
        .ok()
        .filter(|y| (1900..=2100).contains(y))
        .ok_or_else(|| format!("`{trimmed}` is not a year"))
}

/// Weighted contributions of raw units to one `(county, indicator, year)` cell.
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct Contribution {
    weighted: f64,
    weight: f64,
}

impl Contribution {
    pub(crate) fn add(&mut self, value: f64, weight: f64) {
        self.weighted += value * weight;
        self.weight += weight;
    }

    /// Extensive quantities are apportioned and summed; intensive ones are
    /// averaged with the same weights.
    pub(crate) fn combine(&self, extensive: bool) -> Option<f64> {
        if !(self.weight > 0.0) { return None }
        Some(if extensive { self.weighted } else { self.weighted / self.weight })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deflates_to_base_year_prices() {
        let cpi = PriceIndex::new("cpi", BTreeMap::from([(2015, 100.0), (2024, 150.0)]));
        assert_eq!(cpi.deflate(4000.0, 2015, 2024), Some(6000.0));
        assert_eq!(cpi.deflate(4000.0, 2024, 2024), Some(4000.0));
        assert_eq!(cpi.deflate(4000.0, 2016, 2024), None);
    }

    #[test]
    fn reads_index_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cpi.csv");
        std::fs::write(&path, "year,index\n2015,100\n2016,-1\n2017.0,102.5\n").unwrap();
        let mut diags = Diagnostics::new();
        let cpi = PriceIndex::read(&path, &mut diags).unwrap();
        assert_eq!(cpi.deflate(1.0, 2017, 2015), Some(100.0 / 102.5));
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn split_units_apportion_or_average() {
        // A county receiving 40% of unit A (1000 people) and all of unit B (500).
        let mut counts = Contribution::default();
        counts.add(1000.0, 0.4);
        counts.add(500.0, 1.0);
        assert_eq!(counts.combine(true), Some(900.0));

        let mut rates = Contribution::default();
        rates.add(10.0, 0.5);
        rates.add(20.0, 1.5);
        assert_eq!(rates.combine(false), Some(17.5));
        assert_eq!(Contribution::default().combine(false), None);
    }

    #[test]
    fn years_parse_strictly() {
        assert_eq!(parse_year("2015"), Ok(2015));
        assert_eq!(parse_year("2015.0"), Ok(2015));
        assert!(parse_year("15").is_err());
        assert!(parse_year("rok").is_err());
    }
}
