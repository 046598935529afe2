//! Election result ingest, reconciled onto current counties.

use std::collections::BTreeMap;

use ahash::AHashSet;
use anyhow::{Result, bail};
use smallvec::smallvec;
use tracing::info;

use crate::common::parse_number;
use crate::config::ElectionSource;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::io::csv::TextTable;
use crate::reconcile::{NameIndex, NameMatch, Reconciliation, Share, Shares, normalize_unit_id};
use crate::types::{CountyId, ElectionResult, Round};

/// Largest accepted gap between a published turnout and the one implied by the counts.
const TURNOUT_TOLERANCE: f64 = 0.005;

/// Load every election table into one result per `(county, year, round)`.
///
/// Counts of units split across counties are apportioned by weight, summed
/// per county and rounded half-to-even; turnout is recomputed from the counts.
pub fn load_elections(
    sources: &[ElectionSource],
    reconciliation: &Reconciliation,
    names: &NameIndex,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<ElectionResult>> {
    let mut results: BTreeMap<(CountyId, i32, Round), ElectionResult> = BTreeMap::new();

    for source in sources {
        let table = TextTable::read(&source.path, source.separator)?;
        let by_id = table.has_column(&source.id_column);
        if !by_id && !table.has_column(&source.name_column) {
            bail!(
                "[features::elections] {} has neither `{}` nor `{}`",
                source.path.display(), source.id_column, source.name_column,
            );
        }
        let unit_column = if by_id { &source.id_column } else { &source.name_column };
        let units = table.column(unit_column)?;
        let voivodeships = match &source.voivodeship_column {
            Some(col) if table.has_column(col) => Some(table.column(col)?),
            _ => None,
        };
        let voters_col = table.column("authorized_voters")?;
        let votes_col = table.column("votes_cast")?;
        let turnout_col = if table.has_column("turnout") { Some(table.column("turnout")?) } else { None };

        let mut totals: BTreeMap<CountyId, (f64, f64)> = BTreeMap::new();
        let mut seen: AHashSet<String> = AHashSet::new();

        for row in 0..table.height() {
            let line = TextTable::line(row);
            let violation = |column: &str, reason: String| Diagnostic::SchemaViolation {
                table: table.name().to_string(), line, column: column.to_string(), reason,
            };

            let raw = units.get(row).unwrap_or_default().trim();
            let shares: Shares = if by_id {
                match reconciliation.resolve(raw, source.vintage) {
                    Some(shares) => shares,
                    None => {
                        diagnostics.push(Diagnostic::UnknownIdentifier { table: table.name().to_string(), line, id: raw.to_string() });
                        continue;
                    }
                }
            } else {
                let voivodeship = voivodeships.and_then(|v| v.get(row)).map(|v| format!("{:0>2}", v.trim()));
                match names.resolve(raw, voivodeship.as_deref()) {
                    NameMatch::Unique(county) => smallvec![Share { county, weight: 1.0 }],
                    NameMatch::Ambiguous(candidates) => {
                        diagnostics.push(Diagnostic::AmbiguousName {
                            table: table.name().to_string(),
                            line,
                            name: raw.to_string(),
                            candidates: candidates.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", "),
                        });
                        continue;
                    }
                    NameMatch::Unknown => {
                        diagnostics.push(Diagnostic::UnknownIdentifier { table: table.name().to_string(), line, id: raw.to_string() });
                        continue;
                    }
                }
            };

            let voters = match parse_count(voters_col.get(row).unwrap_or_default(), source.decimal_comma) {
                Ok(v) => v,
                Err(e) => { diagnostics.push(violation("authorized_voters", e)); continue }
            };
            let votes = match parse_count(votes_col.get(row).unwrap_or_default(), source.decimal_comma) {
                Ok(v) => v,
                Err(e) => { diagnostics.push(violation("votes_cast", e)); continue }
            };
            if votes > voters || voters == 0.0 {
                diagnostics.push(violation("votes_cast", format!("{votes} ballots for {voters} authorized voters")));
                continue;
            }
            if let Some(col) = turnout_col {
                match parse_number(col.get(row).unwrap_or_default(), source.decimal_comma) {
                    Ok(Some(published)) => {
                        // Published as a percentage or as a fraction.
                        let published = if published > 1.0 { published / 100.0 } else { published };
                        let implied = votes / voters;
                        if (published - implied).abs() > TURNOUT_TOLERANCE {
                            diagnostics.push(violation("turnout", format!("published {published:.4} but counts give {implied:.4}")));
                        }
                    }
                    Ok(None) => {}
                    Err(e) => diagnostics.push(violation("turnout", e)),
                }
            }

            let unit = if by_id { normalize_unit_id(raw) } else { shares[0].county.to_string() };
            if !seen.insert(unit.clone()) {
                diagnostics.push(violation(unit_column, format!("duplicate row for {unit}")));
                continue;
            }

            for share in &shares {
                let entry = totals.entry(share.county.clone()).or_insert((0.0, 0.0));
                entry.0 += voters * share.weight;
                entry.1 += votes * share.weight;
            }
        }

        let mut count = 0;
        for (county, (voters, votes)) in totals {
            let key = (county.clone(), source.year, source.round);
            if results.contains_key(&key) {
                diagnostics.push(Diagnostic::SchemaViolation {
                    table: table.name().to_string(), line: 0, column: source.id_column.clone(),
                    reason: format!("second result for {county} in {} round {}", source.year, source.round),
                });
                continue;
            }
            let voters = voters.round_ties_even() as u64;
            let votes = (votes.round_ties_even() as u64).min(voters);
            match ElectionResult::new(county, source.year, source.round, voters, votes) {
                Ok(result) => { results.insert(key, result); count += 1 }
                Err(reason) => diagnostics.push(Diagnostic::SchemaViolation {
                    table: table.name().to_string(), line: 0, column: "authorized_voters".into(), reason,
                }),
            }
        }
        info!("[features::elections] {} round {}: {count} counties", source.year, source.round);
    }

    Ok(results.into_values().collect())
}

/// A non-negative whole number of people.
fn parse_count(raw: &str, decimal_comma: bool) -> Result<f64, String> {
    match parse_number(raw, decimal_comma)? {
        Some(v) if v >= 0.0 && v.fract() == 0.0 => Ok(v),
        Some(v) => Err(format!("{v} is not a non-negative whole count")),
        None => Err("missing count".into()),
    }
}
