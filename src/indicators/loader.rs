//! Reading raw indicator tables into per-county observations.

use std::{collections::BTreeMap, path::{Path, PathBuf}};

use ahash::AHashSet;
use anyhow::{Context, Result, bail};
use polars::prelude::StringChunked;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::common::{parse_number, year_from_name};
use crate::config::IndicatorSource;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::io::csv::TextTable;
use crate::reconcile::{Reconciliation, Share, Shares, normalize_unit_id};
use crate::types::{CountyId, Indicator, Level};

use super::normalize::{Contribution, parse_year};

/// Observations of one source after reconciliation onto current counties.
pub(crate) type SourceValues = BTreeMap<(CountyId, Indicator, i32), f64>;

/// Files making up a source: the path itself, or the `.csv`/`.txt` files
/// directly inside it, in name order.
pub(crate) fn source_files(path: &Path) -> Result<Vec<PathBuf>> {
    if !path.is_dir() {
        crate::common::require_file_exists(path)
            .with_context(|| "[indicators::loader] Missing indicator source")?;
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in WalkDir::new(path).min_depth(1).max_depth(1).sort_by_file_name() {
        let entry = entry
            .with_context(|| format!("[indicators::loader] Failed to list {}", path.display()))?;
        let is_table = entry.path().extension()
            .map(|e| e.eq_ignore_ascii_case("csv") || e.eq_ignore_ascii_case("txt"))
            .unwrap_or(false);
        if entry.file_type().is_file() && is_table {
            files.push(entry.into_path());
        }
    }
    if files.is_empty() {
        bail!("[indicators::loader] No .csv or .txt files in {}", path.display());
    }
    Ok(files)
}

/// Load one configured source.
///
/// Rows are attributed to current counties through the reconciliation
/// (county level) or broadcast to every county of the voivodeship
/// (voivodeship level), then combined per cell: extensive indicators are
/// apportioned by weight and summed, intensive ones weight-averaged.
pub(crate) fn load_source(
    source: &IndicatorSource,
    reconciliation: &Reconciliation,
    extensive: &[Indicator],
    diagnostics: &mut Diagnostics,
) -> Result<SourceValues> {
    let mut cells: BTreeMap<(CountyId, Indicator, i32), Contribution> = BTreeMap::new();
    let mut seen: AHashSet<(String, Indicator, i32)> = AHashSet::new();

    for file in source_files(&source.path)? {
        let table = TextTable::read(&file, source.separator)?;
        let ids = table.column(&source.id_column)?;

        let years = if table.has_column(&source.year_column) {
            YearSource::Column(table.column(&source.year_column)?)
        } else {
            let year = source.year
                .or_else(|| file.file_name().and_then(|n| year_from_name(&n.to_string_lossy())))
                .with_context(|| format!(
                    "[indicators::loader] {} has no `{}` column and no year in its name or config",
                    file.display(), source.year_column,
                ))?;
            YearSource::Fixed(year)
        };

        let mut columns = Vec::new();
        for (raw, indicator) in &source.columns {
            if table.has_column(raw) {
                columns.push((raw.as_str(), indicator, table.column(raw)?));
            } else {
                warn!("[indicators::loader] {} has no column `{raw}`", table.name());
            }
        }
        if columns.is_empty() {
            bail!("[indicators::loader] {} has none of the configured indicator columns", file.display());
        }

        let mut rows = 0;
        for row in 0..table.height() {
            let line = TextTable::line(row);
            let violation = |column: &str, reason: String| Diagnostic::SchemaViolation {
                table: table.name().to_string(), line, column: column.to_string(), reason,
            };

            let raw_id = ids.get(row).unwrap_or_default().trim();
            if raw_id.is_empty() {
                diagnostics.push(violation(&source.id_column, "empty identifier".into()));
                continue;
            }
            let year = match years {
                YearSource::Fixed(y) => y,
                YearSource::Column(col) => match parse_year(col.get(row).unwrap_or_default()) {
                    Ok(y) => y,
                    Err(e) => { diagnostics.push(violation(&source.year_column, e)); continue }
                },
            };
            let Some((unit, shares)) = resolve_unit(raw_id, source, reconciliation) else {
                diagnostics.push(Diagnostic::UnknownIdentifier {
                    table: table.name().to_string(), line, id: raw_id.to_string(),
                });
                continue;
            };

            for (raw, indicator, values) in &columns {
                let value = match parse_number(values.get(row).unwrap_or_default(), source.decimal_comma) {
                    Ok(Some(v)) => v * source.scale,
                    Ok(None) => continue,
                    Err(e) => { diagnostics.push(violation(raw, e)); continue }
                };
                let is_extensive = extensive.contains(indicator);
                if is_extensive && value < 0.0 {
                    diagnostics.push(violation(raw, format!("negative count {value}")));
                    continue;
                }
                if !seen.insert((unit.clone(), (*indicator).clone(), year)) {
                    diagnostics.push(violation(raw, format!("duplicate observation for {unit} in {year}")));
                    continue;
                }
                for share in &shares {
                    cells.entry((share.county.clone(), (*indicator).clone(), year))
                        .or_default()
                        .add(value, share.weight);
                }
            }
            rows += 1;
        }
        debug!("[indicators::loader] {}: {rows} rows", table.name());
    }

    Ok(cells.into_iter()
        .filter_map(|((county, indicator, year), c)| {
            let value = c.combine(extensive.contains(&indicator))?;
            Some(((county, indicator, year), value))
        })
        .collect())
}

/// Long layout carries a year per row; per-year layout one year per file.
#[derive(Clone, Copy)]
enum YearSource<'t> {
    Fixed(i32),
    Column(&'t StringChunked),
}

/// Canonical unit key and the current counties it stands for.
fn resolve_unit(raw: &str, source: &IndicatorSource, reconciliation: &Reconciliation) -> Option<(String, Shares)> {
    match source.level {
        Level::County => {
            let shares = reconciliation.resolve(raw, source.vintage)?;
            Some((normalize_unit_id(raw), shares))
        }
        Level::Voivodeship => {
            let code = CountyId::parse(raw, Level::Voivodeship)?;
            let shares: Shares = reconciliation.counties.in_voivodeship(code.as_str())
                .map(|c| Share { county: c.id.clone(), weight: 1.0 })
                .collect();
            if shares.is_empty() { return None }
            Some((code.to_string(), shares))
        }
    }
}
