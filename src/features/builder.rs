use tracing::info;

use crate::config::FeatureConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::indicators::{Cell, IndicatorTable};
use crate::types::{CountyId, CountySet, ElectionResult, Indicator, Round};

use super::{FeatureRow, FeatureTable, FirstYearPolicy, RowStatus};

/// Builds fixed-width feature rows from imputed indicator series.
pub struct FeatureBuilder<'a> {
    indicators: &'a [Indicator],
    config: &'a FeatureConfig,
}

impl<'a> FeatureBuilder<'a> {
    pub fn new(indicators: &'a [Indicator], config: &'a FeatureConfig) -> Self {
        Self { indicators, config }
    }

    /// Column names: every indicator, then `<indicator>_d<h>` per horizon.
    pub fn columns(&self) -> Vec<String> {
        let mut names: Vec<String> = self.indicators.iter().map(|i| i.to_string()).collect();
        for indicator in self.indicators {
            for h in &self.config.delta_horizons {
                names.push(format!("{indicator}_d{h}"));
            }
        }
        names
    }

    /// One row for `county` at an election in `year`, reading indicators
    /// from `year - lag_years`.
    pub fn row(&self, table: &IndicatorTable, county: &CountyId, year: i32, round: Round, target: Option<f64>) -> FeatureRow {
        let reference = year - self.config.lag_years;
        let mut values = Vec::with_capacity(self.indicators.len() * (1 + self.config.delta_horizons.len()));
        let mut missing = Vec::new();
        let mut imputed = 0;

        let present = |cell: Cell| cell.value().zip(cell.provenance());

        for indicator in self.indicators {
            match present(table.cell(county, indicator, reference)) {
                Some((value, provenance)) => {
                    imputed += usize::from(provenance.is_imputed());
                    values.push(Some(value));
                }
                None => {
                    missing.push(indicator.to_string());
                    values.push(None);
                }
            }
        }

        for indicator in self.indicators {
            let current = present(table.cell(county, indicator, reference));
            for &h in &self.config.delta_horizons {
                let past = present(table.cell(county, indicator, reference - h));
                let delta = match (current, past) {
                    (Some((now, p_now)), Some((then, p_then))) => {
                        imputed += usize::from(p_now.is_imputed() || p_then.is_imputed());
                        Some(now - then)
                    }
                    (Some(_), None) if self.config.first_year_policy == FirstYearPolicy::ZeroDelta => {
                        imputed += 1;
                        Some(0.0)
                    }
                    _ => None,
                };
                if delta.is_none() {
                    missing.push(format!("{indicator}_d{h}"));
                }
                values.push(delta);
            }
        }

        let status = if missing.is_empty() { RowStatus::Complete } else { RowStatus::Incomplete { missing } };
        FeatureRow { county: county.clone(), year, round, values, target, imputed, status }
    }

    /// Training rows for every election result plus forecast rows for every
    /// current county at `target_year`/`target_round`. Incomplete rows are
    /// kept in the table and reported.
    pub fn build(
        &self,
        table: &IndicatorTable,
        elections: &[ElectionResult],
        counties: &CountySet,
        target_year: i32,
        target_round: Round,
        diagnostics: &mut Diagnostics,
    ) -> FeatureTable {
        let mut rows: Vec<FeatureRow> = elections.iter()
            .map(|e| self.row(table, e.county(), e.year(), e.round(), Some(e.turnout())))
            .collect();
        rows.extend(counties.ids().map(|id| self.row(table, id, target_year, target_round, None)));

        for row in &rows {
            if let RowStatus::Incomplete { missing } = &row.status {
                diagnostics.push(Diagnostic::IncompleteRow {
                    county: row.county.clone(),
                    year: row.year,
                    round: row.round,
                    missing: missing.clone(),
                });
            }
        }

        let features = FeatureTable { columns: self.columns(), rows };
        info!(
            "[features] {} rows ({} training, {} forecast, {} incomplete)",
            features.rows.len(),
            features.training_rows().count(),
            features.forecast_rows().count(),
            features.incomplete_count(),
        );
        features
    }
}
