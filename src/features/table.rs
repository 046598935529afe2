use std::path::Path;

use anyhow::Result;
use polars::prelude::{Column, DataFrame, NamedFrom};

use crate::io::csv::write_csv;
use crate::types::{CountyId, Round};

/// Whether a row can be used for training, evaluation or forecasting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowStatus {
    Complete,
    /// Names of the feature columns that are still missing.
    Incomplete { missing: Vec<String> },
}

/// One `(county, year, round)` observation or forecast query.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub county: CountyId,
    pub year: i32,
    pub round: Round,
    /// Indicator values, then deltas, in schema order. `None` only when
    /// the row is incomplete.
    pub values: Vec<Option<f64>>,
    /// Observed turnout; `None` for forecast rows.
    pub target: Option<f64>,
    /// Number of values derived from imputed cells.
    pub imputed: usize,
    pub status: RowStatus,
}

impl FeatureRow {
    #[inline] pub fn is_complete(&self) -> bool { self.status == RowStatus::Complete }

    /// Share of the feature values that rest on imputed cells.
    pub fn imputed_share(&self) -> f64 {
        if self.values.is_empty() { 0.0 } else { self.imputed as f64 / self.values.len() as f64 }
    }

    /// Model input: the feature values plus a runoff flag. `None` for incomplete rows.
    pub fn model_input(&self) -> Option<Vec<f64>> {
        if !self.is_complete() { return None }
        let mut x: Vec<f64> = self.values.iter().copied().collect::<Option<_>>()?;
        x.push(if self.round == Round::Runoff { 1.0 } else { 0.0 });
        Some(x)
    }
}

/// Feature rows with their column names.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureTable {
    pub columns: Vec<String>,
    pub rows: Vec<FeatureRow>,
}

impl FeatureTable {
    /// Names of the model inputs, matching `FeatureRow::model_input`.
    pub fn input_names(&self) -> Vec<String> {
        let mut names = self.columns.clone();
        names.push("runoff".into());
        names
    }

    /// Complete rows with an observed target.
    pub fn training_rows(&self) -> impl Iterator<Item = &FeatureRow> {
        self.rows.iter().filter(|r| r.target.is_some() && r.is_complete())
    }

    /// Rows without a target (complete or not).
    pub fn forecast_rows(&self) -> impl Iterator<Item = &FeatureRow> {
        self.rows.iter().filter(|r| r.target.is_none())
    }

    pub fn incomplete_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_complete()).count()
    }

    /// Write every row: key, feature columns, target, imputed count, status.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut columns = vec![
            Column::new("terc_code".into(), self.rows.iter().map(|r| r.county.to_string()).collect::<Vec<_>>()),
            Column::new("year".into(), self.rows.iter().map(|r| r.year).collect::<Vec<_>>()),
            Column::new("round".into(), self.rows.iter().map(|r| i32::from(r.round.number())).collect::<Vec<_>>()),
        ];
        for (i, name) in self.columns.iter().enumerate() {
            let values: Vec<Option<f64>> = self.rows.iter().map(|r| r.values.get(i).copied().flatten()).collect();
            columns.push(Column::new(name.as_str().into(), values));
        }
        columns.push(Column::new("turnout".into(), self.rows.iter().map(|r| r.target).collect::<Vec<_>>()));
        columns.push(Column::new("imputed_cells".into(), self.rows.iter().map(|r| r.imputed as u32).collect::<Vec<_>>()));
        columns.push(Column::new("status".into(), self.rows.iter().map(|r| match &r.status {
            RowStatus::Complete => "complete".to_string(),
            RowStatus::Incomplete { missing } => format!("incomplete:{}", missing.join("|")),
        }).collect::<Vec<_>>()));

        let mut df = DataFrame::new(columns)?;
        write_csv(&mut df, path)
    }
}
