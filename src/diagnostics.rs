//! Problems found in the inputs that are reported to the operator instead of
//! being repaired. Stages record into one shared collection, which the pipeline
//! writes out as the diagnostics report.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, warn};

use crate::common::write_atomic;
use crate::types::{CountyId, Indicator, Round};

#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A historical unit that overlaps no current county.
    #[error("historical unit {id} (vintage {vintage}) overlaps no current county")]
    UnreconciledUnit { vintage: i32, id: String },

    /// A historical unit only partly covered by the current county set.
    #[error("historical unit {id} (vintage {vintage}) is only {coverage:.3} covered by current counties")]
    PartialCoverage { vintage: i32, id: String, coverage: f64 },

    /// A crosswalk table entry that cannot be used.
    #[error("crosswalk {table}: {reason}")]
    InvalidCrosswalk { table: String, reason: String },

    /// A raw value that cannot be parsed or is out of range.
    #[error("{table} line {line}: column `{column}`: {reason}")]
    SchemaViolation { table: String, line: usize, column: String, reason: String },

    /// A raw row that refers to a unit no crosswalk or county knows about.
    #[error("{table} line {line}: unrecognized identifier `{id}`")]
    UnknownIdentifier { table: String, line: usize, id: String },

    /// A county name matching several counties with no way to pick one.
    #[error("{table} line {line}: county name `{name}` is ambiguous ({candidates})")]
    AmbiguousName { table: String, line: usize, name: String, candidates: String },

    /// A series with too few observations to impute from.
    #[error("series {county}/{indicator} has {observed} observed point(s) and cannot be imputed")]
    Unimputable { county: CountyId, indicator: Indicator, observed: usize },

    /// A feature row with indicator values still missing after imputation.
    #[error("feature row {county}/{year}/round {round} is incomplete: missing {missing:?}")]
    IncompleteRow { county: CountyId, year: i32, round: Round, missing: Vec<String> },
}

/// Taxonomy bucket of a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Boundary,
    Schema,
    Imputation,
    IncompleteRow,
}

impl Category {
    pub fn to_str(&self) -> &'static str {
        match self {
            Category::Boundary => "boundary",
            Category::Schema => "schema",
            Category::Imputation => "imputation",
            Category::IncompleteRow => "incomplete_row",
        }
    }
}

impl Diagnostic {
    pub fn category(&self) -> Category {
        match self {
            Diagnostic::UnreconciledUnit { .. }
            | Diagnostic::PartialCoverage { .. }
            | Diagnostic::InvalidCrosswalk { .. } => Category::Boundary,
            Diagnostic::SchemaViolation { .. }
            | Diagnostic::UnknownIdentifier { .. }
            | Diagnostic::AmbiguousName { .. } => Category::Schema,
            Diagnostic::Unimputable { .. } => Category::Imputation,
            Diagnostic::IncompleteRow { .. } => Category::IncompleteRow,
        }
    }
}

/// Ordered collection of diagnostics raised by one or more stages.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self { Self::default() }

    /// Record a diagnostic. Incomplete rows are expected in bulk (every
    /// county's first year, for instance) and are only logged at debug level.
    pub fn push(&mut self, diagnostic: Diagnostic) {
        match diagnostic.category() {
            Category::IncompleteRow => debug!("{diagnostic}"),
            _ => warn!("{diagnostic}"),
        }
        self.entries.push(diagnostic);
    }

    #[inline] pub fn len(&self) -> usize { self.entries.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.entries.is_empty() }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> { self.entries.iter() }

    pub fn count(&self, category: Category) -> usize {
        self.entries.iter().filter(|d| d.category() == category).count()
    }

    /// Number of diagnostics per category; categories with none are listed as zero.
    pub fn summary(&self) -> BTreeMap<&'static str, usize> {
        [Category::Boundary, Category::Schema, Category::Imputation, Category::IncompleteRow]
            .into_iter()
            .map(|c| (c.to_str(), self.count(c)))
            .collect()
    }

    /// Write `{ "summary": ..., "diagnostics": [...] }` to `path`.
    pub fn write_json(&self, path: &Path) -> Result<()> {
        let report = json!({
            "summary": self.summary(),
            "diagnostics": self.entries,
        });
        write_atomic(path, |w| {
            serde_json::to_writer_pretty(w, &report)
                .context("[diagnostics] Failed to serialize diagnostics report")
        })
    }
}
