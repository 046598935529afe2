//! Boundary reconciliation: attribute units of earlier boundary vintages to
//! the current county set.

mod crosswalk;
mod names;
mod table;

pub use crosswalk::{Crosswalk, HistoricalUnit, Reconciler, Share, Shares};
pub use names::{NameIndex, NameMatch};
pub use table::read_crosswalk_table;

use std::{collections::BTreeMap, path::Path, sync::Arc};

use anyhow::{Context, Result};
use geo::{Area, MultiPolygon};
use overlay::LayerIndex;
use polars::prelude::{Column, DataFrame, NamedFrom};
use smallvec::smallvec;
use tracing::info;

use crate::config::{BoundarySource, PipelineConfig};
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::io::{boundaries::read_boundaries, csv::write_csv};
use crate::types::{County, CountyId, CountySet, HistoricalId, Level};

/// Canonical text of a unit id: TERC-like codes are zero-padded the same
/// way county ids are, anything else is kept as trimmed text.
pub(crate) fn normalize_unit_id(raw: &str) -> String {
    CountyId::parse(raw, Level::County)
        .map(|id| id.as_str().to_string())
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Current counties plus one crosswalk per historical vintage.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub counties: CountySet,
    crosswalks: BTreeMap<i32, Crosswalk>,
}

impl Reconciliation {
    /// Fills each county's list of historical units from `crosswalks`.
    pub fn new(mut counties: CountySet, crosswalks: BTreeMap<i32, Crosswalk>) -> Self {
        for (&vintage, crosswalk) in &crosswalks {
            for (id, shares) in crosswalk.iter() {
                for share in shares {
                    if let Some(county) = counties.get_mut(&share.county) {
                        county.historical.push(HistoricalId { vintage, id: Arc::from(id) });
                    }
                }
            }
        }
        Self { counties, crosswalks }
    }

    pub fn crosswalk(&self, vintage: i32) -> Option<&Crosswalk> {
        self.crosswalks.get(&vintage)
    }

    pub fn crosswalks(&self) -> impl Iterator<Item = &Crosswalk> {
        self.crosswalks.values()
    }

    /// Current counties a raw id of `vintage` (`None` = current) maps onto.
    ///
    /// Historical ids resolve only through their own vintage's crosswalk, so
    /// an unreconciled unit or an unknown vintage yields `None`.
    pub fn resolve(&self, raw: &str, vintage: Option<i32>) -> Option<Shares> {
        match vintage {
            Some(v) => {
                let shares = self.crosswalks.get(&v)?.shares(&normalize_unit_id(raw))?;
                Some(shares.iter().cloned().collect())
            }
            None => {
                let id = CountyId::parse(raw, Level::County).filter(|id| self.counties.contains(id))?;
                Some(smallvec![Share { county: id, weight: 1.0 }])
            }
        }
    }

    /// Write every crosswalk as `vintage,historical_id,current_id,weight`.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut vintages = Vec::new();
        let mut historical = Vec::new();
        let mut current = Vec::new();
        let mut weights = Vec::new();
        for crosswalk in self.crosswalks() {
            for (id, shares) in crosswalk.iter() {
                for share in shares {
                    vintages.push(crosswalk.vintage());
                    historical.push(id.to_string());
                    current.push(share.county.to_string());
                    weights.push(share.weight);
                }
            }
        }
        let mut df = DataFrame::new(vec![
            Column::new("vintage".into(), vintages),
            Column::new("historical_id".into(), historical),
            Column::new("current_id".into(), current),
            Column::new("weight".into(), weights),
        ])?;
        write_csv(&mut df, path)
    }
}

/// Read the current county boundaries. Features with bad ids, duplicate ids
/// or no area are reported and skipped.
pub fn load_counties(source: &BoundarySource, diagnostics: &mut Diagnostics) -> Result<CountySet> {
    let table = file_label(&source.path);
    let mut counties = Vec::new();

    for (i, feature) in read_boundaries(source)?.into_iter().enumerate() {
        let Some(id) = CountyId::parse(&feature.id, Level::County) else {
            diagnostics.push(Diagnostic::SchemaViolation {
                table: table.clone(),
                line: i + 1,
                column: source.id_field().to_string(),
                reason: format!("`{}` is not a county TERC code", feature.id),
            });
            continue;
        };
        if !(feature.geometry.unsigned_area() > 0.0) {
            diagnostics.push(Diagnostic::SchemaViolation {
                table: table.clone(),
                line: i + 1,
                column: "geometry".into(),
                reason: format!("county {id} has no area"),
            });
            continue;
        }
        let name = feature.name.unwrap_or_else(|| id.to_string());
        counties.push(County { id, name, geometry: feature.geometry, historical: Vec::new() });
    }

    let (set, duplicates) = CountySet::new(counties);
    for dup in duplicates {
        diagnostics.push(Diagnostic::SchemaViolation {
            table: table.clone(),
            line: 0,
            column: source.id_field().to_string(),
            reason: format!("duplicate county {}; first occurrence kept", dup.id),
        });
    }
    anyhow::ensure!(!set.is_empty(), "[reconcile] No usable counties in {}", source.path.display());
    Ok(set)
}

/// Read the units of one historical boundary vintage, in file order.
pub fn load_historical(source: &BoundarySource) -> Result<Vec<(Arc<str>, MultiPolygon<f64>)>> {
    Ok(read_boundaries(source)?.into_iter()
        .map(|f| (Arc::from(normalize_unit_id(&f.id)), f.geometry))
        .collect())
}

/// Run the reconciliation stage: read tabular crosswalks, build crosswalks
/// by area overlap for the units no table maps, then merge both. Table
/// entries win, and units they supply are never reported as unreconciled.
pub fn reconcile(config: &PipelineConfig) -> Result<(Reconciliation, Diagnostics)> {
    let mut diagnostics = Diagnostics::new();
    let counties = load_counties(&config.counties, &mut diagnostics)?;
    info!("[reconcile] {} current counties", counties.len());

    let mut tables: BTreeMap<i32, Crosswalk> = BTreeMap::new();
    for source in &config.crosswalks {
        let crosswalk = read_crosswalk_table(source.vintage, &source.path, &counties, &mut diagnostics)?;
        info!("[reconcile] vintage {}: {} units from {}", source.vintage, crosswalk.len(), source.path.display());
        merge_into(&mut tables, crosswalk);
    }

    let index = LayerIndex::new(counties.iter().map(|c| c.geometry.clone()).collect())
        .context("[reconcile] Failed to index current counties")?;
    let reconciler = Reconciler::new(&config.reconcile, &counties, &index);

    let mut crosswalks: BTreeMap<i32, Crosswalk> = BTreeMap::new();
    for source in &config.historical_boundaries {
        let units = load_historical(&source.boundary)?;
        let table = tables.get(&source.vintage);
        let overlaid: Vec<HistoricalUnit> = units.iter()
            .filter(|(id, _)| table.is_none_or(|t| t.shares(id).is_none()))
            .map(|(id, geometry)| HistoricalUnit { id, geometry })
            .collect();
        let skipped = units.len() - overlaid.len();
        let total = overlaid.len();
        let crosswalk = reconciler.reconcile(source.vintage, overlaid, &mut diagnostics);
        info!(
            "[reconcile] vintage {}: {} of {total} units reconciled by overlap, {skipped} left to tables",
            source.vintage, crosswalk.len(),
        );
        merge_into(&mut crosswalks, crosswalk);
    }

    for crosswalk in tables.into_values() {
        merge_into(&mut crosswalks, crosswalk);
    }

    Ok((Reconciliation::new(counties, crosswalks), diagnostics))
}

fn merge_into(crosswalks: &mut BTreeMap<i32, Crosswalk>, incoming: Crosswalk) {
    let target = crosswalks.entry(incoming.vintage()).or_insert_with(|| Crosswalk::new(incoming.vintage()));
    for (id, shares) in incoming.iter() {
        target.insert(Arc::from(id), shares.iter().cloned());
    }
}

pub(crate) fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
