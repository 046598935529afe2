//! Turnout predictions for the target election and their renderings.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use polars::prelude::{Column, DataFrame, NamedFrom};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::common::write_atomic;
use crate::features::FeatureTable;
use crate::io::csv::write_csv;
use crate::io::geojson::multipolygon_to_geojson;
use crate::io::html::{write_choropleth, ChoroplethEntry};
use crate::model::{predict_turnout, Regressor};
use crate::types::{CountyId, CountySet, Round};

/// Predicted turnout for every county whose forecast row is complete.
#[derive(Debug, Clone, PartialEq)]
pub struct Forecast {
    pub year: i32,
    pub round: Round,
    pub predictions: BTreeMap<CountyId, f64>,
    /// Counties with an incomplete forecast row, in id order.
    pub excluded: Vec<CountyId>,
}

impl Forecast {
    /// Predict every forecast row of `features` at `year`/`round`.
    pub fn predict<R: Regressor + ?Sized>(model: &R, features: &FeatureTable, year: i32, round: Round) -> Result<Self> {
        let mut predictions = BTreeMap::new();
        let mut excluded = Vec::new();
        for row in features.forecast_rows().filter(|r| r.year == year && r.round == round) {
            match row.model_input() {
                Some(x) => { predictions.insert(row.county.clone(), predict_turnout(model, &x)?); }
                None => excluded.push(row.county.clone()),
            }
        }
        excluded.sort();

        info!("[forecast] {year} round {round}: {} counties predicted", predictions.len());
        if !excluded.is_empty() {
            warn!("[forecast] {} counties have no prediction (incomplete rows): {}",
                excluded.len(), excluded.iter().map(|c| c.as_str()).collect::<Vec<_>>().join(", "));
        }
        Ok(Self { year, round, predictions, excluded })
    }

    /// One line per county: code, name, predicted turnout (empty when excluded).
    pub fn write_csv(&self, path: &Path, counties: &CountySet) -> Result<()> {
        let ids: Vec<String> = counties.ids().map(|id| id.to_string()).collect();
        let names: Vec<String> = counties.iter().map(|c| c.name.clone()).collect();
        let turnout: Vec<Option<f64>> = counties.ids().map(|id| self.predictions.get(id).copied()).collect();
        let mut df = DataFrame::new(vec![
            Column::new("terc_code".into(), ids),
            Column::new("name".into(), names),
            Column::new("turnout".into(), turnout),
        ])?;
        write_csv(&mut df, path)
    }

    /// FeatureCollection of every county with `terc_code`, `name` and `turnout` (null when excluded).
    pub fn write_geojson(&self, path: &Path, counties: &CountySet) -> Result<()> {
        let features: Vec<Value> = counties.iter()
            .map(|c| json!({
                "type": "Feature",
                "properties": {
                    "terc_code": c.id.as_str(),
                    "name": c.name,
                    "turnout": self.predictions.get(&c.id),
                },
                "geometry": multipolygon_to_geojson(&c.geometry),
            }))
            .collect();
        let collection = json!({ "type": "FeatureCollection", "features": features });
        write_atomic(path, |w| {
            serde_json::to_writer(w, &collection).context("[forecast] Failed to serialize predictions GeoJSON")
        })
    }

    /// Choropleth HTML page; excluded counties are drawn grey.
    pub fn write_map(&self, path: &Path, counties: &CountySet) -> Result<()> {
        let entries: Vec<ChoroplethEntry> = counties.iter()
            .map(|c| ChoroplethEntry {
                id: c.id.as_str(),
                name: &c.name,
                geometry: &c.geometry,
                value: self.predictions.get(&c.id).copied(),
            })
            .collect();
        let title = format!("Predicted turnout, {} round {}", self.year, self.round);
        write_choropleth(path, &title, &entries)
    }
}
