use std::{collections::BTreeMap, path::Path};

use anyhow::Result;
use polars::prelude::{Column, DataFrame, NamedFrom};
use serde::Serialize;

use crate::io::csv::write_csv;
use crate::types::{CountyId, Indicator};

/// How a non-observed value was extrapolated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum Method {
    Linear,
    Arima { p: usize, d: usize },
}

/// Where a value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provenance {
    Observed,
    Interpolated,
    Extrapolated(Method),
}

impl Provenance {
    #[inline] pub fn is_imputed(&self) -> bool { !matches!(self, Provenance::Observed) }

    pub fn label(&self) -> String {
        match self {
            Provenance::Observed => "observed".into(),
            Provenance::Interpolated => "interpolated".into(),
            Provenance::Extrapolated(Method::Linear) => "extrapolated:linear".into(),
            Provenance::Extrapolated(Method::Arima { p, d }) => format!("extrapolated:arima({p},{d},0)"),
        }
    }
}

/// One year of one series. Gaps are explicit, never zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Cell {
    Missing,
    Present { value: f64, provenance: Provenance },
}

impl Cell {
    #[inline] pub fn observed(value: f64) -> Cell {
        Cell::Present { value, provenance: Provenance::Observed }
    }

    #[inline] pub fn value(&self) -> Option<f64> {
        match self {
            Cell::Present { value, .. } => Some(*value),
            Cell::Missing => None,
        }
    }

    #[inline] pub fn provenance(&self) -> Option<Provenance> {
        match self {
            Cell::Present { provenance, .. } => Some(*provenance),
            Cell::Missing => None,
        }
    }
}

/// Year -> cell for one `(county, indicator)` pair.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorSeries {
    cells: BTreeMap<i32, Cell>,
}

impl IndicatorSeries {
    pub fn new() -> Self { Self::default() }

    /// Series of observed values.
    pub fn from_observed(points: impl IntoIterator<Item = (i32, f64)>) -> Self {
        Self { cells: points.into_iter().map(|(y, v)| (y, Cell::observed(v))).collect() }
    }

    #[inline] pub fn len(&self) -> usize { self.cells.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.cells.is_empty() }

    /// Cell at `year`; years outside the series read as missing.
    pub fn cell(&self, year: i32) -> Cell {
        self.cells.get(&year).copied().unwrap_or(Cell::Missing)
    }

    #[inline] pub fn value(&self, year: i32) -> Option<f64> { self.cell(year).value() }

    pub fn set(&mut self, year: i32, cell: Cell) {
        self.cells.insert(year, cell);
    }

    /// Cells in year order.
    pub fn iter(&self) -> impl Iterator<Item = (i32, &Cell)> {
        self.cells.iter().map(|(y, c)| (*y, c))
    }

    /// Observed points in year order.
    pub fn observed(&self) -> Vec<(i32, f64)> {
        self.cells.iter()
            .filter_map(|(y, c)| match c {
                Cell::Present { value, provenance: Provenance::Observed } => Some((*y, *value)),
                _ => None,
            })
            .collect()
    }
}

/// Every series of a run, keyed by `(county, indicator)`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndicatorTable {
    series: BTreeMap<(CountyId, Indicator), IndicatorSeries>,
}

impl IndicatorTable {
    pub fn new() -> Self { Self::default() }

    #[inline] pub fn len(&self) -> usize { self.series.len() }

    #[inline] pub fn is_empty(&self) -> bool { self.series.is_empty() }

    pub fn get(&self, county: &CountyId, indicator: &Indicator) -> Option<&IndicatorSeries> {
        self.series.get(&(county.clone(), indicator.clone()))
    }

    pub fn cell(&self, county: &CountyId, indicator: &Indicator, year: i32) -> Cell {
        self.get(county, indicator).map_or(Cell::Missing, |s| s.cell(year))
    }

    pub fn entry(&mut self, county: CountyId, indicator: Indicator) -> &mut IndicatorSeries {
        self.series.entry((county, indicator)).or_default()
    }

    pub fn insert(&mut self, county: CountyId, indicator: Indicator, series: IndicatorSeries) {
        self.series.insert((county, indicator), series);
    }

    pub fn iter(&self) -> impl Iterator<Item = (&CountyId, &Indicator, &IndicatorSeries)> {
        self.series.iter().map(|((c, i), s)| (c, i, s))
    }

    /// Number of present cells per provenance label.
    pub fn provenance_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for (_, _, series) in self.iter() {
            for (_, cell) in series.iter() {
                if let Some(p) = cell.provenance() {
                    *counts.entry(p.label()).or_insert(0) += 1;
                }
            }
        }
        counts
    }

    /// Write present cells as `terc_code,indicator,year,value,provenance`.
    pub fn write_csv(&self, path: &Path) -> Result<()> {
        let mut counties = Vec::new();
        let mut indicators = Vec::new();
        let mut years = Vec::new();
        let mut values = Vec::new();
        let mut provenance = Vec::new();
        for (county, indicator, series) in self.iter() {
            for (year, cell) in series.iter() {
                if let Cell::Present { value, provenance: p } = cell {
                    counties.push(county.to_string());
                    indicators.push(indicator.to_string());
                    years.push(year);
                    values.push(*value);
                    provenance.push(p.label());
                }
            }
        }
        let mut df = DataFrame::new(vec![
            Column::new("terc_code".into(), counties),
            Column::new("indicator".into(), indicators),
            Column::new("year".into(), years),
            Column::new("value".into(), values),
            Column::new("provenance".into(), provenance),
        ])?;
        write_csv(&mut df, path)
    }
}
