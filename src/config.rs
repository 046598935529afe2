//! Pipeline configuration, read from a JSON file.
//!
//! Relative paths are resolved against the directory holding the config file.

use std::{collections::{BTreeMap, BTreeSet}, fs, path::{Path, PathBuf}};

use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};

use crate::common::resolve_path;
use crate::features::FirstYearPolicy;
use crate::types::{Indicator, Level, Round};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Current-era county boundaries.
    pub counties: BoundarySource,
    /// Boundaries of earlier vintages, reconciled by area overlap.
    #[serde(default)]
    pub historical_boundaries: Vec<HistoricalBoundarySource>,
    /// Tabular crosswalks (`historical_id,current_id,weight`).
    #[serde(default)]
    pub crosswalks: Vec<CrosswalkSource>,
    #[serde(default)]
    pub reconcile: ReconcileConfig,
    pub indicators: IndicatorConfig,
    #[serde(default)]
    pub impute: ImputeConfig,
    #[serde(default)]
    pub features: FeatureConfig,
    #[serde(default)]
    pub elections: Vec<ElectionSource>,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub forecast: ForecastConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// A boundary file. Unset field names default by format: GUGiK's
/// `JPT_KOD_JE`/`JPT_NAZWA_` for shapefiles, `terc_code`/`name` otherwise.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BoundarySource {
    pub path: PathBuf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name_field: Option<String>,
}

impl BoundarySource {
    fn is_shapefile(&self) -> bool {
        self.path.extension().is_some_and(|e| e.eq_ignore_ascii_case("shp"))
    }

    pub fn id_field(&self) -> &str {
        match &self.id_field {
            Some(field) => field.as_str(),
            None if self.is_shapefile() => "JPT_KOD_JE",
            None => "terc_code",
        }
    }

    pub fn name_field(&self) -> &str {
        match &self.name_field {
            Some(field) => field.as_str(),
            None if self.is_shapefile() => "JPT_NAZWA_",
            None => "name",
        }
    }
}

fn default_id_field() -> String { "terc_code".into() }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoricalBoundarySource {
    /// Year the boundaries were valid for; raw tables refer to it by this value.
    pub vintage: i32,
    #[serde(flatten)]
    pub boundary: BoundarySource,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrosswalkSource {
    pub vintage: i32,
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileConfig {
    /// Share above which a historical unit is assigned wholesale to its
    /// dominant county. `None` splits every unit proportionally.
    pub dominance_threshold: Option<f64>,
    /// Overlap fractions below this are treated as digitizing noise.
    pub sliver_tolerance: f64,
    /// Units covered less than this are reported (but still reconciled).
    pub min_coverage: f64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self { dominance_threshold: None, sliver_tolerance: 0.001, min_coverage: 0.95 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    /// Indicators in feature-vector order.
    pub order: Vec<Indicator>,
    /// Count-like indicators, apportioned by area weight when a historical unit is split.
    #[serde(default)]
    pub extensive: Vec<Indicator>,
    /// Money-valued indicators, deflated to `base_year` prices.
    #[serde(default)]
    pub monetary: Vec<Indicator>,
    /// `year,index` table used for deflation.
    #[serde(default)]
    pub price_index: Option<PathBuf>,
    #[serde(default)]
    pub base_year: Option<i32>,
    pub sources: Vec<IndicatorSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSource {
    /// A file, or a directory of per-year files.
    pub path: PathBuf,
    /// Raw column name -> indicator.
    pub columns: BTreeMap<String, Indicator>,
    #[serde(default = "default_id_field")]
    pub id_column: String,
    #[serde(default = "default_year_column")]
    pub year_column: String,
    /// Year of every row when the table has no year column. Per-year files
    /// in a directory fall back to the year in their file name.
    #[serde(default)]
    pub year: Option<i32>,
    /// Boundary vintage the ids refer to; `None` means current counties.
    #[serde(default)]
    pub vintage: Option<i32>,
    #[serde(default)]
    pub level: Level,
    /// Multiplier applied to every value (e.g. 1000.0 for tables in thousands).
    #[serde(default = "default_scale")]
    pub scale: f64,
    #[serde(default = "default_separator")]
    pub separator: char,
    #[serde(default = "default_decimal_comma")]
    pub decimal_comma: bool,
}

fn default_year_column() -> String { "year".into() }
fn default_scale() -> f64 { 1.0 }
fn default_separator() -> char { ';' }
fn default_decimal_comma() -> bool { true }

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputeConfig {
    /// First year every series must cover (backcast territory below the data).
    pub start_year: i32,
    /// Last year every series must cover (forecast territory above the data).
    pub end_year: i32,
    /// Series shorter than this are extrapolated with a linear trend instead of ARIMA.
    pub arima_min_points: usize,
    pub max_p: usize,
    pub max_d: usize,
    /// Clip extrapolated values at zero for series observed non-negative.
    pub clip_non_negative: bool,
}

impl Default for ImputeConfig {
    fn default() -> Self {
        Self {
            start_year: 1999,
            end_year: 2029,
            arima_min_points: 3,
            max_p: 2,
            max_d: 1,
            clip_non_negative: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// An election in year Y reads indicators from year Y - lag_years.
    pub lag_years: i32,
    /// Horizons (in years) of the delta features.
    pub delta_horizons: Vec<i32>,
    pub first_year_policy: FirstYearPolicy,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self { lag_years: 1, delta_horizons: vec![1, 5], first_year_policy: FirstYearPolicy::Exclude }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ElectionSource {
    pub path: PathBuf,
    pub year: i32,
    pub round: Round,
    /// Boundary vintage the ids refer to; `None` means current counties.
    #[serde(default)]
    pub vintage: Option<i32>,
    #[serde(default = "default_id_field")]
    pub id_column: String,
    /// Used when the id column is absent: rows are matched by county name.
    #[serde(default = "default_name_column")]
    pub name_column: String,
    /// Optional voivodeship code column, used to break name ties.
    #[serde(default)]
    pub voivodeship_column: Option<String>,
    #[serde(default = "default_election_separator")]
    pub separator: char,
    #[serde(default)]
    pub decimal_comma: bool,
}

fn default_name_column() -> String { "county".into() }
fn default_election_separator() -> char { ',' }

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    /// Year held out for evaluation; `None` skips evaluation.
    pub holdout_year: Option<i32>,
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    /// Minimum hessian sum in a leaf; a row count under squared error.
    pub min_child_weight: usize,
    /// L2 penalty on leaf weights.
    pub lambda: f64,
    /// Minimum gain for a split.
    pub gamma: f64,
    /// Fraction of training rows sampled per tree.
    pub subsample: f64,
    pub seed: u64,
    /// Evaluation skips rows whose share of imputed cells exceeds this.
    pub max_imputed_share: Option<f64>,
    /// Refit on every usable row (holdout included) before forecasting.
    pub refit_on_all: bool,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            holdout_year: None,
            n_estimators: 300,
            learning_rate: 0.05,
            max_depth: 4,
            min_child_weight: 5,
            lambda: 1.0,
            gamma: 0.0,
            subsample: 0.8,
            seed: 42,
            max_imputed_share: None,
            refit_on_all: true,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    pub target_year: i32,
    pub round: Round,
}

impl Default for ForecastConfig {
    fn default() -> Self { Self { target_year: 2030, round: Round::First } }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self { Self { dir: PathBuf::from("out") } }
}

impl PipelineConfig {
    /// Read, resolve and validate a config file.
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("[config] Failed to read {}", path.display()))?;
        let mut config: PipelineConfig = serde_json::from_str(&text)
            .with_context(|| format!("[config] Failed to parse {}", path.display()))?;

        let base = path.parent().unwrap_or(Path::new("."));
        config.resolve_paths(base);
        config.validate()?;
        Ok(config)
    }

    /// Make every relative path absolute with respect to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        self.counties.path = resolve_path(base, &self.counties.path);
        for h in &mut self.historical_boundaries {
            h.boundary.path = resolve_path(base, &h.boundary.path);
        }
        for c in &mut self.crosswalks {
            c.path = resolve_path(base, &c.path);
        }
        if let Some(p) = &self.indicators.price_index {
            self.indicators.price_index = Some(resolve_path(base, p));
        }
        for s in &mut self.indicators.sources {
            s.path = resolve_path(base, &s.path);
        }
        for e in &mut self.elections {
            e.path = resolve_path(base, &e.path);
        }
        self.output.dir = resolve_path(base, &self.output.dir);
    }

    pub fn validate(&self) -> Result<()> {
        let r = &self.reconcile;
        if let Some(t) = r.dominance_threshold {
            ensure!((0.5..=1.0).contains(&t), "[config] reconcile.dominance_threshold must be in [0.5, 1], got {t}");
        }
        ensure!((0.0..0.5).contains(&r.sliver_tolerance), "[config] reconcile.sliver_tolerance must be in [0, 0.5)");
        ensure!((0.0..=1.0).contains(&r.min_coverage), "[config] reconcile.min_coverage must be in [0, 1]");

        let ind = &self.indicators;
        ensure!(!ind.order.is_empty(), "[config] indicators.order must name at least one indicator");
        for name in ind.extensive.iter().chain(&ind.monetary) {
            ensure!(ind.order.contains(name), "[config] indicator {name} is not listed in indicators.order");
        }
        for source in &ind.sources {
            ensure!(!source.columns.is_empty(), "[config] indicator source {} maps no columns", source.path.display());
            ensure!(source.scale.is_finite() && source.scale > 0.0, "[config] indicator source {} has a non-positive scale", source.path.display());
            for name in source.columns.values() {
                ensure!(ind.order.contains(name), "[config] source {} feeds unknown indicator {name}", source.path.display());
            }
        }
        ensure!(
            ind.monetary.is_empty() || (ind.price_index.is_some() && ind.base_year.is_some()),
            "[config] monetary indicators need indicators.price_index and indicators.base_year",
        );

        let vintages: BTreeSet<i32> = self.historical_boundaries.iter().map(|h| h.vintage)
            .chain(self.crosswalks.iter().map(|c| c.vintage))
            .collect();
        let referenced = ind.sources.iter().map(|s| (s.vintage, &s.path))
            .chain(self.elections.iter().map(|e| (e.vintage, &e.path)));
        for (vintage, path) in referenced {
            if let Some(v) = vintage {
                ensure!(
                    vintages.contains(&v),
                    "[config] {} refers to vintage {v}, which has no historical boundaries or crosswalk",
                    path.display(),
                );
            }
        }

        let imp = &self.impute;
        ensure!(imp.start_year <= imp.end_year, "[config] impute.start_year must not exceed impute.end_year");
        ensure!(imp.arima_min_points >= 2, "[config] impute.arima_min_points must be at least 2");

        let feat = &self.features;
        ensure!(feat.lag_years >= 0, "[config] features.lag_years must be non-negative");
        ensure!(feat.delta_horizons.iter().all(|&h| h > 0), "[config] features.delta_horizons must be positive");

        let m = &self.model;
        ensure!(m.n_estimators > 0, "[config] model.n_estimators must be positive");
        ensure!(m.learning_rate > 0.0 && m.learning_rate <= 1.0, "[config] model.learning_rate must be in (0, 1]");
        ensure!(m.subsample > 0.0 && m.subsample <= 1.0, "[config] model.subsample must be in (0, 1]");
        ensure!(m.min_child_weight > 0, "[config] model.min_child_weight must be positive");
        ensure!(m.lambda >= 0.0 && m.gamma >= 0.0, "[config] model.lambda and model.gamma must be non-negative");
        if let Some(s) = m.max_imputed_share {
            ensure!((0.0..=1.0).contains(&s), "[config] model.max_imputed_share must be in [0, 1]");
        }

        let needed = self.forecast.target_year - feat.lag_years;
        ensure!(
            needed <= imp.end_year,
            "[config] forecast year {} reads indicators from {needed}, beyond impute.end_year {}",
            self.forecast.target_year, imp.end_year,
        );
        Ok(())
    }
}
