//! The staged pipeline: reconcile, load and impute, build features, then
//! train, evaluate and forecast. Each stage consumes the previous stage's
//! output and returns a new value; writing artifacts is a separate step.

use std::{collections::BTreeMap, path::Path};

use anyhow::{Context, Result};
use tracing::info;

use crate::common::ensure_dir_exists;
use crate::config::PipelineConfig;
use crate::diagnostics::Diagnostics;
use crate::features::{load_elections, FeatureBuilder, FeatureTable};
use crate::forecast::Forecast;
use crate::impute::Imputer;
use crate::indicators::{load_indicators, IndicatorTable};
use crate::io::manifest::Manifest;
use crate::model::{train_and_evaluate, BoostingParams, Evaluation, GradientBoosting, ModelArtifact};
use crate::reconcile::{reconcile, NameIndex, Reconciliation};

pub const CROSSWALK_FILE: &str = "crosswalk.csv";
pub const DIAGNOSTICS_FILE: &str = "diagnostics.json";
pub const IMPUTED_FILE: &str = "imputed.csv";
pub const FEATURES_FILE: &str = "features.csv";
pub const MODEL_FILE: &str = "model.json";
pub const PREDICTIONS_CSV_FILE: &str = "predictions.csv";
pub const PREDICTIONS_GEOJSON_FILE: &str = "predictions.geojson";
pub const MAP_FILE: &str = "map.html";
pub const MANIFEST_FILE: &str = "manifest.json";

/// Output of the reconciliation stage.
pub struct Reconciled {
    pub reconciliation: Reconciliation,
    pub diagnostics: Diagnostics,
}

impl Reconciled {
    pub fn write(&self, dir: &Path) -> Result<()> {
        ensure_dir_exists(dir)?;
        self.reconciliation.write_csv(&dir.join(CROSSWALK_FILE))?;
        self.diagnostics.write_json(&dir.join(DIAGNOSTICS_FILE))
    }
}

/// Output of indicator loading, imputation and feature construction.
pub struct Built {
    pub reconciliation: Reconciliation,
    pub imputed: IndicatorTable,
    pub features: FeatureTable,
    pub diagnostics: Diagnostics,
}

impl Built {
    pub fn write(&self, dir: &Path) -> Result<()> {
        ensure_dir_exists(dir)?;
        self.reconciliation.write_csv(&dir.join(CROSSWALK_FILE))?;
        self.imputed.write_csv(&dir.join(IMPUTED_FILE))?;
        self.features.write_csv(&dir.join(FEATURES_FILE))?;
        self.diagnostics.write_json(&dir.join(DIAGNOSTICS_FILE))
    }
}

/// Output of model training and forecasting.
pub struct Outcome {
    pub built: Built,
    pub model: GradientBoosting,
    pub evaluation: Option<Evaluation>,
    pub forecast: Forecast,
}

impl Outcome {
    /// Write every artifact, then a manifest hashing them.
    pub fn write(&self, dir: &Path) -> Result<()> {
        self.built.write(dir)?;

        let inputs = self.built.features.input_names();
        ModelArtifact { inputs: &inputs, evaluation: self.evaluation.as_ref(), model: &self.model }
            .write_json(&dir.join(MODEL_FILE))?;

        let counties = &self.built.reconciliation.counties;
        self.forecast.write_csv(&dir.join(PREDICTIONS_CSV_FILE), counties)?;
        self.forecast.write_geojson(&dir.join(PREDICTIONS_GEOJSON_FILE), counties)?;
        self.forecast.write_map(&dir.join(MAP_FILE), counties)?;

        let manifest = Manifest::new(
            dir,
            self.forecast.year,
            self.forecast.round.number(),
            self.counts(),
            &[
                CROSSWALK_FILE, IMPUTED_FILE, FEATURES_FILE, DIAGNOSTICS_FILE, MODEL_FILE,
                PREDICTIONS_CSV_FILE, PREDICTIONS_GEOJSON_FILE, MAP_FILE,
            ],
        )?;
        manifest.write(&dir.join(MANIFEST_FILE))?;
        info!("[pipeline] wrote {} artifacts to {}", manifest.files.len() + 1, dir.display());
        Ok(())
    }

    fn counts(&self) -> BTreeMap<String, usize> {
        let features = &self.built.features;
        let mut counts = BTreeMap::from([
            ("counties".to_string(), self.built.reconciliation.counties.len()),
            ("crosswalk_units".to_string(), self.built.reconciliation.crosswalks().map(|c| c.len()).sum()),
            ("training_rows".to_string(), features.training_rows().count()),
            ("incomplete_rows".to_string(), features.incomplete_count()),
            ("predicted".to_string(), self.forecast.predictions.len()),
            ("unpredicted".to_string(), self.forecast.excluded.len()),
        ]);
        for (category, n) in self.built.diagnostics.summary() {
            counts.insert(format!("diagnostics.{category}"), n);
        }
        counts
    }
}

/// The configured pipeline.
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Read and validate a configuration file; relative paths resolve
    /// against the file's directory.
    pub fn from_path(path: &Path) -> Result<Self> {
        Self::new(PipelineConfig::from_path(path)?)
    }

    #[inline] pub fn config(&self) -> &PipelineConfig { &self.config }

    pub fn reconcile(&self) -> Result<Reconciled> {
        let (reconciliation, diagnostics) = reconcile(&self.config)
            .context("[pipeline] Boundary reconciliation failed")?;
        Ok(Reconciled { reconciliation, diagnostics })
    }

    pub fn build(&self, reconciled: Reconciled) -> Result<Built> {
        let Reconciled { reconciliation, mut diagnostics } = reconciled;

        let raw = load_indicators(&self.config.indicators, &reconciliation, &mut diagnostics)
            .context("[pipeline] Indicator loading failed")?;
        let imputed = Imputer::new(&self.config.impute).impute(&raw, &mut diagnostics);

        let names = NameIndex::new(&reconciliation.counties);
        let elections = load_elections(&self.config.elections, &reconciliation, &names, &mut diagnostics)
            .context("[pipeline] Election loading failed")?;
        info!("[pipeline] {} election results", elections.len());

        let features = FeatureBuilder::new(&self.config.indicators.order, &self.config.features).build(
            &imputed,
            &elections,
            &reconciliation.counties,
            self.config.forecast.target_year,
            self.config.forecast.round,
            &mut diagnostics,
        );

        Ok(Built { reconciliation, imputed, features, diagnostics })
    }

    pub fn train(&self, built: Built) -> Result<Outcome> {
        let mut model = GradientBoosting::new(BoostingParams::from(&self.config.model));
        let evaluation = train_and_evaluate(&mut model, &built.features, &self.config.model)?;
        let forecast = Forecast::predict(
            &model,
            &built.features,
            self.config.forecast.target_year,
            self.config.forecast.round,
        )?;
        Ok(Outcome { built, model, evaluation, forecast })
    }

    /// Every stage, then every artifact into the configured output directory.
    pub fn run(&self) -> Result<Outcome> {
        let outcome = self.train(self.build(self.reconcile()?)?)?;
        outcome.write(&self.config.output.dir)?;
        info!("[pipeline] diagnostics: {:?}", outcome.built.diagnostics.summary());
        Ok(outcome)
    }
}
