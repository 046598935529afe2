use anyhow::{anyhow, ensure, Context, Result};
use ndarray::ArrayView2;
use serde::{Deserialize, Serialize};
use smartcore::linalg::basic::matrix::DenseMatrix;
use smartcore::xgboost::{XGRegressor, XGRegressorParameters};
use tracing::debug;

use crate::config::ModelConfig;

use super::Regressor;

type Booster = XGRegressor<f64, f64, DenseMatrix<f64>, Vec<f64>>;

/// Hyperparameters of the boosted ensemble.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: u16,
    /// Minimum hessian sum per leaf; under squared error, a row count.
    pub min_child_weight: usize,
    pub lambda: f64,
    pub gamma: f64,
    /// Fraction of rows drawn (without replacement) for each tree.
    pub subsample: f64,
    pub seed: u64,
}

impl From<&ModelConfig> for BoostingParams {
    fn from(config: &ModelConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            learning_rate: config.learning_rate,
            max_depth: u16::try_from(config.max_depth).unwrap_or(u16::MAX),
            min_child_weight: config.min_child_weight,
            lambda: config.lambda,
            gamma: config.gamma,
            subsample: config.subsample,
            seed: config.seed,
        }
    }
}

/// smartcore's XGBoost regressor under squared error, started from the mean
/// training target.
#[derive(Debug, Serialize, Deserialize)]
pub struct GradientBoosting {
    params: BoostingParams,
    booster: Option<Booster>,
}

impl GradientBoosting {
    pub fn new(params: BoostingParams) -> Self {
        Self { params, booster: None }
    }
}

/// Row-major copy of `x`.
fn matrix(x: ArrayView2<f64>) -> Result<DenseMatrix<f64>> {
    DenseMatrix::new(x.nrows(), x.ncols(), x.iter().copied().collect(), false)
        .context("[model::boosting] Failed to build the design matrix")
}

impl Regressor for GradientBoosting {
    /// Refitting replaces the previous booster. Row samples are drawn from a
    /// generator seeded with `params.seed`.
    fn fit(&mut self, x: ArrayView2<f64>, y: &[f64]) -> Result<()> {
        let n = x.nrows();
        ensure!(n > 0, "[model::boosting] Cannot fit on an empty training set");
        ensure!(n == y.len(), "[model::boosting] {n} feature rows but {} targets", y.len());

        let p = &self.params;
        // Every tree sees at least one row.
        let subsample = if n as f64 * p.subsample < 1.0 { 1.0 } else { p.subsample };
        let base = y.iter().sum::<f64>() / n as f64;
        let parameters = XGRegressorParameters::default()
            .with_n_estimators(p.n_estimators)
            .with_learning_rate(p.learning_rate)
            .with_max_depth(p.max_depth)
            .with_min_child_weight(p.min_child_weight)
            .with_lambda(p.lambda)
            .with_gamma(p.gamma)
            .with_subsample(subsample)
            .with_seed(p.seed)
            .with_base_score(base);

        let booster = Booster::fit(&matrix(x)?, &y.to_vec(), parameters)
            .context("[model::boosting] Failed to fit the booster")?;
        debug!("[model::boosting] {} rounds on {n} rows, base score {base:.4}", p.n_estimators);
        self.booster = Some(booster);
        Ok(())
    }

    fn predict(&self, sample: &[f64]) -> Result<f64> {
        let booster = self.booster.as_ref()
            .ok_or_else(|| anyhow!("[model::boosting] Model has not been fitted"))?;
        let x = DenseMatrix::new(1, sample.len(), sample.to_vec(), false)
            .context("[model::boosting] Failed to build a prediction row")?;
        let out = booster.predict(&x).context("[model::boosting] Prediction failed")?;
        out.first().copied().ok_or_else(|| anyhow!("[model::boosting] Booster returned no prediction"))
    }
}

#[cfg(test)]
mod tests {
    use ndarray::Array2;

    use super::*;

    fn params(subsample: f64) -> BoostingParams {
        BoostingParams {
            n_estimators: 100,
            learning_rate: 0.1,
            max_depth: 2,
            min_child_weight: 2,
            lambda: 1.0,
            gamma: 0.0,
            subsample,
            seed: 7,
        }
    }

    fn data() -> (Array2<f64>, Vec<f64>) {
        let x = Array2::from_shape_fn((40, 1), |(i, _)| i as f64);
        let y = (0..40).map(|i| if i < 20 { 0.3 } else { 0.7 }).collect();
        (x, y)
    }

    #[test]
    fn learns_a_step_function() {
        let (x, y) = data();
        let mut model = GradientBoosting::new(params(1.0));
        model.fit(x.view(), &y).unwrap();

        assert!((model.predict(&[5.0]).unwrap() - 0.3).abs() < 0.01);
        assert!((model.predict(&[30.0]).unwrap() - 0.7).abs() < 0.01);
    }

    #[test]
    fn same_seed_same_model() {
        let (x, y) = data();
        let mut a = GradientBoosting::new(params(0.5));
        let mut b = GradientBoosting::new(params(0.5));
        a.fit(x.view(), &y).unwrap();
        b.fit(x.view(), &y).unwrap();
        assert_eq!(serde_json::to_string(&a).unwrap(), serde_json::to_string(&b).unwrap());

        let restored: GradientBoosting = serde_json::from_str(&serde_json::to_string(&a).unwrap()).unwrap();
        assert!((restored.predict(&[12.0]).unwrap() - a.predict(&[12.0]).unwrap()).abs() < 1e-9);
    }

    #[test]
    fn tiny_subsample_still_fits() {
        let x = Array2::from_shape_fn((3, 1), |(i, _)| i as f64);
        let mut model = GradientBoosting::new(params(0.1));
        model.fit(x.view(), &[0.4, 0.5, 0.6]).unwrap();
        let p = model.predict(&[1.0]).unwrap();
        assert!(p.is_finite());
    }

    #[test]
    fn unfitted_model_and_empty_training_set_are_errors() {
        let mut model = GradientBoosting::new(params(1.0));
        assert!(model.predict(&[1.0]).is_err());
        let x = Array2::<f64>::zeros((0, 3));
        assert!(model.fit(x.view(), &[]).is_err());
    }
}
