//! Turnout regression: a `Regressor` seam, a gradient-boosted ensemble of
//! smartcore regression trees behind it, and holdout evaluation.

mod boosting;
mod evaluate;

pub use boosting::{BoostingParams, GradientBoosting};
pub use evaluate::{mean_absolute_error, train_and_evaluate, Evaluation};

use std::path::Path;

use anyhow::{Context, Result};
use ndarray::ArrayView2;
use serde::Serialize;

use crate::common::write_atomic;

/// A regression function over fixed-width feature vectors.
pub trait Regressor {
    /// Fit on the rows of `x` against `y`, replacing any previous fit.
    fn fit(&mut self, x: ArrayView2<f64>, y: &[f64]) -> Result<()>;

    fn predict(&self, sample: &[f64]) -> Result<f64>;
}

/// Predicted turnout fraction, clipped to `[0, 1]`.
pub fn predict_turnout<R: Regressor + ?Sized>(model: &R, sample: &[f64]) -> Result<f64> {
    Ok(model.predict(sample)?.clamp(0.0, 1.0))
}

/// The model artifact: the fitted ensemble with its input schema and score.
#[derive(Debug, Serialize)]
pub struct ModelArtifact<'a> {
    pub inputs: &'a [String],
    pub evaluation: Option<&'a Evaluation>,
    pub model: &'a GradientBoosting,
}

impl ModelArtifact<'_> {
    pub fn write_json(&self, path: &Path) -> Result<()> {
        write_atomic(path, |w| {
            serde_json::to_writer(w, self).context("[model] Failed to serialize model")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Constant(f64);

    impl Regressor for Constant {
        fn fit(&mut self, _x: ArrayView2<f64>, _y: &[f64]) -> Result<()> { Ok(()) }
        fn predict(&self, _sample: &[f64]) -> Result<f64> { Ok(self.0) }
    }

    #[test]
    fn predictions_are_clipped_to_fractions() {
        assert_eq!(predict_turnout(&Constant(1.3), &[]).unwrap(), 1.0);
        assert_eq!(predict_turnout(&Constant(-0.2), &[]).unwrap(), 0.0);
        assert_eq!(predict_turnout(&Constant(0.55), &[]).unwrap(), 0.55);
    }
}
