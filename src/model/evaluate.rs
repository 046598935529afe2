use anyhow::{ensure, Result};
use ndarray::Array2;
use serde::Serialize;
use tracing::{info, warn};

use crate::config::ModelConfig;
use crate::features::{FeatureRow, FeatureTable};

use super::{predict_turnout, Regressor};

/// Result of scoring a model on a held-out election year.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub holdout_year: i32,
    pub train_rows: usize,
    pub eval_rows: usize,
    /// Holdout rows left out because too many of their values were imputed.
    pub excluded_imputed: usize,
    /// `None` when no holdout row survived.
    pub mae: Option<f64>,
}

/// Design matrix and targets of complete rows with an observed turnout.
pub(crate) fn design<'a>(rows: impl IntoIterator<Item = &'a FeatureRow>) -> Result<(Array2<f64>, Vec<f64>)> {
    let mut flat = Vec::new();
    let mut y = Vec::new();
    let mut width = None;
    for row in rows {
        let (Some(x), Some(target)) = (row.model_input(), row.target) else { continue };
        ensure!(
            *width.get_or_insert(x.len()) == x.len(),
            "[model::evaluate] Feature row {}/{} has {} inputs, expected {}", row.county, row.year, x.len(), width.unwrap_or(0)
        );
        flat.extend(x);
        y.push(target);
    }
    let shape = (y.len(), width.unwrap_or(0));
    Ok((Array2::from_shape_vec(shape, flat)?, y))
}

pub fn mean_absolute_error(predicted: &[f64], actual: &[f64]) -> Option<f64> {
    if predicted.is_empty() || predicted.len() != actual.len() { return None }
    Some(predicted.iter().zip(actual).map(|(p, a)| (p - a).abs()).sum::<f64>() / predicted.len() as f64)
}

/// Train `model` on the training rows of `features`. With a holdout year the
/// model is first fit without that year and scored on it; rows over the
/// `max_imputed_share` threshold are not scored. Afterwards the model is refit
/// on every training row if `refit_on_all` is set.
pub fn train_and_evaluate<R: Regressor>(model: &mut R, features: &FeatureTable, config: &ModelConfig) -> Result<Option<Evaluation>> {
    let all: Vec<&FeatureRow> = features.training_rows().collect();
    ensure!(!all.is_empty(), "[model::evaluate] No complete training rows; cannot fit a model");

    let Some(holdout_year) = config.holdout_year else {
        let (x, y) = design(all.iter().copied())?;
        model.fit(x.view(), &y)?;
        info!("[model] fitted on {} rows", y.len());
        return Ok(None);
    };

    let (held, train): (Vec<&FeatureRow>, Vec<&FeatureRow>) = all.iter().partition(|r| r.year == holdout_year);
    ensure!(!train.is_empty(), "[model::evaluate] Every training row falls in holdout year {holdout_year}");

    let (eval, excluded): (Vec<&FeatureRow>, Vec<&FeatureRow>) = held.iter()
        .partition(|r| config.max_imputed_share.is_none_or(|max| r.imputed_share() <= max));

    let (x, y) = design(train.iter().copied())?;
    model.fit(x.view(), &y)?;

    let predicted: Vec<f64> = eval.iter()
        .filter_map(|r| r.model_input())
        .map(|x| predict_turnout(model, &x))
        .collect::<Result<_>>()?;
    let actual: Vec<f64> = eval.iter().filter_map(|r| r.target).collect();
    let mae = mean_absolute_error(&predicted, &actual);

    let evaluation = Evaluation {
        holdout_year,
        train_rows: train.len(),
        eval_rows: eval.len(),
        excluded_imputed: excluded.len(),
        mae,
    };
    match mae {
        Some(mae) => info!("[model] holdout {holdout_year}: MAE {mae:.4} over {} rows", eval.len()),
        None => warn!("[model] holdout {holdout_year}: no rows to evaluate"),
    }

    if config.refit_on_all && !held.is_empty() {
        let (x, y) = design(all.iter().copied())?;
        model.fit(x.view(), &y)?;
        info!("[model] refitted on all {} rows", y.len());
    }
    Ok(Some(evaluation))
}

#[cfg(test)]
mod tests {
    use ndarray::ArrayView2;

    use super::*;
    use crate::features::RowStatus;
    use crate::types::{CountyId, Round};

    /// Predicts the mean target it was last fitted on.
    #[derive(Default)]
    struct MeanModel {
        mean: f64,
        fits: Vec<usize>,
    }

    impl Regressor for MeanModel {
        fn fit(&mut self, _x: ArrayView2<f64>, y: &[f64]) -> Result<()> {
            self.mean = y.iter().sum::<f64>() / y.len() as f64;
            self.fits.push(y.len());
            Ok(())
        }

        fn predict(&self, _sample: &[f64]) -> Result<f64> { Ok(self.mean) }
    }

    fn row(year: i32, target: f64, imputed: usize) -> FeatureRow {
        FeatureRow {
            county: CountyId::new("0201"),
            year,
            round: Round::First,
            values: vec![Some(1.0), Some(2.0)],
            target: Some(target),
            imputed,
            status: RowStatus::Complete,
        }
    }

    fn features() -> FeatureTable {
        FeatureTable {
            columns: vec!["a".into(), "b".into()],
            rows: vec![row(2015, 0.5, 0), row(2015, 0.7, 0), row(2020, 0.8, 0), row(2020, 0.2, 2)],
        }
    }

    #[test]
    fn holdout_year_is_scored_then_refit() {
        let config = ModelConfig { holdout_year: Some(2020), ..ModelConfig::default() };
        let mut model = MeanModel::default();
        let eval = train_and_evaluate(&mut model, &features(), &config).unwrap().unwrap();

        assert_eq!(eval.train_rows, 2);
        assert_eq!(eval.eval_rows, 2);
        // Trained mean 0.6 against 0.8 and 0.2.
        assert!((eval.mae.unwrap() - 0.3).abs() < 1e-12);
        assert_eq!(model.fits, vec![2, 4]);
    }

    #[test]
    fn heavily_imputed_rows_are_not_scored() {
        let config = ModelConfig { holdout_year: Some(2020), max_imputed_share: Some(0.5), refit_on_all: false, ..ModelConfig::default() };
        let mut model = MeanModel::default();
        let eval = train_and_evaluate(&mut model, &features(), &config).unwrap().unwrap();

        assert_eq!(eval.eval_rows, 1);
        assert_eq!(eval.excluded_imputed, 1);
        assert!((eval.mae.unwrap() - 0.2).abs() < 1e-12);
        assert_eq!(model.fits, vec![2]);
    }

    #[test]
    fn empty_training_set_is_fatal() {
        let table = FeatureTable { columns: vec!["a".into()], rows: vec![] };
        let mut model = MeanModel::default();
        assert!(train_and_evaluate(&mut model, &table, &ModelConfig::default()).is_err());
    }

    #[test]
    fn mae_of_mismatched_lengths_is_none() {
        assert_eq!(mean_absolute_error(&[0.1], &[]), None);
        let mae = mean_absolute_error(&[0.5, 0.5], &[0.4, 0.7]).unwrap();
        assert!((mae - 0.15).abs() < 1e-12);
    }
}
