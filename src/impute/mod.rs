//! Gap imputation: interior gaps by linear interpolation, edges by ARIMA
//! (or a linear trend for short series), backcasting on the reversed series.

mod arima;
mod linear;

use tracing::info;

use crate::config::ImputeConfig;
use crate::diagnostics::{Diagnostic, Diagnostics};
use crate::indicators::{Cell, IndicatorSeries, IndicatorTable, Method, Provenance};

pub struct Imputer<'a> {
    config: &'a ImputeConfig,
}

impl<'a> Imputer<'a> {
    pub fn new(config: &'a ImputeConfig) -> Self {
        Self { config }
    }

    /// Fill every missing year of `series` in `[start_year, end_year]`.
    ///
    /// Observed cells are never changed. Fails with the number of observed
    /// points when there are fewer than two.
    pub fn impute_series(&self, series: &IndicatorSeries) -> Result<IndicatorSeries, usize> {
        let observed = series.observed();
        let (Some(&(first, _)), Some(&(last, _))) = (observed.first(), observed.last()) else {
            return Err(0)
        };
        if observed.len() < 2 { return Err(observed.len()) }

        let mut out = series.clone();
        for pair in observed.windows(2) {
            for year in pair[0].0 + 1..pair[1].0 {
                let value = linear::interpolate(pair[0], pair[1], year);
                out.set(year, Cell::Present { value, provenance: Provenance::Interpolated });
            }
        }

        let non_negative = self.config.clip_non_negative && observed.iter().all(|&(_, v)| v >= 0.0);
        let clip = |v: f64| if non_negative { v.max(0.0) } else { v };

        if self.config.end_year > last {
            let horizon = (self.config.end_year - last) as usize;
            let (values, method) = self.extrapolate(&observed, horizon);
            for (step, value) in values.into_iter().enumerate() {
                let provenance = Provenance::Extrapolated(method);
                out.set(last + 1 + step as i32, Cell::Present { value: clip(value), provenance });
            }
        }

        if self.config.start_year < first {
            let horizon = (first - self.config.start_year) as usize;
            let reversed: Vec<(i32, f64)> = observed.iter().rev().map(|&(y, v)| (-y, v)).collect();
            let (values, method) = self.extrapolate(&reversed, horizon);
            for (step, value) in values.into_iter().enumerate() {
                let provenance = Provenance::Extrapolated(method);
                out.set(first - 1 - step as i32, Cell::Present { value: clip(value), provenance });
            }
        }

        Ok(out)
    }

    /// Values for the `horizon` years after the last of `points` (sorted by year).
    fn extrapolate(&self, points: &[(i32, f64)], horizon: usize) -> (Vec<f64>, Method) {
        if points.len() >= self.config.arima_min_points {
            let dense = linear::densify(points);
            if let Some(fit) = arima::select(&dense, self.config.max_p, self.config.max_d) {
                return (fit.forecast(&dense, horizon), Method::Arima { p: fit.p, d: fit.d });
            }
        }

        let (last_year, last_value) = points[points.len() - 1];
        let values = match linear::fit_trend(points) {
            Some((intercept, slope)) => (1..=horizon)
                .map(|step| intercept + slope * f64::from(last_year + step as i32))
                .collect(),
            None => vec![last_value; horizon],
        };
        (values, Method::Linear)
    }

    /// Impute every series of `table` into a new table. Series that cannot be
    /// imputed are copied unchanged and reported.
    pub fn impute(&self, table: &IndicatorTable, diagnostics: &mut Diagnostics) -> IndicatorTable {
        let mut out = IndicatorTable::new();
        for (county, indicator, series) in table.iter() {
            let filled = match self.impute_series(series) {
                Ok(filled) => filled,
                Err(observed) => {
                    diagnostics.push(Diagnostic::Unimputable {
                        county: county.clone(),
                        indicator: indicator.clone(),
                        observed,
                    });
                    series.clone()
                }
            };
            out.insert(county.clone(), indicator.clone(), filled);
        }
        info!("[impute] cells by provenance: {:?}", out.provenance_counts());
        out
    }
}
