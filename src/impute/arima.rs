//! ARIMA(p, d, 0) with constant, fitted by conditional least squares.
//!
//! Order selection walks a fixed grid (`d` outer, `p` inner, both ascending)
//! and keeps the first order with minimum AIC, so identical series always
//! get identical forecasts.

use ndarray::{Array1, Array2};

/// Relative pivot size below which the design is treated as singular.
const SINGULAR: f64 = 1e-10;

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ArimaFit {
    pub p: usize,
    pub d: usize,
    pub intercept: f64,
    /// AR coefficients, lag 1 first.
    pub phi: Vec<f64>,
    pub aic: f64,
}

/// Difference `x` once.
fn diff(x: &[f64]) -> Vec<f64> {
    x.windows(2).map(|w| w[1] - w[0]).collect()
}

/// Fit one order. `None` when the order is not admissible for `x`.
pub(crate) fn fit(x: &[f64], p: usize, d: usize) -> Option<ArimaFit> {
    if x.len() <= d { return None }
    let mut w = x.to_vec();
    for _ in 0..d { w = diff(&w) }

    let m = w.len().checked_sub(p)?;
    let k = p + 1;
    // The random walk with drift needs a single differenced observation.
    let random_walk = p == 0 && d == 1;
    if m < 1 || (!random_walk && m < k + 2) { return None }

    let mut design = Array2::<f64>::zeros((m, k));
    let mut target = Array1::<f64>::zeros(m);
    for row in 0..m {
        let t = row + p;
        design[[row, 0]] = 1.0;
        for lag in 1..=p {
            design[[row, lag]] = w[t - lag];
        }
        target[row] = w[t];
    }

    let xtx = design.t().dot(&design);
    let xty = design.t().dot(&target);
    let beta = solve(xtx, xty)?;
    let phi: Vec<f64> = beta.iter().skip(1).copied().collect();
    if !is_stationary(&phi) { return None }

    let residuals = &target - &design.dot(&beta);
    let rss = residuals.dot(&residuals);
    let scale = target.dot(&target) / m as f64;
    let sigma2 = (rss / m as f64).max(1e-12 * scale.max(1.0));
    let aic = m as f64 * sigma2.ln() + 2.0 * (k + 1) as f64;

    Some(ArimaFit { p, d, intercept: beta[0], phi, aic })
}

/// Best admissible order on the grid `d in 0..=max_d`, `p in 0..=max_p`.
pub(crate) fn select(x: &[f64], max_p: usize, max_d: usize) -> Option<ArimaFit> {
    let mut best: Option<ArimaFit> = None;
    for d in 0..=max_d {
        for p in 0..=max_p {
            let Some(candidate) = fit(x, p, d) else { continue };
            if best.as_ref().is_none_or(|b| candidate.aic < b.aic) {
                best = Some(candidate);
            }
        }
    }
    best
}

impl ArimaFit {
    /// Forecast `horizon` steps past the end of `x` (the series it was fit on).
    pub(crate) fn forecast(&self, x: &[f64], horizon: usize) -> Vec<f64> {
        // Last value of each differencing level, and the differenced history.
        let mut levels = Vec::with_capacity(self.d);
        let mut w = x.to_vec();
        for _ in 0..self.d {
            levels.push(*w.last().unwrap_or(&0.0));
            w = diff(&w);
        }

        let mut out = Vec::with_capacity(horizon);
        for _ in 0..horizon {
            let n = w.len();
            let mut next = self.intercept;
            for (lag, coef) in self.phi.iter().enumerate() {
                next += coef * w[n - 1 - lag];
            }
            w.push(next);

            let mut value = next;
            for level in levels.iter_mut().rev() {
                *level += value;
                value = *level;
            }
            out.push(value);
        }
        out
    }
}

/// Stationarity of the AR polynomial via the step-down recursion: every
/// partial autocorrelation must lie strictly inside (-1, 1).
fn is_stationary(phi: &[f64]) -> bool {
    let mut a = phi.to_vec();
    while let Some(&r) = a.last() {
        if !(r.abs() < 1.0) { return false }
        let k = a.len();
        let denom = 1.0 - r * r;
        a = (0..k - 1).map(|j| (a[j] + r * a[k - 2 - j]) / denom).collect();
    }
    true
}

/// Solve `a x = b` by Gaussian elimination with partial pivoting.
fn solve(mut a: Array2<f64>, mut b: Array1<f64>) -> Option<Array1<f64>> {
    let n = b.len();
    let norm = a.iter().fold(0.0_f64, |m, v| m.max(v.abs())).max(f64::MIN_POSITIVE);

    for col in 0..n {
        let pivot = (col..n).max_by(|&i, &j| a[[i, col]].abs().total_cmp(&a[[j, col]].abs()))?;
        if a[[pivot, col]].abs() < SINGULAR * norm { return None }
        if pivot != col {
            for c in 0..n { a.swap([col, c], [pivot, c]) }
            b.swap(col, pivot);
        }
        for row in col + 1..n {
            let factor = a[[row, col]] / a[[col, col]];
            if factor == 0.0 { continue }
            for c in col..n {
                a[[row, c]] -= factor * a[[col, c]];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = Array1::<f64>::zeros(n);
    for row in (0..n).rev() {
        let tail: f64 = (row + 1..n).map(|c| a[[row, c]] * x[c]).sum();
        x[row] = (b[row] - tail) / a[[row, row]];
    }
    Some(x)
}
