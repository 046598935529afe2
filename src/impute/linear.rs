//! Linear interpolation and least-squares trend extrapolation.

/// Value at `year` on the straight line between two observed points.
pub(crate) fn interpolate((y0, v0): (i32, f64), (y1, v1): (i32, f64), year: i32) -> f64 {
    debug_assert!(y0 < year && year < y1);
    let t = f64::from(year - y0) / f64::from(y1 - y0);
    v0 + t * (v1 - v0)
}

/// Least-squares line through `points`, as `(intercept, slope)` in years.
/// `None` with fewer than two distinct years.
pub(crate) fn fit_trend(points: &[(i32, f64)]) -> Option<(f64, f64)> {
    if points.len() < 2 { return None }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|&(y, _)| f64::from(y)).sum::<f64>() / n;
    let mean_y = points.iter().map(|&(_, v)| v).sum::<f64>() / n;

    let (mut sxy, mut sxx) = (0.0, 0.0);
    for &(year, value) in points {
        let dx = f64::from(year) - mean_x;
        sxy += dx * (value - mean_y);
        sxx += dx * dx;
    }
    if !(sxx > 0.0) { return None }
    let slope = sxy / sxx;
    Some((mean_y - slope * mean_x, slope))
}

/// Fill every interior gap of `points` (sorted by year) by interpolation,
/// returning one value per year from the first to the last point.
pub(crate) fn densify(points: &[(i32, f64)]) -> Vec<f64> {
    let mut out = Vec::new();
    for pair in points.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        out.push(a.1);
        for year in a.0 + 1..b.0 {
            out.push(interpolate(a, b, year));
        }
    }
    if let Some(&(_, last)) = points.last() {
        out.push(last);
    }
    out
}
