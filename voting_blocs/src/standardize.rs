/// Rescales every feature (column) of `x` to zero mean and unit variance.
///
/// The variance is the population variance across the rows. A constant column
/// keeps a scale of 1, so it becomes a column of zeros.
/// The parameters are fitted on `x` alone and are not returned.
pub fn standardize(x: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let n = x.len();
    if n == 0 {
        return vec![];
    }
    let d = x[0].len();
    let mut means = vec![0.0_f64; d];
    for row in x.iter() {
        for (j, v) in row.iter().enumerate() {
            means[j] += v;
        }
    }
    for m in means.iter_mut() {
        *m /= n as f64;
    }
    let mut scales = vec![0.0_f64; d];
    for row in x.iter() {
        for (j, v) in row.iter().enumerate() {
            let c = v - means[j];
            scales[j] += c * c;
        }
    }
    for s in scales.iter_mut() {
        let std = (*s / n as f64).sqrt();
        *s = if std > f64::EPSILON { std } else { 1.0 };
    }
    x.iter()
        .map(|row| {
            row.iter()
                .enumerate()
                .map(|(j, v)| (v - means[j]) / scales[j])
                .collect()
        })
        .collect()
}

/// The average of the per-feature variances. Used to scale convergence thresholds.
pub fn mean_variance(x: &[Vec<f64>]) -> f64 {
    let n = x.len();
    if n == 0 || x[0].is_empty() {
        return 0.0;
    }
    let d = x[0].len();
    let mut total = 0.0;
    for j in 0..d {
        let mean = x.iter().map(|r| r[j]).sum::<f64>() / n as f64;
        total += x.iter().map(|r| (r[j] - mean).powi(2)).sum::<f64>() / n as f64;
    }
    total / d as f64
}
