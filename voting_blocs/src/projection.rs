use log::debug;

const MAX_SWEEPS: usize = 100;

#[derive(PartialEq, Debug, Clone)]
pub struct Projection {
    /// One (x, y) pair per input point.
    pub coords: Vec<(f64, f64)>,
    /// Share of the total variance carried by each of the two axes.
    pub explained_variance_ratio: [f64; 2],
}

/// Eigen-decomposition of a symmetric matrix with the cyclic Jacobi method.
///
/// Returns the eigenvalues and the eigenvectors, the j-th eigenvector being the
/// column `vectors[..][j]`. They are not sorted.
fn symmetric_eigen(mut a: Vec<Vec<f64>>) -> (Vec<f64>, Vec<Vec<f64>>) {
    let n = a.len();
    let mut v: Vec<Vec<f64>> = (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { 0.0 }).collect())
        .collect();
    let scale: f64 = a.iter().flatten().map(|x| x * x).sum();

    for sweep in 0..MAX_SWEEPS {
        let mut off = 0.0;
        for p in 0..n {
            for q in (p + 1)..n {
                off += a[p][q] * a[p][q];
            }
        }
        if off <= 1e-24 * scale || off == 0.0 {
            debug!("symmetric_eigen: converged after {} sweeps", sweep);
            break;
        }
        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[p][q];
                if apq == 0.0 {
                    continue;
                }
                let theta = (a[q][q] - a[p][p]) / (2.0 * apq);
                let t = if theta.abs() > 1e150 {
                    0.5 / theta
                } else {
                    theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt())
                };
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;
                for row in a.iter_mut() {
                    let (akp, akq) = (row[p], row[q]);
                    row[p] = c * akp - s * akq;
                    row[q] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[p][k], a[q][k]);
                    a[p][k] = c * apk - s * aqk;
                    a[q][k] = s * apk + c * aqk;
                }
                for row in v.iter_mut() {
                    let (vkp, vkq) = (row[p], row[q]);
                    row[p] = c * vkp - s * vkq;
                    row[q] = s * vkp + c * vkq;
                }
            }
        }
    }
    let values = (0..n).map(|i| a[i][i]).collect();
    (values, v)
}

/// Projects the points of `x` onto their two directions of largest variance.
///
/// The points are centered first. The decomposition works on the point-by-point
/// Gram matrix, which is small when there are fewer points than dimensions.
/// Each axis is oriented so that the point with the largest absolute coordinate
/// on that axis is on the positive side. If the data spans fewer than two
/// dimensions, the missing coordinates are zero.
pub fn project_2d(x: &[Vec<f64>]) -> Projection {
    let n = x.len();
    if n == 0 {
        return Projection {
            coords: vec![],
            explained_variance_ratio: [0.0, 0.0],
        };
    }
    let d = x[0].len();
    let mut means = vec![0.0_f64; d];
    for row in x.iter() {
        for (m, v) in means.iter_mut().zip(row.iter()) {
            *m += v / n as f64;
        }
    }
    let centered: Vec<Vec<f64>> = x
        .iter()
        .map(|row| row.iter().zip(means.iter()).map(|(v, m)| v - m).collect())
        .collect();

    let mut gram = vec![vec![0.0_f64; n]; n];
    for i in 0..n {
        for j in i..n {
            let g: f64 = centered[i]
                .iter()
                .zip(centered[j].iter())
                .map(|(a, b)| a * b)
                .sum();
            gram[i][j] = g;
            gram[j][i] = g;
        }
    }

    let (values, vectors) = symmetric_eigen(gram);
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|a, b| {
        values[*b]
            .partial_cmp(&values[*a])
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.cmp(b))
    });
    let total: f64 = values.iter().filter(|v| **v > 0.0).sum();
    let threshold = total * 1e-12;

    let mut axes: Vec<Vec<f64>> = Vec::with_capacity(2);
    let mut ratios = [0.0_f64; 2];
    for (slot, idx) in order.iter().take(2).enumerate() {
        let lambda = values[*idx];
        if lambda <= threshold || lambda <= 0.0 {
            axes.push(vec![0.0; n]);
            continue;
        }
        let sigma = lambda.sqrt();
        let mut axis: Vec<f64> = vectors.iter().map(|row| row[*idx] * sigma).collect();
        let mut pivot = 0;
        for (i, a) in axis.iter().enumerate() {
            if a.abs() > axis[pivot].abs() {
                pivot = i;
            }
        }
        if axis[pivot] < 0.0 {
            for a in axis.iter_mut() {
                *a = -*a;
            }
        }
        ratios[slot] = lambda / total;
        axes.push(axis);
    }
    while axes.len() < 2 {
        axes.push(vec![0.0; n]);
    }

    Projection {
        coords: (0..n).map(|i| (axes[0][i], axes[1][i])).collect(),
        explained_variance_ratio: ratios,
    }
}
