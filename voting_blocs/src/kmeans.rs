use log::debug;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

#[derive(PartialEq, Debug, Clone)]
pub struct KMeansSettings {
    pub k: usize,
    pub seed: u64,
    /// Number of independent seedings. The one with the lowest inertia is kept.
    pub repeats: u32,
    pub max_iterations: u32,
    /// Absolute threshold on the total squared centroid shift.
    pub tolerance: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct Clustering {
    /// One label per point, in `0..k`.
    pub labels: Vec<u32>,
    pub centroids: Vec<Vec<f64>>,
    /// Sum of the squared distances of each point to its centroid.
    pub inertia: f64,
    pub iterations: u32,
}

fn squared_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum()
}

// Ties go to the lowest centroid index.
fn nearest(point: &[f64], centroids: &[Vec<f64>]) -> (usize, f64) {
    let mut best_idx = 0;
    let mut best_dist = f64::INFINITY;
    for (i, c) in centroids.iter().enumerate() {
        let d = squared_distance(point, c);
        if d < best_dist {
            best_dist = d;
            best_idx = i;
        }
    }
    (best_idx, best_dist)
}

/// k-means++ seeding: each new centroid is drawn with a probability proportional to its
/// squared distance to the closest centroid already chosen.
fn seed_centroids(x: &[Vec<f64>], k: usize, rng: &mut StdRng) -> Vec<Vec<f64>> {
    let n = x.len();
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    centroids.push(x[rng.gen_range(0..n)].clone());
    let mut closest: Vec<f64> = x
        .iter()
        .map(|p| squared_distance(p, &centroids[0]))
        .collect();
    while centroids.len() < k {
        let total: f64 = closest.iter().sum();
        let idx = if total > 0.0 {
            let target = rng.gen::<f64>() * total;
            let mut acc = 0.0;
            let mut chosen = n - 1;
            for (i, d) in closest.iter().enumerate() {
                acc += d;
                if acc > target {
                    chosen = i;
                    break;
                }
            }
            chosen
        } else {
            // All the points sit on the chosen centroids.
            rng.gen_range(0..n)
        };
        let c = x[idx].clone();
        for (i, p) in x.iter().enumerate() {
            closest[i] = closest[i].min(squared_distance(p, &c));
        }
        centroids.push(c);
    }
    centroids
}

fn assign(x: &[Vec<f64>], centroids: &[Vec<f64>]) -> (Vec<u32>, f64) {
    let mut inertia = 0.0;
    let labels = x
        .iter()
        .map(|p| {
            let (idx, d) = nearest(p, centroids);
            inertia += d;
            idx as u32
        })
        .collect();
    (labels, inertia)
}

fn recompute_centroids(
    x: &[Vec<f64>],
    labels: &[u32],
    previous: &[Vec<f64>],
) -> Vec<Vec<f64>> {
    let k = previous.len();
    let d = x[0].len();
    let mut sums = vec![vec![0.0_f64; d]; k];
    let mut counts = vec![0_usize; k];
    for (p, l) in x.iter().zip(labels.iter()) {
        let l = *l as usize;
        counts[l] += 1;
        for (s, v) in sums[l].iter_mut().zip(p.iter()) {
            *s += v;
        }
    }

    // Empty clusters take the points that are the farthest from their current centroid.
    let mut far: Vec<(usize, f64)> = x
        .iter()
        .zip(labels.iter())
        .enumerate()
        .map(|(i, (p, l))| (i, squared_distance(p, &previous[*l as usize])))
        .collect();
    far.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    let mut far_iter = far.into_iter();

    (0..k)
        .map(|c| {
            if counts[c] > 0 {
                sums[c].iter().map(|s| s / counts[c] as f64).collect()
            } else if let Some((i, _)) = far_iter.next() {
                debug!(
                    "recompute_centroids: relocating empty cluster {} to point {}",
                    c, i
                );
                x[i].clone()
            } else {
                previous[c].clone()
            }
        })
        .collect()
}

fn run_once(x: &[Vec<f64>], settings: &KMeansSettings, rng: &mut StdRng) -> Clustering {
    let mut centroids = seed_centroids(x, settings.k, rng);
    let (mut labels, _) = assign(x, &centroids);
    let mut iterations = 0;
    while iterations < settings.max_iterations {
        iterations += 1;
        let next = recompute_centroids(x, &labels, &centroids);
        let shift: f64 = next
            .iter()
            .zip(centroids.iter())
            .map(|(a, b)| squared_distance(a, b))
            .sum();
        centroids = next;
        let (next_labels, _) = assign(x, &centroids);
        let unchanged = next_labels == labels;
        labels = next_labels;
        if unchanged || shift <= settings.tolerance {
            break;
        }
    }
    let (labels, inertia) = assign(x, &centroids);
    Clustering {
        labels,
        centroids,
        inertia,
        iterations,
    }
}

/// Partitions the points of `x` into `settings.k` clusters with Lloyd's algorithm.
///
/// The outcome only depends on `x` and on the settings: the random generator is seeded
/// from `settings.seed`. `k` must be between 1 and the number of points.
pub fn kmeans(x: &[Vec<f64>], settings: &KMeansSettings) -> Clustering {
    assert!(
        settings.k >= 1 && settings.k <= x.len(),
        "kmeans: k={} for {} points",
        settings.k,
        x.len()
    );
    let mut rng = StdRng::seed_from_u64(settings.seed);
    let mut best = run_once(x, settings, &mut rng);
    for _ in 1..settings.repeats.max(1) {
        let c = run_once(x, settings, &mut rng);
        debug!(
            "kmeans: k={} inertia={} after {} iterations",
            settings.k, c.inertia, c.iterations
        );
        if c.inertia < best.inertia {
            best = c;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(k: usize) -> KMeansSettings {
        KMeansSettings {
            k,
            seed: 42,
            repeats: 1,
            max_iterations: 300,
            tolerance: 1e-8,
        }
    }

    fn two_groups() -> Vec<Vec<f64>> {
        vec![
            vec![1.0, 1.0, 1.0],
            vec![1.1, 0.9, 1.0],
            vec![0.9, 1.0, 1.1],
            vec![-1.0, -1.0, -1.0],
            vec![-1.1, -0.9, -1.0],
            vec![-0.9, -1.0, -1.1],
        ]
    }

    #[test]
    fn separates_obvious_groups() {
        let c = kmeans(&two_groups(), &settings(2));
        assert_eq!(c.labels.len(), 6);
        assert_eq!(c.labels[0], c.labels[1]);
        assert_eq!(c.labels[0], c.labels[2]);
        assert_eq!(c.labels[3], c.labels[4]);
        assert_eq!(c.labels[3], c.labels[5]);
        assert_ne!(c.labels[0], c.labels[3]);
        assert!(c.inertia < 0.2);
    }

    #[test]
    fn same_seed_same_labels() {
        let x: Vec<Vec<f64>> = (0..40)
            .map(|i| {
                let f = i as f64;
                vec![(f * 0.37).sin(), (f * 1.3).cos(), (f * 0.11).sin() * 2.0]
            })
            .collect();
        let mut s = settings(6);
        s.repeats = 3;
        let a = kmeans(&x, &s);
        let b = kmeans(&x, &s);
        assert_eq!(a, b);
        assert!(a.labels.iter().all(|l| *l < 6));
    }

    #[test]
    fn as_many_clusters_as_points() {
        let x = two_groups();
        let c = kmeans(&x, &settings(6));
        let mut labels = c.labels.clone();
        labels.sort();
        labels.dedup();
        assert_eq!(labels.len(), 6);
        assert!(c.inertia < 1e-12);
    }

    #[test]
    fn identical_points() {
        let x = vec![vec![0.0, 0.0]; 5];
        let c = kmeans(&x, &settings(3));
        assert_eq!(c.labels.len(), 5);
        assert!(c.labels.iter().all(|l| *l < 3));
        assert_eq!(c.inertia, 0.0);
    }
}
