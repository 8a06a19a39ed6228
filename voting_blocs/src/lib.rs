mod config;
pub mod builder;
pub mod kmeans;
mod matrix;
pub mod projection;
pub mod standardize;
mod windows;

use log::{debug, info, warn};

pub use crate::config::*;
pub use crate::matrix::VotingMatrix;
pub use crate::windows::{window_start, window_starts};

use crate::kmeans::{kmeans, KMeansSettings};
use crate::projection::project_2d;
use crate::standardize::{mean_variance, standardize};

/// Finds the voting blocs of each time window of the matrix.
///
/// Arguments:
/// * `matrix` the votes, one row per resolution and one column per voter
/// * `rules` the parameters of the analysis
///
/// Windows without any row are not part of the result. Each window is analyzed on
/// its own: the scaling, the bloc labels and the coordinates of one window have no
/// relationship with those of another window.
pub fn run_bloc_analysis(
    matrix: &VotingMatrix,
    rules: &AnalysisRules,
) -> Result<BlocAnalysis, AnalysisErrors> {
    if rules.num_blocs == 0 {
        return Err(AnalysisErrors::InvalidRules(
            "the number of blocs must be positive".to_string(),
        ));
    }
    windows::check_window_rules(rules)?;
    if matrix.is_empty() {
        return Err(AnalysisErrors::EmptyMatrix);
    }
    info!(
        "run_bloc_analysis: {} resolutions, {} voters, rules: {:?}",
        matrix.num_rows(),
        matrix.num_voters(),
        rules
    );

    let mut results: Vec<WindowResult> = Vec::new();
    let mut skipped: Vec<(i32, SkipReason)> = Vec::new();
    let mut covered = 0;
    for start in window_starts(matrix, rules) {
        let end = start + rules.window_width as i32;
        let row_indices = matrix.rows_in_years(start, end);
        if row_indices.is_empty() {
            info!("No data found for the window starting in {}. Skipping.", start);
            continue;
        }
        covered += row_indices.len();
        match analyze_window(matrix, &row_indices, start, rules) {
            Ok(w) => {
                info!(
                    "Found {} voting blocs for the window starting in {} ({} resolutions)",
                    w.num_blocs, start, w.num_resolutions
                );
                results.push(w);
            }
            Err(reason) => {
                warn!("Skipping the window starting in {}: {}", start, reason);
                skipped.push((start, reason));
            }
        }
    }

    let rows_outside_windows = matrix.num_rows() - covered;
    if rows_outside_windows > 0 {
        warn!(
            "{} resolutions fall outside of the analyzed windows",
            rows_outside_windows
        );
    }
    if results.is_empty() {
        return Err(AnalysisErrors::NoWindows);
    }
    Ok(BlocAnalysis {
        windows: results,
        skipped,
        rows_outside_windows,
    })
}

fn analyze_window(
    matrix: &VotingMatrix,
    row_indices: &[usize],
    start: i32,
    rules: &AnalysisRules,
) -> Result<WindowResult, SkipReason> {
    let voters = matrix.voters();
    let num_voters = voters.len();
    let k = if num_voters < rules.num_blocs as usize {
        match rules.degenerate_window_mode {
            DegenerateWindowMode::Skip => {
                return Err(SkipReason::TooFewVoters {
                    voters: num_voters,
                    requested: rules.num_blocs,
                });
            }
            DegenerateWindowMode::ReduceBlocs => {
                warn!(
                    "Window starting in {}: only {} voters, reducing the number of blocs from {}",
                    start, num_voters, rules.num_blocs
                );
                num_voters
            }
        }
    } else {
        rules.num_blocs as usize
    };

    let features = standardize(&matrix.voter_features(row_indices));
    let settings = KMeansSettings {
        k,
        seed: rules.random_seed,
        repeats: match rules.init_repeats {
            InitRepeats::Auto => 1,
            InitRepeats::Fixed(n) => n,
        },
        max_iterations: rules.max_iterations,
        tolerance: rules.tolerance * mean_variance(&features),
    };
    let clustering = kmeans(&features, &settings);
    debug!(
        "analyze_window: {}: inertia {} after {} iterations",
        start, clustering.inertia, clustering.iterations
    );
    let projection = project_2d(&features);
    debug!(
        "analyze_window: {}: explained variance {:?}",
        start, projection.explained_variance_ratio
    );

    let rows = voters
        .iter()
        .zip(clustering.labels.iter())
        .zip(projection.coords.iter())
        .map(|((voter, bloc), (x, y))| WindowRow {
            voter: voter.clone(),
            bloc: *bloc,
            x: *x,
            y: *y,
        })
        .collect();
    Ok(WindowResult {
        start,
        num_resolutions: row_indices.len(),
        num_blocs: k as u32,
        rows,
    })
}
