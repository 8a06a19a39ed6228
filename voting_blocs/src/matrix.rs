use std::collections::HashSet;

use crate::config::*;

/// A dense matrix of votes: one row per (year, resolution), one column per voter.
///
/// Cells that were never filled by a ballot hold `VoteValue::Neutral`.
/// Rows are sorted by key and columns by voter code.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct VotingMatrix {
    rows: Vec<RowKey>,
    voters: Vec<String>,
    // Row-major
    cells: Vec<VoteValue>,
}

impl VotingMatrix {
    /// Assembles a matrix from its parts.
    ///
    /// The row keys and the voters must be unique, and `cells` must be in row-major order.
    /// Rows and columns are re-sorted if needed.
    pub fn from_parts(
        rows: Vec<RowKey>,
        voters: Vec<String>,
        cells: Vec<VoteValue>,
    ) -> Result<VotingMatrix, AnalysisErrors> {
        let expected = rows.len() * voters.len();
        if cells.len() != expected {
            return Err(AnalysisErrors::ShapeMismatch {
                expected,
                found: cells.len(),
            });
        }
        let mut seen_rows: HashSet<&RowKey> = HashSet::new();
        for r in rows.iter() {
            if !seen_rows.insert(r) {
                return Err(AnalysisErrors::DuplicateKey(format!(
                    "{}/{}",
                    r.year, r.resolution_id
                )));
            }
        }
        let mut seen_voters: HashSet<&String> = HashSet::new();
        for v in voters.iter() {
            if !seen_voters.insert(v) {
                return Err(AnalysisErrors::DuplicateKey(v.clone()));
            }
        }

        let mut row_order: Vec<usize> = (0..rows.len()).collect();
        row_order.sort_by(|a, b| rows[*a].cmp(&rows[*b]));
        let mut col_order: Vec<usize> = (0..voters.len()).collect();
        col_order.sort_by(|a, b| voters[*a].cmp(&voters[*b]));

        let ncols = voters.len();
        let mut sorted_cells: Vec<VoteValue> = Vec::with_capacity(expected);
        for r in row_order.iter() {
            for c in col_order.iter() {
                sorted_cells.push(cells[r * ncols + c]);
            }
        }
        Ok(VotingMatrix {
            rows: row_order.iter().map(|i| rows[*i].clone()).collect(),
            voters: col_order.iter().map(|i| voters[*i].clone()).collect(),
            cells: sorted_cells,
        })
    }

    pub fn rows(&self) -> &[RowKey] {
        &self.rows
    }

    pub fn voters(&self) -> &[String] {
        &self.voters
    }

    pub fn num_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn num_voters(&self) -> usize {
        self.voters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() || self.voters.is_empty()
    }

    pub fn get(&self, row: usize, voter: usize) -> VoteValue {
        self.cells[row * self.voters.len() + voter]
    }

    pub fn row_values(&self, row: usize) -> &[VoteValue] {
        let n = self.voters.len();
        &self.cells[row * n..(row + 1) * n]
    }

    /// The smallest and the largest year, if the matrix has rows.
    pub fn year_span(&self) -> Option<(i32, i32)> {
        // Rows are sorted by year first.
        match (self.rows.first(), self.rows.last()) {
            (Some(a), Some(b)) => Some((a.year, b.year)),
            _ => None,
        }
    }

    /// Indices of the rows whose year is in `[start, end)`.
    pub fn rows_in_years(&self, start: i32, end: i32) -> Vec<usize> {
        self.rows
            .iter()
            .enumerate()
            .filter(|(_, k)| k.year >= start && k.year < end)
            .map(|(i, _)| i)
            .collect()
    }

    /// The voter-major feature vectors for a subset of rows.
    ///
    /// Entry `[v][j]` is the vote of voter `v` on the `j`-th selected row.
    pub fn voter_features(&self, row_indices: &[usize]) -> Vec<Vec<f64>> {
        (0..self.voters.len())
            .map(|v| {
                row_indices
                    .iter()
                    .map(|r| self.get(*r, v).as_f64())
                    .collect()
            })
            .collect()
    }
}
