use log::debug;
use std::collections::{BTreeMap, BTreeSet};

pub use crate::config::*;
use crate::matrix::VotingMatrix;

/// A builder for assembling the voting matrix from canonical ballots.
///
/// ```
/// use voting_blocs::builder::MatrixBuilder;
/// use voting_blocs::{CanonicalBallot, DuplicateBallotMode, VoteValue};
/// # use voting_blocs::AnalysisErrors;
///
/// let mut builder = MatrixBuilder::new(DuplicateBallotMode::LastWins);
/// builder.add_ballot(&CanonicalBallot {
///     year: 1985,
///     resolution_id: "R1".to_string(),
///     voter: "USA".to_string(),
///     vote: VoteValue::Yes,
/// })?;
/// let matrix = builder.build()?;
/// assert_eq!(matrix.num_rows(), 1);
///
/// # Ok::<(), AnalysisErrors>(())
/// ```
pub struct MatrixBuilder {
    pub(crate) _mode: DuplicateBallotMode,
    pub(crate) _cells: BTreeMap<(RowKey, String), VoteValue>,
    pub(crate) _voters: BTreeSet<String>,
    pub(crate) _overwritten: usize,
}

impl MatrixBuilder {
    pub fn new(mode: DuplicateBallotMode) -> MatrixBuilder {
        MatrixBuilder {
            _mode: mode,
            _cells: BTreeMap::new(),
            _voters: BTreeSet::new(),
            _overwritten: 0,
        }
    }

    /// Adds a ballot to the builder.
    ///
    /// If a ballot was already recorded for the same cell, the duplicate mode decides
    /// whether it is replaced or whether the batch is rejected.
    pub fn add_ballot(&mut self, ballot: &CanonicalBallot) -> Result<(), AnalysisErrors> {
        let key = (
            RowKey {
                year: ballot.year,
                resolution_id: ballot.resolution_id.clone(),
            },
            ballot.voter.clone(),
        );
        if self._cells.contains_key(&key) {
            match self._mode {
                DuplicateBallotMode::Reject => {
                    return Err(AnalysisErrors::DuplicateBallot {
                        year: ballot.year,
                        resolution_id: ballot.resolution_id.clone(),
                        voter: ballot.voter.clone(),
                    });
                }
                DuplicateBallotMode::LastWins => {
                    debug!("add_ballot: replacing the earlier ballot for {:?}", key);
                    self._overwritten += 1;
                }
            }
        }
        self._voters.insert(ballot.voter.clone());
        self._cells.insert(key, ballot.vote);
        Ok(())
    }

    /// The number of ballots that replaced an earlier ballot for the same cell.
    pub fn overwritten(&self) -> usize {
        self._overwritten
    }

    /// Builds the matrix. Missing cells are filled with a neutral vote.
    pub fn build(self) -> Result<VotingMatrix, AnalysisErrors> {
        if self._cells.is_empty() {
            return Err(AnalysisErrors::EmptyMatrix);
        }
        let voters: Vec<String> = self._voters.into_iter().collect();
        let voter_idx: BTreeMap<&String, usize> =
            voters.iter().enumerate().map(|(i, v)| (v, i)).collect();
        let rows: Vec<RowKey> = self
            ._cells
            .keys()
            .map(|(r, _)| r.clone())
            .collect::<BTreeSet<RowKey>>()
            .into_iter()
            .collect();

        let mut cells: Vec<VoteValue> = vec![VoteValue::Neutral; rows.len() * voters.len()];
        // The cells are visited in row order, so the row index only moves forward.
        let mut row_idx = 0;
        for ((row, voter), vote) in self._cells.iter() {
            while rows[row_idx] != *row {
                row_idx += 1;
            }
            let col = voter_idx[voter];
            cells[row_idx * voters.len() + col] = *vote;
        }
        VotingMatrix::from_parts(rows, voters, cells)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ballot(year: i32, id: &str, voter: &str, vote: VoteValue) -> CanonicalBallot {
        CanonicalBallot {
            year,
            resolution_id: id.to_string(),
            voter: voter.to_string(),
            vote,
        }
    }

    #[test]
    fn missing_cells_are_neutral() {
        let mut b = MatrixBuilder::new(DuplicateBallotMode::LastWins);
        b.add_ballot(&ballot(1985, "R1", "USA", VoteValue::Yes)).unwrap();
        b.add_ballot(&ballot(1985, "R2", "FRA", VoteValue::No)).unwrap();
        let m = b.build().unwrap();
        assert_eq!(m.voters(), &["FRA".to_string(), "USA".to_string()]);
        assert_eq!(m.num_rows(), 2);
        assert_eq!(m.get(0, 0), VoteValue::Neutral);
        assert_eq!(m.get(0, 1), VoteValue::Yes);
        assert_eq!(m.get(1, 0), VoteValue::No);
        assert_eq!(m.get(1, 1), VoteValue::Neutral);
    }

    #[test]
    fn last_ballot_wins() {
        let mut b = MatrixBuilder::new(DuplicateBallotMode::LastWins);
        b.add_ballot(&ballot(1985, "R1", "USA", VoteValue::Yes)).unwrap();
        b.add_ballot(&ballot(1985, "R1", "USA", VoteValue::No)).unwrap();
        assert_eq!(b.overwritten(), 1);
        let m = b.build().unwrap();
        assert_eq!(m.get(0, 0), VoteValue::No);
    }

    #[test]
    fn duplicates_can_be_rejected() {
        let mut b = MatrixBuilder::new(DuplicateBallotMode::Reject);
        b.add_ballot(&ballot(1985, "R1", "USA", VoteValue::Yes)).unwrap();
        let res = b.add_ballot(&ballot(1985, "R1", "USA", VoteValue::Yes));
        assert_eq!(
            res,
            Err(AnalysisErrors::DuplicateBallot {
                year: 1985,
                resolution_id: "R1".to_string(),
                voter: "USA".to_string()
            })
        );
    }

    #[test]
    fn same_resolution_in_two_years_is_two_rows() {
        let mut b = MatrixBuilder::new(DuplicateBallotMode::Reject);
        b.add_ballot(&ballot(1985, "R1", "USA", VoteValue::Yes)).unwrap();
        b.add_ballot(&ballot(1986, "R1", "USA", VoteValue::No)).unwrap();
        let m = b.build().unwrap();
        assert_eq!(m.num_rows(), 2);
    }

    #[test]
    fn empty_builder_fails() {
        let b = MatrixBuilder::new(DuplicateBallotMode::LastWins);
        assert_eq!(b.build(), Err(AnalysisErrors::EmptyMatrix));
    }
}
