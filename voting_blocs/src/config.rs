// ********* Input data structures ***********

use std::error::Error;
use std::fmt::Display;

/// The canonical value of a single ballot.
///
/// Absence of a ballot and an explicit abstention carry the same signal.
#[derive(Eq, PartialEq, Debug, Clone, Copy, Hash, Ord, PartialOrd)]
pub enum VoteValue {
    Yes,
    No,
    Neutral,
}

impl VoteValue {
    /// Maps a raw vote token to its canonical value.
    ///
    /// The token is expected to be already string-coerced. The lookup is case-insensitive
    /// and ignores surrounding whitespace. Returns `None` for any unrecognized token.
    ///
    /// ```
    /// use voting_blocs::VoteValue;
    ///
    /// assert_eq!(VoteValue::from_token("Y"), Some(VoteValue::Yes));
    /// assert_eq!(VoteValue::from_token("3.0"), Some(VoteValue::No));
    /// assert_eq!(VoteValue::from_token("8"), Some(VoteValue::Neutral));
    /// assert_eq!(VoteValue::from_token("maybe"), None);
    /// ```
    pub fn from_token(token: &str) -> Option<VoteValue> {
        match token.trim().to_lowercase().as_str() {
            "1" | "1.0" | "y" | "yes" | "for" => Some(VoteValue::Yes),
            "3" | "3.0" | "n" | "no" | "against" => Some(VoteValue::No),
            "2" | "2.0" | "a" | "abstain" | "8" | "8.0" | "b" | "absent" => {
                Some(VoteValue::Neutral)
            }
            _ => None,
        }
    }

    /// Reads back a value stored in the matrix. Only -1, 0 and 1 are accepted.
    pub fn from_numeric(x: f64) -> Option<VoteValue> {
        if x == 1.0 {
            Some(VoteValue::Yes)
        } else if x == -1.0 {
            Some(VoteValue::No)
        } else if x == 0.0 {
            Some(VoteValue::Neutral)
        } else {
            None
        }
    }

    pub fn as_i8(self) -> i8 {
        match self {
            VoteValue::Yes => 1,
            VoteValue::No => -1,
            VoteValue::Neutral => 0,
        }
    }

    pub fn as_f64(self) -> f64 {
        self.as_i8() as f64
    }
}

/// A normalized ballot: one voter, one resolution, one value.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct CanonicalBallot {
    pub year: i32,
    pub resolution_id: String,
    /// The 3-letter code of the voter.
    pub voter: String,
    pub vote: VoteValue,
}

/// The key of a row of the voting matrix.
#[derive(Eq, PartialEq, Debug, Clone, Hash, Ord, PartialOrd)]
pub struct RowKey {
    pub year: i32,
    pub resolution_id: String,
}

// ******** Output data structures *********

/// The placement of one voter in one window.
#[derive(PartialEq, Debug, Clone)]
pub struct WindowRow {
    pub voter: String,
    pub bloc: u32,
    pub x: f64,
    pub y: f64,
}

#[derive(PartialEq, Debug, Clone)]
pub struct WindowResult {
    /// First year of the window (inclusive).
    pub start: i32,
    /// Number of resolutions that fell in this window.
    pub num_resolutions: usize,
    /// The number of blocs actually used for this window.
    pub num_blocs: u32,
    pub rows: Vec<WindowRow>,
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum SkipReason {
    /// Not enough voters to form the requested number of blocs.
    TooFewVoters { voters: usize, requested: u32 },
}

impl Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::TooFewVoters { voters, requested } => write!(
                f,
                "{} voters is fewer than the {} requested blocs",
                voters, requested
            ),
        }
    }
}

#[derive(PartialEq, Debug, Clone)]
pub struct BlocAnalysis {
    /// Results for the non-empty windows, sorted by start year.
    pub windows: Vec<WindowResult>,
    /// The windows that had data but were not analyzed.
    pub skipped: Vec<(i32, SkipReason)>,
    /// Matrix rows whose year falls outside of all the windows.
    pub rows_outside_windows: usize,
}

/// Errors that prevent the analysis from completing successfully.
#[derive(Eq, PartialEq, Debug, Clone)]
pub enum AnalysisErrors {
    /// The matrix has no rows or no voters.
    EmptyMatrix,
    /// Two ballots for the same cell, while duplicates are rejected.
    DuplicateBallot {
        year: i32,
        resolution_id: String,
        voter: String,
    },
    /// The same row key or voter appears twice when assembling a matrix.
    DuplicateKey(String),
    /// The dimensions of the cells do not match the rows and the voters.
    ShapeMismatch { expected: usize, found: usize },
    /// Some rules cannot be applied.
    InvalidRules(String),
    /// No window produced any result.
    NoWindows,
}

impl Error for AnalysisErrors {}

impl Display for AnalysisErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AnalysisErrors::EmptyMatrix => write!(f, "the voting matrix is empty"),
            AnalysisErrors::DuplicateBallot {
                year,
                resolution_id,
                voter,
            } => write!(
                f,
                "duplicate ballot for voter {} on resolution {} ({})",
                voter, resolution_id, year
            ),
            AnalysisErrors::DuplicateKey(k) => write!(f, "duplicate matrix key {}", k),
            AnalysisErrors::ShapeMismatch { expected, found } => write!(
                f,
                "matrix shape mismatch: expected {} cells, found {}",
                expected, found
            ),
            AnalysisErrors::InvalidRules(msg) => write!(f, "invalid analysis rules: {}", msg),
            AnalysisErrors::NoWindows => write!(f, "no window contained any data"),
        }
    }
}

// ********* Configuration **********

/// What to do when two ballots land on the same matrix cell.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DuplicateBallotMode {
    /// The ballot that comes later in input order replaces the earlier one.
    LastWins,
    /// The whole batch is rejected.
    Reject,
}

/// What to do with a window that has fewer voters than requested blocs.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum DegenerateWindowMode {
    /// Use as many blocs as there are voters.
    ReduceBlocs,
    /// Leave the window out of the results.
    Skip,
}

/// How many times the clustering is restarted from a new seeding.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InitRepeats {
    /// One seeding, which is enough with k-means++.
    Auto,
    Fixed(u32),
}

/// The range of window starts to consider.
#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum WindowRange {
    /// Both bounds are window starts, inclusive.
    Fixed { first: i32, last: i32 },
    /// Derived from the smallest and largest year of the matrix.
    FromData,
}

#[derive(PartialEq, Debug, Clone)]
pub struct AnalysisRules {
    pub num_blocs: u32,
    pub random_seed: u64,
    pub window_width: u32,
    pub window_range: WindowRange,
    pub degenerate_window_mode: DegenerateWindowMode,
    pub init_repeats: InitRepeats,
    pub max_iterations: u32,
    /// Convergence threshold on the centroid shift, relative to the mean feature variance.
    pub tolerance: f64,
}

impl AnalysisRules {
    pub const DEFAULT_RULES: AnalysisRules = AnalysisRules {
        num_blocs: 6,
        random_seed: 42,
        window_width: 10,
        window_range: WindowRange::Fixed {
            first: 1940,
            last: 2020,
        },
        degenerate_window_mode: DegenerateWindowMode::ReduceBlocs,
        init_repeats: InitRepeats::Auto,
        max_iterations: 300,
        tolerance: 1e-4,
    };
}
