// Turns raw ballot records into canonical ballots.

use crate::blocs::territories::VoterResolver;
use crate::blocs::*;

use chrono::{DateTime, Datelike, Days, NaiveDate, NaiveDateTime};
use std::fmt::Display;

/// The meeting date, as found in the input.
#[derive(PartialEq, Debug, Clone)]
pub enum RawDate {
    Text(String),
    /// Days since 1899-12-30, as stored by spreadsheets.
    ExcelSerial(f64),
    Missing,
}

/// A ballot, as parsed by the readers.
/// This is before mapping the vote, the date and the voter.
#[derive(PartialEq, Debug, Clone)]
pub struct RawBallot {
    pub voter_name: String,
    pub resolution_id: String,
    pub meeting_date: RawDate,
    /// The vote, coerced to a string. `None` if the cell was empty.
    pub raw_vote: Option<String>,
}

/// How many records survived each filtering step.
#[derive(Eq, PartialEq, Debug, Clone, Default)]
pub struct NormalizationReport {
    pub loaded: usize,
    pub after_ids: usize,
    pub after_votes: usize,
    pub after_dates: usize,
    pub after_voters: usize,
}

impl Display for NormalizationReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Records loaded: {}, with a resolution id: {}, after cleaning votes: {}, after parsing dates: {}, after mapping voters: {}",
            self.loaded, self.after_ids, self.after_votes, self.after_dates, self.after_voters
        )
    }
}

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d-%b-%Y", "%B %d, %Y"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

// A bare 4-digit year.
fn year_only(s: &str) -> Option<i32> {
    if s.len() == 4 && s.chars().all(|c| c.is_ascii_digit()) {
        s.parse::<i32>().ok()
    } else {
        None
    }
}

/// The year of a meeting date, if the date can be understood.
pub fn parse_year(date: &RawDate) -> Option<i32> {
    match date {
        RawDate::Text(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            DATE_FORMATS
                .iter()
                .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
                .or_else(|| {
                    DATETIME_FORMATS
                        .iter()
                        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
                        .map(|dt| dt.date())
                })
                .or_else(|| {
                    DateTime::parse_from_rfc3339(s)
                        .ok()
                        .map(|dt| dt.naive_local().date())
                })
                .or_else(|| NaiveDate::parse_from_str(&format!("{}-01", s), "%Y-%m-%d").ok())
                .map(|d| d.year())
                .or_else(|| year_only(s))
        }
        RawDate::ExcelSerial(x) if x.is_finite() && *x >= 1.0 => NaiveDate::from_ymd_opt(1899, 12, 30)
            .and_then(|epoch| epoch.checked_add_days(Days::new(x.floor() as u64)))
            .map(|d| d.year()),
        _ => None,
    }
}

/// Maps the votes, the dates and the voters of all the records.
///
/// Records that cannot be mapped are dropped. If no record survives one of the steps,
/// the whole batch fails.
pub fn canonicalize_all(
    raw: &[RawBallot],
    resolver: &VoterResolver,
) -> BlocResult<(Vec<CanonicalBallot>, NormalizationReport)> {
    let mut report = NormalizationReport {
        loaded: raw.len(),
        ..Default::default()
    };
    info!("Initial records loaded: {}", report.loaded);

    // A record without a resolution id has no row in the matrix.
    let with_ids: Vec<&RawBallot> = raw
        .iter()
        .filter(|rb| !rb.resolution_id.trim().is_empty())
        .collect();
    report.after_ids = with_ids.len();
    info!("Records remaining after checking resolution ids: {}", report.after_ids);
    ensure!(
        report.after_ids > 0,
        NoSurvivorsSnafu {
            stage: "resolution id check",
            loaded: report.loaded
        }
    );

    let with_votes: Vec<(&RawBallot, VoteValue)> = with_ids
        .into_iter()
        .filter_map(|rb| {
            rb.raw_vote
                .as_deref()
                .and_then(VoteValue::from_token)
                .map(|v| (rb, v))
        })
        .collect();
    report.after_votes = with_votes.len();
    info!("Records remaining after cleaning votes: {}", report.after_votes);
    ensure!(
        report.after_votes > 0,
        NoSurvivorsSnafu {
            stage: "vote mapping",
            loaded: report.loaded
        }
    );

    let with_years: Vec<(&RawBallot, VoteValue, i32)> = with_votes
        .into_iter()
        .filter_map(|(rb, v)| parse_year(&rb.meeting_date).map(|y| (rb, v, y)))
        .collect();
    report.after_dates = with_years.len();
    info!("Records remaining after parsing dates: {}", report.after_dates);
    ensure!(
        report.after_dates > 0,
        NoSurvivorsSnafu {
            stage: "date parsing",
            loaded: report.loaded
        }
    );

    let ballots: Vec<CanonicalBallot> = with_years
        .into_iter()
        .filter_map(|(rb, vote, year)| match resolver.resolve(&rb.voter_name) {
            Some(voter) => Some(CanonicalBallot {
                year,
                resolution_id: rb.resolution_id.clone(),
                voter,
                vote,
            }),
            None => {
                debug!("canonicalize_all: unknown voter {:?}", rb.voter_name);
                None
            }
        })
        .collect();
    report.after_voters = ballots.len();
    info!("Records remaining after mapping voters: {}", report.after_voters);
    ensure!(
        report.after_voters > 0,
        NoSurvivorsSnafu {
            stage: "voter mapping",
            loaded: report.loaded
        }
    );

    Ok((ballots, report))
}
