use crate::config::*;
use crate::matrix::VotingMatrix;

/// Checks the window layout of the rules.
pub(crate) fn check_window_rules(rules: &AnalysisRules) -> Result<(), AnalysisErrors> {
    if rules.window_width == 0 {
        return Err(AnalysisErrors::InvalidRules(
            "the window width must be positive".to_string(),
        ));
    }
    if let WindowRange::Fixed { first, last } = rules.window_range {
        let w = rules.window_width as i32;
        if first > last {
            return Err(AnalysisErrors::InvalidRules(format!(
                "first window {} is after last window {}",
                first, last
            )));
        }
        if first.rem_euclid(w) != 0 || last.rem_euclid(w) != 0 {
            return Err(AnalysisErrors::InvalidRules(format!(
                "window starts {} and {} must be multiples of {}",
                first, last, w
            )));
        }
    }
    Ok(())
}

/// The first year of the window that contains `year`.
pub fn window_start(year: i32, width: u32) -> i32 {
    let w = width as i32;
    year.div_euclid(w) * w
}

/// All the candidate window starts, in increasing order.
///
/// The windows are contiguous and do not overlap. Whether they hold any row is
/// not checked here.
pub fn window_starts(matrix: &VotingMatrix, rules: &AnalysisRules) -> Vec<i32> {
    let w = rules.window_width as i32;
    let (first, last) = match rules.window_range {
        WindowRange::Fixed { first, last } => (first, last),
        WindowRange::FromData => match matrix.year_span() {
            Some((lo, hi)) => (
                window_start(lo, rules.window_width),
                window_start(hi, rules.window_width),
            ),
            None => return vec![],
        },
    };
    let mut res = Vec::new();
    let mut s = first;
    while s <= last {
        res.push(s);
        s += w;
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(years: &[i32]) -> VotingMatrix {
        let rows: Vec<RowKey> = years
            .iter()
            .enumerate()
            .map(|(i, y)| RowKey {
                year: *y,
                resolution_id: format!("R{}", i),
            })
            .collect();
        let cells = vec![VoteValue::Yes; rows.len()];
        VotingMatrix::from_parts(rows, vec!["USA".to_string()], cells).unwrap()
    }

    #[test]
    fn default_range_is_1940_to_2020() {
        let m = matrix(&[1985]);
        let starts = window_starts(&m, &AnalysisRules::DEFAULT_RULES);
        assert_eq!(starts.first(), Some(&1940));
        assert_eq!(starts.last(), Some(&2020));
        assert_eq!(starts.len(), 9);
    }

    #[test]
    fn range_from_data() {
        let m = matrix(&[1946, 1983, 2001]);
        let rules = AnalysisRules {
            window_range: WindowRange::FromData,
            ..AnalysisRules::DEFAULT_RULES
        };
        assert_eq!(
            window_starts(&m, &rules),
            vec![1940, 1950, 1960, 1970, 1980, 1990, 2000]
        );
    }

    #[test]
    fn each_year_in_exactly_one_window() {
        let m = matrix(&[1940, 1949, 1950, 2029]);
        let starts = window_starts(&m, &AnalysisRules::DEFAULT_RULES);
        for year in 1940..2030 {
            let hits = starts
                .iter()
                .filter(|s| year >= **s && year < **s + 10)
                .count();
            assert_eq!(hits, 1, "year {}", year);
            assert_eq!(window_start(year, 10), year - year % 10);
        }
        assert_eq!(window_start(-5, 10), -10);
    }

    #[test]
    fn misaligned_rules_are_rejected() {
        let rules = AnalysisRules {
            window_range: WindowRange::Fixed {
                first: 1945,
                last: 2020,
            },
            ..AnalysisRules::DEFAULT_RULES
        };
        assert!(check_window_rules(&rules).is_err());
        let rules = AnalysisRules {
            window_width: 0,
            ..AnalysisRules::DEFAULT_RULES
        };
        assert!(check_window_rules(&rules).is_err());
        assert!(check_window_rules(&AnalysisRules::DEFAULT_RULES).is_ok());
    }
}
