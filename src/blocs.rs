use log::{debug, info, warn};

use snafu::{prelude::*, Snafu};
use voting_blocs::builder::MatrixBuilder;
use voting_blocs::*;

use std::fs;
use std::path::Path;

use text_diff::print_diff;

pub mod bundle;
pub mod config_reader;
mod io_common;
mod io_csv;
mod io_excel;
pub mod normalizer;
pub mod territories;

use crate::blocs::bundle::*;
use crate::blocs::config_reader::*;
use crate::blocs::io_common::*;
use crate::blocs::normalizer::*;
use crate::blocs::territories::{VoterResolver, OVERRIDE_TABLE_VERSION};

#[derive(Debug, Snafu)]
pub enum BlocError {
    #[snafu(display("Input file {path} not found"))]
    MissingInput { path: String },
    #[snafu(display("Error reading file {path}"))]
    OpeningFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error writing file {path}"))]
    WritingFile {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Error opening CSV file {path}"))]
    CsvOpen { source: csv::Error, path: String },
    #[snafu(display("Error parsing CSV line {lineno}"))]
    CsvLineParse { source: csv::Error, lineno: usize },
    #[snafu(display("Error writing CSV data for {path}"))]
    CsvWrite { source: csv::Error, path: String },
    #[snafu(display("Column {name} not found in {path}"))]
    MissingColumn { name: String, path: String },
    #[snafu(display("Error opening Excel file {path}"))]
    OpeningExcel {
        source: calamine::XlsxError,
        path: String,
    },
    #[snafu(display("Excel file {path} has no rows"))]
    EmptyExcel { path: String },
    #[snafu(display("Worksheet {name} not found in {path}"))]
    MissingWorksheet { name: String, path: String },
    #[snafu(display("Error parsing JSON file {path}"))]
    ParsingJson {
        source: serde_json::Error,
        path: String,
    },
    #[snafu(display("Error serializing the results"))]
    SerializingJson { source: serde_json::Error },
    #[snafu(display("Malformed voting matrix {path}, line {lineno}: {message}"))]
    MatrixFormat {
        path: String,
        lineno: usize,
        message: String,
    },
    #[snafu(display(
        "All {loaded} records were removed after the {stage} step. Check the input data."
    ))]
    NoSurvivors { stage: String, loaded: usize },
    #[snafu(display("Analysis failed: {source}"))]
    Analysis { source: AnalysisErrors },
    #[snafu(display(
        "The results bundle {path} could not be read. Run the analyze stage first."
    ))]
    BundleUnavailable {
        source: std::io::Error,
        path: String,
    },
    #[snafu(display("Difference detected between the computed bundle and the reference {path}"))]
    ReferenceMismatch { path: String },

    #[snafu(whatever, display("{message}"))]
    Whatever {
        message: String,
        #[snafu(source(from(Box<dyn std::error::Error>, Some)))]
        source: Option<Box<dyn std::error::Error>>,
    },
}

pub type BlocResult<T> = Result<T, BlocError>;

/// Reads the raw ballots, normalizes them and writes the voting matrix.
pub fn run_normalize(settings: &RunSettings) -> BlocResult<VotingMatrix> {
    let source = match &settings.input {
        Some(s) => s,
        None => whatever!("No input file given: use --input or inputSettings.filePath"),
    };
    ensure!(
        Path::new(&source.path).exists(),
        MissingInputSnafu {
            path: source.path.clone()
        }
    );
    info!("Attempting to read ballot file {:?}", source.path);
    let raw = match source.provider {
        InputProvider::Csv => io_csv::read_raw_ballots(&source.path, &source.columns)?,
        InputProvider::Xlsx => io_excel::read_raw_ballots(
            &source.path,
            source.excel_worksheet_name.as_deref(),
            &source.columns,
        )?,
    };

    let resolver = VoterResolver::new(&settings.name_overrides);
    debug!(
        "run_normalize: override table version {}, {} extra entries",
        OVERRIDE_TABLE_VERSION,
        settings.name_overrides.len()
    );
    let (ballots, report) = canonicalize_all(&raw, &resolver)?;

    let mut builder = MatrixBuilder::new(settings.duplicate_mode);
    for b in ballots.iter() {
        builder.add_ballot(b).context(AnalysisSnafu {})?;
    }
    if builder.overwritten() > 0 {
        warn!(
            "{} ballots replaced an earlier ballot of the same voter on the same resolution",
            builder.overwritten()
        );
    }
    let matrix = builder.build().context(AnalysisSnafu {})?;
    info!("{}", report);
    info!(
        "Voting matrix: {} resolutions x {} voters",
        matrix.num_rows(),
        matrix.num_voters()
    );

    io_csv::write_matrix(&settings.matrix_path, &matrix)?;
    info!("Successfully wrote the voting matrix to {:?}", settings.matrix_path);
    Ok(matrix)
}

/// Reads the voting matrix, runs the analysis for each window and writes the bundle.
pub fn run_analysis(settings: &RunSettings) -> BlocResult<Bundle> {
    let path = settings.matrix_path.clone();
    ensure!(
        Path::new(&path).exists(),
        MissingInputSnafu { path: path.clone() }
    );
    let contents = fs::read_to_string(&path).context(OpeningFileSnafu { path: path.clone() })?;
    let digest = sha256::digest(contents.as_str());
    debug!("run_analysis: matrix digest {}", digest);
    let matrix = io_csv::parse_matrix(&contents, &path)?;
    info!(
        "Loaded the voting matrix: {} resolutions x {} voters",
        matrix.num_rows(),
        matrix.num_voters()
    );

    let analysis = run_bloc_analysis(&matrix, &settings.rules).context(AnalysisSnafu {})?;
    let bundle = Bundle::from_analysis(&analysis, &settings.rules, digest);

    let pretty_js = serde_json::to_string_pretty(&bundle).context(SerializingJsonSnafu {})?;
    match settings.bundle_path.as_str() {
        "stdout" => println!("{}", pretty_js),
        p => {
            write_atomically(p, pretty_js.as_bytes())?;
            info!(
                "Successfully saved the results of {} windows to {:?}",
                bundle.windows.len(),
                p
            );
        }
    }

    // The reference bundle, if provided for comparison
    if let Some(reference_p) = &settings.reference {
        let reference = read_bundle(reference_p)?;
        let pretty_js_ref =
            serde_json::to_string_pretty(&reference).context(SerializingJsonSnafu {})?;
        if pretty_js_ref != pretty_js {
            warn!("Found differences with the reference bundle");
            print_diff(pretty_js_ref.as_str(), pretty_js.as_str(), "\n");
            return ReferenceMismatchSnafu {
                path: reference_p.clone(),
            }
            .fail();
        }
        info!("The bundle matches the reference {:?}", reference_p);
    }
    Ok(bundle)
}

/// Prints a summary of an existing bundle.
pub fn run_inspect(settings: &RunSettings) -> BlocResult<()> {
    let bundle = read_bundle(&settings.bundle_path)?;
    for line in bundle.summary_lines() {
        println!("{}", line);
    }
    Ok(())
}

pub fn run(settings: &RunSettings) -> BlocResult<()> {
    info!("Running stage {:?}", settings.stage);
    match settings.stage {
        Stage::Normalize => run_normalize(settings).map(|_| ()),
        Stage::Analyze => run_analysis(settings).map(|_| ()),
        Stage::All => {
            run_normalize(settings)?;
            run_analysis(settings).map(|_| ())
        }
        Stage::Inspect => run_inspect(settings),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str = "member_state,resolution_id,meeting_date,original_vote\n";

    // Two camps over two decades, plus records that must be dropped.
    fn sample_csv() -> String {
        let west = ["United States", "United Kingdom", "France", "Canada"];
        let east = ["Russian Federation", "China", "Cuba", "Viet Nam"];
        let mut s = HEADER.to_string();
        for (year, n) in [(1985, 5), (1993, 4)] {
            for r in 0..n {
                let date = format!("{}-0{}-15", year, r + 1);
                let id = format!("R{}/{}", year, r);
                for (i, v) in west.iter().enumerate() {
                    let vote = if (i + r) % 4 == 0 { "A" } else { "Y" };
                    s.push_str(&format!("\"{}\",{},{},{}\n", v, id, date, vote));
                }
                for (i, v) in east.iter().enumerate() {
                    let vote = if (i + r) % 4 == 1 { "2.0" } else { "3" };
                    s.push_str(&format!("\"{}\",{},{},{}\n", v, id, date, vote));
                }
            }
        }
        s.push_str("Atlantis,R1985/0,1985-01-15,Y\n");
        s.push_str("France,R1985/0,not a date,Y\n");
        s.push_str("France,R1985/0,1985-01-15,maybe\n");
        s
    }

    fn settings_in(dir: &Path, csv: &str) -> RunSettings {
        let input = dir.join("votes.csv");
        let mut f = fs::File::create(&input).unwrap();
        f.write_all(csv.as_bytes()).unwrap();
        let mut s = RunSettings::new(Stage::All);
        s.input = Some(InputSource::csv(input.display().to_string()));
        s.matrix_path = dir.join("matrix.csv").display().to_string();
        s.bundle_path = dir.join("bundle.json").display().to_string();
        s
    }

    #[test]
    fn full_pipeline() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path(), &sample_csv());
        let matrix = run_normalize(&settings).unwrap();
        assert_eq!(matrix.num_voters(), 8);
        assert_eq!(matrix.num_rows(), 9);
        assert!(!matrix.voters().contains(&"ATL".to_string()));

        let bundle = run_analysis(&settings).unwrap();
        let keys: Vec<i32> = bundle.windows.keys().cloned().collect();
        assert_eq!(keys, vec![1980, 1990]);
        assert!(!bundle.windows.contains_key(&1940));
        for rows in bundle.windows.values() {
            assert_eq!(rows.len(), 8);
            assert!(rows.iter().all(|r| r.bloc < 6));
        }

        let reloaded = read_bundle(&settings.bundle_path).unwrap();
        assert_eq!(reloaded, bundle);
    }

    #[test]
    fn rerun_matches_reference() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(dir.path(), &sample_csv());
        run(&settings).unwrap();
        let reference = dir.path().join("reference.json");
        fs::copy(&settings.bundle_path, &reference).unwrap();
        settings.reference = Some(reference.display().to_string());
        settings.stage = Stage::Analyze;
        run(&settings).unwrap();

        // A different seed may move the blocs, but a different bloc count always changes
        // the settings section.
        settings.rules.num_blocs = 2;
        assert!(matches!(
            run(&settings),
            Err(BlocError::ReferenceMismatch { .. })
        ));
    }

    #[test]
    fn missing_input_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(dir.path(), &sample_csv());
        settings.input = Some(InputSource::csv(
            dir.path().join("nope.csv").display().to_string(),
        ));
        assert!(matches!(
            run_normalize(&settings),
            Err(BlocError::MissingInput { .. })
        ));
        settings.stage = Stage::Analyze;
        assert!(matches!(run(&settings), Err(BlocError::MissingInput { .. })));
    }

    #[test]
    fn unmapped_votes_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let csv = format!("{}France,R1,1985-01-01,maybe\nChina,R1,1985-01-01,\n", HEADER);
        let settings = settings_in(dir.path(), &csv);
        match run_normalize(&settings) {
            Err(BlocError::NoSurvivors { stage, loaded }) => {
                assert_eq!(stage, "vote mapping");
                assert_eq!(loaded, 2);
            }
            x => panic!("unexpected result {:?}", x.map(|m| m.num_rows())),
        }
        assert!(!Path::new(&settings.matrix_path).exists());
    }

    #[test]
    fn unknown_voters_are_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let csv = format!("{}Atlantis,R1,1985-01-01,Y\n", HEADER);
        let settings = settings_in(dir.path(), &csv);
        assert!(matches!(
            run_normalize(&settings),
            Err(BlocError::NoSurvivors { .. })
        ));
    }

    #[test]
    fn rejected_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let csv = format!(
            "{}France,R1,1985-01-01,Y\nFrance,R1,1985-06-01,N\n",
            HEADER
        );
        let mut settings = settings_in(dir.path(), &csv);
        let m = run_normalize(&settings).unwrap();
        assert_eq!(m.get(0, 0), VoteValue::No);

        settings.duplicate_mode = DuplicateBallotMode::Reject;
        assert!(matches!(
            run_normalize(&settings),
            Err(BlocError::Analysis {
                source: AnalysisErrors::DuplicateBallot { .. }
            })
        ));
    }

    #[test]
    fn blank_resolution_ids_never_reach_the_matrix() {
        let dir = tempfile::tempdir().unwrap();
        let csv = format!(
            "{}France,R1,1985-01-01,Y\nFrance,,1985-02-01,N\nFrance,,1985-03-01,Y\nChina,,1985-02-01,Y\n",
            HEADER
        );
        let mut settings = settings_in(dir.path(), &csv);
        settings.duplicate_mode = DuplicateBallotMode::Reject;
        let m = run_normalize(&settings).unwrap();
        assert_eq!(m.num_rows(), 1);
        assert_eq!(m.num_voters(), 1);
        assert_eq!(m.rows()[0].resolution_id, "R1");
        let written = fs::read_to_string(&settings.matrix_path).unwrap();
        assert_eq!(written, "year,resolution_id,FRA\n1985,R1,1\n");
    }

    #[test]
    fn inspect_without_bundle() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(dir.path(), &sample_csv());
        settings.stage = Stage::Inspect;
        let err = run(&settings).unwrap_err();
        assert!(matches!(err, BlocError::BundleUnavailable { .. }));
        assert!(err.to_string().contains("could not be read"));
    }
}
