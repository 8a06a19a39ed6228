use crate::args::Args;
use crate::blocs::territories::{is_known_code, NameOverride};
use crate::blocs::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub const DEFAULT_MATRIX_PATH: &str = "voting_matrix.csv";
pub const DEFAULT_BUNDLE_PATH: &str = "bloc_analysis.json";
const DEFAULT_FIRST_WINDOW: i32 = 1940;
const DEFAULT_LAST_WINDOW: i32 = 2020;

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct InputSettings {
    #[serde(rename = "filePath")]
    pub file_path: Option<String>,
    pub provider: Option<String>,
    #[serde(rename = "excelWorksheetName")]
    pub excel_worksheet_name: Option<String>,
    #[serde(rename = "voterColumn")]
    pub voter_column: Option<String>,
    #[serde(rename = "resolutionColumn")]
    pub resolution_column: Option<String>,
    #[serde(rename = "dateColumn")]
    pub date_column: Option<String>,
    #[serde(rename = "voteColumn")]
    pub vote_column: Option<String>,
    #[serde(rename = "duplicateBallotPolicy")]
    pub duplicate_ballot_policy: Option<String>,
    #[serde(rename = "extraNameOverrides")]
    pub extra_name_overrides: Option<Vec<NameOverride>>,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct OutputSettings {
    #[serde(rename = "matrixPath")]
    pub matrix_path: Option<String>,
    #[serde(rename = "bundlePath")]
    pub bundle_path: Option<String>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BlocRules {
    #[serde(rename = "numBlocs")]
    pub num_blocs: Option<u32>,
    #[serde(rename = "randomSeed")]
    pub random_seed: Option<String>,
    #[serde(rename = "windowWidth")]
    pub window_width: Option<u32>,
    #[serde(rename = "firstWindowStart")]
    pub first_window_start: Option<i32>,
    #[serde(rename = "lastWindowStart")]
    pub last_window_start: Option<i32>,
    #[serde(rename = "autoWindowRange")]
    pub auto_window_range: Option<bool>,
    #[serde(rename = "degenerateWindowMode")]
    pub degenerate_window_mode: Option<String>,
    #[serde(rename = "initRepeats")]
    pub init_repeats: Option<String>,
    #[serde(rename = "maxIterations")]
    pub max_iterations: Option<u32>,
    pub tolerance: Option<f64>,
}

#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BlocConfig {
    #[serde(rename = "inputSettings")]
    pub input_settings: Option<InputSettings>,
    #[serde(rename = "outputSettings")]
    pub output_settings: Option<OutputSettings>,
    pub rules: Option<BlocRules>,
}

pub fn read_config(path: &str) -> BlocResult<BlocConfig> {
    let contents = fs::read_to_string(path).context(OpeningFileSnafu { path })?;
    serde_json::from_str(contents.as_str()).context(ParsingJsonSnafu { path })
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum Stage {
    Normalize,
    Analyze,
    All,
    Inspect,
}

#[derive(Eq, PartialEq, Debug, Clone, Copy)]
pub enum InputProvider {
    Csv,
    Xlsx,
}

/// The names of the columns of the raw ballot records.
#[derive(Eq, PartialEq, Debug, Clone)]
pub struct ColumnNames {
    pub voter: String,
    pub resolution: String,
    pub date: String,
    pub vote: String,
}

impl Default for ColumnNames {
    fn default() -> Self {
        ColumnNames {
            voter: "member_state".to_string(),
            resolution: "resolution_id".to_string(),
            date: "meeting_date".to_string(),
            vote: "original_vote".to_string(),
        }
    }
}

#[derive(Eq, PartialEq, Debug, Clone)]
pub struct InputSource {
    pub path: String,
    pub provider: InputProvider,
    pub excel_worksheet_name: Option<String>,
    pub columns: ColumnNames,
}

impl InputSource {
    pub fn csv(path: String) -> InputSource {
        InputSource {
            path,
            provider: InputProvider::Csv,
            excel_worksheet_name: None,
            columns: ColumnNames::default(),
        }
    }
}

/// Everything a run needs, after merging the command line and the configuration file.
#[derive(PartialEq, Debug, Clone)]
pub struct RunSettings {
    pub stage: Stage,
    pub input: Option<InputSource>,
    pub matrix_path: String,
    /// A file path or `stdout`.
    pub bundle_path: String,
    pub reference: Option<String>,
    pub duplicate_mode: DuplicateBallotMode,
    pub name_overrides: Vec<NameOverride>,
    pub rules: AnalysisRules,
}

impl RunSettings {
    pub fn new(stage: Stage) -> RunSettings {
        RunSettings {
            stage,
            input: None,
            matrix_path: DEFAULT_MATRIX_PATH.to_string(),
            bundle_path: DEFAULT_BUNDLE_PATH.to_string(),
            reference: None,
            duplicate_mode: DuplicateBallotMode::LastWins,
            name_overrides: vec![],
            rules: AnalysisRules::DEFAULT_RULES,
        }
    }

    /// Merges the configuration file (if any) and the command line.
    ///
    /// Relative paths of the configuration file are relative to the directory of that file.
    pub fn from_args(args: &Args) -> BlocResult<RunSettings> {
        let stage = parse_stage(args.stage.as_deref().unwrap_or("all"))?;
        let mut res = RunSettings::new(stage);

        let (config, root) = match &args.config {
            Some(p) => {
                let config = read_config(p)?;
                let root = Path::new(p).parent().map(|x| x.to_path_buf());
                debug!("from_args: config: {:?}", config);
                (Some(config), root)
            }
            None => (None, None),
        };
        let relative = |s: &String| -> String {
            match &root {
                Some(r) if Path::new(s).is_relative() => {
                    let p: PathBuf = [r.as_path(), Path::new(s)].iter().collect();
                    p.display().to_string()
                }
                _ => s.clone(),
            }
        };

        let input_settings = config.as_ref().and_then(|c| c.input_settings.clone());
        let output_settings = config.as_ref().and_then(|c| c.output_settings.clone());
        let rules = config.as_ref().and_then(|c| c.rules.clone());

        let input_path = match (&args.input, input_settings.as_ref()) {
            (Some(p), _) => Some(p.clone()),
            (None, Some(is)) => is.file_path.as_ref().map(relative),
            (None, None) => None,
        };
        if let Some(path) = input_path {
            let provider = args
                .input_type
                .clone()
                .or_else(|| input_settings.as_ref().and_then(|is| is.provider.clone()));
            let mut columns = ColumnNames::default();
            let mut worksheet = None;
            if let Some(is) = input_settings.as_ref() {
                columns = ColumnNames {
                    voter: is.voter_column.clone().unwrap_or(columns.voter),
                    resolution: is.resolution_column.clone().unwrap_or(columns.resolution),
                    date: is.date_column.clone().unwrap_or(columns.date),
                    vote: is.vote_column.clone().unwrap_or(columns.vote),
                };
                worksheet = is.excel_worksheet_name.clone();
            }
            res.input = Some(InputSource {
                path,
                provider: parse_provider(provider.as_deref().unwrap_or("csv"))?,
                excel_worksheet_name: args.excel_worksheet_name.clone().or(worksheet),
                columns,
            });
        }

        if let Some(is) = input_settings.as_ref() {
            if let Some(policy) = &is.duplicate_ballot_policy {
                res.duplicate_mode = parse_duplicate_policy(policy)?;
            }
            if let Some(extra) = &is.extra_name_overrides {
                res.name_overrides = validate_overrides(extra)?;
            }
        }

        if let Some(os) = output_settings.as_ref() {
            if let Some(p) = os.matrix_path.as_ref() {
                res.matrix_path = relative(p);
            }
            if let Some(p) = os.bundle_path.as_ref() {
                res.bundle_path = relative(p);
            }
        }
        if let Some(p) = &args.matrix {
            res.matrix_path = p.clone();
        }
        if let Some(p) = &args.out {
            res.bundle_path = p.clone();
        }
        res.reference = args.reference.clone();

        if let Some(r) = rules.as_ref() {
            res.rules = validate_rules(r)?;
        }
        if let Some(k) = args.blocs {
            res.rules.num_blocs = k;
        }
        if let Some(seed) = args.seed {
            res.rules.random_seed = seed;
        }
        if res.rules.num_blocs == 0 {
            whatever!("The number of blocs must be at least 1");
        }
        Ok(res)
    }
}

fn parse_stage(s: &str) -> BlocResult<Stage> {
    match s {
        "normalize" => Ok(Stage::Normalize),
        "analyze" => Ok(Stage::Analyze),
        "all" => Ok(Stage::All),
        "inspect" => Ok(Stage::Inspect),
        x => whatever!("Unknown stage {:?}: expected normalize, analyze, all or inspect", x),
    }
}

fn parse_provider(s: &str) -> BlocResult<InputProvider> {
    match s {
        "csv" => Ok(InputProvider::Csv),
        "xlsx" | "excel" => Ok(InputProvider::Xlsx),
        x => whatever!("Input type {:?} is not implemented", x),
    }
}

fn parse_duplicate_policy(s: &str) -> BlocResult<DuplicateBallotMode> {
    match s {
        "lastWins" => Ok(DuplicateBallotMode::LastWins),
        "reject" => Ok(DuplicateBallotMode::Reject),
        x => whatever!("Unknown duplicateBallotPolicy {:?}", x),
    }
}

fn validate_overrides(extra: &[NameOverride]) -> BlocResult<Vec<NameOverride>> {
    for o in extra.iter() {
        if o.fragment.is_empty() {
            whatever!("Name override for {} has an empty fragment", o.code);
        }
        if !is_known_code(&o.code) {
            whatever!(
                "Name override {:?} points to unknown territory code {:?}",
                o.fragment,
                o.code
            );
        }
    }
    Ok(extra.to_vec())
}

pub fn validate_rules(bloc_rules: &BlocRules) -> BlocResult<AnalysisRules> {
    let defaults = AnalysisRules::DEFAULT_RULES;
    let window_width = bloc_rules.window_width.unwrap_or(defaults.window_width);
    if window_width == 0 {
        whatever!("windowWidth must be positive");
    }
    let res = AnalysisRules {
        num_blocs: match bloc_rules.num_blocs {
            Some(0) => whatever!("numBlocs must be at least 1"),
            Some(k) => k,
            None => defaults.num_blocs,
        },
        random_seed: match bloc_rules.random_seed.clone().map(|s| s.parse::<u64>()) {
            None => defaults.random_seed,
            Some(Result::Ok(x)) => x,
            Some(Err(e)) => {
                whatever!("Cannot use random seed {:?}: {}", bloc_rules.random_seed, e)
            }
        },
        window_width,
        window_range: match (
            bloc_rules.auto_window_range.unwrap_or(false),
            bloc_rules.first_window_start,
            bloc_rules.last_window_start,
        ) {
            (true, None, None) => WindowRange::FromData,
            (true, _, _) => {
                whatever!("autoWindowRange cannot be combined with explicit window starts")
            }
            (false, first, last) => {
                let first = first.unwrap_or(DEFAULT_FIRST_WINDOW);
                let last = last.unwrap_or(DEFAULT_LAST_WINDOW);
                let w = window_width as i32;
                if first > last || first.rem_euclid(w) != 0 || last.rem_euclid(w) != 0 {
                    whatever!(
                        "Window starts {} and {} must be ordered multiples of the window width {}",
                        first,
                        last,
                        w
                    );
                }
                WindowRange::Fixed { first, last }
            }
        },
        degenerate_window_mode: match bloc_rules.degenerate_window_mode.as_deref() {
            None | Some("reduceBlocs") => DegenerateWindowMode::ReduceBlocs,
            Some("skip") => DegenerateWindowMode::Skip,
            Some(x) => whatever!("Unknown degenerateWindowMode {:?}", x),
        },
        init_repeats: match bloc_rules.init_repeats.as_deref() {
            None | Some("auto") => InitRepeats::Auto,
            Some(x) => match x.parse::<u32>() {
                Result::Ok(n) if n > 0 => InitRepeats::Fixed(n),
                _ => whatever!("Failed to understand initRepeats option: {:?}", x),
            },
        },
        max_iterations: match bloc_rules.max_iterations {
            Some(0) => whatever!("maxIterations must be at least 1"),
            Some(n) => n,
            None => defaults.max_iterations,
        },
        tolerance: match bloc_rules.tolerance {
            Some(t) if t.is_finite() && t >= 0.0 => t,
            Some(t) => whatever!("tolerance must be a non-negative number, got {}", t),
            None => defaults.tolerance,
        },
    };
    Ok(res)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_rules() -> BlocRules {
        BlocRules {
            num_blocs: None,
            random_seed: None,
            window_width: None,
            first_window_start: None,
            last_window_start: None,
            auto_window_range: None,
            degenerate_window_mode: None,
            init_repeats: None,
            max_iterations: None,
            tolerance: None,
        }
    }

    fn args() -> Args {
        Args {
            config: None,
            input: None,
            input_type: None,
            excel_worksheet_name: None,
            matrix: None,
            out: None,
            reference: None,
            stage: None,
            blocs: None,
            seed: None,
            verbose: false,
        }
    }

    #[test]
    fn default_rules() {
        assert_eq!(
            validate_rules(&empty_rules()).unwrap(),
            AnalysisRules::DEFAULT_RULES
        );
    }

    #[test]
    fn rules_from_json() {
        let js = r#"{
            "inputSettings": {"filePath": "votes.xlsx", "provider": "xlsx",
                "duplicateBallotPolicy": "reject",
                "extraNameOverrides": [{"fragment": "Yugoslavia", "code": "SRB"}]},
            "outputSettings": {"bundlePath": "out/blocs.json"},
            "rules": {"numBlocs": 4, "randomSeed": "7", "initRepeats": "10",
                "degenerateWindowMode": "skip", "autoWindowRange": true}
        }"#;
        let config: BlocConfig = serde_json::from_str(js).unwrap();
        let rules = validate_rules(config.rules.as_ref().unwrap()).unwrap();
        assert_eq!(rules.num_blocs, 4);
        assert_eq!(rules.random_seed, 7);
        assert_eq!(rules.init_repeats, InitRepeats::Fixed(10));
        assert_eq!(rules.degenerate_window_mode, DegenerateWindowMode::Skip);
        assert_eq!(rules.window_range, WindowRange::FromData);
    }

    #[test]
    fn invalid_rules() {
        let mut r = empty_rules();
        r.degenerate_window_mode = Some("explode".to_string());
        assert!(validate_rules(&r).is_err());

        let mut r = empty_rules();
        r.first_window_start = Some(1945);
        assert!(validate_rules(&r).is_err());

        let mut r = empty_rules();
        r.random_seed = Some("forty-two".to_string());
        assert!(validate_rules(&r).is_err());

        let mut r = empty_rules();
        r.num_blocs = Some(0);
        assert!(validate_rules(&r).is_err());

        let mut r = empty_rules();
        r.auto_window_range = Some(true);
        r.last_window_start = Some(2000);
        assert!(validate_rules(&r).is_err());
    }

    #[test]
    fn config_file_paths_are_relative_to_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let config_p = dir.path().join("config.json");
        fs::write(
            &config_p,
            r#"{"inputSettings": {"filePath": "votes.csv", "voteColumn": "vote",
                 "extraNameOverrides": [{"fragment": "Yugoslavia", "code": "SRB"}]},
                "outputSettings": {"matrixPath": "m.csv"}}"#,
        )
        .unwrap();
        let mut a = args();
        a.config = Some(config_p.display().to_string());
        a.out = Some("stdout".to_string());
        a.blocs = Some(3);
        let s = RunSettings::from_args(&a).unwrap();
        let input = s.input.unwrap();
        assert_eq!(input.path, dir.path().join("votes.csv").display().to_string());
        assert_eq!(input.provider, InputProvider::Csv);
        assert_eq!(input.columns.vote, "vote");
        assert_eq!(input.columns.voter, "member_state");
        assert_eq!(s.matrix_path, dir.path().join("m.csv").display().to_string());
        assert_eq!(s.bundle_path, "stdout");
        assert_eq!(s.rules.num_blocs, 3);
        assert_eq!(s.name_overrides.len(), 1);
        assert_eq!(s.stage, Stage::All);
    }

    #[test]
    fn bad_command_line_values() {
        let mut a = args();
        a.stage = Some("render".to_string());
        assert!(RunSettings::from_args(&a).is_err());

        let mut a = args();
        a.input = Some("votes.ods".to_string());
        a.input_type = Some("ods".to_string());
        assert!(RunSettings::from_args(&a).is_err());

        let mut a = args();
        a.blocs = Some(0);
        assert!(RunSettings::from_args(&a).is_err());
    }

    #[test]
    fn overrides_must_use_known_codes() {
        let bad = vec![NameOverride {
            fragment: "Yugoslavia".to_string(),
            code: "YUG".to_string(),
        }];
        assert!(validate_overrides(&bad).is_err());
    }
}
