// The persisted results of an analysis run.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::blocs::*;

pub const BUNDLE_FORMAT_VERSION: u32 = 1;

/// The placement of one voter in one window, as stored in the bundle.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BundleRow {
    #[serde(rename = "country_iso")]
    pub voter: String,
    pub bloc: u32,
    pub x: f64,
    pub y: f64,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct BundleSettings {
    #[serde(rename = "numBlocs")]
    pub num_blocs: u32,
    #[serde(rename = "randomSeed")]
    pub random_seed: u64,
    #[serde(rename = "windowWidth")]
    pub window_width: u32,
}

#[derive(Eq, PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct SkippedWindow {
    pub start: i32,
    pub reason: String,
}

/// All the windows of one run, keyed by the first year of the window.
#[derive(PartialEq, Debug, Clone, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(rename = "formatVersion")]
    pub format_version: u32,
    /// The SHA-256 digest of the voting matrix file the bundle was computed from.
    #[serde(rename = "sourceDigest")]
    pub source_digest: String,
    pub settings: BundleSettings,
    pub windows: BTreeMap<i32, Vec<BundleRow>>,
    #[serde(rename = "skippedWindows", default)]
    pub skipped_windows: Vec<SkippedWindow>,
}

impl Bundle {
    pub fn from_analysis(
        analysis: &BlocAnalysis,
        rules: &AnalysisRules,
        source_digest: String,
    ) -> Bundle {
        let windows = analysis
            .windows
            .iter()
            .map(|w| {
                let rows = w
                    .rows
                    .iter()
                    .map(|r| BundleRow {
                        voter: r.voter.clone(),
                        bloc: r.bloc,
                        x: r.x,
                        y: r.y,
                    })
                    .collect();
                (w.start, rows)
            })
            .collect();
        Bundle {
            format_version: BUNDLE_FORMAT_VERSION,
            source_digest,
            settings: BundleSettings {
                num_blocs: rules.num_blocs,
                random_seed: rules.random_seed,
                window_width: rules.window_width,
            },
            windows,
            skipped_windows: analysis
                .skipped
                .iter()
                .map(|(start, reason)| SkippedWindow {
                    start: *start,
                    reason: reason.to_string(),
                })
                .collect(),
        }
    }

    /// A human-readable description: one line for the run, then one line per window.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![format!(
            "Bundle version {}, {} windows, {} blocs requested, seed {}, windows of {} years",
            self.format_version,
            self.windows.len(),
            self.settings.num_blocs,
            self.settings.random_seed,
            self.settings.window_width
        )];
        for (start, rows) in self.windows.iter() {
            let mut sizes: BTreeMap<u32, usize> = BTreeMap::new();
            for r in rows.iter() {
                *sizes.entry(r.bloc).or_insert(0) += 1;
            }
            let sizes_s: Vec<String> = sizes
                .iter()
                .map(|(bloc, n)| format!("{}:{}", bloc, n))
                .collect();
            lines.push(format!(
                "{}-{}: {} voters, {} blocs [{}]",
                start,
                start + self.settings.window_width as i32 - 1,
                rows.len(),
                sizes.len(),
                sizes_s.join(" ")
            ));
        }
        for s in self.skipped_windows.iter() {
            lines.push(format!("{}: skipped ({})", s.start, s.reason));
        }
        lines
    }
}

pub fn read_bundle(path: &str) -> BlocResult<Bundle> {
    let contents = fs::read_to_string(path).context(BundleUnavailableSnafu { path })?;
    let bundle: Bundle = serde_json::from_str(&contents).context(ParsingJsonSnafu { path })?;
    if bundle.format_version != BUNDLE_FORMAT_VERSION {
        whatever!(
            "Unsupported bundle format version {} in {} (expected {})",
            bundle.format_version,
            path,
            BUNDLE_FORMAT_VERSION
        );
    }
    Ok(bundle)
}
