use clap::Parser;

/// This program finds voting blocs in historical roll-call records, one time window at a time.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) A JSON file describing the input, the outputs and the analysis rules.
    /// Command line options override the settings of this file.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,

    /// (file path) The raw ballot records.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default csv) The type of the input: csv or xlsx.
    #[clap(long, value_parser)]
    pub input_type: Option<String>,

    /// (default: first sheet) When using an Excel file, indicates the name of the worksheet to use.
    #[clap(long, value_parser)]
    pub excel_worksheet_name: Option<String>,

    /// (file path) The voting matrix. It is written by the normalize stage and read by the
    /// analyze stage.
    #[clap(short, long, value_parser)]
    pub matrix: Option<String>,

    /// (file path or 'stdout') Where to write the bundle of results, in JSON format.
    /// The inspect stage reads the bundle from this location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference bundle. If provided, the program checks that the computed
    /// bundle matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (default all) The stage to run: normalize, analyze, all or inspect.
    #[clap(long, value_parser)]
    pub stage: Option<String>,

    /// (default 6) The number of blocs to look for in each window.
    #[clap(long, value_parser)]
    pub blocs: Option<u32>,

    /// (default 42) The seed of the clustering.
    #[clap(long, value_parser)]
    pub seed: Option<u64>,

    // Other arguments
    /// If passed as an argument, turns on debug logging (written to the standard error).
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
