mod args;
mod blocs;

use clap::Parser;
use env_logger::Env;
use snafu::ErrorCompat;

use crate::args::Args;
use crate::blocs::config_reader::RunSettings;

fn main() {
    let args = Args::parse();

    if args.verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    } else {
        env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    }

    let res = RunSettings::from_args(&args).and_then(|settings| blocs::run(&settings));

    if let Err(e) = res {
        eprintln!("An error occurred: {}", e);
        if let Some(bt) = ErrorCompat::backtrace(&e) {
            eprintln!("{}", bt);
        }
        std::process::exit(1);
    }
}
