pub mod cli;
pub mod crawler;
pub mod gql;
pub mod histogram;
pub mod models;
pub mod settings;
pub mod tracker;
mod utils;

use clap::Parser;
use std::process::ExitCode;

pub use crawler::{FetchOrchestrator, FetchOutcome};
pub use histogram::{GraphView, HistogramModel};
pub use models::{Timeline, VideoId};

pub fn run() -> ExitCode {
    // Initialize logging (reads RUST_LOG env var)
    env_logger::Builder::new()
        .filter_level(log::LevelFilter::Info)
        .parse_default_env()
        .init();

    let cli = cli::Cli::parse();

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            log::error!("failed to start async runtime: {err}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(cli::execute(cli)) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(err) => {
            log::error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}
