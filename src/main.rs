//! snipscope - editor snippet manager
//!
//! Browse and edit workspace (`.code-snippets`) and per-language user snippet
//! files from the terminal. Each snippet is edited as annotated source text in
//! your own editor and written back to its snippet file when saved.

use color_eyre::Result;
use color_eyre::eyre::eyre;
use env_logger::{Builder, Env};
use std::process::ExitCode;

mod cli;

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    Builder::from_env(Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let settings = snipscope::settings::Settings::load().map_err(|err| eyre!("{err:#}"))?;
    let args: Vec<String> = std::env::args().skip(1).collect();

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    runtime
        .block_on(cli::execute_cli(&args, settings))
        .map_err(|err| eyre!("{err:#}"))
}
