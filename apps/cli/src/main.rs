//! doku CLI: documentation build orchestrator for packages.
//!
//! Stages a package's API sources and prose manual into a DocFX project,
//! runs DocFX and publishes the rendered site.

mod commands;

use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

fn main() -> Result<ExitCode> {
    color_eyre::install()?;
    let cli = Cli::parse();
    let tool_config = commands::load_tool_config();
    let level = commands::resolve_log_level(&cli, &tool_config);
    commands::init_tracing(&cli, level)?;
    commands::run(cli, tool_config, level)
}
