//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use doku_core::init::{InitOutcome, initialize_documentation};
use doku_core::pipeline::{self, BuildOptions, BuildReport, ProgressReporter, SilentProgress, Stage};
use doku_shared::{
    LogLevel, Logger, Severity, ToolConfig, init_config, is_github_actions, load_config,
};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// doku: build documentation sites for packages with DocFX.
#[derive(Parser)]
#[command(
    name = "doku",
    version,
    about = "Stage a package's API sources and manual into a DocFX project and build the site.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Minimum severity to log: verbose, info, warning, error or none.
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Also write the log to this file.
    #[arg(long = "log", value_name = "PATH", global = true)]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Build the documentation.
    Build {
        /// Folder containing the package.json file.
        #[arg(value_name = "PACKAGE_PATH", default_value = ".")]
        package_path: PathBuf,

        /// Output folder (defaults to the tool config's `output_dir`).
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Folder used for building; a temporary one by default.
        #[arg(long)]
        build: Option<PathBuf>,

        /// Custom template folder containing a template.json.
        #[arg(long)]
        template: Option<PathBuf>,

        /// Custom stylesheet layered over the default template.
        #[arg(long)]
        style: Option<PathBuf>,

        /// Build configuration file (defaults to Documentation~/config.json).
        #[arg(long)]
        config: Option<PathBuf>,

        /// DocFX executable or installation folder.
        #[arg(long, alias = "with-docfx")]
        docfx: Option<PathBuf>,

        /// Keep the build folder after the build.
        #[arg(long, alias = "keep-build-folder")]
        keep_build_dir: bool,
    },

    /// Create a Documentation~ folder with a default config.json and index.md.
    Init {
        /// Folder containing the package.json file.
        #[arg(value_name = "PACKAGE_PATH", default_value = ".")]
        package_path: PathBuf,

        /// Overwrite existing files.
        #[arg(long)]
        force: bool,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. `RUST_LOG` overrides `level`.
pub(crate) fn init_tracing(cli: &Cli, level: LogLevel) -> Result<()> {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.as_filter_directive()));

    let file_layer = match &cli.log_file {
        Some(path) => {
            let file = std::fs::File::create(path)
                .wrap_err_with(|| format!("cannot create log file {}", path.display()))?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(false)
                    .with_writer(std::sync::Mutex::new(file)),
            )
        }
        None => None,
    };

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer);

    match cli.log_format {
        LogFormat::Text => registry.with(fmt::layer().with_target(false)).init(),
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) fn run(cli: Cli, tool_config: ToolConfig, level: LogLevel) -> Result<ExitCode> {
    let logger = Logger::new(level).with_ci_groups(is_github_actions());

    match cli.command {
        Command::Build {
            package_path,
            output,
            build,
            template,
            style,
            config,
            docfx,
            keep_build_dir,
        } => {
            let options = BuildOptions {
                package_root: package_path,
                output_root: output
                    .unwrap_or_else(|| PathBuf::from(&tool_config.defaults.output_dir)),
                build_root: build,
                docfx_path: docfx.or_else(|| tool_config.defaults.docfx_path.map(PathBuf::from)),
                template_path: template,
                stylesheet_path: style,
                config_path: config,
                keep_build_dir,
            };
            Ok(cmd_build(&options, &logger))
        }
        Command::Init {
            package_path,
            force,
        } => Ok(cmd_init(&package_path, force, &logger)),
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(&tool_config),
        },
    }
}

// ---------------------------------------------------------------------------
// Command implementations
// ---------------------------------------------------------------------------

/// Progress reporter rendering stage transitions on a spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]);
        spinner.set_style(style);
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Self { spinner }
    }
}

impl ProgressReporter for CliProgress {
    fn stage(&self, stage: Stage) {
        self.spinner.set_message(stage.to_string());
    }

    fn done(&self, _report: &BuildReport) {
        self.spinner.finish_and_clear();
    }
}

impl Drop for CliProgress {
    fn drop(&mut self) {
        if !self.spinner.is_finished() {
            self.spinner.finish_and_clear();
        }
    }
}

fn cmd_build(options: &BuildOptions, logger: &Logger) -> ExitCode {
    info!(
        package = %options.package_root.display(),
        output = %options.output_root.display(),
        "building documentation"
    );

    let result = if is_github_actions() {
        pipeline::build(options, logger, &SilentProgress)
    } else {
        let progress = CliProgress::new();
        pipeline::build(options, logger, &progress)
    };

    if let Ok(report) = &result {
        println!();
        println!("  Package:   {}", report.package);
        println!("  Output:    {}", report.output_root.display());
        println!("  Files:     {}", report.published_files);
        if let Some(kept) = &report.kept_build_root {
            println!("  Build dir: {}", kept.display());
        }
        println!("  Elapsed:   {:.1?}", report.elapsed);
    }

    print_summary(logger)
}

fn cmd_init(package_path: &Path, force: bool, logger: &Logger) -> ExitCode {
    match initialize_documentation(package_path, force, logger) {
        Ok(InitOutcome::Created(dir)) => println!("Documentation initialized at: {}", dir.display()),
        Ok(InitOutcome::Skipped(_)) => {}
        Err(e) => logger.error(e.to_string()),
    }
    exit_code(logger)
}

/// Print the end-of-run headline with per-severity counts.
fn print_summary(logger: &Logger) -> ExitCode {
    let summary = logger.summary();
    println!();
    println!("{}", summary.headline());
    for severity in Severity::ALL.iter().rev() {
        let count = summary.count(*severity);
        if count > 0 {
            println!("  {severity}: {count}");
        }
    }
    exit_code(logger)
}

fn exit_code(logger: &Logger) -> ExitCode {
    if logger.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn cmd_config_init() -> Result<ExitCode> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(ExitCode::SUCCESS)
}

fn cmd_config_show(config: &ToolConfig) -> Result<ExitCode> {
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(ExitCode::SUCCESS)
}

/// Resolved log level: `--log-level`, else the tool config's default.
pub(crate) fn resolve_log_level(cli: &Cli, config: &ToolConfig) -> LogLevel {
    cli.log_level.unwrap_or(config.defaults.log_level)
}

/// Load the tool config, falling back to defaults when it cannot be read.
pub(crate) fn load_tool_config() -> ToolConfig {
    match load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("warning: {e}; using default configuration");
            ToolConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_build_flags() {
        let cli = Cli::try_parse_from([
            "doku",
            "build",
            "pkg",
            "-o",
            "site",
            "--with-docfx",
            "/opt/docfx",
            "--keep-build-folder",
            "--log-level",
            "warning",
        ])
        .unwrap();

        assert_eq!(cli.log_level, Some(LogLevel::Warning));
        match cli.command {
            Command::Build {
                package_path,
                output,
                docfx,
                keep_build_dir,
                ..
            } => {
                assert_eq!(package_path, PathBuf::from("pkg"));
                assert_eq!(output, Some(PathBuf::from("site")));
                assert_eq!(docfx, Some(PathBuf::from("/opt/docfx")));
                assert!(keep_build_dir);
            }
            _ => panic!("expected build"),
        }
    }

    #[test]
    fn cli_log_level_overrides_tool_config() {
        let mut config = ToolConfig::default();
        config.defaults.log_level = LogLevel::Verbose;

        let cli = Cli::try_parse_from(["doku", "init"]).unwrap();
        assert_eq!(resolve_log_level(&cli, &config), LogLevel::Verbose);

        let cli = Cli::try_parse_from(["doku", "--log-level", "error", "init"]).unwrap();
        assert_eq!(resolve_log_level(&cli, &config), LogLevel::Error);
    }

    #[test]
    fn rejects_unknown_log_level() {
        assert!(Cli::try_parse_from(["doku", "--log-level", "loud", "build"]).is_err());
    }
}
