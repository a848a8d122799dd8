//! End-to-end `build` pipeline: package → staged project → DocFX → output.

use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use tracing::{info, instrument, warn};

use doku_shared::{
    BUILD_CONFIG_FILE, BuildConfiguration, DokuError, Logger, PackageDescriptor, Result,
    SectionPresenceFlags, load_build_configuration, load_package_descriptor,
};

use crate::context::BuildContext;
use crate::docfx::DocFx;
use crate::fsops;
use crate::project::{self, SiteInputs};
use crate::stage::{self, TemplateSelection};

/// Inputs of one `build` run, already merged from CLI flags and tool config.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Folder containing `package.json`.
    pub package_root: PathBuf,
    /// Final destination of the rendered site.
    pub output_root: PathBuf,
    /// Explicit build directory; a temporary one when `None`.
    pub build_root: Option<PathBuf>,
    /// DocFX executable or installation directory; `PATH` lookup when `None`.
    pub docfx_path: Option<PathBuf>,
    /// Custom template directory.
    pub template_path: Option<PathBuf>,
    /// Custom stylesheet, used when no template directory is given.
    pub stylesheet_path: Option<PathBuf>,
    /// Build configuration file; `Documentation~/config.json` when `None`.
    pub config_path: Option<PathBuf>,
    /// Keep the build directory after the run.
    pub keep_build_dir: bool,
}

/// Pipeline stages, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    LoadPackageDescriptor,
    ResolveConfiguration,
    StageResources,
    GenerateSiteConfig,
    InvokeSiteGenerator,
    PromoteOutput,
    Cleanup,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::LoadPackageDescriptor => "Loading package",
            Self::ResolveConfiguration => "Configuring",
            Self::StageResources => "Creating the DocFX project",
            Self::GenerateSiteConfig => "Generating site configuration",
            Self::InvokeSiteGenerator => "Running DocFX",
            Self::PromoteOutput => "Publishing",
            Self::Cleanup => "Cleaning up",
        })
    }
}

/// Result of a successful build.
#[derive(Debug)]
pub struct BuildReport {
    pub package: PackageDescriptor,
    pub sections: SectionPresenceFlags,
    /// Number of files copied into the output directory.
    pub published_files: usize,
    pub output_root: PathBuf,
    /// Build directory, present only when it was kept.
    pub kept_build_root: Option<PathBuf>,
    pub elapsed: Duration,
}

/// Progress callback for reporting pipeline status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new stage.
    fn stage(&self, stage: Stage);
    /// Called when the pipeline completes successfully.
    fn done(&self, report: &BuildReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn stage(&self, _stage: Stage) {}
    fn done(&self, _report: &BuildReport) {}
}

/// Values settled by [`Stage::ResolveConfiguration`].
struct Resolved {
    docfx: DocFx,
    template: Option<TemplateSelection>,
    config: BuildConfiguration,
}

/// Run the full build.
///
/// The first failing stage aborts the run; its error is logged and
/// returned. The build directory is removed afterwards in every case unless
/// [`BuildOptions::keep_build_dir`] is set. The output directory is only
/// touched by the last stage, so a failed run leaves it as it was.
#[instrument(skip_all, fields(package = %options.package_root.display()))]
pub fn build(
    options: &BuildOptions,
    logger: &Logger,
    progress: &dyn ProgressReporter,
) -> Result<BuildReport> {
    let start = Instant::now();

    let ctx = match BuildContext::new(
        &options.package_root,
        &options.output_root,
        options.build_root.as_deref(),
    ) {
        Ok(ctx) => ctx,
        Err(e) => {
            logger.error(e.to_string());
            return Err(e);
        }
    };
    info!(build_root = %ctx.build_root.display(), "starting build pipeline");

    let result = run_stages(&ctx, options, logger, progress);
    if let Err(e) = &result {
        logger.error(e.to_string());
    }

    progress.stage(Stage::Cleanup);
    let kept_build_root = cleanup(&ctx, options.keep_build_dir, logger);

    let (package, sections, published_files) = result?;
    let report = BuildReport {
        package,
        sections,
        published_files,
        output_root: ctx.output_root,
        kept_build_root,
        elapsed: start.elapsed(),
    };
    info!(files = report.published_files, elapsed = ?report.elapsed, "build complete");
    progress.done(&report);
    Ok(report)
}

fn run_stages(
    ctx: &BuildContext,
    options: &BuildOptions,
    logger: &Logger,
    progress: &dyn ProgressReporter,
) -> Result<(PackageDescriptor, SectionPresenceFlags, usize)> {
    progress.stage(Stage::LoadPackageDescriptor);
    let package = load_package_descriptor(&ctx.package_root)?;
    logger.info(format!("Package: {package}"));

    progress.stage(Stage::ResolveConfiguration);
    let resolved = resolve_configuration(ctx, options, logger)?;

    progress.stage(Stage::StageResources);
    let sections = {
        let _group = logger.begin_group(&Stage::StageResources.to_string());
        fsops::delete_dir(&ctx.build_root, logger)?;
        fsops::create_dir(&ctx.build_root, logger)?;
        project::extract_base_project(&ctx.build_root, logger)?;
        stage::stage_resources(ctx, &resolved.config, resolved.template.as_ref(), logger)?
    };

    progress.stage(Stage::GenerateSiteConfig);
    {
        let _group = logger.begin_group(&Stage::GenerateSiteConfig.to_string());
        let inputs = SiteInputs {
            package: &package,
            config: &resolved.config,
            template: resolved.template.as_ref().map(|t| t.descriptor),
            sections: &sections,
        };
        project::write_site_config(ctx, &inputs, logger)?;
    }

    progress.stage(Stage::InvokeSiteGenerator);
    {
        let _group = logger.begin_group(&Stage::InvokeSiteGenerator.to_string());
        resolved.docfx.build(&ctx.build_root, logger)?;
    }

    progress.stage(Stage::PromoteOutput);
    let published = promote_output(ctx, logger)?;

    Ok((package, sections, published))
}

fn resolve_configuration(
    ctx: &BuildContext,
    options: &BuildOptions,
    logger: &Logger,
) -> Result<Resolved> {
    let _group = logger.begin_group(&Stage::ResolveConfiguration.to_string());

    let docfx = DocFx::locate(options.docfx_path.as_deref())?;
    let version = docfx.ensure_supported(logger)?;
    logger.info(format!("Using DocFX {version} at {}", docfx.path().display()));

    let template = TemplateSelection::resolve(
        options.template_path.as_deref(),
        options.stylesheet_path.as_deref(),
        &ctx.documentation_root,
        logger,
    )?;
    if let Some(template) = &template {
        logger.info(format!("Using {}", template.describe()));
    }

    let config_path = match &options.config_path {
        Some(path) if !path.is_file() => {
            return Err(DokuError::config(format!(
                "File {} does not exist.",
                path.display()
            )));
        }
        Some(path) => path.clone(),
        None => ctx.documentation_root.join(BUILD_CONFIG_FILE),
    };
    let config = load_build_configuration(&config_path)?;

    logger.info(format!(
        "Define constants: {}",
        config.all_define_constants().join(",")
    ));
    if config.sources.len() < 3 {
        logger.info(format!("Sources: {}", config.sources.join(",")));
    } else {
        logger.info("Sources:");
        for source in &config.sources {
            logger.info(format!("- {source}"));
        }
    }
    let yes_no = |excluded: bool| if excluded { "YES" } else { "NO" };
    logger.info(format!("Exclude manual: {}", yes_no(config.excludes.manual)));
    logger.info(format!("Exclude API docs: {}", yes_no(config.excludes.api_docs)));
    logger.info(format!("Exclude changelog: {}", yes_no(config.excludes.changelog)));
    logger.info(format!("Exclude license: {}", yes_no(config.excludes.license)));
    logger.info(format!("Build directory: {}", ctx.build_root.display()));
    logger.info(format!("Output directory: {}", ctx.output_root.display()));

    Ok(Resolved {
        docfx,
        template,
        config,
    })
}

/// Replace the output directory with the rendered site.
fn promote_output(ctx: &BuildContext, logger: &Logger) -> Result<usize> {
    let _group = logger.begin_group(&Stage::PromoteOutput.to_string());

    let site = ctx.site_root();
    if !site.is_dir() {
        return Err(DokuError::tool(format!(
            "DocFX did not produce a site at {}",
            site.display()
        )));
    }

    fsops::delete_dir(&ctx.output_root, logger)?;
    let count = fsops::copy_dir(&site, &ctx.output_root, None, logger)?;
    logger.info(format!(
        "Copied {count} files to {}",
        ctx.output_root.display()
    ));
    Ok(count)
}

/// Delete the build directory unless asked to keep it. Returns the kept path.
fn cleanup(ctx: &BuildContext, keep: bool, logger: &Logger) -> Option<PathBuf> {
    if keep {
        logger.info(format!("Build directory kept at {}", ctx.build_root.display()));
        return Some(ctx.build_root.clone());
    }

    if let Err(e) = fsops::delete_dir(&ctx.build_root, logger) {
        warn!(error = %e, "failed to delete build directory");
        logger.warning(format!(
            "Failed to delete the build directory {}: {e}",
            ctx.build_root.display()
        ));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use doku_shared::{LogLevel, Severity};
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct RecordingProgress {
        stages: Mutex<Vec<Stage>>,
    }

    impl ProgressReporter for RecordingProgress {
        fn stage(&self, stage: Stage) {
            self.stages.lock().unwrap().push(stage);
        }
        fn done(&self, _report: &BuildReport) {}
    }

    #[test]
    fn missing_manifest_fails_and_cleans_up() {
        let tmp = TempDir::new().unwrap();
        let package = tmp.path().join("pkg");
        let build = tmp.path().join("build");
        let output = tmp.path().join("out");
        std::fs::create_dir_all(&package).unwrap();
        std::fs::create_dir_all(build.join("stale")).unwrap();
        std::fs::create_dir_all(&output).unwrap();
        std::fs::write(output.join("previous.html"), "old site").unwrap();

        let options = BuildOptions {
            package_root: package,
            output_root: output.clone(),
            build_root: Some(build.clone()),
            ..Default::default()
        };
        let logger = Logger::new(LogLevel::Info);
        let progress = RecordingProgress::default();

        let err = super::build(&options, &logger, &progress).unwrap_err();
        assert!(matches!(err, DokuError::Config { .. }));

        assert!(!build.exists());
        assert_eq!(
            std::fs::read_to_string(output.join("previous.html")).unwrap(),
            "old site"
        );
        assert!(logger.has_errors());
        assert_eq!(logger.summary().count(Severity::Error), 1);
        assert_eq!(
            *progress.stages.lock().unwrap(),
            vec![Stage::LoadPackageDescriptor, Stage::Cleanup]
        );
    }

    #[test]
    fn missing_docfx_is_tool_error_and_keeps_build_dir_on_request() {
        let tmp = TempDir::new().unwrap();
        let package = tmp.path().join("pkg");
        std::fs::create_dir_all(&package).unwrap();
        std::fs::write(
            package.join("package.json"),
            r#"{"displayName": "Tools", "version": "1.0.0"}"#,
        )
        .unwrap();
        let build_root = tmp.path().join("build");
        std::fs::create_dir_all(&build_root).unwrap();

        let options = BuildOptions {
            package_root: package,
            output_root: tmp.path().join("out"),
            build_root: Some(build_root.clone()),
            docfx_path: Some(tmp.path().join("no-docfx-here")),
            keep_build_dir: true,
            ..Default::default()
        };
        let logger = Logger::new(LogLevel::Info);

        let err = build(&options, &logger, &SilentProgress).unwrap_err();
        assert!(matches!(err, DokuError::Tool { .. }));
        assert!(build_root.is_dir());
        assert!(!tmp.path().join("out").exists());
    }

    #[test]
    fn stage_titles() {
        assert_eq!(Stage::InvokeSiteGenerator.to_string(), "Running DocFX");
        assert_eq!(Stage::Cleanup.to_string(), "Cleaning up");
    }
}
