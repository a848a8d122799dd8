//! Resource staging: populates the build root from the package.
//!
//! Runs after the base project has been extracted. Each section records
//! whether it produced anything in [`SectionPresenceFlags`] so the top-level
//! navigation only links what exists.

use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use tracing::{debug, instrument};
use walkdir::WalkDir;

use doku_shared::{
    BuildConfiguration, DokuError, Logger, Result, SectionPresenceFlags, TemplateDescriptor,
    load_template_descriptor,
};

use crate::context::BuildContext;
use crate::fsops;
use crate::project::{TEMPLATE_DIR, TOC_FILE};
use crate::toc;

/// Default stylesheet looked up in the documentation directory.
pub const STYLESHEET_FILE: &str = "style.css";

/// Page promoted from the manual to the site's home page.
const HOME_PAGE: &str = "home.md";

const MANUAL_INDEX: &str = "index.md";

const LICENSE_FILES: &[&str] = &["LICENSE.md", "LICENSE.txt"];

const THIRD_PARTY_NOTICE_FILES: &[&str] = &[
    "Third Party Notices.md",
    "ThirdPartyNotices.md",
    "Third Party Notices.txt",
    "ThirdPartyNotices.txt",
];

/// Where custom presentation assets come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplateSource {
    /// A template directory with its own `template.json`.
    Directory(PathBuf),
    /// A single stylesheet layered over the default template.
    Stylesheet(PathBuf),
}

/// A resolved custom template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateSelection {
    pub descriptor: TemplateDescriptor,
    pub source: TemplateSource,
}

impl TemplateSelection {
    /// Pick the template for a run: an explicit template directory wins,
    /// then an explicit stylesheet, then `style.css` in the documentation
    /// directory. `None` means the default template only.
    pub fn resolve(
        template_dir: Option<&Path>,
        stylesheet: Option<&Path>,
        documentation_root: &Path,
        logger: &Logger,
    ) -> Result<Option<Self>> {
        if let Some(dir) = template_dir {
            let dir = std::path::absolute(dir).map_err(|e| DokuError::io(dir, e))?;
            let descriptor = load_template_descriptor(&dir)?;
            return Ok(Some(Self {
                descriptor,
                source: TemplateSource::Directory(dir),
            }));
        }

        if let Some(path) = stylesheet {
            if path.is_file() {
                return Ok(Some(Self::stylesheet(path.to_path_buf())));
            }
            logger.warning(format!("Stylesheet {} does not exist", path.display()));
        }

        let fallback = documentation_root.join(STYLESHEET_FILE);
        Ok(fallback.is_file().then(|| Self::stylesheet(fallback)))
    }

    fn stylesheet(path: PathBuf) -> Self {
        Self {
            descriptor: TemplateDescriptor::partial(),
            source: TemplateSource::Stylesheet(path),
        }
    }

    pub fn describe(&self) -> String {
        let kind = if self.descriptor.is_full() { "" } else { "partial " };
        match &self.source {
            TemplateSource::Directory(dir) => format!("{kind}template at {}", dir.display()),
            TemplateSource::Stylesheet(path) => format!("{kind}template with stylesheet {}", path.display()),
        }
    }
}

/// Copy the package's resources into the build root.
#[instrument(skip_all, fields(package = %ctx.package_root.display()))]
pub fn stage_resources(
    ctx: &BuildContext,
    config: &BuildConfiguration,
    template: Option<&TemplateSelection>,
    logger: &Logger,
) -> Result<SectionPresenceFlags> {
    let staging = Staging {
        ctx,
        config,
        logger,
    };

    staging.stage_template(template)?;

    let mut sections = SectionPresenceFlags::default();
    if !config.excludes.api_docs {
        sections.has_api_docs = staging.stage_sources()?;
    }
    if !config.excludes.license {
        sections.has_license = staging.stage_license()?;
    }
    if !config.excludes.changelog {
        sections.has_changelog = staging.stage_changelog()?;
    }

    let docs = &ctx.documentation_root;
    if docs.is_dir() {
        for asset in ["logo.svg", "favicon.ico"] {
            fsops::try_copy_file(&docs.join(asset), &ctx.build_root.join(asset), logger)?;
        }
        if !config.excludes.manual {
            sections.manual_home = staging.stage_manual()?;
        }
    }

    debug!(?sections, "resources staged");
    Ok(sections)
}

struct Staging<'a> {
    ctx: &'a BuildContext,
    config: &'a BuildConfiguration,
    logger: &'a Logger,
}

impl Staging<'_> {
    fn stage_template(&self, template: Option<&TemplateSelection>) -> Result<()> {
        let Some(template) = template else {
            return Ok(());
        };

        self.logger.info("Copying the template files");
        let dst = self.ctx.build_root.join(TEMPLATE_DIR);
        match &template.source {
            TemplateSource::Directory(dir) => {
                fsops::copy_dir(dir, &dst, None, self.logger)?;
            }
            TemplateSource::Stylesheet(path) => {
                let target = dst.join("styles").join("main.css");
                if !fsops::try_copy_file(path, &target, self.logger)? {
                    return Err(DokuError::staging(format!(
                        "Stylesheet {} disappeared before staging",
                        path.display()
                    )));
                }
            }
        }
        Ok(())
    }

    /// `*.cs` files under every source glob match, mirrored into `src/`.
    fn stage_sources(&self) -> Result<bool> {
        self.logger.info("Copying the source code");

        let package_root = &self.ctx.package_root;
        let escaped_root = glob::Pattern::escape(&package_root.to_string_lossy());

        let mut roots = Vec::new();
        for source in &self.config.sources {
            let pattern = format!("{escaped_root}/{}", source.replace('\\', "/"));
            let matches = glob::glob(&pattern).map_err(|e| {
                DokuError::config(format!("Invalid source glob `{source}`: {e}"))
            })?;
            for entry in matches {
                let path = entry.map_err(|e| DokuError::io(e.path().to_path_buf(), e.into()))?;
                if path.is_dir() {
                    roots.push(path);
                }
            }
        }
        roots.sort();
        roots.dedup();

        let mut copied: Vec<PathBuf> = Vec::new();
        let mut count = 0;
        for root in roots {
            let nested = copied.iter().any(|done| root.starts_with(done));
            let generated =
                root.starts_with(&self.ctx.build_root) || root.starts_with(&self.ctx.output_root);
            if nested || generated {
                continue;
            }
            let Ok(relative) = root.strip_prefix(package_root) else {
                continue;
            };

            self.logger.verbose(format!("Source directory {}", relative.display()));
            count += fsops::copy_dir(&root, &self.ctx.sources_root.join(relative), Some("cs"), self.logger)?;
            copied.push(root);
        }

        self.logger.info(format!("Copied {count} source files"));
        Ok(count > 0)
    }

    fn stage_license(&self) -> Result<bool> {
        self.logger.info("Copying licenses");

        let mut entries = Vec::new();
        if self.copy_first(LICENSE_FILES, "license/LICENSE.md")? {
            entries.push(("License", "LICENSE"));
        }
        if self.copy_first(THIRD_PARTY_NOTICE_FILES, "license/ThirdPartyNotices.md")? {
            entries.push(("Third Party Notices", "ThirdPartyNotices"));
        }

        if entries.is_empty() {
            return Ok(false);
        }
        self.write_section_navigation("license", &entries)?;
        Ok(true)
    }

    fn stage_changelog(&self) -> Result<bool> {
        self.logger.info("Copying changelog");

        if !self.copy_first(&["CHANGELOG.md"], "changelog/CHANGELOG.md")? {
            return Ok(false);
        }
        self.write_section_navigation("changelog", &[("Changelog", "CHANGELOG")])?;
        Ok(true)
    }

    /// Copy the first existing package file among `candidates` to `target`.
    fn copy_first(&self, candidates: &[&str], target: &str) -> Result<bool> {
        let target = self.ctx.build_root.join(target);
        for candidate in candidates {
            if fsops::try_copy_file(&self.ctx.package_root.join(candidate), &target, self.logger)? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Redirecting `index.md` plus a `toc.yml` for a single-page section.
    fn write_section_navigation(&self, section: &str, entries: &[(&str, &str)]) -> Result<()> {
        let dir = self.ctx.build_root.join(section);

        let mut toc = String::new();
        for (name, stem) in entries {
            toc.push_str(&format!("- name: {name}\n  href: {stem}.md\n"));
        }
        fsops::write_text(&dir.join(TOC_FILE), &toc, self.logger)?;

        let first = entries.first().map(|(_, stem)| *stem).unwrap_or_default();
        fsops::write_text(
            &dir.join("index.md"),
            &format!("<script>window.location.replace('{first}.html')</script>"),
            self.logger,
        )
    }

    /// Returns the manual home page relative to the build root.
    fn stage_manual(&self) -> Result<Option<String>> {
        self.logger.info("Copying the manual files");

        let manual = &self.ctx.manual_root;
        let build = &self.ctx.build_root;
        fsops::copy_dir(&self.ctx.documentation_root, manual, None, self.logger)?;

        if manual_documents(manual)?.is_empty() {
            return Ok(None);
        }

        fsops::move_file(&manual.join(HOME_PAGE), &build.join("index.md"), self.logger)?;
        for name in ["filter.yml", "projectMetadata.yml"] {
            fsops::move_file(&manual.join(name), &build.join(name), self.logger)?;
        }

        let files = ordered_manual_documents(manual)?;
        let Some(home) = files
            .first()
            .and_then(|first| fsops::relative_slash_path(build, first))
        else {
            return Ok(None);
        };

        let toc_path = manual.join(TOC_FILE);
        if !toc_path.exists() {
            self.logger.warning("Missing `toc.yml` file; will create one.");
            self.logger.info("Creating the manual's table of contents");
            toc::write_manual_toc(manual, &files, &toc_path, self.logger)?;
        }

        Ok(Some(home))
    }
}

/// Every `.md` file under the manual root, unordered.
fn manual_documents(manual_root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(manual_root) {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(manual_root).to_path_buf();
            DokuError::io(path, e.into())
        })?;
        let is_markdown = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("md"));
        if entry.file_type().is_file() && is_markdown {
            files.push(entry.into_path());
        }
    }
    Ok(files)
}

/// Manual documents in navigation order: `index.md` first, then each
/// directory's documents before its subdirectories, names ascending.
pub fn ordered_manual_documents(manual_root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = manual_documents(manual_root)?;
    files.sort_by(|a, b| {
        let a = a.strip_prefix(manual_root).unwrap_or(a);
        let b = b.strip_prefix(manual_root).unwrap_or(b);
        manual_order(a, b)
    });

    let index = manual_root.join(MANUAL_INDEX);
    if let Some(pos) = files.iter().position(|f| *f == index) {
        let index = files.remove(pos);
        files.insert(0, index);
    }
    Ok(files)
}

/// Component-wise path order where a file sorts before a sibling directory.
fn manual_order(a: &Path, b: &Path) -> Ordering {
    let a: Vec<_> = a.components().collect();
    let b: Vec<_> = b.components().collect();

    for (i, (x, y)) in a.iter().zip(&b).enumerate() {
        if x == y {
            continue;
        }
        let x_is_file = i + 1 == a.len();
        let y_is_file = i + 1 == b.len();
        return match (x_is_file, y_is_file) {
            (true, false) => Ordering::Less,
            (false, true) => Ordering::Greater,
            _ => x.as_os_str().cmp(y.as_os_str()),
        };
    }
    a.len().cmp(&b.len())
}
