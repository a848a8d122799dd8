//! Core domain types for a documentation build.

use serde::{Deserialize, Serialize};

/// Define constant always passed to the API extraction project.
pub const PACKAGE_DOCS_GENERATION_DEFINE: &str = "PACKAGE_DOCS_GENERATION";

// ---------------------------------------------------------------------------
// PackageDescriptor
// ---------------------------------------------------------------------------

/// The subset of `package.json` that identifies the documented package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageDescriptor {
    /// Human-readable package name, used as the site title.
    #[serde(default)]
    pub display_name: String,
    /// Package version string.
    #[serde(default)]
    pub version: String,
    /// Optional platform/target tag (e.g. the engine version the package targets).
    #[serde(default, rename = "unity", skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

impl PackageDescriptor {
    /// Both the display name and the version are required.
    pub fn is_valid(&self) -> bool {
        !self.display_name.trim().is_empty() && !self.version.trim().is_empty()
    }
}

impl std::fmt::Display for PackageDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.display_name, self.version)?;
        if let Some(target) = self.target.as_deref().filter(|t| !t.is_empty()) {
            write!(f, " targeting {target}")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// BuildConfiguration
// ---------------------------------------------------------------------------

/// Author-supplied build toggles from `Documentation~/config.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildConfiguration {
    /// Pass `disableDefaultFilter` through to the generated `docfx.json`.
    pub disable_default_filter: bool,
    /// Enable the site generator's search index.
    pub enable_search: bool,
    /// Sections to leave out of the site.
    pub excludes: SectionExcludes,
    /// Extra preprocessor define tokens for API extraction.
    pub define_constants: Vec<String>,
    /// Globs, relative to the package root, of directories scanned for API sources.
    pub sources: Vec<String>,
}

impl Default for BuildConfiguration {
    fn default() -> Self {
        Self {
            disable_default_filter: false,
            enable_search: false,
            excludes: SectionExcludes::default(),
            define_constants: Vec::new(),
            sources: default_sources(),
        }
    }
}

fn default_sources() -> Vec<String> {
    vec!["**/Editor".into(), "**/Runtime".into()]
}

impl BuildConfiguration {
    /// Full define-constant list: the generation marker followed by the configured tokens.
    pub fn all_define_constants(&self) -> Vec<&str> {
        std::iter::once(PACKAGE_DOCS_GENERATION_DEFINE)
            .chain(self.define_constants.iter().map(String::as_str))
            .collect()
    }
}

/// `excludes` section of the build configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct SectionExcludes {
    pub api_docs: bool,
    pub manual: bool,
    pub license: bool,
    pub changelog: bool,
}

// ---------------------------------------------------------------------------
// TemplateDescriptor
// ---------------------------------------------------------------------------

/// How a custom template combines with the site generator's default template.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TemplateKind {
    /// Replaces the default template entirely.
    #[serde(alias = "full", alias = "FULL")]
    Full,
    /// Layers custom assets on top of the default template.
    #[default]
    #[serde(alias = "partial", alias = "PARTIAL")]
    Partial,
}

/// Contents of a custom template's `template.json`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    #[serde(rename = "type", default)]
    pub kind: TemplateKind,
}

impl TemplateDescriptor {
    pub fn full() -> Self {
        Self {
            kind: TemplateKind::Full,
        }
    }

    pub fn partial() -> Self {
        Self {
            kind: TemplateKind::Partial,
        }
    }

    pub fn is_full(&self) -> bool {
        self.kind == TemplateKind::Full
    }
}

// ---------------------------------------------------------------------------
// SectionPresenceFlags
// ---------------------------------------------------------------------------

/// Which top-level sections staging actually produced.
///
/// Set as a side effect of staging, consumed when the top-level navigation is written.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SectionPresenceFlags {
    pub has_api_docs: bool,
    pub has_changelog: bool,
    pub has_license: bool,
    /// Manual home page, relative to the build root, when the manual was staged.
    pub manual_home: Option<String>,
}

impl SectionPresenceFlags {
    pub fn has_manual_home(&self) -> bool {
        self.manual_home.is_some()
    }
}
