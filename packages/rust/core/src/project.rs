//! The DocFX project assembled in the build root.
//!
//! Holds the bundled base project files and renders the generated
//! configuration: the C# project for API extraction, `globalMetadata.json`,
//! `docfx.json` and the top-level `toc.yml`.

use std::path::Path;

use serde::Serialize;
use serde_json::json;
use tracing::instrument;
use walkdir::WalkDir;

use doku_shared::{
    BuildConfiguration, DokuError, Logger, PackageDescriptor, Result, SectionPresenceFlags,
    TemplateDescriptor,
};

use crate::context::{BuildContext, SITE_DIR, SOURCES_DIR};
use crate::docfx::PROJECT_FILE;
use crate::fsops;

/// Build-root directory a custom template is copied into.
pub const TEMPLATE_DIR: &str = "templates/custom";

/// Generated C# project name inside [`SOURCES_DIR`].
pub const CSHARP_PROJECT_FILE: &str = "doku.csproj";

pub const GLOBAL_METADATA_FILE: &str = "globalMetadata.json";

pub const TOC_FILE: &str = "toc.yml";

/// Files every build starts from, relative to the build root.
const BASE_PROJECT: &[(&str, &str)] = &[
    ("api/index.md", include_str!("../templates/project/api/index.md")),
    ("filter.yml", include_str!("../templates/project/filter.yml")),
    ("index.md", include_str!("../templates/project/index.md")),
];

/// Write the bundled base project into the build root.
pub fn extract_base_project(build_root: &Path, logger: &Logger) -> Result<()> {
    logger.info("Extracting the DocFX base project");
    for (relative, content) in BASE_PROJECT {
        fsops::write_text(&build_root.join(relative), content, logger)?;
    }
    Ok(())
}

/// Everything the generated configuration depends on.
#[derive(Debug, Clone, Copy)]
pub struct SiteInputs<'a> {
    pub package: &'a PackageDescriptor,
    pub config: &'a BuildConfiguration,
    pub template: Option<TemplateDescriptor>,
    pub sections: &'a SectionPresenceFlags,
}

/// Render and write every generated configuration file.
#[instrument(skip_all, fields(build_root = %ctx.build_root.display()))]
pub fn write_site_config(ctx: &BuildContext, inputs: &SiteInputs<'_>, logger: &Logger) -> Result<()> {
    logger.info("Creating the C# project");
    let sources = staged_sources(&ctx.sources_root)?;
    fsops::write_text(
        &ctx.sources_root.join(CSHARP_PROJECT_FILE),
        &csharp_project(inputs.config, &sources),
        logger,
    )?;

    logger.info(format!("Creating the {GLOBAL_METADATA_FILE} file"));
    write_json(
        &ctx.build_root.join(GLOBAL_METADATA_FILE),
        &GlobalMetadata::new(inputs.package, inputs.config),
        logger,
    )?;

    logger.info(format!("Creating the {PROJECT_FILE} file"));
    write_json(
        &ctx.build_root.join(PROJECT_FILE),
        &docfx_project(inputs.config, inputs.template),
        logger,
    )?;

    logger.info("Creating the main table of contents");
    fsops::write_text(&ctx.build_root.join(TOC_FILE), &main_toc(inputs.sections), logger)
}

/// Staged `.cs` files relative to the sources root, sorted, `/`-separated.
fn staged_sources(sources_root: &Path) -> Result<Vec<String>> {
    if !sources_root.is_dir() {
        return Ok(Vec::new());
    }

    let mut sources = Vec::new();
    for entry in WalkDir::new(sources_root).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(sources_root).to_path_buf();
            DokuError::io(path, e.into())
        })?;
        let is_cs = entry
            .path()
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("cs"));
        if entry.file_type().is_file() && is_cs {
            if let Some(relative) = fsops::relative_slash_path(sources_root, entry.path()) {
                sources.push(relative);
            }
        }
    }
    Ok(sources)
}

/// MSBuild project listing the staged sources and the define constants.
pub fn csharp_project(config: &BuildConfiguration, sources: &[String]) -> String {
    let mut compile_items = String::new();
    for source in sources {
        compile_items.push_str(&format!(
            "    <Compile Include=\"{}\"/>\n",
            xml_escape(source)
        ));
    }

    format!(
        "<Project ToolsVersion=\"4.0\" DefaultTargets=\"FullPublish\" xmlns=\"http://schemas.microsoft.com/developer/msbuild/2003\">\n\
         \x20 <PropertyGroup>\n\
         \x20   <DefineConstants>{defines}</DefineConstants>\n\
         \x20   <TargetFrameworkVersion>v4.7.1</TargetFrameworkVersion>\n\
         \x20 </PropertyGroup>\n\
         \x20 <ItemGroup>\n\
         {compile_items}\
         \x20 </ItemGroup>\n\
         \x20 <Import Project=\"$(MSBuildToolsPath)\\Microsoft.CSharp.targets\" />\n\
         </Project>\n",
        defines = xml_escape(&config.all_define_constants().join(";")),
    )
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// `globalMetadata.json` contents.
#[derive(Debug, Serialize)]
pub struct GlobalMetadata<'a> {
    #[serde(rename = "_appTitle")]
    pub app_title: &'a str,
    #[serde(rename = "_packageVersion")]
    pub package_version: &'a str,
    #[serde(rename = "_enableSearch")]
    pub enable_search: bool,
}

impl<'a> GlobalMetadata<'a> {
    pub fn new(package: &'a PackageDescriptor, config: &BuildConfiguration) -> Self {
        Self {
            app_title: &package.display_name,
            package_version: &package.version,
            enable_search: config.enable_search,
        }
    }
}

/// Template stack for `docfx.json`: the default template, the custom one, or both.
pub fn template_list(template: Option<TemplateDescriptor>) -> Vec<&'static str> {
    match template {
        None => vec!["default"],
        Some(t) if t.is_full() => vec![TEMPLATE_DIR],
        Some(_) => vec!["default", TEMPLATE_DIR],
    }
}

/// `docfx.json` contents.
pub fn docfx_project(
    config: &BuildConfiguration,
    template: Option<TemplateDescriptor>,
) -> serde_json::Value {
    json!({
        "metadata": [{
            "src": [{
                "src": SOURCES_DIR,
                "files": [CSHARP_PROJECT_FILE],
            }],
            "dest": "api",
            "filter": "filter.yml",
            "disableDefaultFilter": config.disable_default_filter,
        }],
        "build": {
            "content": [
                { "files": ["api/**.yml", "api/index.md"] },
                { "files": ["manual/**.md", "manual/**/toc.yml"] },
                { "files": ["changelog/*.md", "changelog/toc.yml"] },
                { "files": ["license/*.md", "license/toc.yml"] },
                { "files": ["index.md", TOC_FILE] },
            ],
            "resource": [
                { "files": ["logo.svg", "favicon.ico"] },
                { "files": ["manual/**"], "exclude": ["manual/**.md", "manual/**/toc.yml"] },
            ],
            "overwrite": [{ "files": ["apidoc/**.md"] }],
            "globalMetadataFiles": [GLOBAL_METADATA_FILE],
            "fileMetadataFiles": ["projectMetadata.yml"],
            "template": template_list(template),
            "dest": SITE_DIR,
        },
    })
}

/// Top-level navigation: Manual, API Documentation, Changes, License.
pub fn main_toc(sections: &SectionPresenceFlags) -> String {
    let mut toc = String::new();
    if let Some(home) = &sections.manual_home {
        toc.push_str(&format!("- name: Manual\n  href: manual/\n  homepage: {home}\n"));
    }
    if sections.has_api_docs {
        toc.push_str("- name: API Documentation\n  href: api/\n  homepage: api/index.md\n");
    }
    if sections.has_changelog {
        toc.push_str("- name: Changes\n  href: changelog/\n");
    }
    if sections.has_license {
        toc.push_str("- name: License\n  href: license/\n");
    }
    toc
}

fn write_json<T: Serialize>(path: &Path, value: &T, logger: &Logger) -> Result<()> {
    let mut json = serde_json::to_string_pretty(value).map_err(|e| DokuError::json(path, e))?;
    json.push('\n');
    fsops::write_text(path, &json, logger)
}
