//! Shared types, error model, logging handle, and configuration for doku.
//!
//! This crate is the foundation depended on by the other doku crates.
//! It provides:
//! - [`DokuError`], the unified error type
//! - Domain types ([`PackageDescriptor`], [`BuildConfiguration`], [`TemplateDescriptor`])
//! - The explicit [`Logger`] handle
//! - Configuration ([`ToolConfig`], package file loading)

pub mod config;
pub mod error;
pub mod log;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    BUILD_CONFIG_FILE, DOCUMENTATION_DIR, DefaultsConfig, PACKAGE_MANIFEST_FILE,
    TEMPLATE_DESCRIPTOR_FILE, ToolConfig, config_dir, config_file_path, init_config,
    load_build_configuration, load_config, load_config_from, load_package_descriptor,
    load_template_descriptor,
};
pub use error::{DokuError, Result};
pub use log::{BuildOutcome, LogLevel, LogRecord, LogSummary, Logger, Severity, is_github_actions};
pub use types::{
    BuildConfiguration, PACKAGE_DOCS_GENERATION_DEFINE, PackageDescriptor, SectionExcludes,
    SectionPresenceFlags, TemplateDescriptor, TemplateKind,
};
