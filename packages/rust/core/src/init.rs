//! `doku init`: seeds a package with a documentation directory.

use std::path::{Path, PathBuf};

use tracing::instrument;

use doku_shared::{
    BUILD_CONFIG_FILE, BuildConfiguration, DOCUMENTATION_DIR, DokuError, Logger, Result,
    load_package_descriptor,
};

use crate::fsops;

/// What [`initialize_documentation`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InitOutcome {
    /// Files were written into this documentation directory.
    Created(PathBuf),
    /// The directory already existed and `force` was not set.
    Skipped(PathBuf),
}

/// Create `Documentation~/config.json` with the default configuration and
/// an `index.md` stub. An existing directory is left alone unless `force`
/// is set, in which case both files are overwritten.
#[instrument(skip(logger))]
pub fn initialize_documentation(package_root: &Path, force: bool, logger: &Logger) -> Result<InitOutcome> {
    let package_root = std::path::absolute(package_root).map_err(|e| DokuError::io(package_root, e))?;
    let package = load_package_descriptor(&package_root)?;
    logger.info(format!("Initializing documentation for package {package}"));

    let docs = package_root.join(DOCUMENTATION_DIR);
    if docs.exists() && !force {
        logger.warning(format!(
            "Directory {} exists; use --force to overwrite it.",
            docs.display()
        ));
        return Ok(InitOutcome::Skipped(docs));
    }

    fsops::create_dir(&docs, logger)?;

    let config_path = docs.join(BUILD_CONFIG_FILE);
    let mut config = serde_json::to_string_pretty(&BuildConfiguration::default())
        .map_err(|e| DokuError::json(&config_path, e))?;
    config.push('\n');
    fsops::write_text(&config_path, &config, logger)?;

    let index = format!(
        "# {name} {version}\n\nThis is the documentation for the package {name}.\n",
        name = package.display_name,
        version = package.version,
    );
    fsops::write_text(&docs.join("index.md"), &index, logger)?;

    Ok(InitOutcome::Created(docs))
}

#[cfg(test)]
mod tests {
    use super::*;
    use doku_shared::{LogLevel, PACKAGE_MANIFEST_FILE, load_build_configuration};
    use tempfile::TempDir;

    fn package_dir() -> TempDir {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(PACKAGE_MANIFEST_FILE),
            r#"{"displayName": "Example Tools", "version": "0.4.0"}"#,
        )
        .unwrap();
        tmp
    }

    #[test]
    fn creates_config_and_index() {
        let tmp = package_dir();
        let logger = Logger::new(LogLevel::Info);

        let outcome = initialize_documentation(tmp.path(), false, &logger).unwrap();
        let docs = tmp.path().join(DOCUMENTATION_DIR);
        assert_eq!(outcome, InitOutcome::Created(docs.clone()));

        let config = load_build_configuration(&docs.join(BUILD_CONFIG_FILE)).unwrap();
        assert_eq!(config, BuildConfiguration::default());

        let index = std::fs::read_to_string(docs.join("index.md")).unwrap();
        assert!(index.starts_with("# Example Tools 0.4.0\n"));
    }

    #[test]
    fn existing_directory_needs_force() {
        let tmp = package_dir();
        let docs = tmp.path().join(DOCUMENTATION_DIR);
        std::fs::create_dir_all(&docs).unwrap();
        std::fs::write(docs.join("index.md"), "mine").unwrap();
        std::fs::write(docs.join("extra.md"), "keep").unwrap();

        let logger = Logger::new(LogLevel::Info);
        let outcome = initialize_documentation(tmp.path(), false, &logger).unwrap();
        assert_eq!(outcome, InitOutcome::Skipped(docs.clone()));
        assert_eq!(std::fs::read_to_string(docs.join("index.md")).unwrap(), "mine");

        initialize_documentation(tmp.path(), true, &logger).unwrap();
        assert_ne!(std::fs::read_to_string(docs.join("index.md")).unwrap(), "mine");
        assert!(docs.join("extra.md").is_file());
    }

    #[test]
    fn requires_a_manifest() {
        let tmp = TempDir::new().unwrap();
        let err = initialize_documentation(tmp.path(), false, &Logger::new(LogLevel::Info)).unwrap_err();
        assert!(matches!(err, DokuError::Config { .. }));
    }
}
