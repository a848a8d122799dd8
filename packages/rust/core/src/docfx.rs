//! DocFX site generator: discovery, version check and build invocation.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use regex::Regex;
use tracing::instrument;

use doku_shared::{DokuError, Logger, Result};

use crate::supervisor::{self, ToolInvocation};

#[cfg(windows)]
pub const EXECUTABLE_NAME: &str = "docfx.exe";
#[cfg(not(windows))]
pub const EXECUTABLE_NAME: &str = "docfx";

/// Oldest DocFX release whose output layout doku understands.
pub const MINIMUM_VERSION: DocFxVersion = DocFxVersion::new(2, 5, 0);

/// Generated project file passed to `docfx`.
pub const PROJECT_FILE: &str = "docfx.json";

const LOG_LEVEL_FLAG: &str = "--logLevel";

/// A `major.minor.patch` DocFX version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct DocFxVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl DocFxVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// First `x.y.z` triple found anywhere in `text`.
    pub fn parse(text: &str) -> Option<Self> {
        static VERSION_RE: LazyLock<Regex> =
            LazyLock::new(|| Regex::new(r"(\d+)\.(\d+)\.(\d+)").expect("valid regex"));

        let caps = VERSION_RE.captures(text)?;
        let part = |i: usize| caps.get(i)?.as_str().parse::<u64>().ok();
        Some(Self::new(part(1)?, part(2)?, part(3)?))
    }
}

impl fmt::Display for DocFxVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A located DocFX executable.
#[derive(Debug, Clone)]
pub struct DocFx {
    path: PathBuf,
}

impl DocFx {
    /// Resolve the executable from an explicit file or installation
    /// directory, else from the first `PATH` entry that contains it.
    pub fn locate(explicit: Option<&Path>) -> Result<Self> {
        // Tools run from other working directories, so a relative path would
        // stop resolving once launched.
        let explicit = explicit
            .map(|path| std::path::absolute(path).map_err(|e| DokuError::io(path, e)))
            .transpose()?;
        let path = match explicit {
            Some(path) if path.is_dir() => path.join(EXECUTABLE_NAME),
            Some(path) => path,
            None => find_in_path().ok_or_else(|| {
                DokuError::tool(format!("Could not find {EXECUTABLE_NAME} in the system path."))
            })?,
        };

        if !path.is_file() {
            return Err(DokuError::tool(format!(
                "{} is not a valid DocFX installation.",
                path.display()
            )));
        }

        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ask the executable for its version.
    pub fn version(&self, logger: &Logger) -> Result<DocFxVersion> {
        let working_dir = self.path.parent().unwrap_or(Path::new("."));
        let invocation = self.invocation(working_dir).arg("--version").capture();
        let output = supervisor::run(&invocation, logger)?.unwrap_or_default();

        DocFxVersion::parse(&output).ok_or_else(|| {
            DokuError::tool(format!(
                "could not determine the version of {}",
                self.path.display()
            ))
        })
    }

    /// Version check against [`MINIMUM_VERSION`].
    pub fn ensure_supported(&self, logger: &Logger) -> Result<DocFxVersion> {
        let version = self.version(logger)?;
        if version < MINIMUM_VERSION {
            return Err(DokuError::tool(format!(
                "doku requires DocFX {MINIMUM_VERSION} or greater, got {version}"
            )));
        }
        Ok(version)
    }

    /// Build the site described by `<build_root>/docfx.json`.
    #[instrument(skip_all, fields(build_root = %build_root.display()))]
    pub fn build(&self, build_root: &Path, logger: &Logger) -> Result<()> {
        let project = build_root.join(PROJECT_FILE);
        let invocation = self
            .invocation(build_root)
            .arg(project.to_string_lossy().into_owned());
        supervisor::run(&invocation, logger)?;
        Ok(())
    }

    fn invocation(&self, working_dir: &Path) -> ToolInvocation {
        ToolInvocation::new(&self.path, working_dir).verbosity_flag(LOG_LEVEL_FLAG)
    }
}

fn find_in_path() -> Option<PathBuf> {
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .filter(|dir| !dir.as_os_str().is_empty())
        .map(|dir| dir.join(EXECUTABLE_NAME))
        .find(|candidate| candidate.is_file())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn parses_first_version_triple() {
        assert_eq!(
            DocFxVersion::parse("docfx 2.59.4+ab12cd\n"),
            Some(DocFxVersion::new(2, 59, 4))
        );
        assert_eq!(
            DocFxVersion::parse("[Info]: version\n2.70.0.0"),
            Some(DocFxVersion::new(2, 70, 0))
        );
        assert_eq!(DocFxVersion::parse("no digits here"), None);
    }

    #[test]
    fn versions_order_numerically() {
        assert!(DocFxVersion::new(2, 10, 0) > MINIMUM_VERSION);
        assert!(DocFxVersion::new(2, 4, 99) < MINIMUM_VERSION);
        assert_eq!(MINIMUM_VERSION.to_string(), "2.5.0");
    }

    #[test]
    fn locate_accepts_installation_directory() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(EXECUTABLE_NAME), "").unwrap();

        let docfx = DocFx::locate(Some(tmp.path())).unwrap();
        assert_eq!(docfx.path(), tmp.path().join(EXECUTABLE_NAME));
    }

    #[test]
    fn locate_resolves_relative_paths_against_current_dir() {
        // Test binaries run from the crate root.
        let docfx = DocFx::locate(Some(Path::new("Cargo.toml"))).unwrap();
        assert!(docfx.path().is_absolute());
        assert_eq!(
            docfx.path(),
            std::env::current_dir().unwrap().join("Cargo.toml")
        );
    }

    #[test]
    fn locate_rejects_missing_executable() {
        let tmp = TempDir::new().unwrap();
        let err = DocFx::locate(Some(tmp.path())).unwrap_err();
        assert!(matches!(err, DokuError::Tool { .. }));
        assert!(err.to_string().contains("not a valid DocFX installation"));
    }

    #[cfg(unix)]
    #[test]
    fn old_versions_are_rejected() {
        use doku_shared::LogLevel;
        use std::os::unix::fs::PermissionsExt;

        let tmp = TempDir::new().unwrap();
        let exe = tmp.path().join(EXECUTABLE_NAME);
        std::fs::write(&exe, "#!/bin/sh\necho 'docfx 2.4.1'\n").unwrap();
        std::fs::set_permissions(&exe, std::fs::Permissions::from_mode(0o755)).unwrap();

        let docfx = DocFx::locate(Some(&exe)).unwrap();
        let logger = Logger::new(LogLevel::Info);
        assert_eq!(docfx.version(&logger).unwrap(), DocFxVersion::new(2, 4, 1));

        let err = docfx.ensure_supported(&logger).unwrap_err();
        assert!(err.to_string().contains("2.5.0 or greater, got 2.4.1"));
    }
}
