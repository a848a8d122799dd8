//! Resolved filesystem layout of one build run.

use std::path::{Path, PathBuf};

use uuid::Uuid;

use doku_shared::{DOCUMENTATION_DIR, DokuError, Result};

/// Build-root subdirectory receiving the manual tree.
pub const MANUAL_DIR: &str = "manual";

/// Build-root subdirectory receiving API sources.
pub const SOURCES_DIR: &str = "src";

/// Build-root subdirectory the site generator renders into.
pub const SITE_DIR: &str = "_site";

/// Paths for a single pipeline run. Computed once, never reused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildContext {
    pub package_root: PathBuf,
    pub output_root: PathBuf,
    pub build_root: PathBuf,
    /// `<build>/manual`
    pub manual_root: PathBuf,
    /// `<build>/src`
    pub sources_root: PathBuf,
    /// `<package>/Documentation~`
    pub documentation_root: PathBuf,
}

impl BuildContext {
    /// Resolve every path to an absolute one. Without an explicit build
    /// root a fresh `doku-<uuid>` directory under the system temp dir is used.
    pub fn new(package_root: &Path, output_root: &Path, build_root: Option<&Path>) -> Result<Self> {
        let package_root = absolute(package_root)?;
        let output_root = absolute(output_root)?;
        let build_root = match build_root {
            Some(path) => absolute(path)?,
            None => std::env::temp_dir().join(format!("doku-{}", Uuid::now_v7())),
        };

        // Both directories are deleted wholesale, so neither may hold the package.
        for (label, dir) in [("build", &build_root), ("output", &output_root)] {
            if package_root.starts_with(dir) {
                return Err(DokuError::config(format!(
                    "The {label} directory {} must not contain the package {}",
                    dir.display(),
                    package_root.display()
                )));
            }
        }
        // Cleanup removes the build root after promotion, and promotion
        // removes the output root before copying out of the build root.
        if output_root.starts_with(&build_root) || build_root.starts_with(&output_root) {
            return Err(DokuError::config(format!(
                "The build directory {} and the output directory {} must not overlap",
                build_root.display(),
                output_root.display()
            )));
        }

        Ok(Self {
            manual_root: build_root.join(MANUAL_DIR),
            sources_root: build_root.join(SOURCES_DIR),
            documentation_root: package_root.join(DOCUMENTATION_DIR),
            package_root,
            output_root,
            build_root,
        })
    }

    /// Where the site generator leaves the rendered site.
    pub fn site_root(&self) -> PathBuf {
        self.build_root.join(SITE_DIR)
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    std::path::absolute(path).map_err(|e| DokuError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temporary_build_roots_are_unique() {
        let a = BuildContext::new(Path::new("/pkg"), Path::new("/out"), None).unwrap();
        let b = BuildContext::new(Path::new("/pkg"), Path::new("/out"), None).unwrap();

        assert_ne!(a.build_root, b.build_root);
        assert!(a.build_root.starts_with(std::env::temp_dir()));
        assert_eq!(a.manual_root, a.build_root.join("manual"));
        assert_eq!(a.documentation_root, Path::new("/pkg/Documentation~"));
    }

    #[test]
    fn explicit_build_root_is_kept() {
        let ctx = BuildContext::new(Path::new("/pkg"), Path::new("/out"), Some(Path::new("/tmp/b")))
            .unwrap();
        assert_eq!(ctx.build_root, Path::new("/tmp/b"));
        assert_eq!(ctx.sources_root, Path::new("/tmp/b/src"));
        assert_eq!(ctx.site_root(), Path::new("/tmp/b/_site"));
    }

    #[test]
    fn directories_enclosing_the_package_are_rejected() {
        let err = BuildContext::new(Path::new("/work/pkg"), Path::new("/work"), None).unwrap_err();
        assert!(matches!(err, DokuError::Config { .. }));

        let err = BuildContext::new(
            Path::new("/work/pkg"),
            Path::new("/out"),
            Some(Path::new("/work/pkg")),
        )
        .unwrap_err();
        assert!(err.to_string().contains("build directory"));

        assert!(BuildContext::new(Path::new("/p"), Path::new("/x"), Some(Path::new("/x"))).is_err());
    }

    #[test]
    fn output_inside_build_root_is_rejected() {
        let err = BuildContext::new(
            Path::new("/pkg"),
            Path::new("/work/b/site"),
            Some(Path::new("/work/b")),
        )
        .unwrap_err();
        assert!(matches!(err, DokuError::Config { .. }));
        assert!(err.to_string().contains("must not overlap"));
    }

    #[test]
    fn build_root_inside_output_is_rejected() {
        let err = BuildContext::new(
            Path::new("/pkg"),
            Path::new("/work/out"),
            Some(Path::new("/work/out/build")),
        )
        .unwrap_err();
        assert!(matches!(err, DokuError::Config { .. }));
    }

    #[test]
    fn sibling_directories_with_shared_prefix_are_accepted() {
        let ctx = BuildContext::new(
            Path::new("/pkg"),
            Path::new("/work/site"),
            Some(Path::new("/work/site-build")),
        )
        .unwrap();
        assert_eq!(ctx.output_root, Path::new("/work/site"));
    }
}
