//! Staging filesystem primitives.
//!
//! Thin wrappers over `std::fs` that check for existence first, map failures
//! to [`DokuError::Io`] with the offending path, and log every mutation at
//! verbose severity.

use std::path::Path;

use walkdir::WalkDir;

use doku_shared::{DokuError, Logger, Result};

/// Recursively delete a directory if it exists. Returns whether anything was deleted.
pub fn delete_dir(path: &Path, logger: &Logger) -> Result<bool> {
    if !path.is_dir() {
        return Ok(false);
    }
    std::fs::remove_dir_all(path).map_err(|e| DokuError::io(path, e))?;
    logger.verbose(format!("Deleted directory {}", path.display()));
    Ok(true)
}

/// Create a directory and all of its parents if missing.
pub fn create_dir(path: &Path, logger: &Logger) -> Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    std::fs::create_dir_all(path).map_err(|e| DokuError::io(path, e))?;
    logger.verbose(format!("Created directory {}", path.display()));
    Ok(())
}

/// Write a UTF-8 text file, creating its parent directory when needed.
pub fn write_text(path: &Path, text: &str, logger: &Logger) -> Result<()> {
    if let Some(parent) = path.parent() {
        create_dir(parent, logger)?;
    }
    std::fs::write(path, text).map_err(|e| DokuError::io(path, e))?;
    logger.verbose(format!("Written {}", path.display()));
    Ok(())
}

pub fn read_text(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| DokuError::io(path, e))
}

/// Read a text file, replacing invalid UTF-8 sequences with U+FFFD.
pub fn read_text_lossy(path: &Path) -> Result<String> {
    let bytes = std::fs::read(path).map_err(|e| DokuError::io(path, e))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Copy `src` to `dst` when `src` exists. Returns whether a copy happened.
pub fn try_copy_file(src: &Path, dst: &Path, logger: &Logger) -> Result<bool> {
    if !src.is_file() {
        return Ok(false);
    }
    if let Some(parent) = dst.parent() {
        create_dir(parent, logger)?;
    }
    std::fs::copy(src, dst).map_err(|e| DokuError::io(dst, e))?;
    logger.verbose(format!("Copied {} to {}", src.display(), dst.display()));
    Ok(true)
}

/// Move a file, replacing any existing destination. A missing `src` leaves
/// the destination alone. Returns whether a move happened.
pub fn move_file(src: &Path, dst: &Path, logger: &Logger) -> Result<bool> {
    if !src.is_file() {
        return Ok(false);
    }
    if dst.is_file() {
        std::fs::remove_file(dst).map_err(|e| DokuError::io(dst, e))?;
        logger.verbose(format!("Deleted file {}", dst.display()));
    }
    if let Some(parent) = dst.parent() {
        create_dir(parent, logger)?;
    }
    std::fs::rename(src, dst).map_err(|e| DokuError::io(src, e))?;
    logger.verbose(format!("Moved {} to {}", src.display(), dst.display()));
    Ok(true)
}

/// Recursively copy a directory tree.
///
/// With `extension` set, only files with that extension are copied (the
/// directory skeleton is still mirrored). A missing `src` copies nothing.
/// Returns the number of files copied.
pub fn copy_dir(src: &Path, dst: &Path, extension: Option<&str>, logger: &Logger) -> Result<usize> {
    if !src.is_dir() {
        return Ok(0);
    }

    create_dir(dst, logger)?;

    let mut count = 0;
    for entry in WalkDir::new(src).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|e| {
            let path = e.path().unwrap_or(src).to_path_buf();
            DokuError::io(path, e.into())
        })?;

        let relative = entry
            .path()
            .strip_prefix(src)
            .map_err(|_| DokuError::staging(format!("{} escapes {}", entry.path().display(), src.display())))?;
        let target = dst.join(relative);

        if entry.file_type().is_dir() {
            create_dir(&target, logger)?;
            continue;
        }

        if !matches_extension(entry.path(), extension) {
            continue;
        }

        if try_copy_file(entry.path(), &target, logger)? {
            count += 1;
        }
    }

    Ok(count)
}

/// Relative, forward-slash form of `path` under `root`.
pub fn relative_slash_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let parts: Vec<_> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    Some(parts.join("/"))
}

fn matches_extension(path: &Path, extension: Option<&str>) -> bool {
    match extension {
        None => true,
        Some(ext) => path
            .extension()
            .is_some_and(|e| e.to_string_lossy().eq_ignore_ascii_case(ext)),
    }
}
