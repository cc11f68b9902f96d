//! Staleness decisions for every cached artifact.
//!
//! One rule covers layout triads, component triads, sidecar copies and
//! hoisted assets:
//!
//! ```text
//! stale = force || dest missing || max(sources) > dest
//! ```

use super::BuildError;
use std::{fs, path::Path, time::SystemTime};

/// Decide whether a destination must be regenerated.
pub fn is_stale(sources: &[SystemTime], dest: Option<SystemTime>, force: bool) -> bool {
    if force {
        return true;
    }
    let Some(dest) = dest else {
        return true;
    };
    sources.iter().max().is_some_and(|newest| *newest > dest)
}

/// Modification time, `None` when the file is absent or unreadable.
pub fn mtime(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|meta| meta.modified()).ok()
}

/// Modification times of the files that exist among `paths`.
pub fn mtimes<'a>(paths: impl IntoIterator<Item = &'a Path>) -> Vec<SystemTime> {
    paths.into_iter().filter_map(mtime).collect()
}

pub fn ensure_dir(dir: &Path) -> Result<(), BuildError> {
    fs::create_dir_all(dir).map_err(|source| BuildError::CreateDir {
        path: dir.to_path_buf(),
        source,
    })
}

/// Copy `src` to `dst` when `dst` is stale.
///
/// A missing `src` is not an error: sidecars are optional. Under `force` the
/// destination is removed first so the copy always lands. Returns whether a
/// copy happened.
pub fn sync_file(src: &Path, dst: &Path, force: bool) -> Result<bool, BuildError> {
    let Some(src_time) = mtime(src) else {
        return Ok(false);
    };
    if !is_stale(&[src_time], mtime(dst), force) {
        return Ok(false);
    }

    if let Some(parent) = dst.parent() {
        ensure_dir(parent)?;
    }
    if force && dst.is_file() {
        fs::remove_file(dst).map_err(|err| BuildError::io(dst, err))?;
    }
    fs::copy(src, dst).map_err(|err| BuildError::io(dst, err))?;
    Ok(true)
}

/// Write `contents` unless `path` already holds exactly these bytes.
///
/// Returns whether the file was written.
pub fn write_if_changed(path: &Path, contents: &str) -> Result<bool, BuildError> {
    if fs::read(path).is_ok_and(|existing| existing == contents.as_bytes()) {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents).map_err(|err| BuildError::io(path, err))?;
    Ok(true)
}
