//! Source file discovery.
//!
//! Turns command-line source arguments into a concrete, ordered list of files.
//! Each argument may be a plain path or a glob pattern such as
//! `tpch/sf10/*.tbl.gz`.
//!
//! ```no_run
//! use csvshard::sources::expand_sources;
//!
//! let files = expand_sources(&["data/lineitem.csv", "data/orders_*.csv.gz"])?;
//! # Ok::<(), csvshard::SplitError>(())
//! ```

use crate::error::{Result, SplitError};
use glob::glob;
use std::collections::HashSet;
use std::path::{Path, PathBuf};

/// Expand one glob pattern into its matching files, sorted lexicographically.
///
/// Directories are skipped. An empty result is not an error here.
///
/// # Errors
/// [`SplitError::InvalidArgument`] on an invalid pattern,
/// [`SplitError::Io`] if a matched entry cannot be read.
pub fn expand_glob(pattern: &str) -> Result<Vec<PathBuf>> {
    let paths = glob(pattern)
        .map_err(|e| SplitError::invalid(format!("invalid glob pattern {pattern:?}: {e}")))?;

    let mut result = Vec::new();
    for entry in paths {
        let path = entry.map_err(|e| {
            let path = e.path().to_path_buf();
            SplitError::io("read glob entry", &path, e.into_error())
        })?;
        if path.is_file() {
            result.push(path);
        }
    }
    result.sort();
    Ok(result)
}

/// Expand every argument, keeping argument order and dropping duplicates.
///
/// A literal path to an existing file is taken as-is, even if it contains
/// glob metacharacters.
///
/// # Errors
/// [`SplitError::NotFound`] if an argument matches nothing; otherwise as
/// [`expand_glob`].
pub fn expand_sources<S: AsRef<str>>(patterns: &[S]) -> Result<Vec<PathBuf>> {
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for pattern in patterns {
        let pattern = pattern.as_ref();
        let literal = Path::new(pattern);
        let matches = if literal.is_file() {
            vec![literal.to_path_buf()]
        } else {
            expand_glob(pattern)?
        };
        if matches.is_empty() {
            return Err(SplitError::NotFound {
                path: literal.to_path_buf(),
            });
        }
        for path in matches {
            if seen.insert(path.clone()) {
                out.push(path);
            }
        }
    }
    Ok(out)
}
