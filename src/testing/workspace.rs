//! Scratch directories and shard readers.

use crate::compression::{FinishWrite, auto_detect_reader, auto_detect_writer};
use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary directory with a conventional `out/` subdirectory for shards.
/// Removed when dropped.
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create a fresh workspace.
    ///
    /// # Errors
    /// Returns an error if the temporary directory cannot be created.
    pub fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir().context("create temp workspace")?,
        })
    }

    /// Root of the workspace.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Directory for shard output. Not created; the splitter creates it.
    #[must_use]
    pub fn out_dir(&self) -> PathBuf {
        self.dir.path().join("out")
    }

    /// Write a delimited source file named `name` and return its path.
    ///
    /// The extension of `name` selects compression, as for shards.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_source<H: AsRef<str>, F: AsRef<str>>(
        &self,
        name: &str,
        delimiter: u8,
        header: Option<&[H]>,
        rows: &[Vec<F>],
    ) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        write_delimited(&path, delimiter, header, rows)?;
        Ok(path)
    }

    /// Write raw bytes to `name` and return its path.
    ///
    /// # Errors
    /// Returns an error if the file cannot be written.
    pub fn write_raw(&self, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.dir.path().join(name);
        std::fs::write(&path, bytes).with_context(|| format!("write {}", path.display()))?;
        Ok(path)
    }

    /// Sorted file names in [`out_dir`](Self::out_dir).
    ///
    /// # Errors
    /// Returns an error if the directory cannot be listed.
    pub fn out_files(&self) -> Result<Vec<String>> {
        let dir = self.out_dir();
        let mut names = Vec::new();
        for entry in std::fs::read_dir(&dir).with_context(|| format!("list {}", dir.display()))? {
            names.push(entry?.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }
}

/// Write records to `path` with the given delimiter, compressing by extension.
///
/// # Errors
/// Returns an error if the file cannot be created or written.
pub fn write_delimited<H: AsRef<str>, F: AsRef<str>>(
    path: &Path,
    delimiter: u8,
    header: Option<&[H]>,
    rows: &[Vec<F>],
) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let sink = auto_detect_writer(file, path)?;
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_writer(sink);
    if let Some(header) = header {
        wtr.write_record(header.iter().map(AsRef::<str>::as_ref))?;
    }
    for (i, row) in rows.iter().enumerate() {
        wtr.write_record(row.iter().map(AsRef::<str>::as_ref))
            .with_context(|| format!("write row #{}", i + 1))?;
    }
    let mut sink = wtr.into_inner().map_err(|e| e.into_error())?;
    sink.flush()?;
    sink.finish()?;
    Ok(())
}

/// Read every record of a shard (header included), decompressing by
/// extension or magic bytes.
///
/// # Errors
/// Returns an error if the file cannot be read or parsed.
pub fn read_shard(path: &Path, delimiter: u8) -> Result<Vec<Vec<String>>> {
    let f = File::open(path).with_context(|| format!("open {}", path.display()))?;
    let rdr = auto_detect_reader(f, path)?;
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(rdr);
    let mut out = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        let rec = rec.with_context(|| format!("parse {} record #{}", path.display(), i + 1))?;
        out.push(rec.iter().map(str::to_string).collect());
    }
    Ok(out)
}

/// Concatenate the data rows of `shards`, dropping the first record of each
/// when `has_header`.
///
/// # Errors
/// See [`read_shard`].
pub fn read_data_rows(
    shards: &[PathBuf],
    delimiter: u8,
    has_header: bool,
) -> Result<Vec<Vec<String>>> {
    let mut out = Vec::new();
    for shard in shards {
        let rows = read_shard(shard, delimiter)?;
        out.extend(rows.into_iter().skip(usize::from(has_header)));
    }
    Ok(out)
}
