//! Upload manifest for a finished split.
//!
//! A manifest lists every shard of one split with its row count, size, and
//! SHA-256 digest. It is the hand-off to whatever stages the shards into the
//! warehouse: that step uploads exactly the files named here and can check
//! them with [`Manifest::verify`] first.
//!
//! The manifest is written as `<template stem>.manifest.json` in the output
//! directory, after the last shard has been finalized.

use crate::config::SplitConfig;
use crate::error::{Result, SplitError};
use crate::splitter::SplitReport;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// One shard entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub index: u64,
    /// File name relative to the manifest's directory.
    pub file: String,
    pub rows: u64,
    pub bytes: u64,
    pub sha256: String,
}

/// Description of every shard produced by one split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub source: Option<PathBuf>,
    pub template: String,
    pub delimiter: String,
    pub row_limit: u64,
    pub header: Option<Vec<String>>,
    pub total_rows: u64,
    pub shards: Vec<ManifestEntry>,
}

/// A shard that no longer matches its manifest entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestMismatch {
    Missing { file: String },
    Digest { file: String, expected: String, actual: String },
}

impl Manifest {
    /// Hash the shards listed in `report`.
    ///
    /// # Errors
    /// [`SplitError::Io`] if a shard cannot be read back.
    pub fn build(report: &SplitReport, config: &SplitConfig) -> Result<Self> {
        let mut shards = Vec::with_capacity(report.shards.len());
        for shard in &report.shards {
            let (sha256, bytes) = sha256_file(&shard.path)?;
            shards.push(ManifestEntry {
                index: shard.index,
                file: config.template.render(shard.index),
                rows: shard.rows,
                bytes,
                sha256,
            });
        }
        Ok(Self {
            source: report.source.clone(),
            template: config.template.to_string(),
            delimiter: (config.delimiter as char).to_string(),
            row_limit: config.row_limit,
            header: report.header.clone(),
            total_rows: report.total_rows,
            shards,
        })
    }

    /// Where [`split`](crate::split) writes the manifest for `config`.
    #[must_use]
    pub fn path_for(config: &SplitConfig) -> PathBuf {
        config.output_path.join(Self::file_name(config))
    }

    /// File name of the manifest for `config`, without the directory.
    #[must_use]
    pub fn file_name(config: &SplitConfig) -> String {
        format!("{}.manifest.json", config.template.stem())
    }

    /// Write as pretty-printed JSON.
    ///
    /// # Errors
    /// [`SplitError::Io`] on create/write failure.
    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let f = File::create(path).map_err(|e| SplitError::io("create", path, e))?;
        let mut w = BufWriter::new(f);
        serde_json::to_writer_pretty(&mut w, self)
            .map_err(|e| SplitError::io("write", path, e.into()))?;
        w.write_all(b"\n")
            .and_then(|()| w.flush())
            .map_err(|e| SplitError::io("write", path, e))?;
        Ok(())
    }

    /// Read a manifest back.
    ///
    /// # Errors
    /// [`SplitError::NotFound`]/[`SplitError::Io`] if unreadable,
    /// [`SplitError::MalformedInput`] if the JSON does not parse.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| SplitError::open(path, e))?;
        serde_json::from_reader(BufReader::new(f)).map_err(|e| SplitError::MalformedInput {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Re-hash every shard under `dir` and list the ones that changed.
    ///
    /// # Errors
    /// [`SplitError::Io`] on read failures other than a missing shard.
    pub fn verify(&self, dir: impl AsRef<Path>) -> Result<Vec<ManifestMismatch>> {
        let dir = dir.as_ref();
        let mut mismatches = Vec::new();
        for entry in &self.shards {
            let path = dir.join(&entry.file);
            match sha256_file(&path) {
                Ok((actual, _)) if actual == entry.sha256 => {}
                Ok((actual, _)) => mismatches.push(ManifestMismatch::Digest {
                    file: entry.file.clone(),
                    expected: entry.sha256.clone(),
                    actual,
                }),
                Err(SplitError::NotFound { .. }) => mismatches.push(ManifestMismatch::Missing {
                    file: entry.file.clone(),
                }),
                Err(e) => return Err(e),
            }
        }
        Ok(mismatches)
    }
}

/// Stream `path` through SHA-256; returns the lowercase hex digest and byte count.
///
/// # Errors
/// [`SplitError::NotFound`]/[`SplitError::Io`] if the file cannot be read.
pub fn sha256_file(path: impl AsRef<Path>) -> Result<(String, u64)> {
    let path = path.as_ref();
    let f = File::open(path).map_err(|e| SplitError::open(path, e))?;
    let mut reader = BufReader::new(f);
    let mut hasher = Sha256::new();
    let mut buf = [0u8; 64 * 1024];
    let mut total = 0u64;
    loop {
        let n = reader
            .read(&mut buf)
            .map_err(|e| SplitError::io("read", path, e))?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
        total += n as u64;
    }
    let hex = hasher
        .finalize()
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect();
    Ok((hex, total))
}
