//! Split configuration.
//!
//! [`SplitConfig`] is a plain value handed to [`split`](crate::split); there is
//! no process-wide state. It can be built fluently or loaded from JSON:
//!
//! ```no_run
//! use csvshard::SplitConfig;
//! # fn main() -> csvshard::Result<()> {
//! let cfg = SplitConfig::new("staging/lineitem")
//!     .row_limit(250_000)
//!     .delimiter(b'|')
//!     .template("lineitem_%03d.csv.gz")?;
//!
//! let from_file = SplitConfig::from_json_file("split.json")?;
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, SplitError};
use crate::template::NameTemplate;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Default number of data rows per shard.
pub const DEFAULT_ROW_LIMIT: u64 = 100_000;

/// Line ending written after every record of a shard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LineTerminator {
    /// `\r\n`
    #[default]
    Crlf,
    /// `\n`
    Lf,
}

impl From<LineTerminator> for csv::Terminator {
    fn from(t: LineTerminator) -> Self {
        match t {
            LineTerminator::Crlf => csv::Terminator::CRLF,
            LineTerminator::Lf => csv::Terminator::Any(b'\n'),
        }
    }
}

/// Configuration for one split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    /// Field separator for both the source and the shards.
    ///
    /// A single ASCII byte: records are split on bytes, so multi-byte
    /// characters such as `§` are rejected. `"`, `\r` and `\n` are reserved.
    #[serde(with = "delimiter_serde")]
    pub delimiter: u8,
    /// Maximum data rows per shard (header excluded). Must be positive.
    pub row_limit: u64,
    /// Shard file-name pattern.
    pub template: NameTemplate,
    /// Directory the shards are written to; created if missing.
    pub output_path: PathBuf,
    /// Treat the first record as a header and repeat it in every shard.
    pub keep_headers: bool,
    /// Record terminator for shard output.
    pub terminator: LineTerminator,
    /// Write a JSON manifest next to the shards.
    pub write_manifest: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            delimiter: b',',
            row_limit: DEFAULT_ROW_LIMIT,
            template: NameTemplate::default(),
            output_path: PathBuf::from("."),
            keep_headers: true,
            terminator: LineTerminator::default(),
            write_manifest: false,
        }
    }
}

impl SplitConfig {
    /// Defaults, writing into `output_path`.
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
            ..Self::default()
        }
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    ///
    /// # Errors
    /// [`SplitError::NotFound`]/[`SplitError::Io`] if the file cannot be opened,
    /// [`SplitError::InvalidArgument`] if it does not parse or validate.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let f = File::open(path).map_err(|e| SplitError::open(path, e))?;
        let cfg: Self = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            SplitError::invalid(format!("config {}: {e}", path.display()))
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Sets the field delimiter, a single ASCII byte.
    #[must_use]
    pub fn delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Sets the maximum data rows per shard.
    #[must_use]
    pub fn row_limit(mut self, rows: u64) -> Self {
        self.row_limit = rows;
        self
    }

    /// Parses and sets the shard name template.
    ///
    /// # Errors
    /// See [`NameTemplate::parse`].
    pub fn template(mut self, template: &str) -> Result<Self> {
        self.template = NameTemplate::parse(template)?;
        Ok(self)
    }

    /// Sets the output directory.
    #[must_use]
    pub fn output_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.output_path = path.into();
        self
    }

    /// Sets header retention.
    #[must_use]
    pub fn keep_headers(mut self, keep: bool) -> Self {
        self.keep_headers = keep;
        self
    }

    /// Sets the record terminator.
    #[must_use]
    pub fn terminator(mut self, terminator: LineTerminator) -> Self {
        self.terminator = terminator;
        self
    }

    /// Enables or disables the manifest.
    #[must_use]
    pub fn write_manifest(mut self, enabled: bool) -> Self {
        self.write_manifest = enabled;
        self
    }

    /// Check every field that can be checked without touching the filesystem.
    ///
    /// # Errors
    /// [`SplitError::InvalidArgument`] on a zero row limit or unusable delimiter.
    pub fn validate(&self) -> Result<()> {
        if self.row_limit == 0 {
            return Err(SplitError::invalid("row limit must be greater than zero"));
        }
        validate_delimiter(self.delimiter)?;
        if self.write_manifest && !cfg!(feature = "manifest") {
            return Err(SplitError::invalid(
                "manifest requested but the `manifest` feature is disabled",
            ));
        }
        Ok(())
    }

    /// Full path of shard `index`.
    #[must_use]
    pub fn shard_path(&self, index: u64) -> PathBuf {
        self.output_path.join(self.template.render(index))
    }
}

fn validate_delimiter(d: u8) -> Result<()> {
    match d {
        b'"' | b'\r' | b'\n' => Err(SplitError::invalid(format!(
            "delimiter {:?} conflicts with quoting or line endings",
            d as char
        ))),
        d if !d.is_ascii() => Err(SplitError::invalid("delimiter must be ASCII")),
        _ => Ok(()),
    }
}

/// Parse a user-supplied delimiter. Accepts a single ASCII character or the
/// escapes `\t` and `tab`.
///
/// # Errors
/// [`SplitError::InvalidArgument`] for empty, multi-character, or reserved input.
pub fn parse_delimiter(s: &str) -> Result<u8> {
    let d = match s {
        "" => return Err(SplitError::invalid("delimiter must not be empty")),
        "\\t" | "tab" => b'\t',
        s if s.len() == 1 => s.as_bytes()[0],
        s if s.chars().count() == 1 => {
            return Err(SplitError::invalid(format!(
                "delimiter {s:?} must be an ASCII character"
            )));
        }
        s => {
            return Err(SplitError::invalid(format!(
                "delimiter {s:?} must be a single character"
            )));
        }
    };
    validate_delimiter(d)?;
    Ok(d)
}

mod delimiter_serde {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &u8, s: S) -> Result<S::Ok, S::Error> {
        let mut buf = [0u8; 4];
        s.serialize_str((*d as char).encode_utf8(&mut buf))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<u8, D::Error> {
        let raw = String::deserialize(d)?;
        super::parse_delimiter(&raw).map_err(serde::de::Error::custom)
    }
}
