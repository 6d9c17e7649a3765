//! The bounded record splitter.
//!
//! One streaming pass over the source: records are read into a reused buffer
//! and written straight into the current shard, so memory use is independent
//! of the input size. Exactly one shard is open at any time.
//!
//! Shard contents follow these rules:
//! * shard numbers start at 1 and are contiguous,
//! * every shard except the last holds exactly `row_limit` data rows,
//! * with `keep_headers`, the source header is the first record of each shard,
//! * a source without data rows still yields shard 1 (header only, or empty).
//!
//! Ragged rows are passed through unchanged. Quoted fields are parsed as a
//! unit, so embedded delimiters and newlines never split a record.

use crate::compression::{FinishWrite, auto_detect_reader, auto_detect_writer};
use crate::config::SplitConfig;
use crate::error::{Result, SplitError};
use csv::{ByteRecord, ReaderBuilder, WriterBuilder};
use serde::Serialize;
use std::fs::{self, File, create_dir_all};
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::time::Instant;

const READER_LABEL: &str = "<reader>";

/// One finalized shard.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShardInfo {
    /// 1-based shard number.
    pub index: u64,
    /// Location of the shard file.
    pub path: PathBuf,
    /// Data rows in this shard, header excluded.
    pub rows: u64,
}

/// Outcome of a completed split.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SplitReport {
    /// Source path, or `None` when splitting an open reader.
    pub source: Option<PathBuf>,
    /// Header fields when headers were kept.
    pub header: Option<Vec<String>>,
    /// Shards in order.
    pub shards: Vec<ShardInfo>,
    /// Data rows read from the source.
    pub total_rows: u64,
    /// Manifest location, when one was written.
    pub manifest: Option<PathBuf>,
}

impl SplitReport {
    /// Shard paths in shard order.
    #[must_use]
    pub fn shard_paths(&self) -> Vec<PathBuf> {
        self.shards.iter().map(|s| s.path.clone()).collect()
    }

    /// Number of shards produced (always at least one).
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}

/// Split the delimited file at `source` into shards described by `config`.
///
/// Compressed sources (gzip, zstd, bzip2, xz) are decompressed on the fly.
///
/// # Errors
/// * [`SplitError::InvalidArgument`] if `config` fails validation; raised
///   before the source is opened or any file is created.
/// * [`SplitError::NotFound`] if `source` does not exist.
/// * [`SplitError::InvalidArgument`] if a shard or the manifest would be
///   written over `source` itself; raised before any file is created.
/// * [`SplitError::MalformedInput`] if headers are kept and the source is empty.
/// * [`SplitError::Csv`] / [`SplitError::Io`] on parse or I/O failures.
pub fn split(source: impl AsRef<Path>, config: &SplitConfig) -> Result<SplitReport> {
    let source = source.as_ref();
    config.validate()?;
    let file = File::open(source).map_err(|e| SplitError::open(source, e))?;
    let locations = source_locations(source).map_err(|e| SplitError::open(source, e))?;
    ensure_source_survives(source, &locations, config)?;
    let reader = auto_detect_reader(file, source).map_err(|e| SplitError::io("read", source, e))?;
    run(reader, Some(source), locations.first().map(PathBuf::as_path), config)
}

/// Split an already-open source. The reader is consumed as plain text.
///
/// # Errors
/// Same as [`split`], minus [`SplitError::NotFound`].
pub fn split_reader<R: Read>(reader: R, config: &SplitConfig) -> Result<SplitReport> {
    config.validate()?;
    run(reader, None, None, config)
}

/// Canonical output directory, or `None` while it does not exist yet.
pub(crate) fn resolve_output_dir(config: &SplitConfig) -> Result<Option<PathBuf>> {
    match fs::canonicalize(&config.output_path) {
        Ok(dir) => Ok(Some(dir)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(SplitError::io("resolve", &config.output_path, e)),
    }
}

/// The output of `config` that would be written at `file`, if any.
///
/// Both `file` and `out_dir` must be canonical.
pub(crate) fn output_at(file: &Path, out_dir: &Path, config: &SplitConfig) -> Option<String> {
    if file.parent() != Some(out_dir) {
        return None;
    }
    let name = file.file_name()?.to_str()?;
    if let Some(index) = config.template.index_of(name) {
        return Some(format!("shard {index}"));
    }
    #[cfg(feature = "manifest")]
    if config.write_manifest && crate::manifest::Manifest::file_name(config) == name {
        return Some("the manifest".to_string());
    }
    None
}

/// Where `source` lives: the resolved file first and, when `source` is a
/// symlink, the link itself.
pub(crate) fn source_locations(source: &Path) -> io::Result<Vec<PathBuf>> {
    let mut locations = vec![fs::canonicalize(source)?];
    if let Some(name) = source.file_name() {
        let parent = match source.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let entry = fs::canonicalize(parent)?.join(name);
        if !locations.contains(&entry) {
            locations.push(entry);
        }
    }
    Ok(locations)
}

fn ensure_source_survives(source: &Path, locations: &[PathBuf], config: &SplitConfig) -> Result<()> {
    let Some(out_dir) = resolve_output_dir(config)? else {
        return Ok(());
    };
    match locations
        .iter()
        .find_map(|location| output_at(location, &out_dir, config))
    {
        Some(output) => Err(SplitError::invalid(format!(
            "{output} would overwrite the source {}",
            source.display()
        ))),
        None => Ok(()),
    }
}

/// Refuse to create `path` if it already resolves to the source, e.g. through
/// a symlink left in the output directory.
fn refuse_source_alias(path: &Path, source: Option<&Path>) -> Result<()> {
    let Some(source) = source else {
        return Ok(());
    };
    if fs::canonicalize(path).is_ok_and(|resolved| resolved.as_path() == source) {
        return Err(SplitError::invalid(format!(
            "{} resolves to the source {}",
            path.display(),
            source.display()
        )));
    }
    Ok(())
}

/// `resolved` is the canonical source path; no output may be written there.
fn run<R: Read>(
    reader: R,
    source: Option<&Path>,
    resolved: Option<&Path>,
    config: &SplitConfig,
) -> Result<SplitReport> {
    let label = source.unwrap_or_else(|| Path::new(READER_LABEL));
    let started = Instant::now();
    tracing::info!(
        target: "csvshard",
        source = %label.display(),
        output = %config.output_path.display(),
        row_limit = config.row_limit,
        keep_headers = config.keep_headers,
        "splitting"
    );

    let mut rdr = ReaderBuilder::new()
        .delimiter(config.delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let header = if config.keep_headers {
        let mut header = ByteRecord::new();
        let found = rdr
            .read_byte_record(&mut header)
            .map_err(|e| SplitError::csv(label, e))?;
        if !found {
            return Err(SplitError::MalformedInput {
                path: label.to_path_buf(),
                message: "source is empty but a header row was requested".to_string(),
            });
        }
        Some(header)
    } else {
        None
    };

    create_dir_all(&config.output_path)
        .map_err(|e| SplitError::io("create output directory", &config.output_path, e))?;

    let mut shards = Vec::new();
    let mut total_rows = 0u64;
    let mut record = ByteRecord::new();
    let mut shard = ShardWriter::create(config, 1, header.as_ref(), resolved)?;

    while rdr
        .read_byte_record(&mut record)
        .map_err(|e| SplitError::csv(label, e))?
    {
        if shard.rows == config.row_limit {
            let next = shard.index + 1;
            shards.push(shard.finish()?);
            shard = ShardWriter::create(config, next, header.as_ref(), resolved)?;
        }
        shard.write(&record)?;
        total_rows += 1;
    }
    shards.push(shard.finish()?);

    #[cfg_attr(not(feature = "manifest"), allow(unused_mut))]
    let mut report = SplitReport {
        source: source.map(Path::to_path_buf),
        header: header.as_ref().map(header_fields),
        shards,
        total_rows,
        manifest: None,
    };

    #[cfg(feature = "manifest")]
    if config.write_manifest {
        let manifest = crate::manifest::Manifest::build(&report, config)?;
        let path = crate::manifest::Manifest::path_for(config);
        refuse_source_alias(&path, resolved)?;
        manifest.write(&path)?;
        report.manifest = Some(path);
    }

    tracing::info!(
        target: "csvshard",
        source = %label.display(),
        shards = report.shards.len(),
        rows = report.total_rows,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "split complete"
    );
    Ok(report)
}

fn header_fields(record: &ByteRecord) -> Vec<String> {
    record
        .iter()
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect()
}

/// The single open shard.
struct ShardWriter {
    index: u64,
    path: PathBuf,
    rows: u64,
    writer: csv::Writer<Box<dyn FinishWrite>>,
}

impl ShardWriter {
    fn create(
        config: &SplitConfig,
        index: u64,
        header: Option<&ByteRecord>,
        source: Option<&Path>,
    ) -> Result<Self> {
        let path = config.shard_path(index);
        refuse_source_alias(&path, source)?;
        let file = File::create(&path).map_err(|e| SplitError::io("create", &path, e))?;
        let sink = auto_detect_writer(file, &path).map_err(|e| SplitError::io("create", &path, e))?;
        let writer = WriterBuilder::new()
            .delimiter(config.delimiter)
            .terminator(config.terminator.into())
            .has_headers(false)
            .flexible(true)
            .from_writer(sink);
        let mut shard = Self {
            index,
            path,
            rows: 0,
            writer,
        };
        if let Some(header) = header {
            shard
                .writer
                .write_byte_record(header)
                .map_err(|e| SplitError::csv(&shard.path, e))?;
        }
        Ok(shard)
    }

    fn write(&mut self, record: &ByteRecord) -> Result<()> {
        self.writer
            .write_byte_record(record)
            .map_err(|e| SplitError::csv(&self.path, e))?;
        self.rows += 1;
        Ok(())
    }

    fn finish(self) -> Result<ShardInfo> {
        let Self {
            index,
            path,
            rows,
            writer,
        } = self;
        let sink = writer
            .into_inner()
            .map_err(|e| SplitError::io("flush", &path, e.into_error()))?;
        sink.finish().map_err(|e| SplitError::io("finish", &path, e))?;
        tracing::debug!(target: "csvshard", shard = index, rows, path = %path.display(), "shard finalized");
        Ok(ShardInfo { index, path, rows })
    }
}
