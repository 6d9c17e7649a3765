//! # csvshard
//!
//! Split oversized delimited files into **row-bounded shards** before handing
//! them to a warehouse bulk loader (PUT/COPY style staging).
//!
//! Warehouse loaders ingest many medium files far better than one huge one.
//! `csvshard` streams the source once, writes at most `row_limit` data rows
//! into each numbered shard, and optionally repeats the header in every shard.
//!
//! ## Key Features
//!
//! - **Streaming** - constant memory regardless of source size
//! - **Order preserving** - concatenating shards in order reproduces the source rows
//! - **Record aware** - quoted fields with embedded delimiters or newlines stay intact
//! - **Permissive** - ragged rows pass through unchanged
//! - **Compression** - gzip, zstd, bzip2 and xz on input and output (feature flags)
//! - **Batch splitting** - several sources as one joined task group
//! - **Manifests** - per-shard row counts and SHA-256 digests for the upload step
//!
//! ## Quick Start
//!
//! ```no_run
//! use csvshard::{SplitConfig, split};
//!
//! # fn main() -> csvshard::Result<()> {
//! let cfg = SplitConfig::new("staging/lineitem")
//!     .row_limit(100_000)
//!     .template("lineitem_%d.csv")?;
//!
//! let report = split("tpch/lineitem.csv", &cfg)?;
//! for shard in &report.shards {
//!     println!("{} rows -> {}", shard.rows, shard.path.display());
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Shard guarantees
//!
//! For `N` data rows and a row limit `R`:
//! - shards are numbered `1, 2, ...` without gaps,
//! - there are `ceil(N / R)` shards, or exactly one when `N == 0`,
//! - every shard but the last holds exactly `R` rows,
//! - with headers kept, every shard starts with the source header.
//!
//! ## Errors
//!
//! All fallible operations return [`SplitError`]; see its variants for the
//! taxonomy. Errors abort the split immediately. Shards already written stay
//! on disk.
//!
//! ## Feature flags
//!
//! | Feature | Effect |
//! |---------|--------|
//! | `compression-gzip`, `compression-zstd`, `compression-bzip2`, `compression-xz` | codecs |
//! | `parallel-io` | [`split_all`] runs jobs on a `rayon` pool |
//! | `manifest` | [`manifest`] module, `write_manifest` config option |

pub mod batch;
pub mod compression;
pub mod config;
pub mod error;
#[cfg_attr(docsrs, doc(cfg(feature = "manifest")))]
#[cfg(feature = "manifest")]
pub mod manifest;
pub mod sources;
pub mod splitter;
pub mod template;
pub mod testing;

pub use batch::{BatchError, JobFailure, SplitJob, split_all};
pub use config::{DEFAULT_ROW_LIMIT, LineTerminator, SplitConfig, parse_delimiter};
pub use error::{Result, SplitError};
pub use splitter::{ShardInfo, SplitReport, split, split_reader};
pub use template::NameTemplate;
