//! Testing utilities for split workflows.
//!
//! Provides scratch directories that clean themselves up, writers for source
//! fixtures, and readers that load shards back (decompressing as needed) so
//! tests can compare rows directly.
//!
//! ```
//! use csvshard::testing::*;
//! use csvshard::{SplitConfig, split};
//!
//! # fn main() -> anyhow::Result<()> {
//! let ws = Workspace::new()?;
//! let src = ws.write_source("nation.csv", b',', Some(&NATION_HEADER[..]), &nation_rows())?;
//!
//! let cfg = SplitConfig::new(ws.out_dir()).row_limit(10);
//! let report = split(&src, &cfg)?;
//! assert_eq!(report.shard_count(), 3);
//!
//! let rows = read_shard(&report.shards[2].path, b',')?;
//! assert_eq!(rows.len(), 1 + 5); // header + remainder
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod workspace;

pub use fixtures::*;
pub use workspace::*;
