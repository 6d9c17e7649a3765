use std::io::{self, Write};
use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use csvshard::sources::expand_sources;
use csvshard::{
    LineTerminator, SplitConfig, SplitJob, SplitReport, parse_delimiter, split, split_all,
};

fn parse_row_limit(value: &str) -> Result<u64, String> {
    let parsed = value
        .parse::<u64>()
        .map_err(|err| format!("invalid row limit '{value}': {err}"))?;
    if parsed == 0 {
        return Err("row limit must be greater than zero".into());
    }
    Ok(parsed)
}

fn parse_delimiter_arg(value: &str) -> Result<u8, String> {
    parse_delimiter(value).map_err(|err| err.to_string())
}

#[derive(Parser)]
#[command(
    name = "csvshard",
    version,
    about = "Split large delimited files into row-bounded shards for bulk loading"
)]
struct Cli {
    /// Source files or glob patterns (e.g. 'tpch/*.csv.gz').
    #[arg(value_name = "SOURCE", required = true, num_args = 1..)]
    sources: Vec<String>,
    /// Maximum data rows per shard, header excluded (default 100000).
    #[arg(long = "rows", short = 'r', value_name = "ROWS", value_parser = parse_row_limit)]
    rows: Option<u64>,
    /// Field delimiter; a single ASCII character, or 'tab'.
    #[arg(long, short = 'd', value_name = "CHAR", value_parser = parse_delimiter_arg)]
    delimiter: Option<u8>,
    /// Shard file-name template with one placeholder: %d, %s, %04d, {} or {:04}.
    /// With several sources the text before the placeholder is replaced by each
    /// source's name.
    #[arg(long, short = 't', value_name = "TEMPLATE")]
    template: Option<String>,
    /// Directory for the shards; created if missing.
    #[arg(long = "output-dir", short = 'o', value_name = "DIR")]
    output_dir: Option<PathBuf>,
    /// Treat the first row as data and do not repeat a header.
    #[arg(long = "no-headers")]
    no_headers: bool,
    /// End shard records with '\n' instead of '\r\n'.
    #[arg(long)]
    lf: bool,
    /// Write a JSON manifest with row counts and SHA-256 digests.
    #[arg(long)]
    manifest: bool,
    /// Load settings from a JSON file; flags override it.
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,
    /// Number of sources split concurrently (default: CPU count).
    #[arg(long, short = 'j', value_name = "N")]
    jobs: Option<usize>,
    /// Print the split reports as JSON instead of one line per shard.
    #[arg(long)]
    json: bool,
}

fn build_config(cli: &Cli) -> Result<SplitConfig> {
    let mut cfg = match &cli.config {
        Some(path) => SplitConfig::from_json_file(path)
            .with_context(|| format!("load config {}", path.display()))?,
        None => SplitConfig::default(),
    };
    if let Some(rows) = cli.rows {
        cfg = cfg.row_limit(rows);
    }
    if let Some(delimiter) = cli.delimiter {
        cfg = cfg.delimiter(delimiter);
    }
    if let Some(template) = &cli.template {
        cfg = cfg.template(template)?;
    }
    if let Some(dir) = &cli.output_dir {
        cfg = cfg.output_path(dir);
    }
    if cli.no_headers {
        cfg = cfg.keep_headers(false);
    }
    if cli.lf {
        cfg = cfg.terminator(LineTerminator::Lf);
    }
    if cli.manifest {
        cfg = cfg.write_manifest(true);
    }
    cfg.validate()?;
    Ok(cfg)
}

fn print_reports(reports: &[SplitReport], json: bool) -> Result<()> {
    let stdout = io::stdout();
    let mut out = stdout.lock();
    if json {
        serde_json::to_writer_pretty(&mut out, reports)?;
        writeln!(out)?;
        return Ok(());
    }
    for report in reports {
        for shard in &report.shards {
            writeln!(out, "{}\t{}", shard.path.display(), shard.rows)?;
        }
        if let Some(manifest) = &report.manifest {
            writeln!(out, "{}\tmanifest", manifest.display())?;
        }
    }
    Ok(())
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let cfg = build_config(&cli)?;
    let sources = expand_sources(&cli.sources)?;

    let reports = if let [source] = sources.as_slice() {
        vec![split(source, &cfg)?]
    } else {
        let jobs = sources
            .iter()
            .map(|source| SplitJob::for_source(source, &cfg))
            .collect::<Result<Vec<_>, _>>()?;
        split_all(&jobs, cli.jobs)?
    };

    print_reports(&reports, cli.json)
}

fn main() {
    // Logs go to stderr so shard listings on stdout stay pipeable.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    if let Err(err) = run() {
        tracing::debug!(target: "csvshard", "csvshard failed: {err:?}");
        eprintln!("error: {err:#}");
        process::exit(1);
    }
}
