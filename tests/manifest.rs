#![cfg(feature = "manifest")]
//! Shard manifests: contents, persistence, and verification.

use anyhow::Result;
use csvshard::manifest::{Manifest, ManifestMismatch, sha256_file};
use csvshard::testing::*;
use csvshard::*;
use std::fs;

fn split_with_manifest(ws: &Workspace) -> Result<(SplitConfig, SplitReport)> {
    let src = ws.write_source("nation.csv", b',', Some(&NATION_HEADER[..]), &nation_rows())?;
    let cfg = SplitConfig::new(ws.out_dir())
        .row_limit(10)
        .template("nation_%d.csv")?
        .write_manifest(true);
    let report = split(&src, &cfg)?;
    Ok((cfg, report))
}

#[test]
fn manifest_lists_every_shard() -> Result<()> {
    let ws = Workspace::new()?;
    let (cfg, report) = split_with_manifest(&ws)?;

    let path = report.manifest.clone().expect("manifest written");
    assert_eq!(path, ws.out_dir().join("nation.manifest.json"));
    assert_eq!(path, Manifest::path_for(&cfg));

    let manifest = Manifest::load(&path)?;
    assert_eq!(manifest.total_rows, 25);
    assert_eq!(manifest.row_limit, 10);
    assert_eq!(manifest.delimiter, ",");
    assert_eq!(manifest.template, "nation_%d.csv");
    assert_eq!(
        manifest.header,
        Some(NATION_HEADER.iter().map(|s| s.to_string()).collect())
    );
    assert_eq!(
        manifest
            .shards
            .iter()
            .map(|e| (e.index, e.file.as_str(), e.rows))
            .collect::<Vec<_>>(),
        vec![
            (1, "nation_1.csv", 10),
            (2, "nation_2.csv", 10),
            (3, "nation_3.csv", 5)
        ]
    );
    for (entry, shard) in manifest.shards.iter().zip(&report.shards) {
        let (digest, bytes) = sha256_file(&shard.path)?;
        assert_eq!(entry.sha256, digest);
        assert_eq!(entry.bytes, bytes);
        assert_eq!(entry.sha256.len(), 64);
    }
    Ok(())
}

#[test]
fn manifest_is_not_written_unless_requested() -> Result<()> {
    let ws = Workspace::new()?;
    let src = ws.write_raw("t.csv", b"a\n1\n")?;

    let report = split(&src, &SplitConfig::new(ws.out_dir()))?;

    assert_eq!(report.manifest, None);
    assert_eq!(ws.out_files()?, vec!["output_1.csv"]);
    Ok(())
}

#[test]
fn verify_detects_changed_and_missing_shards() -> Result<()> {
    let ws = Workspace::new()?;
    let (_, report) = split_with_manifest(&ws)?;
    let manifest = Manifest::load(report.manifest.as_ref().expect("manifest written"))?;

    assert!(manifest.verify(ws.out_dir())?.is_empty());

    fs::write(&report.shards[0].path, "tampered\r\n")?;
    fs::remove_file(&report.shards[2].path)?;
    let mismatches = manifest.verify(ws.out_dir())?;

    assert_eq!(mismatches.len(), 2);
    assert!(matches!(
        &mismatches[0],
        ManifestMismatch::Digest { file, .. } if file == "nation_1.csv"
    ));
    assert_eq!(
        mismatches[1],
        ManifestMismatch::Missing {
            file: "nation_3.csv".to_string()
        }
    );
    Ok(())
}

#[test]
fn sha256_of_known_content() -> Result<()> {
    let ws = Workspace::new()?;
    let path = ws.write_raw("abc.txt", b"abc")?;

    let (digest, bytes) = sha256_file(&path)?;

    assert_eq!(
        digest,
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
    assert_eq!(bytes, 3);
    Ok(())
}

#[test]
fn loading_garbage_is_malformed_input() -> Result<()> {
    let ws = Workspace::new()?;
    let path = ws.write_raw("bad.manifest.json", b"{ not json")?;

    let err = Manifest::load(&path).unwrap_err();

    assert!(matches!(err, SplitError::MalformedInput { .. }), "{err:?}");
    Ok(())
}

#[test]
fn manifest_named_like_the_source_is_rejected() -> Result<()> {
    let ws = Workspace::new()?;
    let src = ws.write_source(
        "nation.manifest.json",
        b',',
        Some(&NATION_HEADER[..]),
        &nation_rows(),
    )?;
    let before = fs::read(&src)?;
    let cfg = SplitConfig::new(ws.path())
        .template("nation_%d.csv")?
        .write_manifest(true);

    let err = split(&src, &cfg).unwrap_err();

    assert!(matches!(err, SplitError::InvalidArgument(_)), "{err:?}");
    assert!(err.to_string().contains("manifest"), "{err}");
    assert_eq!(fs::read(&src)?, before);
    assert!(!ws.path().join("nation_1.csv").exists());
    Ok(())
}
