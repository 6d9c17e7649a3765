//! Batch splitting: joined task group, ordering, and failure aggregation.

use anyhow::Result;
use csvshard::testing::*;
use csvshard::*;

#[test]
fn every_source_gets_its_own_shard_family() -> Result<()> {
    let ws = Workspace::new()?;
    let nation = ws.write_source("nation.csv", b',', Some(&NATION_HEADER[..]), &nation_rows())?;
    let orders = ws.write_source("orders.csv", b',', Some(&ORDERS_HEADER[..]), &orders_rows(45))?;
    let base = SplitConfig::new(ws.out_dir())
        .row_limit(20)
        .template("part_%02d.csv")?;

    let jobs = vec![
        SplitJob::for_source(&nation, &base)?,
        SplitJob::for_source(&orders, &base)?,
    ];
    let reports = split_all(&jobs, Some(2))?;

    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0].source.as_deref(), Some(nation.as_path()));
    assert_eq!(reports[1].source.as_deref(), Some(orders.as_path()));
    assert_eq!(reports[0].shard_count(), 2);
    assert_eq!(reports[1].shard_count(), 3);
    assert_eq!(
        ws.out_files()?,
        vec![
            "nation_01.csv",
            "nation_02.csv",
            "orders_01.csv",
            "orders_02.csv",
            "orders_03.csv",
        ]
    );
    assert_eq!(read_data_rows(&reports[1].shard_paths(), b',', true)?, orders_rows(45));
    Ok(())
}

#[test]
fn job_template_uses_stem_before_first_dot() -> Result<()> {
    let base = SplitConfig::new("out").template("part_%03d.csv")?;

    let job = SplitJob::for_source("tpch/orders.tbl.gz", &base)?;

    assert_eq!(job.config.template.render(1), "orders_001.csv");
    assert_eq!(job.config.row_limit, base.row_limit);
    Ok(())
}

#[test]
fn failures_are_collected_after_all_jobs_finish() -> Result<()> {
    let ws = Workspace::new()?;
    let good = ws.write_source("customer.csv", b',', Some(&synthetic_header(2)[..]), &synthetic_rows(7, 2))?;
    let empty = ws.write_raw("supplier.csv", b"")?;
    let missing = ws.path().join("partsupp.csv");
    let base = SplitConfig::new(ws.out_dir()).row_limit(5);

    let jobs = vec![
        SplitJob::for_source(&empty, &base)?,
        SplitJob::for_source(&good, &base)?,
        SplitJob::for_source(&missing, &base)?,
    ];
    let err = split_all(&jobs, None).unwrap_err();

    match err {
        BatchError::Failed {
            total,
            failures,
            completed,
        } => {
            assert_eq!(total, 3);
            assert_eq!(failures.len(), 2);
            assert_eq!(failures[0].source, empty);
            assert!(matches!(failures[0].error, SplitError::MalformedInput { .. }));
            assert_eq!(failures[1].source, missing);
            assert!(matches!(failures[1].error, SplitError::NotFound { .. }));
            assert_eq!(completed.len(), 1);
            assert_eq!(completed[0].total_rows, 7);
        }
        other => panic!("expected Failed, got {other:?}"),
    }
    assert_eq!(ws.out_files()?, vec!["customer_1.csv", "customer_2.csv"]);
    Ok(())
}

#[test]
fn failure_message_names_each_source() -> Result<()> {
    let ws = Workspace::new()?;
    let base = SplitConfig::new(ws.out_dir());
    let jobs = vec![
        SplitJob::for_source(ws.path().join("region.csv"), &base)?,
        SplitJob::for_source(ws.path().join("part.csv"), &base)?,
    ];

    let msg = split_all(&jobs, Some(1)).unwrap_err().to_string();

    assert!(msg.starts_with("2 of 2 split jobs failed"), "{msg}");
    assert!(msg.contains("region.csv"), "{msg}");
    assert!(msg.contains("part.csv"), "{msg}");
    Ok(())
}

#[test]
fn colliding_jobs_are_rejected_before_running() -> Result<()> {
    let ws = Workspace::new()?;
    let a = ws.write_raw("a.csv", b"x\n1\n")?;
    let b = ws.write_raw("b.csv", b"x\n2\n")?;
    let cfg = SplitConfig::new(ws.out_dir());

    let jobs = vec![SplitJob::new(&a, cfg.clone()), SplitJob::new(&b, cfg)];
    let err = split_all(&jobs, None).unwrap_err();

    assert!(
        matches!(err, BatchError::Setup(SplitError::InvalidArgument(_))),
        "{err:?}"
    );
    assert!(!ws.out_dir().exists());
    Ok(())
}

#[test]
fn invalid_job_config_is_rejected_before_running() -> Result<()> {
    let ws = Workspace::new()?;
    let a = ws.write_raw("a.csv", b"x\n1\n")?;
    let b = ws.write_raw("b.csv", b"x\n2\n")?;
    let base = SplitConfig::new(ws.out_dir());

    let jobs = vec![
        SplitJob::for_source(&a, &base)?,
        SplitJob::for_source(&b, &base.clone().row_limit(0))?,
    ];
    let err = split_all(&jobs, None).unwrap_err();

    assert!(matches!(err, BatchError::Setup(SplitError::InvalidArgument(_))));
    assert!(!ws.out_dir().exists());
    Ok(())
}

#[test]
fn empty_job_list_is_a_no_op() -> Result<()> {
    let reports = split_all(&[], None)?;
    assert!(reports.is_empty());
    Ok(())
}

#[test]
fn families_differing_only_in_padding_are_rejected() -> Result<()> {
    let ws = Workspace::new()?;
    let a = ws.write_source("a.csv", b',', None::<&[&str]>, &synthetic_rows(10, 1))?;
    let b = ws.write_source("b.csv", b',', None::<&[&str]>, &synthetic_rows(10, 1))?;
    let base = SplitConfig::new(ws.out_dir()).row_limit(1).keep_headers(false);

    // Shard 1 names differ, but both render `t_10.csv`.
    let jobs = vec![
        SplitJob::new(&a, base.clone().template("t_%d.csv")?),
        SplitJob::new(&b, base.template("t_%02d.csv")?),
    ];
    let err = split_all(&jobs, None).unwrap_err();

    assert!(
        matches!(err, BatchError::Setup(SplitError::InvalidArgument(_))),
        "{err:?}"
    );
    assert!(!ws.out_dir().exists());
    Ok(())
}

#[test]
fn distinct_families_in_one_directory_run() -> Result<()> {
    let ws = Workspace::new()?;
    let a = ws.write_source("a.csv", b',', None::<&[&str]>, &synthetic_rows(12, 1))?;
    let b = ws.write_source("b.csv", b',', None::<&[&str]>, &synthetic_rows(12, 1))?;
    let base = SplitConfig::new(ws.out_dir()).row_limit(5).keep_headers(false);

    let jobs = vec![
        SplitJob::new(&a, base.clone().template("t_%d.csv")?),
        SplitJob::new(&b, base.template("t_%d.tsv")?),
    ];
    let reports = split_all(&jobs, None)?;

    assert_eq!(reports.iter().map(|r| r.shard_count()).sum::<usize>(), 6);
    Ok(())
}

#[test]
fn job_writing_over_another_jobs_source_is_rejected() -> Result<()> {
    let ws = Workspace::new()?;
    let victim = ws.write_raw("output_1.csv", b"id\n1\n2\n")?;
    let other = ws.write_raw("orders.csv", b"id\n3\n")?;

    let jobs = vec![
        SplitJob::new(&victim, SplitConfig::new(ws.out_dir())),
        SplitJob::new(&other, SplitConfig::new(ws.path())),
    ];
    let err = split_all(&jobs, None).unwrap_err();

    assert!(
        matches!(err, BatchError::Setup(SplitError::InvalidArgument(_))),
        "{err:?}"
    );
    assert_eq!(std::fs::read(&victim)?, b"id\n1\n2\n");
    Ok(())
}

#[cfg(feature = "manifest")]
#[test]
fn shared_manifest_name_is_rejected() -> Result<()> {
    let ws = Workspace::new()?;
    let a = ws.write_raw("a.csv", b"x\n1\n")?;
    let b = ws.write_raw("b.csv", b"x\n2\n")?;
    let base = SplitConfig::new(ws.out_dir()).write_manifest(true);

    // Both write `a.manifest.json`.
    let jobs = vec![
        SplitJob::new(&a, base.clone().template("a_%d.csv")?),
        SplitJob::new(&b, base.template("a_%d.tsv")?),
    ];
    let err = split_all(&jobs, None).unwrap_err();

    assert!(
        matches!(err, BatchError::Setup(SplitError::InvalidArgument(_))),
        "{err:?}"
    );
    assert!(!ws.out_dir().exists());
    Ok(())
}
