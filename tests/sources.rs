//! Source argument expansion.

use anyhow::Result;
use csvshard::SplitError;
use csvshard::sources::{expand_glob, expand_sources};
use csvshard::testing::Workspace;
use std::fs::create_dir_all;

#[test]
fn glob_matches_files_in_sorted_order() -> Result<()> {
    let ws = Workspace::new()?;
    for name in ["orders.csv", "customer.csv", "nation.csv", "notes.txt"] {
        ws.write_raw(name, b"x\n")?;
    }
    create_dir_all(ws.path().join("dir.csv"))?;

    let files = expand_glob(&format!("{}/*.csv", ws.path().display()))?;

    let names: Vec<_> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, vec!["customer.csv", "nation.csv", "orders.csv"]);
    Ok(())
}

#[test]
fn sources_keep_argument_order_and_drop_duplicates() -> Result<()> {
    let ws = Workspace::new()?;
    let lineitem = ws.write_raw("lineitem.csv", b"x\n")?;
    let part = ws.write_raw("part.csv", b"x\n")?;
    let supplier = ws.write_raw("supplier.csv", b"x\n")?;

    let args = vec![
        supplier.display().to_string(),
        format!("{}/*.csv", ws.path().display()),
    ];
    let files = expand_sources(&args)?;

    assert_eq!(files, vec![supplier, lineitem, part]);
    Ok(())
}

#[test]
fn literal_path_with_glob_characters_is_taken_as_is() -> Result<()> {
    let ws = Workspace::new()?;
    let odd = ws.write_raw("region[1].csv", b"x\n")?;

    let files = expand_sources(&[odd.display().to_string()])?;

    assert_eq!(files, vec![odd]);
    Ok(())
}

#[test]
fn unmatched_pattern_is_not_found() -> Result<()> {
    let ws = Workspace::new()?;
    let pattern = format!("{}/*.tbl", ws.path().display());

    let err = expand_sources(&[pattern]).unwrap_err();

    assert!(matches!(err, SplitError::NotFound { .. }), "{err:?}");
    Ok(())
}

#[test]
fn invalid_pattern_is_invalid_argument() {
    let err = expand_glob("data/[unclosed").unwrap_err();
    assert!(matches!(err, SplitError::InvalidArgument(_)), "{err:?}");
}
