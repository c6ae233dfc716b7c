use anyhow::Result;
use bulkline::testing::{gated_processor, read_table, table_file};
use bulkline::{JobConfig, Table, checkpoint_path, run};
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

fn wait_for<F: Fn() -> bool>(what: &str, deadline: Duration, cond: F) {
    let start = Instant::now();
    while !cond() {
        assert!(start.elapsed() < deadline, "timed out waiting for {what}");
        thread::sleep(Duration::from_millis(20));
    }
}

/// After the first full batch, the output path must already hold a complete,
/// correctly ordered snapshot, while the run is still in flight.
#[test]
fn checkpoint_is_readable_mid_run() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    const ROWS: usize = 12;
    const BATCH: usize = 5;

    let rows: Vec<Vec<String>> = (0..ROWS).map(|i| vec![i.to_string()]).collect();
    let row_refs: Vec<Vec<&str>> = rows.iter().map(|r| vec![r[0].as_str()]).collect();
    let row_slices: Vec<&[&str]> = row_refs.iter().map(Vec::as_slice).collect();
    let input = table_file(tmp.path(), "feed", &["id"], &row_slices);

    let (processor, gate) = gated_processor(&[("status", "OK")]);

    // One worker so gate releases reach rows strictly in index order.
    let config = JobConfig::new(&input, "feed", tmp.path().join("out.csv"), "out")
        .with_extra_columns(["status"])
        .with_threads(1)
        .with_batch_size(BATCH);

    let out_csv = tmp.path().join("out.csv");
    let runner = thread::spawn(move || run(&config, processor));

    // Release exactly one batch worth of rows and wait for the checkpoint.
    gate.allow(BATCH);
    wait_for("first checkpoint", Duration::from_secs(10), || {
        out_csv.exists() && read_table(&out_csv).len() >= BATCH + 1
    });

    let snapshot = read_table(&out_csv);
    assert_eq!(snapshot.len(), BATCH + 1);
    assert_eq!(snapshot[0], vec!["id", "status"]);
    for (i, row) in snapshot[1..].iter().enumerate() {
        assert_eq!(row[0], i.to_string());
        assert_eq!(row[1], "OK");
    }
    assert!(!runner.is_finished(), "run finished before the gate opened");

    gate.open();
    let summary = runner.join().expect("runner thread panicked")?;

    // Batches at 5 and 10, plus the partial drain batch.
    assert_eq!(summary.checkpoints_saved, 3);
    assert_eq!(read_table(&out_csv).len(), ROWS + 1);
    Ok(())
}

#[test]
fn checkpoint_replaces_target_and_cleans_temp() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let target = tmp.path().join("snap.csv");

    let mut table = Table::new();
    table.push_row(vec!["id".into(), "status".into()]);
    table.push_row(vec!["1".into(), "OK".into()]);
    table.checkpoint(&target)?;

    assert_eq!(
        read_table(&target),
        vec![vec!["id", "status"], vec!["1", "OK"]]
    );
    assert!(!checkpoint_path(&target).exists(), "temp file left behind");

    // A second checkpoint supersedes the first in place.
    table.push_row(vec!["2".into(), "OK".into()]);
    table.checkpoint(&target)?;
    assert_eq!(read_table(&target).len(), 3);
    assert!(!checkpoint_path(&target).exists());
    Ok(())
}

#[test]
fn checkpoint_path_is_a_sibling_of_the_target() {
    let path = checkpoint_path(Path::new("/data/out.csv"));
    assert_eq!(path, Path::new("/data/out.csv.checkpoint"));
}

#[test]
fn write_csv_creates_parent_directories() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let nested = tmp.path().join("a").join("b").join("out.csv");

    let mut table = Table::new();
    table.push_row(vec!["only".into()]);
    table.write_csv(&nested)?;

    assert_eq!(read_table(&nested), vec![vec!["only"]]);
    Ok(())
}
