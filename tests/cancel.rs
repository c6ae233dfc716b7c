use anyhow::Result;
use bulkline::testing::{gated_processor, read_table, table_file};
use bulkline::{CancelToken, JobConfig, PipelineError, run_with_cancel};
use std::thread;
use std::time::Duration;

/// Cancelling mid-submission stops the run with `Interrupted`, but whatever
/// was already enqueued is drained in order and left on disk.
#[test]
fn cancelled_run_drains_enqueued_rows_and_reports_interrupted() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    const ROWS: usize = 60;

    let rows: Vec<Vec<String>> = (0..ROWS).map(|i| vec![i.to_string()]).collect();
    let row_refs: Vec<Vec<&str>> = rows.iter().map(|r| vec![r[0].as_str()]).collect();
    let row_slices: Vec<&[&str]> = row_refs.iter().map(Vec::as_slice).collect();
    let input = table_file(tmp.path(), "bulk", &["id"], &row_slices);

    let (processor, gate) = gated_processor(&[("status", "OK")]);
    let token = CancelToken::new();

    let config = JobConfig::new(&input, "bulk", tmp.path().join("out.csv"), "out")
        .with_extra_columns(["status"])
        .with_threads(2)
        .with_queue_capacity(10);

    let out_csv = tmp.path().join("out.csv");
    let runner = {
        let token = token.clone();
        thread::spawn(move || run_with_cancel(&config, processor, &token))
    };

    // Let submission wedge against the closed gate, then cancel and release.
    thread::sleep(Duration::from_millis(300));
    token.cancel();
    gate.open();

    let err = runner.join().expect("runner thread panicked").unwrap_err();
    assert!(matches!(err, PipelineError::Interrupted));

    // The drained prefix is on disk, in order.
    let out = read_table(&out_csv);
    assert!(!out.is_empty(), "no output artifact after cancellation");
    assert_eq!(out[0], vec!["id", "status"]);
    assert!(out.len() - 1 < ROWS, "cancelled run processed every row");
    for (i, row) in out[1..].iter().enumerate() {
        assert_eq!(row[0], i.to_string(), "drained prefix out of order");
    }
    Ok(())
}
