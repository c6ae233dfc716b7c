use anyhow::Result;
use bulkline::testing::{gated_processor, read_table, table_file};
use bulkline::{JobConfig, run};
use std::sync::atomic::Ordering;
use std::thread;
use std::time::Duration;

/// With a bounded queue and a processor that never completes, submission
/// must stall instead of racing ahead of the writer: only as many rows as
/// the workers can hold enter the processor, and the run does not finish
/// until the gate opens.
#[test]
fn full_queue_blocks_submission_until_writer_catches_up() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    const ROWS: usize = 60;
    const THREADS: usize = 2;

    let rows: Vec<Vec<String>> = (0..ROWS).map(|i| vec![i.to_string()]).collect();
    let row_refs: Vec<Vec<&str>> = rows.iter().map(|r| vec![r[0].as_str()]).collect();
    let row_slices: Vec<&[&str]> = row_refs.iter().map(Vec::as_slice).collect();
    let input = table_file(tmp.path(), "bulk", &["id"], &row_slices);

    let (processor, gate) = gated_processor(&[("status", "OK")]);
    let started = processor.started();

    let config = JobConfig::new(&input, "bulk", tmp.path().join("out.csv"), "out")
        .with_extra_columns(["status"])
        .with_threads(THREADS)
        .with_queue_capacity(10); // the enforced floor

    let out_csv = tmp.path().join("out.csv");
    let runner = thread::spawn(move || run(&config, processor));

    // Give the pipeline time to wedge: the queue fills, `put` blocks, and
    // only the worker threads have entered the processor.
    thread::sleep(Duration::from_millis(400));
    assert!(!runner.is_finished(), "run completed with the gate closed");
    assert!(
        started.load(Ordering::SeqCst) <= THREADS,
        "more rows entered the processor than there are workers"
    );

    gate.open();
    let summary = runner.join().expect("runner thread panicked")?;

    assert_eq!(summary.rows_submitted, ROWS as u64);
    assert_eq!(summary.rows_written, ROWS as u64);
    let out = read_table(&out_csv);
    assert_eq!(out.len(), ROWS + 1);
    for (i, row) in out[1..].iter().enumerate() {
        assert_eq!(row[0], i.to_string());
    }
    Ok(())
}
