//! Demonstration of mid-run checkpoints.
//!
//! Runs a deliberately slow enrichment in a background thread and polls the
//! output path while the run is still in flight: each read sees a complete,
//! openable snapshot of progress so far, because checkpoints are swapped in
//! atomically. If the process died here, the last snapshot would remain as
//! the recovery artifact.
//!
//! Run with:
//! ```bash
//! cargo run --example checkpoint_recovery
//! ```

use anyhow::Result;
use bulkline::{ExtraColumns, JobConfig, Row, run};
use std::thread;
use std::time::Duration;

fn main() -> Result<()> {
    println!("=== Bulkline Checkpoint Demo ===\n");

    let dir = tempfile::tempdir()?;
    let input = dir.path().join("events.csv");

    let mut wtr = csv::Writer::from_path(&input)?;
    wtr.write_record(["event_id"])?;
    for i in 0..500 {
        wtr.write_record([i.to_string()])?;
    }
    wtr.flush()?;

    let out = dir.path().join("events_enriched.csv");
    let cfg = JobConfig::new(&input, "events", &out, "events_enriched")
        .with_extra_columns(["verdict"])
        .with_threads(2)
        // Small batches so checkpoints land frequently enough to watch.
        .with_batch_size(50);

    let runner = thread::spawn(move || {
        run(&cfg, |_row: &Row, _index: usize| {
            thread::sleep(Duration::from_millis(5));
            let mut extra = ExtraColumns::new();
            extra.insert("verdict".to_string(), "clean".to_string());
            Ok(extra)
        })
    });

    println!("Polling the output path while the run is in flight:\n");
    while !runner.is_finished() {
        thread::sleep(Duration::from_millis(200));
        if let Ok(content) = std::fs::read_to_string(&out) {
            let rows = content.lines().count().saturating_sub(1);
            println!("  snapshot on disk: {rows} rows");
        } else {
            println!("  no checkpoint yet");
        }
    }

    let summary = runner.join().expect("runner panicked")?;
    println!("\nRun finished:");
    summary.print();
    Ok(())
}
