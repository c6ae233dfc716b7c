//! End-to-end bulk enrichment of a generated accounts table.
//!
//! Generates a CSV table of accounts, then runs the pipeline with a small
//! worker pool, enriching each row with a `status` and a `domain` column.
//! Every 10th account fails lookup to show per-row fault isolation.
//!
//! Run with:
//! ```bash
//! cargo run --example enrich_accounts
//! ```

use anyhow::{Result, bail};
use bulkline::{ExtraColumns, JobConfig, Row, run};
use std::fs;

fn main() -> Result<()> {
    println!("=== Bulkline Enrichment Demo ===\n");

    let dir = tempfile::tempdir()?;
    let input = dir.path().join("accounts.csv");

    println!("Generating 1,000 accounts...");
    let mut wtr = csv::Writer::from_path(&input)?;
    wtr.write_record(["id", "name", "email"])?;
    for i in 0..1_000 {
        wtr.write_record([
            i.to_string(),
            format!("user{i}"),
            format!("user{i}@example.com"),
        ])?;
    }
    wtr.flush()?;

    let out = dir.path().join("accounts_enriched.csv");
    let cfg = JobConfig::new(&input, "accounts", &out, "accounts_enriched")
        .with_extra_columns(["status", "domain"])
        .with_threads(4)
        .with_queue_capacity(100)
        .with_batch_size(250);

    println!("Running enrichment (4 workers, batches of 250)...\n");
    let summary = run(&cfg, |row: &Row, index: usize| {
        // Stand-in for a remote lookup.
        if index % 10 == 9 {
            bail!("lookup timed out");
        }
        let email = row.get("email").unwrap_or("");
        let mut extra = ExtraColumns::new();
        extra.insert("status".to_string(), "OK".to_string());
        extra.insert(
            "domain".to_string(),
            email.split('@').nth(1).unwrap_or("").to_string(),
        );
        Ok(extra)
    })?;

    summary.print();

    let enriched = fs::read_to_string(&out)?;
    println!("\nFirst lines of the output:");
    for line in enriched.lines().take(5) {
        println!("  {line}");
    }
    Ok(())
}
