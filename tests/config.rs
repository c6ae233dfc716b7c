use anyhow::Result;
use bulkline::{JobConfig, QUEUE_CAPACITY_FLOOR};
use std::fs;
use std::path::Path;

#[test]
fn floors_are_applied_on_normalization() {
    let cfg = JobConfig::new("in.csv", "in", "out", "out")
        .with_threads(0)
        .with_queue_capacity(3)
        .with_batch_size(0)
        .normalized();

    assert_eq!(cfg.thread_count, 1);
    assert_eq!(cfg.queue_capacity, QUEUE_CAPACITY_FLOOR);
    assert_eq!(cfg.batch_size, 1);
}

#[test]
fn output_path_resolves_directory_locations() {
    let dir_cfg = JobConfig::new("in.csv", "in", "/data/out", "enriched");
    assert_eq!(
        dir_cfg.resolved_output_path(),
        Path::new("/data/out/enriched.csv")
    );

    let file_cfg = JobConfig::new("in.csv", "in", "/data/result.csv", "enriched");
    assert_eq!(
        file_cfg.resolved_output_path(),
        Path::new("/data/result.csv")
    );
}

#[test]
fn from_file_applies_defaults_for_omitted_fields() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("job.json");
    fs::write(
        &path,
        r#"{
            "input_location": "data/accounts.csv",
            "input_table": "accounts",
            "output_location": "out",
            "output_table": "enriched",
            "extra_columns": ["status"],
            "thread_count": 4
        }"#,
    )?;

    let cfg = JobConfig::from_file(&path)?;
    assert_eq!(cfg.input_table, "accounts");
    assert_eq!(cfg.thread_count, 4);
    assert_eq!(cfg.extra_columns, ["status"]);
    assert_eq!(cfg.batch_size, bulkline::DEFAULT_BATCH_SIZE);
    assert_eq!(cfg.retry_limit, 0);
    assert_eq!(cfg.shutdown_timeout_secs, 600);
    Ok(())
}

#[test]
fn unparseable_config_is_a_parse_error() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("job.json");
    fs::write(&path, "not json")?;

    let err = JobConfig::from_file(&path).unwrap_err();
    assert!(matches!(err, bulkline::ConfigError::Parse { .. }));
    Ok(())
}

#[test]
fn environment_overrides_replace_file_values() {
    let mut cfg = JobConfig::new("in.csv", "in", "out", "out");

    // Process-global state: this is the only test touching these keys.
    unsafe {
        std::env::set_var("BULKLINE_THREAD_COUNT", "7");
        std::env::set_var("BULKLINE_OUTPUT_TABLE", "from_env");
        std::env::set_var("BULKLINE_BATCH_SIZE", "not-a-number");
    }
    cfg.apply_env_overrides();
    unsafe {
        std::env::remove_var("BULKLINE_THREAD_COUNT");
        std::env::remove_var("BULKLINE_OUTPUT_TABLE");
        std::env::remove_var("BULKLINE_BATCH_SIZE");
    }

    assert_eq!(cfg.thread_count, 7);
    assert_eq!(cfg.output_table, "from_env");
    // Unparseable numeric overrides are ignored.
    assert_eq!(cfg.batch_size, bulkline::DEFAULT_BATCH_SIZE);
}
