use anyhow::Result;
use bulkline::testing::table_file;
use bulkline::{SourceError, open_table};
use std::fs;

#[test]
fn file_location_matches_table_name_case_insensitively() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = table_file(tmp.path(), "accounts", &["id"], &[&["1"]]);

    let stream = open_table(&input, "ACCOUNTS")?;
    assert_eq!(stream.headers(), ["id"]);
    assert_eq!(stream.count(), 1);
    Ok(())
}

#[test]
fn file_location_with_wrong_table_name_is_not_found() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = table_file(tmp.path(), "accounts", &["id"], &[&["1"]]);

    let err = open_table(&input, "users").unwrap_err();
    assert!(matches!(err, SourceError::TableNotFound { .. }));
    Ok(())
}

#[test]
fn directory_location_resolves_table_by_stem() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    table_file(tmp.path(), "orders", &["sku"], &[&["a"], &["b"]]);
    table_file(tmp.path(), "users", &["id"], &[&["1"]]);

    let rows: Vec<_> = open_table(tmp.path(), "Orders")?
        .map(|r| r.expect("row"))
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].get("sku"), Some("a"));
    Ok(())
}

#[test]
fn missing_location_is_an_io_error() {
    let err = open_table("/nonexistent/dir", "t").unwrap_err();
    assert!(matches!(err, SourceError::Io { .. }));
}

#[test]
fn short_rows_are_padded_and_long_rows_truncated() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("ragged.csv");
    fs::write(&path, "a,b,c\n1,2\n4,5,6,7\n")?;

    let rows: Vec<_> = open_table(&path, "ragged")?.map(|r| r.expect("row")).collect();
    assert_eq!(rows[0].cells(), ["1", "2", ""]);
    assert_eq!(rows[1].cells(), ["4", "5", "6"]);
    assert_eq!(rows[0].get("c"), Some(""));
    Ok(())
}

#[test]
fn cells_are_whitespace_trimmed() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("padded.csv");
    fs::write(&path, " id , name \n 1 ,  Alice  \n")?;

    let stream = open_table(&path, "padded")?;
    assert_eq!(stream.headers(), ["id", "name"]);
    let rows: Vec<_> = stream.map(|r| r.expect("row")).collect();
    assert_eq!(rows[0].cells(), ["1", "Alice"]);
    Ok(())
}

#[test]
fn input_without_header_yields_no_rows() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("empty.csv");
    fs::write(&path, "")?;

    let stream = open_table(&path, "empty")?;
    assert!(stream.headers().is_empty());
    assert_eq!(stream.count(), 0);
    Ok(())
}

#[test]
fn rows_iterate_header_cell_pairs_in_column_order() -> Result<()> {
    let tmp = tempfile::tempdir()?;
    let input = table_file(tmp.path(), "t", &["x", "y"], &[&["1", "2"]]);

    let row = open_table(&input, "t")?.next().expect("one row").expect("ok");
    let pairs: Vec<_> = row.iter().collect();
    assert_eq!(pairs, vec![("x", "1"), ("y", "2")]);
    Ok(())
}

#[cfg(feature = "io-json")]
mod json {
    use super::*;

    #[test]
    fn json_table_headers_follow_first_object() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("users.json");
        fs::write(
            &path,
            r#"[
                {"id": "1", "name": "Alice"},
                {"name": "Bob", "id": "2", "extra": "ignored"},
                {"id": "3"}
            ]"#,
        )?;

        let stream = open_table(tmp.path(), "users")?;
        assert_eq!(stream.headers(), ["id", "name"]);
        let rows: Vec<_> = stream.map(|r| r.expect("row")).collect();
        assert_eq!(rows[0].cells(), ["1", "Alice"]);
        assert_eq!(rows[1].cells(), ["2", "Bob"]);
        assert_eq!(rows[2].cells(), ["3", ""]);
        Ok(())
    }

    #[test]
    fn csv_wins_over_json_for_the_same_stem() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        table_file(tmp.path(), "dual", &["from_csv"], &[&["yes"]]);
        fs::write(tmp.path().join("dual.json"), r#"[{"from_json": "yes"}]"#)?;

        let stream = open_table(tmp.path(), "dual")?;
        assert_eq!(stream.headers(), ["from_csv"]);
        Ok(())
    }

    #[test]
    fn non_array_json_is_malformed() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let path = tmp.path().join("bad.json");
        fs::write(&path, r#"{"not": "an array"}"#)?;

        let err = open_table(&path, "bad").unwrap_err();
        assert!(matches!(err, SourceError::Malformed { .. }));
        Ok(())
    }
}
