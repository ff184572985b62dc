//! Batch input: a JSON array of records or JSON Lines.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

/// Parse records from a JSON array, a single object or JSON Lines.
pub fn parse_records(content: &str) -> Result<Vec<Value>> {
    let trimmed = content.trim_start();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    if trimmed.starts_with('[') {
        return serde_json::from_str(trimmed).context("Failed to parse JSON array of records");
    }

    // A pretty-printed single object spans several lines.
    if let Ok(value @ Value::Object(_)) = serde_json::from_str::<Value>(trimmed) {
        return Ok(vec![value]);
    }

    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(idx, line)| {
            serde_json::from_str(line).with_context(|| format!("Invalid JSON on line {}", idx + 1))
        })
        .collect()
}

pub fn read_records(path: &Path) -> Result<Vec<Value>> {
    let content =
        fs::read_to_string(path).with_context(|| format!("Failed to read input file: {:?}", path))?;
    parse_records(&content).with_context(|| format!("Invalid input file: {:?}", path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_json_array() {
        let records = parse_records(r#"[{"lat": 1.0}, {"lat": 2.0}]"#).unwrap();
        assert_eq!(records, vec![json!({"lat": 1.0}), json!({"lat": 2.0})]);
    }

    #[test]
    fn test_json_lines() {
        let records = parse_records("{\"id\": 1}\n\n{\"id\": 2}\n").unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1]["id"], 2);
    }

    #[test]
    fn test_single_pretty_object() {
        let records = parse_records("{\n  \"id\": \"a\"\n}\n").unwrap();
        assert_eq!(records, vec![json!({"id": "a"})]);
    }

    #[test]
    fn test_bad_line_reports_line_number() {
        let err = parse_records("{\"id\": 1}\n{oops\n").unwrap_err();
        assert!(err.to_string().contains("line 2"));
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_records("  \n").unwrap().is_empty());
    }

    #[test]
    fn test_read_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("records.jsonl");
        fs::write(&path, "{\"id\": 1}\n").unwrap();
        assert_eq!(read_records(&path).unwrap().len(), 1);
        assert!(read_records(&dir.path().join("missing.json")).is_err());
    }
}
