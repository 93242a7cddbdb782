//! CSV address source: finds the holder export and picks its address column.

use crate::planner::is_valid_address;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

const SAMPLE_SIZE: usize = 10;
const COLUMN_KEYWORDS: [&str; 5] = ["address", "airdrop", "holder", "wallet", "eth"];

/// The first `*.csv` in `dir`, by name.
pub fn detect_csv_file(dir: impl AsRef<Path>) -> Result<PathBuf> {
    let pattern = dir.as_ref().join("*.csv");
    let pattern = pattern.to_string_lossy();

    let mut files: Vec<PathBuf> = glob::glob(&pattern)
        .with_context(|| format!("Invalid glob pattern {}", pattern))?
        .filter_map(|entry| entry.ok())
        .collect();
    files.sort();

    match files.len() {
        0 => bail!("No CSV file found in {}", dir.as_ref().display()),
        1 => {}
        n => warn!(
            "Found {} CSV files, using {}",
            n,
            files[0].display()
        ),
    }

    let file = files.swap_remove(0);
    info!("Using CSV file: {}", file.display());
    Ok(file)
}

/// Index of the column holding recipient addresses.
///
/// Prefers a column whose sampled values are all addresses, then a column
/// named like one, then the first column.
pub fn detect_address_column(headers: &[String], rows: &[Vec<String>]) -> usize {
    for (idx, name) in headers.iter().enumerate() {
        let sample: Vec<&str> = rows
            .iter()
            .filter_map(|row| row.get(idx))
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
            .take(SAMPLE_SIZE)
            .collect();

        if !sample.is_empty() && sample.iter().all(|v| is_valid_address(v)) {
            info!("Detected address column by content: {}", name);
            return idx;
        }
    }

    for (idx, name) in headers.iter().enumerate() {
        let lower = name.to_lowercase();
        if COLUMN_KEYWORDS.iter().any(|k| lower.contains(k)) {
            info!("Detected address column by name: {}", name);
            return idx;
        }
    }

    warn!(
        "No address column detected, falling back to first column: {}",
        headers.first().map(String::as_str).unwrap_or("")
    );
    0
}

/// Read every value of the detected address column.
pub fn read_address_column(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let headers: Vec<String> = reader
        .headers()
        .with_context(|| format!("Failed to read header of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.with_context(|| format!("Malformed row in {}", path.display()))?;
        rows.push(record.iter().map(str::to_string).collect::<Vec<_>>());
    }

    if headers.is_empty() {
        bail!("CSV file {} has no columns", path.display());
    }

    let column = detect_address_column(&headers, &rows);
    let values: Vec<String> = rows
        .into_iter()
        .map(|mut row| {
            if column < row.len() {
                row.swap_remove(column)
            } else {
                String::new()
            }
        })
        .collect();

    info!(
        "Read {} rows from column '{}' of {}",
        values.len(),
        headers[column],
        path.display()
    );
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const A: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";
    const B: &str = "0xfB6916095ca1df60bB79Ce92cE3Ea74c37c5d359";

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_column_by_content_wins() {
        let headers = strings(&["Rank", "Owner", "Quantity"]);
        let rows = vec![strings(&["1", A, "10"]), strings(&["2", B, "5"])];
        assert_eq!(detect_address_column(&headers, &rows), 1);
    }

    #[test]
    fn test_column_by_name() {
        let headers = strings(&["Rank", "HolderAddress", "Quantity"]);
        let rows = vec![strings(&["1", "pending", "10"])];
        assert_eq!(detect_address_column(&headers, &rows), 1);
    }

    #[test]
    fn test_column_fallback_is_first() {
        let headers = strings(&["a", "b"]);
        let rows = vec![strings(&["x", "y"])];
        assert_eq!(detect_address_column(&headers, &rows), 0);
    }

    #[test]
    fn test_read_address_column() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("holders.csv");
        fs::write(
            &path,
            format!("Rank,HolderAddress,Quantity\n1,{},10\n2,{},5\n3\n", A, B),
        )
        .unwrap();

        let values = read_address_column(&path).unwrap();
        assert_eq!(values, strings(&[A, B, ""]));
    }

    #[test]
    fn test_detect_csv_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(detect_csv_file(dir.path()).is_err());

        fs::write(dir.path().join("b.csv"), "x\n").unwrap();
        fs::write(dir.path().join("a.csv"), "x\n").unwrap();
        fs::write(dir.path().join("notes.txt"), "x\n").unwrap();

        let file = detect_csv_file(dir.path()).unwrap();
        assert_eq!(file.file_name().unwrap(), "a.csv");
    }
}
