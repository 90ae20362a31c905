// src/utils/loaders.rs

use anyhow::{anyhow, Context, Result};
use csv::StringRecord;
use log::{debug, info};
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::models::core::{Record, RecordId};
use crate::models::matching::NeighborRecord;

/// Loads company records from a CSV file with `id` and `company_name` columns.
pub fn load_companies(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open companies file {}", path.display()))?;
    let records = read_companies(file)
        .with_context(|| format!("Invalid companies file {}", path.display()))?;
    info!("Loaded {} companies from {}", records.len(), path.display());
    Ok(records)
}

/// Reads company records from any CSV source.
///
/// Rows with a blank id are skipped and names are trimmed. The result is sorted
/// with integer ids first in numeric order, followed by text ids.
pub fn read_companies<R: Read>(reader: R) -> Result<Vec<Record>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader
        .headers()
        .context("Failed to read companies header")?
        .clone();
    let id_col = required_column(&headers, "id")?;
    let name_col = required_column(&headers, "company_name")?;

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (row_number, row) in csv_reader.records().enumerate() {
        let row = row.with_context(|| format!("Failed to read companies row {}", row_number + 1))?;
        let Some(id) = row.get(id_col).and_then(RecordId::parse) else {
            skipped += 1;
            continue;
        };
        let company_name = row.get(name_col).unwrap_or("").trim();
        records.push(Record::new(id, company_name));
    }

    records.sort_by(|a, b| match (&a.id, &b.id) {
        (RecordId::Int(x), RecordId::Int(y)) => x.cmp(y),
        (RecordId::Int(_), RecordId::Text(_)) => std::cmp::Ordering::Less,
        (RecordId::Text(_), RecordId::Int(_)) => std::cmp::Ordering::Greater,
        (RecordId::Text(x), RecordId::Text(y)) => x.cmp(y),
    });

    if skipped > 0 {
        debug!("Skipped {} company rows with blank ids", skipped);
    }
    Ok(records)
}

/// Loads precomputed neighbor results from a CSV file with `id`, `neighbor_id`
/// and `score` columns. Optional `company_name` and `neighbor_name` columns are
/// carried along.
pub fn load_neighbor_results(path: &Path) -> Result<Vec<NeighborRecord>> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open neighbors file {}", path.display()))?;
    let neighbors = read_neighbor_results(file)
        .with_context(|| format!("Invalid neighbors file {}", path.display()))?;
    info!("Loaded {} neighbor rows from {}", neighbors.len(), path.display());
    Ok(neighbors)
}

/// Reads neighbor rows from any CSV source. Blank or absent cells become `None`;
/// a score that is present but not a number is an error naming the row.
pub fn read_neighbor_results<R: Read>(reader: R) -> Result<Vec<NeighborRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);
    let headers = csv_reader
        .headers()
        .context("Failed to read neighbors header")?
        .clone();
    let column = |name: &str| headers.iter().position(|h| h.trim() == name);
    let id_col = column("id");
    let neighbor_col = column("neighbor_id");
    let score_col = column("score");
    let name_col = column("company_name");
    let neighbor_name_col = column("neighbor_name");

    let mut neighbors = Vec::new();
    for (row_number, row) in csv_reader.records().enumerate() {
        let row = row.with_context(|| format!("Failed to read neighbors row {}", row_number + 1))?;
        let score = match cell(&row, score_col) {
            None => None,
            Some(raw) => Some(raw.parse::<f64>().map_err(|_| {
                anyhow!("Invalid score {:?} in neighbors row {}", raw, row_number + 1)
            })?),
        };
        neighbors.push(NeighborRecord {
            id: cell(&row, id_col).and_then(RecordId::parse),
            company_name: cell(&row, name_col).map(str::to_string),
            neighbor_id: cell(&row, neighbor_col).and_then(RecordId::parse),
            neighbor_name: cell(&row, neighbor_name_col).map(str::to_string),
            score,
        });
    }
    Ok(neighbors)
}

fn required_column(headers: &StringRecord, name: &str) -> Result<usize> {
    headers
        .iter()
        .position(|h| h.trim() == name)
        .ok_or_else(|| anyhow!("Missing required column '{}'", name))
}

fn cell(row: &StringRecord, col: Option<usize>) -> Option<&str> {
    col.and_then(|c| row.get(c))
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_companies_sorted_and_trimmed() {
        let data = "id,company_name\n10, Globex \nb2,Beta\n2,Acme Inc\n,Nameless\na1,Alpha\n";
        let records = read_companies(data.as_bytes()).unwrap();
        let ids: Vec<String> = records.iter().map(|r| r.id.to_string()).collect();
        assert_eq!(ids, vec!["2", "10", "a1", "b2"]);
        assert_eq!(records[1].company_name, "Globex");
    }

    #[test]
    fn test_companies_require_columns() {
        let err = read_companies("id,name\n1,Acme\n".as_bytes()).unwrap_err();
        assert!(err.to_string().contains("company_name"));
    }

    #[test]
    fn test_load_companies_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "id,company_name").unwrap();
        writeln!(file, "1,\"Acme, Inc.\"").unwrap();
        let records = load_companies(file.path()).unwrap();
        assert_eq!(records, vec![Record::new(RecordId::Int(1), "Acme, Inc.")]);
    }

    #[test]
    fn test_neighbors_with_blank_cells() {
        let data = "id,neighbor_id,score\n1,2,0.95\n1,,0.5\n3,4,\n";
        let neighbors = read_neighbor_results(data.as_bytes()).unwrap();
        assert_eq!(neighbors.len(), 3);
        assert_eq!(neighbors[0], NeighborRecord::new(RecordId::Int(1), RecordId::Int(2), 0.95));
        assert!(neighbors[1].neighbor_id.is_none());
        assert!(neighbors[2].score.is_none());
    }

    #[test]
    fn test_neighbors_bad_score_is_an_error() {
        let data = "id,neighbor_id,score\n1,2,high\n";
        let err = read_neighbor_results(data.as_bytes()).unwrap_err();
        assert!(err.to_string().contains("row 1"));
    }
}
