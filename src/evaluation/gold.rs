// src/evaluation/gold.rs

use anyhow::{anyhow, Context, Result};
use log::debug;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use crate::models::core::RecordId;

/// Ground-truth grouping: `group_id` -> member ids, in file order.
pub type GoldGroups = BTreeMap<String, Vec<RecordId>>;

/// Loads gold groups from a CSV file with `id` and `group_id` columns.
pub fn load_gold_groups(path: &Path) -> Result<GoldGroups> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open gold file {}", path.display()))?;
    read_gold_groups(file).with_context(|| format!("Invalid gold file {}", path.display()))
}

/// Reads gold groups from any CSV source.
///
/// A missing `group_id` header is a configuration error. Rows with a blank `id`
/// or blank `group_id` are skipped.
pub fn read_gold_groups<R: Read>(reader: R) -> Result<GoldGroups> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(reader);

    let headers = csv_reader
        .headers()
        .context("Failed to read gold file header")?
        .clone();
    let group_col = headers
        .iter()
        .position(|h| h.trim() == "group_id")
        .ok_or_else(|| anyhow!("Gold file missing group_id column."))?;
    let id_col = headers.iter().position(|h| h.trim() == "id");

    let mut groups = GoldGroups::new();
    let mut skipped = 0usize;
    for (row_number, row) in csv_reader.records().enumerate() {
        let row = row.with_context(|| format!("Failed to read gold row {}", row_number + 1))?;
        let raw_id = id_col.and_then(|col| row.get(col)).unwrap_or("");
        let group_id = row.get(group_col).unwrap_or("").trim();

        let Some(id) = RecordId::parse(raw_id) else {
            skipped += 1;
            continue;
        };
        if group_id.is_empty() {
            skipped += 1;
            continue;
        }
        groups.entry(group_id.to_string()).or_default().push(id);
    }

    debug!("Loaded {} gold groups ({} rows skipped)", groups.len(), skipped);
    Ok(groups)
}
