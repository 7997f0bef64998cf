use serde::Serialize;
use std::path::Path;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

use crate::error::{DashboardError, Result};

/// CSV text for `rows`: a header taken from the first record's field names,
/// then one line per record. Fields holding commas, quotes or newlines are
/// quoted with inner quotes doubled.
pub fn to_csv_string<T: Serialize>(rows: &[T]) -> Result<String> {
    if rows.is_empty() {
        return Err(DashboardError::EmptyDerived("csv export".into()));
    }
    let mut wtr = csv::Writer::from_writer(Vec::new());
    for r in rows {
        wtr.serialize(r)?;
    }
    let bytes = wtr
        .into_inner()
        .map_err(|e| DashboardError::Io(e.into_error()))?;
    String::from_utf8(bytes)
        .map_err(|e| DashboardError::Io(std::io::Error::new(std::io::ErrorKind::InvalidData, e)))
}

/// Write `rows` to `path` as CSV; returns how many records were written.
pub fn export_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<usize> {
    if rows.is_empty() {
        return Err(DashboardError::EmptyDerived("csv export".into()));
    }
    let mut wtr = csv::Writer::from_path(path)?;
    for r in rows {
        wtr.serialize(r)?;
    }
    wtr.flush()?;
    info!(path = %path.display(), records = rows.len(), "csv exported");
    Ok(rows.len())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    std::fs::write(path, s)?;
    Ok(())
}

/// `<view>_<region>.csv` with the region lower-cased and spaces replaced.
pub fn export_file_name(view: &str, region: &str) -> String {
    let region: String = region
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| if c.is_whitespace() || c == '/' { '_' } else { c })
        .collect();
    format!("{view}_{region}.csv")
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(sin filas)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
