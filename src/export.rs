use log::info;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Result, SalesError};
use crate::notification::Notification;
use crate::schema::NormalizedSaleRecord;
use crate::state::WorkflowState;

pub const EXPORT_FILE_NAME: &str = "ventas_normalizadas.csv";

const ROW_SEPARATOR: &str = "\r\n";

/// Renders normalized sales as CSV text.
///
/// The header is the field names of the first record. Every value is wrapped
/// in double quotes as-is: embedded quotes and commas are not escaped, so a
/// value containing them yields a row that strict CSV readers will misparse.
/// Returns `None` for an empty slice.
pub fn to_csv(records: &[NormalizedSaleRecord]) -> Result<Option<String>> {
    let Some(first) = records.first() else {
        return Ok(None);
    };

    let headers: Vec<String> = match serde_json::to_value(first)? {
        Value::Object(map) => map.keys().cloned().collect(),
        _ => Vec::new(),
    };

    let mut lines = Vec::with_capacity(records.len() + 1);
    lines.push(headers.join(","));

    for record in records {
        let row = serde_json::to_value(record)?;
        let fields: Vec<String> = headers
            .iter()
            .map(|field| format!("\"{}\"", render(row.get(field))))
            .collect();
        lines.push(fields.join(","));
    }

    Ok(Some(lines.join(ROW_SEPARATOR)))
}

/// Writes the session's normalized sales to `dir/ventas_normalizadas.csv`.
pub fn export_to_dir(state: &mut WorkflowState, dir: &Path) -> Result<PathBuf> {
    let csv = to_csv(state.normalized_records())?.ok_or(SalesError::NothingToExport)?;

    let path = dir.join(EXPORT_FILE_NAME);
    fs::write(&path, csv)?;
    info!(
        "Exported {} normalized sales to {}",
        state.normalized_records().len(),
        path.display()
    );

    state.notify(Notification::success(format!(
        "Downloaded the file {}",
        EXPORT_FILE_NAME
    )));
    Ok(path)
}

fn render(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}
