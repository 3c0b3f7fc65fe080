use std::path::Path;

use mds_core::{ErrorInfo, MdsError};

use crate::description::Description;
use crate::registry::{Dataset, DatasetRegistry};

/// Display-ready summary table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Table {
    /// Column names in display order.
    pub columns: Vec<String>,
    /// One row per dataset, aligned with `columns`.
    pub rows: Vec<Vec<String>>,
}

/// Builds the flat field/value record for one dataset.
///
/// `name` comes first (hyperlinked when a link is present, in which case
/// the raw `link` field is dropped), then the entry count, then every
/// non-null description field in schema order. Lists render comma-joined.
pub fn build_table_record(
    name: &str,
    dataset: &dyn Dataset,
    description: &Description,
) -> Vec<(String, String)> {
    let display_name = match &description.link {
        Some(link) => format!("<a href=\"{}\">{}</a>", link.display(), name),
        None => name.to_string(),
    };
    let mut record = vec![
        ("name".to_string(), display_name),
        ("entries".to_string(), dataset.ids().len().to_string()),
    ];
    for (field, value) in description.fields() {
        if field == "link" {
            continue;
        }
        if let Some(value) = value {
            record.push((field.to_string(), value.display()));
        }
    }
    record
}

/// Builds the summary table over every registered dataset.
///
/// Columns are the union of record fields: `name` and `entries` first,
/// then description fields in schema order when any dataset sets them.
/// Cells missing from a record stay empty.
pub fn summary_table(registry: &DatasetRegistry) -> Table {
    let mut columns = vec!["name".to_string(), "entries".to_string()];
    for field in ["body_region", "license", "modality", "prep_data_size", "raw_data_size", "task"] {
        let used = registry.entries().any(|(_, entry)| {
            entry
                .description()
                .fields()
                .iter()
                .any(|(name, value)| *name == field && value.is_some())
        });
        if used {
            columns.push(field.to_string());
        }
    }

    let mut rows = Vec::new();
    for (name, entry) in registry.entries() {
        let dataset = entry.instantiate();
        let record = build_table_record(name, dataset.as_ref(), entry.description());
        let row = columns
            .iter()
            .map(|column| {
                record
                    .iter()
                    .find(|(field, _)| field == column)
                    .map(|(_, value)| value.clone())
                    .unwrap_or_default()
            })
            .collect();
        rows.push(row);
    }
    Table { columns, rows }
}

/// Writes the table as CSV with a header row.
pub fn export_csv(table: &Table, out_path: &Path) -> Result<(), MdsError> {
    let mut wtr = csv::Writer::from_path(out_path).map_err(|err| {
        MdsError::Serde(
            ErrorInfo::new("mds_registry.export", err.to_string())
                .with_context("path", out_path.display().to_string()),
        )
    })?;
    wtr.write_record(&table.columns)
        .map_err(|err| MdsError::Serde(ErrorInfo::new("mds_registry.export", err.to_string())))?;
    for row in &table.rows {
        wtr.write_record(row)
            .map_err(|err| MdsError::Serde(ErrorInfo::new("mds_registry.export", err.to_string())))?;
    }
    wtr.flush()
        .map_err(|err| MdsError::Serde(ErrorInfo::new("mds_registry.export", err.to_string())))
}
