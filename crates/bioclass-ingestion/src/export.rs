//! CSV output and hand-off to durable storage.
//!
//! Two tables:
//!   - raw checkpoint: every fetched record, core columns first, then the
//!     union of passthrough fields in first-seen order
//!   - labeled table: `molecule_chembl_id,canonical_smiles,standard_value,bioactivity_class`
//!
//! Headers are always written, so an empty run still yields a valid file.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use bioclass_common::{BioclassError, Result};
use serde_json::Value;
use tracing::{info, instrument};

use crate::models::{AssayRecord, LabeledRecord};

pub const LABELED_HEADER: [&str; 4] = [
    "molecule_chembl_id",
    "canonical_smiles",
    "standard_value",
    "bioactivity_class",
];

pub const RAW_CORE_HEADER: [&str; 5] = [
    "molecule_chembl_id",
    "canonical_smiles",
    "standard_value",
    "standard_type",
    "standard_units",
];

// ── Writers ───────────────────────────────────────────────────────────────────

pub fn write_labeled_table(path: &Path, records: &[LabeledRecord]) -> Result<()> {
    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(LABELED_HEADER)?;
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = records.len(), "Wrote labeled table");
    Ok(())
}

pub fn write_raw_checkpoint(path: &Path, records: &[AssayRecord]) -> Result<()> {
    let extra_columns = passthrough_columns(records);

    let mut writer = csv::WriterBuilder::new().has_headers(false).from_path(path)?;
    writer.write_record(
        RAW_CORE_HEADER
            .iter()
            .copied()
            .chain(extra_columns.iter().map(String::as_str)),
    )?;

    for record in records {
        let mut row: Vec<String> = vec![
            record.molecule_chembl_id.clone(),
            record.canonical_smiles.clone().unwrap_or_default(),
            record.standard_value.clone().unwrap_or_default(),
            record.standard_type.clone(),
            record.standard_units.clone().unwrap_or_default(),
        ];
        row.extend(extra_columns.iter().map(|col| cell(record.extra.get(col))));
        writer.write_record(&row)?;
    }
    writer.flush()?;
    info!(
        path = %path.display(),
        rows = records.len(),
        columns = RAW_CORE_HEADER.len() + extra_columns.len(),
        "Wrote raw checkpoint"
    );
    Ok(())
}

/// Union of passthrough keys across records, first-seen order.
fn passthrough_columns(records: &[AssayRecord]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for record in records {
        for key in record.extra.keys() {
            if !columns.iter().any(|c| c == key) {
                columns.push(key.clone());
            }
        }
    }
    columns
}

fn cell(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

// ── Durable storage ───────────────────────────────────────────────────────────

/// Somewhere finished tables are copied to. Failures are reported, never retried.
#[async_trait]
pub trait DurableStore: Send + Sync {
    /// Persist the table at `table`, returning where it landed.
    async fn persist(&self, table: &Path) -> Result<PathBuf>;
}

/// A directory, typically on a mounted external drive.
#[derive(Debug, Clone)]
pub struct DirectoryStore {
    root: PathBuf,
}

impl DirectoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl DurableStore for DirectoryStore {
    #[instrument(skip(self), fields(root = %self.root.display()))]
    async fn persist(&self, table: &Path) -> Result<PathBuf> {
        let file_name = table.file_name().ok_or_else(|| {
            BioclassError::Config(format!("Table path {:?} has no file name", table))
        })?;
        let destination = self.root.join(file_name);

        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(|source| BioclassError::Persist { path: self.root.clone(), source })?;
        tokio::fs::copy(table, &destination)
            .await
            .map_err(|source| BioclassError::Persist { path: destination.clone(), source })?;

        info!(destination = %destination.display(), "Persisted table");
        Ok(destination)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
