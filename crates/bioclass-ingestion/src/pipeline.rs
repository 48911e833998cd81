//! Retrieval, cleaning and classification of bioactivity records.
//!
//! Flow for one target and one assay type:
//!   1. Fetch raw activities from the service (exact `standard_type` match)
//!   2. Screen every record in a single pass:
//!      - `molecule_chembl_id` must be present
//!      - `standard_type` must equal the requested type
//!      - `standard_units`, when reported, must be nM
//!      - `standard_value` must parse as a finite, non-negative number
//!   3. Classify survivors against the two potency thresholds
//!
//! Record order is preserved end to end. Bad rows are counted and dropped,
//! never surfaced as run failures; an empty table is a valid result.

use std::collections::BTreeMap;
use std::sync::Arc;

use bioclass_common::Result;
use tracing::{debug, info, instrument, warn};

use crate::models::{
    AssayRecord, BioactivityClass, ExclusionReason, LabeledRecord, ProjectedRecord, Screened,
};
use crate::sources::BioactivityService;

/// At or below this potency (nM) a compound is active.
pub const ACTIVE_MAX_NM: f64 = 1_000.0;

/// At or above this potency (nM) a compound is inactive.
pub const INACTIVE_MIN_NM: f64 = 10_000.0;

/// The only unit the thresholds are meaningful for.
pub const POTENCY_UNITS: &str = "nM";

// ── Result types ──────────────────────────────────────────────────────────────

/// Labeled rows plus a tally of what was dropped and why.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LabelingReport {
    pub records: Vec<LabeledRecord>,
    pub excluded: BTreeMap<ExclusionReason, usize>,
}

impl LabelingReport {
    pub fn excluded_total(&self) -> usize {
        self.excluded.values().sum()
    }

    pub fn class_counts(&self) -> BTreeMap<BioactivityClass, usize> {
        let mut counts = BTreeMap::new();
        for r in &self.records {
            *counts.entry(r.bioactivity_class).or_insert(0) += 1;
        }
        counts
    }
}

/// Everything one pipeline run produced.
#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub target_id: String,
    pub assay_type: String,
    /// The unfiltered fetch, for the optional raw checkpoint.
    pub raw: Vec<AssayRecord>,
    pub report: LabelingReport,
}

// ── Pipeline ──────────────────────────────────────────────────────────────────

pub struct BioactivityPipeline {
    service: Arc<dyn BioactivityService>,
}

impl BioactivityPipeline {
    pub fn new(service: Arc<dyn BioactivityService>) -> Self {
        Self { service }
    }

    /// Raw activities for `target_id` whose type matches `assay_type`.
    /// Empty is fine; transport failures are not.
    #[instrument(skip(self))]
    pub async fn fetch_assays(&self, target_id: &str, assay_type: &str) -> Result<Vec<AssayRecord>> {
        let records = self.service.filter_assays(target_id, assay_type).await?;
        if records.is_empty() {
            warn!(target = target_id, assay_type = assay_type, "No activities for target");
        }
        Ok(records)
    }

    /// Fetch and label, keeping the raw fetch alongside.
    #[instrument(skip(self))]
    pub async fn run(&self, target_id: &str, assay_type: &str) -> Result<PipelineRun> {
        let raw = self.fetch_assays(target_id, assay_type).await?;
        let report = label_assays(&raw, assay_type);

        info!(
            target = target_id,
            fetched = raw.len(),
            labeled = report.records.len(),
            excluded = report.excluded_total(),
            "Bioactivity pipeline complete"
        );
        for (reason, n) in &report.excluded {
            debug!(reason = %reason, count = n, "Excluded records");
        }
        for (class, n) in report.class_counts() {
            info!(class = %class, count = n, "Class count");
        }

        Ok(PipelineRun {
            target_id: target_id.to_string(),
            assay_type: assay_type.to_string(),
            raw,
            report,
        })
    }

    /// The labeled table for one target, in fetch order.
    pub async fn build_labeled_table(&self, target_id: &str, assay_type: &str) -> Result<Vec<LabeledRecord>> {
        Ok(self.run(target_id, assay_type).await?.report.records)
    }
}

// ── Cleaning ──────────────────────────────────────────────────────────────────

/// Explicit potency parse. Whitespace is trimmed; nothing is coerced.
pub fn parse_potency(raw: Option<&str>) -> std::result::Result<f64, ExclusionReason> {
    let text = raw.map(str::trim).unwrap_or_default();
    if text.is_empty() {
        return Err(ExclusionReason::MissingValue);
    }
    let value: f64 = text.parse().map_err(|_| ExclusionReason::Unparseable)?;
    if !value.is_finite() {
        return Err(ExclusionReason::NonFinite);
    }
    if value < 0.0 {
        return Err(ExclusionReason::Negative);
    }
    Ok(value)
}

/// Stable filter keeping records with a usable potency. Idempotent.
pub fn drop_missing_potency(records: &[AssayRecord]) -> Vec<AssayRecord> {
    records
        .iter()
        .filter(|r| parse_potency(r.standard_value.as_deref()).is_ok())
        .cloned()
        .collect()
}

/// Field selection, order-preserving.
pub fn project(records: &[AssayRecord]) -> Vec<ProjectedRecord> {
    records
        .iter()
        .map(|r| ProjectedRecord {
            molecule_chembl_id: r.molecule_chembl_id.clone(),
            canonical_smiles: r.canonical_smiles.clone(),
            standard_value: r.standard_value.clone(),
        })
        .collect()
}

// ── Classification ────────────────────────────────────────────────────────────

/// Three-way threshold rule on a potency in nM.
///
/// `>= 10000` is checked first, then `<= 1000`; both boundaries are closed,
/// so exactly 1000 is active and exactly 10000 is inactive.
pub fn classify(value: f64) -> BioactivityClass {
    if value >= INACTIVE_MIN_NM {
        BioactivityClass::Inactive
    } else if value <= ACTIVE_MAX_NM {
        BioactivityClass::Active
    } else {
        BioactivityClass::Intermediate
    }
}

/// Single-pass check and label of one raw record.
pub fn screen(record: &AssayRecord, assay_type: &str) -> Screened {
    if record.molecule_chembl_id.trim().is_empty() {
        return Screened::Excluded(ExclusionReason::MissingMoleculeId);
    }
    if record.standard_type != assay_type {
        return Screened::Excluded(ExclusionReason::AssayTypeMismatch);
    }
    if let Some(units) = record.standard_units.as_deref() {
        if units != POTENCY_UNITS {
            return Screened::Excluded(ExclusionReason::UnitMismatch);
        }
    }
    match parse_potency(record.standard_value.as_deref()) {
        Ok(value) => Screened::Included(LabeledRecord {
            molecule_chembl_id: record.molecule_chembl_id.clone(),
            canonical_smiles: record.canonical_smiles.clone(),
            standard_value: record.standard_value.clone().unwrap_or_default(),
            bioactivity_class: classify(value),
        }),
        Err(reason) => Screened::Excluded(reason),
    }
}

/// Screen a whole fetch, keeping included rows in order.
pub fn label_assays(records: &[AssayRecord], assay_type: &str) -> LabelingReport {
    let mut report = LabelingReport::default();
    for record in records {
        match screen(record, assay_type) {
            Screened::Included(labeled) => report.records.push(labeled),
            Screened::Excluded(reason) => *report.excluded.entry(reason).or_insert(0) += 1,
        }
    }
    report
}

// ── Tests ─────────────────────────────────────────────────────────────────────
