//! Records flowing through a run: what the service returns, what survives
//! cleaning, and what gets written out.

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// Target descriptor from a search. Fields this crate does not read are
/// carried through untouched in `extra`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetRecord {
    pub target_chembl_id: String,
    #[serde(default)]
    pub pref_name: Option<String>,
    #[serde(default)]
    pub organism: Option<String>,
    #[serde(default)]
    pub target_type: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TargetRecord {
    pub fn new(target_chembl_id: impl Into<String>) -> Self {
        Self {
            target_chembl_id: target_chembl_id.into(),
            pref_name: None,
            organism: None,
            target_type: None,
            score: None,
            extra: Map::new(),
        }
    }
}

/// Ordered search result. Order is whatever the service returned.
#[derive(Debug, Clone, PartialEq)]
pub struct TargetCandidates {
    pub query: String,
    pub targets: Vec<TargetRecord>,
}

impl TargetCandidates {
    pub fn new(query: impl Into<String>, targets: Vec<TargetRecord>) -> Self {
        Self { query: query.into(), targets }
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// `(index, target)` pairs, for presenting the choice to a caller.
    pub fn enumerate(&self) -> impl Iterator<Item = (usize, &TargetRecord)> {
        self.targets.iter().enumerate()
    }
}

/// One raw activity measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssayRecord {
    /// Empty when upstream omits it or sends null; such rows are excluded.
    #[serde(default, deserialize_with = "null_as_empty")]
    pub molecule_chembl_id: String,
    #[serde(default)]
    pub canonical_smiles: Option<String>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub standard_type: String,
    /// Kept as text; upstream sends strings, occasionally bare numbers.
    #[serde(default, deserialize_with = "text_or_number")]
    pub standard_value: Option<String>,
    #[serde(default)]
    pub standard_units: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssayRecord {
    pub fn new(
        molecule_chembl_id: impl Into<String>,
        standard_type: impl Into<String>,
        standard_value: Option<&str>,
    ) -> Self {
        Self {
            molecule_chembl_id: molecule_chembl_id.into(),
            canonical_smiles: None,
            standard_type: standard_type.into(),
            standard_value: standard_value.map(String::from),
            standard_units: None,
            extra: Map::new(),
        }
    }

    pub fn with_smiles(mut self, smiles: &str) -> Self {
        self.canonical_smiles = Some(smiles.to_string());
        self
    }

    pub fn with_units(mut self, units: &str) -> Self {
        self.standard_units = Some(units.to_string());
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

fn text_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// `{molecule_chembl_id, canonical_smiles, standard_value}` selection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProjectedRecord {
    pub molecule_chembl_id: String,
    pub canonical_smiles: Option<String>,
    pub standard_value: Option<String>,
}

/// Activity tier derived from potency (nM).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BioactivityClass {
    Active,
    Intermediate,
    Inactive,
}

impl BioactivityClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            BioactivityClass::Active => "active",
            BioactivityClass::Intermediate => "intermediate",
            BioactivityClass::Inactive => "inactive",
        }
    }
}

impl fmt::Display for BioactivityClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Output row. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabeledRecord {
    pub molecule_chembl_id: String,
    pub canonical_smiles: Option<String>,
    /// As reported upstream; the parsed number only drives `bioactivity_class`.
    pub standard_value: String,
    pub bioactivity_class: BioactivityClass,
}

/// Why a raw record did not make it into the labeled table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    MissingMoleculeId,
    MissingValue,
    Unparseable,
    NonFinite,
    Negative,
    AssayTypeMismatch,
    UnitMismatch,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ExclusionReason::MissingMoleculeId => "missing molecule_chembl_id",
            ExclusionReason::MissingValue => "missing standard_value",
            ExclusionReason::Unparseable => "unparseable standard_value",
            ExclusionReason::NonFinite => "non-finite standard_value",
            ExclusionReason::Negative => "negative standard_value",
            ExclusionReason::AssayTypeMismatch => "standard_type mismatch",
            ExclusionReason::UnitMismatch => "standard_units mismatch",
        };
        f.write_str(s)
    }
}

/// Result of screening a single raw record.
#[derive(Debug, Clone, PartialEq)]
pub enum Screened {
    Included(LabeledRecord),
    Excluded(ExclusionReason),
}
