//! Run configuration for a retrieval-filter-classify job.
//!
//! Read from a TOML or YAML file (path from `--config` or `BIOCLASS_CONFIG`);
//! every field has a default so a partial file is fine. Command-line flags
//! are applied on top by the binary.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{BioclassError, Result};

/// Env var holding the config file path.
pub const CONFIG_ENV_VAR: &str = "BIOCLASS_CONFIG";

/// Public ChEMBL web services root.
pub const CHEMBL_API_URL: &str = "https://www.ebi.ac.uk/chembl/api/data";

/// Upper bound ChEMBL accepts for `limit`.
pub const MAX_PAGE_SIZE: usize = 1000;

/// Complete run configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RunConfig {
    #[serde(default)]
    pub chembl: ChemblConfig,

    #[serde(default)]
    pub query: QueryConfig,

    #[serde(default)]
    pub output: OutputConfig,
}

// ── Remote service ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChemblConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Records requested per page
    #[serde(default = "default_page_size")]
    pub page_size: usize,

    /// Per-request timeout handed to the HTTP client
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String { CHEMBL_API_URL.to_string() }
fn default_page_size() -> usize { MAX_PAGE_SIZE }
fn default_timeout_secs() -> u64 { 30 }

impl Default for ChemblConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            page_size: default_page_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

// ── Query ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueryConfig {
    /// Free-text organism/protein query (e.g., "coronavirus")
    #[serde(default = "default_target_query")]
    pub target_query: String,

    /// Position in the search results. No default: the caller picks.
    #[serde(default)]
    pub target_index: Option<usize>,

    /// Upstream `standard_type` vocabulary (e.g., "IC50")
    #[serde(default = "default_assay_type")]
    pub assay_type: String,
}

fn default_target_query() -> String { "coronavirus".to_string() }
fn default_assay_type() -> String { "IC50".to_string() }

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            target_query: default_target_query(),
            target_index: None,
            assay_type: default_assay_type(),
        }
    }
}

// ── Output ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OutputConfig {
    #[serde(default = "default_output_dir")]
    pub dir: PathBuf,

    #[serde(default = "default_raw_file")]
    pub raw_file: String,

    #[serde(default = "default_labeled_file")]
    pub labeled_file: String,

    /// Write the unfiltered fetch before classification
    #[serde(default = "default_true")]
    pub write_raw_checkpoint: bool,

    /// Durable storage directory the finished tables are copied into
    #[serde(default)]
    pub persist_dir: Option<PathBuf>,
}

fn default_output_dir() -> PathBuf { PathBuf::from(".") }
fn default_raw_file() -> String { "bioactivity_data.csv".to_string() }
fn default_labeled_file() -> String { "bioactivity_preprocessed_data.csv".to_string() }
fn default_true() -> bool { true }

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: default_output_dir(),
            raw_file: default_raw_file(),
            labeled_file: default_labeled_file(),
            write_raw_checkpoint: true,
            persist_dir: None,
        }
    }
}

impl OutputConfig {
    pub fn raw_path(&self) -> PathBuf {
        self.dir.join(&self.raw_file)
    }

    pub fn labeled_path(&self) -> PathBuf {
        self.dir.join(&self.labeled_file)
    }
}

// ── Helper Methods ─────────────────────────────────────────────────────────────

impl RunConfig {
    /// Load from TOML file
    pub fn from_toml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| BioclassError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load from YAML file
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        serde_yaml::from_str(&content)
            .map_err(|e| BioclassError::Config(format!("{}: {}", path.display(), e)))
    }

    /// Load by extension: `.yaml`/`.yml` as YAML, anything else as TOML.
    pub fn load(path: &Path) -> Result<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(path),
            _ => Self::from_toml(path),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.query.target_query.trim().is_empty() {
            return Err(BioclassError::Config("target_query must not be empty".into()));
        }
        if self.query.assay_type.trim().is_empty() {
            return Err(BioclassError::Config("assay_type must not be empty".into()));
        }
        if self.chembl.page_size == 0 || self.chembl.page_size > MAX_PAGE_SIZE {
            return Err(BioclassError::Config(format!(
                "page_size must be between 1 and {}, got {}",
                MAX_PAGE_SIZE, self.chembl.page_size
            )));
        }
        url::Url::parse(&self.chembl.base_url).map_err(|e| {
            BioclassError::Config(format!("Invalid base_url '{}': {}", self.chembl.base_url, e))
        })?;
        Ok(())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
