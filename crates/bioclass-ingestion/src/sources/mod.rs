//! Remote bioactivity data services.

pub mod chembl;

use async_trait::async_trait;
use bioclass_common::Result;

use crate::models::{AssayRecord, TargetRecord};

/// The two read operations a run depends on.
#[async_trait]
pub trait BioactivityService: Send + Sync {
    /// Targets matching a free-text query, in service order.
    async fn search_targets(&self, query: &str) -> Result<Vec<TargetRecord>>;

    /// Activities for one target, filtered by exact `standard_type`.
    async fn filter_assays(&self, target_id: &str, standard_type: &str) -> Result<Vec<AssayRecord>>;
}
