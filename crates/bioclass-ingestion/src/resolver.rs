//! Target search and positional selection.

use std::sync::Arc;

use bioclass_common::{BioclassError, Result};
use tracing::{info, instrument};

use crate::models::{TargetCandidates, TargetRecord};
use crate::sources::BioactivityService;

pub struct TargetResolver {
    service: Arc<dyn BioactivityService>,
}

impl TargetResolver {
    pub fn new(service: Arc<dyn BioactivityService>) -> Self {
        Self { service }
    }

    /// Search for targets. Zero hits is an error: the next step needs a
    /// concrete position to exist.
    #[instrument(skip(self))]
    pub async fn search(&self, query: &str) -> Result<TargetCandidates> {
        let targets = self.service.search_targets(query).await?;
        if targets.is_empty() {
            return Err(BioclassError::EmptyResult { query: query.to_string() });
        }
        info!(query = query, n_candidates = targets.len(), "Resolved target candidates");
        Ok(TargetCandidates::new(query, targets))
    }

    /// Bounds-checked pick. Never clamps.
    pub fn select(candidates: &TargetCandidates, index: usize) -> Result<TargetRecord> {
        if candidates.is_empty() {
            return Err(BioclassError::EmptyResult { query: candidates.query.clone() });
        }
        candidates
            .targets
            .get(index)
            .cloned()
            .ok_or(BioclassError::IndexOutOfRange { index, len: candidates.len() })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use crate::models::AssayRecord;

    struct StaticTargets(Vec<TargetRecord>);

    #[async_trait]
    impl BioactivityService for StaticTargets {
        async fn search_targets(&self, _query: &str) -> Result<Vec<TargetRecord>> {
            Ok(self.0.clone())
        }

        async fn filter_assays(&self, _target_id: &str, _standard_type: &str) -> Result<Vec<AssayRecord>> {
            Ok(Vec::new())
        }
    }

    fn three() -> TargetCandidates {
        TargetCandidates::new(
            "coronavirus",
            vec![
                TargetRecord::new("CHEMBL612575"),
                TargetRecord::new("CHEMBL5118"),
                TargetRecord::new("CHEMBL3927"),
            ],
        )
    }

    #[test]
    fn test_select_in_range() {
        let target = TargetResolver::select(&three(), 2).unwrap();
        assert_eq!(target.target_chembl_id, "CHEMBL3927");
    }

    #[test]
    fn test_select_out_of_range() {
        let err = TargetResolver::select(&three(), 7).unwrap_err();
        assert!(matches!(err, BioclassError::IndexOutOfRange { index: 7, len: 3 }));

        let err = TargetResolver::select(&three(), 3).unwrap_err();
        assert!(matches!(err, BioclassError::IndexOutOfRange { index: 3, len: 3 }));
    }

    #[test]
    fn test_select_on_empty_is_empty_result() {
        let empty = TargetCandidates::new("nothing", vec![]);
        let err = TargetResolver::select(&empty, 0).unwrap_err();
        assert!(matches!(err, BioclassError::EmptyResult { ref query } if query == "nothing"));
    }

    #[tokio::test]
    async fn test_search_empty_is_error() {
        let resolver = TargetResolver::new(Arc::new(StaticTargets(vec![])));
        let err = resolver.search("zzz").await.unwrap_err();
        assert!(matches!(err, BioclassError::EmptyResult { .. }));
    }

    #[tokio::test]
    async fn test_search_preserves_service_order() {
        let resolver = TargetResolver::new(Arc::new(StaticTargets(three().targets)));
        let candidates = resolver.search("coronavirus").await.unwrap();
        assert_eq!(candidates, three());
    }
}
