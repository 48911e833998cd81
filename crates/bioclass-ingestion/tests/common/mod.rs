//! In-memory bioactivity service for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bioclass_common::{BioclassError, Result};
use bioclass_ingestion::{AssayRecord, BioactivityService, TargetRecord};

#[derive(Default)]
pub struct FakeService {
    pub targets: Vec<TargetRecord>,
    pub assays: Vec<AssayRecord>,
    pub fail_search: bool,
    pub fail_assays: bool,
    pub search_calls: AtomicUsize,
    pub assay_calls: AtomicUsize,
    /// `(target_id, standard_type)` of every assay request, in order.
    pub assay_requests: Mutex<Vec<(String, String)>>,
}

impl FakeService {
    pub fn with_targets(ids: &[&str]) -> Self {
        Self {
            targets: ids.iter().map(|id| TargetRecord::new(*id)).collect(),
            ..Default::default()
        }
    }

    pub fn assays(mut self, assays: Vec<AssayRecord>) -> Self {
        self.assays = assays;
        self
    }

    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::SeqCst)
    }

    pub fn assay_calls(&self) -> usize {
        self.assay_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl BioactivityService for FakeService {
    async fn search_targets(&self, _query: &str) -> Result<Vec<TargetRecord>> {
        self.search_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_search {
            return Err(BioclassError::UpstreamUnavailable("connection refused".into()));
        }
        Ok(self.targets.clone())
    }

    async fn filter_assays(&self, target_id: &str, standard_type: &str) -> Result<Vec<AssayRecord>> {
        self.assay_calls.fetch_add(1, Ordering::SeqCst);
        self.assay_requests
            .lock()
            .unwrap()
            .push((target_id.to_string(), standard_type.to_string()));
        if self.fail_assays {
            return Err(BioclassError::UpstreamUnavailable("HTTP 503".into()));
        }
        Ok(self.assays.clone())
    }
}

pub fn ic50(id: &str, value: Option<&str>) -> AssayRecord {
    AssayRecord::new(id, "IC50", value).with_units("nM")
}
