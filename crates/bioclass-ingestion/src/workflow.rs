//! One complete run: search, select, fetch, label.
//!
//! Calls are awaited strictly in sequence; the assay fetch only starts once
//! a target has been selected.

use std::sync::Arc;

use bioclass_common::Result;
use tracing::{info, instrument};

use crate::models::TargetRecord;
use crate::pipeline::{BioactivityPipeline, PipelineRun};
use crate::resolver::TargetResolver;
use crate::sources::BioactivityService;

#[derive(Debug, Clone)]
pub struct LabeledTarget {
    pub target: TargetRecord,
    pub run: PipelineRun,
}

#[instrument(skip(service))]
pub async fn label_target(
    service: Arc<dyn BioactivityService>,
    query: &str,
    index: usize,
    assay_type: &str,
) -> Result<LabeledTarget> {
    let resolver = TargetResolver::new(service.clone());
    let candidates = resolver.search(query).await?;
    let target = TargetResolver::select(&candidates, index)?;

    info!(
        index = index,
        target = %target.target_chembl_id,
        name = target.pref_name.as_deref().unwrap_or(""),
        "Selected target"
    );

    let pipeline = BioactivityPipeline::new(service);
    let run = pipeline.run(&target.target_chembl_id, assay_type).await?;
    Ok(LabeledTarget { target, run })
}
