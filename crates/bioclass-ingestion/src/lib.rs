//! bioclass-ingestion — Bioactivity retrieval and labeling.
//! - Target search and deliberate positional selection
//! - Assay fetch for one target and one potency type (ChEMBL)
//! - Potency cleaning and three-tier activity classification
//! - CSV export and hand-off to durable storage

pub mod export;
pub mod models;
pub mod pipeline;
pub mod resolver;
pub mod sources;
pub mod workflow;

pub use models::{
    AssayRecord, BioactivityClass, ExclusionReason, LabeledRecord, ProjectedRecord,
    TargetCandidates, TargetRecord,
};
pub use pipeline::{BioactivityPipeline, LabelingReport, PipelineRun};
pub use resolver::TargetResolver;
pub use sources::BioactivityService;
