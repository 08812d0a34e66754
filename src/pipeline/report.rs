//! Batch report
//!
//! Every discovered document ends in exactly one outcome.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::classify::{ClassificationFailure, ClassificationResult};
use crate::clients::ResolvedBy;
use crate::extract::ExtractionFailure;
use crate::models::Stage;
use crate::routing::{RoutingDecision, RoutingFailure};

/// Any per-document failure the pipeline records
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DocumentFailure {
    #[error("failed to read source file: {reason}")]
    Read { reason: String },
    #[error(transparent)]
    Extraction(#[from] ExtractionFailure),
    #[error(transparent)]
    Classification(#[from] ClassificationFailure),
    #[error(transparent)]
    Routing(#[from] RoutingFailure),
    /// The worker task itself died
    #[error("worker task failed: {reason}")]
    Worker { reason: String },
}

/// Terminal state of one document
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum DocumentOutcome {
    Moved {
        classification: ClassificationResult,
        resolved_by: ResolvedBy,
        decision: RoutingDecision,
    },
    /// Dry run: where the document would have gone
    Planned {
        classification: ClassificationResult,
        resolved_by: ResolvedBy,
        decision: RoutingDecision,
    },
    Failed {
        stage: Stage,
        failure: DocumentFailure,
    },
    /// Never dispatched (batch cancelled)
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentReport {
    pub path: PathBuf,
    pub outcome: DocumentOutcome,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub total: usize,
    pub moved: usize,
    pub planned: usize,
    pub failed: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub batch_id: Uuid,
    pub input_dir: PathBuf,
    pub dry_run: bool,
    pub cancelled: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub summary: BatchSummary,
    /// In input order (sorted by file name)
    pub documents: Vec<DocumentReport>,
}

impl BatchReport {
    pub(crate) fn new(
        input_dir: PathBuf,
        dry_run: bool,
        started_at: DateTime<Utc>,
        documents: Vec<DocumentReport>,
        cancelled: bool,
    ) -> Self {
        let mut summary = BatchSummary {
            total: documents.len(),
            ..BatchSummary::default()
        };
        for doc in &documents {
            match doc.outcome {
                DocumentOutcome::Moved { .. } => summary.moved += 1,
                DocumentOutcome::Planned { .. } => summary.planned += 1,
                DocumentOutcome::Failed { .. } => summary.failed += 1,
                DocumentOutcome::Skipped { .. } => summary.skipped += 1,
            }
        }

        Self {
            batch_id: Uuid::new_v4(),
            input_dir,
            dry_run,
            cancelled,
            started_at,
            finished_at: Utc::now(),
            summary,
            documents,
        }
    }

    /// Documents that ended in failure
    pub fn failures(&self) -> impl Iterator<Item = (&DocumentReport, Stage, &DocumentFailure)> {
        self.documents.iter().filter_map(|doc| match &doc.outcome {
            DocumentOutcome::Failed { stage, failure } => Some((doc, *stage, failure)),
            _ => None,
        })
    }

    pub fn outcome_for(&self, file_name: &str) -> Option<&DocumentOutcome> {
        self.documents
            .iter()
            .find(|d| d.path.file_name().is_some_and(|n| n == file_name))
            .map(|d| &d.outcome)
    }
}
