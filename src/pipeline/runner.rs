//! Batch runner
//!
//! ```text
//! discover ──► [semaphore] ──► task per document:
//!                                load+extract (blocking) ──► classify (async)
//!                                ──► resolve+route (blocking) ──► outcome
//! ```

use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use walkdir::WalkDir;

use super::cancel::CancelFlag;
use super::report::{BatchReport, DocumentFailure, DocumentOutcome, DocumentReport};
use super::sender::{FixedSender, SenderSource};
use crate::classify::ClassificationClient;
use crate::clients::ClientResolver;
use crate::extract::TextExtractor;
use crate::models::{Document, Stage};
use crate::routing::FileRouter;

/// Default number of documents processed at once
pub const DEFAULT_MAX_CONCURRENT: usize = 4;

/// Batch-fatal errors. Everything else is recorded per document.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("input directory {path} is unreadable: {reason}")]
    InputUnreadable { path: String, reason: String },
}

/// Shared stage components, cloned cheaply into each worker task
#[derive(Clone)]
struct Stages {
    extractor: Arc<dyn TextExtractor>,
    classifier: Arc<ClassificationClient>,
    resolver: Arc<ClientResolver>,
    router: Arc<FileRouter>,
    dry_run: bool,
}

/// Orchestrates extraction, classification, resolution and routing
pub struct Pipeline {
    stages: Stages,
    senders: Arc<dyn SenderSource>,
    max_concurrent: usize,
    cancel: CancelFlag,
}

impl Pipeline {
    pub fn new(
        extractor: Arc<dyn TextExtractor>,
        classifier: Arc<ClassificationClient>,
        resolver: Arc<ClientResolver>,
        router: Arc<FileRouter>,
    ) -> Self {
        Self {
            stages: Stages {
                extractor,
                classifier,
                resolver,
                router,
                dry_run: false,
            },
            senders: Arc::new(FixedSender::default()),
            max_concurrent: DEFAULT_MAX_CONCURRENT,
            cancel: CancelFlag::new(),
        }
    }

    pub fn with_senders(mut self, senders: Arc<dyn SenderSource>) -> Self {
        self.senders = senders;
        self
    }

    pub fn with_max_concurrent(mut self, max_concurrent: usize) -> Self {
        self.max_concurrent = max_concurrent.max(1);
        self
    }

    /// Plan destinations without creating directories or moving files
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.stages.dry_run = dry_run;
        self
    }

    pub fn with_cancel_flag(mut self, cancel: CancelFlag) -> Self {
        self.cancel = cancel;
        self
    }

    /// Handle for cancelling a running batch
    pub fn cancel_flag(&self) -> CancelFlag {
        self.cancel.clone()
    }

    /// Process every file in `input_dir`.
    ///
    /// Fails only if the directory cannot be enumerated.
    pub async fn run(&self, input_dir: &Path) -> Result<BatchReport, PipelineError> {
        let started_at = Utc::now();
        let dir = input_dir.to_path_buf();
        let paths = tokio::task::spawn_blocking(move || discover(&dir))
            .await
            .map_err(|e| PipelineError::InputUnreadable {
                path: input_dir.display().to_string(),
                reason: e.to_string(),
            })??;

        tracing::info!(
            input = %input_dir.display(),
            documents = paths.len(),
            dry_run = self.stages.dry_run,
            "[Pipeline] Starting batch"
        );

        let semaphore = Arc::new(Semaphore::new(self.max_concurrent));
        let mut slots: Vec<Option<DocumentReport>> = vec![None; paths.len()];
        let mut in_flight = FuturesUnordered::new();

        for (index, path) in paths.iter().enumerate() {
            if self.cancel.is_cancelled() {
                slots[index] = Some(skipped(path));
                continue;
            }

            // Wait for a worker slot; cancellation may arrive meanwhile
            let permit = match Arc::clone(&semaphore).acquire_owned().await {
                Ok(permit) if !self.cancel.is_cancelled() => permit,
                _ => {
                    slots[index] = Some(skipped(path));
                    continue;
                }
            };

            let stages = self.stages.clone();
            let sender = self.senders.sender_for(path);
            let path = path.clone();
            in_flight.push(tokio::spawn(async move {
                let _permit = permit;
                let outcome = process_document(&stages, path.clone(), sender).await;
                (index, DocumentReport { path, outcome })
            }));
        }

        while !in_flight.is_empty() {
            drain_one(&mut in_flight, &mut slots).await;
        }

        let documents: Vec<DocumentReport> = slots
            .into_iter()
            .zip(paths)
            .map(|(slot, path)| {
                slot.unwrap_or_else(|| DocumentReport {
                    path,
                    outcome: DocumentOutcome::Failed {
                        stage: Stage::Discovered,
                        failure: DocumentFailure::Worker {
                            reason: "worker task did not report".to_string(),
                        },
                    },
                })
            })
            .collect();

        let report = BatchReport::new(
            input_dir.to_path_buf(),
            self.stages.dry_run,
            started_at,
            documents,
            self.cancel.is_cancelled(),
        );

        tracing::info!(
            batch = %report.batch_id,
            moved = report.summary.moved,
            planned = report.summary.planned,
            failed = report.summary.failed,
            skipped = report.summary.skipped,
            "[Pipeline] Batch complete"
        );

        Ok(report)
    }
}

type WorkerHandle = tokio::task::JoinHandle<(usize, DocumentReport)>;

/// Await the next finished worker and store its report
async fn drain_one(
    in_flight: &mut FuturesUnordered<WorkerHandle>,
    slots: &mut [Option<DocumentReport>],
) {
    match in_flight.next().await {
        Some(Ok((index, report))) => slots[index] = Some(report),
        Some(Err(e)) => {
            // The slot stays empty and is reported as a worker failure
            tracing::error!("[Pipeline] Worker task failed: {}", e);
        }
        None => {}
    }
}

fn skipped(path: &Path) -> DocumentReport {
    DocumentReport {
        path: path.to_path_buf(),
        outcome: DocumentOutcome::Skipped {
            reason: "batch cancelled before dispatch".to_string(),
        },
    }
}

/// Regular, non-hidden files directly inside `input_dir`, sorted by name
fn discover(input_dir: &Path) -> Result<Vec<PathBuf>, PipelineError> {
    let mut paths = Vec::new();

    for entry in WalkDir::new(input_dir)
        .min_depth(1)
        .max_depth(1)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) if e.depth() == 0 => {
                return Err(PipelineError::InputUnreadable {
                    path: input_dir.display().to_string(),
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!("[Pipeline] Skipping unreadable entry: {}", e);
                continue;
            }
        };

        let hidden = entry.file_name().to_string_lossy().starts_with('.');
        if hidden || !entry.file_type().is_file() {
            continue;
        }
        paths.push(entry.into_path());
    }

    Ok(paths)
}

/// Run one document through every stage
async fn process_document(stages: &Stages, path: PathBuf, sender: Option<String>) -> DocumentOutcome {
    let file = crate::models::document::file_name_of(&path);
    let outcome = run_stages(stages, Document::discovered(path, sender)).await;

    match &outcome {
        DocumentOutcome::Moved { decision, .. } => tracing::info!(
            file = %file,
            destination = %decision.destination.display(),
            "[Pipeline] Filed"
        ),
        DocumentOutcome::Planned { decision, .. } => tracing::info!(
            file = %file,
            destination = %decision.destination.display(),
            "[Pipeline] Would file"
        ),
        DocumentOutcome::Failed { stage, failure } => tracing::warn!(
            file = %file,
            stage = %stage,
            "[Pipeline] Failed: {}",
            failure
        ),
        DocumentOutcome::Skipped { .. } => {}
    }

    outcome
}

async fn run_stages(stages: &Stages, mut document: Document) -> DocumentOutcome {
    // Discovered -> TextExtracted
    let extractor = Arc::clone(&stages.extractor);
    let extracted = tokio::task::spawn_blocking(move || {
        if let Err(e) = document.load() {
            let failure = DocumentFailure::Read {
                reason: e.to_string(),
            };
            return (document, Err((Stage::Discovered, failure)));
        }
        let text = extractor
            .extract(&document)
            .map_err(|e| (Stage::TextExtracted, DocumentFailure::from(e)));
        (document, text)
    })
    .await;

    let mut document = match extracted {
        Ok((mut document, Ok(text))) => {
            document.attach_text(text);
            document
        }
        Ok((_, Err((stage, failure)))) => return DocumentOutcome::Failed { stage, failure },
        Err(e) => return worker_failed(Stage::TextExtracted, e),
    };

    // TextExtracted -> Classified
    let text = document.text.as_deref().unwrap_or_default();
    let classification = match stages.classifier.classify(text, &document.file_name()).await {
        Ok(result) => result,
        Err(e) => {
            return DocumentOutcome::Failed {
                stage: document.pending_stage(),
                failure: e.into(),
            }
        }
    };
    document.advance();

    // Classified -> Routed -> Moved
    let resolver = Arc::clone(&stages.resolver);
    let router = Arc::clone(&stages.router);
    let dry_run = stages.dry_run;
    let routed = tokio::task::spawn_blocking(move || {
        let client = resolver.resolve(
            document.sender.as_deref(),
            classification.client_first_name.as_deref(),
            classification.client_last_name.as_deref(),
        );
        let decision = if dry_run {
            router.plan(&document, &classification, &client)
        } else {
            router.route(&document, &classification, &client)
        };
        (classification, client, decision)
    })
    .await;

    match routed {
        Ok((classification, client, Ok(decision))) => {
            if dry_run {
                DocumentOutcome::Planned {
                    classification,
                    resolved_by: client.resolved_by,
                    decision,
                }
            } else {
                DocumentOutcome::Moved {
                    classification,
                    resolved_by: client.resolved_by,
                    decision,
                }
            }
        }
        Ok((_, _, Err(failure))) => DocumentOutcome::Failed {
            stage: failure.stage(),
            failure: failure.into(),
        },
        Err(e) => worker_failed(Stage::Routed, e),
    }
}

fn worker_failed(stage: Stage, err: tokio::task::JoinError) -> DocumentOutcome {
    DocumentOutcome::Failed {
        stage,
        failure: DocumentFailure::Worker {
            reason: err.to_string(),
        },
    }
}
