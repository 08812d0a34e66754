//! Filing Pipeline
//!
//! Drives each document through
//! `Discovered → TextExtracted → Classified → Routed → Moved`, or into
//! `Failed(stage, reason)`. Documents are independent; a failure is recorded
//! and the batch carries on. Only an unreadable input directory aborts.

mod cancel;
mod report;
mod runner;
mod sender;


pub use cancel::CancelFlag;
pub use report::{BatchReport, BatchSummary, DocumentFailure, DocumentOutcome, DocumentReport};
pub use runner::{Pipeline, PipelineError, DEFAULT_MAX_CONCURRENT};
pub use sender::{FixedSender, ManifestSender, SenderManifestError, SenderSource, SENDER_MANIFEST};
