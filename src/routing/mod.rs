//! File Routing
//!
//! Computes where a classified document belongs and relocates it there.
//!
//! ## Guarantees
//! - Destination paths are built only from sanitized components
//! - Existing files are never overwritten (see [`CollisionPolicy`])
//! - A document is never in zero places: cross-device moves copy, verify,
//!   and only then remove the source

pub mod checksum;
mod router;
pub mod sanitize;

pub use router::FileRouter;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::models::Stage;

/// What to do when the destination file name is already taken
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollisionPolicy {
    /// Append `_1`, `_2`, ... before the extension
    #[default]
    Suffix,
    /// Fail the document with `DestinationExists`
    Reject,
}

impl std::str::FromStr for CollisionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "suffix" => Ok(Self::Suffix),
            "reject" => Ok(Self::Reject),
            other => Err(format!("unknown collision policy '{}' (expected suffix or reject)", other)),
        }
    }
}

/// How the file reached its destination
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveStrategy {
    /// Single atomic rename
    Rename,
    /// Copy, checksum verification, then source removal
    CopyVerified,
}

/// Where a document goes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutingDecision {
    pub client_folder: PathBuf,
    pub destination_dir: PathBuf,
    pub destination: PathBuf,
    /// The collision policy changed the file name
    pub renamed: bool,
    /// `None` when the decision was only planned
    pub strategy: Option<MoveStrategy>,
}

/// Why a document could not be routed
#[derive(Debug, Clone, PartialEq, Serialize, thiserror::Error)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoutingFailure {
    #[error("failed to create directory {path}: {reason}")]
    DirectoryCreateError { path: String, reason: String },
    #[error("destination already exists: {path}")]
    DestinationExists { path: String },
    #[error("failed to move {from} to {to}: {reason}")]
    MoveError {
        from: String,
        to: String,
        reason: String,
    },
}

impl RoutingFailure {
    /// Lifecycle stage the failure is charged to
    pub fn stage(&self) -> Stage {
        match self {
            Self::DirectoryCreateError { .. } | Self::DestinationExists { .. } => Stage::Routed,
            Self::MoveError { .. } => Stage::Moved,
        }
    }
}
