use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Lifecycle stage of a document inside the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Found in the input directory
    Discovered,
    /// Text has been extracted
    TextExtracted,
    /// Classifier returned a validated result
    Classified,
    /// Destination directory and file name are settled
    Routed,
    /// File relocated (terminal success)
    Moved,
}

impl Stage {
    /// The stage that follows this one, if any
    pub fn next(self) -> Option<Stage> {
        match self {
            Stage::Discovered => Some(Stage::TextExtracted),
            Stage::TextExtracted => Some(Stage::Classified),
            Stage::Classified => Some(Stage::Routed),
            Stage::Routed => Some(Stage::Moved),
            Stage::Moved => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Discovered => "Discovered",
            Stage::TextExtracted => "TextExtracted",
            Stage::Classified => "Classified",
            Stage::Routed => "Routed",
            Stage::Moved => "Moved",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An input attachment threaded through the pipeline.
///
/// Owned by exactly one worker task; each stage attaches its output here.
#[derive(Debug, Clone)]
pub struct Document {
    /// Source path, also the document's identity in the batch report
    pub path: PathBuf,
    /// Raw file contents (empty until loaded)
    pub bytes: Vec<u8>,
    /// Extracted text, set once extraction succeeds
    pub text: Option<String>,
    /// Originating address supplied by the attachment collaborator
    pub sender: Option<String>,
    stage: Stage,
}

impl Document {
    /// Create a document freshly discovered in the input set
    pub fn discovered(path: PathBuf, sender: Option<String>) -> Self {
        Self {
            path,
            bytes: Vec::new(),
            text: None,
            sender,
            stage: Stage::Discovered,
        }
    }

    /// Read the raw bytes from disk
    pub fn load(&mut self) -> std::io::Result<()> {
        self.bytes = std::fs::read(&self.path)?;
        Ok(())
    }

    /// Original file name (lossy for non-UTF-8 names)
    pub fn file_name(&self) -> String {
        file_name_of(&self.path)
    }

    /// Lowercase file extension without the dot
    pub fn extension(&self) -> Option<String> {
        self.path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
    }

    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Move to the next lifecycle stage
    pub fn advance(&mut self) {
        if let Some(next) = self.stage.next() {
            self.stage = next;
        }
    }

    /// The stage currently being attempted (what a failure is charged to)
    pub fn pending_stage(&self) -> Stage {
        self.stage.next().unwrap_or(Stage::Moved)
    }

    /// Attach extracted text and advance past extraction
    pub fn attach_text(&mut self, text: String) {
        self.text = Some(text);
        // Raw bytes are no longer needed once text exists
        self.bytes = Vec::new();
        self.advance();
    }
}

pub(crate) fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}
