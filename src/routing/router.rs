//! File Router
//!
//! Blocking filesystem work; callers on the async runtime should run it
//! inside `spawn_blocking`.

use dashmap::DashMap;
use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::checksum::contents_match;
use super::sanitize::{sanitize_file_name, sanitize_folder_path};
use super::{CollisionPolicy, MoveStrategy, RoutingDecision, RoutingFailure};
use crate::classify::ClassificationResult;
use crate::clients::ClientFolder;
use crate::models::Document;

/// Attempts at claiming a free name before giving up on a destination
const MAX_CLAIM_ATTEMPTS: usize = 16;

/// Computes destinations and moves documents into client folders
#[derive(Debug, Default)]
pub struct FileRouter {
    policy: CollisionPolicy,
    /// One lock per destination directory (case-folded); collision checks
    /// and moves into the same directory never interleave
    dir_locks: DashMap<PathBuf, Arc<Mutex<()>>>,
}

impl FileRouter {
    pub fn new(policy: CollisionPolicy) -> Self {
        Self {
            policy,
            dir_locks: DashMap::new(),
        }
    }

    /// Create the destination directory and move the document into it
    pub fn route(
        &self,
        document: &Document,
        classification: &ClassificationResult,
        client: &ClientFolder,
    ) -> Result<RoutingDecision, RoutingFailure> {
        let (destination_dir, requested) = self.destination_for(document, classification, client);

        fs::create_dir_all(&destination_dir).map_err(|e| RoutingFailure::DirectoryCreateError {
            path: destination_dir.display().to_string(),
            reason: e.to_string(),
        })?;

        let lock = self.lock_for(&destination_dir);
        let _guard = lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());

        let destination = self.claim_destination(&document.path, &requested)?;
        let strategy = match move_file(&document.path, &destination) {
            Ok(strategy) => strategy,
            Err(e) => {
                // Only the placeholder or our own copy can be here
                let _ = fs::remove_file(&destination);
                return Err(e);
            }
        };

        tracing::info!(
            file = %document.file_name(),
            destination = %destination.display(),
            strategy = ?strategy,
            "[Router] Moved"
        );

        Ok(RoutingDecision {
            client_folder: client.path.clone(),
            destination_dir,
            renamed: destination != requested,
            destination,
            strategy: Some(strategy),
        })
    }

    /// Compute the decision `route` would make right now, touching nothing
    pub fn plan(
        &self,
        document: &Document,
        classification: &ClassificationResult,
        client: &ClientFolder,
    ) -> Result<RoutingDecision, RoutingFailure> {
        let (destination_dir, requested) = self.destination_for(document, classification, client);
        let destination = self.resolve_collision(&requested)?;

        Ok(RoutingDecision {
            client_folder: client.path.clone(),
            destination_dir,
            renamed: destination != requested,
            destination,
            strategy: None,
        })
    }

    fn destination_for(
        &self,
        document: &Document,
        classification: &ClassificationResult,
        client: &ClientFolder,
    ) -> (PathBuf, PathBuf) {
        let destination_dir = client
            .path
            .join(sanitize_folder_path(&classification.folder_path));
        let file_name = sanitize_file_name(
            &classification.suggested_file_name,
            &document.file_name(),
        );
        let requested = destination_dir.join(file_name);
        (destination_dir, requested)
    }

    fn lock_for(&self, dir: &Path) -> Arc<Mutex<()>> {
        // Case-insensitive volumes treat `IDs` and `ids` as one directory
        let key = PathBuf::from(dir.to_string_lossy().to_lowercase());
        self.dir_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Reserve a destination name by creating an empty placeholder with
    /// `create_new`, applying the collision policy when the name is taken.
    /// The move then replaces only the placeholder, so a file that appeared
    /// without going through this router's lock is never overwritten.
    fn claim_destination(&self, source: &Path, requested: &Path) -> Result<PathBuf, RoutingFailure> {
        let mut candidate = requested.to_path_buf();
        for _ in 0..MAX_CLAIM_ATTEMPTS {
            match reserve(&candidate) {
                Ok(()) => return Ok(candidate),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => match self.policy {
                    CollisionPolicy::Suffix => {
                        let unique = generate_unique_path(requested);
                        tracing::debug!(
                            requested = %requested.display(),
                            chosen = %unique.display(),
                            "[Router] Destination taken, using suffixed name"
                        );
                        candidate = unique;
                    }
                    CollisionPolicy::Reject => {
                        return Err(RoutingFailure::DestinationExists {
                            path: requested.display().to_string(),
                        })
                    }
                },
                Err(e) => return Err(move_error(source, &candidate, e)),
            }
        }

        tracing::warn!(
            requested = %requested.display(),
            "[Router] Could not claim a free destination name"
        );
        Err(RoutingFailure::DestinationExists {
            path: requested.display().to_string(),
        })
    }

    /// Apply the collision policy to a requested destination without claiming it
    fn resolve_collision(&self, requested: &Path) -> Result<PathBuf, RoutingFailure> {
        if !path_taken(requested) {
            return Ok(requested.to_path_buf());
        }

        match self.policy {
            CollisionPolicy::Suffix => {
                let unique = generate_unique_path(requested);
                tracing::debug!(
                    requested = %requested.display(),
                    chosen = %unique.display(),
                    "[Router] Destination taken, using suffixed name"
                );
                Ok(unique)
            }
            CollisionPolicy::Reject => Err(RoutingFailure::DestinationExists {
                path: requested.display().to_string(),
            }),
        }
    }
}

/// Create an empty file at `path`, failing with `AlreadyExists` if anything
/// is already there
fn reserve(path: &Path) -> io::Result<()> {
    OpenOptions::new().write(true).create_new(true).open(path).map(|_| ())
}

/// Exists as anything, including a dangling symlink
fn path_taken(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// Generate a unique path by appending a counter suffix
fn generate_unique_path(original: &Path) -> PathBuf {
    let parent = original.parent().unwrap_or(Path::new("."));
    let stem = original
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "file".to_string());
    let ext = original
        .extension()
        .map(|e| format!(".{}", e.to_string_lossy()))
        .unwrap_or_default();

    let mut counter = 1;
    loop {
        let candidate = parent.join(format!("{}_{}{}", stem, counter, ext));
        if !path_taken(&candidate) {
            return candidate;
        }
        counter += 1;
        if counter > 1000 {
            return parent.join(format!("{}_{}{}", stem, uuid::Uuid::new_v4(), ext));
        }
    }
}

/// Rename, or copy-verify-replace when rename is not possible
fn move_file(source: &Path, destination: &Path) -> Result<MoveStrategy, RoutingFailure> {
    match fs::rename(source, destination) {
        Ok(()) => Ok(MoveStrategy::Rename),
        Err(rename_err) => {
            if !source.exists() {
                return Err(move_error(source, destination, rename_err));
            }
            tracing::debug!(
                source = %source.display(),
                "[Router] Rename failed ({}), falling back to copy",
                rename_err
            );
            copy_verify_and_remove(source, destination)?;
            Ok(MoveStrategy::CopyVerified)
        }
    }
}

/// Copy into a hidden temporary file beside the destination, verify the
/// checksum, rename into place, then remove the source. On any failure the
/// source is left untouched and no copy remains at the destination.
fn copy_verify_and_remove(source: &Path, destination: &Path) -> Result<(), RoutingFailure> {
    let parent = destination.parent().unwrap_or(Path::new("."));
    let temp = parent.join(format!(".filer-{}.partial", uuid::Uuid::new_v4()));

    let staged = fs::copy(source, &temp)
        .map_err(|e| e.to_string())
        .and_then(|_| match contents_match(source, &temp) {
            Ok(true) => Ok(()),
            Ok(false) => Err("checksum mismatch after copy".to_string()),
            Err(e) => Err(format!("checksum verification failed: {}", e)),
        })
        .and_then(|_| fs::rename(&temp, destination).map_err(|e| e.to_string()));

    if let Err(reason) = staged {
        let _ = fs::remove_file(&temp);
        return Err(RoutingFailure::MoveError {
            from: source.display().to_string(),
            to: destination.display().to_string(),
            reason,
        });
    }

    if let Err(e) = fs::remove_file(source) {
        // Never leave the document in two places
        let _ = fs::remove_file(destination);
        return Err(move_error(source, destination, e));
    }

    Ok(())
}

fn move_error(source: &Path, destination: &Path, err: io::Error) -> RoutingFailure {
    RoutingFailure::MoveError {
        from: source.display().to_string(),
        to: destination.display().to_string(),
        reason: err.to_string(),
    }
}
