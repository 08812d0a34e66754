use serde::Serialize;
use std::path::PathBuf;

use super::{is_safe_folder_name, AddressBook};

/// Folder under the clients directory that receives unmatched documents
pub const FALLBACK_FOLDER: &str = "Uncategorized";

/// Which resolution rule selected the client folder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolvedBy {
    Address,
    Name,
    Fallback,
}

/// The client directory that owns a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClientFolder {
    pub path: PathBuf,
    pub resolved_by: ResolvedBy,
}

/// Resolves documents to pre-existing client folders
#[derive(Debug, Clone)]
pub struct ClientResolver {
    clients_dir: PathBuf,
    address_book: AddressBook,
}

impl ClientResolver {
    pub fn new(clients_dir: impl Into<PathBuf>, address_book: AddressBook) -> Self {
        Self {
            clients_dir: clients_dir.into(),
            address_book,
        }
    }

    /// Resolve in order: address table, extracted `"Last, First"`, fallback.
    /// The first two only match folders that already exist.
    pub fn resolve(
        &self,
        address: Option<&str>,
        first_name: Option<&str>,
        last_name: Option<&str>,
    ) -> ClientFolder {
        if let Some(folder) = address.and_then(|a| self.address_book.lookup(a)) {
            let path = self.clients_dir.join(folder);
            if path.is_dir() {
                return ClientFolder {
                    path,
                    resolved_by: ResolvedBy::Address,
                };
            }
            tracing::debug!(folder = %folder, "[ClientResolver] Address matched but folder is missing");
        }

        if let Some(folder) = name_folder(first_name, last_name) {
            let path = self.clients_dir.join(&folder);
            if path.is_dir() {
                return ClientFolder {
                    path,
                    resolved_by: ResolvedBy::Name,
                };
            }
        }

        ClientFolder {
            path: self.clients_dir.join(FALLBACK_FOLDER),
            resolved_by: ResolvedBy::Fallback,
        }
    }
}

/// `"Last, First"` when both names are present and safe as a folder name
fn name_folder(first_name: Option<&str>, last_name: Option<&str>) -> Option<String> {
    let first = first_name?.trim();
    let last = last_name?.trim();
    if !is_safe_folder_name(first) || !is_safe_folder_name(last) {
        return None;
    }
    Some(format!("{}, {}", last, first))
}
