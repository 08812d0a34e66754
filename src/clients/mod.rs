//! Client Resolution
//!
//! Picks the client folder that owns a document. Resolution only selects
//! among folders that already exist under the clients directory, plus the
//! `Uncategorized` fallback; it never creates client folders.

mod address_book;
mod resolver;

pub use address_book::{AddressBook, AddressBookError, ClientRecord};
pub use resolver::{ClientFolder, ClientResolver, ResolvedBy, FALLBACK_FOLDER};

/// True when `name` is usable as a single directory name.
///
/// Rejects empty names, path separators, control characters and dot-only
/// names such as `..`.
pub(crate) fn is_safe_folder_name(name: &str) -> bool {
    let name = name.trim();
    !name.is_empty()
        && !name.chars().all(|c| c == '.')
        && !name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
}
