//! Static address → client folder table

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

use super::is_safe_folder_name;

#[derive(Debug, thiserror::Error)]
pub enum AddressBookError {
    #[error("failed to read address book {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid address book {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid client folder name {0:?}")]
    InvalidFolder(String),
    #[error("address {address} is assigned to both {first:?} and {second:?}")]
    DuplicateAddress {
        address: String,
        first: String,
        second: String,
    },
}

/// One client: canonical folder name and the addresses that belong to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientRecord {
    /// Folder name under the clients directory, `"Last, First"` by convention
    pub folder: String,
    #[serde(default)]
    pub addresses: Vec<String>,
}

/// Read-only lookup from normalized address to client folder name
#[derive(Debug, Clone, Default)]
pub struct AddressBook {
    entries: HashMap<String, String>,
}

impl AddressBook {
    /// Build from records, validating folder names and address uniqueness
    pub fn from_records(records: Vec<ClientRecord>) -> Result<Self, AddressBookError> {
        let mut entries: HashMap<String, String> = HashMap::new();

        for record in records {
            let folder = record.folder.trim().to_string();
            if !is_safe_folder_name(&folder) {
                return Err(AddressBookError::InvalidFolder(record.folder));
            }

            for address in record.addresses {
                let key = normalize_address(&address);
                if key.is_empty() {
                    continue;
                }
                match entries.get(&key) {
                    Some(existing) if existing != &folder => {
                        return Err(AddressBookError::DuplicateAddress {
                            address: key,
                            first: existing.clone(),
                            second: folder,
                        });
                    }
                    _ => {
                        entries.insert(key, folder.clone());
                    }
                }
            }
        }

        Ok(Self { entries })
    }

    /// Parse the JSON form: an array of [`ClientRecord`]
    pub fn from_json(json: &str, origin: &str) -> Result<Self, AddressBookError> {
        let records: Vec<ClientRecord> =
            serde_json::from_str(json).map_err(|source| AddressBookError::Parse {
                path: origin.to_string(),
                source,
            })?;
        Self::from_records(records)
    }

    /// Load from a JSON file
    pub fn load(path: &Path) -> Result<Self, AddressBookError> {
        let json = std::fs::read_to_string(path).map_err(|source| AddressBookError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let book = Self::from_json(&json, &path.display().to_string())?;
        if book.is_empty() {
            tracing::warn!(path = %path.display(), "[ClientResolver] Address book has no entries");
        }
        tracing::info!(
            path = %path.display(),
            addresses = book.len(),
            "[ClientResolver] Loaded address book"
        );
        Ok(book)
    }

    /// Client folder name for an address (trimmed, ASCII case-insensitive)
    pub fn lookup(&self, address: &str) -> Option<&str> {
        self.entries
            .get(&normalize_address(address))
            .map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize_address(address: &str) -> String {
    address.trim().to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(folder: &str, addresses: &[&str]) -> ClientRecord {
        ClientRecord {
            folder: folder.to_string(),
            addresses: addresses.iter().map(|a| a.to_string()).collect(),
        }
    }

    #[test]
    fn test_lookup_is_case_insensitive_and_trimmed() {
        let book = AddressBook::from_records(vec![record("Doe, John", &["John.Doe@Example.com"])]).unwrap();
        assert_eq!(book.lookup("john.doe@example.com"), Some("Doe, John"));
        assert_eq!(book.lookup("  JOHN.DOE@EXAMPLE.COM "), Some("Doe, John"));
        assert_eq!(book.lookup("someone@else.com"), None);
    }

    #[test]
    fn test_multiple_addresses_per_client() {
        let book = AddressBook::from_records(vec![
            record("Cardozo, Mario", &["client1@example.com", "mario@work.example"]),
            record("Doe, John", &["client2@example.com"]),
        ])
        .unwrap();
        assert_eq!(book.len(), 3);
        assert_eq!(book.lookup("mario@work.example"), Some("Cardozo, Mario"));
    }

    #[test]
    fn test_empty_book() {
        let book = AddressBook::from_json("[]", "clients.json").unwrap();
        assert!(book.is_empty());
        assert_eq!(book.lookup("client2@example.com"), None);
    }

    #[test]
    fn test_rejects_unsafe_folder() {
        let err = AddressBook::from_records(vec![record("../../etc", &["x@example.com"])]).unwrap_err();
        assert!(matches!(err, AddressBookError::InvalidFolder(_)));
    }

    #[test]
    fn test_rejects_conflicting_address() {
        let err = AddressBook::from_records(vec![
            record("Doe, John", &["shared@example.com"]),
            record("Doe, Jane", &["Shared@example.com"]),
        ])
        .unwrap_err();
        assert!(matches!(err, AddressBookError::DuplicateAddress { .. }));
    }

    #[test]
    fn test_from_json() {
        let json = r#"[
            {"folder": "Doe, John", "addresses": ["client2@example.com"]},
            {"folder": "Walk-in, Client"}
        ]"#;
        let book = AddressBook::from_json(json, "inline").unwrap();
        assert_eq!(book.lookup("client2@example.com"), Some("Doe, John"));

        assert!(matches!(
            AddressBook::from_json("{\"not\": \"a list\"}", "inline"),
            Err(AddressBookError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AddressBook::load(&dir.path().join("missing.json")).unwrap_err();
        assert!(matches!(err, AddressBookError::Read { .. }));
    }
}
