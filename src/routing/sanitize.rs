//! Path sanitization for classifier-supplied names
//!
//! Every string that came back from the classifier passes through here before
//! it touches a path. Output components never contain separators, never start
//! with a dot and are never empty, so joined paths stay inside their parent.

use std::path::{Path, PathBuf};

use crate::classify::DEFAULT_FOLDER_PATH;

/// Characters replaced with `-` in any path component
const RESERVED_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Keep components well under common 255-byte name limits
const MAX_COMPONENT_BYTES: usize = 200;

/// Deepest category-relative folder accepted
const MAX_FOLDER_DEPTH: usize = 4;

/// Name used when neither the suggestion nor the original yields anything
const FALLBACK_FILE_STEM: &str = "document";

/// Clean one path component, or `None` if nothing usable remains
fn clean_component(raw: &str) -> Option<String> {
    let replaced: String = raw
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if RESERVED_CHARS.contains(&c) { '-' } else { c })
        .collect();

    let collapsed = replaced.split_whitespace().collect::<Vec<_>>().join(" ");
    let trimmed = trim_edges(&collapsed);
    if trimmed.is_empty() {
        return None;
    }

    let limited = trim_edges(truncate_bytes(trimmed, MAX_COMPONENT_BYTES));
    (!limited.is_empty()).then(|| limited.to_string())
}

/// Leading dots would hide the file or form `..`; trailing dots and spaces
/// are stripped by some filesystems
fn trim_edges(s: &str) -> &str {
    s.trim_matches(|c: char| c == '.' || c == '-' || c.is_whitespace())
}

fn truncate_bytes(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    &s[..cut]
}

/// Category-relative folder path, one sanitized component per segment.
///
/// Segments reduced to nothing (`..`, `.`, blanks) are dropped. An empty
/// result becomes the default folder.
pub fn sanitize_folder_path(raw: &str) -> PathBuf {
    let mut path = PathBuf::new();
    for segment in raw
        .split(['/', '\\'])
        .filter_map(clean_component)
        .take(MAX_FOLDER_DEPTH)
    {
        path.push(segment);
    }

    if path.as_os_str().is_empty() {
        PathBuf::from(DEFAULT_FOLDER_PATH)
    } else {
        path
    }
}

/// Destination file name from the classifier suggestion.
///
/// Falls back to the original name when the suggestion sanitizes to nothing.
/// The original file's extension is appended unless the name already ends
/// with it (case-insensitive).
pub fn sanitize_file_name(suggested: &str, original: &str) -> String {
    let name = clean_component(suggested)
        .or_else(|| clean_component(original))
        .unwrap_or_else(|| FALLBACK_FILE_STEM.to_string());

    let ext = match original_extension(original) {
        Some(ext) => ext,
        None => return name,
    };

    let already_has = Path::new(&name)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(&ext));
    if already_has {
        return name;
    }

    let stem = truncate_bytes(&name, MAX_COMPONENT_BYTES.saturating_sub(ext.len() + 1));
    format!("{}.{}", trim_edges(stem), ext)
}

/// Alphanumeric extension of the original file, if any
fn original_extension(original: &str) -> Option<String> {
    let ext = Path::new(original).extension()?.to_str()?;
    let ext: String = ext.chars().filter(|c| c.is_ascii_alphanumeric()).collect();
    (!ext.is_empty()).then_some(ext)
}
