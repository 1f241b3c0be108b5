//! Link target resolution.
//!
//! Maps a markdown link URL to something loadable: HTTP(S) URLs pass
//! through, local paths resolve against the linking document's directory and
//! any configured search roots. Paths that name sensitive system locations
//! or escape more than one directory upward are rejected outright.

use std::path::{Component, Path, PathBuf};

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("directory traversal not allowed")]
    DirectoryTraversal,
    #[error("file not found")]
    FileNotFound,
}

/// Sensitive first segments of absolute paths.
///
/// `/var` stays allowed: temp directories often live under it.
const SENSITIVE_ABSOLUTE: [&str; 4] = ["etc", "sys", "proc", "root"];
/// Sensitive segments anywhere in a relative path.
const SENSITIVE_RELATIVE: [&str; 6] = ["etc", "var", "usr", "sys", "proc", "root"];

/// Resolves a markdown link URL to an absolute file path or URL.
///
/// Resolution order: empty input stays empty; HTTP(S) URLs pass through;
/// traversal checks; an existing absolute path; a sibling of `source_path`;
/// each search root in order. Anything else is [`ResolveError::FileNotFound`].
pub fn resolve_link_path(
    link_url: &str,
    source_path: &str,
    search_roots: &[PathBuf],
) -> Result<String, ResolveError> {
    if link_url.is_empty() {
        return Ok(String::new());
    }

    if is_http_url(link_url) {
        return Ok(link_url.to_string());
    }

    if contains_directory_traversal(link_url) {
        return Err(ResolveError::DirectoryTraversal);
    }

    let link_path = Path::new(link_url);
    if link_path.is_absolute() {
        if file_exists(link_path) {
            return Ok(link_url.to_string());
        }
        return Err(ResolveError::FileNotFound);
    }

    if !source_path.is_empty() {
        if let Some(source_dir) = Path::new(source_path).parent() {
            let candidate = normalize(&source_dir.join(link_url));
            if file_exists(&candidate) {
                return Ok(candidate.to_string_lossy().into_owned());
            }
        }
    }

    for root in search_roots {
        if root.as_os_str().is_empty() {
            continue;
        }
        let candidate = normalize(&root.join(link_url));
        if file_exists(&candidate) {
            return Ok(candidate.to_string_lossy().into_owned());
        }
    }

    Err(ResolveError::FileNotFound)
}

pub fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn contains_directory_traversal(path: &str) -> bool {
    let p = Path::new(path);

    if p.is_absolute() {
        let first = normalize(p)
            .components()
            .find_map(|c| match c {
                Component::Normal(seg) => Some(seg.to_string_lossy().into_owned()),
                _ => None,
            });
        return first.is_some_and(|seg| SENSITIVE_ABSOLUTE.contains(&seg.as_str()));
    }

    if path == ".." || path.starts_with("../") {
        let normalized = normalize(p);
        let escape_depth = normalized
            .components()
            .take_while(|c| matches!(c, Component::ParentDir))
            .count();
        if escape_depth > 1 {
            return true;
        }
        return normalized.components().any(|c| match c {
            Component::Normal(seg) => {
                SENSITIVE_RELATIVE.contains(&seg.to_string_lossy().as_ref())
            }
            _ => false,
        });
    }

    SENSITIVE_RELATIVE.iter().any(|seg| {
        let prefix = format!("{seg}/");
        path.starts_with(&prefix) || path.contains(&format!("/{prefix}"))
    })
}

/// Lexically normalizes a path: drops `.` and resolves `..` against
/// preceding normal segments. Leading `..` segments are kept.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn file_exists(path: &Path) -> bool {
    path.metadata().map(|m| m.is_file()).unwrap_or(false)
}
