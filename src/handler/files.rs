//! Repository file endpoint
//!
//! `GET /file?file_path=<relative path>` serves a regular file that lives
//! inside the coder's repository root.

use anyhow::Context;
use hyper::Response;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

use crate::config::AppState;
use crate::error::ApiError;
use crate::http::{self, cache, mime, query, ResponseBody};
use crate::logger;

pub async fn handle_get_file(
    query_string: Option<&str>,
    if_none_match: Option<&str>,
    state: &Arc<AppState>,
) -> Result<Response<ResponseBody>, ApiError> {
    let file_path = query::get_param(query_string, "file_path")
        .ok_or_else(|| ApiError::BadRequest("Missing query parameter: file_path".to_string()))?;

    let root = state.coder.repo_root().to_path_buf();
    let requested = file_path.clone();
    let resolved = tokio::task::spawn_blocking(move || resolve_in_repo(&root, &requested))
        .await
        .context("path resolution task failed")?
        .with_context(|| format!("failed to resolve {file_path}"))?;

    let not_found = || ApiError::NotFound(format!("File not found: {file_path}"));
    let Some(full_path) = resolved else {
        return Err(not_found());
    };

    let content = match fs::read(&full_path).await {
        Ok(content) => content,
        // Removed since it was resolved
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Err(not_found()),
        Err(e) => {
            return Err(anyhow::Error::new(e)
                .context(format!("failed to read {}", full_path.display()))
                .into())
        }
    };

    let etag = cache::generate_etag(&content);
    if cache::check_etag_match(if_none_match, &etag) {
        return Ok(http::build_304_response(&etag));
    }

    let last_modified = fs::metadata(&full_path)
        .await
        .and_then(|m| m.modified())
        .ok()
        .map(cache::format_http_date);

    Ok(http::build_file_response(
        content,
        &mime::get_content_type(&full_path),
        &etag,
        last_modified.as_deref(),
    ))
}

/// Resolve `relative` against `root`.
///
/// Returns `Ok(None)` when the target is not an existing regular file or is
/// not a descendant of `root`. Containment is checked component by
/// component on the normalized path, then again after resolving symlinks.
pub fn resolve_in_repo(root: &Path, relative: &str) -> io::Result<Option<PathBuf>> {
    let root = normalize(&std::path::absolute(root)?);
    let candidate = normalize(&root.join(relative));

    if !is_descendant(&candidate, &root) {
        if !candidate.starts_with(&root) {
            logger::log_warning(&format!(
                "Path traversal attempt blocked: {relative} -> {}",
                candidate.display()
            ));
        }
        return Ok(None);
    }

    // Mirrors "is a regular file": any failure to stat counts as missing
    match std::fs::metadata(&candidate) {
        Ok(meta) if meta.is_file() => {}
        _ => return Ok(None),
    }

    let real_root = root.canonicalize()?;
    let Some(real_candidate) = canonical_or_none(&candidate)? else {
        return Ok(None);
    };
    if !is_descendant(&real_candidate, &real_root) {
        logger::log_warning(&format!(
            "Symlink escape blocked: {relative} -> {}",
            real_candidate.display()
        ));
        return Ok(None);
    }

    Ok(Some(candidate))
}

/// Canonical form of `path`, `None` if it no longer exists
fn canonical_or_none(path: &Path) -> io::Result<Option<PathBuf>> {
    match path.canonicalize() {
        Ok(real) => Ok(Some(real)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// Strictly below `root`, compared by path components
fn is_descendant(path: &Path, root: &Path) -> bool {
    path != root && path.starts_with(root)
}

/// Lexically normalize a path: drop `.`, fold `..` into its parent.
///
/// `..` at the root stays at the root. Symlinks are not consulted.
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => out.push(component.as_os_str()),
            Component::CurDir => {}
            Component::ParentDir => {
                let last = out.components().next_back();
                let folds = matches!(last, Some(Component::Normal(_)));
                let at_root = matches!(last, Some(Component::RootDir | Component::Prefix(_)));
                if folds {
                    out.pop();
                } else if !at_root {
                    out.push("..");
                }
            }
            Component::Normal(name) => out.push(name),
        }
    }
    out
}
