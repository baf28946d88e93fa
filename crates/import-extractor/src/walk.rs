// crates/import-extractor/src/walk.rs
//! Working-tree materialization and file-tree walk (§4.3 steps 1-2).

use reposcope_core::error::RepoError;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use walkdir::WalkDir;

/// Files larger than this are skipped outright (§4.3 step 2).
pub const MAX_FILE_BYTES: u64 = 500 * 1024;

/// Directories never descended into, regardless of depth (§4.3 step 2).
const EXCLUDED_DIRS: &[&str] =
    &["node_modules", ".git", "dist", "build", ".cache", ".next", "target", "__pycache__", ".gradle", "vendor"];

/// A source file discovered by the walk, path normalized to forward
/// slashes relative to the working tree root.
#[derive(Debug, Clone)]
pub struct WalkedFile {
    pub relative_path: String,
    pub content: String,
}

/// Check out a temporary, disposable working tree for `bare_repo` at
/// `commit_ish` (§4.3 step 1: "a shallow clone to a temporary directory is
/// acceptable; it is removed on completion"). The returned `TempDir`
/// removes the checkout when dropped.
pub async fn checkout_working_tree(bare_repo: &Path, commit_ish: &str) -> Result<tempfile::TempDir, RepoError> {
    let tmp = tempfile::tempdir().map_err(|e| RepoError::io(bare_repo.to_path_buf(), e))?;

    let clone_status = Command::new("git")
        .arg("clone")
        .arg("--quiet")
        .arg("--no-checkout")
        .arg(bare_repo)
        .arg(tmp.path())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| RepoError::CloneFailed { repo_url: bare_repo.display().to_string(), message: e.to_string() })?;
    if !clone_status.status.success() {
        return Err(RepoError::CloneFailed {
            repo_url: bare_repo.display().to_string(),
            message: String::from_utf8_lossy(&clone_status.stderr).trim().to_string(),
        });
    }

    let checkout_status = Command::new("git")
        .arg("-C")
        .arg(tmp.path())
        .arg("checkout")
        .arg("--quiet")
        .arg(commit_ish)
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await
        .map_err(|e| RepoError::CloneFailed { repo_url: bare_repo.display().to_string(), message: e.to_string() })?;
    if !checkout_status.status.success() {
        return Err(RepoError::CloneFailed {
            repo_url: bare_repo.display().to_string(),
            message: String::from_utf8_lossy(&checkout_status.stderr).trim().to_string(),
        });
    }

    Ok(tmp)
}

/// Walk `root`, returning the UTF-8 text of every in-scope file (§4.3
/// step 2). Binary/non-UTF-8 files and anything over `MAX_FILE_BYTES` are
/// silently skipped, not errored — one unreadable file must not abort the
/// whole extraction.
pub fn walk_source_files(root: &Path) -> Vec<WalkedFile> {
    let mut out = Vec::new();

    for entry in WalkDir::new(root)
        .into_iter()
        .filter_entry(|e| !is_excluded_dir(e))
        .filter_map(|e| e.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else { continue };
        if crate::patterns::family_for_extension(ext) == crate::patterns::Family::Other {
            continue;
        }
        let Ok(metadata) = entry.metadata() else { continue };
        if metadata.len() > MAX_FILE_BYTES {
            tracing::debug!(path = %path.display(), size = metadata.len(), "skipping oversized file");
            continue;
        }
        let Ok(content) = std::fs::read_to_string(path) else {
            tracing::debug!(path = %path.display(), "skipping non-UTF-8 file");
            continue;
        };
        let Ok(relative) = path.strip_prefix(root) else { continue };
        let relative_path = relative.to_string_lossy().replace('\\', "/");
        out.push(WalkedFile { relative_path, content });
    }

    out
}

fn is_excluded_dir(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_dir()
        && entry
            .file_name()
            .to_str()
            .map(|name| EXCLUDED_DIRS.contains(&name))
            .unwrap_or(false)
}

/// All recognized-extension relative paths under `root`, used to build the
/// resolver's `FileSet` without re-reading file contents.
pub fn all_relative_paths(files: &[WalkedFile]) -> Vec<String> {
    files.iter().map(|f| f.relative_path.clone()).collect()
}
