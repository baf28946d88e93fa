// crates/history-miner/src/blame.rs
//! Blame Provider (§4.7): on-demand per-line attribution over a cached
//! bare repository, via `git blame --porcelain`.

use chrono::{DateTime, TimeZone, Utc};
use reposcope_core::error::RepoError;
use std::collections::HashMap;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

const GIT_TIMEOUT_SECS: u64 = 30;

/// One attributed source line (§4.7 Contract).
#[derive(Debug, Clone, PartialEq)]
pub struct BlameLine {
    pub line_no: i64,
    pub commit_hash: String,
    pub author_email: String,
    pub committed_at: DateTime<Utc>,
    pub content: String,
}

/// Blame `file_path` at `HEAD` in the cached bare repo at `repo_dir`.
///
/// Missing files return an empty sequence rather than an error (§4.7);
/// a repo directory that doesn't exist surfaces `RepoError::NotCached`.
pub async fn blame_file(repo_dir: &Path, file_path: &str) -> Result<Vec<BlameLine>, RepoError> {
    if tokio::fs::metadata(repo_dir).await.is_err() {
        return Err(RepoError::NotCached { repo_url: repo_dir.display().to_string() });
    }

    let mut cmd = Command::new("git");
    cmd.arg("--git-dir")
        .arg(repo_dir)
        .arg("blame")
        .arg("--porcelain")
        .arg("HEAD")
        .arg("--")
        .arg(file_path)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let output = tokio::time::timeout(Duration::from_secs(GIT_TIMEOUT_SECS), cmd.output())
        .await
        .map_err(|_| RepoError::Timeout { secs: GIT_TIMEOUT_SECS })?
        .map_err(|e| RepoError::Io { path: repo_dir.to_path_buf(), source: e })?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        if stderr.contains("no such path") || stderr.contains("does not exist") {
            return Ok(Vec::new());
        }
        return Err(RepoError::FetchFailed {
            repo_url: repo_dir.display().to_string(),
            message: stderr.lines().last().unwrap_or("blame failed").to_string(),
        });
    }

    Ok(parse_porcelain(&String::from_utf8_lossy(&output.stdout)))
}

fn parse_porcelain(output: &str) -> Vec<BlameLine> {
    #[derive(Default, Clone)]
    struct CommitMeta {
        author_email: String,
        author_time: i64,
    }

    let mut known: HashMap<String, CommitMeta> = HashMap::new();
    let mut lines = Vec::new();

    let mut pending_hash: Option<String> = None;
    let mut pending_final_line: i64 = 0;
    let mut current_meta = CommitMeta::default();

    for raw_line in output.lines() {
        if let Some(rest) = raw_line.strip_prefix('\t') {
            if let Some(hash) = pending_hash.take() {
                let meta = known.entry(hash.clone()).or_insert_with(|| current_meta.clone());
                lines.push(BlameLine {
                    line_no: pending_final_line,
                    commit_hash: hash,
                    author_email: meta.author_email.clone(),
                    committed_at: Utc.timestamp_opt(meta.author_time, 0).single().unwrap_or_else(Utc::now),
                    content: rest.to_string(),
                });
            }
            continue;
        }

        if let Some(rest) = raw_line.strip_prefix("author-mail ") {
            current_meta.author_email = rest.trim_matches(|c| c == '<' || c == '>').to_lowercase();
            continue;
        }
        if let Some(rest) = raw_line.strip_prefix("author-time ") {
            current_meta.author_time = rest.trim().parse().unwrap_or(0);
            continue;
        }

        // Header line: "<hash> <orig-line> <final-line> [<num-lines>]"
        let mut parts = raw_line.split_whitespace();
        if let Some(hash) = parts.next() {
            if hash.len() == 40 && hash.chars().all(|c| c.is_ascii_hexdigit()) {
                if let Some(meta) = known.get(hash) {
                    current_meta = meta.clone();
                }
                if let Some(final_line) = parts.nth(1) {
                    if let Ok(n) = final_line.parse::<i64>() {
                        pending_final_line = n;
                        pending_hash = Some(hash.to_string());
                    }
                }
            }
        }
    }

    lines
}
