// crates/history-miner/src/lib.rs
//! History Miner (§4.4) and Blame Provider (§4.7).
//!
//! Both shell out to the system `git` binary against a cached bare clone,
//! the same subprocess-with-timeout idiom as `reposcope-repo-cache`
//! (grounded in the teacher's `git_correlation.rs::scan_repo_commits`):
//! spawn, read stdout line by line, enforce a timeout, classify the exit
//! status.

pub mod blame;

use chrono::{DateTime, TimeZone, Utc};
use reposcope_core::error::RepoError;
use reposcope_types::{CommitSummary, FileChangeRecord, RepoUrl, UserId};
use std::collections::HashSet;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;

const GIT_TIMEOUT_SECS: u64 = 60;
/// Field separator used in the `git log --format` string; unlikely to
/// appear in a commit subject, unlike `|` or `,`.
const FIELD_SEP: char = '\u{1f}';
const COMMIT_PREFIX: &str = "@@@commit@@@";

/// One commit's worth of per-file diff stats, mined via `git log --numstat`.
#[derive(Debug, Clone, PartialEq)]
pub struct MinedCommit {
    pub hash: String,
    pub author_email: String,
    pub message: String,
    pub committed_at: DateTime<Utc>,
    pub files: Vec<MinedFileChange>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MinedFileChange {
    pub path: String,
    pub added: i64,
    pub deleted: i64,
}

/// Walk commits reachable from `HEAD` with an authored timestamp within
/// `[now - days, now]`, first-parent only, rename-detecting, whitespace
/// insensitive (§4.4 steps 1-2).
///
/// `git log --since` filters on committer date, not author date, so a
/// rebased or cherry-picked commit can fall on the wrong side of the
/// window; it is only used here as a coarse, best-effort narrowing of
/// what git walks, and the authoritative cut is `retain_within_window`
/// below, applied to each commit's parsed `%at` (author time).
pub async fn mine_commits(repo_dir: &Path, days: i64) -> Result<Vec<MinedCommit>, RepoError> {
    let since = format!("--since={days} days ago");

    let mut cmd = Command::new("git");
    cmd.arg("--git-dir")
        .arg(repo_dir)
        .arg("log")
        .arg("--first-parent")
        .arg("-w")
        .arg("-M")
        .arg("--numstat")
        .arg(format!("--format={COMMIT_PREFIX}%H{FIELD_SEP}%ae{FIELD_SEP}%at{FIELD_SEP}%s"))
        .arg(since)
        .arg("HEAD")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    let mut child = cmd.spawn().map_err(|e| RepoError::CloneFailed {
        repo_url: repo_dir.display().to_string(),
        message: format!("failed to spawn git log: {e}"),
    })?;

    let stdout = child.stdout.take().expect("stdout piped");
    let timeout = Duration::from_secs(GIT_TIMEOUT_SECS);

    let mut commits = tokio::time::timeout(timeout, async move {
        let mut reader = BufReader::new(stdout).lines();
        let mut commits: Vec<MinedCommit> = Vec::new();

        while let Ok(Some(line)) = reader.next_line().await {
            if let Some(header) = line.strip_prefix(COMMIT_PREFIX) {
                if let Some(commit) = parse_commit_header(header) {
                    commits.push(commit);
                }
            } else if let Some(current) = commits.last_mut() {
                if let Some(change) = parse_numstat_line(&line) {
                    current.files.push(change);
                }
            }
        }
        commits
    })
    .await
    .map_err(|_| RepoError::Timeout { secs: GIT_TIMEOUT_SECS })?;

    let status = child.wait().await.map_err(|e| RepoError::Io { path: repo_dir.to_path_buf(), source: e })?;
    if !status.success() {
        return Err(RepoError::FetchFailed {
            repo_url: repo_dir.display().to_string(),
            message: format!("git log exited with {:?}", status.code()),
        });
    }

    // Drop commits where every file's added+deleted == 0 doesn't apply at
    // the commit level (§4.4 step 2 is per-file); per-file filtering
    // already happened in `parse_numstat_line`.
    retain_within_window(&mut commits, Utc::now(), days);
    Ok(commits)
}

/// Keep only commits whose author timestamp falls in `[now - days, now]`,
/// the authoritative window enforcement `--since` cannot provide on its own
/// (§4.4 step 1).
fn retain_within_window(commits: &mut Vec<MinedCommit>, now: DateTime<Utc>, days: i64) {
    let cutoff = now - chrono::Duration::days(days);
    commits.retain(|c| c.committed_at >= cutoff && c.committed_at <= now);
}

fn parse_commit_header(fields: &str) -> Option<MinedCommit> {
    let parts: Vec<&str> = fields.splitn(4, FIELD_SEP).collect();
    if parts.len() < 4 {
        return None;
    }
    let hash = parts[0].to_string();
    let author_email = parts[1].trim().to_lowercase();
    let ts: i64 = parts[2].parse().ok()?;
    let message = truncate_message(parts[3]);

    Some(MinedCommit {
        hash,
        author_email,
        message,
        committed_at: Utc.timestamp_opt(ts, 0).single()?,
        files: Vec::new(),
    })
}

/// Commit subjects longer than this are truncated before storage (ambient
/// defensive-truncation pattern the teacher applies to other free-text
/// fields in `queries/*`).
const MAX_MESSAGE_LEN: usize = 500;

fn truncate_message(message: &str) -> String {
    if message.chars().count() <= MAX_MESSAGE_LEN {
        message.to_string()
    } else {
        message.chars().take(MAX_MESSAGE_LEN).collect()
    }
}

/// Parse one `--numstat` line: `added\tdeleted\tpath`. Binary files report
/// `-\t-\tpath` and are skipped (no line-count proxy available). Renames
/// appear as `added\tdeleted\told => new` or `added\tdeleted\tprefix{old =>
/// new}suffix`; the post-rename path is kept (§4.4 step 2).
fn parse_numstat_line(line: &str) -> Option<MinedFileChange> {
    let mut parts = line.splitn(3, '\t');
    let added_str = parts.next()?;
    let deleted_str = parts.next()?;
    let raw_path = parts.next()?;

    let added: i64 = added_str.parse().ok()?;
    let deleted: i64 = deleted_str.parse().ok()?;
    if added == 0 && deleted == 0 {
        return None;
    }

    let path = canonical_rename_path(raw_path);
    Some(MinedFileChange { path, added, deleted })
}

/// Resolve the post-rename path out of git's numstat rename notation.
fn canonical_rename_path(raw: &str) -> String {
    if let (Some(open), Some(close)) = (raw.find('{'), raw.find('}')) {
        if close > open {
            let prefix = &raw[..open];
            let suffix = &raw[close + 1..];
            let inner = &raw[open + 1..close];
            if let Some((_, new)) = inner.split_once(" => ") {
                return format!("{prefix}{new}{suffix}");
            }
        }
    }
    if let Some((_, new)) = raw.split_once(" => ") {
        return new.to_string();
    }
    raw.to_string()
}

/// Filter a mined-commit stream down to hashes not already recorded, so
/// the Churn Aggregator never double-counts an overlapping `git_mine`
/// window (§9 Open Questions #3, R2).
pub fn filter_unknown(commits: Vec<MinedCommit>, known_hashes: &HashSet<String>) -> Vec<MinedCommit> {
    commits.into_iter().filter(|c| !known_hashes.contains(&c.hash)).collect()
}

/// Project a `MinedCommit` into a `CommitSummary` row (§4.4 step 3).
pub fn to_commit_summary(user_id: UserId, repo_url: &RepoUrl, commit: &MinedCommit) -> CommitSummary {
    let insertions: i64 = commit.files.iter().map(|f| f.added).sum();
    let deletions: i64 = commit.files.iter().map(|f| f.deleted).sum();
    CommitSummary {
        user_id,
        repo_url: repo_url.clone(),
        commit_hash: commit.hash.clone(),
        author_email: commit.author_email.clone(),
        message: commit.message.clone(),
        committed_at: commit.committed_at,
        files_changed: commit.files.len() as i64,
        insertions,
        deletions,
    }
}

/// Flatten a `MinedCommit`'s per-file stats into the record stream handed
/// to the Churn Aggregator (§4.4 step 4).
pub fn to_file_change_records(commit: &MinedCommit) -> Vec<FileChangeRecord> {
    commit
        .files
        .iter()
        .map(|f| FileChangeRecord {
            commit_hash: commit.hash.clone(),
            file_path: f.path.clone(),
            added: f.added,
            deleted: f.deleted,
            authored_at: commit.committed_at,
            author_email: commit.author_email.clone(),
        })
        .collect()
}
