// crates/types/src/lib.rs
//! Shared domain types for the repository intelligence pipeline.
//!
//! These are plain data carriers with no database or I/O dependency —
//! `reposcope-db` maps them onto SQLite rows, and every engine crate
//! produces or consumes them without needing to know about SQL.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Opaque 64-bit identifier for a user, minted by the (out-of-scope) identity collaborator.
pub type UserId = i64;

/// Canonical clone URL, treated as an opaque scoping key.
pub type RepoUrl = String;

/// The three job kinds the worker pool dispatches on.
///
/// A closed set by design (§9 Design Notes: "polymorphic job dispatch" is
/// replaced by an exhaustive match over a tagged enum instead of
/// runtime-reflected handler discovery).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobKind {
    ScipIndex,
    GraphBuild,
    GitMine,
}

impl JobKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobKind::ScipIndex => "scip_index",
            JobKind::GraphBuild => "graph_build",
            JobKind::GitMine => "git_mine",
        }
    }
}

impl std::fmt::Display for JobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobKind {
    type Err = UnsupportedJobKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "scip_index" => Ok(JobKind::ScipIndex),
            "graph_build" => Ok(JobKind::GraphBuild),
            "git_mine" => Ok(JobKind::GitMine),
            other => Err(UnsupportedJobKind(other.to_string())),
        }
    }
}

/// A `job_type` string that doesn't map to any known `JobKind`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsupportedJobKind(pub String);

impl std::fmt::Display for UnsupportedJobKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "unsupported job kind: {}", self.0)
    }
}

impl std::error::Error for UnsupportedJobKind {}

/// Lifecycle status of a `Job` row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    Processing,
    Done,
    Failed,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Processing => "processing",
            JobStatus::Done => "done",
            JobStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for JobStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(JobStatus::Pending),
            "processing" => Ok(JobStatus::Processing),
            "done" => Ok(JobStatus::Done),
            "failed" => Ok(JobStatus::Failed),
            other => Err(format!("unknown job status: {other}")),
        }
    }
}

/// Optional structured parameters attached to a job (e.g. `{"days": 90}`).
///
/// Stored as opaque JSON text in the `jobs.payload` column; engines parse
/// only the fields they understand.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct JobPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<i64>,
}

/// A unit of work in the persistent job queue (§3, `Job` entity).
#[derive(Debug, Clone)]
pub struct Job {
    pub id: i64,
    pub user_id: UserId,
    pub repo_url: RepoUrl,
    pub kind: JobKind,
    pub status: JobStatus,
    pub payload_path: Option<String>,
    pub payload: Option<JobPayload>,
    pub error_msg: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

/// A file-to-file edge produced by the Import Dependency Extractor (§4.3).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDependency {
    pub user_id: UserId,
    pub repo_url: RepoUrl,
    pub source_file: String,
    pub target_file: String,
    pub kind: String,
}

impl FileDependency {
    pub fn import(user_id: UserId, repo_url: impl Into<String>, source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            user_id,
            repo_url: repo_url.into(),
            source_file: source.into(),
            target_file: target.into(),
            kind: "import".to_string(),
        }
    }
}

/// One row per mined commit, per `(user, repo)` (§3, `CommitSummary`).
#[derive(Debug, Clone)]
pub struct CommitSummary {
    pub user_id: UserId,
    pub repo_url: RepoUrl,
    pub commit_hash: String,
    pub author_email: String,
    pub message: String,
    pub committed_at: DateTime<Utc>,
    pub files_changed: i64,
    pub insertions: i64,
    pub deletions: i64,
}

/// A single file's diff against its commit's parent, the input to the
/// Churn Aggregator (§4.4 step 4 / §4.5).
#[derive(Debug, Clone)]
pub struct FileChangeRecord {
    pub commit_hash: String,
    pub file_path: String,
    pub added: i64,
    pub deleted: i64,
    pub authored_at: DateTime<Utc>,
    pub author_email: String,
}

/// One weekly churn bucket for a file (§3, `FileChurnStat`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FileChurnStat {
    pub lines_added: i64,
    pub lines_deleted: i64,
    pub commit_count: i64,
    pub churn_rate: f64,
}

impl FileChurnStat {
    /// `churnRate = round((added+deleted) / max(linesAdded, 50) * 100, 2)`.
    ///
    /// `linesAdded` is a heuristic proxy for file size (§9 Open Questions):
    /// it under-counts churn for files whose history is mostly deletions.
    /// Kept verbatim for compatibility with the system this was distilled from.
    pub fn compute_rate(lines_added: i64, lines_deleted: i64) -> f64 {
        let denom = lines_added.max(50) as f64;
        let pct = (lines_added + lines_deleted) as f64 * 100.0 / denom;
        (pct * 100.0).round() / 100.0
    }
}

/// A parsed source file from the code-intelligence index (§3, `IndexDocument`).
#[derive(Debug, Clone)]
pub struct IndexDocument {
    pub user_id: UserId,
    pub repo_url: RepoUrl,
    pub relative_path: String,
    pub language: String,
}

/// Role bitmask for an `Occurrence` (§3 / GLOSSARY).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RoleFlags(pub u32);

impl RoleFlags {
    pub const DEFINITION: u32 = 1 << 0;
    pub const IMPORT: u32 = 1 << 1;
    pub const WRITE: u32 = 1 << 2;
    pub const READ: u32 = 1 << 3;

    pub fn is_definition(&self) -> bool {
        self.0 & Self::DEFINITION != 0
    }
    pub fn is_import(&self) -> bool {
        self.0 & Self::IMPORT != 0
    }
    pub fn is_write(&self) -> bool {
        self.0 & Self::WRITE != 0
    }
    pub fn is_read(&self) -> bool {
        self.0 & Self::READ != 0
    }
}

/// A contiguous source range tagged with a symbol (§3, `Occurrence`).
#[derive(Debug, Clone)]
pub struct Occurrence {
    pub document_id: i64,
    pub symbol: String,
    pub start_line: i64,
    pub start_char: i64,
    pub end_line: i64,
    pub end_char: i64,
    pub role_flags: RoleFlags,
}

impl Occurrence {
    /// Size of the range as `(line span, char span)`, used to find the
    /// innermost covering occurrence for hover (P4).
    pub fn extent(&self) -> (i64, i64) {
        (self.end_line - self.start_line, self.end_char - self.start_char)
    }

    pub fn covers(&self, line: i64, character: i64) -> bool {
        if line < self.start_line || line > self.end_line {
            return false;
        }
        if line == self.start_line && character < self.start_char {
            return false;
        }
        if line == self.end_line && character > self.end_char {
            return false;
        }
        true
    }
}

/// Cross-document symbol metadata (§3, `SymbolInfo`).
#[derive(Debug, Clone, Default)]
pub struct SymbolInfo {
    pub user_id: UserId,
    pub repo_url: RepoUrl,
    pub symbol: String,
    pub display_name: String,
    pub signature_doc: String,
    pub documentation: String,
}

/// A graph node in the Query Facade's `graph_of_repo` response (§4.8).
#[derive(Debug, Clone, Serialize)]
pub struct GraphNode {
    pub id: String,
    pub label: String,
    pub path: String,
    pub language: String,
}

/// A graph edge in the Query Facade's `graph_of_repo` response (§4.8).
#[derive(Debug, Clone, Serialize)]
pub struct GraphEdge {
    pub id: String,
    pub from: String,
    pub to: String,
    pub kind: String,
    pub is_cycle: bool,
}
