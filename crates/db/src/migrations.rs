// crates/db/src/migrations.rs
//! Inline SQL migrations for the reposcope SQLite schema.
//!
//! Simple inline migrations rather than a separate migration-file
//! directory: the schema is small, self-contained, and versioned through
//! a `_migrations` tracking table (see `Database::run_migrations`).
pub const MIGRATIONS: &[&str] = &[
    // Migration 1: jobs table (§3 Job, §6 job-queue table columns)
    r#"
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    repo_url TEXT NOT NULL,
    status TEXT NOT NULL CHECK (status IN ('pending', 'processing', 'done', 'failed')),
    job_type TEXT NOT NULL,
    payload_path TEXT,
    payload TEXT,
    error_msg TEXT,
    created_at INTEGER NOT NULL,
    started_at INTEGER,
    finished_at INTEGER
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_status_created ON jobs(status, created_at);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_jobs_user_repo ON jobs(user_id, repo_url);"#,
    // Migration 2: file_dependencies table (§3 FileDependency)
    r#"
CREATE TABLE IF NOT EXISTS file_dependencies (
    user_id INTEGER NOT NULL,
    repo_url TEXT NOT NULL,
    source_file TEXT NOT NULL,
    target_file TEXT NOT NULL,
    kind TEXT NOT NULL DEFAULT 'import',
    PRIMARY KEY (user_id, repo_url, source_file, target_file)
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_file_deps_scope ON file_dependencies(user_id, repo_url);"#,
    // Migration 3: commit_summaries table (§3 CommitSummary)
    r#"
CREATE TABLE IF NOT EXISTS commit_summaries (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    repo_url TEXT NOT NULL,
    commit_hash TEXT NOT NULL,
    author_email TEXT NOT NULL,
    message TEXT NOT NULL,
    committed_at INTEGER NOT NULL,
    files_changed INTEGER NOT NULL DEFAULT 0,
    insertions INTEGER NOT NULL DEFAULT 0,
    deletions INTEGER NOT NULL DEFAULT 0,
    recorded_at INTEGER NOT NULL,
    UNIQUE (user_id, repo_url, commit_hash)
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_commit_summaries_scope ON commit_summaries(user_id, repo_url);"#,
    // Migration 4: file_churn_stats table (§3 FileChurnStat)
    r#"
CREATE TABLE IF NOT EXISTS file_churn_stats (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    repo_url TEXT NOT NULL,
    file_path TEXT NOT NULL,
    week_start TEXT NOT NULL,
    lines_added INTEGER NOT NULL DEFAULT 0,
    lines_deleted INTEGER NOT NULL DEFAULT 0,
    commit_count INTEGER NOT NULL DEFAULT 0,
    churn_rate REAL NOT NULL DEFAULT 0,
    UNIQUE (user_id, repo_url, file_path, week_start)
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_churn_scope_window ON file_churn_stats(user_id, repo_url, week_start);"#,
    // Migration 5: index_documents / occurrences / symbol_infos (§3, §4.6)
    r#"
CREATE TABLE IF NOT EXISTS index_documents (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    repo_url TEXT NOT NULL,
    relative_path TEXT NOT NULL,
    language TEXT NOT NULL DEFAULT '',
    indexed_at INTEGER NOT NULL,
    UNIQUE (user_id, repo_url, relative_path)
);
"#,
    r#"
CREATE TABLE IF NOT EXISTS occurrences (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    document_id INTEGER NOT NULL REFERENCES index_documents(id) ON DELETE CASCADE,
    symbol TEXT NOT NULL,
    start_line INTEGER NOT NULL,
    start_char INTEGER NOT NULL,
    end_line INTEGER NOT NULL,
    end_char INTEGER NOT NULL,
    role_flags INTEGER NOT NULL DEFAULT 0
);
"#,
    r#"CREATE INDEX IF NOT EXISTS idx_occurrences_document ON occurrences(document_id);"#,
    r#"CREATE INDEX IF NOT EXISTS idx_occurrences_symbol ON occurrences(symbol);"#,
    r#"
CREATE TABLE IF NOT EXISTS symbol_infos (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    user_id INTEGER NOT NULL,
    repo_url TEXT NOT NULL,
    symbol TEXT NOT NULL,
    display_name TEXT NOT NULL DEFAULT '',
    signature_doc TEXT NOT NULL DEFAULT '',
    documentation TEXT NOT NULL DEFAULT '',
    UNIQUE (user_id, repo_url, symbol)
);
"#,
];
