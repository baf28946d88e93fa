// crates/repo-cache/src/lib.rs
//! Repository Cache (§4.2): a content-addressed local bare-clone cache for
//! remote Git repositories, keyed by a fingerprint of the clone URL.
//!
//! Grounded in the teacher's `git_correlation.rs` subprocess idiom
//! (`tokio::process::Command` + `tokio::time::timeout`), generalized from
//! read-only `git log`/`git show` invocations to `clone`/`fetch`.

use reposcope_core::error::RepoError;
use reposcope_core::fingerprint::fingerprint;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;
use tokio::process::Command;
use tokio::sync::Mutex;

/// Timeout for clone/fetch subprocesses (§4.2 errors: "Clone or fetch
/// failure surfaces as a fatal job error").
const GIT_TIMEOUT_SECS: u64 = 120;

/// Optional Git credential, passed once per operation and never
/// persisted (§4.2 Invariants, §6 Credentials: `user="oauth2"`).
#[derive(Debug, Clone)]
pub struct Credential {
    pub username: String,
    pub password: String,
}

impl Credential {
    pub fn oauth2_token(token: impl Into<String>) -> Self {
        Self { username: "oauth2".to_string(), password: token.into() }
    }

    /// `Authorization: Basic <base64(user:pass)>` header value, passed via
    /// a transient `-c http.extraHeader=...` so it never lands in the
    /// cloned repo's on-disk config.
    fn basic_auth_header(&self) -> String {
        use base64::{engine::general_purpose::STANDARD, Engine};
        format!("AUTHORIZATION: Basic {}", STANDARD.encode(format!("{}:{}", self.username, self.password)))
    }
}

/// How much history to fetch on first clone (§4.2: "depth 1 for
/// `graph_build`; full history for `git_mine`").
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloneDepth {
    Shallow,
    Full,
}

/// A handle over a cached bare clone. No working tree — tree reads go
/// through object-level `git` subcommands against a ref (§4.2 Invariants).
#[derive(Debug, Clone)]
pub struct RepoHandle {
    pub repo_url: String,
    pub fingerprint: String,
    pub path: PathBuf,
}

/// Content-addressed cache of bare clones under `base_dir` (§6:
/// `<baseDir>/<16-hex-chars>/`).
#[derive(Clone)]
pub struct RepoCache {
    base_dir: PathBuf,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl RepoCache {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self { base_dir: base_dir.into(), locks: Arc::new(Mutex::new(HashMap::new())) }
    }

    pub fn path_for(&self, repo_url: &str) -> PathBuf {
        self.base_dir.join(fingerprint(repo_url))
    }

    /// Per-fingerprint lock so two concurrent `open` calls on the same
    /// URL serialize (§4.2 Invariants).
    async fn entry_lock(&self, fp: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks.entry(fp.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
    }

    /// Open-or-clone: if a non-empty clone exists, fetch it (best-effort);
    /// otherwise clone fresh at `depth` (§4.2 Contract).
    pub async fn open(
        &self,
        repo_url: &str,
        credential: Option<&Credential>,
        depth: CloneDepth,
    ) -> Result<RepoHandle, RepoError> {
        let fp = fingerprint(repo_url);
        let entry_lock = self.entry_lock(&fp).await;
        let _guard = entry_lock.lock().await;

        let path = self.base_dir.join(&fp);
        tokio::fs::create_dir_all(&self.base_dir).await.map_err(|e| RepoError::io(self.base_dir.clone(), e))?;

        let exists_and_nonempty = dir_is_nonempty(&path).await;

        if exists_and_nonempty {
            if let Err(e) = run_fetch(&path, credential).await {
                tracing::warn!(repo_url, error = %e, "fetch failed, continuing with existing clone");
            }
            if depth == CloneDepth::Full && is_shallow(&path).await {
                if let Err(e) = unshallow(&path, credential).await {
                    tracing::warn!(repo_url, error = %e, "unshallow fetch failed, cache stays shallow");
                }
            }
        } else {
            clone_bare(repo_url, &path, credential, depth).await?;
        }

        Ok(RepoHandle { repo_url: repo_url.to_string(), fingerprint: fp, path })
    }
}

async fn dir_is_nonempty(path: &Path) -> bool {
    match tokio::fs::read_dir(path).await {
        Ok(mut entries) => entries.next_entry().await.ok().flatten().is_some(),
        Err(_) => false,
    }
}

async fn is_shallow(path: &Path) -> bool {
    tokio::fs::metadata(path.join("shallow")).await.is_ok()
}

fn base_git_command(credential: Option<&Credential>) -> Command {
    let mut cmd = Command::new("git");
    if let Some(cred) = credential {
        cmd.arg("-c").arg(format!("http.extraHeader={}", cred.basic_auth_header()));
    }
    cmd
}

async fn clone_bare(repo_url: &str, dest: &Path, credential: Option<&Credential>, depth: CloneDepth) -> Result<(), RepoError> {
    let mut cmd = base_git_command(credential);
    cmd.arg("clone").arg("--bare");
    if depth == CloneDepth::Shallow {
        cmd.arg("--depth").arg("1");
    }
    cmd.arg(repo_url).arg(dest).stdout(Stdio::null()).stderr(Stdio::piped());

    let output = run_with_timeout(cmd).await.map_err(|e| RepoError::CloneFailed { repo_url: repo_url.to_string(), message: e })?;
    if !output.status.success() {
        return Err(RepoError::CloneFailed { repo_url: repo_url.to_string(), message: stderr_tail(&output.stderr) });
    }
    Ok(())
}

async fn run_fetch(repo_dir: &Path, credential: Option<&Credential>) -> Result<(), RepoError> {
    let mut cmd = base_git_command(credential);
    cmd.arg("--git-dir").arg(repo_dir).arg("fetch").arg("origin").arg("+refs/heads/*:refs/heads/*").stdout(Stdio::null()).stderr(Stdio::piped());

    let output = run_with_timeout(cmd)
        .await
        .map_err(|e| RepoError::FetchFailed { repo_url: repo_dir.display().to_string(), message: e })?;
    if !output.status.success() {
        return Err(RepoError::FetchFailed { repo_url: repo_dir.display().to_string(), message: stderr_tail(&output.stderr) });
    }
    Ok(())
}

async fn unshallow(repo_dir: &Path, credential: Option<&Credential>) -> Result<(), RepoError> {
    let mut cmd = base_git_command(credential);
    cmd.arg("--git-dir").arg(repo_dir).arg("fetch").arg("--unshallow").arg("origin").stdout(Stdio::null()).stderr(Stdio::piped());

    let output = run_with_timeout(cmd)
        .await
        .map_err(|e| RepoError::FetchFailed { repo_url: repo_dir.display().to_string(), message: e })?;
    if !output.status.success() {
        return Err(RepoError::FetchFailed { repo_url: repo_dir.display().to_string(), message: stderr_tail(&output.stderr) });
    }
    Ok(())
}

async fn run_with_timeout(mut cmd: Command) -> Result<std::process::Output, String> {
    let child = cmd.spawn().map_err(|e| format!("failed to spawn git: {e}"))?;
    match tokio::time::timeout(Duration::from_secs(GIT_TIMEOUT_SECS), child.wait_with_output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => Err(format!("git process error: {e}")),
        Err(_) => Err(format!("git operation timed out after {GIT_TIMEOUT_SECS}s")),
    }
}

fn stderr_tail(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).lines().last().unwrap_or("").trim().to_string()
}
