//! Centralized path functions for all app storage locations.
//!
//! Single source of truth — eliminates ad-hoc `dirs::cache_dir().join(...)` scattered across crates.

use std::path::PathBuf;

/// App cache root: `~/Library/Caches/reposcope/` (macOS) or `~/.cache/reposcope/` (Linux).
pub fn app_cache_dir() -> Option<PathBuf> {
    dirs::cache_dir().map(|d| d.join("reposcope"))
}

/// SQLite database file: `<app_cache_dir>/reposcope.db`.
pub fn db_path() -> Option<PathBuf> {
    app_cache_dir().map(|d| d.join("reposcope.db"))
}

/// Repository cache root: `<app_cache_dir>/repos/`, the `baseDir` of §4.2 and §6.
///
/// Bare clones live at `<repo_cache_dir>/<16-hex-chars>/`.
pub fn repo_cache_dir() -> Option<PathBuf> {
    app_cache_dir().map(|d| d.join("repos"))
}
