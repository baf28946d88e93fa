//! Structured logging bootstrap, shared by every binary in the workspace.
//!
//! Mirrors the teacher's `main.rs` subscriber setup: `tracing_subscriber`
//! with an `EnvFilter` that defaults to `warn` and falls back gracefully
//! when `RUST_LOG` is unset or unparsable.

use tracing_subscriber::FmtSubscriber;

/// Install the global tracing subscriber. Safe to call once at process start;
/// a second call is a no-op error that we deliberately ignore (tests may
/// call this more than once across the suite).
pub fn init_tracing() {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .compact()
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
