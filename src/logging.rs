// File: ./src/logging.rs
// The TUI owns the terminal, so logs go to a file in the data directory.
use anyhow::{Context, Result};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock};
use tracing_subscriber::EnvFilter;

pub const LOG_FILE_NAME: &str = "taskfeed.log";

static LOG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Installs the global subscriber once. Later calls return the first path.
///
/// `RUST_LOG` wins over `level`; an unknown `level` falls back to `info`.
pub fn init(level: &str, dir: &Path) -> Result<PathBuf> {
    if let Some(path) = LOG_PATH.get() {
        return Ok(path.clone());
    }

    fs::create_dir_all(dir).with_context(|| format!("create log dir {}", dir.display()))?;
    let path = dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(normalize_level(level)))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_ansi(false)
        .with_writer(Mutex::new(file))
        .try_init();

    let path = LOG_PATH.get_or_init(|| path).clone();
    tracing::info!(
        log_file = %path.display(),
        version = env!("CARGO_PKG_VERSION"),
        "logging initialized"
    );
    Ok(path)
}

fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// Appends panics to the log file before the default hook runs.
pub fn install_panic_hook(log_path: PathBuf) {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(&log_path) {
            let _ = writeln!(file, "PANIC: {info}");
        }
        default_hook(info);
    }));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_level() {
        assert_eq!(normalize_level(" DEBUG "), "debug");
        assert_eq!(normalize_level("warning"), "warn");
        assert_eq!(normalize_level("chatty"), "info");
    }

    #[test]
    fn test_init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let first = init("debug", dir.path()).unwrap();
        let other = tempfile::tempdir().unwrap();
        let second = init("trace", other.path()).unwrap();
        assert_eq!(first, second);
        assert!(first.exists());
    }
}
