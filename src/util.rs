use anyhow::{Context, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::thread::sleep;
use std::time::Duration;

static INIT_ONCE: std::sync::Once = std::sync::Once::new();
pub fn init_tracing_once() {
    INIT_ONCE.call_once(|| {
        let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let _ = tracing_subscriber::fmt().with_env_filter(env_filter).try_init();
    });
}

/// `<dir>/<name>.inprogress` next to the final file.
pub fn staging_path(dest: &Path) -> PathBuf {
    let mut name = dest.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".inprogress");
    dest.with_file_name(name)
}

/// Move a finished staging file over `dest`, replacing what was there.
/// Retries a few times on errors that tend to clear up (locked/shared files),
/// then falls back to copy + remove.
pub fn promote(tmp: &Path, dest: &Path) -> Result<()> {
    const TRIES: u64 = 10;
    const DELAY_MS: u64 = 50;

    let mut last: Option<io::Error> = None;
    for i in 0..TRIES {
        match fs::rename(tmp, dest) {
            Ok(()) => return Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(e).with_context(|| format!("staging file {} vanished", tmp.display()));
            }
            Err(e) => {
                last = Some(e);
                sleep(Duration::from_millis(DELAY_MS * (i + 1)));
            }
        }
    }
    tracing::warn!(
        "rename {} -> {} kept failing ({}); copying instead",
        tmp.display(),
        dest.display(),
        last.map(|e| e.to_string()).unwrap_or_default()
    );
    fs::copy(tmp, dest).with_context(|| format!("copy {} -> {}", tmp.display(), dest.display()))?;
    fs::remove_file(tmp).with_context(|| format!("remove {}", tmp.display()))?;
    Ok(())
}
