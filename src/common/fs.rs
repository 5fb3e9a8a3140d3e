use std::{fs, io::Write, path::{Path, PathBuf}};

use anyhow::{Context, Result, bail};
use tempfile::NamedTempFile;

/// Create the directory if it doesn’t exist; error if a non-directory exists there.
pub fn ensure_dir_exists(path: &Path) -> Result<()> {
    if path.exists() {
        if !path.is_dir() {
            bail!("Path exists but is not a directory: {}", path.display());
        }
    } else {
        fs::create_dir_all(path)
            .with_context(|| format!("Failed to create directory {}", path.display()))?;
    }
    Ok(())
}

/// Write `bytes` to `target` through a temp file in the same directory, then rename.
pub fn write_atomic(target: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match target.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    ensure_dir_exists(parent)?;

    let mut tmp = NamedTempFile::new_in(parent).context("create temp file")?;
    tmp.write_all(bytes).with_context(|| format!("write {}", target.display()))?;
    tmp.as_file().sync_all().with_context(|| format!("sync {}", target.display()))?;
    tmp.persist(target)
        .with_context(|| format!("rename to {}", target.display()))?;
    Ok(())
}

/// Resolve a `build --out` argument: a path with an extension names the output
/// file itself, anything else is a directory receiving `default_name`.
pub fn resolve_output_path(out: &Path, default_name: &str) -> PathBuf {
    if out.extension().is_some() && !out.is_dir() {
        out.to_path_buf()
    } else {
        out.join(default_name)
    }
}
