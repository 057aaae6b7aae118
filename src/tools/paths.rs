//! Confinement of tool paths to the project root.

use anyhow::Result;
use std::fs;
use std::path::{Component, Path, PathBuf};

fn join_root(project_root: &Path, path: &str) -> PathBuf {
    if Path::new(path).is_absolute() {
        PathBuf::from(path)
    } else {
        project_root.join(path)
    }
}

/// Resolves an existing path and checks it stays within `project_root`.
pub(crate) fn resolve_existing(project_root: &Path, path: &str) -> Result<PathBuf> {
    let canonical = join_root(project_root, path).canonicalize()?;
    let root_canonical = project_root.canonicalize()?;
    if !canonical.starts_with(&root_canonical) {
        anyhow::bail!("Path escapes project directory: {}", path);
    }
    Ok(canonical)
}

/// Resolves a path that may not exist yet.
///
/// `..` components are rejected outright so nothing is created outside the
/// root. The parent is created if needed and canonicalized instead of the
/// file itself.
pub(crate) fn resolve_for_write(project_root: &Path, path: &str) -> Result<PathBuf> {
    if Path::new(path)
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        anyhow::bail!("Path escapes project directory: {}", path);
    }
    let resolved = join_root(project_root, path);
    if !resolved.starts_with(project_root) {
        anyhow::bail!("Path escapes project directory: {}", path);
    }
    let parent = resolved
        .parent()
        .ok_or_else(|| anyhow::anyhow!("Path has no parent directory: {}", path))?;
    let filename = resolved
        .file_name()
        .ok_or_else(|| anyhow::anyhow!("Path has no filename: {}", path))?;

    fs::create_dir_all(parent)?;
    let parent_canonical = parent.canonicalize()?;
    let root_canonical = project_root.canonicalize()?;
    if !parent_canonical.starts_with(&root_canonical) {
        anyhow::bail!("Path escapes project directory: {}", path);
    }
    Ok(parent_canonical.join(filename))
}
