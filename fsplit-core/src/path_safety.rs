use std::path::{Component, Path, PathBuf};

use crate::error::{Error, IoContext, Result};

#[derive(Clone, Copy, Debug, Default)]
pub struct PathPolicy {
    pub follow_symlinks: bool,
}

/// True when `name` is exactly one normal path component: no separators,
/// not `.`/`..`, not empty.
pub fn is_plain_component(name: &str) -> bool {
    if name.is_empty() || name.contains('/') || name.contains('\\') {
        return false;
    }
    let mut comps = Path::new(name).components();
    matches!((comps.next(), comps.next()), (Some(Component::Normal(_)), None))
}

/// Resolve chunk `name` against `root` (the manifest directory).
///
/// Rejects absolute names and parent traversal. Without `follow_symlinks`
/// a symlinked chunk is refused; with it, the canonical target must stay
/// under `root`. A name that simply does not exist resolves fine; the
/// caller reports it as a missing chunk.
pub fn resolve_chunk(root: &Path, name: &str, policy: PathPolicy) -> Result<PathBuf> {
    let rel = Path::new(name);
    if rel.is_absolute() {
        return Err(Error::InvalidArgument(format!("absolute chunk path not allowed: {name:?}")));
    }
    for comp in rel.components() {
        if matches!(comp, Component::ParentDir) {
            return Err(Error::InvalidArgument(format!(
                "parent traversal not allowed: {name:?}"
            )));
        }
    }
    let candidate = root.join(rel);
    let meta = match std::fs::symlink_metadata(&candidate) {
        Ok(m) => m,
        Err(_) => return Ok(candidate),
    };
    if !meta.file_type().is_symlink() {
        return Ok(candidate);
    }
    if !policy.follow_symlinks {
        return Err(Error::InvalidArgument(format!(
            "symlink encountered (not following): {}",
            candidate.display()
        )));
    }
    let root_can = std::fs::canonicalize(root).at(root)?;
    let cand_can = match std::fs::canonicalize(&candidate) {
        Ok(p) => p,
        // Dangling link: treat like an absent chunk.
        Err(_) => return Ok(candidate),
    };
    if !cand_can.starts_with(&root_can) {
        return Err(Error::InvalidArgument(format!("chunk path escapes root: {name:?}")));
    }
    Ok(cand_can)
}
