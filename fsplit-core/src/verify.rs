use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use crate::error::{Error, IoContext, Result};
use crate::fsio::{self, COPY_BUF};
use crate::manifest::Manifest;
use crate::path_safety::{resolve_chunk, PathPolicy};

/// Outcome of checking a manifest's chunks without reassembling them.
#[derive(Debug, Clone, Default)]
pub struct VerifyReport {
    pub chunks_ok: u64,
    pub missing: Vec<String>,
    pub wrong_size: Vec<String>,
    pub corrupt: Vec<String>,
    /// Whether the manifest carried per-chunk checksums to compare against.
    pub checksums_checked: bool,
    /// Whole-file checksum result; `None` when the manifest has none or a
    /// chunk was missing or short, so the stream could not be hashed.
    pub file_ok: Option<bool>,
}

impl VerifyReport {
    pub fn is_ok(&self) -> bool {
        self.missing.is_empty()
            && self.wrong_size.is_empty()
            && self.corrupt.is_empty()
            && self.file_ok != Some(false)
    }
}

pub(crate) enum ChunkState {
    Present(PathBuf),
    Missing(PathBuf),
    WrongSize { actual: u64 },
}

/// Locate chunk `index` under `root` and compare its length with the one
/// the manifest implies.
pub(crate) fn probe_chunk(
    root: &Path,
    mf: &Manifest,
    index: usize,
    policy: PathPolicy,
) -> Result<ChunkState> {
    let path = resolve_chunk(root, &mf.chunk_names[index], policy)?;
    let meta = match std::fs::metadata(&path) {
        Ok(m) => m,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(ChunkState::Missing(path)),
        Err(source) => return Err(Error::Io { path, source }),
    };
    if !meta.is_file() {
        return Ok(ChunkState::Missing(path));
    }
    if meta.len() != mf.chunk_len(index) {
        return Ok(ChunkState::WrongSize { actual: meta.len() });
    }
    Ok(ChunkState::Present(path))
}

pub fn verify(manifest_path: &Path) -> Result<VerifyReport> {
    verify_with_policy(manifest_path, PathPolicy::default())
}

pub fn verify_with_policy(manifest_path: &Path, policy: PathPolicy) -> Result<VerifyReport> {
    let mf = Manifest::load(manifest_path)?;
    let root = fsio::base_dir(manifest_path);
    let hashing = mf.has_checksums() || mf.file_checksum.is_some();
    let mut rep = VerifyReport { checksums_checked: mf.has_checksums(), ..Default::default() };
    let mut file_hasher = mf.file_checksum.is_some().then(blake3::Hasher::new);
    let mut stream_intact = true;
    let mut buf = vec![0u8; COPY_BUF];

    for (i, name) in mf.chunk_names.iter().enumerate() {
        let path = match probe_chunk(root, &mf, i, policy)? {
            ChunkState::Present(path) => path,
            ChunkState::Missing(_) => {
                rep.missing.push(name.clone());
                stream_intact = false;
                continue;
            }
            ChunkState::WrongSize { actual } => {
                tracing::debug!(chunk = %name, actual, expected = mf.chunk_len(i), "wrong size");
                rep.wrong_size.push(name.clone());
                stream_intact = false;
                continue;
            }
        };
        if !hashing {
            rep.chunks_ok += 1;
            continue;
        }

        let mut f = File::open(&path).at(&path)?;
        let mut h = blake3::Hasher::new();
        fsio::copy_limited(&mut f, &mut io::sink(), mf.chunk_len(i), &mut buf, |b| {
            h.update(b);
            if let Some(fh) = file_hasher.as_mut() {
                fh.update(b);
            }
        })
        .at(&path)?;
        match mf.checksum(i) {
            Some(expected) if fsio::hex_digest(&h) != expected => rep.corrupt.push(name.clone()),
            _ => rep.chunks_ok += 1,
        }
    }

    rep.file_ok = match (&file_hasher, &mf.file_checksum) {
        (Some(h), Some(expected)) if stream_intact => Some(fsio::hex_digest(h) == *expected),
        _ => None,
    };
    tracing::info!(
        manifest = %manifest_path.display(),
        ok = rep.chunks_ok,
        missing = rep.missing.len(),
        wrong_size = rep.wrong_size.len(),
        corrupt = rep.corrupt.len(),
        "verify complete"
    );
    Ok(rep)
}
