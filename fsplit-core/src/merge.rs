use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::error::{Error, IoContext, Result};
use crate::fsio::{self, COPY_BUF};
use crate::manifest::Manifest;
use crate::naming;
use crate::path_safety::PathPolicy;
use crate::progress::{NoProgress, ProgressSink};
use crate::verify::{probe_chunk, ChunkState};

#[derive(Clone, Debug)]
pub struct MergeConfig {
    /// Check chunk and whole-file digests when the manifest has them.
    pub verify_checksums: bool,
    pub policy: PathPolicy,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self { verify_checksums: true, policy: PathPolicy::default() }
    }
}

/// `merged_<original_filename>` next to the manifest.
pub fn default_output_path(manifest_path: &Path, manifest: &Manifest) -> PathBuf {
    fsio::base_dir(manifest_path).join(naming::merged_name(&manifest.original_filename))
}

pub struct Merger;

impl Merger {
    pub fn merge(manifest_path: &Path, output_path: &Path, cfg: &MergeConfig) -> Result<PathBuf> {
        Self::merge_with(manifest_path, output_path, cfg, &NoProgress, &CancelToken::new())
    }

    /// Reassemble the file described by `manifest_path` into `output_path`.
    ///
    /// Every chunk is located and size-checked before any byte is written.
    /// Output goes to a temporary file beside `output_path` and is renamed
    /// over it only after the size post-condition (and checksums, when
    /// enabled) hold; on any failure `output_path` is left as it was.
    pub fn merge_with(
        manifest_path: &Path,
        output_path: &Path,
        cfg: &MergeConfig,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<PathBuf> {
        let mf = Manifest::load(manifest_path)?;
        let root = fsio::base_dir(manifest_path);
        let chunks = locate_chunks(root, &mf, cfg.policy)?;

        let out_dir = fsio::base_dir(output_path);
        fsio::create_dir(out_dir)?;
        let mut tmp = fsio::temp_file_in(out_dir)?;
        let tmp_path = tmp.path().to_path_buf();

        let verify = cfg.verify_checksums;
        let mut file_hasher = (verify && mf.file_checksum.is_some()).then(blake3::Hasher::new);
        let total = mf.chunk_count;
        let mut buf = vec![0u8; COPY_BUF];
        let mut written = 0u64;

        tracing::debug!(manifest = %manifest_path.display(), chunks = total, "merging");
        {
            let mut w = BufWriter::with_capacity(COPY_BUF, tmp.as_file_mut());
            for (i, path) in chunks.iter().enumerate() {
                if cancel.is_cancelled() {
                    tracing::warn!(merged = i, "merge cancelled; partial output discarded");
                    return Err(Error::Cancelled { completed: i });
                }
                let name = &mf.chunk_names[i];
                let expected = mf.chunk_len(i);
                let mut src = File::open(path).map_err(|e| match e.kind() {
                    std::io::ErrorKind::NotFound => Error::ChunkMissing {
                        position: i + 1,
                        name: name.clone(),
                        path: path.clone(),
                    },
                    _ => Error::Io { path: path.clone(), source: e },
                })?;
                let mut chunk_hasher =
                    (verify && mf.checksum(i).is_some()).then(blake3::Hasher::new);
                let n = fsio::copy_limited(&mut src, &mut w, expected, &mut buf, |b| {
                    if let Some(h) = chunk_hasher.as_mut() {
                        h.update(b);
                    }
                    if let Some(h) = file_hasher.as_mut() {
                        h.update(b);
                    }
                })
                .at(path)?;
                if n != expected {
                    return Err(Error::ChunkSize {
                        position: i + 1,
                        name: name.clone(),
                        expected,
                        actual: n,
                    });
                }
                if let (Some(h), Some(sum)) = (&chunk_hasher, mf.checksum(i)) {
                    if fsio::hex_digest(h) != sum {
                        let position = i + 1;
                        return Err(Error::ChecksumMismatch { position, name: name.clone() });
                    }
                }
                written += n;
                tracing::debug!(chunk = %name, bytes = n, "chunk merged");
                progress.report(i as u64 + 1, total);
            }
            w.flush().at(&tmp_path)?;
        }

        if let (Some(h), Some(sum)) = (&file_hasher, &mf.file_checksum) {
            if fsio::hex_digest(h) != *sum {
                return Err(Error::FileChecksum { path: output_path.to_path_buf() });
            }
        }

        tmp.as_file().sync_all().at(&tmp_path)?;
        let actual = tmp.as_file().metadata().at(&tmp_path)?.len();
        if actual != mf.original_size || written != mf.original_size {
            return Err(Error::OutputSize {
                path: output_path.to_path_buf(),
                expected: mf.original_size,
                actual,
            });
        }
        tmp.persist(output_path)
            .map_err(|e| Error::Io { path: output_path.to_path_buf(), source: e.error })?;

        tracing::info!(
            output = %output_path.display(),
            chunks = total,
            bytes = actual,
            "merge complete"
        );
        Ok(output_path.to_path_buf())
    }
}

/// Resolve every chunk up front so a missing or truncated one is reported
/// before the output is touched.
fn locate_chunks(root: &Path, mf: &Manifest, policy: PathPolicy) -> Result<Vec<PathBuf>> {
    let mut paths = Vec::with_capacity(mf.chunk_names.len());
    for (i, name) in mf.chunk_names.iter().enumerate() {
        match probe_chunk(root, mf, i, policy)? {
            ChunkState::Present(path) => paths.push(path),
            ChunkState::Missing(path) => {
                return Err(Error::ChunkMissing { position: i + 1, name: name.clone(), path });
            }
            ChunkState::WrongSize { actual } => {
                return Err(Error::ChunkSize {
                    position: i + 1,
                    name: name.clone(),
                    expected: mf.chunk_len(i),
                    actual,
                });
            }
        }
    }
    Ok(paths)
}
