use std::fs::File;
use std::io::BufRead;
use std::path::{Path, PathBuf};

use crate::cancel::CancelToken;
use crate::error::{Error, IoContext, Result};
use crate::fsio::{self, COPY_BUF};
use crate::manifest::{Manifest, FORMAT_TAG, FORMAT_VERSION};
use crate::naming;
use crate::path_safety::is_plain_component;
use crate::progress::{NoProgress, ProgressSink};

pub const DEFAULT_CHUNK_SIZE: u64 = 10 * 1024 * 1024;

#[derive(Clone, Debug)]
pub struct SplitConfig {
    /// Nominal chunk length in bytes; the last chunk may be shorter.
    pub chunk_size: u64,
    /// Record BLAKE3 digests per chunk and for the whole file.
    pub checksums: bool,
    /// Refuse to start when the output directory lacks room for the input.
    pub check_free_space: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self { chunk_size: DEFAULT_CHUNK_SIZE, checksums: true, check_free_space: true }
    }
}

impl SplitConfig {
    pub fn with_chunk_size(chunk_size: u64) -> Self {
        Self { chunk_size, ..Self::default() }
    }
}

#[derive(Clone, Debug)]
pub struct SplitOutcome {
    pub manifest: Manifest,
    pub manifest_path: PathBuf,
}

pub struct Splitter;

impl Splitter {
    /// Split `input` into `<name>.partNNN` files under `output_dir` and write
    /// `<name>.manifest` next to them.
    pub fn split(input: &Path, output_dir: &Path, cfg: &SplitConfig) -> Result<SplitOutcome> {
        Self::split_with(input, output_dir, cfg, &NoProgress, &CancelToken::new())
    }

    /// Like [`Splitter::split`], reporting `(bytes_written, total_bytes)` after
    /// every chunk and polling `cancel` before starting each one.
    ///
    /// The manifest is written only after every chunk is on disk. A failure
    /// or cancellation part way leaves the chunks written so far in place and
    /// no manifest.
    pub fn split_with(
        input: &Path,
        output_dir: &Path,
        cfg: &SplitConfig,
        progress: &dyn ProgressSink,
        cancel: &CancelToken,
    ) -> Result<SplitOutcome> {
        if cfg.chunk_size == 0 {
            return Err(Error::InvalidArgument("chunk size must be positive".into()));
        }
        let (mut reader, total) = fsio::open_source(input)?;
        let base = input
            .file_name()
            .and_then(|s| s.to_str())
            .filter(|s| is_plain_component(s))
            .ok_or_else(|| {
                Error::InvalidArgument(format!("unusable file name: {}", input.display()))
            })?
            .to_string();

        fsio::create_dir(output_dir)?;
        if cfg.check_free_space {
            fsio::ensure_free_space(output_dir, total)?;
        }

        let width = naming::name_width(naming::expected_chunks(total, cfg.chunk_size));
        let mut buf = vec![0u8; cfg.chunk_size.min(COPY_BUF as u64) as usize];
        let mut file_hasher = cfg.checksums.then(blake3::Hasher::new);
        let mut chunk_names: Vec<String> = Vec::new();
        let mut chunk_sums: Vec<String> = Vec::new();
        let mut written = 0u64;

        tracing::debug!(input = %input.display(), total, chunk_size = cfg.chunk_size, "splitting");

        loop {
            if cancel.is_cancelled() {
                tracing::warn!(
                    written = chunk_names.len(),
                    dir = %output_dir.display(),
                    "split cancelled; partial chunks left without a manifest"
                );
                return Err(Error::Cancelled { completed: chunk_names.len() });
            }
            if reader.fill_buf().at(input)?.is_empty() {
                break;
            }

            let name = naming::part_name(&base, chunk_names.len() as u64 + 1, width);
            let path = output_dir.join(&name);
            let mut out = File::create(&path).at(&path)?;
            let mut chunk_hasher = cfg.checksums.then(blake3::Hasher::new);
            let n = fsio::copy_limited(&mut reader, &mut out, cfg.chunk_size, &mut buf, |b| {
                if let Some(h) = chunk_hasher.as_mut() {
                    h.update(b);
                }
                if let Some(h) = file_hasher.as_mut() {
                    h.update(b);
                }
            })
            .at(&path)?;
            out.sync_all().at(&path)?;

            written += n;
            tracing::debug!(chunk = %name, bytes = n, "chunk written");
            if let Some(h) = &chunk_hasher {
                chunk_sums.push(fsio::hex_digest(h));
            }
            chunk_names.push(name);
            progress.report(written, total.max(written));
        }

        let manifest = Manifest {
            format: FORMAT_TAG.to_string(),
            version: FORMAT_VERSION,
            created_utc: chrono::Utc::now().to_rfc3339(),
            original_filename: base,
            original_size: written,
            chunk_size: cfg.chunk_size,
            chunk_count: chunk_names.len() as u64,
            name_width: width,
            chunk_names,
            chunk_checksums: cfg.checksums.then_some(chunk_sums),
            file_checksum: file_hasher.as_ref().map(fsio::hex_digest),
        };
        let manifest_path = manifest.save(output_dir)?;
        tracing::info!(
            manifest = %manifest_path.display(),
            chunks = manifest.chunk_count,
            bytes = manifest.original_size,
            "split complete"
        );
        Ok(SplitOutcome { manifest, manifest_path })
    }
}
