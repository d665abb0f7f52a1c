use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};

use crate::error::{Error, IoContext, Result};
use crate::fsio;
use crate::naming;
use crate::path_safety::is_plain_component;

pub const FORMAT_TAG: &str = "fsplit-manifest";
pub const FORMAT_VERSION: u32 = 1;

/// Describes one split: enough to put the original back together from the
/// chunk files sitting next to the manifest.
///
/// Chunk lengths are not stored; they follow from `original_size` and
/// `chunk_size` (see [`Manifest::chunk_len`]).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    pub format: String,
    pub version: u32,
    pub created_utc: String,
    pub original_filename: String,
    pub original_size: u64,
    pub chunk_size: u64,
    pub chunk_count: u64,
    pub name_width: usize,
    /// Reconstruction order. Not necessarily the lexical order of the names.
    pub chunk_names: Vec<String>,
    /// BLAKE3 hex digest per chunk, same order as `chunk_names`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chunk_checksums: Option<Vec<String>>,
    /// BLAKE3 hex digest of the whole original file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_checksum: Option<String>,
}

impl Manifest {
    /// Expected byte length of chunk `index` (0-based).
    pub fn chunk_len(&self, index: usize) -> u64 {
        let n = self.chunk_count;
        let i = index as u64;
        if i + 1 < n {
            self.chunk_size
        } else if i + 1 == n {
            self.original_size.saturating_sub(self.chunk_size.saturating_mul(n - 1))
        } else {
            0
        }
    }

    pub fn checksum(&self, index: usize) -> Option<&str> {
        self.chunk_checksums.as_ref().and_then(|c| c.get(index)).map(String::as_str)
    }

    pub fn has_checksums(&self) -> bool {
        self.chunk_checksums.is_some()
    }

    /// Check the structural invariants. `path` is only used to label errors.
    pub fn validate(&self, path: &Path) -> Result<()> {
        let bad = |reason: String| Error::invalid_manifest(path, reason);

        if self.format != FORMAT_TAG {
            return Err(bad(format!("unknown format {:?}", self.format)));
        }
        if self.version != FORMAT_VERSION {
            return Err(bad(format!("unsupported version {}", self.version)));
        }
        if self.chunk_size == 0 {
            return Err(bad("chunk_size must be positive".into()));
        }
        if !is_plain_component(&self.original_filename) {
            return Err(bad(format!(
                "original_filename {:?} is not a plain file name",
                self.original_filename
            )));
        }
        if self.chunk_count != self.chunk_names.len() as u64 {
            return Err(bad(format!(
                "chunk_count {} does not match {} chunk name(s)",
                self.chunk_count,
                self.chunk_names.len()
            )));
        }
        let expected = naming::expected_chunks(self.original_size, self.chunk_size);
        if self.chunk_count != expected {
            return Err(bad(format!(
                "chunk_count {} inconsistent with original_size {} / chunk_size {} (expected {})",
                self.chunk_count, self.original_size, self.chunk_size, expected
            )));
        }

        let mut seen = HashSet::with_capacity(self.chunk_names.len());
        for name in &self.chunk_names {
            if !is_plain_component(name) {
                return Err(bad(format!("chunk name {name:?} is not a plain file name")));
            }
            if !seen.insert(name.as_str()) {
                return Err(bad(format!("chunk name {name:?} listed twice")));
            }
        }

        if let Some(sums) = &self.chunk_checksums {
            if sums.len() != self.chunk_names.len() {
                return Err(bad(format!(
                    "{} chunk checksum(s) for {} chunk(s)",
                    sums.len(),
                    self.chunk_names.len()
                )));
            }
            if let Some(s) = sums.iter().find(|s| !is_hex_digest(s)) {
                return Err(bad(format!("malformed chunk checksum {s:?}")));
            }
        }
        if let Some(s) = &self.file_checksum {
            if !is_hex_digest(s) {
                return Err(bad(format!("malformed file checksum {s:?}")));
            }
        }
        Ok(())
    }

    /// Read, parse and validate a manifest file.
    pub fn load(path: &Path) -> Result<Manifest> {
        let f = File::open(path).at(path)?;
        let mf: Manifest = serde_json::from_reader(BufReader::new(f)).map_err(|e| {
            if e.is_io() {
                Error::Io { path: path.to_path_buf(), source: e.into() }
            } else {
                Error::invalid_manifest(path, e.to_string())
            }
        })?;
        mf.validate(path)?;
        Ok(mf)
    }

    /// Write the manifest into `dir` as `<original_filename>.manifest`.
    ///
    /// The JSON goes to a temporary file in the same directory first and is
    /// renamed into place, so readers see either nothing or the whole file.
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(naming::manifest_name(&self.original_filename));
        let mut tmp = fsio::temp_file_in(dir)?;
        let json = serde_json::to_vec_pretty(self).map_err(|e| Error::Io {
            path: path.clone(),
            source: e.into(),
        })?;
        tmp.write_all(&json).at(tmp.path())?;
        tmp.write_all(b"\n").at(tmp.path())?;
        tmp.as_file().sync_all().at(tmp.path())?;
        tmp.persist(&path).map_err(|e| Error::Io { path: path.clone(), source: e.error })?;
        Ok(path)
    }
}

pub(crate) fn is_hex_digest(s: &str) -> bool {
    s.len() == 64 && s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}
