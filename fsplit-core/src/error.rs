use std::io;
use std::path::{Path, PathBuf};

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Coarse classification of an [`Error`], stable for callers that branch on
/// the outcome (exit codes, dialog text).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidManifest,
    ChunkMissing,
    Corrupt,
    IoFailure,
    InvalidArgument,
    Cancelled,
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("invalid manifest {}: {reason}", path.display())]
    InvalidManifest { path: PathBuf, reason: String },

    #[error("chunk {position} ({name}) is missing: {}", path.display())]
    ChunkMissing { position: usize, name: String, path: PathBuf },

    #[error("chunk {position} ({name}) has {actual} bytes, expected {expected}")]
    ChunkSize {
        position: usize,
        name: String,
        expected: u64,
        actual: u64,
    },

    #[error("chunk {position} ({name}) failed checksum verification")]
    ChecksumMismatch { position: usize, name: String },

    #[error("reassembled {} does not match the original file checksum", path.display())]
    FileChecksum { path: PathBuf },

    #[error("merged output {} has {actual} bytes, expected {expected}", path.display())]
    OutputSize { path: PathBuf, expected: u64, actual: u64 },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("cancelled after {completed} chunk(s)")]
    Cancelled { completed: usize },

    #[error("I/O failure on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NotFound { .. } => ErrorKind::NotFound,
            Error::InvalidManifest { .. } => ErrorKind::InvalidManifest,
            Error::ChunkMissing { .. } | Error::ChunkSize { .. } => ErrorKind::ChunkMissing,
            Error::ChecksumMismatch { .. } | Error::FileChecksum { .. } | Error::OutputSize { .. } => {
                ErrorKind::Corrupt
            }
            Error::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Error::Cancelled { .. } => ErrorKind::Cancelled,
            Error::Io { .. } => ErrorKind::IoFailure,
        }
    }

    pub(crate) fn invalid_manifest(path: &Path, reason: impl Into<String>) -> Self {
        Error::InvalidManifest { path: path.to_path_buf(), reason: reason.into() }
    }
}

/// Attach the offending path to an `io::Error`. A missing file becomes
/// [`Error::NotFound`] so callers never have to inspect the io kind.
pub(crate) trait IoContext<T> {
    fn at(self, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for io::Result<T> {
    fn at(self, path: &Path) -> Result<T> {
        self.map_err(|source| {
            if source.kind() == io::ErrorKind::NotFound {
                Error::NotFound { path: path.to_path_buf() }
            } else {
                Error::Io { path: path.to_path_buf(), source }
            }
        })
    }
}
