//! Small I/O helpers shared by split, merge and verify.

use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Write};
use std::path::Path;

use crate::error::{Error, IoContext, Result};

/// Copy buffer size; also the read granularity for [`BufReader`]s.
pub const COPY_BUF: usize = 1 << 16;

/// Copy up to `limit` bytes from `src` to `dst` through `buf`, handing every
/// slice to `observe` before it is written. Stops early only at EOF.
pub fn copy_limited<R: Read, W: Write>(
    src: &mut R,
    dst: &mut W,
    limit: u64,
    buf: &mut [u8],
    mut observe: impl FnMut(&[u8]),
) -> io::Result<u64> {
    let mut copied = 0u64;
    while copied < limit {
        let want = (limit - copied).min(buf.len() as u64) as usize;
        let n = match src.read(&mut buf[..want]) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        observe(&buf[..n]);
        dst.write_all(&buf[..n])?;
        copied += n as u64;
    }
    Ok(copied)
}

/// Open an existing regular file for buffered sequential reading.
pub fn open_source(path: &Path) -> Result<(BufReader<File>, u64)> {
    let f = File::open(path).at(path)?;
    let meta = f.metadata().at(path)?;
    if meta.is_dir() {
        return Err(Error::InvalidArgument(format!("{} is a directory", path.display())));
    }
    Ok((BufReader::with_capacity(COPY_BUF, f), meta.len()))
}

pub fn create_dir(dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir).map_err(|source| Error::Io { path: dir.to_path_buf(), source })
}

/// Fail up front when `dir` cannot hold `needed` more bytes.
pub fn ensure_free_space(dir: &Path, needed: u64) -> Result<()> {
    let available = fs2::available_space(dir).at(dir)?;
    if available < needed {
        return Err(Error::Io {
            path: dir.to_path_buf(),
            source: io::Error::new(
                ErrorKind::Other,
                format!("{needed} bytes needed, {available} available"),
            ),
        });
    }
    Ok(())
}

/// Temporary file in `dir`, created with the same default mode as
/// `File::create` (0666 less the umask) rather than owner-only, so it can be
/// persisted as a user-visible file.
pub fn temp_file_in(dir: &Path) -> Result<tempfile::NamedTempFile> {
    #[cfg_attr(not(unix), allow(unused_mut))]
    let mut builder = tempfile::Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder.tempfile_in(dir).at(dir)
}

pub fn hex_digest(h: &blake3::Hasher) -> String {
    h.finalize().to_hex().to_string()
}

/// Directory containing `path`; `.` for a bare file name.
pub fn base_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}
