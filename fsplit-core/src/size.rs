use crate::error::{Error, Result};

const KIB: u64 = 1 << 10;
const MIB: u64 = 1 << 20;
const GIB: u64 = 1 << 30;

/// Parse a chunk size. A bare integer counts mebibytes; otherwise a `B`,
/// `K`, `M` or `G` suffix (case-insensitive, optional trailing `iB`/`B`)
/// picks the unit. Zero and overflow are rejected.
pub fn parse_chunk_size(spec: &str) -> Result<u64> {
    let s = spec.trim().to_uppercase();
    let s = s.strip_suffix("IB").map(|r| r.to_string()).unwrap_or(s);
    let (num, mul) = if let Some(n) = s.strip_suffix('K').or_else(|| s.strip_suffix("KB")) {
        (n, KIB)
    } else if let Some(n) = s.strip_suffix('M').or_else(|| s.strip_suffix("MB")) {
        (n, MIB)
    } else if let Some(n) = s.strip_suffix('G').or_else(|| s.strip_suffix("GB")) {
        (n, GIB)
    } else if let Some(n) = s.strip_suffix('B') {
        (n, 1)
    } else {
        (&s[..], MIB)
    };
    let v: u64 = num
        .trim()
        .parse()
        .map_err(|_| Error::InvalidArgument(format!("bad chunk size {spec:?}")))?;
    if v == 0 {
        return Err(Error::InvalidArgument(format!("chunk size must be positive: {spec:?}")));
    }
    v.checked_mul(mul)
        .ok_or_else(|| Error::InvalidArgument(format!("chunk size too large: {spec:?}")))
}
