/// Narrowest zero-padding used for part numbers.
pub const MIN_NAME_WIDTH: usize = 3;

/// Manifest file extension appended to the original file name.
pub const MANIFEST_EXT: &str = "manifest";

/// Digits needed to number `expected_chunks` parts, never below
/// [`MIN_NAME_WIDTH`].
pub fn name_width(expected_chunks: u64) -> usize {
    let digits = expected_chunks.max(1).ilog10() as usize + 1;
    digits.max(MIN_NAME_WIDTH)
}

/// Chunk file name for the 1-based `number`: `<base>.partNNN`.
pub fn part_name(base: &str, number: u64, width: usize) -> String {
    format!("{base}.part{number:0width$}")
}

pub fn manifest_name(base: &str) -> String {
    format!("{base}.{MANIFEST_EXT}")
}

/// Default merge target next to the manifest.
pub fn merged_name(original: &str) -> String {
    format!("merged_{original}")
}

/// Number of chunks a file of `size` bytes splits into.
pub fn expected_chunks(size: u64, chunk_size: u64) -> u64 {
    if chunk_size == 0 {
        return 0;
    }
    size.div_ceil(chunk_size)
}
