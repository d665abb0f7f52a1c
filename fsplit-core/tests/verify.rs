use fsplit_core::path_safety::PathPolicy;
use fsplit_core::split::{SplitConfig, Splitter};
use fsplit_core::verify::{verify, verify_with_policy};
use std::fs;

fn split_random(root: &std::path::Path, checksums: bool) -> std::path::PathBuf {
    let input = root.join("data.bin");
    let mut buf = vec![0u8; 50_000];
    fastrand::seed(0x1BADF00D);
    for b in &mut buf {
        *b = fastrand::u8(..);
    }
    fs::write(&input, &buf).unwrap();
    let cfg = SplitConfig { chunk_size: 8192, checksums, check_free_space: false };
    Splitter::split(&input, &root.join("parts"), &cfg).unwrap().manifest_path
}

#[test]
fn intact_split_verifies() {
    let td = tempfile::tempdir().unwrap();
    let mpath = split_random(td.path(), true);
    let rep = verify(&mpath).unwrap();
    assert!(rep.is_ok(), "{rep:?}");
    assert_eq!(rep.chunks_ok, 7);
    assert!(rep.checksums_checked);
    assert_eq!(rep.file_ok, Some(true));
}

#[test]
fn verify_sorts_damage_into_buckets() {
    let td = tempfile::tempdir().unwrap();
    let mpath = split_random(td.path(), true);
    let parts = td.path().join("parts");

    fs::remove_file(parts.join("data.bin.part002")).unwrap();
    fs::write(parts.join("data.bin.part004"), b"short").unwrap();
    let p6 = parts.join("data.bin.part006");
    let mut bytes = fs::read(&p6).unwrap();
    bytes[0] = bytes[0].wrapping_add(1);
    fs::write(&p6, &bytes).unwrap();

    let rep = verify(&mpath).unwrap();
    assert!(!rep.is_ok());
    assert_eq!(rep.missing, vec!["data.bin.part002"]);
    assert_eq!(rep.wrong_size, vec!["data.bin.part004"]);
    assert_eq!(rep.corrupt, vec!["data.bin.part006"]);
    assert_eq!(rep.chunks_ok, 4);
    // Gaps in the stream make the whole-file digest meaningless.
    assert_eq!(rep.file_ok, None);
}

#[test]
fn without_checksums_only_presence_and_size_count() {
    let td = tempfile::tempdir().unwrap();
    let mpath = split_random(td.path(), false);
    let p1 = td.path().join("parts/data.bin.part001");
    let mut bytes = fs::read(&p1).unwrap();
    bytes[10] ^= 0x55;
    fs::write(&p1, &bytes).unwrap();

    let rep = verify_with_policy(&mpath, PathPolicy::default()).unwrap();
    assert!(rep.is_ok());
    assert!(!rep.checksums_checked);
    assert_eq!(rep.file_ok, None);
}
