use fsplit_core::manifest::{Manifest, FORMAT_TAG, FORMAT_VERSION};
use fsplit_core::ErrorKind;
use std::fs;
use std::path::Path;

fn sample() -> Manifest {
    Manifest {
        format: FORMAT_TAG.to_string(),
        version: FORMAT_VERSION,
        created_utc: "2024-01-01T00:00:00+00:00".to_string(),
        original_filename: "data.bin".to_string(),
        original_size: 25,
        chunk_size: 10,
        chunk_count: 3,
        name_width: 3,
        chunk_names: vec![
            "data.bin.part001".to_string(),
            "data.bin.part002".to_string(),
            "data.bin.part003".to_string(),
        ],
        chunk_checksums: None,
        file_checksum: None,
    }
}

fn invalid(mf: &Manifest) -> String {
    let err = mf.validate(Path::new("data.bin.manifest")).expect_err("expected invalid manifest");
    assert_eq!(err.kind(), ErrorKind::InvalidManifest);
    err.to_string()
}

#[test]
fn sample_is_valid_and_lengths_derive() {
    let mf = sample();
    mf.validate(Path::new("x")).unwrap();
    assert_eq!(mf.chunk_len(0), 10);
    assert_eq!(mf.chunk_len(1), 10);
    assert_eq!(mf.chunk_len(2), 5);
    assert_eq!(mf.chunk_len(3), 0);
    assert_eq!((0..3).map(|i| mf.chunk_len(i)).sum::<u64>(), mf.original_size);
}

#[test]
fn count_mismatch_is_rejected() {
    let mut mf = sample();
    mf.chunk_count = 4;
    assert!(invalid(&mf).contains("chunk_count"));

    let mut mf = sample();
    mf.chunk_names.pop();
    mf.chunk_count = 2;
    assert!(invalid(&mf).contains("inconsistent"));
}

#[test]
fn zero_chunk_size_and_bad_names_are_rejected() {
    let mut mf = sample();
    mf.chunk_size = 0;
    invalid(&mf);

    let mut mf = sample();
    mf.chunk_names[1] = "sub/data.bin.part002".to_string();
    invalid(&mf);

    let mut mf = sample();
    mf.chunk_names[2] = mf.chunk_names[0].clone();
    assert!(invalid(&mf).contains("twice"));

    let mut mf = sample();
    mf.original_filename = "..".to_string();
    invalid(&mf);
}

#[test]
fn checksum_shape_is_checked() {
    let good = blake3::hash(b"x").to_hex().to_string();

    let mut mf = sample();
    mf.chunk_checksums = Some(vec![good.clone(), good.clone()]);
    invalid(&mf);

    let mut mf = sample();
    mf.chunk_checksums = Some(vec![good.clone(), good.clone(), "zz".to_string()]);
    assert!(invalid(&mf).contains("malformed"));

    let mut mf = sample();
    mf.chunk_checksums = Some(vec![good.clone(), good.clone(), good.clone()]);
    mf.file_checksum = Some(good.to_uppercase());
    invalid(&mf);
}

#[test]
fn unknown_format_or_version_is_rejected() {
    let mut mf = sample();
    mf.format = "something-else".to_string();
    invalid(&mf);

    let mut mf = sample();
    mf.version = 2;
    assert!(invalid(&mf).contains("version"));
}

#[test]
fn save_then_load_preserves_fields() {
    let td = tempfile::tempdir().unwrap();
    let mut mf = sample();
    let sum = blake3::hash(b"chunk").to_hex().to_string();
    mf.chunk_checksums = Some(vec![sum.clone(); 3]);
    mf.file_checksum = Some(sum);

    let path = mf.save(td.path()).unwrap();
    assert_eq!(path, td.path().join("data.bin.manifest"));
    assert_eq!(Manifest::load(&path).unwrap(), mf);

    // Self-describing JSON with the documented field names.
    let v: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
    assert_eq!(v["format"], "fsplit-manifest");
    assert_eq!(v["chunk_count"], 3);
    assert_eq!(v["chunk_names"][2], "data.bin.part003");
}

#[test]
fn load_reports_parse_errors_and_unknown_fields() {
    let td = tempfile::tempdir().unwrap();
    let path = td.path().join("x.manifest");

    fs::write(&path, "original_file: x\ntotal_chunks: 1\n").unwrap();
    assert_eq!(Manifest::load(&path).unwrap_err().kind(), ErrorKind::InvalidManifest);

    let mut v = serde_json::to_value(sample()).unwrap();
    v["extra"] = serde_json::json!(1);
    fs::write(&path, serde_json::to_vec(&v).unwrap()).unwrap();
    assert_eq!(Manifest::load(&path).unwrap_err().kind(), ErrorKind::InvalidManifest);

    let err = Manifest::load(&td.path().join("missing.manifest")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}
