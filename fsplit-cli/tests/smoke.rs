use assert_cmd::prelude::*;
use assert_fs::prelude::*;
use predicates::prelude::*;
use rand::{rngs::StdRng, Rng, SeedableRng};
use std::process::Command;

fn write_random(path: &std::path::Path, bytes: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let data: Vec<u8> = (0..bytes).map(|_| rng.gen()).collect();
    std::fs::write(path, &data).unwrap();
    data
}

#[test]
fn split_merge_happy_path() {
    let td = assert_fs::TempDir::new().unwrap();
    let input = td.child("video.bin");
    let data = write_random(input.path(), 300 * 1024, 1);

    // split: stdout is exactly the manifest path
    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["split", "video.bin", "-o", "parts", "-s", "128K"])
        .assert()
        .success()
        .stdout(predicate::str::diff("parts/video.bin.manifest\n"))
        .stderr(predicate::str::contains("3 chunk(s)"));

    td.child("parts/video.bin.part001").assert(predicate::path::is_file());
    td.child("parts/video.bin.part003").assert(predicate::path::is_file());
    td.child("parts/video.bin.part004").assert(predicate::path::missing());

    // verify OK
    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["verify", "parts/video.bin.manifest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("OK"));

    // merge with default output path
    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["merge", "parts/video.bin.manifest"])
        .assert()
        .success()
        .stdout(predicate::str::diff("parts/merged_video.bin\n"));
    td.child("parts/merged_video.bin").assert(predicate::path::eq_file(input.path()));

    // merge to an explicit path
    let out = td.child("restored/video.bin");
    Command::cargo_bin("fsplit")
        .unwrap()
        .args(["merge", td.child("parts/video.bin.manifest").path().to_str().unwrap()])
        .args(["-o", out.path().to_str().unwrap()])
        .assert()
        .success();
    assert_eq!(std::fs::read(out.path()).unwrap(), data);
}

#[test]
fn default_chunk_size_is_ten_mib_and_output_dir_is_input_dir() {
    let td = assert_fs::TempDir::new().unwrap();
    let input = td.child("small.dat");
    write_random(input.path(), 4096, 2);

    Command::cargo_bin("fsplit")
        .unwrap()
        .env_remove("FSPLIT_CHUNK_SIZE")
        .args(["split", input.path().to_str().unwrap()])
        .assert()
        .success();

    let mpath = td.child("small.dat.manifest");
    mpath.assert(predicate::path::is_file());
    let v: serde_json::Value =
        serde_json::from_slice(&std::fs::read(mpath.path()).unwrap()).unwrap();
    assert_eq!(v["chunk_size"], 10 * 1024 * 1024);
    assert_eq!(v["chunk_count"], 1);
}

#[test]
fn chunk_size_from_environment() {
    let td = assert_fs::TempDir::new().unwrap();
    let input = td.child("a.bin");
    write_random(input.path(), 5000, 3);

    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .env("FSPLIT_CHUNK_SIZE", "1K")
        .args(["split", "a.bin", "-o", "p"])
        .assert()
        .success();
    td.child("p/a.bin.part005").assert(predicate::path::is_file());
}

#[test]
fn missing_chunk_exits_nonzero_and_names_it() {
    let td = assert_fs::TempDir::new().unwrap();
    let input = td.child("a.bin");
    write_random(input.path(), 10_000, 4);

    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["split", "a.bin", "-o", "parts", "-s", "4096B"])
        .assert()
        .success();
    std::fs::remove_file(td.child("parts/a.bin.part002").path()).unwrap();

    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["merge", "parts/a.bin.manifest", "-o", "out.bin"])
        .assert()
        .code(5)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("a.bin.part002"));
    td.child("out.bin").assert(predicate::path::missing());

    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["verify", "parts/a.bin.manifest"])
        .assert()
        .code(5)
        .stdout(predicate::str::contains("BAD"))
        .stderr(predicate::str::contains("missing"));
}

#[test]
fn corrupted_chunk_fails_unless_no_verify() {
    let td = assert_fs::TempDir::new().unwrap();
    let input = td.child("a.bin");
    write_random(input.path(), 10_000, 5);

    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["split", "a.bin", "-o", "parts", "-s", "4K"])
        .assert()
        .success();
    let p = td.child("parts/a.bin.part001");
    let mut bytes = std::fs::read(p.path()).unwrap();
    bytes[0] ^= 1;
    std::fs::write(p.path(), bytes).unwrap();

    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["merge", "parts/a.bin.manifest", "-o", "out.bin"])
        .assert()
        .code(6)
        .stderr(predicate::str::contains("checksum"));

    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["merge", "parts/a.bin.manifest", "-o", "out.bin", "--no-verify"])
        .assert()
        .success();
    td.child("out.bin").assert(predicate::path::is_file());
}

#[test]
fn bad_inputs_exit_nonzero() {
    let td = assert_fs::TempDir::new().unwrap();

    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["split", "does-not-exist.bin"])
        .assert()
        .code(3)
        .stderr(predicate::str::starts_with("fsplit: "));

    td.child("a.bin").write_binary(b"abc").unwrap();
    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["split", "a.bin", "-s", "0"])
        .assert()
        .code(2);

    td.child("junk.manifest").write_str("original_file: a.bin\n").unwrap();
    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["merge", "junk.manifest"])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("invalid manifest"));
}

#[test]
fn empty_file_round_trip_and_info() {
    let td = assert_fs::TempDir::new().unwrap();
    td.child("empty").touch().unwrap();

    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["split", "empty", "-o", "parts"])
        .assert()
        .success()
        .stderr(predicate::str::contains("is empty"));

    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["info", "parts/empty.manifest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 bytes in 0 chunk(s)"));

    Command::cargo_bin("fsplit")
        .unwrap()
        .current_dir(td.path())
        .args(["merge", "parts/empty.manifest", "-o", "back"])
        .assert()
        .success();
    assert_eq!(std::fs::metadata(td.child("back").path()).unwrap().len(), 0);
}

#[test]
fn help_describes_progress_flags() {
    for sub in ["split", "merge"] {
        Command::cargo_bin("fsplit")
            .unwrap()
            .args([sub, "--help"])
            .assert()
            .success()
            .stdout(predicate::str::is_match(r"--progress\s+Log the percentage").unwrap());
    }
}
