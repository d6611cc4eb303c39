use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn cli_cmd() -> Command {
    Command::new(assert_cmd::cargo::cargo_bin!("seglog"))
}

#[test]
fn append_read_and_inspect() {
    let tmp = tempdir().expect("tempdir");
    let dir = tmp.path().to_str().unwrap();

    cli_cmd()
        .args([
            "append", "--dir", dir, "--base", "16", "--value", "alpha", "beta", "gamma",
        ])
        .assert()
        .success()
        .stdout(predicate::str::diff("16\n17\n18\n"));

    cli_cmd()
        .args(["read", "--dir", dir, "--base", "16", "--offset", "17"])
        .assert()
        .success()
        .stdout(predicate::str::contains("beta"));

    cli_cmd()
        .args(["read", "--dir", dir, "--base", "16", "--offset", "16", "--hex"])
        .assert()
        .success()
        .stdout(predicate::str::contains(hex::encode("alpha")));

    cli_cmd()
        .args(["info", "--dir", dir, "--base", "16", "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"next_offset\":19"))
        .stdout(predicate::str::contains("\"index_bytes\":36"))
        .stdout(predicate::str::contains("\"maxed\":false"));

    cli_cmd()
        .args(["dump", "--dir", dir, "--base", "16"])
        .assert()
        .success()
        .stdout(predicate::str::contains("18\tgamma"));

    cli_cmd()
        .args(["verify", "--dir", dir, "--base", "16"])
        .assert()
        .success()
        .stdout(predicate::str::contains("entries=3 indexed=3 orphaned=0 bad_positions=0"));
}

#[test]
fn read_past_end_fails() {
    let tmp = tempdir().expect("tempdir");
    let dir = tmp.path().to_str().unwrap();

    cli_cmd()
        .args(["append", "--dir", dir, "--value", "only"])
        .assert()
        .success();

    cli_cmd()
        .args(["read", "--dir", dir, "--offset", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn append_stops_when_maxed() {
    let tmp = tempdir().expect("tempdir");
    let dir = tmp.path().to_str().unwrap();

    cli_cmd()
        .args([
            "append",
            "--dir",
            dir,
            "--max-index-bytes",
            "24",
            "--value",
            "a",
            "b",
            "c",
        ])
        .assert()
        .failure()
        .stdout(predicate::str::diff("0\n1\n"))
        .stderr(predicate::str::contains("maxed"));

    cli_cmd()
        .args(["info", "--dir", dir, "--max-index-bytes", "24"])
        .assert()
        .success()
        .stdout(predicate::str::contains("next_offset:    2"))
        .stdout(predicate::str::contains("maxed:          true"));
}

#[test]
fn config_file_and_remove() {
    let tmp = tempdir().expect("tempdir");
    let dir = tmp.path().to_str().unwrap();
    let cfg = tmp.path().join("seglog.json");
    std::fs::write(
        &cfg,
        r#"{"segment":{"max_store_bytes":4096,"max_index_bytes":120}}"#,
    )
    .unwrap();
    let cfg = cfg.to_str().unwrap();

    cli_cmd()
        .args(["append", "--dir", dir, "--config", cfg, "--value", "x", "y"])
        .assert()
        .success();

    cli_cmd()
        .args(["info", "--dir", dir, "--config", cfg, "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"index_capacity\":120"));

    cli_cmd()
        .args(["remove", "--dir", dir, "--config", cfg])
        .assert()
        .success()
        .stdout(predicate::str::contains("removed: 0"));
    assert!(!tmp.path().join("0.store").exists());
    assert!(!tmp.path().join("0.index").exists());

    cli_cmd()
        .args(["info", "--dir", dir, "--config", cfg, "--json"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"next_offset\":0"));
}
