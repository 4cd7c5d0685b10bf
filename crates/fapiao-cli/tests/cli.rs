use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::tempdir;

fn fapiao() -> Command {
    let mut cmd = Command::cargo_bin("fapiao").unwrap();
    cmd.env_remove("SILICONFLOW_API_KEY").env_remove("SILICONFLOW_API_URL");
    cmd
}

#[test]
fn test_help_lists_commands() {
    fapiao()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("process"))
        .stdout(predicate::str::contains("batch"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_process_missing_file_fails() {
    let dir = tempdir().unwrap();
    fapiao()
        .arg("process")
        .arg(dir.path().join("missing.pdf"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));
}

#[test]
fn test_process_rejects_unsupported_extension() {
    let dir = tempdir().unwrap();
    let notes = dir.path().join("notes.txt");
    std::fs::write(&notes, "发票号码：12345678").unwrap();

    fapiao()
        .arg("process")
        .arg(&notes)
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported file type"));
}

#[test]
fn test_batch_without_supported_files_fails() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();

    fapiao()
        .arg("batch")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("No supported files found"));
}

#[test]
fn test_batch_reports_failed_and_skipped_files() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("notes.txt"), "hello").unwrap();
    std::fs::write(dir.path().join("broken.pdf"), b"not a pdf").unwrap();
    let out = dir.path().join("out");

    fapiao()
        .arg("batch")
        .arg(dir.path())
        .arg("--output-dir")
        .arg(&out)
        .arg("--summary")
        .assert()
        .success()
        .stdout(predicate::str::contains("1 failed, 1 skipped"))
        .stdout(predicate::str::contains("broken.pdf"));

    let summary = std::fs::read_to_string(out.join("summary.csv")).unwrap();
    assert!(summary.contains("TOTAL,0.00"));
    assert_eq!(std::fs::read_to_string(out.join("invoices.json")).unwrap(), "[]");
}

#[test]
fn test_config_init_get_set() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    let config_arg = config.to_str().unwrap();

    fapiao()
        .args(["--config", config_arg, "config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("not created"));

    fapiao()
        .args(["--config", config_arg, "config", "init"])
        .assert()
        .success();
    assert!(config.exists());

    fapiao()
        .args(["--config", config_arg, "config", "set", "batch.concurrency", "2"])
        .assert()
        .success();

    fapiao()
        .args(["--config", config_arg, "config", "get", "batch.concurrency"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2"));

    fapiao()
        .args(["--config", config_arg, "config", "set", "batch.unknown", "1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration key not found"));
}

#[test]
fn test_config_show_redacts_api_key() {
    let dir = tempdir().unwrap();
    let config = dir.path().join("config.json");
    let config_arg = config.to_str().unwrap();

    fapiao()
        .args(["--config", config_arg, "config", "set", "remote.api_key", "sk-secret"])
        .assert()
        .success();

    fapiao()
        .args(["--config", config_arg, "config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("***"))
        .stdout(predicate::str::contains("sk-secret").not());
}
