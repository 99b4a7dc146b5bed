// tests/cli_tests.rs

use assert_cmd::Command;
use predicates::prelude::*;
use std::io::Write;
use tempfile::NamedTempFile;

#[test]
fn test_cli_parses_stdin() {
    let mut cmd = Command::cargo_bin("logstage").unwrap();
    cmd.write_stdin("host:127.0.0.1\tstatus:200\nno fields here\n")
        .assert()
        .success()
        .stdout("{\"host\":\"127.0.0.1\",\"status\":\"200\"}\n");
}

#[test]
fn test_cli_keys_option() {
    let mut cmd = Command::cargo_bin("logstage").unwrap();
    cmd.arg("-k")
        .arg("status")
        .write_stdin("host:a\tstatus:500\n")
        .assert()
        .success()
        .stdout("{\"status\":\"500\"}\n");
}

#[test]
fn test_cli_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        "pipeline_stages:\n  - ltsv: {{}}\n  - ltsv:\n      source: inner"
    )
    .unwrap();

    let mut cmd = Command::cargo_bin("logstage").unwrap();
    cmd.arg("--config")
        .arg(file.path())
        .write_stdin("inner:user:bob\n")
        .assert()
        .success()
        .stdout("{\"inner\":\"user:bob\",\"user\":\"bob\"}\n");
}

#[test]
fn test_cli_empty_source_rejected() {
    let mut cmd = Command::cargo_bin("logstage").unwrap();
    cmd.arg("--source")
        .arg("")
        .write_stdin("a:1\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("empty source"));
}

#[test]
fn test_cli_config_and_source_conflict() {
    let mut cmd = Command::cargo_bin("logstage").unwrap();
    cmd.arg("--config")
        .arg("pipeline.yaml")
        .arg("--source")
        .arg("msg")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Cannot use both"));
}

#[test]
fn test_cli_missing_config_file() {
    let mut cmd = Command::cargo_bin("logstage").unwrap();
    cmd.arg("--config")
        .arg("/nonexistent/pipeline.yaml")
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load pipeline definition"));
}

#[test]
fn test_cli_input_and_output_files() {
    let mut input = NamedTempFile::new().unwrap();
    writeln!(input, "a:1\tb:2").unwrap();
    let output = NamedTempFile::new().unwrap();

    let mut cmd = Command::cargo_bin("logstage").unwrap();
    cmd.arg("-i")
        .arg(input.path())
        .arg("-o")
        .arg(output.path())
        .assert()
        .success()
        .stdout("");

    let written = std::fs::read_to_string(output.path()).unwrap();
    assert_eq!(written, "{\"a\":\"1\",\"b\":\"2\"}\n");
}

#[test]
fn test_cli_source_reparses_field() {
    let mut cmd = Command::cargo_bin("logstage").unwrap();
    cmd.arg("--source")
        .arg("msg")
        .write_stdin("msg:a:1\tb:2\n")
        .assert()
        .success()
        .stdout("{\"msg\":\"a:1\",\"b\":\"2\",\"a\":\"1\"}\n");
}

#[test]
fn test_cli_skips_invalid_utf8_line() {
    let mut cmd = Command::cargo_bin("logstage").unwrap();
    cmd.write_stdin(b"a:1\nbad:\xff\nc:3\n".to_vec())
        .assert()
        .success()
        .stdout("{\"a\":\"1\"}\n{\"c\":\"3\"}\n");
}
