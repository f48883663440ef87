//! CLI test cases.
//!
//! These run the real binary against the OCR text fixtures in
//! `tests/fixtures/slips`.

use assert_cmd::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;

/// Create a new `Command` with our binary.
fn cmd() -> Command {
    Command::cargo_bin("bukti-setor").unwrap()
}

#[test]
fn test_help() {
    cmd().arg("--help").assert().success();
}

#[test]
fn test_version() {
    cmd().arg("--version").assert().success();
}

#[test]
fn test_schema() {
    for schema_type in ["SlipInput", "SlipOutput", "FlatSlipPage", "ExtractConfig"] {
        println!("Testing schema: {}", schema_type);
        cmd()
            .arg("schema")
            .arg(schema_type)
            .assert()
            .success()
            .stdout(predicate::str::contains("\"$schema\""));
    }
}

#[test]
fn test_extract_jsonl_input() {
    cmd()
        .arg("extract")
        .arg("tests/fixtures/slips/input.jsonl")
        .args(["--allowed-failure-rate", "0.5"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""kode_setor":"411211""#))
        .stdout(predicate::str::contains(r#""jumlah":1500000"#))
        .stdout(predicate::str::contains(r#""tanggal":"2024-08-17""#))
        .stdout(predicate::str::contains(r#""kode_setor":"100""#))
        .stdout(predicate::str::contains(r#""tanggal":"2023-01-05""#))
        .stdout(predicate::str::contains(r#""status":"incomplete""#))
        .stdout(predicate::str::contains(r#""warning":"no text detected""#))
        .stdout(predicate::str::contains(r#""status":"failed""#));
}

#[test]
fn test_extract_fails_above_allowed_failure_rate() {
    cmd()
        .arg("extract")
        .arg("tests/fixtures/slips/input.jsonl")
        .assert()
        .failure()
        .stderr(predicate::str::contains("were failures"));
}

#[test]
fn test_extract_csv_input_and_output() {
    cmd()
        .arg("extract")
        .arg("tests/fixtures/slips/input.csv")
        .args(["--format", "csv"])
        .assert()
        .success()
        .stdout(predicate::str::starts_with(
            "id,status,page,total_pages,kode_setor,jumlah,tanggal,preview_filename,warning,errors\n",
        ))
        .stdout(predicate::str::contains("a,ok,1,1,411211,2000000,2024-08-17,a.png,,\n"))
        .stdout(predicate::str::contains("b,ok,1,1,411121,125500,2024-03-05,,,\n"));
}

#[test]
fn test_extract_to_file_with_take_first() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out.jsonl");
    cmd()
        .arg("extract")
        .arg("tests/fixtures/slips/input.jsonl")
        .args(["--take-first", "2", "-j", "2"])
        .arg("-o")
        .arg(&out)
        .assert()
        .success();
    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written.lines().count(), 2);
    assert!(written.contains(r#""id":1"#));
    assert!(written.contains(r#""id":2"#));
}

#[test]
fn test_extract_with_config() {
    cmd()
        .arg("extract")
        .arg("tests/fixtures/slips/custom.jsonl")
        .args(["--config", "tests/fixtures/slips/config.toml"])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""jumlah":300000"#))
        .stdout(predicate::str::contains(r#""tanggal":null"#));
}

#[test]
fn test_extract_rejects_bad_config() {
    cmd()
        .arg("extract")
        .arg("tests/fixtures/slips/custom.jsonl")
        .args(["--config", "tests/fixtures/slips/input.csv"])
        .assert()
        .failure();
}

#[test]
fn test_extract_from_stdin() {
    cmd()
        .arg("extract")
        .write_stdin(concat!(
            r#"{"id": "p1", "text": "Jumlah Setoran\nTanggal 31/09/2024\nRp 500.000"}"#,
            "\n",
            r#"{"id": "p2", "text": "Kode Setor 411211\nTerbilang: sejuta lima ratus ribu rupiah"}"#,
            "\n",
        ))
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""jumlah":500000,"tanggal":null"#))
        .stdout(predicate::str::contains(r#""jumlah":1500000"#));
}
