use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_lists_subcommands() {
    Command::cargo_bin("chanscribe")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("extract"))
        .stdout(predicate::str::contains("videos"))
        .stdout(predicate::str::contains("analyze"))
        .stdout(predicate::str::contains("serve"));
}

#[test]
fn test_version_flag() {
    Command::cargo_bin("chanscribe")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("chanscribe"));
}

#[test]
fn test_extract_requires_channel() {
    Command::cargo_bin("chanscribe")
        .unwrap()
        .arg("extract")
        .assert()
        .failure()
        .stderr(predicate::str::contains("CHANNEL"));
}

#[test]
fn test_extract_rejects_unknown_date_filter() {
    Command::cargo_bin("chanscribe")
        .unwrap()
        .args(["extract", "@SomeChannel", "--date-filter", "yesterday"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("date-filter"));
}

#[test]
fn test_analyze_requires_prompt() {
    Command::cargo_bin("chanscribe")
        .unwrap()
        .args(["analyze", "transcripts.json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--prompt"));
}
