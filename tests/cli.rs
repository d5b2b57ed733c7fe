use assert_cmd::Command;
use predicates::prelude::*;
use std::path::Path;
use tempfile::TempDir;

const SRT: &str = "1\n00:00:01,000 --> 00:00:02,000\nHello\n\n2\n00:00:02,500 --> 00:00:04,000\nthere\n";
const VTT: &str = "WEBVTT\n\n00:00:05.000 --> 00:00:06.000\n<c>second</c> video\n";

/// Binary isolated from the user's configuration
fn subharvest(home: &Path) -> Command {
    let mut cmd = Command::cargo_bin("subharvest").unwrap();
    cmd.current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env_remove("RUST_LOG");
    cmd
}

fn subtitle_dir() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let subs = dir.path().join("subs");
    std::fs::create_dir_all(&subs).unwrap();
    std::fs::write(subs.join("aaaaaaaaaaa.en.srt"), SRT).unwrap();
    std::fs::write(subs.join("bbbbbbbbbbb.de.vtt"), VTT).unwrap();
    std::fs::write(subs.join("ccccccccccc.en.srt"), "1\n00:00:xx,000 --> 00:00:02,000\nbad\n").unwrap();
    std::fs::write(subs.join("notes.txt"), "ignored").unwrap();
    dir
}

#[test]
fn test_help_lists_subcommands() {
    let home = tempfile::tempdir().unwrap();
    subharvest(home.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("download"))
        .stdout(predicate::str::contains("merge"));
}

#[test]
fn test_formats() {
    let home = tempfile::tempdir().unwrap();
    subharvest(home.path())
        .arg("formats")
        .assert()
        .success()
        .stdout(predicate::str::contains("SubRip (srt)"))
        .stdout(predicate::str::contains("Lyric Text (lrc)"));
}

#[test]
fn test_merge_to_stdout() {
    let home = subtitle_dir();
    subharvest(home.path())
        .args(["merge", "subs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("VIDEO 1: aaaaaaaaaaa"))
        .stdout(predicate::str::contains("LANGUAGE: en"))
        .stdout(predicate::str::contains("URL: https://www.youtube.com/watch?v=aaaaaaaaaaa"))
        .stdout(predicate::str::contains("Hello\nthere"))
        .stdout(predicate::str::contains("VIDEO 2: bbbbbbbbbbb"))
        .stdout(predicate::str::contains("second video"))
        .stdout(predicate::str::contains("VIDEO 3: ccccccccccc"))
        .stdout(predicate::str::contains("[subtitle unavailable (parse error)"))
        .stdout(predicate::str::contains("notes").not());
}

#[test]
fn test_merge_to_file_with_timestamps() {
    let home = subtitle_dir();
    subharvest(home.path())
        .args(["merge", "subs", "--timestamps", "-o", "merged/all.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Merged 3 subtitle files"));

    let merged = std::fs::read_to_string(home.path().join("merged").join("all.txt")).unwrap();
    assert!(merged.contains("[00:00:01.000] Hello"));
    assert!(merged.contains("[00:00:05.000] second video"));
}

#[test]
fn test_merge_json() {
    let home = subtitle_dir();
    let output = subharvest(home.path())
        .args(["merge", "subs", "--output-format", "json"])
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let value: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(value["sections"].as_array().unwrap().len(), 3);
    assert_eq!(value["sections"][2]["body"]["status"], "unavailable");
}

#[test]
fn test_merge_empty_directory_fails() {
    let home = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(home.path().join("empty")).unwrap();
    subharvest(home.path())
        .args(["merge", "empty"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No subtitle files found"));
}

#[test]
fn test_download_rejects_foreign_url() {
    let home = tempfile::tempdir().unwrap();
    subharvest(home.path())
        .args(["download", "https://example.com/watch?v=1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("not a YouTube address"));
}
