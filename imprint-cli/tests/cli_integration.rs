//! CLI integration tests for imprint-cli.
//!
//! These tests run the actual binary and check outputs, exit codes, and
//! file artifacts for each subcommand.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use image::{DynamicImage, ImageFormat, Rgb, RgbImage};
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

/// Get a Command for the imprint binary with no registry taken from the environment.
fn imprint() -> Command {
    let mut cmd = Command::cargo_bin("imprint").unwrap();
    cmd.env_remove("IMPRINT_REGISTRY")
        .env_remove("IMPRINT_REGISTRY_URL")
        .env_remove("RUST_LOG");
    cmd
}

fn write_artwork(path: &Path) {
    let image = DynamicImage::ImageRgb8(RgbImage::from_fn(256, 256, |x, y| {
        let r = (x * 255 / 256) as u8;
        let g = (y * 255 / 256) as u8;
        let b = ((x + y) * 200 / 512) as u8;
        let pattern = if (x / 20 + y / 20) % 2 == 0 { 30 } else { 0 };
        Rgb([r.saturating_add(pattern), g, b])
    }));
    image.save_with_format(path, ImageFormat::Png).unwrap();
}

fn json_stdout(cmd: &mut Command) -> Value {
    let output = cmd.output().unwrap();
    assert!(output.status.success(), "command failed: {output:?}");
    serde_json::from_slice(&output.stdout).unwrap()
}

// ============================================================================
// Help and Version Tests
// ============================================================================

#[test]
fn test_help_displays_usage() {
    imprint()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Content fingerprints and invisible watermarks",
        ))
        .stdout(predicate::str::contains("fingerprint"))
        .stdout(predicate::str::contains("embed"))
        .stdout(predicate::str::contains("register"));
}

#[test]
fn test_version_displays_version() {
    imprint()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("imprint"));
}

#[test]
fn test_help_shows_exit_codes() {
    imprint()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Exit codes:"))
        .stdout(predicate::str::contains("65"))
        .stdout(predicate::str::contains("69"));
}

#[test]
fn test_register_help_shows_options() {
    imprint()
        .args(["register", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--owner"))
        .stdout(predicate::str::contains("--derivatives-allowed"))
        .stdout(predicate::str::contains("--watermark"));
}

// ============================================================================
// Usage Errors
// ============================================================================

#[test]
fn test_unknown_subcommand_is_usage_error() {
    imprint().arg("notacommand").assert().code(64);
}

#[test]
fn test_embed_requires_owner() {
    let temp = TempDir::new().unwrap();
    let image = temp.path().join("art.png");
    write_artwork(&image);

    imprint()
        .args(["embed", image.to_str().unwrap()])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("--owner"));
}

#[test]
fn test_clear_without_yes_is_usage_error() {
    let temp = TempDir::new().unwrap();
    let registry = temp.path().join("registry.json");

    imprint()
        .args(["--registry", registry.to_str().unwrap(), "registry", "clear"])
        .assert()
        .code(64)
        .stderr(predicate::str::contains("--yes"));
}

#[test]
fn test_malformed_digest_is_usage_error() {
    let temp = TempDir::new().unwrap();
    let registry = temp.path().join("registry.json");

    imprint()
        .args([
            "--registry",
            registry.to_str().unwrap(),
            "registry",
            "delete",
            "not-a-digest",
        ])
        .assert()
        .code(64);
}

// ============================================================================
// Input and Data Errors
// ============================================================================

#[test]
fn test_missing_file_exits_66() {
    imprint()
        .args(["digest", "/nonexistent/imprint/photo.png"])
        .assert()
        .code(66)
        .stderr(predicate::str::contains("Failed to read"));
}

#[test]
fn test_undecodable_image_exits_65() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("notes.png");
    fs::write(&file, b"definitely not an image").unwrap();

    imprint()
        .args(["fingerprint", file.to_str().unwrap()])
        .assert()
        .code(65);
}

#[test]
fn test_corrupt_registry_exits_69() {
    let temp = TempDir::new().unwrap();
    let registry = temp.path().join("registry.json");
    fs::write(&registry, b"{ this is not json").unwrap();

    imprint()
        .args(["--registry", registry.to_str().unwrap(), "registry", "list"])
        .assert()
        .code(69);

    assert_eq!(fs::read(&registry).unwrap(), b"{ this is not json");
}

// ============================================================================
// Inspection Commands
// ============================================================================

#[test]
fn test_digest_known_vector() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("abc.txt");
    fs::write(&file, b"abc").unwrap();

    imprint()
        .args(["--quiet", "digest", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad\n");
}

#[test]
fn test_digest_sha3() {
    let temp = TempDir::new().unwrap();
    let file = temp.path().join("abc.txt");
    fs::write(&file, b"abc").unwrap();

    imprint()
        .args(["--quiet", "digest", "-a", "sha3-256", file.to_str().unwrap()])
        .assert()
        .success()
        .stdout("3a985da74fe225b2045c172d6bd390bd855f086e3e9d525b46bfe24511431532\n");
}

#[test]
fn test_fingerprint_is_16_hex_chars() {
    let temp = TempDir::new().unwrap();
    let image = temp.path().join("art.png");
    write_artwork(&image);

    let report = json_stdout(imprint().args(["--json", "fingerprint", image.to_str().unwrap()]));
    let fingerprint = report["perceptualFingerprint"].as_str().unwrap();
    assert_eq!(fingerprint.len(), 16);
    assert!(fingerprint.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn test_compare_fingerprint_literals() {
    let report = json_stdout(imprint().args([
        "--json",
        "compare",
        "ffffffffffffffff",
        "ffffffffffff0000",
    ]));
    assert_eq!(report["distance"], 16);
    assert_eq!(report["similarity"], 75.0);
    assert_eq!(report["isMatch"], true);

    let report = json_stdout(imprint().args([
        "--json",
        "compare",
        "ffffffffffffffff",
        "0000000000000000",
    ]));
    assert_eq!(report["distance"], 64);
    assert_eq!(report["isMatch"], false);
}

#[test]
fn test_compare_image_with_itself() {
    let temp = TempDir::new().unwrap();
    let image = temp.path().join("art.png");
    write_artwork(&image);
    let path = image.to_str().unwrap();

    imprint()
        .args(["compare", path, path])
        .assert()
        .success()
        .stdout(predicate::str::contains("100.0%"))
        .stdout(predicate::str::contains("Near-duplicate"));
}

// ============================================================================
// Watermark Commands
// ============================================================================

#[test]
fn test_embed_writes_default_output() {
    let temp = TempDir::new().unwrap();
    let image = temp.path().join("art.png");
    write_artwork(&image);

    imprint()
        .args(["embed", image.to_str().unwrap(), "--owner", "0xA11CE"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Watermark embedded"));

    assert!(temp.path().join("art.imprint.png").exists());
}

#[test]
fn test_extract_unmarked_image() {
    let temp = TempDir::new().unwrap();
    let image = temp.path().join("art.png");
    write_artwork(&image);

    let verdict = json_stdout(imprint().args(["--json", "extract", image.to_str().unwrap()]));
    assert_eq!(verdict["found"], false);
    assert_eq!(verdict["blockRegistration"], false);
}

#[test]
fn test_embed_too_small_image_exits_65() {
    let temp = TempDir::new().unwrap();
    let image = temp.path().join("tiny.png");
    DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([90, 90, 90])))
        .save_with_format(&image, ImageFormat::Png)
        .unwrap();

    imprint()
        .args(["embed", image.to_str().unwrap(), "--owner", "0xA11CE"])
        .assert()
        .code(65)
        .stderr(predicate::str::contains("too small"));
}
