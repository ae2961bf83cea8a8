//! Integration tests for the `authscan` binary.

use assert_fs::prelude::*;
use assert_fs::TempDir;
use image::{ImageBuffer, ImageFormat, Rgb, RgbImage};
use predicates::prelude::*;
use std::process::{Command, Output};

fn authscan(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_authscan"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .unwrap()
}

fn write_png(dir: &TempDir, name: &str) -> std::path::PathBuf {
    let image: RgbImage = ImageBuffer::from_pixel(32, 32, Rgb([40, 90, 200]));
    let child = dir.child(name);
    image.save_with_format(child.path(), ImageFormat::Png).unwrap();
    child.path().to_path_buf()
}

#[test]
fn json_output_lists_each_file() {
    let dir = TempDir::new().unwrap();
    let png = write_png(&dir, "flat.png");
    dir.child("notes.txt").write_str("hello").unwrap();
    let txt = dir.child("notes.txt");

    let output = authscan(&[
        "analyze",
        png.to_str().unwrap(),
        txt.path().to_str().unwrap(),
        "--output",
        "json",
    ]);

    // One file failed, so the run fails
    assert!(!output.status.success());

    let stdout = String::from_utf8(output.stdout).unwrap();
    let json: serde_json::Value = serde_json::from_str(&stdout).unwrap();
    let reports = json.as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["result"]["metadata"]["format"], "PNG");
    assert!(reports[0]["error"].is_null());
    assert_eq!(reports[1]["error"]["kind"], "format_unsupported");
}

#[test]
fn content_type_flag_overrides_extension() {
    let dir = TempDir::new().unwrap();
    let png = write_png(&dir, "flat.png");
    let renamed = dir.child("upload.bin");
    std::fs::copy(&png, renamed.path()).unwrap();

    let output = authscan(&[
        "analyze",
        renamed.path().to_str().unwrap(),
        "--content-type",
        "image/png",
        "--output",
        "minimal",
    ]);

    assert!(output.status.success());
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(predicate::str::contains("upload.bin").eval(&stdout));
}

#[test]
fn pretty_output_shows_label() {
    let dir = TempDir::new().unwrap();
    let png = write_png(&dir, "flat.png");

    let output = authscan(&["analyze", png.to_str().unwrap(), "--verbose"]);

    assert!(output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    let labelled = predicate::str::contains("AI Generated")
        .or(predicate::str::contains("Suspicious"))
        .or(predicate::str::contains("Verified"));
    assert!(labelled.eval(&stderr));
    assert!(predicate::str::contains("/100").eval(&stderr));
}

#[test]
fn invalid_config_is_reported() {
    let dir = TempDir::new().unwrap();
    let png = write_png(&dir, "flat.png");
    let config = dir.child("config.json");
    config
        .write_str(r#"{ "thresholds": { "verified": 40.0, "suspicious": 60.0 } }"#)
        .unwrap();

    let output = authscan(&[
        "analyze",
        png.to_str().unwrap(),
        "--config",
        config.path().to_str().unwrap(),
    ]);

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(predicate::str::contains("threshold").eval(&stderr));
}
