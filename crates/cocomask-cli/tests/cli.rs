// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

use assert_cmd::Command;
use predicates::prelude::*;
use std::path::PathBuf;
use tempfile::TempDir;

fn stuff_sample() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("cocomask")
        .join("testdata")
        .join("stuff_sample.json")
}

/// A `cocomask` command isolated from any user settings.
fn cocomask(dir: &TempDir) -> Result<Command, Box<dyn std::error::Error>> {
    let config = dir.path().join("cocomask.toml");
    if !config.exists() {
        std::fs::write(&config, "")?;
    }

    let mut cmd = Command::cargo_bin("cocomask")?;
    cmd.arg("--config").arg(config);
    Ok(cmd)
}

#[test]
fn test_version() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("cocomask")?;
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
    Ok(())
}

#[test]
fn test_info() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    cocomask(&dir)?
        .arg("info")
        .arg(stuff_sample())
        .assert()
        .success()
        .stdout(predicate::str::contains("Images: 3"))
        .stdout(predicate::str::contains(
            "Annotations: 4 (2 compressed-rle, 1 polygon, 1 rle)",
        ))
        .stdout(predicate::str::contains("Categories: 3"));
    Ok(())
}

#[test]
fn test_ann_ids_filters() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;

    cocomask(&dir)?
        .args(["ann-ids", "--images", "2"])
        .arg(stuff_sample())
        .assert()
        .success()
        .stdout("11\n13\n");

    cocomask(&dir)?
        .args(["ann-ids", "--crowd", "false", "--area", "10", "100"])
        .arg(stuff_sample())
        .assert()
        .success()
        .stdout("10\n12\n");
    Ok(())
}

#[test]
fn test_cat_and_img_ids() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;

    cocomask(&dir)?
        .args(["cat-ids", "--supercategories", "textile"])
        .arg(stuff_sample())
        .assert()
        .success()
        .stdout("92\n93\n");

    cocomask(&dir)?
        .args(["img-ids", "--categories", "92,183"])
        .arg(stuff_sample())
        .assert()
        .success()
        .stdout("1\n2\n3\n");
    Ok(())
}

#[test]
fn test_decode_ascii() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    cocomask(&dir)?
        .args(["decode", "--annotation", "10", "--ascii"])
        .arg(stuff_sample())
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Annotation 10: 6x5 mask, area 14, bbox [1, 0, 5, 5]",
        ))
        .stdout(predicate::str::contains(".###.#\n.#.#.#\n.#....\n.#.#.#\n.#.#.#\n"));
    Ok(())
}

#[test]
fn test_decode_unknown_annotation() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    cocomask(&dir)?
        .args(["decode", "--annotation", "99"])
        .arg(stuff_sample())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown annotation id 99"));
    Ok(())
}

#[test]
fn test_encode() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let mask = dir.path().join("mask.txt");
    std::fs::write(&mask, "011101\n010101\n010000\n010101\n010101\n")?;

    Command::cargo_bin("cocomask")?
        .arg("encode")
        .arg(&mask)
        .assert()
        .success()
        .stdout("{\"counts\":\"564LM040L0\",\"size\":[5,6]}\n");

    Command::cargo_bin("cocomask")?
        .args(["encode", "--uncompressed"])
        .arg(&mask)
        .assert()
        .success()
        .stdout("{\"counts\":[5,6,4,2,1,2,5,2,1,2],\"size\":[5,6]}\n");
    Ok(())
}

#[test]
fn test_compress_then_verify() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let output = dir.path().join("compact.json");

    cocomask(&dir)?
        .arg("compress")
        .arg(stuff_sample())
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("Compressed 1 of 4 annotations"));

    let json: serde_json::Value = serde_json::from_slice(&std::fs::read(&output)?)?;
    let annotations = json["annotations"].as_array().ok_or("no annotations")?;
    assert!(annotations[1]["segmentation"]["counts"].is_string());
    assert_eq!(
        annotations[1]["segmentation"]["counts"],
        annotations[3]["segmentation"]["counts"]
    );

    cocomask(&dir)?
        .arg("verify")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Verified 3 RLE annotations (1 skipped)",
        ));
    Ok(())
}

#[test]
fn test_compress_to_zip() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let output = dir.path().join("compact.zip");

    cocomask(&dir)?
        .arg("compress")
        .arg(stuff_sample())
        .arg(&output)
        .assert()
        .success();

    cocomask(&dir)?
        .arg("info")
        .arg(&output)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 compressed-rle"));
    Ok(())
}

#[test]
fn test_verify_reports_truncated_counts() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let broken = dir.path().join("broken.json");

    let sample = std::fs::read_to_string(stuff_sample())?;
    std::fs::write(&broken, sample.replace("\"564LM040L0\"", "\"564LM040L\""))?;

    cocomask(&dir)?
        .arg("verify")
        .arg(&broken)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Annotation 10"))
        .stderr(predicate::str::contains("1 of 3 RLE annotations failed"));
    Ok(())
}

#[test]
fn test_settings_category_filter() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    std::fs::write(
        dir.path().join("cocomask.toml"),
        "[read]\ncategory_filter = [\"banner\"]\n",
    )?;

    cocomask(&dir)?
        .arg("ann-ids")
        .arg(stuff_sample())
        .assert()
        .success()
        .stdout("10\n");
    Ok(())
}

#[test]
fn test_missing_settings_file() -> Result<(), Box<dyn std::error::Error>> {
    Command::cargo_bin("cocomask")?
        .args(["--config", "/nonexistent/cocomask.toml", "info"])
        .arg(stuff_sample())
        .assert()
        .failure();
    Ok(())
}
