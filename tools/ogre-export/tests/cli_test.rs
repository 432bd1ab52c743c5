//! Integration tests for the ogre-export binary
//!
//! Writes a scene snapshot and config into a temp dir, runs the binary and
//! inspects the written documents.

mod common;

use std::path::Path;
use std::process::Command;
use tempfile::tempdir;

use common::CHARACTER_SCENE;

const CONFIG: &str = r#"
length_unit = "m"
material_prefix = "hero"
export_skeletal_animations = true

[[skeletal_clips]]
name = "walk"
start = 0.0
stop = 1.0
rate = 0.25
"#;

fn ogre_export() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ogre-export"))
}

fn read_json(path: &Path) -> serde_json::Value {
    let text = std::fs::read_to_string(path).expect("Failed to read output");
    serde_json::from_str(&text).expect("Output is not valid JSON")
}

#[test]
fn test_export_writes_documents() {
    let dir = tempdir().expect("Failed to create temp dir");
    let scene_path = dir.path().join("character.json");
    let config_path = dir.path().join("export.toml");
    let out = dir.path().join("out");
    std::fs::write(&scene_path, CHARACTER_SCENE).unwrap();
    std::fs::write(&config_path, CONFIG).unwrap();

    let status = ogre_export()
        .args([
            "export",
            scene_path.to_str().unwrap(),
            "-c",
            config_path.to_str().unwrap(),
            "-o",
            out.to_str().unwrap(),
        ])
        .status()
        .expect("Failed to run ogre-export");
    assert!(status.success(), "ogre-export export command failed");

    let mesh = read_json(&out.join("character.mesh.json"));
    assert_eq!(mesh["name"], "character");
    assert_eq!(mesh["skeleton"], "character");
    assert_eq!(mesh["submeshes"].as_array().unwrap().len(), 2);
    assert_eq!(mesh["submeshes"][0]["material"], "hero/skin");
    assert!(out.join("character.vbuf").exists());
    // the body's vertex range carries its blend-shape source
    assert_eq!(mesh["geometry_map"][0]["pose_source"], 0);
    assert!(mesh["geometry_map"][1]["pose_source"].is_null());

    let skeleton = read_json(&out.join("character.skeleton.json"));
    assert_eq!(skeleton["bones"].as_array().unwrap().len(), 3);
    // metres: the hips sit 1 unit up
    let y = skeleton["bones"][0]["bind"]["translation"][1].as_f64().unwrap();
    assert!((y - 1.0).abs() < 1e-6);
    let walk = &skeleton["animations"][0];
    assert_eq!(walk["name"], "walk");
    assert_eq!(walk["tracks"][0]["kind"], "skeletal");
    assert_eq!(walk["tracks"][0]["keyframes"].as_array().unwrap().len(), 5);

    let materials = read_json(&out.join("character.material.json"));
    assert_eq!(materials.as_array().unwrap().len(), 2);
}

#[test]
fn test_export_selected_node_with_name() {
    let dir = tempdir().expect("Failed to create temp dir");
    let scene_path = dir.path().join("scene.json");
    std::fs::write(&scene_path, CHARACTER_SCENE).unwrap();

    let status = ogre_export()
        .args([
            "export",
            scene_path.to_str().unwrap(),
            "-o",
            dir.path().to_str().unwrap(),
            "--name",
            "helmet",
            "--node",
            "Helmet",
        ])
        .status()
        .expect("Failed to run ogre-export");
    assert!(status.success(), "ogre-export export command failed");

    assert!(dir.path().join("helmet.mesh.json").exists());
    // an unskinned selection has no skeleton
    assert!(!dir.path().join("helmet.skeleton.json").exists());
}

#[test]
fn test_export_unknown_node_fails() {
    let dir = tempdir().expect("Failed to create temp dir");
    let scene_path = dir.path().join("scene.json");
    std::fs::write(&scene_path, CHARACTER_SCENE).unwrap();

    let status = ogre_export()
        .args([
            "export",
            scene_path.to_str().unwrap(),
            "-o",
            dir.path().to_str().unwrap(),
            "--node",
            "Tail",
        ])
        .status()
        .expect("Failed to run ogre-export");
    assert!(!status.success());
}

#[test]
fn test_check_config() {
    let dir = tempdir().expect("Failed to create temp dir");
    let good = dir.path().join("good.toml");
    let bad = dir.path().join("bad.toml");
    std::fs::write(&good, CONFIG).unwrap();
    std::fs::write(&bad, "epsilon = -1.0\n").unwrap();

    let status = ogre_export()
        .args(["check", good.to_str().unwrap()])
        .status()
        .expect("Failed to run ogre-export");
    assert!(status.success(), "valid config rejected");

    let status = ogre_export()
        .args(["check", bad.to_str().unwrap()])
        .status()
        .expect("Failed to run ogre-export");
    assert!(!status.success(), "invalid config accepted");
}
