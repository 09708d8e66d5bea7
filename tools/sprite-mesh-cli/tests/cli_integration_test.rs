//! Integration tests for the batch pipeline
//!
//! Each test writes a document to a scratch directory, runs one or more
//! operations through the library entry points and reads the result back.

use std::fs;

use tempfile::tempdir;

use sprite_mesh::formats::MeshDocument;
use sprite_mesh::{BoneDefinition, Rect};
use sprite_mesh_cli::{
    generate_weights, load_settings, mesh_info, read_mesh, smooth, subdivide, triangulate,
    write_mesh, write_packed,
};

const LIMB: &str = r#"{
    "frame": { "x": 0.0, "y": -10.0, "width": 40.0, "height": 20.0 },
    "pivot": [0.0, 0.0],
    "vertices": [
        { "position": [0.0, -5.0] },
        { "position": [40.0, -5.0] },
        { "position": [40.0, 5.0] },
        { "position": [0.0, 5.0] }
    ],
    "edges": [[0, 1], [1, 2], [2, 3], [3, 0]],
    "bones": [
        { "name": "upper", "local_position": [0.0, 0.0], "length": 20.0 },
        { "name": "lower", "parent": 0, "local_position": [20.0, 0.0], "length": 20.0, "depth": 1.0 }
    ]
}"#;

#[test]
fn test_default_settings_without_config() {
    let settings = load_settings(None).unwrap();
    assert_eq!(settings.weights.min_samples, 10);
}

#[test]
fn test_config_file_overrides_fields() {
    let dir = tempdir().expect("Failed to create temp dir");
    let path = dir.path().join("settings.toml");
    fs::write(
        &path,
        "[tessellation]\nmin_angle = 20.0\n\n[weights]\ndistance_per_sample = 2.5\n",
    )
    .unwrap();

    let settings = load_settings(Some(&path)).unwrap();
    assert_eq!(settings.tessellation.min_angle, 20.0);
    assert_eq!(settings.weights.distance_per_sample, 2.5);
    assert_eq!(settings.edit.snap_distance, 10.0);
}

#[test]
fn test_bad_inputs_report_the_file() {
    let dir = tempdir().expect("Failed to create temp dir");
    let missing = dir.path().join("missing.json");
    let err = read_mesh(&missing).unwrap_err();
    assert!(format!("{err:#}").contains("missing.json"));

    let broken = dir.path().join("broken.json");
    fs::write(&broken, r#"{ "vertices": [], "indices": [0, 1, 2] }"#).unwrap();
    let err = read_mesh(&broken).unwrap_err();
    assert!(format!("{err:#}").contains("Invalid mesh document"));
}

#[test]
fn test_full_pipeline() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("limb.json");
    fs::write(&input, LIMB).unwrap();
    let settings = load_settings(None).unwrap();

    let mut mesh = read_mesh(&input).unwrap();
    assert_eq!(mesh.frame, Rect::new(0.0, -10.0, 40.0, 20.0));
    triangulate(&mut mesh, &settings);
    assert_eq!(mesh_info(&mesh).triangles, 2);

    subdivide(&mut mesh, &settings, Some(0.2));
    let info = mesh_info(&mesh);
    assert!(info.vertices > 4);
    assert_eq!(info.bones, 2);

    generate_weights(&mut mesh, &settings).unwrap();
    smooth(&mut mesh, 2).unwrap();
    let info = mesh_info(&mesh);
    assert_eq!(info.unnormalized_vertices, 0);
    assert!(info.max_influences >= 1 && info.max_influences <= 4);

    let output = dir.path().join("limb.out.json");
    write_mesh(&mesh, &output).unwrap();
    let document = MeshDocument::from_json(&fs::read_to_string(&output).unwrap()).unwrap();
    assert_eq!(document.vertices.len(), mesh.vertex_count());
    assert_eq!(document.bones[1].parent, Some(0));
    assert_eq!(
        document.bones[1],
        BoneDefinition::new("lower", [20.0, 0.0].into(), 20.0)
            .with_parent(0)
            .with_depth(1.0)
    );

    let packed = dir.path().join("limb.bin");
    write_packed(&mesh, &packed).unwrap();
    assert_eq!(fs::read(&packed).unwrap().len(), mesh.vertex_count() * 40);
}

#[test]
fn test_weights_without_bones_clear_weights() {
    let dir = tempdir().expect("Failed to create temp dir");
    let input = dir.path().join("plain.json");
    let mut document = MeshDocument::from_json(LIMB).unwrap();
    document.bones.clear();
    fs::write(&input, document.to_json().unwrap()).unwrap();

    let mut mesh = read_mesh(&input).unwrap();
    generate_weights(&mut mesh, &load_settings(None).unwrap()).unwrap();
    assert_eq!(mesh.indices().len(), 6);
    assert!(mesh.weights().iter().all(|w| w.channel_count() == 0));
}
