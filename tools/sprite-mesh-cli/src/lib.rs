//! sprite-mesh-cli library
//!
//! Batch operations over mesh documents, shared by the `sprite-mesh` binary
//! and its integration tests.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use sprite_mesh::formats::{MeshDocument, pack_vertices, vertex_bytes};
use sprite_mesh::{BoundedBiharmonicWeights, DelaunayTriangulator, Settings, SpriteMeshData};

/// Load settings from a TOML file, or defaults when no path is given.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(path) = path else {
        return Ok(Settings::default());
    };
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config: {:?}", path))?;
    toml::from_str(&text).with_context(|| format!("Failed to parse config: {:?}", path))
}

pub fn read_mesh(path: &Path) -> Result<SpriteMeshData> {
    let text =
        fs::read_to_string(path).with_context(|| format!("Failed to read mesh: {:?}", path))?;
    let document = MeshDocument::from_json(&text)
        .with_context(|| format!("Failed to parse mesh document: {:?}", path))?;
    SpriteMeshData::from_document(&document)
        .with_context(|| format!("Invalid mesh document: {:?}", path))
}

pub fn write_mesh(mesh: &SpriteMeshData, path: &Path) -> Result<()> {
    let json = mesh.to_document().to_json()?;
    fs::write(path, json).with_context(|| format!("Failed to write mesh: {:?}", path))
}

/// Summary printed by `info`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshInfo {
    pub vertices: usize,
    pub edges: usize,
    pub triangles: usize,
    pub bones: usize,
    /// Vertices whose enabled weights do not sum to 1
    pub unnormalized_vertices: usize,
    /// Largest number of enabled channels on any vertex
    pub max_influences: usize,
}

pub fn mesh_info(mesh: &SpriteMeshData) -> MeshInfo {
    let weights = mesh.weights();
    MeshInfo {
        vertices: mesh.vertex_count(),
        edges: mesh.edges().len(),
        triangles: mesh.indices().len() / 3,
        bones: mesh.bones().len(),
        unnormalized_vertices: weights
            .iter()
            .filter(|w| (w.weight_sum() - 1.0).abs() > 1e-4)
            .count(),
        max_influences: weights
            .iter()
            .map(|w| w.enabled_channels().count())
            .max()
            .unwrap_or(0),
    }
}

/// Triangulate, refining with the configured tessellation bounds when any
/// of them is set.
pub fn triangulate(mesh: &mut SpriteMeshData, settings: &Settings) {
    let triangulator = DelaunayTriangulator::new();
    let t = &settings.tessellation;
    let refine = t.min_angle > 0.0
        || t.max_angle > 0.0
        || t.mesh_area_factor > 0.0
        || t.largest_triangle_area_factor > 0.0
        || t.smooth_iterations > 0;
    if refine {
        mesh.tessellate(&triangulator, t);
    } else {
        mesh.triangulate(&triangulator);
    }
}

pub fn subdivide(mesh: &mut SpriteMeshData, settings: &Settings, factor: Option<f32>) {
    let factor = factor.unwrap_or(settings.tessellation.subdivide_area_factor);
    mesh.subdivide(&DelaunayTriangulator::new(), factor);
}

/// Compute bone weights for every vertex, then depth-sort the triangles.
pub fn generate_weights(mesh: &mut SpriteMeshData, settings: &Settings) -> Result<()> {
    let triangulator = DelaunayTriangulator::new();
    if mesh.indices().is_empty() {
        mesh.triangulate(&triangulator);
    }
    let generator = BoundedBiharmonicWeights::new(settings.weights);
    mesh.calculate_weights_safe(
        &generator,
        &triangulator,
        None,
        settings.weights.filter_tolerance,
    )?;
    mesh.sort_triangles_by_depth();
    Ok(())
}

pub fn smooth(mesh: &mut SpriteMeshData, iterations: u32) -> Result<()> {
    mesh.smooth_weights(iterations, None)?;
    mesh.normalize_weights(None)?;
    Ok(())
}

/// Write the packed vertex buffer as raw bytes.
pub fn write_packed(mesh: &SpriteMeshData, path: &Path) -> Result<()> {
    let vertices = pack_vertices(mesh);
    fs::write(path, vertex_bytes(&vertices))
        .with_context(|| format!("Failed to write packed vertices: {:?}", path))
}
