//! Exchanged mesh shape
//!
//! `MeshDocument` is the JSON form used by the asset pipeline: vertices as
//! position plus a fixed-width four-slot bone weight, edges as index pairs,
//! a flat triangle list and the bone definitions. `PackedVertex` is the
//! binary vertex layout handed to renderers.

use bytemuck::{Pod, Zeroable};
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::geometry::{Edge, Rect};
use crate::mesh::{BoneDefinition, SpriteBoneData, SpriteMeshData, Vertex2D};
use crate::weights::{BoneWeight, EditableBoneWeight, MAX_BONE_INFLUENCES};

// ============================================================================
// JSON document
// ============================================================================

/// One vertex in the exchanged shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct VertexDocument {
    pub position: Vec2,
    #[serde(default)]
    pub bone_weight: BoneWeight,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MeshDocument {
    pub frame: Rect,
    pub pivot: Vec2,
    pub vertices: Vec<VertexDocument>,
    pub edges: Vec<[usize; 2]>,
    pub indices: Vec<usize>,
    pub bones: Vec<BoneDefinition>,
}

impl MeshDocument {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

fn definition_of(bone: &SpriteBoneData) -> BoneDefinition {
    BoneDefinition {
        name: bone.name.clone(),
        parent: bone.parent,
        local_position: bone.local_position,
        local_rotation: bone.local_rotation,
        length: bone.length,
        depth: bone.depth,
    }
}

impl SpriteMeshData {
    /// Export to the exchanged shape; weights are written heaviest first.
    pub fn to_document(&self) -> MeshDocument {
        MeshDocument {
            frame: self.frame,
            pivot: self.pivot,
            vertices: self
                .vertices()
                .iter()
                .map(|v| VertexDocument {
                    position: v.position,
                    bone_weight: v.editable_bone_weight.to_bone_weight(true),
                })
                .collect(),
            edges: self
                .edges()
                .iter()
                .map(|e| [e.index1, e.index2])
                .collect(),
            indices: self.indices().to_vec(),
            bones: self.bones().iter().map(definition_of).collect(),
        }
    }

    /// Import from the exchanged shape.
    ///
    /// Fails on dangling edges or triangle indices and on an invalid bone
    /// hierarchy.
    pub fn from_document(document: &MeshDocument) -> Result<Self> {
        let mut mesh = Self::new(document.frame, document.pivot);
        mesh.set_bones(&document.bones)?;

        let vertices = document
            .vertices
            .iter()
            .map(|v| {
                let mut weight = EditableBoneWeight::from_bone_weight(&v.bone_weight);
                weight.remove_disabled_channels();
                Vertex2D::with_weight(v.position, weight)
            })
            .collect();
        let edges = document
            .edges
            .iter()
            .map(|&[a, b]| Edge::new(a, b))
            .collect();
        mesh.set_topology(vertices, edges, document.indices.clone())?;
        Ok(mesh)
    }
}

// ============================================================================
// Packed binary layout
// ============================================================================

/// Render vertex (40 bytes)
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Pod, Zeroable)]
pub struct PackedVertex {
    pub position: [f32; 2],
    /// Bone indices, heaviest influence first
    pub bone_indices: [u32; MAX_BONE_INFLUENCES],
    pub weights: [f32; MAX_BONE_INFLUENCES],
}

impl PackedVertex {
    pub fn new(position: Vec2, bone_weight: &BoneWeight) -> Self {
        let mut packed = Self {
            position: position.to_array(),
            ..Self::default()
        };
        for (i, slot) in bone_weight.slots.iter().enumerate() {
            packed.bone_indices[i] = u32::try_from(slot.bone_index).unwrap_or(u32::MAX);
            packed.weights[i] = slot.weight;
        }
        packed
    }
}

/// Vertices of `mesh` in the packed layout.
pub fn pack_vertices(mesh: &SpriteMeshData) -> Vec<PackedVertex> {
    mesh.vertices()
        .iter()
        .map(|v| PackedVertex::new(v.position, &v.editable_bone_weight.to_bone_weight(true)))
        .collect()
}

/// Raw bytes of a packed vertex buffer
pub fn vertex_bytes(vertices: &[PackedVertex]) -> &[u8] {
    bytemuck::cast_slice(vertices)
}
