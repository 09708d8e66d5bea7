//! Bone records and hierarchy resolution

use glam::Vec2;
use serde::{Deserialize, Serialize};

use super::SpriteMeshData;
use crate::error::{MeshError, Result};

/// Bone as supplied by a skeleton provider, relative to its parent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoneDefinition {
    pub name: String,
    pub parent: Option<usize>,
    pub local_position: Vec2,
    /// Radians, counter-clockwise
    pub local_rotation: f32,
    pub length: f32,
    pub depth: f32,
}

impl BoneDefinition {
    pub fn new(name: impl Into<String>, local_position: Vec2, length: f32) -> Self {
        Self {
            name: name.into(),
            local_position,
            length,
            ..Self::default()
        }
    }

    pub fn with_parent(mut self, parent: usize) -> Self {
        self.parent = Some(parent);
        self
    }

    pub fn with_rotation(mut self, local_rotation: f32) -> Self {
        self.local_rotation = local_rotation;
        self
    }

    pub fn with_depth(mut self, depth: f32) -> Self {
        self.depth = depth;
        self
    }
}

/// Bone with resolved world-space placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SpriteBoneData {
    pub name: String,
    pub parent: Option<usize>,
    pub local_position: Vec2,
    pub local_rotation: f32,
    /// World start point
    pub position: Vec2,
    /// World rotation, radians
    pub rotation: f32,
    pub end_position: Vec2,
    pub depth: f32,
    pub length: f32,
}

#[derive(Clone, Copy, PartialEq)]
enum Visit {
    Pending,
    InProgress,
    Done,
}

/// Resolve world placement of every bone by walking parents.
pub fn resolve_bones(definitions: &[BoneDefinition]) -> Result<Vec<SpriteBoneData>> {
    for (bone, def) in definitions.iter().enumerate() {
        if let Some(parent) = def.parent {
            if parent >= definitions.len() {
                return Err(MeshError::InvalidBoneParent { bone, parent });
            }
        }
    }

    let mut bones: Vec<SpriteBoneData> = definitions
        .iter()
        .map(|def| SpriteBoneData {
            name: def.name.clone(),
            parent: def.parent,
            local_position: def.local_position,
            local_rotation: def.local_rotation,
            depth: def.depth,
            length: def.length,
            ..SpriteBoneData::default()
        })
        .collect();
    let mut state = vec![Visit::Pending; bones.len()];

    for root in 0..bones.len() {
        // Collect the unresolved ancestor chain, deepest first
        let mut chain = Vec::new();
        let mut current = Some(root);
        while let Some(bone) = current {
            match state[bone] {
                Visit::Done => break,
                Visit::InProgress => return Err(MeshError::CyclicBoneHierarchy { bone }),
                Visit::Pending => {
                    state[bone] = Visit::InProgress;
                    chain.push(bone);
                    current = bones[bone].parent;
                }
            }
        }

        for &bone in chain.iter().rev() {
            let (origin, base_rotation) = match bones[bone].parent {
                Some(parent) => (bones[parent].position, bones[parent].rotation),
                None => (Vec2::ZERO, 0.0),
            };
            let data = &mut bones[bone];
            data.rotation = base_rotation + data.local_rotation;
            data.position = origin + Vec2::from_angle(base_rotation).rotate(data.local_position);
            data.end_position = data.position + Vec2::from_angle(data.rotation) * data.length;
            state[bone] = Visit::Done;
        }
    }

    Ok(bones)
}

impl SpriteMeshData {
    pub fn bones(&self) -> &[SpriteBoneData] {
        &self.bones
    }

    /// Replace the bone list, resolving world placement from `definitions`.
    ///
    /// On error the mesh is left unchanged.
    pub fn set_bones(&mut self, definitions: &[BoneDefinition]) -> Result<()> {
        self.bones = resolve_bones(definitions)?;
        tracing::debug!(bones = self.bones.len(), "Set bones");
        Ok(())
    }

    pub fn set_bone_depth(&mut self, bone: usize, depth: f32) -> Result<()> {
        let len = self.bones.len();
        let data = self
            .bones
            .get_mut(bone)
            .ok_or(MeshError::IndexOutOfRange { index: bone, len })?;
        data.depth = depth;
        Ok(())
    }

    /// Drop every channel of `bone_index` and shift higher bone indices
    /// down by one, renormalizing the affected vertices.
    pub fn remove_bone_references(&mut self, bone_index: usize) {
        for vertex in &mut self.vertices {
            let weight = &mut vertex.editable_bone_weight;
            let mut touched = false;
            for channel in weight.channels_mut() {
                if channel.data.bone_index == bone_index {
                    channel.enabled = false;
                    channel.data.weight = 0.0;
                    touched = true;
                } else if channel.data.bone_index > bone_index {
                    channel.data.bone_index -= 1;
                }
            }
            if touched {
                weight.remove_disabled_channels();
                weight.normalize_channels();
            }
        }
    }
}
