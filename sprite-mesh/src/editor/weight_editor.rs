//! Weight edit policy
//!
//! A weight edit is a session: `on_edit_start` snapshots the weights,
//! `do_edit` is called for every scrub value and `on_edit_end` clamps and
//! normalizes. Absolute edits are always applied to the snapshot, so calling
//! `do_edit` twice with the same value gives the same result.

use super::selection::VertexSelection;
use super::undo::{NoUndo, UndoRecorder};
use crate::config::EditSettings;
use crate::error::{MeshError, Result, check_index};
use crate::mesh::SpriteMeshData;
use crate::weights::{BoneWeightData, EditableBoneWeight, MAX_BONE_INFLUENCES, SmoothingUtility};

/// What a scrub value does to the selected vertices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WeightEditMode {
    /// Add to or subtract from one bone, creating its channel if needed
    #[default]
    AddAndSubtract,
    /// Like `AddAndSubtract`, but only on vertices already using the bone
    GrowAndShrink,
    /// Blend toward the Laplacian-smoothed field; the value is an iteration
    /// count with a fractional part
    Smooth,
}

pub struct WeightEditor<U: UndoRecorder = NoUndo> {
    pub mode: WeightEditMode,
    /// Bone painted by `AddAndSubtract` and `GrowAndShrink`
    pub bone_index: usize,
    pub settings: EditSettings,
    pub selection: VertexSelection,
    undo: U,
    relative: bool,
    snapshot: Vec<EditableBoneWeight>,
    /// `smoothed[i]` is the snapshot smoothed `i` times
    smoothed: Vec<Vec<EditableBoneWeight>>,
    smoothing: Option<SmoothingUtility>,
    editing: bool,
}

impl Default for WeightEditor {
    fn default() -> Self {
        Self::new(NoUndo, EditSettings::default())
    }
}

impl<U: UndoRecorder> WeightEditor<U> {
    pub fn new(undo: U, settings: EditSettings) -> Self {
        Self {
            mode: WeightEditMode::default(),
            bone_index: 0,
            settings,
            selection: VertexSelection::new(),
            undo,
            relative: false,
            snapshot: Vec::new(),
            smoothed: Vec::new(),
            smoothing: None,
            editing: false,
        }
    }

    pub fn undo_recorder(&self) -> &U {
        &self.undo
    }

    pub fn is_editing(&self) -> bool {
        self.editing
    }

    /// Number of smoothed fields cached for the current session
    pub fn cached_smooth_levels(&self) -> usize {
        self.smoothed.len()
    }

    /// Vertices an edit touches: the selection, or every vertex when the
    /// selection is empty and the settings allow it.
    fn targets(&self, mesh: &SpriteMeshData) -> Result<Vec<usize>> {
        if self.selection.is_empty() {
            return Ok(if self.settings.empty_selection_edits_all {
                (0..mesh.vertex_count()).collect()
            } else {
                Vec::new()
            });
        }
        let targets = self.selection.to_vec();
        for &index in &targets {
            check_index(index, mesh.vertex_count())?;
        }
        Ok(targets)
    }

    /// Begin a session. With `relative`, every `do_edit` value is applied on
    /// top of the current weights instead of the session snapshot.
    pub fn on_edit_start(&mut self, mesh: &SpriteMeshData, relative: bool) -> Result<()> {
        if self.mode != WeightEditMode::Smooth {
            check_index(self.bone_index, mesh.bones().len())?;
        }
        self.targets(mesh)?;

        self.undo.record("Edit Weights", mesh);
        self.relative = relative;
        self.snapshot = mesh.weights();
        self.smoothed.clear();
        self.smoothing = None;
        if self.mode == WeightEditMode::Smooth {
            self.smoothing = Some(SmoothingUtility::new(mesh.vertex_count(), mesh.indices()));
            self.smoothed.push(self.snapshot.clone());
        }
        self.editing = true;
        tracing::debug!(
            mode = ?self.mode,
            bone = self.bone_index,
            relative,
            "Weight edit started"
        );
        Ok(())
    }

    /// Extend the smoothed cache so that level `level` exists.
    fn ensure_smoothed(&mut self, level: usize, bone_count: usize) {
        let Some(smoothing) = &self.smoothing else {
            return;
        };
        while self.smoothed.len() <= level {
            let Some(last) = self.smoothed.last() else {
                return;
            };
            let next = smoothing.smooth(last, bone_count, 1);
            self.smoothed.push(next);
        }
    }

    /// Apply one scrub value.
    pub fn do_edit(&mut self, mesh: &mut SpriteMeshData, value: f32) -> Result<()> {
        if !self.editing {
            return Err(MeshError::InvalidArgument(
                "weight edit has not been started".into(),
            ));
        }
        let targets = self.targets(mesh)?;
        match self.mode {
            WeightEditMode::AddAndSubtract | WeightEditMode::GrowAndShrink => {
                self.edit_bone(mesh, &targets, value)
            }
            WeightEditMode::Smooth => self.edit_smooth(mesh, &targets, value),
        }
    }

    fn edit_bone(&mut self, mesh: &mut SpriteMeshData, targets: &[usize], value: f32) -> Result<()> {
        let create = self.mode == WeightEditMode::AddAndSubtract && value > 0.0;
        for &index in targets {
            let mut weight = if self.relative {
                mesh.weight(index)?.clone()
            } else {
                self.snapshot.get(index).cloned().unwrap_or_default()
            };

            let channel = match weight.channel_from_bone_index(self.bone_index) {
                Some(channel) => channel,
                None if create => {
                    weight.add_channel(BoneWeightData::new(self.bone_index, 0.0), true);
                    weight.channel_count() - 1
                }
                None => continue,
            };
            let current = weight.weight(channel)?;
            weight.set_weight(channel, (current + value).clamp(0.0, 1.0))?;
            weight.compensate_other_channels(channel)?;
            *mesh.weight_mut(index)? = weight;
        }
        Ok(())
    }

    fn edit_smooth(&mut self, mesh: &mut SpriteMeshData, targets: &[usize], value: f32) -> Result<()> {
        let max = self.settings.max_smooth_iterations as usize;
        let amount = value.clamp(0.0, max as f32);
        let level = (amount.floor() as usize).min(max);
        let fraction = amount - level as f32;
        let next = (level + 1).min(max);
        self.ensure_smoothed(next, mesh.bones().len());

        let (Some(low), Some(high)) = (self.smoothed.get(level), self.smoothed.get(next)) else {
            return Ok(());
        };
        for &index in targets {
            if let (Some(a), Some(b)) = (low.get(index), high.get(index)) {
                *mesh.weight_mut(index)? = EditableBoneWeight::lerp(a, b, fraction);
            }
        }
        Ok(())
    }

    /// Close the session: clamp channel counts after painting and normalize
    /// every vertex if enabled.
    pub fn on_edit_end(&mut self, mesh: &mut SpriteMeshData) -> Result<()> {
        if !self.editing {
            return Ok(());
        }
        if self.mode == WeightEditMode::AddAndSubtract {
            let targets = self.targets(mesh)?;
            mesh.clamp_weights(MAX_BONE_INFLUENCES, Some(&targets))?;
        }
        if self.settings.auto_normalize {
            mesh.normalize_weights(None)?;
        }
        self.undo.increment_group();
        self.editing = false;
        self.snapshot.clear();
        self.smoothed.clear();
        self.smoothing = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::editor::SnapshotHistory;
    use crate::geometry::Rect;
    use crate::mesh::BoneDefinition;

    /// Strip of four vertices: 0 and 1 on bone 0, 2 and 3 on bone 1.
    fn strip() -> SpriteMeshData {
        let mut mesh = SpriteMeshData::new(Rect::new(0.0, 0.0, 30.0, 10.0), Vec2::ZERO);
        for x in [0.0, 10.0, 20.0, 30.0] {
            mesh.create_vertex(Vec2::new(x, 0.0), None).unwrap();
        }
        mesh.set_bones(&[
            BoneDefinition::new("a", Vec2::ZERO, 10.0),
            BoneDefinition::new("b", Vec2::new(20.0, 0.0), 10.0),
        ])
        .unwrap();
        for v in 0..4 {
            let bone = if v < 2 { 0 } else { 1 };
            mesh.weight_mut(v)
                .unwrap()
                .add_channel(BoneWeightData::new(bone, 1.0), true);
        }
        mesh
    }

    fn bone_weight(mesh: &SpriteMeshData, vertex: usize, bone: usize) -> f32 {
        mesh.weight(vertex)
            .unwrap()
            .enabled_channels()
            .filter(|d| d.bone_index == bone)
            .map(|d| d.weight)
            .sum()
    }

    #[test]
    fn test_add_creates_channel_and_compensates() {
        let mut mesh = strip();
        let mut editor = WeightEditor::default();
        editor.bone_index = 1;
        editor.selection.select(1, true);
        editor.on_edit_start(&mesh, false).unwrap();
        editor.do_edit(&mut mesh, 0.25).unwrap();
        assert!((bone_weight(&mesh, 1, 1) - 0.25).abs() < 1e-6);
        assert!((bone_weight(&mesh, 1, 0) - 0.75).abs() < 1e-6);
        // Absolute edits restart from the snapshot
        editor.do_edit(&mut mesh, 0.25).unwrap();
        assert!((bone_weight(&mesh, 1, 1) - 0.25).abs() < 1e-6);
        editor.on_edit_end(&mut mesh).unwrap();
        assert!((mesh.weight(1).unwrap().weight_sum() - 1.0).abs() < 1e-6);
        // Unselected vertices untouched
        assert_eq!(bone_weight(&mesh, 0, 0), 1.0);
    }

    #[test]
    fn test_relative_edits_accumulate() {
        let mut mesh = strip();
        let mut editor = WeightEditor::default();
        editor.bone_index = 1;
        editor.selection.select(0, true);
        editor.on_edit_start(&mesh, true).unwrap();
        editor.do_edit(&mut mesh, 0.2).unwrap();
        editor.do_edit(&mut mesh, 0.2).unwrap();
        assert!((bone_weight(&mesh, 0, 1) - 0.4).abs() < 1e-5);
        assert!((bone_weight(&mesh, 0, 0) - 0.6).abs() < 1e-5);
    }

    #[test]
    fn test_grow_never_creates_channels() {
        let mut mesh = strip();
        let mut editor = WeightEditor::default();
        editor.mode = WeightEditMode::GrowAndShrink;
        editor.bone_index = 1;
        editor.on_edit_start(&mesh, false).unwrap();
        editor.do_edit(&mut mesh, 0.5).unwrap();
        // Empty selection edits everything, but vertices 0 and 1 lack bone 1
        assert!(!mesh.weight(0).unwrap().contains_bone(1));
        assert_eq!(bone_weight(&mesh, 2, 1), 1.0);
    }

    #[test]
    fn test_invalid_bone_is_rejected() {
        let mesh = strip();
        let mut editor = WeightEditor::default();
        editor.bone_index = 5;
        assert!(matches!(
            editor.on_edit_start(&mesh, false),
            Err(MeshError::IndexOutOfRange { index: 5, len: 2 })
        ));
        assert!(!editor.is_editing());
    }

    #[test]
    fn test_smooth_interpolates_cached_levels() {
        let mut mesh = strip();
        mesh.set_topology(mesh.vertices().to_vec(), Vec::new(), vec![0, 1, 2, 1, 3, 2])
            .unwrap();
        let original = mesh.clone();

        let mut editor = WeightEditor::new(SnapshotHistory::new(4), EditSettings::default());
        editor.mode = WeightEditMode::Smooth;
        editor.on_edit_start(&mesh, false).unwrap();
        assert_eq!(editor.cached_smooth_levels(), 1);

        editor.do_edit(&mut mesh, 0.0).unwrap();
        assert_eq!(mesh.weights(), original.weights());

        editor.do_edit(&mut mesh, 1.0).unwrap();
        let once = mesh.weights();
        editor.do_edit(&mut mesh, 0.5).unwrap();
        let half = mesh.weights();
        assert_eq!(editor.cached_smooth_levels(), 3);

        let bone1 = |w: &EditableBoneWeight| -> f32 {
            w.enabled_channels()
                .filter(|d| d.bone_index == 1)
                .map(|d| d.weight)
                .sum()
        };
        let b1_once = bone1(&once[1]);
        let b1_half = bone1(&half[1]);
        assert!(b1_once > 0.0);
        assert!((b1_half - b1_once * 0.5).abs() < 1e-4);

        // Scrubbing past the limit clamps to the last level
        editor.do_edit(&mut mesh, 100.0).unwrap();
        assert_eq!(editor.cached_smooth_levels(), 9);
        editor.on_edit_end(&mut mesh).unwrap();
        assert_eq!(editor.undo_recorder().last_action(), Some("Edit Weights"));
        for w in mesh.weights() {
            assert!((w.weight_sum() - 1.0).abs() < 1e-4);
        }
    }

    #[test]
    fn test_do_edit_requires_session() {
        let mut mesh = strip();
        let mut editor = WeightEditor::default();
        assert!(editor.do_edit(&mut mesh, 0.1).is_err());
    }
}
