//! Weight entry points on the mesh
//!
//! Every operation takes an optional vertex selection; `None` means every
//! vertex. Selections are validated before anything is written.

use super::SpriteMeshData;
use crate::error::{Result, check_index};
use crate::solver::WeightsGenerator;
use crate::triangulation::Triangulator;
use crate::weights::{EditableBoneWeight, SmoothingUtility};

impl SpriteMeshData {
    fn resolve_selection(&self, selection: Option<&[usize]>) -> Result<Vec<usize>> {
        match selection {
            Some(indices) => {
                for &index in indices {
                    check_index(index, self.vertices.len())?;
                }
                Ok(indices.to_vec())
            }
            None => Ok((0..self.vertices.len()).collect()),
        }
    }

    /// Solve bone weights for the current geometry and write them to the
    /// selected vertices.
    ///
    /// The solve always sees the whole mesh; channels at or below
    /// `filter_tolerance` are dropped and the rest renormalized.
    pub fn calculate_weights(
        &mut self,
        generator: &dyn WeightsGenerator,
        triangulator: &dyn Triangulator,
        selection: Option<&[usize]>,
        filter_tolerance: f32,
    ) -> Result<()> {
        let targets = self.resolve_selection(selection)?;
        let graph = self.control_points(generator.control_point_tolerance());
        let positions = self.positions();
        let weights = generator.calculate(triangulator, &positions, &self.edges, &graph);

        for index in targets {
            let Some(bone_weight) = weights.get(index) else {
                continue;
            };
            let weight = &mut self.vertices[index].editable_bone_weight;
            weight.set_from_bone_weight(bone_weight);
            weight.filter_channels(filter_tolerance);
            weight.remove_disabled_channels();
            weight.normalize_channels();
        }
        Ok(())
    }

    /// `calculate_weights`, or `clear_weights` when the mesh has no bones.
    pub fn calculate_weights_safe(
        &mut self,
        generator: &dyn WeightsGenerator,
        triangulator: &dyn Triangulator,
        selection: Option<&[usize]>,
        filter_tolerance: f32,
    ) -> Result<()> {
        if self.bones.is_empty() {
            tracing::debug!("No bones, clearing weights instead of solving");
            return self.clear_weights(selection);
        }
        self.calculate_weights(generator, triangulator, selection, filter_tolerance)
    }

    pub fn clear_weights(&mut self, selection: Option<&[usize]>) -> Result<()> {
        for index in self.resolve_selection(selection)? {
            self.vertices[index].editable_bone_weight.clear();
        }
        Ok(())
    }

    pub fn normalize_weights(&mut self, selection: Option<&[usize]>) -> Result<()> {
        for index in self.resolve_selection(selection)? {
            self.vertices[index].editable_bone_weight.normalize_channels();
        }
        Ok(())
    }

    /// Keep the `max_channels` heaviest channels per vertex, renormalized.
    pub fn clamp_weights(&mut self, max_channels: usize, selection: Option<&[usize]>) -> Result<()> {
        for index in self.resolve_selection(selection)? {
            let weight = &mut self.vertices[index].editable_bone_weight;
            weight.clamp_channels(max_channels, true);
            weight.normalize_channels();
        }
        Ok(())
    }

    /// Laplacian-smooth the weight field `iterations` times; only the
    /// selected vertices take the smoothed values.
    pub fn smooth_weights(&mut self, iterations: u32, selection: Option<&[usize]>) -> Result<()> {
        let targets = self.resolve_selection(selection)?;
        let utility = SmoothingUtility::new(self.vertices.len(), &self.indices);
        let smoothed: Vec<EditableBoneWeight> =
            utility.smooth(&self.weights(), self.bones.len(), iterations);
        for index in targets {
            if let Some(weight) = smoothed.get(index) {
                self.vertices[index].editable_bone_weight = weight.clone();
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use glam::Vec2;

    use super::*;
    use crate::geometry::Rect;
    use crate::mesh::BoneDefinition;
    use crate::solver::BoundedBiharmonicWeights;
    use crate::triangulation::DelaunayTriangulator;
    use crate::weights::BoneWeightData;

    fn strip() -> SpriteMeshData {
        let mut mesh = SpriteMeshData::new(Rect::new(0.0, -5.0, 20.0, 10.0), Vec2::ZERO);
        for p in [(0.0, -5.0), (20.0, -5.0), (20.0, 5.0), (0.0, 5.0)] {
            mesh.create_vertex(Vec2::new(p.0, p.1), None).unwrap();
        }
        for i in 0..4 {
            mesh.create_edge(i, (i + 1) % 4).unwrap();
        }
        mesh.triangulate(&DelaunayTriangulator::new());
        mesh
    }

    #[test]
    fn test_safe_calculation_without_bones_clears() {
        let mut mesh = strip();
        mesh.weight_mut(0)
            .unwrap()
            .add_channel(BoneWeightData::new(3, 1.0), true);
        mesh.calculate_weights_safe(
            &BoundedBiharmonicWeights::default(),
            &DelaunayTriangulator::new(),
            None,
            0.01,
        )
        .unwrap();
        assert_eq!(mesh.weight(0).unwrap().channel_count(), 0);
    }

    #[test]
    fn test_calculate_only_touches_selection() {
        let mut mesh = strip();
        mesh.set_bones(&[BoneDefinition::new("root", Vec2::new(1.0, 0.0), 18.0)])
            .unwrap();
        mesh.calculate_weights(
            &BoundedBiharmonicWeights::default(),
            &DelaunayTriangulator::new(),
            Some(&[1, 2]),
            0.01,
        )
        .unwrap();
        assert_eq!(mesh.weight(0).unwrap().channel_count(), 0);
        for v in [1, 2] {
            let weight = mesh.weight(v).unwrap();
            assert!((weight.weight_sum() - 1.0).abs() < 1e-5);
            assert!(weight.contains_bone(0));
        }
    }

    #[test]
    fn test_invalid_selection_is_rejected_before_mutation() {
        let mut mesh = strip();
        for v in 0..4 {
            mesh.weight_mut(v)
                .unwrap()
                .add_channel(BoneWeightData::new(0, 1.0), true);
        }
        assert!(mesh.clear_weights(Some(&[0, 9])).is_err());
        assert_eq!(mesh.weight(0).unwrap().channel_count(), 1);
    }

    #[test]
    fn test_clamp_weights_keeps_heaviest() {
        let mut mesh = strip();
        let weight = mesh.weight_mut(0).unwrap();
        for (bone, w) in [(0, 0.1), (1, 0.5), (2, 0.4)] {
            weight.add_channel(BoneWeightData::new(bone, w), true);
        }
        mesh.clamp_weights(2, None).unwrap();
        let weight = mesh.weight(0).unwrap();
        assert_eq!(weight.channel_count(), 2);
        assert!(!weight.contains_bone(0));
        assert!((weight.weight_sum() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_smooth_weights_spreads_influence() {
        let mut mesh = strip();
        mesh.set_bones(&[
            BoneDefinition::new("a", Vec2::ZERO, 5.0),
            BoneDefinition::new("b", Vec2::new(10.0, 0.0), 5.0),
        ])
        .unwrap();
        for v in 0..4 {
            let bone = if v == 0 || v == 3 { 0 } else { 1 };
            mesh.weight_mut(v)
                .unwrap()
                .add_channel(BoneWeightData::new(bone, 1.0), true);
        }
        mesh.smooth_weights(1, Some(&[0])).unwrap();
        assert!(mesh.weight(0).unwrap().contains_bone(1));
        assert_eq!(mesh.weight(1).unwrap().channel_count(), 1);
    }

    #[test]
    fn test_remove_bone_references_shifts_indices() {
        let mut mesh = strip();
        let weight = mesh.weight_mut(0).unwrap();
        weight.add_channel(BoneWeightData::new(0, 0.5), true);
        weight.add_channel(BoneWeightData::new(2, 0.5), true);
        mesh.remove_bone_references(0);
        let weight = mesh.weight(0).unwrap();
        assert_eq!(weight.channel_count(), 1);
        assert!(weight.contains_bone(1));
        assert!((weight.weight_sum() - 1.0).abs() < 1e-5);
    }
}
