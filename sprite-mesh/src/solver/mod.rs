//! Automatic bone weights by bounded biharmonic diffusion
//!
//! The bone skeleton is reduced to a control graph (points, edges, pins).
//! Mesh vertices and densified control edges are tessellated together, and
//! for every bone a biharmonic field `L M^-1 L w = 0` is solved with the
//! bone's handles held at 1 and every other handle at 0, then projected to
//! `[0, 1]`. The fields are normalized per vertex and truncated to four
//! influences.

mod laplacian;
pub mod sparse;

use glam::{DVec2, Vec2};
use smallvec::SmallVec;

use crate::config::{TessellationSettings, WeightGenerationSettings};
use crate::geometry::Edge;
use crate::mesh::SpriteBoneData;
use crate::triangulation::Triangulator;
use crate::weights::{BoneWeight, BoneWeightData, MAX_BONE_INFLUENCES};

use sparse::{CsrMatrix, conjugate_gradient, projected_gauss_seidel};

/// Fraction of a bone's length at which its second control point sits
const BONE_END_FRACTION: f32 = 0.99;

/// Relative diagonal regularization of the biharmonic operator
const REGULARIZATION: f64 = 1e-10;

/// Control edge between two control points, owned by one bone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControlEdge {
    pub start: usize,
    pub end: usize,
    pub bone_index: usize,
}

/// Zero-length bone acting as a single handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPin {
    pub position: Vec2,
    pub bone_index: usize,
}

/// Handles derived from a skeleton.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ControlGraph {
    pub points: Vec<Vec2>,
    pub edges: Vec<ControlEdge>,
    pub pins: Vec<ControlPin>,
}

impl ControlGraph {
    /// Derive control points from bone world positions.
    ///
    /// A bone with length contributes its start and a point 99% of the way to
    /// its end, joined by an edge; points within `tolerance` are merged. A
    /// zero-length bone becomes a pin, as does a bone shorter than
    /// `tolerance`, whose two points would merge into one.
    pub fn from_bones(bones: &[SpriteBoneData], tolerance: f32) -> Self {
        let mut graph = Self::default();
        for (bone_index, bone) in bones.iter().enumerate() {
            let start = bone.position;
            let end = bone.end_position;
            if bone.length <= 0.0 || start.distance(end) <= tolerance {
                graph.pins.push(ControlPin {
                    position: start,
                    bone_index,
                });
                continue;
            }
            let tip = start + (end - start) * BONE_END_FRACTION;
            let s = graph.add_point(start, tolerance);
            let e = graph.add_point(tip, tolerance);
            if s != e {
                graph.edges.push(ControlEdge {
                    start: s,
                    end: e,
                    bone_index,
                });
            }
        }
        graph
    }

    fn add_point(&mut self, position: Vec2, tolerance: f32) -> usize {
        match self
            .points
            .iter()
            .position(|p| p.distance(position) <= tolerance)
        {
            Some(existing) => existing,
            None => {
                self.points.push(position);
                self.points.len() - 1
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.edges.is_empty() && self.pins.is_empty()
    }

    /// Bones owning control point `point`, in edge order
    pub fn bones_at(&self, point: usize) -> SmallVec<[usize; 2]> {
        let mut bones = SmallVec::new();
        for edge in &self.edges {
            if (edge.start == point || edge.end == point) && !bones.contains(&edge.bone_index) {
                bones.push(edge.bone_index);
            }
        }
        bones
    }

    /// Bone of the control point or pin closest to `position`
    pub fn nearest_bone(&self, position: Vec2) -> Option<usize> {
        let points = self
            .points
            .iter()
            .enumerate()
            .filter_map(|(i, p)| self.bones_at(i).first().map(|&b| (*p, b)));
        let pins = self.pins.iter().map(|pin| (pin.position, pin.bone_index));
        points
            .chain(pins)
            .min_by(|a, b| {
                a.0.distance_squared(position)
                    .total_cmp(&b.0.distance_squared(position))
            })
            .map(|(_, bone)| bone)
    }

    /// Highest referenced bone index plus one
    pub fn bone_count(&self) -> usize {
        self.edges
            .iter()
            .map(|e| e.bone_index + 1)
            .chain(self.pins.iter().map(|p| p.bone_index + 1))
            .max()
            .unwrap_or(0)
    }
}

/// Strategy producing one fixed-width weight record per vertex.
pub trait WeightsGenerator {
    /// Distance under which bone points share a control point
    fn control_point_tolerance(&self) -> f32 {
        0.01
    }

    fn calculate(
        &self,
        triangulator: &dyn Triangulator,
        vertices: &[Vec2],
        edges: &[Edge],
        graph: &ControlGraph,
    ) -> Vec<BoneWeight>;
}

/// Bounded biharmonic weights over a dense tessellation of mesh and skeleton.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundedBiharmonicWeights {
    pub settings: WeightGenerationSettings,
}

/// Handle values of one solve point: `(bone, share)` pairs
type Handle = SmallVec<[(usize, f64); 2]>;

impl BoundedBiharmonicWeights {
    pub fn new(settings: WeightGenerationSettings) -> Self {
        Self { settings }
    }

    /// Number of samples inserted along a control edge of `length`
    fn sample_count(&self, length: f32) -> usize {
        if self.settings.distance_per_sample <= 0.0 {
            return 0;
        }
        let by_distance = (length / self.settings.distance_per_sample).floor().max(0.0) as usize;
        by_distance.min(self.settings.min_samples as usize)
    }

    /// Index of a point equal (within tolerance) to `p`, or a new one.
    fn merge_point(&self, points: &mut Vec<Vec2>, p: Vec2) -> usize {
        let tolerance = self.settings.control_point_tolerance;
        match points.iter().position(|q| q.distance(p) <= tolerance) {
            Some(i) => i,
            None => {
                points.push(p);
                points.len() - 1
            }
        }
    }

    /// Combined point set, constraint edges and handle assignments.
    fn build_domain(
        &self,
        vertices: &[Vec2],
        edges: &[Edge],
        graph: &ControlGraph,
    ) -> (Vec<Vec2>, Vec<Edge>, Vec<(usize, usize)>) {
        let mut points = vertices.to_vec();
        let mut domain_edges: Vec<Edge> = edges
            .iter()
            .copied()
            .filter(|e| e.index1 < vertices.len() && e.index2 < vertices.len())
            .collect();
        // (point, bone) handle assignments
        let mut handles = Vec::new();

        let control: Vec<usize> = graph
            .points
            .iter()
            .map(|&p| self.merge_point(&mut points, p))
            .collect();

        for edge in &graph.edges {
            let (start, end) = (graph.points[edge.start], graph.points[edge.end]);
            let samples = self.sample_count(start.distance(end));
            let mut chain = vec![control[edge.start]];
            for s in 0..samples {
                let t = (s + 1) as f32 / (samples + 1) as f32;
                chain.push(self.merge_point(&mut points, start.lerp(end, t)));
            }
            chain.push(control[edge.end]);
            chain.dedup();

            for pair in chain.windows(2) {
                domain_edges.push(Edge::new(pair[0], pair[1]));
            }
            for &p in &chain {
                handles.push((p, edge.bone_index));
            }
        }
        for pin in &graph.pins {
            let p = self.merge_point(&mut points, pin.position);
            handles.push((p, pin.bone_index));
        }

        handles.sort_unstable();
        handles.dedup();
        (points, domain_edges, handles)
    }

    /// Solve one bounded field per bone. Returns `fields[bone][point]`.
    fn solve(
        &self,
        points: &[Vec2],
        indices: &[usize],
        handles: &[Handle],
        bone_count: usize,
    ) -> Vec<Vec<f64>> {
        let n = points.len();
        let positions: Vec<DVec2> = points.iter().map(|p| p.as_dvec2()).collect();
        let triangles: Vec<[usize; 3]> = indices
            .chunks_exact(3)
            .map(|t| [t[0], t[1], t[2]])
            .collect();

        let (laplacian, mass) = laplacian::cotangent_laplacian(&positions, &triangles);
        let mut operator: CsrMatrix = laplacian::bilaplacian(&laplacian, &mass);
        let diagonal = operator.diagonal();
        let scale = diagonal.iter().map(|d| d.abs()).fold(0.0, f64::max);
        operator.add_to_diagonal(scale.max(1.0) * REGULARIZATION);

        let fixed: Vec<bool> = handles.iter().map(|h| !h.is_empty()).collect();
        let max_iterations = self.settings.solver_max_iterations as usize;
        let sweeps = self.settings.bound_iterations as usize;

        (0..bone_count)
            .map(|bone| {
                let mut x: Vec<f64> = handles
                    .iter()
                    .map(|h| {
                        h.iter()
                            .filter(|(b, _)| *b == bone)
                            .map(|(_, share)| *share)
                            .sum()
                    })
                    .collect();
                if x.iter().all(|v| *v == 0.0) {
                    return vec![0.0; n];
                }
                let report = conjugate_gradient(
                    &operator,
                    &mut x,
                    &fixed,
                    max_iterations,
                    self.settings.solver_tolerance,
                );
                if !report.converged {
                    tracing::debug!(
                        bone,
                        iterations = report.iterations,
                        residual = report.residual,
                        "Weight solve did not reach tolerance"
                    );
                }
                projected_gauss_seidel(&operator, &mut x, &fixed, 0.0, 1.0, sweeps);
                x
            })
            .collect()
    }
}

impl WeightsGenerator for BoundedBiharmonicWeights {
    fn control_point_tolerance(&self) -> f32 {
        self.settings.control_point_tolerance
    }

    fn calculate(
        &self,
        triangulator: &dyn Triangulator,
        vertices: &[Vec2],
        edges: &[Edge],
        graph: &ControlGraph,
    ) -> Vec<BoneWeight> {
        if vertices.is_empty() {
            return Vec::new();
        }
        if graph.is_empty() {
            tracing::warn!("No bones with handles, all weights are zero");
            return vec![BoneWeight::default(); vertices.len()];
        }

        let (mut points, mut domain_edges, assignments) =
            self.build_domain(vertices, edges, graph);
        let handle_count = points.len();
        let settings = TessellationSettings {
            min_angle: 0.0,
            max_angle: 0.0,
            mesh_area_factor: self.settings.mesh_area_factor,
            largest_triangle_area_factor: 0.0,
            smooth_iterations: 0,
            ..TessellationSettings::default()
        };
        let indices = triangulator.tessellate(&settings, &mut points, &mut domain_edges);

        let mut handles: Vec<Handle> = vec![Handle::new(); points.len()];
        for &(p, bone) in &assignments {
            if p < handle_count {
                handles[p].push((bone, 1.0));
            }
        }
        for handle in handles.iter_mut().filter(|h| h.len() > 1) {
            let share = 1.0 / handle.len() as f64;
            for entry in handle.iter_mut() {
                entry.1 = share;
            }
        }

        let bone_count = graph.bone_count();
        let fields = self.solve(&points, &indices, &handles, bone_count);

        let mut unweighted = 0usize;
        let result: Vec<BoneWeight> = vertices
            .iter()
            .enumerate()
            .map(|(v, position)| {
                let mut influences: SmallVec<[BoneWeightData; 8]> = fields
                    .iter()
                    .enumerate()
                    .map(|(bone, field)| BoneWeightData::new(bone, field[v] as f32))
                    .filter(|d| d.weight > 0.0)
                    .collect();
                influences.sort_by(BoneWeightData::cmp_weight_desc);
                influences.truncate(MAX_BONE_INFLUENCES);

                let sum: f32 = influences.iter().map(|d| d.weight).sum();
                if sum <= f32::EPSILON {
                    unweighted += 1;
                    return graph
                        .nearest_bone(*position)
                        .map(BoneWeight::single)
                        .unwrap_or_default();
                }
                for d in influences.iter_mut() {
                    d.weight /= sum;
                }
                BoneWeight::from_influences(&influences)
            })
            .collect();

        if unweighted > 0 {
            tracing::warn!(
                unweighted,
                "Vertices unreachable from any handle took the nearest bone"
            );
        }
        tracing::info!(
            vertices = vertices.len(),
            bones = bone_count,
            solve_points = points.len(),
            triangles = indices.len() / 3,
            "Calculated bone weights"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::triangulation::DelaunayTriangulator;

    fn bone(start: Vec2, end: Vec2) -> SpriteBoneData {
        SpriteBoneData {
            position: start,
            end_position: end,
            length: start.distance(end),
            ..SpriteBoneData::default()
        }
    }

    fn square() -> (Vec<Vec2>, Vec<Edge>) {
        let vertices = vec![
            Vec2::new(0.0, -5.0),
            Vec2::new(10.0, -5.0),
            Vec2::new(10.0, 5.0),
            Vec2::new(0.0, 5.0),
        ];
        let edges = (0..4).map(|i| Edge::new(i, (i + 1) % 4)).collect();
        (vertices, edges)
    }

    #[test]
    fn test_control_graph_merges_joints() {
        let bones = [
            bone(Vec2::ZERO, Vec2::new(10.0, 0.0)),
            bone(Vec2::ZERO, Vec2::new(0.0, 10.0)),
            bone(Vec2::new(3.0, 3.0), Vec2::new(3.0, 3.0)),
        ];
        let graph = ControlGraph::from_bones(&bones, 0.01);
        assert_eq!(graph.points.len(), 3);
        assert_eq!(graph.edges.len(), 2);
        assert_eq!(graph.pins.len(), 1);
        assert!(graph.points[1].distance(Vec2::new(9.9, 0.0)) < 1e-5);
        assert_eq!(graph.bones_at(0).as_slice(), &[0, 1]);
        assert_eq!(graph.bone_count(), 3);
        assert_eq!(graph.nearest_bone(Vec2::new(3.1, 3.0)), Some(2));
    }

    #[test]
    fn test_short_bone_becomes_pin() {
        let bones = [
            bone(Vec2::ZERO, Vec2::new(10.0, 0.0)),
            bone(Vec2::new(5.0, 5.0), Vec2::new(5.005, 5.0)),
        ];
        let graph = ControlGraph::from_bones(&bones, 0.01);
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.pins.len(), 1);
        assert_eq!(graph.pins[0].bone_index, 1);
        assert_eq!(graph.pins[0].position, Vec2::new(5.0, 5.0));

        let graph = ControlGraph::from_bones(&bones, 0.001);
        assert_eq!(graph.edges.len(), 2);
        assert!(graph.pins.is_empty());
    }

    #[test]
    fn test_sample_count_is_capped() {
        let generator = BoundedBiharmonicWeights::default();
        assert_eq!(generator.sample_count(12.0), 2);
        assert_eq!(generator.sample_count(1000.0), 10);
        assert_eq!(generator.sample_count(1.0), 0);
    }

    #[test]
    fn test_single_bone_gets_full_weight() {
        let (vertices, edges) = square();
        let graph = ControlGraph::from_bones(&[bone(Vec2::ZERO, Vec2::new(10.0, 0.0))], 0.01);
        let weights = BoundedBiharmonicWeights::default().calculate(
            &DelaunayTriangulator::new(),
            &vertices,
            &edges,
            &graph,
        );
        assert_eq!(weights.len(), 4);
        for w in &weights {
            assert_eq!(w.slots[0].bone_index, 0);
            assert!((w.slots[0].weight - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_two_bones_partition_unity() {
        let vertices = vec![
            Vec2::new(0.0, -2.0),
            Vec2::new(20.0, -2.0),
            Vec2::new(20.0, 2.0),
            Vec2::new(0.0, 2.0),
        ];
        let edges: Vec<Edge> = (0..4).map(|i| Edge::new(i, (i + 1) % 4)).collect();
        let bones = [
            bone(Vec2::new(1.0, 0.0), Vec2::new(10.0, 0.0)),
            bone(Vec2::new(10.0, 0.0), Vec2::new(19.0, 0.0)),
        ];
        let graph = ControlGraph::from_bones(&bones, 0.01);
        let weights = BoundedBiharmonicWeights::default().calculate(
            &DelaunayTriangulator::new(),
            &vertices,
            &edges,
            &graph,
        );
        for w in &weights {
            assert!((w.weight_sum() - 1.0).abs() < 1e-4);
            assert!(w.slots.iter().all(|s| s.weight >= 0.0));
        }
        assert!(weights[0].weight_of(0) > weights[0].weight_of(1));
        assert!(weights[1].weight_of(1) > weights[1].weight_of(0));
    }

    #[test]
    fn test_empty_graph_gives_zero_weights() {
        let (vertices, edges) = square();
        let weights = BoundedBiharmonicWeights::default().calculate(
            &DelaunayTriangulator::new(),
            &vertices,
            &edges,
            &ControlGraph::default(),
        );
        assert_eq!(weights, vec![BoneWeight::default(); 4]);
        assert!(BoundedBiharmonicWeights::default()
            .calculate(&DelaunayTriangulator::new(), &[], &[], &ControlGraph::default())
            .is_empty());
    }
}
