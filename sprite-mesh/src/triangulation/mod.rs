//! Constrained Delaunay triangulation and quality tessellation
//!
//! The mesh and the weight solver only talk to the [`Triangulator`] trait;
//! [`DelaunayTriangulator`] is the in-crate implementation.
//!
//! Output triangles are wound clockwise in mesh space (`(id0, id2, id1)` of
//! the counter-clockwise triangulation), matching the sprite mesh convention.

mod cdt;
mod predicates;
mod refine;
mod relax;

use glam::{DVec2, Vec2};

use crate::config::TessellationSettings;
use crate::geometry::Edge;

use cdt::{Cdt, SUPER_VERTEX_COUNT, SegmentKind};
use refine::Quality;

/// Default cap on Steiner points added by one `tessellate` call
pub const DEFAULT_MAX_STEINER_POINTS: usize = 65_536;

/// Triangulation backend used by the mesh and the weight solver.
pub trait Triangulator {
    /// Constrained triangulation of `vertices`.
    ///
    /// Never adds vertices: every returned index is in `0..vertices.len()`
    /// and every edge in `edges` is an edge of some returned triangle.
    /// Fewer than three vertices produce an empty list.
    fn triangulate(&self, vertices: &[Vec2], edges: &[Edge]) -> Vec<usize>;

    /// Refining triangulation.
    ///
    /// May insert vertices; `vertices` and `edges` are replaced in place with
    /// the refined lists. The original vertices keep their indices as a
    /// prefix of the new list.
    fn tessellate(
        &self,
        settings: &TessellationSettings,
        vertices: &mut Vec<Vec2>,
        edges: &mut Vec<Edge>,
    ) -> Vec<usize>;
}

/// Incremental constrained Delaunay triangulator with Ruppert refinement.
#[derive(Debug, Clone, Copy)]
pub struct DelaunayTriangulator {
    /// Steiner point budget per `tessellate` call
    pub max_steiner_points: usize,
}

impl Default for DelaunayTriangulator {
    fn default() -> Self {
        Self {
            max_steiner_points: DEFAULT_MAX_STEINER_POINTS,
        }
    }
}

impl DelaunayTriangulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_steiner_points(max_steiner_points: usize) -> Self {
        Self { max_steiner_points }
    }

    fn build(vertices: &[Vec2], edges: &[Edge]) -> Cdt {
        let points: Vec<DVec2> = vertices.iter().map(|v| v.as_dvec2()).collect();
        let segments: Vec<(usize, usize)> = edges
            .iter()
            .filter(|e| e.index1 != e.index2)
            .map(|e| (e.index1, e.index2))
            .collect();
        Cdt::build(&points, &segments, true)
    }
}

/// Flip counter-clockwise internal triangles to mesh winding and shift out
/// the super-triangle vertices.
fn emit_indices(cdt: &Cdt, vertex_count: usize) -> Vec<usize> {
    let mut indices = Vec::new();
    for [a, b, c] in cdt.triangles() {
        let tri = [a, c, b].map(|v| v.wrapping_sub(SUPER_VERTEX_COUNT));
        if tri.iter().all(|&v| v < vertex_count) {
            indices.extend_from_slice(&tri);
        }
    }
    indices
}

impl Triangulator for DelaunayTriangulator {
    fn triangulate(&self, vertices: &[Vec2], edges: &[Edge]) -> Vec<usize> {
        if vertices.len() < 3 {
            return Vec::new();
        }
        let cdt = Self::build(vertices, edges);
        let indices = emit_indices(&cdt, vertices.len());
        tracing::debug!(
            vertices = vertices.len(),
            edges = edges.len(),
            triangles = indices.len() / 3,
            "Triangulated"
        );
        indices
    }

    fn tessellate(
        &self,
        settings: &TessellationSettings,
        vertices: &mut Vec<Vec2>,
        edges: &mut Vec<Edge>,
    ) -> Vec<usize> {
        if vertices.len() < 3 {
            return Vec::new();
        }
        let input_count = vertices.len();
        let mut cdt = Self::build(vertices, edges);
        let mut budget = self.max_steiner_points;

        let angle_pass = Quality {
            min_angle: f64::from(settings.min_angle.max(0.0)),
            max_angle: f64::from(settings.max_angle.max(0.0)),
            max_area: 0.0,
        };
        if angle_pass.is_active() {
            let stats = cdt.refine(angle_pass, budget);
            budget = budget.saturating_sub(stats.inserted);
        }

        let (largest, total) = cdt.area_stats();
        let largest_factor = f64::from(settings.largest_triangle_area_factor.clamp(0.0, 1.0));
        let mesh_factor = f64::from(settings.mesh_area_factor.max(0.0));
        let max_area = (largest * largest_factor).max(total * mesh_factor);
        if max_area > 0.0 {
            let area_pass = Quality {
                max_area,
                ..Default::default()
            };
            cdt.refine(area_pass, budget);
        }

        cdt.relax(input_count, settings.smooth_iterations);

        *vertices = cdt.points[SUPER_VERTEX_COUNT..]
            .iter()
            .map(|p| p.as_vec2())
            .collect();
        *edges = cdt
            .segments()
            .filter(|(_, kind)| *kind == SegmentKind::Input)
            .map(|((a, b), _)| Edge::new(a - SUPER_VERTEX_COUNT, b - SUPER_VERTEX_COUNT))
            .collect();

        let indices = emit_indices(&cdt, vertices.len());
        tracing::debug!(
            input = input_count,
            vertices = vertices.len(),
            triangles = indices.len() / 3,
            max_area,
            "Tessellated"
        );
        indices
    }
}
