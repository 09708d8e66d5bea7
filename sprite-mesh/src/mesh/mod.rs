//! Sprite mesh data model
//!
//! `SpriteMeshData` owns vertices (position + editable weight), the
//! constraint edge set, the flat triangle list and the bone list. It is the
//! only place that renumbers vertex indices: removing vertex `k` decrements
//! every edge and triangle reference above `k`.

mod bones;
mod outline;
mod skinning;

pub use bones::{BoneDefinition, SpriteBoneData, resolve_bones};
pub use outline::{OutlineGenerator, TextureDataProvider};

use glam::{Vec2, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::TessellationSettings;
use crate::error::{MeshError, Result, check_index};
use crate::geometry::{Edge, Rect, WeightedTriangle, barycentric};
use crate::solver::ControlGraph;
use crate::triangulation::Triangulator;
use crate::weights::EditableBoneWeight;

/// Mesh vertex: position in sprite space plus its bone influences.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Vertex2D {
    pub position: Vec2,
    pub editable_bone_weight: EditableBoneWeight,
}

impl Vertex2D {
    pub fn new(position: Vec2) -> Self {
        Self {
            position,
            editable_bone_weight: EditableBoneWeight::new(),
        }
    }

    pub fn with_weight(position: Vec2, editable_bone_weight: EditableBoneWeight) -> Self {
        Self {
            position,
            editable_bone_weight,
        }
    }
}

/// Triangle hit by `SpriteMeshData::find_triangle`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TriangleHit {
    /// Index of the triangle (position in `indices` divided by 3)
    pub triangle: usize,
    pub vertices: [usize; 3],
    pub barycentric: Vec3,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SpriteMeshData {
    vertices: Vec<Vertex2D>,
    edges: Vec<Edge>,
    indices: Vec<usize>,
    bones: Vec<SpriteBoneData>,
    /// Sprite rectangle in texture space; vertex moves are clamped to it
    pub frame: Rect,
    pub pivot: Vec2,
}

impl SpriteMeshData {
    pub fn new(frame: Rect, pivot: Vec2) -> Self {
        Self {
            frame,
            pivot,
            ..Self::default()
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn vertices(&self) -> &[Vertex2D] {
        &self.vertices
    }

    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// Flat triangle list (three indices per triangle)
    pub fn indices(&self) -> &[usize] {
        &self.indices
    }

    pub fn positions(&self) -> Vec<Vec2> {
        self.vertices.iter().map(|v| v.position).collect()
    }

    pub fn position(&self, index: usize) -> Result<Vec2> {
        check_index(index, self.vertices.len())?;
        Ok(self.vertices[index].position)
    }

    pub fn set_position(&mut self, index: usize, position: Vec2) -> Result<()> {
        check_index(index, self.vertices.len())?;
        self.vertices[index].position = position;
        Ok(())
    }

    pub fn weight(&self, index: usize) -> Result<&EditableBoneWeight> {
        check_index(index, self.vertices.len())?;
        Ok(&self.vertices[index].editable_bone_weight)
    }

    pub fn weight_mut(&mut self, index: usize) -> Result<&mut EditableBoneWeight> {
        check_index(index, self.vertices.len())?;
        Ok(&mut self.vertices[index].editable_bone_weight)
    }

    /// Per-vertex weights in vertex order
    pub fn weights(&self) -> Vec<EditableBoneWeight> {
        self.vertices
            .iter()
            .map(|v| v.editable_bone_weight.clone())
            .collect()
    }

    /// Replace every vertex weight; `weights` must match the vertex count.
    pub fn set_weights(&mut self, weights: Vec<EditableBoneWeight>) -> Result<()> {
        if weights.len() != self.vertices.len() {
            return Err(MeshError::InvalidArgument(format!(
                "expected {} weights, got {}",
                self.vertices.len(),
                weights.len()
            )));
        }
        for (vertex, weight) in self.vertices.iter_mut().zip(weights) {
            vertex.editable_bone_weight = weight;
        }
        Ok(())
    }

    /// Replace all topology at once (used by document import).
    pub fn set_topology(
        &mut self,
        vertices: Vec<Vertex2D>,
        edges: Vec<Edge>,
        indices: Vec<usize>,
    ) -> Result<()> {
        let previous = (
            std::mem::replace(&mut self.vertices, vertices),
            std::mem::take(&mut self.edges),
            std::mem::replace(&mut self.indices, indices),
        );
        for edge in edges {
            if !self.edges.contains(&edge) {
                self.edges.push(edge);
            }
        }
        if let Err(err) = self.validate_topology() {
            (self.vertices, self.edges, self.indices) = previous;
            return Err(err);
        }
        Ok(())
    }

    // ========================================================================
    // Topology mutation
    // ========================================================================

    /// Append a vertex. With `edge_index`, that edge is split: it is replaced
    /// by edges from each of its endpoints to the new vertex.
    ///
    /// The new vertex has no weight; callers assign one from context.
    pub fn create_vertex(&mut self, position: Vec2, edge_index: Option<usize>) -> Result<usize> {
        if let Some(edge_index) = edge_index {
            check_index(edge_index, self.edges.len())?;
        }
        self.vertices.push(Vertex2D::new(position));
        let index = self.vertices.len() - 1;

        if let Some(edge_index) = edge_index {
            let edge = self.edges.remove(edge_index);
            self.edges.push(Edge::new(edge.index1, index));
            self.edges.push(Edge::new(edge.index2, index));
        }
        Ok(index)
    }

    /// Add the edge `index1`-`index2`. Returns `false` if it already existed.
    pub fn create_edge(&mut self, index1: usize, index2: usize) -> Result<bool> {
        let len = self.vertices.len();
        if index1 == index2 || index1 >= len || index2 >= len {
            return Err(MeshError::InvalidEdge { index1, index2 });
        }
        let edge = Edge::new(index1, index2);
        if self.edges.contains(&edge) {
            return Ok(false);
        }
        self.edges.push(edge);
        Ok(true)
    }

    /// Remove `edge` by value. Returns whether it was present.
    pub fn remove_edge(&mut self, edge: Edge) -> bool {
        match self.edge_index(edge) {
            Some(index) => {
                self.edges.remove(index);
                true
            }
            None => false,
        }
    }

    /// Remove a vertex and renumber every reference above it.
    ///
    /// A vertex with exactly two edges is bridged: its two neighbours are
    /// connected before its edges go away. Triangles using the vertex are
    /// dropped.
    pub fn remove_vertex(&mut self, index: usize) -> Result<()> {
        check_index(index, self.vertices.len())?;

        let incident: Vec<Edge> = self
            .edges
            .iter()
            .copied()
            .filter(|e| e.contains(index))
            .collect();
        if let [first, second] = incident.as_slice() {
            if let (Some(a), Some(b)) = (first.other(index), second.other(index)) {
                if a != b && !self.edges.contains(&Edge::new(a, b)) {
                    self.edges.push(Edge::new(a, b));
                }
            }
        }
        self.edges.retain(|e| !e.contains(index));

        let shift = |i: usize| if i > index { i - 1 } else { i };
        for edge in &mut self.edges {
            *edge = Edge::new(shift(edge.index1), shift(edge.index2));
        }

        let mut indices = Vec::with_capacity(self.indices.len());
        for tri in self.indices.chunks_exact(3) {
            if !tri.contains(&index) {
                indices.extend(tri.iter().map(|&i| shift(i)));
            }
        }
        self.indices = indices;

        self.vertices.remove(index);
        Ok(())
    }

    /// Remove several vertices, highest index first.
    pub fn remove_vertices(&mut self, indices: &[usize]) -> Result<()> {
        for &index in indices {
            check_index(index, self.vertices.len())?;
        }
        let mut sorted = indices.to_vec();
        sorted.sort_unstable_by(|a, b| b.cmp(a));
        sorted.dedup();
        for index in sorted {
            self.remove_vertex(index)?;
        }
        Ok(())
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn edge_index(&self, edge: Edge) -> Option<usize> {
        self.edges.iter().position(|e| *e == edge)
    }

    /// Index of the edge joining `index1` and `index2`
    pub fn find_edge(&self, index1: usize, index2: usize) -> Option<usize> {
        self.edge_index(Edge::new(index1, index2))
    }

    /// Number of edges touching `index`
    pub fn vertex_degree(&self, index: usize) -> usize {
        self.edges.iter().filter(|e| e.contains(index)).count()
    }

    /// First triangle containing `point`, with its barycentric coordinates.
    pub fn find_triangle(&self, point: Vec2) -> Option<TriangleHit> {
        self.indices
            .chunks_exact(3)
            .enumerate()
            .find_map(|(triangle, tri)| {
                let [a, b, c] = [tri[0], tri[1], tri[2]];
                let coords = barycentric(
                    point,
                    self.vertices[a].position,
                    self.vertices[b].position,
                    self.vertices[c].position,
                );
                (coords.x >= 0.0 && coords.y >= 0.0 && coords.z >= 0.0).then_some(TriangleHit {
                    triangle,
                    vertices: [a, b, c],
                    barycentric: coords,
                })
            })
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check the structural invariants: no self-loops, duplicate or dangling
    /// edges; triangle list length a multiple of three with live indices;
    /// weights referencing known bones.
    pub fn validate(&self) -> Result<()> {
        self.validate_topology()?;
        if !self.bones.is_empty() {
            for vertex in &self.vertices {
                for data in vertex.editable_bone_weight.enabled_channels() {
                    check_index(data.bone_index, self.bones.len())?;
                }
            }
        }
        Ok(())
    }

    fn validate_topology(&self) -> Result<()> {
        let len = self.vertices.len();
        for (i, edge) in self.edges.iter().enumerate() {
            if edge.index1 == edge.index2 || edge.index1 >= len || edge.index2 >= len {
                return Err(MeshError::InvalidEdge {
                    index1: edge.index1,
                    index2: edge.index2,
                });
            }
            if self.edges[..i].contains(edge) {
                return Err(MeshError::InvalidArgument(format!(
                    "duplicate edge ({}, {})",
                    edge.index1, edge.index2
                )));
            }
        }
        if self.indices.len() % 3 != 0 {
            return Err(MeshError::InvalidArgument(format!(
                "triangle list length {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        for &index in &self.indices {
            check_index(index, len)?;
        }
        Ok(())
    }

    // ========================================================================
    // Triangulation
    // ========================================================================

    /// Rebuild `indices` from the current positions and edges.
    pub fn triangulate(&mut self, triangulator: &dyn Triangulator) {
        self.indices = triangulator.triangulate(&self.positions(), &self.edges);
    }

    /// Area-refine the mesh, replacing vertices, edges and indices.
    ///
    /// Per-vertex weights are discarded.
    pub fn subdivide(&mut self, triangulator: &dyn Triangulator, largest_area_factor: f32) {
        let settings = TessellationSettings {
            min_angle: 0.0,
            max_angle: 0.0,
            mesh_area_factor: 0.0,
            largest_triangle_area_factor: largest_area_factor,
            smooth_iterations: 0,
            ..TessellationSettings::default()
        };
        self.tessellate(triangulator, &settings);
    }

    /// Quality-refine the mesh with the given bounds, replacing vertices,
    /// edges and indices. Per-vertex weights are discarded.
    pub fn tessellate(&mut self, triangulator: &dyn Triangulator, settings: &TessellationSettings) {
        let mut positions = self.positions();
        let mut edges = self.edges.clone();
        let indices = triangulator.tessellate(settings, &mut positions, &mut edges);

        let before = self.vertices.len();
        self.vertices = positions.into_iter().map(Vertex2D::new).collect();
        self.edges.clear();
        for edge in edges {
            if !self.edges.contains(&edge) {
                self.edges.push(edge);
            }
        }
        self.indices = indices;
        tracing::debug!(
            before,
            after = self.vertices.len(),
            triangles = self.indices.len() / 3,
            "Tessellated mesh"
        );
    }

    // ========================================================================
    // Bones
    // ========================================================================

    /// Control graph of the current bones.
    pub fn control_points(&self, tolerance: f32) -> ControlGraph {
        ControlGraph::from_bones(&self.bones, tolerance)
    }

    /// Reorder triangles by the mean bone depth of their vertices (stable,
    /// ascending).
    pub fn sort_triangles_by_depth(&mut self) {
        let depths: Vec<f32> = self
            .vertices
            .iter()
            .map(|vertex| {
                if self.bones.is_empty() {
                    return 0.0;
                }
                let (weighted, total) = vertex
                    .editable_bone_weight
                    .enabled_channels()
                    .filter_map(|d| self.bones.get(d.bone_index).map(|b| (b.depth, d.weight)))
                    .fold((0.0f32, 0.0f32), |(acc, sum), (depth, w)| {
                        (acc + depth * w, sum + w)
                    });
                if total > 0.0 { weighted / total } else { 0.0 }
            })
            .collect();

        let mut triangles: Vec<WeightedTriangle> = self
            .indices
            .chunks_exact(3)
            .map(|t| {
                let depth = (depths[t[0]] + depths[t[1]] + depths[t[2]]) / 3.0;
                WeightedTriangle::new(t[0], t[1], t[2], depth)
            })
            .collect();
        triangles.sort_by(WeightedTriangle::cmp_weight);

        self.indices = triangles
            .iter()
            .flat_map(|t| [t.p1, t.p2, t.p3])
            .collect();
    }
}
