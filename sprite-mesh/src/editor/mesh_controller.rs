//! Mesh edit policy
//!
//! `SpriteMeshController` turns editing intents from a view layer into
//! `SpriteMeshData` mutations. It owns the vertex selection and the hover
//! state reported by the view; every mutation records an undo snapshot
//! first and re-triangulates afterwards.

use glam::Vec2;

use super::selection::VertexSelection;
use super::undo::{NoUndo, UndoRecorder};
use crate::config::EditSettings;
use crate::error::{MeshError, Result, check_index};
use crate::geometry::{Edge, Rect, segment_intersection, segment_parameter};
use crate::mesh::{SpriteMeshData, TriangleHit};
use crate::triangulation::{DelaunayTriangulator, Triangulator};
use crate::weights::{BoneWeightData, EditableBoneWeight, MAX_BONE_INFLUENCES};

/// Interaction being carried out by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EditState {
    /// Nothing in progress
    #[default]
    Idle,
    /// Adding a vertex at a free point, inside a triangle or on an edge
    CreatingVertex,
    /// Adding an edge from the selected vertex
    CreatingEdge,
    /// Adding a vertex on the hovered edge
    SplittingEdge,
    /// Dragging the selected vertices
    MovingVertex,
    /// Dragging both endpoints of an edge
    MovingEdge,
    /// Changing the vertex selection
    SelectingVertex,
    /// Selecting the endpoints of an edge
    SelectingEdge,
    /// Deleting the selected vertices or edge
    RemovingSelection,
}

/// Editing intent reported by the view layer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MeshEditAction {
    /// Create a vertex at a point
    CreateVertex(Vec2),
    /// Create an edge from the selected vertex toward a point (or the
    /// hovered vertex)
    CreateEdge(Vec2),
    /// Split the hovered edge at the projection of a point
    SplitEdge(Vec2),
    /// Move the selection by a delta
    MoveSelection(Vec2),
    /// Move an edge's endpoints by a delta
    MoveEdge { edge: usize, delta: Vec2 },
    /// Select a vertex, optionally adding to the selection
    SelectVertex { vertex: usize, additive: bool },
    /// Select an edge's endpoints, optionally adding to the selection
    SelectEdge { edge: usize, additive: bool },
    /// Drop the selection
    ClearSelection,
    /// Remove the selection
    RemoveSelection,
}

/// Where a new edge ends after resolving crossings with existing edges.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EdgeTarget {
    /// An existing vertex
    SnappedToVertex(usize),
    /// A new vertex splitting the edge at `index`
    SplitsEdge(usize, Vec2),
    /// A new vertex at a point crossing nothing
    FreePoint(Vec2),
}

impl EdgeTarget {
    fn position(&self, mesh: &SpriteMeshData) -> Result<Vec2> {
        match *self {
            EdgeTarget::SnappedToVertex(index) => mesh.position(index),
            EdgeTarget::SplitsEdge(_, point) | EdgeTarget::FreePoint(point) => Ok(point),
        }
    }

    fn vertex(&self) -> Option<usize> {
        match *self {
            EdgeTarget::SnappedToVertex(index) => Some(index),
            _ => None,
        }
    }
}

/// Weight of a point inside a triangle: the vertex weights scaled by the
/// barycentric coordinates, merged per bone and clamped to four channels.
pub fn blend_triangle_weight(mesh: &SpriteMeshData, hit: &TriangleHit) -> Result<EditableBoneWeight> {
    let mut result = EditableBoneWeight::new();
    for (&vertex, coordinate) in hit.vertices.iter().zip(hit.barycentric.to_array()) {
        for data in mesh.weight(vertex)?.enabled_channels() {
            result.add_channel(
                BoneWeightData::new(data.bone_index, data.weight * coordinate),
                true,
            );
        }
    }
    result.unify_channels_with_same_bone_index();
    result.filter_channels(0.0);
    result.clamp_channels(MAX_BONE_INFLUENCES, true);
    Ok(result)
}

/// Weight of a point on an edge: `lerp` of the endpoint weights at the
/// clamped projection parameter.
pub fn lerp_edge_weight(mesh: &SpriteMeshData, edge: Edge, point: Vec2) -> Result<EditableBoneWeight> {
    let a = mesh.position(edge.index1)?;
    let b = mesh.position(edge.index2)?;
    let t = segment_parameter(point, a, b).clamp(0.0, 1.0);
    Ok(EditableBoneWeight::lerp(
        mesh.weight(edge.index1)?,
        mesh.weight(edge.index2)?,
        t,
    ))
}

pub struct SpriteMeshController<T: Triangulator = DelaunayTriangulator, U: UndoRecorder = NoUndo> {
    triangulator: T,
    undo: U,
    pub settings: EditSettings,
    selection: VertexSelection,
    hovered_vertex: Option<usize>,
    hovered_edge: Option<usize>,
    state: EditState,
}

impl Default for SpriteMeshController {
    fn default() -> Self {
        Self::new(DelaunayTriangulator::default(), NoUndo, EditSettings::default())
    }
}

impl<T: Triangulator, U: UndoRecorder> SpriteMeshController<T, U> {
    pub fn new(triangulator: T, undo: U, settings: EditSettings) -> Self {
        Self {
            triangulator,
            undo,
            settings,
            selection: VertexSelection::new(),
            hovered_vertex: None,
            hovered_edge: None,
            state: EditState::Idle,
        }
    }

    pub fn selection(&self) -> &VertexSelection {
        &self.selection
    }

    pub fn set_selection(&mut self, selection: VertexSelection) {
        self.selection = selection;
    }

    pub fn undo_recorder(&self) -> &U {
        &self.undo
    }

    pub fn undo_recorder_mut(&mut self) -> &mut U {
        &mut self.undo
    }

    pub fn state(&self) -> EditState {
        self.state
    }

    /// Hover state reported by the view (vertex and edge under the cursor).
    pub fn set_hover(&mut self, vertex: Option<usize>, edge: Option<usize>) {
        self.hovered_vertex = vertex;
        self.hovered_edge = edge;
    }

    /// Dispatch an intent. Returns the vertex created, if any.
    pub fn handle(&mut self, mesh: &mut SpriteMeshData, action: MeshEditAction) -> Result<Option<usize>> {
        let result = match action {
            MeshEditAction::CreateVertex(position) => self.create_vertex(mesh, position).map(Some),
            MeshEditAction::CreateEdge(position) => self.create_edge(mesh, position).map(Some),
            MeshEditAction::SplitEdge(position) => self.split_edge(mesh, position).map(Some),
            MeshEditAction::MoveSelection(delta) => self.move_selection(mesh, delta).map(|_| None),
            MeshEditAction::MoveEdge { edge, delta } => {
                self.move_edge(mesh, edge, delta).map(|_| None)
            }
            MeshEditAction::SelectVertex { vertex, additive } => {
                self.select_vertex(mesh, vertex, additive).map(|_| None)
            }
            MeshEditAction::SelectEdge { edge, additive } => {
                self.select_edge(mesh, edge, additive).map(|_| None)
            }
            MeshEditAction::ClearSelection => {
                self.selection.clear();
                Ok(None)
            }
            MeshEditAction::RemoveSelection => self.remove_selection(mesh).map(|_| None),
        };
        self.state = EditState::Idle;
        result
    }

    fn begin(&mut self, state: EditState, mesh: &SpriteMeshData, action: &str) {
        self.state = state;
        self.undo.record(action, mesh);
    }

    fn finish(&mut self, mesh: &mut SpriteMeshData) {
        mesh.triangulate(&self.triangulator);
        self.undo.increment_group();
        self.state = EditState::Idle;
    }

    // ========================================================================
    // Selection
    // ========================================================================

    pub fn select_vertex(&mut self, mesh: &SpriteMeshData, vertex: usize, additive: bool) -> Result<()> {
        check_index(vertex, mesh.vertex_count())?;
        self.state = EditState::SelectingVertex;
        if !additive {
            self.selection.clear();
        }
        self.selection.select(vertex, true);
        self.state = EditState::Idle;
        Ok(())
    }

    pub fn select_edge(&mut self, mesh: &SpriteMeshData, edge: usize, additive: bool) -> Result<()> {
        check_index(edge, mesh.edges().len())?;
        self.state = EditState::SelectingEdge;
        let edge = mesh.edges()[edge];
        if !additive {
            self.selection.clear();
        }
        self.selection.select(edge.index1, true);
        self.selection.select(edge.index2, true);
        self.state = EditState::Idle;
        Ok(())
    }

    // ========================================================================
    // Vertex creation
    // ========================================================================

    /// Weight for a new vertex at `position`: triangle blend, else the
    /// hovered edge's lerp, else empty.
    fn weight_at(&self, mesh: &SpriteMeshData, position: Vec2) -> Result<EditableBoneWeight> {
        if let Some(hit) = mesh.find_triangle(position) {
            return blend_triangle_weight(mesh, &hit);
        }
        if let Some(edge) = self.hovered_edge.and_then(|e| mesh.edges().get(e).copied()) {
            return lerp_edge_weight(mesh, edge, position);
        }
        Ok(EditableBoneWeight::new())
    }

    /// Create a vertex at `position`, splitting the hovered edge if any.
    /// The new vertex becomes the selection.
    pub fn create_vertex(&mut self, mesh: &mut SpriteMeshData, position: Vec2) -> Result<usize> {
        let hovered_edge = match self.hovered_edge {
            Some(edge) => {
                check_index(edge, mesh.edges().len())?;
                Some(edge)
            }
            None => None,
        };
        let weight = self.weight_at(mesh, position)?;

        self.begin(EditState::CreatingVertex, mesh, "Create Vertex");
        let vertex = mesh.create_vertex(position, hovered_edge)?;
        *mesh.weight_mut(vertex)? = weight;
        self.selection.clear();
        self.selection.select(vertex, true);
        self.hovered_edge = None;
        self.finish(mesh);
        Ok(vertex)
    }

    /// Insert a vertex on the hovered edge at the projection of `position`.
    pub fn split_edge(&mut self, mesh: &mut SpriteMeshData, position: Vec2) -> Result<usize> {
        let edge_index = self
            .hovered_edge
            .ok_or_else(|| MeshError::InvalidArgument("no hovered edge to split".into()))?;
        check_index(edge_index, mesh.edges().len())?;
        let edge = mesh.edges()[edge_index];
        let a = mesh.position(edge.index1)?;
        let b = mesh.position(edge.index2)?;
        let point = a.lerp(b, segment_parameter(position, a, b).clamp(0.0, 1.0));
        let weight = lerp_edge_weight(mesh, edge, point)?;

        self.begin(EditState::SplittingEdge, mesh, "Split Edge");
        let vertex = mesh.create_vertex(point, Some(edge_index))?;
        *mesh.weight_mut(vertex)? = weight;
        self.selection.clear();
        self.selection.select(vertex, true);
        self.hovered_edge = None;
        self.finish(mesh);
        Ok(vertex)
    }

    // ========================================================================
    // Edge creation
    // ========================================================================

    /// First stop of an edge from `source` toward `goal`.
    ///
    /// The closest crossing with an existing edge that touches neither end
    /// becomes the stop: the crossed edge's nearer endpoint if it lies within
    /// the snap distance, otherwise a split point. Without a crossing the stop
    /// is `goal` itself.
    pub fn next_edge_target(
        &self,
        mesh: &SpriteMeshData,
        source: usize,
        goal: EdgeTarget,
    ) -> Result<EdgeTarget> {
        let origin = mesh.position(source)?;
        let end = goal.position(mesh)?;
        let end_vertex = goal.vertex();

        let crossing = mesh
            .edges()
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.contains(source) && end_vertex.is_none_or(|v| !e.contains(v)))
            .filter_map(|(i, e)| {
                let a = mesh.vertices()[e.index1].position;
                let b = mesh.vertices()[e.index2].position;
                segment_intersection(origin, end, a, b).map(|p| (i, *e, p))
            })
            .min_by(|x, y| {
                x.2.distance_squared(origin)
                    .total_cmp(&y.2.distance_squared(origin))
            });

        let Some((index, edge, point)) = crossing else {
            return Ok(goal);
        };
        let snap = [edge.index1, edge.index2]
            .into_iter()
            .map(|v| (v, mesh.vertices()[v].position.distance(point)))
            .filter(|&(_, d)| d <= self.settings.snap_distance)
            .min_by(|x, y| x.1.total_cmp(&y.1));
        Ok(match snap {
            Some((vertex, _)) => EdgeTarget::SnappedToVertex(vertex),
            None => EdgeTarget::SplitsEdge(index, point),
        })
    }

    /// Vertex for a resolved stop, created (with an interpolated weight)
    /// unless the stop is an existing vertex.
    fn realize_target(&self, mesh: &mut SpriteMeshData, target: EdgeTarget) -> Result<usize> {
        match target {
            EdgeTarget::SnappedToVertex(vertex) => Ok(vertex),
            EdgeTarget::SplitsEdge(edge, point) => {
                let weight = lerp_edge_weight(mesh, mesh.edges()[edge], point)?;
                let vertex = mesh.create_vertex(point, Some(edge))?;
                *mesh.weight_mut(vertex)? = weight;
                Ok(vertex)
            }
            EdgeTarget::FreePoint(point) => {
                let weight = self.weight_at(mesh, point)?;
                let vertex = mesh.create_vertex(point, None)?;
                *mesh.weight_mut(vertex)? = weight;
                Ok(vertex)
            }
        }
    }

    /// Create an edge from the single selected vertex toward `position` (or
    /// the hovered vertex).
    ///
    /// Every existing edge on the way is either snapped to or split, and the
    /// new edge continues from there as a chain. The walk stops at the goal,
    /// when a stop makes no progress or revisits a vertex, and after at most
    /// one step per existing edge. Returns the last vertex of the chain,
    /// which becomes the selection so edges can be chained.
    pub fn create_edge(&mut self, mesh: &mut SpriteMeshData, position: Vec2) -> Result<usize> {
        let source = self
            .selection
            .single()
            .ok_or(MeshError::NoSingleSelectedVertex {
                selected: self.selection.count(),
            })?;
        check_index(source, mesh.vertex_count())?;

        let goal = match self.hovered_vertex {
            Some(vertex) if vertex < mesh.vertex_count() => EdgeTarget::SnappedToVertex(vertex),
            _ => EdgeTarget::FreePoint(position),
        };
        let max_steps = mesh.edges().len() + 1;

        self.begin(EditState::CreatingEdge, mesh, "Create Edge");
        let mut current = source;
        let mut visited = vec![source];
        for _ in 0..max_steps {
            let stop = self.next_edge_target(mesh, current, goal)?;
            let end = self.realize_target(mesh, stop)?;
            if end == current {
                break;
            }
            mesh.create_edge(current, end)?;
            current = end;
            if stop == goal || visited.contains(&end) {
                break;
            }
            visited.push(end);
        }
        tracing::debug!(source, end = current, stops = visited.len(), "Created edge chain");
        self.selection.clear();
        self.selection.select(current, true);
        self.finish(mesh);
        Ok(current)
    }

    // ========================================================================
    // Moving
    // ========================================================================

    fn move_vertices(&mut self, mesh: &mut SpriteMeshData, vertices: &[usize], delta: Vec2) -> Result<Vec2> {
        for &v in vertices {
            check_index(v, mesh.vertex_count())?;
        }
        let positions: Vec<Vec2> = vertices.iter().map(|&v| mesh.vertices()[v].position).collect();
        let Some(bounds) = Rect::bounding(positions.iter().copied()) else {
            return Ok(Vec2::ZERO);
        };
        let delta = mesh.frame.clamp_delta(&bounds, delta);
        for (&v, position) in vertices.iter().zip(positions) {
            mesh.set_position(v, position + delta)?;
        }
        Ok(delta)
    }

    /// Move the selected vertices, keeping their bounding box inside the
    /// frame. Returns the delta actually applied.
    pub fn move_selection(&mut self, mesh: &mut SpriteMeshData, delta: Vec2) -> Result<Vec2> {
        let vertices = self.selection.to_vec();
        for &v in &vertices {
            check_index(v, mesh.vertex_count())?;
        }
        self.begin(EditState::MovingVertex, mesh, "Move Vertices");
        let applied = self.move_vertices(mesh, &vertices, delta)?;
        self.finish(mesh);
        Ok(applied)
    }

    /// Move both endpoints of `edge` with the same frame clamping.
    pub fn move_edge(&mut self, mesh: &mut SpriteMeshData, edge: usize, delta: Vec2) -> Result<Vec2> {
        check_index(edge, mesh.edges().len())?;
        let edge = mesh.edges()[edge];
        self.begin(EditState::MovingEdge, mesh, "Move Edge");
        let applied = self.move_vertices(mesh, &[edge.index1, edge.index2], delta)?;
        self.finish(mesh);
        Ok(applied)
    }

    // ========================================================================
    // Removal
    // ========================================================================

    /// Remove the selection: the edge between the two selected vertices if
    /// there is one, otherwise every selected vertex.
    pub fn remove_selection(&mut self, mesh: &mut SpriteMeshData) -> Result<()> {
        let selected = self.selection.to_vec();
        if selected.is_empty() {
            return Ok(());
        }
        for &v in &selected {
            check_index(v, mesh.vertex_count())?;
        }

        self.begin(EditState::RemovingSelection, mesh, "Remove Selection");
        let edge = match selected.as_slice() {
            [a, b] => mesh.find_edge(*a, *b).map(|_| Edge::new(*a, *b)),
            _ => None,
        };
        match edge {
            Some(edge) => {
                mesh.remove_edge(edge);
                tracing::debug!(?edge, "Removed edge");
            }
            None => {
                mesh.remove_vertices(&selected)?;
                tracing::debug!(count = selected.len(), "Removed vertices");
            }
        }
        self.selection.clear();
        self.finish(mesh);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editor::SnapshotHistory;

    fn square_mesh() -> SpriteMeshData {
        let mut mesh = SpriteMeshData::new(Rect::new(0.0, 0.0, 100.0, 100.0), Vec2::ZERO);
        for p in [(10.0, 10.0), (90.0, 10.0), (90.0, 90.0), (10.0, 90.0)] {
            mesh.create_vertex(Vec2::new(p.0, p.1), None).unwrap();
        }
        for i in 0..4 {
            mesh.create_edge(i, (i + 1) % 4).unwrap();
        }
        let weights = [0, 0, 1, 1];
        for (v, bone) in weights.into_iter().enumerate() {
            mesh.weight_mut(v)
                .unwrap()
                .add_channel(BoneWeightData::new(bone, 1.0), true);
        }
        mesh.triangulate(&DelaunayTriangulator::new());
        mesh
    }

    fn weight_of(weight: &EditableBoneWeight, bone: usize) -> f32 {
        weight
            .enabled_channels()
            .filter(|d| d.bone_index == bone)
            .map(|d| d.weight)
            .sum()
    }

    #[test]
    fn test_create_vertex_inside_triangle_blends_weights() {
        let mut mesh = square_mesh();
        let mut controller = SpriteMeshController::default();
        let v = controller
            .create_vertex(&mut mesh, Vec2::new(50.0, 30.0))
            .unwrap();
        let weight = mesh.weight(v).unwrap();
        assert!((weight.weight_sum() - 1.0).abs() < 1e-4);
        assert!(weight_of(weight, 0) > weight_of(weight, 1));
        assert_eq!(controller.selection().single(), Some(v));
        assert!(mesh.indices().contains(&v));
    }

    #[test]
    fn test_split_edge_lerps_endpoints() {
        let mut mesh = square_mesh();
        let mut controller = SpriteMeshController::default();
        let edge = mesh.find_edge(1, 2).unwrap();
        controller.set_hover(None, Some(edge));
        let v = controller
            .split_edge(&mut mesh, Vec2::new(95.0, 30.0))
            .unwrap();
        assert_eq!(mesh.position(v).unwrap(), Vec2::new(90.0, 30.0));
        let weight = mesh.weight(v).unwrap();
        assert!((weight_of(weight, 0) - 0.75).abs() < 1e-4);
        assert!((weight_of(weight, 1) - 0.25).abs() < 1e-4);
        assert!(mesh.find_edge(1, 2).is_none());
        assert!(mesh.find_edge(1, v).is_some());
        assert!(mesh.find_edge(v, 2).is_some());
    }

    #[test]
    fn test_create_edge_requires_single_selection() {
        let mut mesh = square_mesh();
        let mut controller = SpriteMeshController::default();
        assert!(matches!(
            controller.create_edge(&mut mesh, Vec2::new(50.0, 50.0)),
            Err(MeshError::NoSingleSelectedVertex { selected: 0 })
        ));
    }

    #[test]
    fn test_create_edge_splits_crossed_edge() {
        let mut mesh = square_mesh();
        let mut controller = SpriteMeshController::default();
        controller.select_vertex(&mesh, 0, false).unwrap();
        // From (10,10) to outside on the right, crossing edge 1-2 at (90, 50)
        let end = controller
            .create_edge(&mut mesh, Vec2::new(95.0, 52.5))
            .unwrap();
        assert_eq!(end, 5);
        let split = mesh.position(4).unwrap();
        assert!((split.x - 90.0).abs() < 1e-3);
        assert!((split.y - 50.0).abs() < 1e-3);
        assert_eq!(mesh.position(5).unwrap(), Vec2::new(95.0, 52.5));
        assert!(mesh.find_edge(0, 4).is_some());
        assert!(mesh.find_edge(1, 4).is_some());
        assert!(mesh.find_edge(4, 2).is_some());
        assert!(mesh.find_edge(4, 5).is_some());
        assert!(mesh.find_edge(1, 2).is_none());
        assert_eq!(controller.selection().single(), Some(5));
        // The split vertex takes the interpolated weight of edge 1-2
        assert!((weight_of(mesh.weight(4).unwrap(), 1) - 0.5).abs() < 1e-3);
    }

    #[test]
    fn test_create_edge_snaps_to_near_vertex() {
        let mut mesh = square_mesh();
        let mut controller = SpriteMeshController::default();
        controller.select_vertex(&mesh, 0, false).unwrap();
        // Crosses edge 1-2 about two units below vertex 2, then continues
        let end = controller
            .create_edge(&mut mesh, Vec2::new(95.0, 93.0))
            .unwrap();
        assert_eq!(end, 4);
        assert_eq!(mesh.vertex_count(), 5);
        assert!(mesh.find_edge(0, 2).is_some());
        assert!(mesh.find_edge(2, 4).is_some());
        assert!(mesh.find_edge(1, 2).is_some());
    }

    #[test]
    fn test_create_edge_to_hovered_vertex() {
        let mut mesh = square_mesh();
        let mut controller = SpriteMeshController::default();
        controller.select_vertex(&mesh, 0, false).unwrap();
        controller.set_hover(Some(2), None);
        let end = controller
            .create_edge(&mut mesh, Vec2::new(0.0, 0.0))
            .unwrap();
        assert_eq!(end, 2);
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.edges().len(), 5);
        assert!(mesh.find_edge(0, 2).is_some());
        assert!(mesh.indices().len() >= 6);
    }

    #[test]
    fn test_create_edge_to_free_point() {
        let mut mesh = square_mesh();
        let mut controller = SpriteMeshController::default();
        controller.select_vertex(&mesh, 0, false).unwrap();
        let end = controller
            .create_edge(&mut mesh, Vec2::new(40.0, 40.0))
            .unwrap();
        assert_eq!(end, 4);
        assert_eq!(mesh.position(4).unwrap(), Vec2::new(40.0, 40.0));
        assert!(mesh.find_edge(0, 4).is_some());
    }

    #[test]
    fn test_move_selection_is_clamped_to_frame() {
        let mut mesh = square_mesh();
        let mut controller = SpriteMeshController::default();
        controller.select_vertex(&mesh, 1, false).unwrap();
        controller.select_vertex(&mesh, 2, true).unwrap();
        let applied = controller
            .move_selection(&mut mesh, Vec2::new(50.0, 0.0))
            .unwrap();
        assert_eq!(applied, Vec2::new(10.0, 0.0));
        assert_eq!(mesh.position(1).unwrap(), Vec2::new(100.0, 10.0));
    }

    #[test]
    fn test_remove_prefers_edge_when_selection_matches() {
        let mut mesh = square_mesh();
        let mut controller = SpriteMeshController::new(
            DelaunayTriangulator::new(),
            SnapshotHistory::new(8),
            EditSettings::default(),
        );
        let edge = mesh.find_edge(0, 1).unwrap();
        controller.select_edge(&mesh, edge, false).unwrap();
        controller.remove_selection(&mut mesh).unwrap();
        assert_eq!(mesh.vertex_count(), 4);
        assert_eq!(mesh.edges().len(), 3);
        assert_eq!(controller.undo_recorder().last_action(), Some("Remove Selection"));

        // Two vertices without an edge between them are removed as vertices
        controller.select_vertex(&mesh, 0, false).unwrap();
        controller.select_vertex(&mesh, 2, true).unwrap();
        controller.remove_selection(&mut mesh).unwrap();
        assert_eq!(mesh.vertex_count(), 2);
        mesh.validate().unwrap();
    }

    #[test]
    fn test_handle_dispatches_and_returns_to_idle() {
        let mut mesh = square_mesh();
        let mut controller = SpriteMeshController::default();
        let created = controller
            .handle(&mut mesh, MeshEditAction::CreateVertex(Vec2::new(30.0, 60.0)))
            .unwrap();
        assert_eq!(created, Some(4));
        assert_eq!(controller.state(), EditState::Idle);
        controller
            .handle(&mut mesh, MeshEditAction::ClearSelection)
            .unwrap();
        assert!(controller.selection().is_empty());
    }
}
