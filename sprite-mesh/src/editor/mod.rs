//! Interaction policy for mesh and weight editing
//!
//! The controllers here hold no view state beyond the selection and hover
//! information a front end reports to them.

mod mesh_controller;
mod selection;
mod undo;
mod weight_editor;

pub use mesh_controller::{
    EditState, EdgeTarget, MeshEditAction, SpriteMeshController, blend_triangle_weight,
    lerp_edge_weight,
};
pub use selection::VertexSelection;
pub use undo::{NoUndo, SnapshotHistory, UndoRecorder};
pub use weight_editor::{WeightEditMode, WeightEditor};
