//! Geometric core for 2D sprite skinning
//!
//! A sprite mesh is a set of vertices inside the sprite rectangle, a set of
//! constraint edges (usually the outline) and a triangle list computed from
//! them. Each vertex carries up to four bone influences.
//!
//! - [`triangulation`]: constrained Delaunay triangulation and quality
//!   tessellation behind the [`Triangulator`] trait
//! - [`solver`]: automatic weights by bounded biharmonic diffusion
//! - [`weights`]: sparse editable weights and Laplacian smoothing
//! - [`mesh`]: the [`SpriteMeshData`] model and its topology operations
//! - [`editor`]: interaction policy for mesh and weight editing
//! - [`formats`]: the exchanged JSON document and packed vertex layout

pub mod config;
pub mod editor;
pub mod error;
pub mod formats;
pub mod geometry;
pub mod mesh;
pub mod solver;
pub mod triangulation;
pub mod weights;

pub use config::{EditSettings, Settings, TessellationSettings, WeightGenerationSettings};
pub use error::{MeshError, Result};
pub use geometry::{Edge, Rect};
pub use mesh::{BoneDefinition, SpriteBoneData, SpriteMeshData, Vertex2D};
pub use solver::{BoundedBiharmonicWeights, ControlGraph, WeightsGenerator};
pub use triangulation::{DelaunayTriangulator, Triangulator};
pub use weights::{BoneWeight, EditableBoneWeight, SmoothingUtility};
