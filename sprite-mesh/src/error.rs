//! Error types for mesh and weight operations

use thiserror::Error;

/// Errors raised by precondition violations in the mesh core.
///
/// Degenerate geometry is never an error: it is handled by policy and
/// produces an empty or zero-weight result instead.
#[derive(Error, Debug)]
pub enum MeshError {
    #[error("Index {index} out of range (len {len})")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Invalid edge ({index1}, {index2})")]
    InvalidEdge { index1: usize, index2: usize },

    #[error("Bone {bone} is part of a parent cycle")]
    CyclicBoneHierarchy { bone: usize },

    #[error("Bone {bone} references invalid parent {parent}")]
    InvalidBoneParent { bone: usize, parent: usize },

    #[error("Operation requires exactly one selected vertex, found {selected}")]
    NoSingleSelectedVertex { selected: usize },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Failed to serialize mesh document: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, MeshError>;

/// Check `index < len`, the common precondition for channel/vertex/edge access.
#[inline]
pub(crate) fn check_index(index: usize, len: usize) -> Result<()> {
    if index < len {
        Ok(())
    } else {
        Err(MeshError::IndexOutOfRange { index, len })
    }
}
