//! Bone weights: fixed-width records, sparse editable channels and smoothing

mod bone_weight;
mod editable;
pub mod smoothing;

pub use bone_weight::{BoneWeight, BoneWeightChannel, BoneWeightData, MAX_BONE_INFLUENCES};
pub use editable::EditableBoneWeight;
pub use smoothing::SmoothingUtility;
