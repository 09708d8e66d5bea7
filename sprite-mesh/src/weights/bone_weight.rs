//! Bone influence records
//!
//! `BoneWeightData` is a single (bone, weight) pair, `BoneWeightChannel` adds
//! an enabled flag, and `BoneWeight` is the fixed-width four-slot record used
//! for interop and rendering.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Maximum number of bones influencing one vertex (shader-imposed cap)
pub const MAX_BONE_INFLUENCES: usize = 4;

/// One bone influence.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneWeightData {
    pub bone_index: usize,
    pub weight: f32,
}

impl BoneWeightData {
    pub fn new(bone_index: usize, weight: f32) -> Self {
        Self { bone_index, weight }
    }

    /// Canonical order: weight descending.
    pub fn cmp_weight_desc(&self, other: &Self) -> Ordering {
        other
            .weight
            .partial_cmp(&self.weight)
            .unwrap_or(Ordering::Equal)
    }
}

/// A bone influence slot inside an `EditableBoneWeight`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneWeightChannel {
    pub enabled: bool,
    pub data: BoneWeightData,
}

impl BoneWeightChannel {
    pub fn new(data: BoneWeightData, enabled: bool) -> Self {
        Self { enabled, data }
    }

    #[inline]
    pub fn bone_index(&self) -> usize {
        self.data.bone_index
    }

    #[inline]
    pub fn weight(&self) -> f32 {
        self.data.weight
    }

    /// Enabled channels first, then weight descending.
    pub fn cmp_for_clamp(&self, other: &Self) -> Ordering {
        other
            .enabled
            .cmp(&self.enabled)
            .then_with(|| self.data.cmp_weight_desc(&other.data))
    }
}

/// Fixed-width bone weight: exactly four (bone, weight) slots.
///
/// Unused slots hold bone 0 with weight 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BoneWeight {
    pub slots: [BoneWeightData; MAX_BONE_INFLUENCES],
}

impl BoneWeight {
    /// Single full influence of `bone_index`
    pub fn single(bone_index: usize) -> Self {
        let mut bw = Self::default();
        bw.slots[0] = BoneWeightData::new(bone_index, 1.0);
        bw
    }

    /// Build from up to four influences; extra entries are ignored.
    pub fn from_influences(influences: &[BoneWeightData]) -> Self {
        let mut bw = Self::default();
        for (slot, data) in bw.slots.iter_mut().zip(influences) {
            *slot = *data;
        }
        bw
    }

    pub fn weight_sum(&self) -> f32 {
        self.slots.iter().map(|s| s.weight).sum()
    }

    /// Weight of `bone_index` summed over all slots
    pub fn weight_of(&self, bone_index: usize) -> f32 {
        self.slots
            .iter()
            .filter(|s| s.bone_index == bone_index)
            .map(|s| s.weight)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_order_enabled_first_then_weight() {
        let mut channels = vec![
            BoneWeightChannel::new(BoneWeightData::new(0, 0.9), false),
            BoneWeightChannel::new(BoneWeightData::new(1, 0.2), true),
            BoneWeightChannel::new(BoneWeightData::new(2, 0.5), true),
        ];
        channels.sort_by(BoneWeightChannel::cmp_for_clamp);
        let order: Vec<usize> = channels.iter().map(|c| c.bone_index()).collect();
        assert_eq!(order, vec![2, 1, 0]);
    }

    #[test]
    fn test_bone_weight_from_influences() {
        let bw = BoneWeight::from_influences(&[
            BoneWeightData::new(3, 0.75),
            BoneWeightData::new(1, 0.25),
        ]);
        assert_eq!(bw.slots[2], BoneWeightData::default());
        assert_eq!(bw.weight_of(3), 0.75);
        assert!((bw.weight_sum() - 1.0).abs() < 1e-6);
    }
}
