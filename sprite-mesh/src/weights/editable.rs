//! Sparse, editable per-vertex bone weights
//!
//! An `EditableBoneWeight` is a short ordered list of channels. Editing
//! operations may transiently break the sum-to-one invariant; the
//! normalize/compensate/unify family restores it.

use smallvec::SmallVec;

use super::bone_weight::{BoneWeight, BoneWeightChannel, BoneWeightData, MAX_BONE_INFLUENCES};
use crate::error::{Result, check_index};

/// Weight sums closer than this to 1 count as normalized
const NORMALIZED_EPSILON: f32 = 1e-6;

type Channels = SmallVec<[BoneWeightChannel; MAX_BONE_INFLUENCES]>;

/// Per-vertex list of bone influence channels.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EditableBoneWeight {
    channels: Channels,
}

impl EditableBoneWeight {
    pub fn new() -> Self {
        Self::default()
    }

    /// One enabled channel per slot with positive weight.
    pub fn from_bone_weight(bone_weight: &BoneWeight) -> Self {
        let mut result = Self::new();
        result.set_from_bone_weight(bone_weight);
        result
    }

    /// Replace all channels with the slots of `bone_weight`.
    ///
    /// Every slot becomes a channel; it is enabled iff its weight is positive.
    pub fn set_from_bone_weight(&mut self, bone_weight: &BoneWeight) {
        self.channels.clear();
        for slot in &bone_weight.slots {
            self.add_channel(*slot, slot.weight > 0.0);
        }
    }

    /// Convert to the fixed-width record.
    ///
    /// Only enabled channels are written; with `sort_by_weight` the heaviest
    /// channels take the first slots. Unused slots stay (0, 0).
    pub fn to_bone_weight(&self, sort_by_weight: bool) -> BoneWeight {
        let mut data: SmallVec<[BoneWeightData; 8]> = self
            .channels
            .iter()
            .filter(|c| c.enabled)
            .map(|c| c.data)
            .collect();
        if sort_by_weight {
            data.sort_by(BoneWeightData::cmp_weight_desc);
        }
        BoneWeight::from_influences(&data)
    }

    #[inline]
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn channels(&self) -> &[BoneWeightChannel] {
        &self.channels
    }

    /// Enabled channels in channel order
    pub fn enabled_channels(&self) -> impl Iterator<Item = &BoneWeightData> {
        self.channels.iter().filter(|c| c.enabled).map(|c| &c.data)
    }

    pub fn add_channel(&mut self, data: BoneWeightData, enabled: bool) {
        self.channels.push(BoneWeightChannel::new(data, enabled));
    }

    pub fn remove_channel(&mut self, index: usize) -> Result<BoneWeightChannel> {
        check_index(index, self.channels.len())?;
        Ok(self.channels.remove(index))
    }

    pub fn clear(&mut self) {
        self.channels.clear();
    }

    pub fn bone_weight_data(&self, index: usize) -> Result<BoneWeightData> {
        check_index(index, self.channels.len())?;
        Ok(self.channels[index].data)
    }

    pub fn set_bone_weight_data(&mut self, index: usize, data: BoneWeightData) -> Result<()> {
        check_index(index, self.channels.len())?;
        self.channels[index].data = data;
        Ok(())
    }

    pub fn weight(&self, index: usize) -> Result<f32> {
        Ok(self.bone_weight_data(index)?.weight)
    }

    pub fn set_weight(&mut self, index: usize, weight: f32) -> Result<()> {
        check_index(index, self.channels.len())?;
        self.channels[index].data.weight = weight;
        Ok(())
    }

    pub fn enable_channel(&mut self, index: usize, enabled: bool) -> Result<()> {
        check_index(index, self.channels.len())?;
        self.channels[index].enabled = enabled;
        Ok(())
    }

    pub fn is_channel_enabled(&self, index: usize) -> Result<bool> {
        check_index(index, self.channels.len())?;
        Ok(self.channels[index].enabled)
    }

    /// First enabled channel referencing `bone_index`.
    pub fn channel_from_bone_index(&self, bone_index: usize) -> Option<usize> {
        self.channels
            .iter()
            .position(|c| c.enabled && c.data.bone_index == bone_index)
    }

    /// Whether any enabled channel references `bone_index`
    pub fn contains_bone(&self, bone_index: usize) -> bool {
        self.channel_from_bone_index(bone_index).is_some()
    }

    /// Keep at most `max_channels`, optionally sorting so the heaviest enabled
    /// channels survive.
    pub fn clamp_channels(&mut self, max_channels: usize, sort_channels: bool) {
        if sort_channels {
            self.channels.sort_by(BoneWeightChannel::cmp_for_clamp);
        }
        self.channels.truncate(max_channels);
    }

    /// Zero disabled channels and clamp every weight to [0, 1].
    pub fn validate_channels(&mut self) {
        for channel in &mut self.channels {
            if !channel.enabled {
                channel.data.weight = 0.0;
            }
            channel.data.weight = channel.data.weight.clamp(0.0, 1.0);
        }
    }

    pub fn weight_sum(&self) -> f32 {
        self.enabled_channels().map(|d| d.weight).sum()
    }

    /// Scale enabled weights so they sum to 1 (a zero sum is left alone).
    pub fn normalize_channels(&mut self) {
        self.validate_channels();
        let sum = self.weight_sum();
        if sum > 0.0 && (sum - 1.0).abs() > NORMALIZED_EPSILON {
            for channel in self.channels.iter_mut().filter(|c| c.enabled) {
                channel.data.weight /= sum;
            }
        }
    }

    /// Redistribute `1 - weight[master]` across the other enabled channels,
    /// proportionally to their current weights (equally if they are all zero).
    pub fn compensate_other_channels(&mut self, master: usize) -> Result<()> {
        check_index(master, self.channels.len())?;
        self.compensate_around(master);
        Ok(())
    }

    fn compensate_around(&mut self, master: usize) {
        self.validate_channels();

        let (count, sum) = self
            .channels
            .iter()
            .enumerate()
            .filter(|(i, c)| *i != master && c.enabled)
            .fold((0usize, 0.0f32), |(n, s), (_, c)| (n + 1, s + c.data.weight));

        if count == 0 {
            return;
        }

        let target = 1.0 - self.channels[master].data.weight;
        for (i, channel) in self.channels.iter_mut().enumerate() {
            if i == master || !channel.enabled {
                continue;
            }
            channel.data.weight = if sum == 0.0 {
                target / count as f32
            } else {
                channel.data.weight * target / sum
            };
        }
    }

    /// Merge later enabled channels into the first enabled channel of the same bone.
    pub fn unify_channels_with_same_bone_index(&mut self) {
        for i in 0..self.channels.len() {
            if !self.channels[i].enabled {
                continue;
            }
            let bone = self.channels[i].data.bone_index;
            let mut merged = false;
            for j in (i + 1)..self.channels.len() {
                let other = self.channels[j];
                if other.enabled && other.data.bone_index == bone {
                    self.channels[i].data.weight += other.data.weight;
                    self.channels[j].enabled = false;
                    self.channels[j].data.weight = 0.0;
                    merged = true;
                }
            }
            if merged {
                self.compensate_around(i);
            }
        }
    }

    /// Disable and zero channels whose weight is at or below `tolerance`.
    pub fn filter_channels(&mut self, tolerance: f32) {
        for channel in &mut self.channels {
            if channel.data.weight <= tolerance {
                channel.enabled = false;
                channel.data.weight = 0.0;
            }
        }
    }

    /// Drop disabled channels entirely.
    pub fn remove_disabled_channels(&mut self) {
        self.channels.retain(|c| c.enabled);
    }

    /// Mutable access to every channel's data, used by bone renumbering.
    pub(crate) fn channels_mut(&mut self) -> impl Iterator<Item = &mut BoneWeightChannel> {
        self.channels.iter_mut()
    }

    /// Interpolate two weights: `a` scaled by `1 - t`, `b` by `t`.
    ///
    /// The result has no duplicate bones, at most four channels sorted by
    /// weight, and never sums above 1.
    pub fn lerp(a: &Self, b: &Self, t: f32) -> Self {
        let mut result = Self::new();
        let scaled = a
            .enabled_channels()
            .map(|d| (d, 1.0 - t))
            .chain(b.enabled_channels().map(|d| (d, t)));
        for (data, factor) in scaled {
            let weight = data.weight * factor;
            if weight > 0.0 {
                result.add_channel(BoneWeightData::new(data.bone_index, weight), true);
            }
        }

        result.unify_channels_with_same_bone_index();
        if result.weight_sum() > 1.0 {
            result.normalize_channels();
        }
        result.filter_channels(0.0);
        result.clamp_channels(MAX_BONE_INFLUENCES, true);
        result
    }
}

impl From<&BoneWeight> for EditableBoneWeight {
    fn from(bone_weight: &BoneWeight) -> Self {
        Self::from_bone_weight(bone_weight)
    }
}
