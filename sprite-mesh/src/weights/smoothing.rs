//! Laplacian smoothing of per-vertex weight fields
//!
//! Weights are expanded to a dense `vertex x bone` table, averaged with
//! their one-ring neighbours for each iteration, then packed back into at
//! most four normalized channels per vertex.

use smallvec::SmallVec;

use super::bone_weight::{BoneWeightData, MAX_BONE_INFLUENCES};
use super::editable::EditableBoneWeight;

/// One-ring adjacency built from a triangle list.
#[derive(Debug, Clone)]
pub struct SmoothingUtility {
    neighbors: Vec<SmallVec<[usize; 8]>>,
}

impl SmoothingUtility {
    /// Build adjacency for `vertex_count` vertices from a flat triangle list.
    ///
    /// Triangle indices outside `0..vertex_count` are ignored.
    pub fn new(vertex_count: usize, indices: &[usize]) -> Self {
        let mut neighbors: Vec<SmallVec<[usize; 8]>> = vec![SmallVec::new(); vertex_count];
        for tri in indices.chunks_exact(3) {
            if tri.iter().any(|&i| i >= vertex_count) {
                continue;
            }
            for k in 0..3 {
                let a = tri[k];
                let b = tri[(k + 1) % 3];
                if !neighbors[a].contains(&b) {
                    neighbors[a].push(b);
                }
                if !neighbors[b].contains(&a) {
                    neighbors[b].push(a);
                }
            }
        }
        Self { neighbors }
    }

    pub fn vertex_count(&self) -> usize {
        self.neighbors.len()
    }

    /// Smooth `weights` `iterations` times.
    pub fn smooth(
        &self,
        weights: &[EditableBoneWeight],
        bone_count: usize,
        iterations: u32,
    ) -> Vec<EditableBoneWeight> {
        let mut sequence = self.smooth_sequence(weights, bone_count, iterations);
        sequence.pop().unwrap_or_default()
    }

    /// Every intermediate field: element `i` is the input smoothed `i` times,
    /// so the result has `iterations + 1` entries.
    pub fn smooth_sequence(
        &self,
        weights: &[EditableBoneWeight],
        bone_count: usize,
        iterations: u32,
    ) -> Vec<Vec<EditableBoneWeight>> {
        let vertex_count = weights.len().min(self.vertex_count());
        let bone_count = weights
            .iter()
            .flat_map(|w| w.enabled_channels().map(|d| d.bone_index + 1))
            .max()
            .unwrap_or(0)
            .max(bone_count);

        let mut sequence = Vec::with_capacity(iterations as usize + 1);
        sequence.push(weights.to_vec());
        if vertex_count == 0 || bone_count == 0 {
            for _ in 0..iterations {
                sequence.push(weights.to_vec());
            }
            return sequence;
        }

        let mut table = to_dense(&weights[..vertex_count], bone_count);
        let mut scratch = vec![0.0f32; table.len()];
        for _ in 0..iterations {
            self.smooth_step(&table, &mut scratch, bone_count);
            std::mem::swap(&mut table, &mut scratch);

            let mut field = weights.to_vec();
            for (v, weight) in field.iter_mut().enumerate().take(vertex_count) {
                if !self.neighbors[v].is_empty() {
                    *weight = from_dense_row(&table[v * bone_count..(v + 1) * bone_count]);
                }
            }
            sequence.push(field);
        }
        sequence
    }

    fn smooth_step(&self, src: &[f32], dst: &mut [f32], bone_count: usize) {
        for (v, ring) in self.neighbors.iter().enumerate() {
            let row = v * bone_count;
            if row >= src.len() {
                break;
            }
            let norm = 1.0 / (ring.len() + 1) as f32;
            for bone in 0..bone_count {
                let mut sum = src[row + bone];
                for &n in ring {
                    if let Some(w) = src.get(n * bone_count + bone) {
                        sum += w;
                    }
                }
                dst[row + bone] = sum * norm;
            }
        }
    }
}

fn to_dense(weights: &[EditableBoneWeight], bone_count: usize) -> Vec<f32> {
    let mut table = vec![0.0f32; weights.len() * bone_count];
    for (v, weight) in weights.iter().enumerate() {
        for data in weight.enabled_channels() {
            table[v * bone_count + data.bone_index] += data.weight.clamp(0.0, 1.0);
        }
    }
    table
}

/// Heaviest four bones of a dense row, normalized.
fn from_dense_row(row: &[f32]) -> EditableBoneWeight {
    let mut influences: SmallVec<[BoneWeightData; 8]> = row
        .iter()
        .enumerate()
        .filter(|&(_, &w)| w > 0.0)
        .map(|(bone, &w)| BoneWeightData::new(bone, w))
        .collect();
    influences.sort_by(BoneWeightData::cmp_weight_desc);
    influences.truncate(MAX_BONE_INFLUENCES);

    let mut result = EditableBoneWeight::new();
    for data in influences {
        result.add_channel(data, true);
    }
    result.normalize_channels();
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single(bone: usize) -> EditableBoneWeight {
        let mut bw = EditableBoneWeight::new();
        bw.add_channel(BoneWeightData::new(bone, 1.0), true);
        bw
    }

    fn weight_of(bw: &EditableBoneWeight, bone: usize) -> f32 {
        bw.enabled_channels()
            .filter(|d| d.bone_index == bone)
            .map(|d| d.weight)
            .sum()
    }

    #[test]
    fn test_smoothing_blends_across_triangle() {
        // Strip of two triangles: 0-1-2, 1-3-2
        let indices = [0, 1, 2, 1, 3, 2];
        let weights = vec![single(0), single(0), single(1), single(1)];
        let utility = SmoothingUtility::new(4, &indices);

        let smoothed = utility.smooth(&weights, 2, 1);
        assert_eq!(smoothed.len(), 4);
        for w in &smoothed {
            assert!((w.weight_sum() - 1.0).abs() < 1e-5);
        }
        // Vertex 0 sees neighbours 1 (bone 0) and 2 (bone 1)
        assert!((weight_of(&smoothed[0], 1) - 1.0 / 3.0).abs() < 1e-5);
        assert!(weight_of(&smoothed[0], 0) > weight_of(&smoothed[0], 1));
    }

    #[test]
    fn test_sequence_starts_with_input() {
        let indices = [0, 1, 2];
        let weights = vec![single(0), single(1), single(2)];
        let utility = SmoothingUtility::new(3, &indices);
        let sequence = utility.smooth_sequence(&weights, 3, 3);
        assert_eq!(sequence.len(), 4);
        assert_eq!(sequence[0], weights);
        // A fully connected triangle converges to the mean after one step
        assert!((weight_of(&sequence[1][0], 2) - 1.0 / 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_isolated_vertex_keeps_weight() {
        let indices = [0, 1, 2];
        let weights = vec![single(0), single(1), single(1), single(3)];
        let utility = SmoothingUtility::new(4, &indices);
        let smoothed = utility.smooth(&weights, 4, 2);
        assert_eq!(smoothed[3], weights[3]);
    }
}
