use std::cmp::Ordering;

use glam::Vec4;
use log::debug;

use super::{dequantize_weights, normalize_weight_sum, VertexStore};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// The maximum number of influences stored for each vertex.
pub const MAX_INFLUENCES: usize = 4;

/// A single bone influence for a vertex.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexInfluence {
    /// The index into the bone palette.
    pub bone_index: u8,
    pub weight: f32,
}

impl VertexInfluence {
    pub fn new(bone_index: u8, weight: f32) -> Self {
        Self { bone_index, weight }
    }
}

/// Packs each vertex's influences into at most [MAX_INFLUENCES] weights and bone indices.
///
/// Influences are sorted by descending weight, truncated, and renormalized to sum to 1.0.
/// A vertex without any influences with positive weight is assigned entirely to bone 0.
/**
```rust
# use aqua_data::vtxl_data::{consolidate_weights, VertexInfluence};
# use glam::Vec4;
let (weights, indices) = consolidate_weights(&[
    vec![VertexInfluence::new(2, 0.25), VertexInfluence::new(5, 0.75)],
    Vec::new(),
]);
assert_eq!(vec![Vec4::new(0.75, 0.25, 0.0, 0.0), Vec4::X], weights);
assert_eq!(vec![[5, 2, 0, 0], [0, 0, 0, 0]], indices);
```
 */
pub fn consolidate_weights(candidates: &[Vec<VertexInfluence>]) -> (Vec<Vec4>, Vec<[u8; 4]>) {
    candidates
        .iter()
        .enumerate()
        .map(|(i, influences)| {
            let (weights, indices) = consolidate_vertex_weights(influences);
            if indices == [0; 4] && weights == Vec4::X {
                debug!("Vertex {} has no weights. Assigning to bone 0.", i);
            }
            (weights, indices)
        })
        .unzip()
}

fn consolidate_vertex_weights(influences: &[VertexInfluence]) -> (Vec4, [u8; 4]) {
    let mut sorted: Vec<_> = influences
        .iter()
        .filter(|i| i.weight > 0.0)
        .copied()
        .collect();
    if sorted.is_empty() {
        return (Vec4::X, [0; 4]);
    }

    // The sort is stable, so equal weights keep their original order.
    sorted.sort_by(|a, b| b.weight.partial_cmp(&a.weight).unwrap_or(Ordering::Equal));
    sorted.truncate(MAX_INFLUENCES);

    let mut weights = [0f32; 4];
    let mut indices = [0u8; 4];
    for (i, influence) in sorted.iter().enumerate() {
        weights[i] = influence.weight;
        indices[i] = influence.bone_index;
    }

    (normalize_weight_sum(Vec4::from(weights)), indices)
}

/// Rotates slot `slot` to the front, shifting the preceding slots back by one.
fn move_slot_to_front(weights: &mut [f32; 4], indices: &mut [u8; 4], slot: usize) {
    weights[..=slot].rotate_right(1);
    indices[..=slot].rotate_right(1);
}

impl VertexStore {
    /// Sets the legacy weights and weight indices from each vertex's candidate influences.
    /// See [consolidate_weights].
    pub fn set_weights_from_candidates(&mut self, candidates: &[Vec<VertexInfluence>]) {
        let (weights, indices) = consolidate_weights(candidates);
        self.weights.legacy = Some(weights);
        self.weights.quantized = None;
        self.weight_indices = Some(indices);
    }

    /// The weights from [Channel::resolve](super::Channel::resolve) converted to floats.
    pub fn resolved_weights(&self) -> Option<Vec<Vec4>> {
        self.weights.to_legacy_values(dequantize_weights)
    }

    /// Reconstructs the influences for each vertex from the fixed size weight storage.
    ///
    /// A slot is kept if its bone index or its weight is nonzero.
    /// The kept weights are renormalized to sum to 1.0.
    /// Returns an empty list if the weights or weight indices are missing.
    pub fn true_weights(&self) -> Vec<Vec<VertexInfluence>> {
        let (weights, indices) = match (self.resolved_weights(), &self.weight_indices) {
            (Some(weights), Some(indices)) => (weights, indices),
            _ => return Vec::new(),
        };

        weights
            .iter()
            .zip(indices.iter())
            .map(|(weights, indices)| {
                let mut influences: Vec<_> = weights
                    .to_array()
                    .iter()
                    .zip(indices.iter())
                    .filter(|(w, i)| **i != 0 || **w != 0.0)
                    .map(|(w, i)| VertexInfluence::new(*i, *w))
                    .collect();

                let sum: f32 = influences.iter().map(|i| i.weight).sum();
                if sum > 0.0 {
                    for influence in influences.iter_mut() {
                        influence.weight /= sum;
                    }
                    influences
                } else {
                    vec![VertexInfluence::new(0, 1.0)]
                }
            })
            .collect()
    }

    /// Scales the legacy weights for each vertex to sum to 1.0.
    pub fn normalize_weight_sums(&mut self) {
        if let Some(weights) = self.weights.legacy.as_mut() {
            for w in weights.iter_mut() {
                *w = normalize_weight_sum(*w);
            }
        }
    }

    /// Moves bone 0 influences with nonzero weight to the first slot
    /// if the following slot is also bone 0.
    ///
    /// Bone 0 is also used for unused slots, so a trailing bone 0 with weight
    /// would otherwise be indistinguishable from padding.
    pub fn move_trailing_zero_bones_first(&mut self) {
        self.reorder_zero_bones(true);
    }

    /// Moves every bone 0 influence with nonzero weight to the first slot.
    pub fn move_zero_bones_first(&mut self) {
        self.reorder_zero_bones(false);
    }

    fn reorder_zero_bones(&mut self, require_next_zero: bool) {
        let (weights, indices) = match (self.weights.legacy.as_mut(), self.weight_indices.as_mut()) {
            (Some(weights), Some(indices)) => (weights, indices),
            _ => return,
        };

        for (w, indices) in weights.iter_mut().zip(indices.iter_mut()) {
            let mut values = w.to_array();
            for slot in 1..MAX_INFLUENCES {
                // The last slot has no following slot to check.
                let next_is_zero =
                    !require_next_zero || slot + 1 == MAX_INFLUENCES || indices[slot + 1] == 0;
                if indices[slot] == 0 && values[slot] != 0.0 && next_is_zero {
                    move_slot_to_front(&mut values, indices, slot);
                }
            }
            *w = Vec4::from(values);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vtxl_data::Channel;
    use approx::assert_relative_eq;
    use glam::Vec3;

    fn assert_sums_to_one(weights: &[Vec4]) {
        for w in weights {
            assert_relative_eq!(1.0, w.x + w.y + w.z + w.w, epsilon = 1e-5);
        }
    }

    #[test]
    fn consolidate_truncates_to_four() {
        let (weights, indices) = consolidate_weights(&[vec![
            VertexInfluence::new(1, 0.1),
            VertexInfluence::new(2, 0.3),
            VertexInfluence::new(3, 0.05),
            VertexInfluence::new(4, 0.2),
            VertexInfluence::new(5, 0.35),
        ]]);

        assert_eq!(vec![[5, 2, 4, 1]], indices);
        assert_sums_to_one(&weights);
        assert_relative_eq!(0.35 / 0.95, weights[0].x, epsilon = 1e-6);
        assert_relative_eq!(0.1 / 0.95, weights[0].w, epsilon = 1e-6);
    }

    #[test]
    fn consolidate_renormalizes() {
        let (weights, indices) = consolidate_weights(&[
            vec![VertexInfluence::new(7, 0.2), VertexInfluence::new(3, 0.2)],
            vec![VertexInfluence::new(1, 4.0)],
        ]);

        // Equal weights preserve their order.
        assert_eq!(vec![[7, 3, 0, 0], [1, 0, 0, 0]], indices);
        assert_eq!(vec![Vec4::new(0.5, 0.5, 0.0, 0.0), Vec4::X], weights);
    }

    #[test]
    fn consolidate_zero_weights() {
        let (weights, indices) = consolidate_weights(&[vec![
            VertexInfluence::new(3, 0.0),
            VertexInfluence::new(4, 0.0),
        ]]);
        assert_eq!(vec![Vec4::X], weights);
        assert_eq!(vec![[0, 0, 0, 0]], indices);
    }

    #[test]
    fn set_weights_from_candidates_replaces_quantized() {
        let mut data = VertexStore {
            positions: vec![Vec3::ZERO],
            weights: Channel::from_quantized(vec![[65535, 0, 0, 0]]),
            ..Default::default()
        };
        data.set_weights_from_candidates(&[vec![VertexInfluence::new(2, 1.0)]]);
        assert_eq!(Some(vec![Vec4::X]), data.weights.legacy);
        assert_eq!(None, data.weights.quantized);
        assert_eq!(Some(vec![[2, 0, 0, 0]]), data.weight_indices);
        data.validate().unwrap();
    }

    #[test]
    fn true_weights_skip_unused_slots() {
        let data = VertexStore {
            positions: vec![Vec3::ZERO; 3],
            weights: Channel::from_legacy(vec![
                Vec4::new(0.5, 0.25, 0.0, 0.0),
                Vec4::new(0.0, 0.5, 0.5, 0.0),
                Vec4::ZERO,
            ]),
            weight_indices: Some(vec![[0, 4, 0, 0], [6, 0, 2, 0], [0, 0, 0, 0]]),
            ..Default::default()
        };

        let influences = data.true_weights();
        assert_eq!(
            vec![
                vec![
                    VertexInfluence::new(0, 2.0 / 3.0),
                    VertexInfluence::new(4, 1.0 / 3.0)
                ],
                // Bone 0 with nonzero weight is kept.
                vec![
                    VertexInfluence::new(6, 0.0),
                    VertexInfluence::new(0, 0.5),
                    VertexInfluence::new(2, 0.5)
                ],
                vec![VertexInfluence::new(0, 1.0)],
            ],
            influences
        );
    }

    #[test]
    fn true_weights_missing_indices() {
        let data = VertexStore {
            positions: vec![Vec3::ZERO],
            weights: Channel::from_legacy(vec![Vec4::X]),
            ..Default::default()
        };
        assert!(data.true_weights().is_empty());
    }

    #[test]
    fn true_weights_quantized() {
        let data = VertexStore {
            positions: vec![Vec3::ZERO],
            weights: Channel::from_quantized(vec![[32768, 32767, 0, 0]]),
            weight_indices: Some(vec![[1, 2, 0, 0]]),
            ..Default::default()
        };
        let influences = data.true_weights();
        assert_eq!(2, influences[0].len());
        assert_relative_eq!(
            1.0,
            influences[0].iter().map(|i| i.weight).sum::<f32>(),
            epsilon = 1e-5
        );
    }

    #[test]
    fn normalize_weight_sums_legacy() {
        let mut data = VertexStore {
            positions: vec![Vec3::ZERO; 2],
            weights: Channel::from_legacy(vec![Vec4::new(0.2, 0.2, 0.1, 0.0), Vec4::ZERO]),
            ..Default::default()
        };
        data.normalize_weight_sums();

        let weights = data.weights.legacy.unwrap();
        assert_sums_to_one(&weights[..1]);
        assert_eq!(Vec4::ZERO, weights[1]);
    }

    #[test]
    fn move_zero_bones_first() {
        let mut data = VertexStore {
            positions: vec![Vec3::ZERO; 3],
            weights: Channel::from_legacy(vec![
                Vec4::new(0.5, 0.3, 0.2, 0.0),
                Vec4::new(0.6, 0.4, 0.0, 0.0),
                Vec4::new(0.7, 0.0, 0.0, 0.0),
            ]),
            weight_indices: Some(vec![[3, 5, 0, 0], [2, 0, 4, 0], [1, 0, 0, 0]]),
            ..Default::default()
        };
        data.move_zero_bones_first();

        assert_eq!(
            Some(vec![
                Vec4::new(0.2, 0.5, 0.3, 0.0),
                Vec4::new(0.4, 0.6, 0.0, 0.0),
                Vec4::new(0.7, 0.0, 0.0, 0.0),
            ]),
            data.weights.legacy
        );
        assert_eq!(
            Some(vec![[0, 3, 5, 0], [0, 2, 4, 0], [1, 0, 0, 0]]),
            data.weight_indices
        );
    }

    #[test]
    fn move_trailing_zero_bones_first() {
        let mut data = VertexStore {
            positions: vec![Vec3::ZERO; 2],
            weights: Channel::from_legacy(vec![
                Vec4::new(0.6, 0.4, 0.0, 0.0),
                Vec4::new(0.5, 0.3, 0.2, 0.0),
            ]),
            weight_indices: Some(vec![[2, 0, 4, 0], [3, 5, 0, 0]]),
            ..Default::default()
        };
        data.move_trailing_zero_bones_first();

        // The first vertex is unchanged since the slot after bone 0 is bone 4.
        assert_eq!(
            Some(vec![
                Vec4::new(0.6, 0.4, 0.0, 0.0),
                Vec4::new(0.2, 0.5, 0.3, 0.0),
            ]),
            data.weights.legacy
        );
        assert_eq!(Some(vec![[2, 0, 4, 0], [0, 3, 5, 0]]), data.weight_indices);
    }

    #[test]
    fn move_last_slot_first() {
        let mut data = VertexStore {
            positions: vec![Vec3::ZERO],
            weights: Channel::from_legacy(vec![Vec4::new(0.4, 0.3, 0.2, 0.1)]),
            weight_indices: Some(vec![[1, 2, 3, 0]]),
            ..Default::default()
        };
        data.move_trailing_zero_bones_first();

        assert_eq!(
            Some(vec![Vec4::new(0.1, 0.4, 0.3, 0.2)]),
            data.weights.legacy
        );
        assert_eq!(Some(vec![[0, 1, 2, 3]]), data.weight_indices);
    }
}
