use glam::{Vec2, Vec3, Vec4};

use super::{has_data, Channel, VertexStore};

/// Converts a signed normalized value to a signed 16-bit integer.
/// A result of -32767 is adjusted to -32768.
/**
```rust
# use aqua_data::vtxl_data::quantize_snorm;
assert_eq!(32767, quantize_snorm(1.0));
assert_eq!(0, quantize_snorm(0.0));
assert_eq!(-32768, quantize_snorm(-1.0));
assert_eq!(16384, quantize_snorm(0.5));
```
 */
pub fn quantize_snorm(value: f32) -> i16 {
    // Float to int casts saturate for out of range values.
    let quantized = (value * 32767.0).round() as i16;
    if quantized == -32767 {
        quantized - 1
    } else {
        quantized
    }
}

pub fn dequantize_snorm(value: i16) -> f32 {
    value as f32 / 32767.0
}

/// Converts a weight in the range 0.0 to 1.0 to an unsigned 16-bit integer.
/**
```rust
# use aqua_data::vtxl_data::quantize_unorm;
assert_eq!(65535, quantize_unorm(1.0));
assert_eq!(0, quantize_unorm(-0.5));
assert_eq!(32768, quantize_unorm(0.5));
```
 */
pub fn quantize_unorm(value: f32) -> u16 {
    (value.clamp(0.0, 1.0) * 65535.0).round() as u16
}

pub fn dequantize_unorm(value: u16) -> f32 {
    value as f32 / 65535.0
}

/// Quantizes a unit vector. The unused fourth component is 0.
pub fn quantize_vector(v: &Vec3) -> [i16; 4] {
    [
        quantize_snorm(v.x),
        quantize_snorm(v.y),
        quantize_snorm(v.z),
        0,
    ]
}

/// Converts a quantized unit vector back to unit length.
/// Zero vectors remain zero.
pub fn dequantize_vector(v: &[i16; 4]) -> Vec3 {
    Vec3::new(
        dequantize_snorm(v[0]),
        dequantize_snorm(v[1]),
        dequantize_snorm(v[2]),
    )
    .normalize_or_zero()
}

pub fn quantize_uv(uv: &Vec2) -> [i16; 2] {
    [quantize_snorm(uv.x), quantize_snorm(uv.y)]
}

pub fn dequantize_uv(uv: &[i16; 2]) -> Vec2 {
    Vec2::new(dequantize_snorm(uv[0]), dequantize_snorm(uv[1]))
}

pub fn quantize_weights(weights: &Vec4) -> [u16; 4] {
    [
        quantize_unorm(weights.x),
        quantize_unorm(weights.y),
        quantize_unorm(weights.z),
        quantize_unorm(weights.w),
    ]
}

/// Converts quantized weights back to floats that sum to 1.0.
/// Weights that are all zero remain zero.
pub fn dequantize_weights(weights: &[u16; 4]) -> Vec4 {
    normalize_weight_sum(Vec4::new(
        dequantize_unorm(weights[0]),
        dequantize_unorm(weights[1]),
        dequantize_unorm(weights[2]),
        dequantize_unorm(weights[3]),
    ))
}

/// Scales the components to sum to 1.0.
/// Weights with a sum of zero are returned unchanged.
pub fn normalize_weight_sum(weights: Vec4) -> Vec4 {
    let sum = weights.x + weights.y + weights.z + weights.w;
    if sum > 0.0 {
        weights / sum
    } else {
        weights
    }
}

impl<L, Q> Channel<L, Q> {
    /// Sets the quantized values from the legacy values.
    /// Existing quantized values are only replaced if `force` is `true`.
    pub fn fill_quantized<F: Fn(&L) -> Q>(&mut self, force: bool, quantize: F) {
        if let Some(legacy) = &self.legacy {
            if force || !has_data(&self.quantized) {
                self.quantized = Some(legacy.iter().map(quantize).collect());
            }
        }
    }

    /// Sets the legacy values from the quantized values.
    /// Existing legacy values are only replaced if `force` is `true`.
    pub fn fill_legacy<F: Fn(&Q) -> L>(&mut self, force: bool, dequantize: F) {
        if let Some(quantized) = &self.quantized {
            if force || !has_data(&self.legacy) {
                self.legacy = Some(quantized.iter().map(dequantize).collect());
            }
        }
    }
}

impl VertexStore {
    /// Converts legacy normals, tangents, binormals, UVs, and weights to their quantized encoding.
    /// Attributes that already have quantized data are skipped unless `force` is `true`.
    /// This does not affect the legacy data.
    pub fn convert_to_quantized(&mut self, force: bool) {
        self.weights.fill_quantized(force, quantize_weights);
        self.normals.fill_quantized(force, quantize_vector);
        self.tangents.fill_quantized(force, quantize_vector);
        self.binormals.fill_quantized(force, quantize_vector);
        self.uv1.fill_quantized(force, quantize_uv);
        self.uv2.fill_quantized(force, quantize_uv);
    }

    /// Converts quantized normals, tangents, binormals, UVs, and weights to their legacy encoding.
    /// Attributes that already have legacy data are skipped unless `force` is `true`.
    ///
    /// Vectors are renormalized to unit length, and weights are renormalized to sum to 1.0.
    pub fn convert_to_legacy(&mut self, force: bool) {
        self.weights.fill_legacy(force, dequantize_weights);
        self.normals.fill_legacy(force, dequantize_vector);
        self.tangents.fill_legacy(force, dequantize_vector);
        self.binormals.fill_legacy(force, dequantize_vector);
        self.uv1.fill_legacy(force, dequantize_uv);
        self.uv2.fill_legacy(force, dequantize_uv);
    }
}
