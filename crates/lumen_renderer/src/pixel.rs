//! Output pixel types and channel layouts.

use serde::{Deserialize, Serialize};

/// Largest channel value written by shaded, tone-mapped and silhouette renders.
pub const MAX_CHANNEL: f32 = 255.0;

/// Element type of a caller-provided output buffer.
///
/// Integer types round and saturate; float types store the value as is.
pub trait Pixel: Copy + Default + Send + Sync + 'static {
    fn from_value(value: f32) -> Self;
}

macro_rules! impl_integer_pixel {
    ($($t:ty),*) => {
        $(
            impl Pixel for $t {
                #[inline]
                fn from_value(value: f32) -> Self {
                    // `as` saturates and maps NaN to zero
                    value.round() as $t
                }
            }
        )*
    };
}

impl_integer_pixel!(u8, u16, u32, i32);

impl Pixel for f32 {
    #[inline]
    fn from_value(value: f32) -> Self {
        value
    }
}

impl Pixel for f64 {
    #[inline]
    fn from_value(value: f32) -> Self {
        value as f64
    }
}

/// Map a linear channel value to `0..=255`, clamping out-of-range input.
#[inline]
pub fn quantize(channel: f32) -> f32 {
    (channel.clamp(0.0, 1.0) * MAX_CHANNEL).round()
}

/// Channel order of 3-channel output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Layout {
    /// `[RGBRGBRGB...]`
    #[default]
    Interleaved,
    /// `[RRR...GGG...BBB...]`
    Planar,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quantize_clamps_and_rounds() {
        assert_eq!(quantize(-0.3), 0.0);
        assert_eq!(quantize(0.0), 0.0);
        assert_eq!(quantize(0.5), 128.0);
        assert_eq!(quantize(1.0), 255.0);
        assert_eq!(quantize(7.0), 255.0);
    }

    #[test]
    fn test_integer_pixels_saturate() {
        assert_eq!(u8::from_value(300.0), 255);
        assert_eq!(u8::from_value(-4.0), 0);
        assert_eq!(u8::from_value(12.6), 13);
        assert_eq!(u16::from_value(300.0), 300);
        assert_eq!(u8::from_value(f32::NAN), 0);
    }

    #[test]
    fn test_float_pixels_keep_value() {
        assert_eq!(f32::from_value(3.25), 3.25);
        assert_eq!(f64::from_value(0.5), 0.5);
    }

    #[test]
    fn test_layout_serde_names() {
        assert_eq!(serde_json::to_string(&Layout::Planar).unwrap(), "\"planar\"");
        let layout: Layout = serde_json::from_str("\"interleaved\"").unwrap();
        assert_eq!(layout, Layout::Interleaved);
    }
}
