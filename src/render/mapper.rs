//! Per-pixel write policies for mesh mapping.

use std::sync::Arc;

use crate::raster::Plane;

/// How a source mask affects target pixels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaskPolicy {
    /// Ignore masks; every covered pixel is written.
    None,
    /// Blend by `mask / 255`.
    Alpha,
    /// Write only where the mask is fully opaque.
    Binary,
}

/// Closed set of pixel mappers: channel arity x mask policy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MapperKind {
    SingleChannel,
    SingleChannelWithAlpha,
    SingleChannelWithBinaryMask,
    MultiChannel,
    MultiChannelWithAlpha,
    MultiChannelWithBinaryMask,
}

impl MapperKind {
    /// Pick the mapper for a tile. `has_mask` refers to the primary channel.
    pub fn select(channel_count: usize, has_mask: bool, binary_mask: bool) -> Self {
        match (channel_count > 1, has_mask, binary_mask) {
            (false, false, _) => Self::SingleChannel,
            (false, true, false) => Self::SingleChannelWithAlpha,
            (false, true, true) => Self::SingleChannelWithBinaryMask,
            (true, false, _) => Self::MultiChannel,
            (true, true, false) => Self::MultiChannelWithAlpha,
            (true, true, true) => Self::MultiChannelWithBinaryMask,
        }
    }

    pub fn is_multi_channel(self) -> bool {
        matches!(
            self,
            Self::MultiChannel | Self::MultiChannelWithAlpha | Self::MultiChannelWithBinaryMask
        )
    }

    pub fn mask_policy(self) -> MaskPolicy {
        match self {
            Self::SingleChannel | Self::MultiChannel => MaskPolicy::None,
            Self::SingleChannelWithAlpha | Self::MultiChannelWithAlpha => MaskPolicy::Alpha,
            Self::SingleChannelWithBinaryMask | Self::MultiChannelWithBinaryMask => {
                MaskPolicy::Binary
            }
        }
    }
}

/// Decoded pixels of one source channel, with its mask when present.
#[derive(Clone, Debug)]
pub struct SourceChannel {
    pub image: Arc<Plane<f32>>,
    pub mask: Option<Arc<Plane<f32>>>,
}

impl SourceChannel {
    /// Sample image and mask at source location `(x, y)`; `None` outside the image.
    #[inline]
    pub fn sample(&self, x: f64, y: f64, interpolate: bool) -> Option<(f32, Option<f32>)> {
        if !self.image.contains(x, y) {
            return None;
        }
        let (v, m) = if interpolate {
            (
                self.image.sample_bilinear(x, y),
                self.mask.as_ref().map(|m| m.sample_bilinear(x, y)),
            )
        } else {
            (
                self.image.sample_nearest(x, y),
                self.mask.as_ref().map(|m| m.sample_nearest(x, y)),
            )
        };
        Some((v, m))
    }
}

/// Apply one source sample to a target pixel under `policy`.
#[inline]
pub fn write_pixel(
    policy: MaskPolicy,
    value: f32,
    mask: Option<f32>,
    intensity: &mut f32,
    coverage: &mut u8,
) {
    match policy {
        MaskPolicy::None => {
            *intensity = value;
            *coverage = 255;
        }
        MaskPolicy::Alpha => {
            let a = mask.map_or(1.0, |m| (m / 255.0).clamp(0.0, 1.0));
            if a <= 0.0 {
                return;
            }
            *intensity += a * (value - *intensity);
            let c = f32::from(*coverage) / 255.0;
            *coverage = ((a + c * (1.0 - a)) * 255.0).round().clamp(0.0, 255.0) as u8;
        }
        MaskPolicy::Binary => {
            if mask.is_none_or(|m| m.round() >= 255.0) {
                *intensity = value;
                *coverage = 255;
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/mapper.rs"]
mod tests;
