//! Fixed pre-mesh filter bank applied to decoded primary channel pixels.

use crate::foundation::math::{Fnv1a64, Rng64};
use crate::raster::Plane;

/// One pixel filter. Spatial parameters are in full-resolution pixels and are scaled by the
/// mipmap scale at application time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Filter {
    /// Replace pixels exactly equal to `value` with uniform noise in `[min, max]`.
    ValueToNoise { value: f32, min: f32, max: f32 },
    /// Stretch each pixel against the mean and standard deviation of its surrounding block.
    NormalizeLocalContrast {
        block_radius_x: u32,
        block_radius_y: u32,
        stds: f32,
        center: bool,
        stretch: bool,
    },
}

/// Zero and saturated pixels become noise, then local contrast is normalized.
pub const DEFAULT_FILTERS: [Filter; 3] = [
    Filter::ValueToNoise {
        value: 0.0,
        min: 64.0,
        max: 191.0,
    },
    Filter::ValueToNoise {
        value: 255.0,
        min: 64.0,
        max: 191.0,
    },
    Filter::NormalizeLocalContrast {
        block_radius_x: 500,
        block_radius_y: 500,
        stds: 3.0,
        center: true,
        stretch: true,
    },
];

impl Filter {
    /// Apply in place. `scale` is the mipmap scale `1 / 2^level`; `seed` drives the noise.
    pub fn process(&self, plane: &mut Plane<f32>, scale: f64, seed: u64) {
        match *self {
            Self::ValueToNoise { value, min, max } => {
                let mut h = Fnv1a64::new(seed);
                h.write_u64(u64::from(value.to_bits()));
                let mut rng = Rng64::new(h.finish());
                let span = f64::from(max - min);
                for v in plane.data_mut() {
                    if *v == value {
                        *v = min + (rng.next_f64_01() * span) as f32;
                    }
                }
            }
            Self::NormalizeLocalContrast {
                block_radius_x,
                block_radius_y,
                stds,
                center,
                stretch,
            } => {
                let rx = scaled_radius(block_radius_x, scale);
                let ry = scaled_radius(block_radius_y, scale);
                normalize_local_contrast(plane, rx, ry, f64::from(stds), center, stretch);
            }
        }
    }
}

/// Run [`DEFAULT_FILTERS`] on a plane decoded at `mipmap_level`, seeding noise from `tile_id`.
pub fn apply_default_filters(plane: &mut Plane<f32>, mipmap_level: u32, tile_id: &str) {
    let scale = 1.0 / f64::from(1u32 << mipmap_level.min(31));
    let seed = tile_seed(tile_id);
    for f in &DEFAULT_FILTERS {
        f.process(plane, scale, seed);
    }
}

pub(crate) fn tile_seed(tile_id: &str) -> u64 {
    let mut h = Fnv1a64::new_default();
    h.write_bytes(tile_id.as_bytes());
    h.finish()
}

fn scaled_radius(radius: u32, scale: f64) -> usize {
    (f64::from(radius) * scale).round().max(1.0) as usize
}

fn normalize_local_contrast(
    plane: &mut Plane<f32>,
    rx: usize,
    ry: usize,
    stds: f64,
    center: bool,
    stretch: bool,
) {
    if plane.is_empty() || !(center || stretch) {
        return;
    }
    let w = plane.width() as usize;
    let h = plane.height() as usize;

    // Summed-area tables of v and v^2 with a zero border row/column.
    let stride = w + 1;
    let mut sum = vec![0.0f64; stride * (h + 1)];
    let mut sum_sq = vec![0.0f64; stride * (h + 1)];
    {
        let data = plane.data();
        for y in 0..h {
            let mut row = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w {
                let v = f64::from(data[y * w + x]);
                row += v;
                row_sq += v * v;
                sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row;
                sum_sq[(y + 1) * stride + x + 1] = sum_sq[y * stride + x + 1] + row_sq;
            }
        }
    }

    let data = plane.data_mut();
    for y in 0..h {
        let y0 = y.saturating_sub(ry);
        let y1 = (y + ry + 1).min(h);
        for x in 0..w {
            let x0 = x.saturating_sub(rx);
            let x1 = (x + rx + 1).min(w);
            let n = ((x1 - x0) * (y1 - y0)) as f64;
            let s = sum[y1 * stride + x1] - sum[y0 * stride + x1] - sum[y1 * stride + x0]
                + sum[y0 * stride + x0];
            let s2 = sum_sq[y1 * stride + x1] - sum_sq[y0 * stride + x1] - sum_sq[y1 * stride + x0]
                + sum_sq[y0 * stride + x0];
            let mean = s / n;
            let std = (s2 / n - mean * mean).max(0.0).sqrt();
            if std <= f64::EPSILON {
                continue;
            }
            let d = stds * std;
            let v = f64::from(data[y * w + x]);
            let out = match (center, stretch) {
                (true, true) => (v - mean + d) / (2.0 * d) * 255.0,
                (true, false) => v - mean + 127.5,
                (false, true) => (v - mean) * (127.5 / d) + mean,
                (false, false) => v,
            };
            data[y * w + x] = out.clamp(0.0, 255.0) as f32;
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/filter.rs"]
mod tests;
