//! Banded, multi-threaded rasterization of a [`TransformMesh`] into target channels.

use rayon::prelude::*;
use smallvec::SmallVec;

use crate::foundation::core::Point;
use crate::foundation::error::{MosaicError, MosaicResult};
use crate::render::canvas::TargetChannel;
use crate::render::mapper::{MapperKind, SourceChannel, write_pixel};
use crate::render::mesh::{MeshTriangle, TransformMesh};

// Sub-pixel precision of snapped vertex coordinates.
const SUBPIXEL: f64 = 256.0;
// Bands per worker thread.
const BANDS_PER_THREAD: usize = 4;
// Snapped coordinates are clamped to this magnitude so edge products fit in i128.
const SNAP_LIMIT: f64 = (1u64 << 52) as f64;

struct Band<'a> {
    y0: u32,
    y1: u32,
    channels: SmallVec<[(&'a mut [f32], &'a mut [u8]); 4]>,
}

/// Map `mesh` from `sources` into `targets` (paired by index) on `pool`.
///
/// Output rows are split into contiguous bands processed in parallel. Pixel centers sit on integer
/// coordinates and triangle edges follow a top-left fill rule on snapped vertices, so every target
/// pixel is written by at most one triangle.
#[allow(clippy::too_many_arguments)]
pub fn map_mesh(
    mesh: &TransformMesh,
    sources: &[SourceChannel],
    targets: &mut [&mut TargetChannel],
    width: u32,
    height: u32,
    kind: MapperKind,
    interpolate: bool,
    pool: &rayon::ThreadPool,
) -> MosaicResult<()> {
    if sources.len() != targets.len() || sources.is_empty() {
        return Err(MosaicError::evaluation(format!(
            "mapper expects paired channels, got {} sources and {} targets",
            sources.len(),
            targets.len()
        )));
    }
    if !kind.is_multi_channel() && sources.len() > 1 {
        return Err(MosaicError::evaluation(
            "single-channel mapper given several channels",
        ));
    }
    let len = width as usize * height as usize;
    if targets
        .iter()
        .any(|t| t.intensity.len() != len || t.coverage.len() != len)
    {
        return Err(MosaicError::evaluation("target channel size mismatch"));
    }
    if mesh.is_empty() || len == 0 {
        return Ok(());
    }

    let threads = pool.current_num_threads().max(1);
    let band_rows = (height as usize).div_ceil(threads * BANDS_PER_THREAD).max(1);
    let chunk = band_rows * width as usize;
    let mut bands: Vec<Band<'_>> = (0..(height as usize).div_ceil(band_rows))
        .map(|i| {
            let y0 = (i * band_rows) as u32;
            Band {
                y0,
                y1: (y0 + band_rows as u32).min(height),
                channels: SmallVec::new(),
            }
        })
        .collect();
    for target in targets.iter_mut() {
        let TargetChannel {
            intensity,
            coverage,
        } = &mut **target;
        for (band, (i, c)) in bands
            .iter_mut()
            .zip(intensity.chunks_mut(chunk).zip(coverage.chunks_mut(chunk)))
        {
            band.channels.push((i, c));
        }
    }

    let policy = kind.mask_policy();
    pool.install(|| {
        bands.into_par_iter().for_each(|band| {
            let Band { y0, y1, mut channels } = band;
            for tri in mesh.triangles() {
                rasterize_triangle(tri, y0, y1, width, |src, idx| {
                    for (source, (intensity, coverage)) in sources.iter().zip(channels.iter_mut()) {
                        if let Some((v, m)) = source.sample(src.x, src.y, interpolate) {
                            write_pixel(policy, v, m, &mut intensity[idx], &mut coverage[idx]);
                        }
                    }
                });
            }
        });
    });
    Ok(())
}

#[derive(Clone, Copy)]
struct Fixed {
    x: i64,
    y: i64,
}

fn snap(p: Point) -> Fixed {
    Fixed {
        x: (p.x * SUBPIXEL).round().clamp(-SNAP_LIMIT, SNAP_LIMIT) as i64,
        y: (p.y * SUBPIXEL).round().clamp(-SNAP_LIMIT, SNAP_LIMIT) as i64,
    }
}

#[inline]
fn edge(a: Fixed, b: Fixed, px: i64, py: i64) -> i128 {
    i128::from(b.x - a.x) * i128::from(py - a.y) - i128::from(b.y - a.y) * i128::from(px - a.x)
}

// Tie-break for pixels exactly on an edge. Shared edges run in opposite directions in the two
// triangles using them, so exactly one side owns the boundary. Top and left edges are owned.
#[inline]
fn owns_edge(a: Fixed, b: Fixed) -> bool {
    let (dx, dy) = (b.x - a.x, b.y - a.y);
    dy < 0 || (dy == 0 && dx > 0)
}

fn ceil_div(a: i64, b: i64) -> i64 {
    -(-a).div_euclid(b)
}

/// Visit every pixel in rows `y0..y1` covered by `tri`.
///
/// The callback receives the source location and the pixel index relative to the first band row.
fn rasterize_triangle(
    tri: &MeshTriangle,
    y0: u32,
    y1: u32,
    width: u32,
    mut f: impl FnMut(Point, usize),
) {
    let mut v = [
        snap(tri.target[0]),
        snap(tri.target[1]),
        snap(tri.target[2]),
    ];
    let area = edge(v[0], v[1], v[2].x, v[2].y);
    if area == 0 {
        return;
    }
    if area < 0 {
        v.swap(1, 2);
    }

    let sub = SUBPIXEL as i64;
    let lo = |f: fn(&Fixed) -> i64| v.iter().map(f).min().unwrap_or(0);
    let hi = |f: fn(&Fixed) -> i64| v.iter().map(f).max().unwrap_or(0);
    // Pixel centers inside the snapped bounding box, clipped to the band.
    let min_x = ceil_div(lo(|p| p.x), sub).max(0);
    let max_x = hi(|p| p.x).div_euclid(sub).min(i64::from(width) - 1);
    let min_y = ceil_div(lo(|p| p.y), sub).max(i64::from(y0));
    let max_y = hi(|p| p.y).div_euclid(sub).min(i64::from(y1) - 1);
    if min_y > max_y || min_x > max_x {
        return;
    }
    let edges = [(v[1], v[2]), (v[2], v[0]), (v[0], v[1])];
    let owned = edges.map(|(a, b)| owns_edge(a, b));

    let row_len = width as usize;
    for y in min_y..=max_y {
        let py = y * sub;
        let row_off = (y - i64::from(y0)) as usize * row_len;
        for x in min_x..=max_x {
            let px = x * sub;
            let inside = edges.iter().zip(owned).all(|((a, b), own)| {
                let e = edge(*a, *b, px, py);
                e > 0 || (e == 0 && own)
            });
            if inside {
                f(
                    tri.target_to_source * Point::new(x as f64, y as f64),
                    row_off + x as usize,
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/mapping.rs"]
mod tests;
