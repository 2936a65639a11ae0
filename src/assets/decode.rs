use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{MosaicError, MosaicResult};
use crate::raster::Plane;

/// Resolve a tile image URL against `root`.
///
/// `file://` URLs and absolute paths are used as-is; anything else is relative to `root`.
/// Remote schemes are rejected.
pub fn resolve_path(root: &Path, url: &str) -> MosaicResult<PathBuf> {
    let stripped = url.strip_prefix("file://").unwrap_or(url);
    if stripped.contains("://") {
        return Err(MosaicError::decode(format!(
            "unsupported image url scheme: '{url}'"
        )));
    }
    let p = Path::new(stripped);
    Ok(if p.is_absolute() {
        p.to_path_buf()
    } else {
        root.join(p)
    })
}

/// Read and decode an image file into 8-bit-range luma intensities.
pub fn load_plane(path: &Path) -> MosaicResult<Plane<f32>> {
    let bytes = std::fs::read(path).with_context(|| format!("read image {}", path.display()))?;
    decode_plane(&bytes).map_err(|e| match e {
        MosaicError::Decode(msg) => MosaicError::decode(format!("{}: {msg}", path.display())),
        other => other,
    })
}

/// Decode encoded image bytes (PNG, JPEG, TIFF, ...) into luma intensities in `0..=255`.
pub fn decode_plane(bytes: &[u8]) -> MosaicResult<Plane<f32>> {
    let dyn_img =
        image::load_from_memory(bytes).map_err(|e| MosaicError::decode(e.to_string()))?;
    let luma = dyn_img.to_luma8();
    let (width, height) = luma.dimensions();
    let data = luma.into_raw().into_iter().map(f32::from).collect();
    Plane::from_vec(width, height, data)
}

/// Halve `plane` `levels` times by 2x2 box averaging.
///
/// Odd trailing rows/columns are dropped, so repeated halving can reach a zero dimension. Masks are
/// rounded back to integral values after each level so the binary threshold stays exact.
pub fn downsample(plane: &Plane<f32>, levels: u32, is_mask: bool) -> Plane<f32> {
    let mut current = plane.clone();
    for _ in 0..levels {
        if current.is_empty() {
            break;
        }
        let (w, h) = (current.width() / 2, current.height() / 2);
        let mut out = Plane::new(w, h, 0.0f32);
        for y in 0..h {
            for x in 0..w {
                let (sx, sy) = (x * 2, y * 2);
                let sum = current.get(sx, sy)
                    + current.get(sx + 1, sy)
                    + current.get(sx, sy + 1)
                    + current.get(sx + 1, sy + 1);
                let v = sum * 0.25;
                out.set(x, y, if is_mask { v.round() } else { v });
            }
        }
        current = out;
    }
    current
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
