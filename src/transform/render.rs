use crate::foundation::core::Affine;
use crate::transform::TransformList;

/// Viewport map `(X, Y) -> (s*X - s*x - k, s*Y - s*y - k)`.
///
/// `k` is zero, or `(1 - s) / 2` when `area_offset` is set so that pixel areas rather than pixel
/// centers line up between source and output.
pub fn scale_and_offset(scale: f64, x: f64, y: f64, area_offset: bool) -> Affine {
    let k = if area_offset { (1.0 - scale) * 0.5 } else { 0.0 };
    Affine::new([scale, 0.0, 0.0, scale, -(x * scale + k), -(y * scale + k)])
}

/// Compose a tile's chain with the viewport map: `[tile..., scale-and-offset]`.
pub fn create_render_transform(
    tile_transforms: &TransformList,
    area_offset: bool,
    scale: f64,
    x: f64,
    y: f64,
) -> TransformList {
    let mut out = tile_transforms.clone();
    out.push(scale_and_offset(scale, x, y, area_offset));
    out
}

/// Map mipmap pixel coordinates of `level` onto full-resolution pixel coordinates.
pub fn scale_level_transform(level: u32) -> Affine {
    let s = f64::from(1u32 << level.min(31));
    let t = s * 0.5 - 0.5;
    Affine::new([s, 0.0, 0.0, s, t, t])
}
