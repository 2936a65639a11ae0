use crate::foundation::core::Rgba8;
use crate::foundation::error::{MosaicError, MosaicResult};
use crate::foundation::math::mul_div255_u16;

/// Straight (non-premultiplied) RGBA8 pixel.
pub type StraightRgba8 = [u8; 4];

/// Source-over for straight-alpha pixels.
pub fn over(dst: StraightRgba8, src: StraightRgba8) -> StraightRgba8 {
    let sa = u16::from(src[3]);
    if sa == 0 {
        return dst;
    }
    if sa == 255 {
        return src;
    }

    let da = mul_div255_u16(u16::from(dst[3]), 255 - sa);
    let out_a = u32::from(sa + da);
    if out_a == 0 {
        return [0, 0, 0, 0];
    }

    let mut out = [0u8; 4];
    out[3] = out_a as u8;
    for i in 0..3 {
        let num = u32::from(src[i]) * u32::from(sa) + u32::from(dst[i]) * u32::from(da);
        out[i] = ((num + out_a / 2) / out_a).min(255) as u8;
    }
    out
}

/// Fill the destination with `color`.
pub fn clear(dst: &mut image::RgbaImage, color: Rgba8) {
    let px = image::Rgba(color.to_array());
    for p in dst.pixels_mut() {
        *p = px;
    }
}

/// Draw `src` over `dst` at the origin; both rasters must have the same size.
pub fn draw_over(dst: &mut image::RgbaImage, src: &image::RgbaImage) -> MosaicResult<()> {
    if dst.dimensions() != src.dimensions() {
        return Err(MosaicError::validation(format!(
            "draw_over expects equal raster sizes, got {:?} and {:?}",
            dst.dimensions(),
            src.dimensions()
        )));
    }
    for (d, s) in dst.pixels_mut().zip(src.pixels()) {
        d.0 = over(d.0, s.0);
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/raster/composite.rs"]
mod tests;
