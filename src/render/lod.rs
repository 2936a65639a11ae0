use crate::foundation::core::Point;
use crate::transform::CoordinateTransform;

/// Mean local scale of `transform` over `[0, width] x [0, height]`.
///
/// At every grid sample (spacing `step`) the forward differences along x and y are measured and
/// divided by `step`. Returns the mean of all those magnitudes, or `NaN` when nothing was sampled.
pub fn sample_average_scale(
    transform: &dyn CoordinateTransform,
    width: f64,
    height: f64,
    step: f64,
) -> f64 {
    if !(step.is_finite() && step > 0.0 && width >= 0.0 && height >= 0.0) {
        return f64::NAN;
    }
    let nx = (width / step).floor() as usize;
    let ny = (height / step).floor() as usize;
    let mut sum = 0.0;
    let mut count = 0usize;
    for j in 0..=ny {
        let y = j as f64 * step;
        for i in 0..=nx {
            let x = i as f64 * step;
            let p = transform.apply(Point::new(x, y));
            let px = transform.apply(Point::new(x + step, y));
            let py = transform.apply(Point::new(x, y + step));
            sum += (px - p).hypot() / step;
            sum += (py - p).hypot() / step;
            count += 2;
        }
    }
    sum / count as f64
}

/// Coarsest mipmap level whose resolution still covers scale `s`: `max(0, floor(log2(1/s)))`.
pub fn best_mipmap_level(s: f64) -> u32 {
    if !(s.is_finite() && s > 0.0) {
        return 0;
    }
    let level = (1.0 / s).log2().floor();
    if level <= 0.0 {
        0
    } else {
        level.min(31.0) as u32
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/lod.rs"]
mod tests;
