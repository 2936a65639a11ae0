use crate::foundation::error::{MosaicError, MosaicResult};

/// Row-major single-channel pixel buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct Plane<T> {
    width: u32,
    height: u32,
    data: Vec<T>,
}

impl<T: Copy> Plane<T> {
    /// Plane of `width x height` filled with `fill`.
    pub fn new(width: u32, height: u32, fill: T) -> Self {
        Self {
            width,
            height,
            data: vec![fill; width as usize * height as usize],
        }
    }

    /// Wrap an existing buffer; its length must equal `width * height`.
    pub fn from_vec(width: u32, height: u32, data: Vec<T>) -> MosaicResult<Self> {
        if data.len() != width as usize * height as usize {
            return Err(MosaicError::validation(format!(
                "plane buffer has {} samples, expected {width}x{height}",
                data.len()
            )));
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn into_vec(self) -> Vec<T> {
        self.data
    }

    pub fn get(&self, x: u32, y: u32) -> T {
        self.data[y as usize * self.width as usize + x as usize]
    }

    pub fn set(&mut self, x: u32, y: u32, v: T) {
        let w = self.width as usize;
        self.data[y as usize * w + x as usize] = v;
    }

    /// Heap footprint used for cache budgeting.
    pub fn byte_size(&self) -> usize {
        self.data.len() * std::mem::size_of::<T>()
    }
}

impl Plane<f32> {
    /// Whether `(x, y)` lies inside the pixel-center sampling domain `[-0.5, w-0.5) x [-0.5, h-0.5)`.
    #[inline]
    pub fn contains(&self, x: f64, y: f64) -> bool {
        x >= -0.5 && y >= -0.5 && x < f64::from(self.width) - 0.5 && y < f64::from(self.height) - 0.5
    }

    /// Nearest sample; the caller checks [`Plane::contains`] first.
    #[inline]
    pub fn sample_nearest(&self, x: f64, y: f64) -> f32 {
        let xi = ((x + 0.5).floor().max(0.0) as u32).min(self.width - 1);
        let yi = ((y + 0.5).floor().max(0.0) as u32).min(self.height - 1);
        self.get(xi, yi)
    }

    /// Bilinear sample with edge clamping; the caller checks [`Plane::contains`] first.
    #[inline]
    pub fn sample_bilinear(&self, x: f64, y: f64) -> f32 {
        let max_x = f64::from(self.width - 1);
        let max_y = f64::from(self.height - 1);
        let x = x.clamp(0.0, max_x);
        let y = y.clamp(0.0, max_y);
        let x0 = x.floor();
        let y0 = y.floor();
        let fx = (x - x0) as f32;
        let fy = (y - y0) as f32;
        let x0 = x0 as u32;
        let y0 = y0 as u32;
        let x1 = (x0 + 1).min(self.width - 1);
        let y1 = (y0 + 1).min(self.height - 1);

        let a = self.get(x0, y0);
        let b = self.get(x1, y0);
        let c = self.get(x0, y1);
        let d = self.get(x1, y1);
        let top = a + (b - a) * fx;
        let bottom = c + (d - c) * fx;
        top + (bottom - top) * fy
    }
}

#[cfg(test)]
#[path = "../../tests/unit/raster/plane.rs"]
mod tests;
