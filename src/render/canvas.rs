use crate::foundation::error::{MosaicError, MosaicResult};
use crate::foundation::math::clamp_u8;

/// Intensity and coverage buffers of one output channel.
#[derive(Clone, Debug, PartialEq)]
pub struct TargetChannel {
    pub intensity: Vec<f32>,
    pub coverage: Vec<u8>,
}

impl TargetChannel {
    fn new(len: usize) -> Self {
        Self {
            intensity: vec![0.0; len],
            coverage: vec![0; len],
        }
    }
}

/// Per-render working surface: one [`TargetChannel`] per requested channel name.
///
/// `None` names the tile's default channel. The first channel is primary.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkingCanvas {
    width: u32,
    height: u32,
    channels: Vec<(Option<String>, TargetChannel)>,
}

impl WorkingCanvas {
    pub fn new(width: u32, height: u32, channel_names: &[Option<String>]) -> MosaicResult<Self> {
        if width == 0 || height == 0 {
            return Err(MosaicError::validation(format!(
                "canvas must be non-empty, got {width}x{height}"
            )));
        }
        if channel_names.is_empty() {
            return Err(MosaicError::validation("canvas needs at least one channel"));
        }
        for (i, name) in channel_names.iter().enumerate() {
            if channel_names[..i].contains(name) {
                return Err(MosaicError::validation(format!(
                    "duplicate canvas channel {name:?}"
                )));
            }
        }
        let len = width as usize * height as usize;
        Ok(Self {
            width,
            height,
            channels: channel_names
                .iter()
                .map(|n| (n.clone(), TargetChannel::new(len)))
                .collect(),
        })
    }

    /// Canvas with only the default channel.
    pub fn single(width: u32, height: u32) -> MosaicResult<Self> {
        Self::new(width, height, &[None])
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channel_names(&self) -> impl Iterator<Item = Option<&str>> {
        self.channels.iter().map(|(n, _)| n.as_deref())
    }

    pub fn channel(&self, name: Option<&str>) -> Option<&TargetChannel> {
        self.channels
            .iter()
            .find(|(n, _)| n.as_deref() == name)
            .map(|(_, c)| c)
    }

    pub(crate) fn channels_mut(&mut self) -> &mut [(Option<String>, TargetChannel)] {
        &mut self.channels
    }

    /// Convert the primary channel to straight-alpha gray RGBA.
    ///
    /// Intensities map linearly from `[min, max]` onto `0..=255`. Alpha is the coverage, or with
    /// `binary_mask` 255 only where coverage is 255 and 0 elsewhere.
    pub fn to_display_rgba(
        &self,
        min: f32,
        max: f32,
        binary_mask: bool,
    ) -> MosaicResult<image::RgbaImage> {
        if !(min.is_finite() && max.is_finite() && max > min) {
            return Err(MosaicError::validation(format!(
                "display range must satisfy min < max, got [{min}, {max}]"
            )));
        }
        let (_, primary) = &self.channels[0];
        let scale = 255.0 / f64::from(max - min);
        let mut out = Vec::with_capacity(primary.intensity.len() * 4);
        for (v, c) in primary.intensity.iter().zip(&primary.coverage) {
            let g = clamp_u8((f64::from(*v) - f64::from(min)) * scale);
            let a = if binary_mask {
                if *c == 255 { 255 } else { 0 }
            } else {
                *c
            };
            out.extend_from_slice(&[g, g, g, a]);
        }
        image::RgbaImage::from_raw(self.width, self.height, out)
            .ok_or_else(|| MosaicError::evaluation("display raster size mismatch"))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/canvas.rs"]
mod tests;
