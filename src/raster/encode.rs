use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use anyhow::Context;

use crate::foundation::error::{MosaicError, MosaicResult};

/// Raster file format, chosen by output extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    Png,
    Jpeg,
    Tiff,
}

impl OutputFormat {
    pub fn from_path(path: &Path) -> MosaicResult<Self> {
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "png" => Ok(Self::Png),
            "jpg" | "jpeg" => Ok(Self::Jpeg),
            "tif" | "tiff" => Ok(Self::Tiff),
            _ => Err(MosaicError::validation(format!(
                "unsupported output extension for {}",
                path.display()
            ))),
        }
    }
}

/// Encoder settings for [`save_raster`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct EncodeOptions {
    /// JPEG quality `1..=100`.
    pub quality: u8,
    /// Write a single gray channel instead of RGBA.
    pub convert_to_gray: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            quality: 85,
            convert_to_gray: false,
        }
    }
}

/// Write `img` to `path`. JPEG output drops alpha.
pub fn save_raster(img: &image::RgbaImage, path: &Path, opts: &EncodeOptions) -> MosaicResult<()> {
    let format = OutputFormat::from_path(path)?;
    if !(1..=100).contains(&opts.quality) {
        return Err(MosaicError::validation("jpeg quality must be in 1..=100"));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir {}", parent.display()))?;
    }

    let dyn_img = image::DynamicImage::ImageRgba8(img.clone());
    let dyn_img = if opts.convert_to_gray {
        image::DynamicImage::ImageLuma8(dyn_img.to_luma8())
    } else if format == OutputFormat::Jpeg {
        image::DynamicImage::ImageRgb8(dyn_img.to_rgb8())
    } else {
        dyn_img
    };

    match format {
        OutputFormat::Jpeg => {
            let file = File::create(path)
                .with_context(|| format!("create output file {}", path.display()))?;
            let mut w = BufWriter::new(file);
            let encoder =
                image::codecs::jpeg::JpegEncoder::new_with_quality(&mut w, opts.quality);
            dyn_img
                .write_with_encoder(encoder)
                .with_context(|| format!("encode jpeg {}", path.display()))?;
        }
        OutputFormat::Png => dyn_img
            .save_with_format(path, image::ImageFormat::Png)
            .with_context(|| format!("write png {}", path.display()))?,
        OutputFormat::Tiff => dyn_img
            .save_with_format(path, image::ImageFormat::Tiff)
            .with_context(|| format!("write tiff {}", path.display()))?,
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/raster/encode.rs"]
mod tests;
