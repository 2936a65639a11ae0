use std::collections::BTreeMap;

use crate::assets::DecodeCache;
use crate::foundation::core::Point;
use crate::foundation::error::{MosaicError, MosaicResult};
use crate::spec::bounds::TileBounds;
use crate::transform::{CoordinateTransform, TransformList, TransformSpec, transform_list};

/// Acquisition layout of a tile.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutData {
    #[serde(default)]
    pub section_id: Option<String>,
    #[serde(default)]
    pub stage_x: Option<f64>,
    #[serde(default)]
    pub stage_y: Option<f64>,
}

/// Image URL of one mipmap level plus its optional mask.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageAndMask {
    pub image_url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mask_url: Option<String>,
}

/// Result of a floor lookup into a channel's mipmap pyramid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MipmapEntry<'a> {
    /// Level actually stored.
    pub level: u32,
    /// Extra power-of-two reduction needed after decode to reach the requested level.
    pub downsample: u32,
    pub source: &'a ImageAndMask,
}

/// One named (or default) channel of a tile.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub mipmap_levels: BTreeMap<u32, ImageAndMask>,
}

impl ChannelSpec {
    pub fn new(name: Option<String>) -> Self {
        Self {
            name,
            mipmap_levels: BTreeMap::new(),
        }
    }

    pub fn with_level(mut self, level: u32, image_url: &str, mask_url: Option<&str>) -> Self {
        self.mipmap_levels.insert(
            level,
            ImageAndMask {
                image_url: image_url.to_owned(),
                mask_url: mask_url.map(str::to_owned),
            },
        );
        self
    }

    /// Lowest stored level.
    pub fn first_mipmap_entry(&self) -> Option<MipmapEntry<'_>> {
        self.mipmap_levels
            .iter()
            .next()
            .map(|(level, source)| MipmapEntry {
                level: *level,
                downsample: 0,
                source,
            })
    }

    /// Entry at `level`, else the nearest finer stored level with the residual downsample.
    ///
    /// When only coarser levels exist the lowest one is returned with zero residual.
    pub fn floor_mipmap_entry(&self, level: u32) -> Option<MipmapEntry<'_>> {
        match self.mipmap_levels.range(..=level).next_back() {
            Some((found, source)) => Some(MipmapEntry {
                level: *found,
                downsample: level - *found,
                source,
            }),
            None => self.first_mipmap_entry(),
        }
    }
}

/// Render metadata for one tile.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TileSpec {
    pub tile_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout: Option<LayoutData>,
    #[serde(default)]
    pub transforms: Vec<TransformSpec>,
    pub channels: Vec<ChannelSpec>,
}

impl TileSpec {
    pub fn new(tile_id: impl Into<String>) -> Self {
        Self {
            tile_id: tile_id.into(),
            z: None,
            width: None,
            height: None,
            layout: None,
            transforms: Vec::new(),
            channels: Vec::new(),
        }
    }

    pub fn has_dimensions(&self) -> bool {
        matches!((self.width, self.height), (Some(w), Some(h)) if w > 0 && h > 0)
    }

    /// Channel named `name`; `None` selects the unnamed (default) channel.
    pub fn channel(&self, name: Option<&str>) -> Option<&ChannelSpec> {
        self.channels.iter().find(|c| c.name.as_deref() == name)
    }

    /// Unnamed channel, else the first one.
    pub fn default_channel(&self) -> Option<&ChannelSpec> {
        self.channel(None).or_else(|| self.channels.first())
    }

    pub fn section_id(&self) -> Option<&str> {
        self.layout.as_ref().and_then(|l| l.section_id.as_deref())
    }

    /// Evaluable transform chain.
    pub fn transform_list(&self) -> MosaicResult<TransformList> {
        transform_list(&self.transforms)
    }

    /// Replace the last transform (or append one) with a translation to the stage position.
    pub fn replace_last_transform_with_stage(&mut self) -> MosaicResult<()> {
        let layout = self.layout.as_ref();
        let (Some(x), Some(y)) = (
            layout.and_then(|l| l.stage_x),
            layout.and_then(|l| l.stage_y),
        ) else {
            return Err(MosaicError::validation(format!(
                "tile '{}' has no stage coordinates",
                self.tile_id
            )));
        };
        self.transforms.pop();
        self.transforms.push(TransformSpec::stage(x, y));
        Ok(())
    }

    /// Fill in undefined width/height from the lowest-level image of the default channel.
    pub fn derive_dimensions(&mut self, cache: &dyn DecodeCache) -> MosaicResult<()> {
        if self.has_dimensions() {
            return Ok(());
        }
        let entry = self
            .default_channel()
            .and_then(ChannelSpec::first_mipmap_entry)
            .ok_or_else(|| {
                MosaicError::validation(format!("tile '{}' has no images", self.tile_id))
            })?;
        let level = entry.level;
        let plane = cache.get(&entry.source.image_url, 0, false)?;
        let (Some(w), Some(h)) = (
            full_resolution_len(plane.width(), level),
            full_resolution_len(plane.height(), level),
        ) else {
            return Err(MosaicError::validation(format!(
                "tile '{}' level {level} image of {}x{} overflows full-resolution dimensions",
                self.tile_id,
                plane.width(),
                plane.height()
            )));
        };
        self.width = Some(w);
        self.height = Some(h);
        Ok(())
    }

    /// World-space bounds of the transformed tile.
    ///
    /// The border is sampled every `mesh_cell_size` source pixels (plus the corners), so bounds of
    /// non-linear tiles are approximate to that spacing.
    pub fn derive_bounds(&self, mesh_cell_size: f64) -> MosaicResult<TileBounds> {
        let (Some(w), Some(h)) = (self.width, self.height) else {
            return Err(MosaicError::validation(format!(
                "tile '{}' has undefined dimensions",
                self.tile_id
            )));
        };
        if !(mesh_cell_size.is_finite() && mesh_cell_size > 0.0) {
            return Err(MosaicError::validation("mesh cell size must be > 0"));
        }
        let transform = self.transform_list()?;
        let (w, h) = (f64::from(w), f64::from(h));

        let mut min = Point::new(f64::INFINITY, f64::INFINITY);
        let mut max = Point::new(f64::NEG_INFINITY, f64::NEG_INFINITY);
        let mut include = |p: Point| {
            let q = transform.apply(p);
            min = Point::new(min.x.min(q.x), min.y.min(q.y));
            max = Point::new(max.x.max(q.x), max.y.max(q.y));
        };
        for t in border_steps(w, mesh_cell_size) {
            include(Point::new(t, 0.0));
            include(Point::new(t, h));
        }
        for t in border_steps(h, mesh_cell_size) {
            include(Point::new(0.0, t));
            include(Point::new(w, t));
        }
        if !(min.x.is_finite() && min.y.is_finite() && max.x.is_finite() && max.y.is_finite()) {
            return Err(MosaicError::evaluation(format!(
                "tile '{}' transform produced non-finite bounds",
                self.tile_id
            )));
        }
        Ok(TileBounds::new(
            self.tile_id.clone(),
            min.x,
            min.y,
            max.x,
            max.y,
            self.z.unwrap_or(0.0),
        ))
    }
}

/// Extent at level 0 of `len` pixels stored at mipmap `level`; `None` when it does not fit `u32`.
fn full_resolution_len(len: u32, level: u32) -> Option<u32> {
    1u32.checked_shl(level).and_then(|f| len.checked_mul(f))
}

fn border_steps(len: f64, step: f64) -> impl Iterator<Item = f64> {
    let n = (len / step).ceil().max(1.0) as usize;
    (0..=n).map(move |i| (i as f64 * step).min(len))
}

#[cfg(test)]
#[path = "../../tests/unit/spec/tile.rs"]
mod tests;
