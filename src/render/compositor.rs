use std::fmt;
use std::sync::Arc;
use std::time::Instant;

use crate::assets::DecodeCache;
use crate::foundation::core::Rgba8;
use crate::foundation::error::{MosaicError, MosaicResult};
use crate::raster::Plane;
use crate::raster::composite;
use crate::raster::filter::apply_default_filters;
use crate::render::canvas::{TargetChannel, WorkingCanvas};
use crate::render::lod::{best_mipmap_level, sample_average_scale};
use crate::render::mapper::{MapperKind, SourceChannel};
use crate::render::mapping::map_mesh;
use crate::render::mesh::{GridMeshBuilder, MeshBuilder};
use crate::spec::tile::{ChannelSpec, MipmapEntry, TileSpec};
use crate::transform::{TransformList, create_render_transform, scale_level_transform};

/// Viewport and pipeline options for one render call.
///
/// The viewport size comes from the destination canvas. `x`/`y` are the world coordinates of the
/// viewport origin before scaling. `mesh_cell_size` is measured in full-resolution source pixels.
#[derive(Clone, Debug, PartialEq)]
pub struct RenderParams {
    pub x: f64,
    pub y: f64,
    pub scale: f64,
    pub mesh_cell_size: f64,
    pub threads: usize,
    pub area_offset: bool,
    pub skip_interpolation: bool,
    pub filter: bool,
    pub binary_mask: bool,
    pub exclude_mask: bool,
    pub background: Option<Rgba8>,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            x: 0.0,
            y: 0.0,
            scale: 1.0,
            mesh_cell_size: 64.0,
            threads: 1,
            area_offset: false,
            skip_interpolation: false,
            filter: false,
            binary_mask: false,
            exclude_mask: false,
            background: None,
        }
    }
}

impl RenderParams {
    pub fn with_origin(mut self, x: f64, y: f64) -> Self {
        self.x = x;
        self.y = y;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_mesh_cell_size(mut self, mesh_cell_size: f64) -> Self {
        self.mesh_cell_size = mesh_cell_size;
        self
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_area_offset(mut self, on: bool) -> Self {
        self.area_offset = on;
        self
    }

    pub fn with_skip_interpolation(mut self, on: bool) -> Self {
        self.skip_interpolation = on;
        self
    }

    pub fn with_filter(mut self, on: bool) -> Self {
        self.filter = on;
        self
    }

    pub fn with_binary_mask(mut self, on: bool) -> Self {
        self.binary_mask = on;
        self
    }

    pub fn with_exclude_mask(mut self, on: bool) -> Self {
        self.exclude_mask = on;
        self
    }

    pub fn with_background(mut self, color: Option<Rgba8>) -> Self {
        self.background = color;
        self
    }

    pub fn validate(&self) -> MosaicResult<()> {
        if !(self.x.is_finite() && self.y.is_finite()) {
            return Err(MosaicError::validation("render origin must be finite"));
        }
        if !(self.scale.is_finite() && self.scale > 0.0) {
            return Err(MosaicError::validation("render scale must be finite and > 0"));
        }
        if !(self.mesh_cell_size.is_finite() && self.mesh_cell_size > 0.0) {
            return Err(MosaicError::validation(
                "mesh cell size must be finite and > 0",
            ));
        }
        if self.threads == 0 {
            return Err(MosaicError::validation("render 'threads' must be >= 1"));
        }
        Ok(())
    }
}

/// Why a tile (or part of it) was not painted.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase", tag = "reason")]
pub enum SkipReason {
    /// None of the canvas channels exist on the tile.
    NoMatchingChannel,
    /// The primary channel has no mipmap entries.
    NoImage,
    /// The chosen mipmap decoded to zero width or height.
    ZeroSizeMipmap,
    /// A mask was dropped because its size differs from its image.
    MaskSizeMismatch { channel: Option<String> },
    /// A secondary channel was dropped because its size differs from the primary channel.
    ChannelSizeMismatch { channel: Option<String> },
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoMatchingChannel => f.write_str("no matching channel"),
            Self::NoImage => f.write_str("no mipmap entries"),
            Self::ZeroSizeMipmap => f.write_str("zero-size mipmap"),
            Self::MaskSizeMismatch { channel } => write!(f, "mask size mismatch ({channel:?})"),
            Self::ChannelSizeMismatch { channel } => {
                write!(f, "channel size mismatch ({channel:?})")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipEvent {
    pub tile_id: String,
    #[serde(flatten)]
    pub reason: SkipReason,
}

/// Outcome summary of a render call.
#[derive(Clone, Debug, Default, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderStats {
    pub tiles_total: usize,
    pub tiles_rendered: usize,
    pub skipped: Vec<SkipEvent>,
    /// Decode cache entries after the call.
    pub cache_size: usize,
}

impl RenderStats {
    fn skip(&mut self, tile_id: &str, reason: SkipReason) {
        tracing::debug!(tile_id, %reason, "skipping");
        self.skipped.push(SkipEvent {
            tile_id: tile_id.to_owned(),
            reason,
        });
    }
}

/// Tile-to-raster compositor.
///
/// Tiles paint sequentially in input order; each tile's rasterization runs on the compositor's own
/// thread pool and completes before the next tile starts.
pub struct Compositor<'a> {
    params: RenderParams,
    cache: &'a dyn DecodeCache,
    mesh_builder: Box<dyn MeshBuilder>,
    pool: rayon::ThreadPool,
}

impl fmt::Debug for Compositor<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Compositor")
            .field("params", &self.params)
            .field("mesh_builder", &self.mesh_builder)
            .field("threads", &self.pool.current_num_threads())
            .finish()
    }
}

impl<'a> Compositor<'a> {
    pub fn new(params: RenderParams, cache: &'a dyn DecodeCache) -> MosaicResult<Self> {
        params.validate()?;
        let pool = build_thread_pool(params.threads)?;
        Ok(Self {
            params,
            cache,
            mesh_builder: Box::new(GridMeshBuilder),
            pool,
        })
    }

    pub fn with_mesh_builder(mut self, builder: impl MeshBuilder + 'static) -> Self {
        self.mesh_builder = Box::new(builder);
        self
    }

    pub fn params(&self) -> &RenderParams {
        &self.params
    }

    /// Paint `tiles` into every matching channel of `canvas`.
    #[tracing::instrument(skip(self, tiles, canvas), fields(tiles = tiles.len()))]
    pub fn render_channels(
        &self,
        tiles: &[TileSpec],
        canvas: &mut WorkingCanvas,
    ) -> MosaicResult<RenderStats> {
        let mut stats = RenderStats {
            tiles_total: tiles.len(),
            ..RenderStats::default()
        };
        for tile in tiles {
            if self.render_tile(tile, canvas, &mut stats)? {
                stats.tiles_rendered += 1;
            }
        }
        stats.cache_size = self.cache.size();
        Ok(stats)
    }

    /// Render the default channel and draw it over `dst` as gray RGBA.
    ///
    /// With a background color the destination is cleared to it first.
    #[tracing::instrument(skip(self, tiles, dst), fields(tiles = tiles.len()))]
    pub fn render_to_raster(
        &self,
        tiles: &[TileSpec],
        dst: &mut image::RgbaImage,
    ) -> MosaicResult<RenderStats> {
        let (w, h) = dst.dimensions();
        if w == 0 || h == 0 {
            return Err(MosaicError::validation(format!(
                "destination raster must be non-empty, got {w}x{h}"
            )));
        }
        let mut canvas = WorkingCanvas::single(w, h)?;
        let stats = self.render_channels(tiles, &mut canvas)?;
        let raster = canvas.to_display_rgba(0.0, 255.0, self.params.binary_mask)?;
        if let Some(bg) = self.params.background {
            composite::clear(dst, bg);
        }
        composite::draw_over(dst, &raster)?;
        Ok(stats)
    }

    fn render_tile(
        &self,
        tile: &TileSpec,
        canvas: &mut WorkingCanvas,
        stats: &mut RenderStats,
    ) -> MosaicResult<bool> {
        let started = Instant::now();
        let p = &self.params;

        // The unnamed canvas channel falls back to the tile's first channel unless that one is
        // requested by name.
        let names: Vec<Option<&str>> = canvas.channel_names().collect();
        let matched: Vec<(usize, &ChannelSpec)> = names
            .iter()
            .enumerate()
            .filter_map(|(i, &name)| {
                let channel = match name {
                    Some(_) => tile.channel(name),
                    None => tile
                        .default_channel()
                        .filter(|c| c.name.is_none() || !names.contains(&c.name.as_deref())),
                };
                channel.map(|c| (i, c))
            })
            .collect();
        let Some(&(primary_idx, primary)) = matched.first() else {
            stats.skip(&tile.tile_id, SkipReason::NoMatchingChannel);
            return Ok(false);
        };

        let composed =
            create_render_transform(&tile.transform_list()?, p.area_offset, p.scale, p.x, p.y);

        // Tiles without dimensions are measured from their lowest stored level.
        let mut probe: Option<(&str, Arc<Plane<f32>>)> = None;
        let (width, height) = match (tile.width, tile.height) {
            (Some(w), Some(h)) => (f64::from(w), f64::from(h)),
            _ => {
                let Some(first) = primary.first_mipmap_entry() else {
                    stats.skip(&tile.tile_id, SkipReason::NoImage);
                    return Ok(false);
                };
                let plane = self.cache.get(&first.source.image_url, 0, false)?;
                let scale = f64::from(1u32 << first.level.min(31));
                let dims = (
                    f64::from(plane.width()) * scale,
                    f64::from(plane.height()) * scale,
                );
                probe = Some((first.source.image_url.as_str(), plane));
                dims
            }
        };

        let s = sample_average_scale(&composed, width, height, p.mesh_cell_size);
        let mut level = best_mipmap_level(s);
        let Some(entry) = primary.floor_mipmap_entry(level) else {
            stats.skip(&tile.tile_id, SkipReason::NoImage);
            return Ok(false);
        };
        level = level.max(entry.level);

        let image = match probe {
            Some((url, plane)) if url == entry.source.image_url && entry.downsample == 0 => plane,
            _ => self
                .cache
                .get(&entry.source.image_url, entry.downsample, false)?,
        };
        if image.is_empty() {
            stats.skip(&tile.tile_id, SkipReason::ZeroSizeMipmap);
            return Ok(false);
        }
        let image = if p.filter {
            let mut filtered = (*image).clone();
            apply_default_filters(&mut filtered, level, &tile.tile_id);
            Arc::new(filtered)
        } else {
            image
        };
        let dims = image.dimensions();
        let mask = self.load_mask(tile, primary.name.as_deref(), &entry, dims, stats)?;

        let mut sources = vec![SourceChannel { image, mask }];
        let mut target_indices = vec![primary_idx];
        for &(idx, channel) in &matched[1..] {
            let Some(e) = channel.floor_mipmap_entry(level) else {
                stats.skip(
                    &tile.tile_id,
                    SkipReason::ChannelSizeMismatch {
                        channel: channel.name.clone(),
                    },
                );
                continue;
            };
            let img = self.cache.get(&e.source.image_url, e.downsample, false)?;
            if img.dimensions() != dims {
                stats.skip(
                    &tile.tile_id,
                    SkipReason::ChannelSizeMismatch {
                        channel: channel.name.clone(),
                    },
                );
                continue;
            }
            let mask = self.load_mask(tile, channel.name.as_deref(), &e, dims, stats)?;
            sources.push(SourceChannel { image: img, mask });
            target_indices.push(idx);
        }

        let kind = select_mapper(&sources, p.binary_mask);

        let mut mipmap_transform = TransformList::new();
        mipmap_transform.push(scale_level_transform(level));
        mipmap_transform.extend_from(&composed);
        let columns = (width / p.mesh_cell_size).round().max(1.0);
        let mesh = self.mesh_builder.build_mesh(
            &mipmap_transform,
            f64::from(dims.0) / columns,
            f64::from(dims.0),
            f64::from(dims.1),
        )?;

        let (cw, ch) = (canvas.width(), canvas.height());
        let mut targets: Vec<&mut TargetChannel> = canvas
            .channels_mut()
            .iter_mut()
            .enumerate()
            .filter(|(i, _)| target_indices.contains(i))
            .map(|(_, (_, t))| t)
            .collect();
        map_mesh(
            &mesh,
            &sources,
            &mut targets,
            cw,
            ch,
            kind,
            !p.skip_interpolation,
            &self.pool,
        )?;

        tracing::debug!(
            tile_id = %tile.tile_id,
            level,
            downsample = entry.downsample,
            ?kind,
            triangles = mesh.triangles().len(),
            elapsed_ms = started.elapsed().as_secs_f64() * 1000.0,
            "rendered tile"
        );
        Ok(true)
    }

    fn load_mask(
        &self,
        tile: &TileSpec,
        channel: Option<&str>,
        entry: &MipmapEntry<'_>,
        dims: (u32, u32),
        stats: &mut RenderStats,
    ) -> MosaicResult<Option<Arc<Plane<f32>>>> {
        if self.params.exclude_mask {
            return Ok(None);
        }
        let Some(url) = entry.source.mask_url.as_deref() else {
            return Ok(None);
        };
        let mask = self.cache.get(url, entry.downsample, true)?;
        if mask.dimensions() != dims {
            tracing::warn!(
                tile_id = %tile.tile_id,
                image = ?dims,
                mask = ?mask.dimensions(),
                "removing mask because image and mask differ in size"
            );
            stats.skipped.push(SkipEvent {
                tile_id: tile.tile_id.clone(),
                reason: SkipReason::MaskSizeMismatch {
                    channel: channel.map(str::to_owned),
                },
            });
            return Ok(None);
        }
        Ok(Some(mask))
    }
}

/// Mapper for the channels left after matching; the primary channel's mask sets the policy.
fn select_mapper(sources: &[SourceChannel], binary_mask: bool) -> MapperKind {
    let has_mask = sources.first().is_some_and(|s| s.mask.is_some());
    MapperKind::select(sources.len(), has_mask, binary_mask)
}

fn build_thread_pool(threads: usize) -> MosaicResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(MosaicError::validation("render 'threads' must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build()
        .map_err(|e| MosaicError::evaluation(format!("failed to build rayon thread pool: {e}")))
}

#[cfg(test)]
#[path = "../../tests/unit/render/compositor.rs"]
mod tests;
