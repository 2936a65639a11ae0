//! tilemosaic composites thousands of individually transformed image tiles into a raster viewport
//! and indexes tiles spatially for overlap and neighbor queries.
//!
//! # Pipeline overview
//!
//! For every tile, in input order:
//!
//! 1. **Compose**: `tile transforms + viewport scale/offset -> TransformList`
//! 2. **Pick a level**: sample the composed transform's scale and choose the coarsest mipmap level
//!    that does not under-sample the output
//! 3. **Load**: decode the image (and mask) of every matching channel through a [`DecodeCache`]
//! 4. **Mesh**: triangulate the mipmap-adjusted transform ([`MeshBuilder`], default
//!    [`GridMeshBuilder`])
//! 5. **Map**: rasterize the mesh into a [`WorkingCanvas`] on a worker pool through one of six
//!    pixel mappers
//!
//! The canvas can then be converted into a display raster and drawn over an `image::RgbaImage`
//! ([`Compositor::render_to_raster`]).
//!
//! Independently, [`TileBoundsRTree`] indexes the bounding boxes of one layer for box, circle and
//! cross-layer neighbor-pair queries. The [`CopyStack`] workflow copies layers between
//! [`StackStore`]s, optionally cropping, restaging and splitting merged sections.
//!
//! - **No unsafe**: `unsafe` is forbidden in this crate.
//! - **Deterministic**: identical inputs produce byte-identical rasters, filters included.
//! - **No global state**: the decode cache is injected into each compositor.
#![forbid(unsafe_code)]

mod assets;
mod foundation;
mod raster;
mod render;
mod spec;
mod stack;

/// Coordinate transforms, their JSON catalog and viewport helpers.
pub mod transform;

pub use assets::decode::{decode_plane, downsample, load_plane, resolve_path};
pub use assets::{DecodeCache, TileImageCache, UncachedImageLoader};
pub use foundation::core::{Affine, Point, Rect, Rgba8, Vec2};
pub use foundation::error::{MosaicError, MosaicResult};
pub use raster::Plane;
pub use raster::composite::{StraightRgba8, clear, draw_over, over};
pub use raster::encode::{EncodeOptions, OutputFormat, save_raster};
pub use raster::filter::{DEFAULT_FILTERS, Filter, apply_default_filters};
pub use render::canvas::{TargetChannel, WorkingCanvas};
pub use render::compositor::{Compositor, RenderParams, RenderStats, SkipEvent, SkipReason};
pub use render::lod::{best_mipmap_level, sample_average_scale};
pub use render::mapper::{MapperKind, MaskPolicy, SourceChannel, write_pixel};
pub use render::mapping::map_mesh;
pub use render::mesh::{GridMeshBuilder, MeshBuilder, MeshTriangle, TransformMesh};
pub use spec::bounds::{TileBounds, TileIdPair};
pub use spec::rtree::TileBoundsRTree;
pub use spec::tile::{ChannelSpec, ImageAndMask, LayoutData, MipmapEntry, TileSpec};
pub use stack::copy::{CopyStack, CopyStackParams, LayerBounds, LayerCopy, section_to_integral_z};
pub use stack::fs::FsStackStore;
pub use stack::store::{SectionData, StackMetaData, StackState, StackStore};
pub use transform::{
    CoordinateTransform, Polynomial2D, TransformList, TransformSpec, create_render_transform,
    scale_and_offset, scale_level_transform, transform_list,
};
