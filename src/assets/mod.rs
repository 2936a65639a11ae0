pub(crate) mod cache;
pub(crate) mod decode;

pub use cache::{DecodeCache, TileImageCache, UncachedImageLoader};
