pub(crate) mod canvas;
pub(crate) mod compositor;
pub(crate) mod lod;
pub(crate) mod mapper;
pub(crate) mod mapping;
pub(crate) mod mesh;
