pub(crate) mod bounds;
pub(crate) mod rtree;
pub(crate) mod tile;
