pub(crate) mod composite;
pub(crate) mod encode;
pub(crate) mod filter;
pub(crate) mod plane;

pub use plane::Plane;
