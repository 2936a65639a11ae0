pub(crate) mod copy;
pub(crate) mod fs;
pub(crate) mod store;
