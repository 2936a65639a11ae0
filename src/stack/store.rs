use crate::foundation::error::MosaicResult;
use crate::spec::bounds::TileBounds;
use crate::spec::tile::TileSpec;

/// Lifecycle state of a stack.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StackState {
    Loading,
    Complete,
}

/// Stack-level metadata.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StackMetaData {
    pub name: String,
    pub state: StackState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub derived_from: Option<String>,
}

impl StackMetaData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            state: StackState::Loading,
            derived_from: None,
        }
    }
}

/// One acquisition section within a layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SectionData {
    pub section_id: String,
    pub z: f64,
    pub tile_count: usize,
}

/// Persistent collection of stacks, each a set of z layers of tiles.
pub trait StackStore: Send + Sync {
    fn stack_metadata(&self, stack: &str) -> MosaicResult<StackMetaData>;

    /// Create (or reopen for loading) `to_stack` as a copy target of `from`.
    fn setup_derived_stack(&self, from: &StackMetaData, to_stack: &str) -> MosaicResult<()>;

    fn set_stack_state(&self, stack: &str, state: StackState) -> MosaicResult<()>;

    /// Tiles of layer `z`; empty when the layer does not exist.
    fn resolved_tiles(&self, stack: &str, z: f64) -> MosaicResult<Vec<TileSpec>>;

    /// World bounds of the tiles of layer `z`. Tiles that cannot be placed are omitted.
    fn tile_bounds(&self, stack: &str, z: f64) -> MosaicResult<Vec<TileBounds>>;

    /// Every `(section id, z)` in the stack.
    fn section_data(&self, stack: &str) -> MosaicResult<Vec<SectionData>>;

    fn delete_layer(&self, stack: &str, z: f64) -> MosaicResult<()>;

    /// Store tiles into their layers, replacing tiles with the same id.
    fn save_tiles(&self, stack: &str, tiles: &[TileSpec]) -> MosaicResult<()>;
}
