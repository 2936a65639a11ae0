use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::foundation::error::{MosaicError, MosaicResult};
use crate::spec::bounds::TileBounds;
use crate::spec::tile::TileSpec;
use crate::stack::store::{SectionData, StackMetaData, StackState, StackStore};

const METADATA_FILE: &str = "stack.json";
const BOUNDS_MESH_CELL_SIZE: f64 = 64.0;

/// Directory-backed [`StackStore`]: `<root>/<stack>/stack.json` plus one `z_<z>.json` per layer.
#[derive(Clone, Debug)]
pub struct FsStackStore {
    root: PathBuf,
}

impl FsStackStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write fresh metadata for `name`, keeping any existing layers.
    pub fn create_stack(&self, name: &str) -> MosaicResult<StackMetaData> {
        let meta = StackMetaData::new(name);
        self.write_metadata(&meta)?;
        Ok(meta)
    }

    /// Layer z values present on disk, ascending.
    pub fn layer_z_values(&self, stack: &str) -> MosaicResult<Vec<f64>> {
        let dir = self.stack_dir(stack)?;
        let mut out = Vec::new();
        let entries =
            std::fs::read_dir(&dir).with_context(|| format!("list stack dir {}", dir.display()))?;
        for entry in entries {
            let entry = entry.with_context(|| format!("list stack dir {}", dir.display()))?;
            let name = entry.file_name();
            let Some(z) = name
                .to_str()
                .and_then(|n| n.strip_prefix("z_"))
                .and_then(|n| n.strip_suffix(".json"))
                .and_then(|n| n.parse::<f64>().ok())
            else {
                continue;
            };
            out.push(z);
        }
        out.sort_by(f64::total_cmp);
        Ok(out)
    }

    fn stack_dir(&self, stack: &str) -> MosaicResult<PathBuf> {
        if stack.is_empty()
            || stack.contains(['/', '\\'])
            || stack == "."
            || stack == ".."
        {
            return Err(MosaicError::validation(format!(
                "invalid stack name '{stack}'"
            )));
        }
        Ok(self.root.join(stack))
    }

    fn layer_path(&self, stack: &str, z: f64) -> MosaicResult<PathBuf> {
        if !z.is_finite() {
            return Err(MosaicError::validation("layer z must be finite"));
        }
        Ok(self.stack_dir(stack)?.join(format!("z_{z}.json")))
    }

    fn write_metadata(&self, meta: &StackMetaData) -> MosaicResult<()> {
        let dir = self.stack_dir(&meta.name)?;
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create stack dir {}", dir.display()))?;
        write_json(&dir.join(METADATA_FILE), meta)
    }

    fn write_layer(&self, stack: &str, z: f64, tiles: &[TileSpec]) -> MosaicResult<()> {
        write_json(&self.layer_path(stack, z)?, &tiles)
    }
}

fn write_json<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> MosaicResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    std::fs::write(path, bytes).with_context(|| format!("write {}", path.display()))?;
    Ok(())
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> MosaicResult<T> {
    let bytes = std::fs::read(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| MosaicError::serde(format!("{}: {e}", path.display())))
}

impl StackStore for FsStackStore {
    fn stack_metadata(&self, stack: &str) -> MosaicResult<StackMetaData> {
        let path = self.stack_dir(stack)?.join(METADATA_FILE);
        if !path.exists() {
            return Err(MosaicError::validation(format!(
                "stack '{stack}' does not exist under {}",
                self.root.display()
            )));
        }
        read_json(&path)
    }

    fn setup_derived_stack(&self, from: &StackMetaData, to_stack: &str) -> MosaicResult<()> {
        let meta = StackMetaData {
            name: to_stack.to_owned(),
            state: StackState::Loading,
            derived_from: Some(from.name.clone()),
        };
        self.write_metadata(&meta)
    }

    fn set_stack_state(&self, stack: &str, state: StackState) -> MosaicResult<()> {
        let mut meta = self.stack_metadata(stack)?;
        meta.state = state;
        self.write_metadata(&meta)
    }

    fn resolved_tiles(&self, stack: &str, z: f64) -> MosaicResult<Vec<TileSpec>> {
        let path = self.layer_path(stack, z)?;
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_json(&path)
    }

    fn tile_bounds(&self, stack: &str, z: f64) -> MosaicResult<Vec<TileBounds>> {
        let mut out = Vec::new();
        for tile in self.resolved_tiles(stack, z)? {
            if !tile.has_dimensions() {
                tracing::warn!(
                    stack,
                    z,
                    tile_id = %tile.tile_id,
                    "tile has no dimensions, leaving it out of layer bounds"
                );
                continue;
            }
            out.push(tile.derive_bounds(BOUNDS_MESH_CELL_SIZE)?);
        }
        Ok(out)
    }

    fn section_data(&self, stack: &str) -> MosaicResult<Vec<SectionData>> {
        let mut counts: BTreeMap<(u64, String), (f64, usize)> = BTreeMap::new();
        for z in self.layer_z_values(stack)? {
            for tile in self.resolved_tiles(stack, z)? {
                let Some(section_id) = tile.section_id() else {
                    continue;
                };
                let tile_z = tile.z.unwrap_or(z);
                counts
                    .entry((tile_z.to_bits(), section_id.to_owned()))
                    .or_insert((tile_z, 0))
                    .1 += 1;
            }
        }
        Ok(counts
            .into_iter()
            .map(|((_, section_id), (z, tile_count))| SectionData {
                section_id,
                z,
                tile_count,
            })
            .collect())
    }

    fn delete_layer(&self, stack: &str, z: f64) -> MosaicResult<()> {
        let path = self.layer_path(stack, z)?;
        if path.exists() {
            std::fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        }
        Ok(())
    }

    fn save_tiles(&self, stack: &str, tiles: &[TileSpec]) -> MosaicResult<()> {
        let dir = self.stack_dir(stack)?;
        if !dir.join(METADATA_FILE).exists() {
            return Err(MosaicError::validation(format!(
                "stack '{stack}' must be set up before saving tiles"
            )));
        }
        let mut by_z: BTreeMap<u64, (f64, Vec<&TileSpec>)> = BTreeMap::new();
        for tile in tiles {
            let z = tile.z.ok_or_else(|| {
                MosaicError::validation(format!("tile '{}' has no z", tile.tile_id))
            })?;
            by_z.entry(z.to_bits()).or_insert((z, Vec::new())).1.push(tile);
        }
        for (z, new_tiles) in by_z.into_values() {
            let mut layer = self.resolved_tiles(stack, z)?;
            for tile in new_tiles {
                match layer.iter_mut().find(|t| t.tile_id == tile.tile_id) {
                    Some(existing) => *existing = tile.clone(),
                    None => layer.push(tile.clone()),
                }
            }
            self.write_layer(stack, z, &layer)?;
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/stack/fs.rs"]
mod tests;
