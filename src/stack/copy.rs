//! Copy layers between stacks, optionally cropping, restaging and splitting merged sections.

use std::collections::{HashMap, HashSet};

use crate::foundation::error::{MosaicError, MosaicResult};
use crate::spec::rtree::TileBoundsRTree;
use crate::stack::store::{SectionData, StackState, StackStore};

/// First synthetic z when every real z is below [`SPLIT_Z_THRESHOLD`].
const SPLIT_FIRST_Z: i64 = 100_000;
const SPLIT_Z_THRESHOLD: f64 = 50_000.0;

/// Axis-aligned crop applied to every copied layer.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayerBounds {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl LayerBounds {
    /// All four values or none.
    pub fn from_parts(
        min_x: Option<f64>,
        min_y: Option<f64>,
        max_x: Option<f64>,
        max_y: Option<f64>,
    ) -> MosaicResult<Option<Self>> {
        match (min_x, min_y, max_x, max_y) {
            (None, None, None, None) => Ok(None),
            (Some(min_x), Some(min_y), Some(max_x), Some(max_y)) => {
                if !(min_x <= max_x && min_y <= max_y) {
                    return Err(MosaicError::validation(format!(
                        "layer bounds are inverted: ({min_x}, {min_y}) - ({max_x}, {max_y})"
                    )));
                }
                Ok(Some(Self {
                    min_x,
                    min_y,
                    max_x,
                    max_y,
                }))
            }
            _ => Err(MosaicError::validation(
                "layer bounds need all of min x, min y, max x and max y",
            )),
        }
    }
}

/// Options for [`CopyStack`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CopyStackParams {
    pub from_stack: String,
    pub to_stack: String,
    pub z_values: Vec<f64>,
    pub layer_bounds: Option<LayerBounds>,
    pub keep_existing: bool,
    pub complete_to_stack_after_copy: bool,
    pub replace_last_transform_with_stage: bool,
    pub split_merged_sections: bool,
}

/// Result of copying one source layer.
#[derive(Clone, Debug, PartialEq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerCopy {
    pub z: f64,
    pub tiles_copied: usize,
    pub tiles_outside_bounds: usize,
    pub target_z_values: Vec<f64>,
}

/// Stack copy between two stores (which may be the same store).
pub struct CopyStack<'a> {
    params: CopyStackParams,
    from: &'a dyn StackStore,
    to: &'a dyn StackStore,
    section_z: Option<HashMap<(String, u64), i64>>,
}

impl<'a> CopyStack<'a> {
    pub fn new(
        params: CopyStackParams,
        from: &'a dyn StackStore,
        to: &'a dyn StackStore,
    ) -> MosaicResult<Self> {
        if params.from_stack.is_empty() || params.to_stack.is_empty() {
            return Err(MosaicError::validation("from and to stack names are required"));
        }
        if params.z_values.is_empty() {
            return Err(MosaicError::validation("at least one z value is required"));
        }
        let section_z = if params.split_merged_sections {
            Some(section_to_integral_z(from.section_data(&params.from_stack)?))
        } else {
            None
        };
        Ok(Self {
            params,
            from,
            to,
            section_z,
        })
    }

    /// Set up the target stack, copy every requested layer and optionally complete the target.
    #[tracing::instrument(
        skip(self),
        fields(from = %self.params.from_stack, to = %self.params.to_stack)
    )]
    pub fn run(&self) -> MosaicResult<Vec<LayerCopy>> {
        self.set_up_derived_stack()?;
        let mut out = Vec::with_capacity(self.params.z_values.len());
        for &z in &self.params.z_values {
            out.push(self.copy_layer(z)?);
        }
        if self.params.complete_to_stack_after_copy {
            self.complete_to_stack()?;
        }
        Ok(out)
    }

    pub fn set_up_derived_stack(&self) -> MosaicResult<()> {
        let meta = self.from.stack_metadata(&self.params.from_stack)?;
        self.to.setup_derived_stack(&meta, &self.params.to_stack)
    }

    pub fn complete_to_stack(&self) -> MosaicResult<()> {
        self.to
            .set_stack_state(&self.params.to_stack, StackState::Complete)
    }

    pub fn copy_layer(&self, z: f64) -> MosaicResult<LayerCopy> {
        let p = &self.params;
        let mut tiles = self.from.resolved_tiles(&p.from_stack, z)?;

        let mut tiles_outside_bounds = 0;
        if let Some(b) = p.layer_bounds {
            let bounds = self.from.tile_bounds(&p.from_stack, z)?;
            let tree = TileBoundsRTree::new(bounds);
            let keep: HashSet<&str> = tree
                .find_tiles_in_box(b.min_x, b.min_y, b.max_x, b.max_y)
                .into_iter()
                .map(|t| t.tile_id.as_str())
                .collect();
            let before = tiles.len();
            tiles.retain(|t| keep.contains(t.tile_id.as_str()));
            tiles_outside_bounds = before - tiles.len();
            if tiles_outside_bounds > 0 {
                tracing::info!(
                    z,
                    removed = tiles_outside_bounds,
                    "removed tiles outside of bounding box"
                );
            }
        }

        if p.replace_last_transform_with_stage {
            for tile in &mut tiles {
                tile.replace_last_transform_with_stage()?;
            }
            tracing::info!(z, tiles = tiles.len(), "replaced last transform with stage");
        }

        let mut target_z_values: Vec<f64> = Vec::new();
        match &self.section_z {
            Some(section_z) => {
                for tile in &mut tiles {
                    let section_id = tile.section_id().ok_or_else(|| {
                        MosaicError::validation(format!(
                            "tile '{}' has no section id",
                            tile.tile_id
                        ))
                    })?;
                    let tile_z = tile.z.unwrap_or(z);
                    let new_z = *section_z
                        .get(&(section_id.to_owned(), tile_z.to_bits()))
                        .ok_or_else(|| {
                            MosaicError::validation(format!(
                                "tile '{}' has unknown section '{section_id}' at z {tile_z}",
                                tile.tile_id
                            ))
                        })? as f64;
                    tile.z = Some(new_z);
                    if !target_z_values.contains(&new_z) {
                        target_z_values.push(new_z);
                    }
                }
                tracing::info!(z, tiles = tiles.len(), "updated z values for split sections");
            }
            None => {
                for tile in &mut tiles {
                    tile.z.get_or_insert(z);
                }
                target_z_values.push(z);
            }
        }

        if !p.keep_existing {
            for &tz in &target_z_values {
                self.to.delete_layer(&p.to_stack, tz)?;
            }
        }
        self.to.save_tiles(&p.to_stack, &tiles)?;

        tracing::info!(z, tiles = tiles.len(), "copied layer");
        Ok(LayerCopy {
            z,
            tiles_copied: tiles.len(),
            tiles_outside_bounds,
            target_z_values,
        })
    }
}

/// Assign consecutive integral z values to sections ordered by `(z, section id)`.
///
/// Numbering starts at 100000 when the largest z is below 50000, else 50000 above its integer part.
pub fn section_to_integral_z(mut sections: Vec<SectionData>) -> HashMap<(String, u64), i64> {
    sections.sort_by(|a, b| {
        a.z.total_cmp(&b.z)
            .then_with(|| a.section_id.cmp(&b.section_id))
    });
    let mut out = HashMap::with_capacity(sections.len());
    let Some(last) = sections.last() else {
        return out;
    };
    let first = if last.z < SPLIT_Z_THRESHOLD {
        SPLIT_FIRST_Z
    } else {
        last.z.trunc() as i64 + 50_000
    };
    for (i, s) in sections.into_iter().enumerate() {
        out.insert((s.section_id, s.z.to_bits()), first + i as i64);
    }
    tracing::info!(
        sections = out.len(),
        first_z = first,
        last_z = first + out.len() as i64 - 1,
        "mapped sections to integral z values"
    );
    out
}

#[cfg(test)]
#[path = "../../tests/unit/stack/copy.rs"]
mod tests;
