//! Bulk-loaded bounding-volume hierarchy over one layer's tile boxes.

use std::collections::HashSet;

use crate::foundation::core::Rect;
use crate::spec::bounds::{TileBounds, TileIdPair};

const BVH_LEAF_SIZE: usize = 8;
const BVH_NONE: u32 = u32::MAX;

#[derive(Clone, Copy, Debug)]
struct BvhNode {
    rect: Rect,
    left: u32,
    right: u32,
    start: u32,
    count: u32,
}

/// Immutable spatial index over [`TileBounds`].
///
/// Nodes split at the median tile center along the longer axis of their extent. Leaves hold at
/// most eight tiles. Queries never allocate beyond their result and traversal stack.
#[derive(Clone, Debug, Default)]
pub struct TileBoundsRTree {
    tiles: Vec<TileBounds>,
    order: Vec<usize>,
    nodes: Vec<BvhNode>,
}

impl TileBoundsRTree {
    pub fn new(tiles: Vec<TileBounds>) -> Self {
        let mut order: Vec<usize> = (0..tiles.len()).collect();
        let mut nodes = Vec::with_capacity(tiles.len().div_ceil(BVH_LEAF_SIZE).max(1) * 2);
        if !tiles.is_empty() {
            build_bvh_node(&mut nodes, &tiles, &mut order, 0, tiles.len());
        }
        Self {
            tiles,
            order,
            nodes,
        }
    }

    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    /// Construction input, in insertion order.
    pub fn tiles(&self) -> &[TileBounds] {
        &self.tiles
    }

    /// Layer of the first indexed tile.
    pub fn z(&self) -> Option<f64> {
        self.tiles.first().map(|t| t.z)
    }

    /// Every tile whose box overlaps the query box, touching edges included.
    pub fn find_tiles_in_box(
        &self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
    ) -> Vec<&TileBounds> {
        let mut out = Vec::new();
        self.visit_box(min_x, min_y, max_x, max_y, |t| out.push(t));
        out
    }

    /// Tiles overlapping the square that circumscribes the circle.
    ///
    /// Results are candidates: a tile near a corner of the square may not touch the circle.
    pub fn find_tiles_in_circle(&self, cx: f64, cy: f64, radius: f64) -> Vec<&TileBounds> {
        self.find_tiles_in_box(cx - radius, cy - radius, cx + radius, cy + radius)
    }

    /// Deduplicated pairs of tiles within `radius` of each other, across this layer and the
    /// given neighbor layers.
    ///
    /// Pairs within a neighbor layer are not reported; only pairs with at least one member in
    /// this tree are.
    pub fn circle_neighbor_tile_id_pairs(
        &self,
        neighbor_trees: &[&TileBoundsRTree],
        radius: f64,
    ) -> HashSet<TileIdPair> {
        let mut pairs = HashSet::new();
        for tile in &self.tiles {
            let (min_x, min_y) = (tile.min_x - radius, tile.min_y - radius);
            let (max_x, max_y) = (tile.max_x + radius, tile.max_y + radius);
            self.visit_box(min_x, min_y, max_x, max_y, |found| {
                if found.tile_id != tile.tile_id {
                    pairs.insert(TileIdPair::new(tile.tile_id.as_str(), found.tile_id.as_str()));
                }
            });
            for tree in neighbor_trees {
                tree.visit_box(min_x, min_y, max_x, max_y, |found| {
                    if found.tile_id != tile.tile_id {
                        pairs.insert(TileIdPair::new(
                            tile.tile_id.as_str(),
                            found.tile_id.as_str(),
                        ));
                    }
                });
            }
        }
        pairs
    }

    fn visit_box<'a>(
        &'a self,
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        mut f: impl FnMut(&'a TileBounds),
    ) {
        if self.nodes.is_empty() {
            return;
        }
        let mut stack = vec![0u32];
        while let Some(node_id) = stack.pop() {
            let node = self.nodes[node_id as usize];
            let r = node.rect;
            if !(r.x0 <= max_x && r.x1 >= min_x && r.y0 <= max_y && r.y1 >= min_y) {
                continue;
            }
            if node.left == BVH_NONE {
                let start = node.start as usize;
                for &idx in &self.order[start..start + node.count as usize] {
                    let tile = &self.tiles[idx];
                    if tile.intersects(min_x, min_y, max_x, max_y) {
                        f(tile);
                    }
                }
            } else {
                stack.push(node.right);
                stack.push(node.left);
            }
        }
    }
}

fn build_bvh_node(
    nodes: &mut Vec<BvhNode>,
    tiles: &[TileBounds],
    order: &mut [usize],
    start: usize,
    end: usize,
) -> u32 {
    let mut rect = tiles[order[start]].rect();
    for idx in &order[start + 1..end] {
        rect = rect.union(tiles[*idx].rect());
    }
    let count = end - start;
    let node_index = nodes.len() as u32;
    nodes.push(BvhNode {
        rect,
        left: BVH_NONE,
        right: BVH_NONE,
        start: start as u32,
        count: count as u32,
    });
    if count <= BVH_LEAF_SIZE {
        return node_index;
    }
    let split_x = rect.width() >= rect.height();
    order[start..end].sort_by(|a, b| {
        let (ta, tb) = (&tiles[*a], &tiles[*b]);
        let (va, vb) = if split_x {
            (ta.min_x + ta.max_x, tb.min_x + tb.max_x)
        } else {
            (ta.min_y + ta.max_y, tb.min_y + tb.max_y)
        };
        va.total_cmp(&vb)
    });
    let mid = start + count / 2;
    let left = build_bvh_node(nodes, tiles, order, start, mid);
    let right = build_bvh_node(nodes, tiles, order, mid, end);
    let node = &mut nodes[node_index as usize];
    node.left = left;
    node.right = right;
    node.count = 0;
    node_index
}

#[cfg(test)]
#[path = "../../tests/unit/spec/rtree.rs"]
mod tests;
