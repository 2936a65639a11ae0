//! Piecewise-affine approximation of a coordinate transform over a source image.

use std::fmt;

use crate::foundation::core::{Affine, Point, Rect};
use crate::foundation::error::{MosaicError, MosaicResult};
use crate::transform::CoordinateTransform;

/// One mesh triangle with its source and target corners.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct MeshTriangle {
    pub source: [Point; 3],
    pub target: [Point; 3],
    /// Maps target coordinates back onto the source image.
    pub target_to_source: Affine,
}

impl MeshTriangle {
    /// `None` when either triangle is degenerate.
    pub fn new(source: [Point; 3], target: [Point; 3]) -> Option<Self> {
        let s = corner_frame(source);
        let t = corner_frame(target);
        if t.determinant().abs() < 1e-12 || s.determinant().abs() < 1e-12 {
            return None;
        }
        Some(Self {
            source,
            target,
            target_to_source: s * t.inverse(),
        })
    }

    pub fn target_bounds(&self) -> Rect {
        let [a, b, c] = self.target;
        Rect::new(
            a.x.min(b.x).min(c.x),
            a.y.min(b.y).min(c.y),
            a.x.max(b.x).max(c.x),
            a.y.max(b.y).max(c.y),
        )
    }
}

// Affine taking (0,0), (1,0), (0,1) onto the three corners.
fn corner_frame([p0, p1, p2]: [Point; 3]) -> Affine {
    let u = p1 - p0;
    let v = p2 - p0;
    Affine::new([u.x, u.y, v.x, v.y, p0.x, p0.y])
}

/// Triangulated mesh over `[0, w] x [0, h]`.
#[derive(Clone, Debug, Default)]
pub struct TransformMesh {
    vertices: Vec<(Point, Point)>,
    triangles: Vec<MeshTriangle>,
}

impl TransformMesh {
    /// `(source, target)` vertex pairs.
    pub fn vertices(&self) -> &[(Point, Point)] {
        &self.vertices
    }

    pub fn triangles(&self) -> &[MeshTriangle] {
        &self.triangles
    }

    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// Union of all triangle target boxes.
    pub fn target_bounds(&self) -> Option<Rect> {
        self.triangles
            .iter()
            .map(MeshTriangle::target_bounds)
            .reduce(|a, b| a.union(b))
    }
}

/// Strategy turning a transform into a [`TransformMesh`].
pub trait MeshBuilder: fmt::Debug + Send + Sync {
    fn build_mesh(
        &self,
        transform: &dyn CoordinateTransform,
        triangle_edge: f64,
        source_width: f64,
        source_height: f64,
    ) -> MosaicResult<TransformMesh>;
}

/// Uniform grid, two triangles per cell.
///
/// Uses `nx = max(1, round(w / edge))` columns and `ny = max(1, round(h / (w / nx)))` rows.
#[derive(Clone, Copy, Debug, Default)]
pub struct GridMeshBuilder;

impl MeshBuilder for GridMeshBuilder {
    fn build_mesh(
        &self,
        transform: &dyn CoordinateTransform,
        triangle_edge: f64,
        source_width: f64,
        source_height: f64,
    ) -> MosaicResult<TransformMesh> {
        if !(triangle_edge.is_finite() && triangle_edge > 0.0) {
            return Err(MosaicError::validation("mesh triangle edge must be > 0"));
        }
        if !(source_width > 0.0 && source_height > 0.0) {
            return Ok(TransformMesh::default());
        }

        let nx = ((source_width / triangle_edge).round() as usize).max(1);
        let dx = source_width / nx as f64;
        let ny = ((source_height / dx).round() as usize).max(1);
        let dy = source_height / ny as f64;

        let mut vertices = Vec::with_capacity((nx + 1) * (ny + 1));
        for j in 0..=ny {
            // Exact edges avoid gaps from accumulated rounding on the last row/column.
            let y = if j == ny { source_height } else { j as f64 * dy };
            for i in 0..=nx {
                let x = if i == nx { source_width } else { i as f64 * dx };
                let s = Point::new(x, y);
                vertices.push((s, transform.apply(s)));
            }
        }

        let stride = nx + 1;
        let mut triangles = Vec::with_capacity(nx * ny * 2);
        for j in 0..ny {
            for i in 0..nx {
                let v00 = vertices[j * stride + i];
                let v10 = vertices[j * stride + i + 1];
                let v01 = vertices[(j + 1) * stride + i];
                let v11 = vertices[(j + 1) * stride + i + 1];
                for [a, b, c] in [[v00, v10, v11], [v00, v11, v01]] {
                    if !(finite(a.1) && finite(b.1) && finite(c.1)) {
                        continue;
                    }
                    if let Some(tri) = MeshTriangle::new([a.0, b.0, c.0], [a.1, b.1, c.1]) {
                        triangles.push(tri);
                    }
                }
            }
        }
        Ok(TransformMesh {
            vertices,
            triangles,
        })
    }
}

fn finite(p: Point) -> bool {
    p.x.is_finite() && p.y.is_finite()
}

#[cfg(test)]
#[path = "../../tests/unit/render/mesh.rs"]
mod tests;
