//! Coordinate transform primitives and their composition.
//!
//! A tile's placement is an ordered chain of transforms applied left to right. The chain may mix
//! affine and non-linear (polynomial) maps, so composition keeps the list instead of folding it
//! into a single matrix.

mod polynomial;
mod render;

use std::fmt;
use std::sync::Arc;

use crate::foundation::core::{Affine, Point};
use crate::foundation::error::{MosaicError, MosaicResult};

pub use polynomial::Polynomial2D;
pub use render::{create_render_transform, scale_and_offset, scale_level_transform};

/// A 2D coordinate transform that can be evaluated at a point.
pub trait CoordinateTransform: fmt::Debug + Send + Sync {
    /// Map `p` from source into target coordinates.
    fn apply(&self, p: Point) -> Point;
}

impl CoordinateTransform for Affine {
    fn apply(&self, p: Point) -> Point {
        *self * p
    }
}

/// Ordered list of transforms, evaluated left to right.
#[derive(Clone, Debug, Default)]
pub struct TransformList {
    items: Vec<Arc<dyn CoordinateTransform>>,
}

impl TransformList {
    /// Empty list (identity).
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a transform at the end of the chain.
    pub fn push(&mut self, t: impl CoordinateTransform + 'static) {
        self.items.push(Arc::new(t));
    }

    /// Append a shared transform at the end of the chain.
    pub fn push_shared(&mut self, t: Arc<dyn CoordinateTransform>) {
        self.items.push(t);
    }

    /// Append every transform of `other`, preserving its order.
    pub fn extend_from(&mut self, other: &TransformList) {
        self.items.extend(other.items.iter().cloned());
    }

    /// Return a new list `[self..., other...]`.
    pub fn then(&self, other: &TransformList) -> TransformList {
        let mut out = self.clone();
        out.extend_from(other);
        out
    }

    /// Number of transforms in the chain.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Return `true` for the identity chain.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl CoordinateTransform for TransformList {
    fn apply(&self, p: Point) -> Point {
        self.items.iter().fold(p, |q, t| t.apply(q))
    }
}

/// Serializable catalog of transform primitives used in tile metadata.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum TransformSpec {
    /// Affine map in kurbo coefficient order `[a, b, c, d, e, f]`:
    /// `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
    Affine {
        /// Matrix coefficients.
        coeffs: [f64; 6],
    },
    /// Pure translation.
    Translation {
        /// X offset.
        dx: f64,
        /// Y offset.
        dy: f64,
    },
    /// Polynomial map; see [`Polynomial2D`] for the term order.
    Polynomial {
        /// Coefficients producing x'.
        x_coeffs: Vec<f64>,
        /// Coefficients producing y'.
        y_coeffs: Vec<f64>,
    },
    /// Nested ordered list.
    List {
        /// Child transforms applied left to right.
        transforms: Vec<TransformSpec>,
    },
}

impl TransformSpec {
    /// Translation placing a tile at stage coordinates.
    pub fn stage(stage_x: f64, stage_y: f64) -> Self {
        Self::Translation {
            dx: stage_x,
            dy: stage_y,
        }
    }

    /// Check coefficients for finiteness and polynomial term counts.
    pub fn validate(&self) -> MosaicResult<()> {
        match self {
            Self::Affine { coeffs } => {
                if coeffs.iter().any(|c| !c.is_finite()) {
                    return Err(MosaicError::validation(
                        "affine coefficients must be finite",
                    ));
                }
                Ok(())
            }
            Self::Translation { dx, dy } => {
                if !dx.is_finite() || !dy.is_finite() {
                    return Err(MosaicError::validation("translation must be finite"));
                }
                Ok(())
            }
            Self::Polynomial { x_coeffs, y_coeffs } => {
                Polynomial2D::new(x_coeffs.clone(), y_coeffs.clone()).map(|_| ())
            }
            Self::List { transforms } => transforms.iter().try_for_each(TransformSpec::validate),
        }
    }

    /// Build a shareable evaluator for this spec.
    pub fn to_transform(&self) -> MosaicResult<Arc<dyn CoordinateTransform>> {
        self.validate()?;
        Ok(match self {
            Self::Affine { coeffs } => Arc::new(Affine::new(*coeffs)),
            Self::Translation { dx, dy } => Arc::new(Affine::translate((*dx, *dy))),
            Self::Polynomial { x_coeffs, y_coeffs } => {
                Arc::new(Polynomial2D::new(x_coeffs.clone(), y_coeffs.clone())?)
            }
            Self::List { transforms } => Arc::new(transform_list(transforms)?),
        })
    }
}

/// Build an evaluable chain from serialized specs.
pub fn transform_list(specs: &[TransformSpec]) -> MosaicResult<TransformList> {
    let mut out = TransformList::new();
    for spec in specs {
        out.push_shared(spec.to_transform()?);
    }
    Ok(out)
}

#[cfg(test)]
#[path = "../../tests/unit/transform/list.rs"]
mod tests;
