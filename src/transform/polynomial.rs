use crate::foundation::core::Point;
use crate::foundation::error::{MosaicError, MosaicResult};
use crate::transform::CoordinateTransform;

/// Non-linear polynomial map of arbitrary order.
///
/// Terms are ordered by total degree, then by decreasing power of x:
/// `1, x, y, x^2, xy, y^2, x^3, x^2y, ...`. Both coefficient lists must have the same triangular
/// length `(n+1)(n+2)/2` for order `n`.
#[derive(Clone, Debug, PartialEq)]
pub struct Polynomial2D {
    order: usize,
    x_coeffs: Vec<f64>,
    y_coeffs: Vec<f64>,
}

impl Polynomial2D {
    /// Build a validated polynomial.
    pub fn new(x_coeffs: Vec<f64>, y_coeffs: Vec<f64>) -> MosaicResult<Self> {
        if x_coeffs.len() != y_coeffs.len() {
            return Err(MosaicError::validation(
                "polynomial x and y coefficient counts differ",
            ));
        }
        let order = order_for_term_count(x_coeffs.len()).ok_or_else(|| {
            MosaicError::validation(format!(
                "polynomial coefficient count {} is not triangular",
                x_coeffs.len()
            ))
        })?;
        if x_coeffs.iter().chain(&y_coeffs).any(|c| !c.is_finite()) {
            return Err(MosaicError::validation(
                "polynomial coefficients must be finite",
            ));
        }
        Ok(Self {
            order,
            x_coeffs,
            y_coeffs,
        })
    }

    /// Polynomial order.
    pub fn order(&self) -> usize {
        self.order
    }
}

fn order_for_term_count(n: usize) -> Option<usize> {
    if n == 0 {
        return None;
    }
    let mut order = 0usize;
    loop {
        let terms = (order + 1) * (order + 2) / 2;
        if terms == n {
            return Some(order);
        }
        if terms > n {
            return None;
        }
        order += 1;
    }
}

impl CoordinateTransform for Polynomial2D {
    fn apply(&self, p: Point) -> Point {
        let mut qx = 0.0;
        let mut qy = 0.0;
        let mut k = 0usize;
        for degree in 0..=self.order {
            for yp in 0..=degree {
                let term = p.x.powi((degree - yp) as i32) * p.y.powi(yp as i32);
                qx += self.x_coeffs[k] * term;
                qy += self.y_coeffs[k] * term;
                k += 1;
            }
        }
        Point::new(qx, qy)
    }
}
