use crate::foundation::error::{MosaicError, MosaicResult};

pub use kurbo::{Affine, Point, Rect, Vec2};

/// Straight-alpha RGBA8 color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Rgba8 {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
    /// Alpha channel.
    pub a: u8,
}

impl Rgba8 {
    /// Fully opaque color from RGB components.
    pub fn opaque(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b, a: 255 }
    }

    /// Fully transparent black.
    pub fn transparent() -> Self {
        Self {
            r: 0,
            g: 0,
            b: 0,
            a: 0,
        }
    }

    /// Parse an opaque `RRGGBB` color, accepting an optional `#` or `0x` prefix.
    ///
    /// An 8-digit `AARRGGBB` value keeps its alpha.
    pub fn from_hex(s: &str) -> MosaicResult<Self> {
        let t = s.trim();
        let t = t
            .strip_prefix('#')
            .or_else(|| t.strip_prefix("0x"))
            .or_else(|| t.strip_prefix("0X"))
            .unwrap_or(t);
        let v = u32::from_str_radix(t, 16)
            .map_err(|_| MosaicError::validation(format!("invalid hex color '{s}'")))?;
        match t.len() {
            6 => Ok(Self::opaque((v >> 16) as u8, (v >> 8) as u8, v as u8)),
            8 => Ok(Self {
                a: (v >> 24) as u8,
                r: (v >> 16) as u8,
                g: (v >> 8) as u8,
                b: v as u8,
            }),
            _ => Err(MosaicError::validation(format!(
                "hex color '{s}' must have 6 or 8 digits"
            ))),
        }
    }

    /// Channel array in `[r, g, b, a]` order.
    pub fn to_array(self) -> [u8; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
