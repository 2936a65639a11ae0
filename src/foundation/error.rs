/// Convenience result type used across tilemosaic.
pub type MosaicResult<T> = Result<T, MosaicError>;

/// Top-level error taxonomy used by rendering, indexing and stack APIs.
///
/// Per-tile data irregularities (missing channel, zero-size mipmap, mismatched mask) are not
/// errors: the compositor skips them and records a [`crate::SkipEvent`].
#[derive(thiserror::Error, Debug)]
pub enum MosaicError {
    /// Invalid caller input: render parameters, destination canvas, CLI values, tile metadata.
    #[error("validation error: {0}")]
    Validation(String),

    /// Failures reading or decoding tile images and masks.
    #[error("decode error: {0}")]
    Decode(String),

    /// Errors while evaluating transforms, meshes or render state.
    #[error("evaluation error: {0}")]
    Evaluation(String),

    /// Errors when serializing or deserializing tile or stack data.
    #[error("serialization error: {0}")]
    Serde(String),

    /// Wrapped lower-level error from dependencies or IO.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MosaicError {
    /// Build a [`MosaicError::Validation`] value.
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Build a [`MosaicError::Decode`] value.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// Build a [`MosaicError::Evaluation`] value.
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Build a [`MosaicError::Serde`] value.
    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }
}

impl From<serde_json::Error> for MosaicError {
    fn from(e: serde_json::Error) -> Self {
        Self::Serde(e.to_string())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
