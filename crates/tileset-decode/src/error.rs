//! Decoding errors.

use thiserror::Error;

/// Result alias used by every decoder in this crate.
pub type DecodeResult<T> = Result<T, DecodeError>;

/// Reasons a container could not be turned into a [`Mesh`](crate::Mesh).
///
/// Decoders stop at the first structural problem; no partially decoded
/// mesh is ever returned alongside an error.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Bad magic, inconsistent lengths, truncated chunks or a malformed document.
    #[error("malformed container: {0}")]
    Format(String),

    /// The container declares a version no decoder handles.
    #[error("unsupported container version {0}")]
    UnsupportedVersion(u32),

    /// An accessor uses a component type this decoder cannot read.
    #[error("unsupported component type {0}")]
    UnsupportedComponentType(u32),

    /// An index refers past the end of the decoded vertex list.
    #[error("index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange { index: u32, vertex_count: usize },

    /// A triangle primitive lacks a required vertex attribute.
    #[error("primitive is missing the {0} attribute")]
    MissingAttribute(&'static str),

    /// The embedded scene description is not valid JSON for its schema.
    #[error("invalid scene description: {0}")]
    Json(#[from] serde_json::Error),

    /// The glTF 2.0 document failed to load.
    #[error("invalid glTF document: {0}")]
    Gltf(#[from] gltf::Error),
}

impl DecodeError {
    pub(crate) fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }
}
