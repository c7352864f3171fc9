//! Error types for tileset resolution and loading.

use std::path::PathBuf;

use tileset_decode::DecodeError;
use tileset_lod::LodError;

/// Result type for tileset operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while resolving or loading a tileset.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A description or tile file could not be read.
    #[error("failed to read {}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A tileset description is not valid JSON or has the wrong shape.
    #[error("invalid tileset description {}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Tile content could not be decoded.
    #[error("failed to decode {}", .path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },

    /// The root description has no `root` tile.
    #[error("tileset description {} has no root tile", .0.display())]
    MissingRoot(PathBuf),

    /// A simplifier refused new parameters.
    #[error(transparent)]
    Lod(#[from] LodError),
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
