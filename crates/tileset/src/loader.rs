//! Reading tile content from disk.

use std::fs;
use std::path::Path;

use tileset_decode::{Mesh, decode_tile};

use crate::error::{Error, Result};

/// Read and decode one tile.
///
/// `.glb` files are decoded as bare containers; anything else is expected
/// to carry the b3dm wrapper. The extension is compared case-insensitively.
pub fn load_content(path: impl AsRef<Path>) -> Result<Mesh> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();

    let mesh = decode_tile(&bytes, &extension).map_err(|source| Error::Decode {
        path: path.to_path_buf(),
        source,
    })?;
    tracing::info!(
        path = %path.display(),
        bytes = bytes.len(),
        vertices = mesh.vertex_count(),
        triangles = mesh.triangle_count(),
        "loaded tile"
    );
    Ok(mesh)
}
