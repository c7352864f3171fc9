//! A whole tileset loaded into memory.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tileset_decode::Mesh;
use tileset_lod::{LodParameters, ProgressiveLod};

use crate::error::Result;
use crate::loader::load_content;
use crate::resolver::{build_tile_tree, list_content_paths};
use crate::tree::TileNode;

/// Settings for [`Dataset::load`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// Attach a [`ProgressiveLod`] to every decoded mesh.
    pub simplify: bool,
    /// Parameters for the attached simplifiers.
    pub lod: LodParameters,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            simplify: true,
            lod: LodParameters::default(),
        }
    }
}

/// Geometry of one loaded tile.
#[derive(Debug)]
pub enum TileGeometry {
    Static(Mesh),
    Progressive(ProgressiveLod),
}

impl TileGeometry {
    #[must_use]
    pub fn mesh(&self) -> &Mesh {
        match self {
            Self::Static(mesh) => mesh,
            Self::Progressive(lod) => lod.mesh(),
        }
    }

    /// Vertices currently in use.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        match self {
            Self::Static(mesh) => mesh.vertex_count(),
            Self::Progressive(lod) => lod.current_vertex_count(),
        }
    }

    #[must_use]
    pub fn lod(&self) -> Option<&ProgressiveLod> {
        match self {
            Self::Static(_) => None,
            Self::Progressive(lod) => Some(lod),
        }
    }
}

#[derive(Debug)]
pub struct LoadedTile {
    pub path: PathBuf,
    pub geometry: TileGeometry,
}

/// Tile tree plus the decoded content of every mesh tile.
#[derive(Debug)]
pub struct Dataset {
    root_path: PathBuf,
    tree: TileNode,
    tiles: Vec<LoadedTile>,
    failed: Vec<PathBuf>,
}

impl Dataset {
    /// Resolve `root` and decode each tile it references.
    ///
    /// Only an unusable root description is an error. Tiles that fail to
    /// decode are logged and listed in [`failed`](Self::failed).
    pub fn load(root: impl AsRef<Path>, options: &LoadOptions) -> Result<Self> {
        let root = root.as_ref();
        let tree = build_tile_tree(root)?;
        let paths = list_content_paths(root)?;

        let mut tiles = Vec::with_capacity(paths.len());
        let mut failed = Vec::new();
        for path in paths {
            match load_content(&path) {
                Ok(mesh) => {
                    let geometry = if options.simplify {
                        TileGeometry::Progressive(ProgressiveLod::new(mesh, options.lod))
                    } else {
                        TileGeometry::Static(mesh)
                    };
                    tiles.push(LoadedTile { path, geometry });
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping tile");
                    failed.push(path);
                }
            }
        }

        tracing::info!(
            root = %root.display(),
            tiles = tiles.len(),
            failed = failed.len(),
            "loaded dataset"
        );
        Ok(Self {
            root_path: root.to_path_buf(),
            tree,
            tiles,
            failed,
        })
    }

    /// Drive every simplifier toward `ratio`. Static tiles are untouched.
    pub fn simplify_all(&mut self, ratio: f32) {
        for lod in self.progressive_mut() {
            lod.simplify_to(ratio);
        }
    }

    /// Apply `params` to every simplifier.
    ///
    /// Nothing changes unless every simplifier accepts `params`.
    pub fn update_parameters(&mut self, params: LodParameters) -> Result<()> {
        for lod in self.progressive() {
            lod.check_parameters(&params)?;
        }
        for lod in self.progressive_mut() {
            lod.update_parameters(params)?;
        }
        Ok(())
    }

    fn progressive(&self) -> impl Iterator<Item = &ProgressiveLod> {
        self.tiles.iter().filter_map(|tile| tile.geometry.lod())
    }

    fn progressive_mut(&mut self) -> impl Iterator<Item = &mut ProgressiveLod> {
        self.tiles.iter_mut().filter_map(|tile| match &mut tile.geometry {
            TileGeometry::Progressive(lod) => Some(lod),
            TileGeometry::Static(_) => None,
        })
    }

    #[must_use]
    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    #[must_use]
    pub fn tree(&self) -> &TileNode {
        &self.tree
    }

    #[must_use]
    pub fn tiles(&self) -> &[LoadedTile] {
        &self.tiles
    }

    pub fn tiles_mut(&mut self) -> &mut [LoadedTile] {
        &mut self.tiles
    }

    /// Content paths that were found but could not be loaded.
    #[must_use]
    pub fn failed(&self) -> &[PathBuf] {
        &self.failed
    }

    /// Vertices in use across all tiles.
    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.tiles.iter().map(|tile| tile.geometry.vertex_count()).sum()
    }
}
