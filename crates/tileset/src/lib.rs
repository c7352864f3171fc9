//! Load 3D tileset hierarchies into simplifiable meshes.
//!
//! This crate is the file-system facing layer over [`tileset_decode`] and
//! [`tileset_lod`]:
//!
//! - [`list_content_paths`]: Every mesh tile reachable from a root description
//! - [`build_tile_tree`]: The annotated [`TileNode`] hierarchy
//! - [`load_content`]: Read and decode a single tile file
//! - [`Dataset`]: Tree, decoded meshes and one simplifier per mesh
//!
//! Everything here is synchronous. Decoding independent tiles on separate
//! threads is safe as long as each thread owns its own meshes.
//!
//! # Example
//!
//! ```no_run
//! use tileset::{Dataset, LoadOptions};
//!
//! let mut dataset = Dataset::load("data/tileset.json", &LoadOptions::default())?;
//! dataset.simplify_all(0.5);
//! println!("{} vertices", dataset.vertex_count());
//! # Ok::<(), tileset::Error>(())
//! ```

mod error;

pub mod dataset;
pub mod loader;
pub mod resolver;
pub mod tree;

pub use dataset::{Dataset, LoadOptions, LoadedTile, TileGeometry};
pub use error::{Error, Result};
pub use loader::load_content;
pub use resolver::{build_tile_tree, list_content_paths};
pub use tree::{BoundingVolume, ContentFormat, RefineMode, Refinement, TileContent, TileNode};

pub use tileset_decode::{Mesh, Vertex};
pub use tileset_lod::{LodParameters, ProgressiveLod};
