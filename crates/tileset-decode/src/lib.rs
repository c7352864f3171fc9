//! Decode 3D tile content into triangle meshes.
//!
//! This crate provides pure synchronous decoding functions for the binary
//! containers found in tileset hierarchies: the b3dm tile wrapper and the
//! binary glTF container it embeds (versions 1 and 2). Functions take byte
//! slices and return owned [`Mesh`] values, so the caller decides where and
//! how to parallelize.
//!
//! # Key functions
//!
//! - [`decode_tile`]: Unwrap a tile by extension and decode its payload
//! - [`decode_container`]: Decode a bare binary container by version
//! - [`decode_glb`]: Decode a version 2 container
//! - [`decode_gltf1`]: Decode a legacy version 1 container
//! - [`endian`]: Fixed-width little/big-endian scalar conversion

mod error;

pub mod b3dm;
pub mod endian;
pub mod glb;
pub mod gltf1;
pub mod mesh;

#[cfg(any(test, feature = "fixtures"))]
pub mod fixtures;

pub use b3dm::{B3dmHeader, decode_container, decode_tile, is_raw_container};
pub use endian::Endian;
pub use error::{DecodeError, DecodeResult};
pub use glb::{GlbHeader, decode_glb};
pub use gltf1::decode_gltf1;
pub use mesh::{Mesh, Vertex};
