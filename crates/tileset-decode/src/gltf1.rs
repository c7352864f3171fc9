//! Legacy binary container (glTF 1.0) decoding.
//!
//! The structured chunk is walked by hand: default scene, then each node's
//! children before its meshes, collecting triangle primitives. Collections
//! may be keyed objects (string ids) or arrays (integer ids).

use std::borrow::Cow;
use std::collections::HashMap;
use std::fmt;

use glam::{Mat4, Vec2, Vec3};
use serde::Deserialize;

use crate::endian::{Endian, pad4, read_le_at};
use crate::error::{DecodeError, DecodeResult};
use crate::glb::{CHUNK_HEADER_LEN, GLB_HEADER_LEN, GlbHeader};
use crate::mesh::{Mesh, Vertex};

const MODE_TRIANGLES: u32 = 4;
const UNSIGNED_BYTE: u32 = 5121;
const UNSIGNED_SHORT: u32 = 5123;
const UNSIGNED_INT: u32 = 5125;
const FLOAT: u32 = 5126;

/// Deepest node nesting accepted before the graph is treated as cyclic.
const MAX_NODE_DEPTH: usize = 64;

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
enum Id {
    Key(String),
    Index(usize),
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key(key) => write!(f, "\"{key}\""),
            Self::Index(index) => write!(f, "{index}"),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Table<T> {
    Keyed(HashMap<String, T>),
    Indexed(Vec<T>),
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self::Indexed(Vec::new())
    }
}

impl<T> Table<T> {
    fn lookup(&self, id: &Id, kind: &str) -> DecodeResult<&T> {
        let found = match (self, id) {
            (Self::Keyed(map), Id::Key(key)) => map.get(key),
            (Self::Indexed(list), Id::Index(index)) => list.get(*index),
            (Self::Keyed(map), Id::Index(index)) => map.get(&index.to_string()),
            (Self::Indexed(_), Id::Key(_)) => None,
        };
        found.ok_or_else(|| DecodeError::format(format!("unknown {kind} {id}")))
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    scene: Option<Id>,
    #[serde(default)]
    scenes: Table<Scene>,
    #[serde(default)]
    nodes: Table<Node>,
    #[serde(default)]
    meshes: Table<MeshDef>,
    #[serde(default)]
    accessors: Table<Accessor>,
    #[serde(default)]
    buffer_views: Table<BufferView>,
}

#[derive(Debug, Deserialize)]
struct Scene {
    #[serde(default)]
    nodes: Vec<Id>,
}

#[derive(Debug, Deserialize)]
struct Node {
    matrix: Option<Vec<f32>>,
    #[serde(default)]
    children: Vec<Id>,
    #[serde(default)]
    meshes: Vec<Id>,
    mesh: Option<Id>,
}

#[derive(Debug, Deserialize)]
struct MeshDef {
    #[serde(default)]
    primitives: Vec<Primitive>,
}

#[derive(Debug, Deserialize)]
struct Primitive {
    #[serde(default)]
    attributes: HashMap<String, Id>,
    indices: Option<Id>,
    mode: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Accessor {
    buffer_view: Id,
    #[serde(default)]
    byte_offset: usize,
    component_type: u32,
    count: usize,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BufferView {
    #[serde(default)]
    byte_offset: usize,
    #[serde(default)]
    byte_stride: usize,
}

/// Decode a version 1 binary container into a single mesh.
///
/// The binary chunk's own length field is not trusted: the chunk is taken
/// to run to the end of `bytes`, which is what existing tile producers
/// rely on.
pub fn decode_gltf1(bytes: &[u8]) -> DecodeResult<Mesh> {
    let header = GlbHeader::parse(bytes)?;
    if header.version != 1 {
        return Err(DecodeError::UnsupportedVersion(header.version));
    }
    if header.length as usize != bytes.len() {
        return Err(DecodeError::format(format!(
            "header declares {} bytes but the container holds {}",
            header.length,
            bytes.len()
        )));
    }

    let json_len = read_le_at::<u32>(bytes, GLB_HEADER_LEN)
        .ok_or_else(|| DecodeError::format("missing JSON chunk header"))? as usize;
    let json_start = GLB_HEADER_LEN + CHUNK_HEADER_LEN;
    let json_end = json_start
        .checked_add(json_len)
        .filter(|&end| end <= bytes.len())
        .ok_or_else(|| DecodeError::format("JSON chunk out of bounds"))?;
    let document: Document = serde_json::from_slice(&bytes[json_start..json_end])?;

    let bin_offset = pad4(json_end);
    if bin_offset + CHUNK_HEADER_LEN > bytes.len() {
        return Err(DecodeError::format("missing BIN chunk header"));
    }
    let bin = &bytes[bin_offset + CHUNK_HEADER_LEN..];
    tracing::debug!(json_len, bin_len = bin.len(), "parsing glTF 1.0 container");

    let mut walker = SceneWalker::new(&document, bin);
    walker.walk()?;
    Ok(walker.into_mesh())
}

struct SceneWalker<'a> {
    document: &'a Document,
    bin: &'a [u8],
    positions: Vec<Vec3>,
    normals: Vec<Vec3>,
    tex_coords: Vec<Vec2>,
    indices: Vec<u32>,
    transform: Mat4,
}

impl<'a> SceneWalker<'a> {
    fn new(document: &'a Document, bin: &'a [u8]) -> Self {
        Self {
            document,
            bin,
            positions: Vec::new(),
            normals: Vec::new(),
            tex_coords: Vec::new(),
            indices: Vec::new(),
            transform: Mat4::IDENTITY,
        }
    }

    fn walk(&mut self) -> DecodeResult<()> {
        let document = self.document;
        let scene_id = document
            .scene
            .as_ref()
            .ok_or_else(|| DecodeError::format("missing default scene"))?;
        let scene = document.scenes.lookup(scene_id, "scene")?;
        for node in &scene.nodes {
            self.visit_node(node, 0)?;
        }
        Ok(())
    }

    fn visit_node(&mut self, id: &Id, depth: usize) -> DecodeResult<()> {
        if depth > MAX_NODE_DEPTH {
            return Err(DecodeError::format(format!(
                "node {id} nested deeper than {MAX_NODE_DEPTH} levels"
            )));
        }
        let document = self.document;
        let node = document.nodes.lookup(id, "node")?;

        // Overwrites rather than composes with the parent transform.
        if let Some(matrix) = &node.matrix {
            if matrix.len() != 16 {
                return Err(DecodeError::format(format!(
                    "node {id} matrix has {} elements",
                    matrix.len()
                )));
            }
            self.transform = Mat4::from_cols_slice(matrix);
        }

        for child in &node.children {
            self.visit_node(child, depth + 1)?;
        }
        for mesh_id in node.meshes.iter().chain(node.mesh.as_ref()) {
            let mesh = document.meshes.lookup(mesh_id, "mesh")?;
            for primitive in &mesh.primitives {
                self.append_primitive(primitive)?;
            }
        }
        Ok(())
    }

    fn append_primitive(&mut self, primitive: &Primitive) -> DecodeResult<()> {
        if primitive.mode.unwrap_or(MODE_TRIANGLES) != MODE_TRIANGLES {
            return Ok(());
        }
        let document = self.document;
        let position_id = primitive
            .attributes
            .get("POSITION")
            .ok_or(DecodeError::MissingAttribute("POSITION"))?;
        let normal_id = primitive
            .attributes
            .get("NORMAL")
            .ok_or(DecodeError::MissingAttribute("NORMAL"))?;

        let position_accessor = document.accessors.lookup(position_id, "accessor")?;
        let vertex_count = position_accessor.count;
        let positions = self.read_floats(position_accessor, vertex_count, 3)?;
        let normal_accessor = document.accessors.lookup(normal_id, "accessor")?;
        let normals = self.read_floats(normal_accessor, vertex_count, 3)?;
        let tex_coords = match primitive.attributes.get("TEXCOORD_0") {
            Some(id) => {
                let accessor = document.accessors.lookup(id, "accessor")?;
                Some(self.read_floats(accessor, vertex_count, 2)?)
            }
            None => None,
        };

        let local_indices = match &primitive.indices {
            Some(id) => {
                let accessor = document.accessors.lookup(id, "accessor")?;
                self.read_indices(accessor, vertex_count)?
            }
            None => (0..vertex_count as u32).collect(),
        };
        if local_indices.len() % 3 != 0 {
            return Err(DecodeError::format(format!(
                "{} indices do not form whole triangles",
                local_indices.len()
            )));
        }

        let base = u32::try_from(self.positions.len())
            .map_err(|_| DecodeError::format("vertex count exceeds 32-bit indexing"))?;
        self.positions
            .extend(positions.chunks_exact(3).map(Vec3::from_slice));
        self.normals
            .extend(normals.chunks_exact(3).map(Vec3::from_slice));
        match tex_coords {
            Some(coords) => self
                .tex_coords
                .extend(coords.chunks_exact(2).map(Vec2::from_slice)),
            None => self
                .tex_coords
                .extend(std::iter::repeat_n(Vec2::ZERO, vertex_count)),
        }
        self.indices
            .extend(local_indices.into_iter().map(|index| base + index));
        Ok(())
    }

    fn read_floats(
        &self,
        accessor: &Accessor,
        count: usize,
        components: usize,
    ) -> DecodeResult<Vec<f32>> {
        if accessor.component_type != FLOAT {
            return Err(DecodeError::UnsupportedComponentType(
                accessor.component_type,
            ));
        }
        let element_size = components * f32::SIZE;
        let raw = self.buffer_view_data(accessor, count, element_size)?;
        Ok(raw.chunks_exact(f32::SIZE).map(f32::read_le).collect())
    }

    fn read_indices(&self, accessor: &Accessor, vertex_count: usize) -> DecodeResult<Vec<u32>> {
        let element_size = match accessor.component_type {
            UNSIGNED_BYTE => 1,
            UNSIGNED_SHORT => 2,
            UNSIGNED_INT => 4,
            other => return Err(DecodeError::UnsupportedComponentType(other)),
        };
        let raw = self.buffer_view_data(accessor, accessor.count, element_size)?;
        raw.chunks_exact(element_size)
            .map(|bytes| {
                let index = match element_size {
                    1 => u32::from(bytes[0]),
                    2 => u32::from(u16::read_le(bytes)),
                    _ => u32::read_le(bytes),
                };
                if index as usize >= vertex_count {
                    return Err(DecodeError::IndexOutOfRange {
                        index,
                        vertex_count,
                    });
                }
                Ok(index)
            })
            .collect()
    }

    /// Resolve accessor → buffer view → bytes, packing strided data densely.
    fn buffer_view_data(
        &self,
        accessor: &Accessor,
        count: usize,
        element_size: usize,
    ) -> DecodeResult<Cow<'a, [u8]>> {
        let view = self
            .document
            .buffer_views
            .lookup(&accessor.buffer_view, "bufferView")?;
        let overflow = || {
            DecodeError::format(format!(
                "bufferView {} overflows the binary chunk",
                accessor.buffer_view
            ))
        };
        let start = view
            .byte_offset
            .checked_add(accessor.byte_offset)
            .ok_or_else(overflow)?;
        let stride = view.byte_stride;
        let required = match count {
            0 => Some(0),
            _ if stride > 0 => stride
                .checked_mul(count - 1)
                .and_then(|n| n.checked_add(element_size)),
            _ => element_size.checked_mul(count),
        }
        .ok_or_else(overflow)?;
        let end = start.checked_add(required).ok_or_else(overflow)?;
        let bin: &'a [u8] = self.bin;
        let bytes = bin.get(start..end).ok_or_else(overflow)?;

        if stride > 0 && stride != element_size {
            let mut packed = Vec::with_capacity(count * element_size);
            for element in 0..count {
                let offset = element * stride;
                packed.extend_from_slice(&bytes[offset..offset + element_size]);
            }
            return Ok(Cow::Owned(packed));
        }
        Ok(Cow::Borrowed(bytes))
    }

    fn into_mesh(self) -> Mesh {
        let vertices = self
            .positions
            .into_iter()
            .zip(self.normals)
            .zip(self.tex_coords)
            .map(|((position, normal), tex)| Vertex::new(position, normal, tex))
            .collect();
        tracing::debug!(indices = self.indices.len(), "decoded glTF 1.0 container");
        Mesh::new(vertices, self.indices).with_transform(self.transform)
    }
}
