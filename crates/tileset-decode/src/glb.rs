//! Chunked binary container (GLB, glTF 2.0) decoding.
//!
//! The header and chunk table are validated here before the document is
//! handed to the `gltf` crate, so length problems surface as
//! [`DecodeError::Format`] rather than as opaque loader errors.

use glam::{Mat4, Vec2, Vec3};
use gltf::accessor::DataType;
use gltf::mesh::Mode;
use gltf::{Gltf, Semantic};

use crate::endian::{pad4, read_le_at};
use crate::error::{DecodeError, DecodeResult};
use crate::mesh::{Mesh, Vertex};

/// Magic shared by both binary container versions.
pub const GLB_MAGIC: [u8; 4] = *b"glTF";
/// Size of `{magic, version, length}`.
pub const GLB_HEADER_LEN: usize = 12;
/// Size of `{length, type}` preceding each chunk.
pub const CHUNK_HEADER_LEN: usize = 8;
/// Chunk type of the structured-data chunk ("JSON").
pub const CHUNK_TYPE_JSON: u32 = 0x4E4F_534A;
/// Chunk type of the binary chunk ("BIN\0").
pub const CHUNK_TYPE_BIN: u32 = 0x004E_4942;

/// Fixed header at the start of every binary container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlbHeader {
    pub version: u32,
    /// Total container length in bytes, header included.
    pub length: u32,
}

impl GlbHeader {
    /// Parse and check the magic of a container header.
    pub fn parse(bytes: &[u8]) -> DecodeResult<Self> {
        if bytes.len() < GLB_HEADER_LEN {
            return Err(DecodeError::format(format!(
                "{} bytes is too small for a container header",
                bytes.len()
            )));
        }
        if bytes[..4] != GLB_MAGIC {
            return Err(DecodeError::format(format!(
                "bad container magic {:?}",
                &bytes[..4]
            )));
        }
        Ok(Self {
            version: read_le_at(bytes, 4).unwrap_or_default(),
            length: read_le_at(bytes, 8).unwrap_or_default(),
        })
    }
}

/// Byte ranges of the two chunks inside a version 2 container.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChunkLayout {
    json: std::ops::Range<usize>,
    bin: Option<std::ops::Range<usize>>,
}

fn read_chunk_header(data: &[u8], offset: usize, what: &str) -> DecodeResult<(usize, u32)> {
    let length = read_le_at::<u32>(data, offset)
        .ok_or_else(|| DecodeError::format(format!("missing {what} chunk header")))?;
    let ty = read_le_at::<u32>(data, offset + 4)
        .ok_or_else(|| DecodeError::format(format!("missing {what} chunk header")))?;
    Ok((length as usize, ty))
}

fn chunk_layout(data: &[u8]) -> DecodeResult<ChunkLayout> {
    let (json_len, json_type) = read_chunk_header(data, GLB_HEADER_LEN, "JSON")?;
    if json_type != CHUNK_TYPE_JSON {
        return Err(DecodeError::format(format!(
            "first chunk has type {json_type:#x}, expected JSON"
        )));
    }
    let json_start = GLB_HEADER_LEN + CHUNK_HEADER_LEN;
    let json_end = json_start + json_len;
    if json_end > data.len() {
        return Err(DecodeError::format(format!(
            "JSON chunk of {json_len} bytes exceeds the {} remaining",
            data.len() - json_start
        )));
    }

    let bin_offset = pad4(json_end);
    if bin_offset + CHUNK_HEADER_LEN > data.len() {
        return Ok(ChunkLayout {
            json: json_start..json_end,
            bin: None,
        });
    }
    let (bin_len, _) = read_chunk_header(data, bin_offset, "BIN")?;
    let bin_start = bin_offset + CHUNK_HEADER_LEN;
    if bin_start + bin_len > data.len() {
        return Err(DecodeError::format(format!(
            "BIN chunk of {bin_len} bytes exceeds the {} remaining",
            data.len() - bin_start
        )));
    }
    Ok(ChunkLayout {
        json: json_start..json_end,
        bin: Some(bin_start..bin_start + bin_len),
    })
}

/// Decode a version 2 binary container into a single mesh.
///
/// Every triangle-list primitive of every mesh is appended in document
/// order, with indices rebased onto the running vertex count. The model
/// transform is taken from the first node.
pub fn decode_glb(bytes: &[u8]) -> DecodeResult<Mesh> {
    let header = GlbHeader::parse(bytes)?;
    if header.version != 2 {
        return Err(DecodeError::UnsupportedVersion(header.version));
    }
    let length = header.length as usize;
    if length > bytes.len() {
        return Err(DecodeError::format(format!(
            "header declares {length} bytes but only {} are present",
            bytes.len()
        )));
    }
    let data = &bytes[..length];
    let layout = chunk_layout(data)?;
    tracing::debug!(
        json_len = layout.json.len(),
        bin_len = layout.bin.as_ref().map_or(0, std::ops::Range::len),
        "parsing glTF 2.0 container"
    );

    let gltf = Gltf::from_slice(data)?;
    let blob = gltf.blob.as_deref();

    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for mesh in gltf.meshes() {
        for primitive in mesh.primitives() {
            if primitive.mode() != Mode::Triangles {
                tracing::debug!(mesh = mesh.index(), mode = ?primitive.mode(), "skipping non-triangle primitive");
                continue;
            }
            append_primitive(&primitive, blob, &mut vertices, &mut indices)?;
        }
    }

    let transform = gltf
        .nodes()
        .next()
        .map_or(Mat4::IDENTITY, |node| {
            Mat4::from_cols_array_2d(&node.transform().matrix())
        });

    tracing::debug!(
        meshes = gltf.meshes().len(),
        materials = gltf.materials().len(),
        vertices = vertices.len(),
        indices = indices.len(),
        "decoded glTF 2.0 container"
    );
    Ok(Mesh::new(vertices, indices).with_transform(transform))
}

fn append_primitive(
    primitive: &gltf::Primitive<'_>,
    blob: Option<&[u8]>,
    vertices: &mut Vec<Vertex>,
    indices: &mut Vec<u32>,
) -> DecodeResult<()> {
    for (semantic, name) in [(Semantic::Positions, "POSITION"), (Semantic::Normals, "NORMAL")] {
        let accessor = primitive
            .get(&semantic)
            .ok_or(DecodeError::MissingAttribute(name))?;
        require_component(&accessor, &[DataType::F32])?;
    }
    if let Some(accessor) = primitive.indices() {
        require_component(&accessor, &[DataType::U8, DataType::U16, DataType::U32])?;
    }
    if let Some(accessor) = primitive.get(&Semantic::TexCoords(0)) {
        require_component(&accessor, &[DataType::U8, DataType::U16, DataType::F32])?;
    }

    let reader = primitive.reader(|buffer| match buffer.source() {
        gltf::buffer::Source::Bin => blob,
        gltf::buffer::Source::Uri(_) => None,
    });

    let positions: Vec<[f32; 3]> = reader
        .read_positions()
        .ok_or(DecodeError::MissingAttribute("POSITION"))?
        .collect();
    let normals: Vec<[f32; 3]> = reader
        .read_normals()
        .ok_or(DecodeError::MissingAttribute("NORMAL"))?
        .collect();
    if normals.len() < positions.len() {
        return Err(DecodeError::format(format!(
            "{} normals for {} positions",
            normals.len(),
            positions.len()
        )));
    }
    let tex_coords: Option<Vec<[f32; 2]>> = reader
        .read_tex_coords(0)
        .map(|coords| coords.into_f32().collect());

    let vertex_count = positions.len();
    let local_indices: Vec<u32> = match reader.read_indices() {
        Some(read) => read.into_u32().collect(),
        None => (0..vertex_count as u32).collect(),
    };
    if local_indices.len() % 3 != 0 {
        return Err(DecodeError::format(format!(
            "{} indices do not form whole triangles",
            local_indices.len()
        )));
    }

    let base = u32::try_from(vertices.len())
        .map_err(|_| DecodeError::format("vertex count exceeds 32-bit indexing"))?;
    for &index in &local_indices {
        if index as usize >= vertex_count {
            return Err(DecodeError::IndexOutOfRange {
                index,
                vertex_count,
            });
        }
    }

    vertices.extend(positions.iter().enumerate().map(|(i, position)| {
        let tex = tex_coords
            .as_ref()
            .and_then(|coords| coords.get(i))
            .copied()
            .unwrap_or_default();
        Vertex::new(
            Vec3::from_array(*position),
            Vec3::from_array(normals[i]),
            Vec2::from_array(tex),
        )
    }));
    indices.extend(local_indices.into_iter().map(|index| base + index));
    Ok(())
}

fn require_component(accessor: &gltf::Accessor<'_>, allowed: &[DataType]) -> DecodeResult<()> {
    let data_type = accessor.data_type();
    if allowed.contains(&data_type) {
        Ok(())
    } else {
        Err(DecodeError::UnsupportedComponentType(data_type.as_gl_enum()))
    }
}
