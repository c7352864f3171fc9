//! Builders for small, valid tile containers used by tests.
//!
//! Available to this crate's unit tests and, through the `fixtures`
//! feature, to downstream test suites.

use glam::Mat4;
use serde_json::{Value, json};

use crate::b3dm::B3DM_MAGIC;
use crate::endian::pad4;
use crate::glb::{CHUNK_TYPE_BIN, CHUNK_TYPE_JSON, GLB_MAGIC};

/// Component width of a fixture's index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexType {
    U8,
    U16,
    U32,
}

impl IndexType {
    #[must_use]
    pub fn component_type(self) -> u32 {
        match self {
            Self::U8 => 5121,
            Self::U16 => 5123,
            Self::U32 => 5125,
        }
    }

    fn encode(self, indices: &[u32]) -> Vec<u8> {
        match self {
            Self::U8 => indices.iter().map(|&i| i as u8).collect(),
            Self::U16 => indices
                .iter()
                .flat_map(|&i| (i as u16).to_le_bytes())
                .collect(),
            Self::U32 => indices.iter().flat_map(|&i| i.to_le_bytes()).collect(),
        }
    }
}

/// One primitive worth of vertex and index data.
#[derive(Debug, Clone)]
pub struct FixturePrimitive {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub tex_coords: Option<Vec<[f32; 2]>>,
    pub indices: Vec<u32>,
    pub index_type: IndexType,
    pub mode: u32,
}

impl FixturePrimitive {
    /// Right triangle in the XY plane facing +Z.
    #[must_use]
    pub fn triangle() -> Self {
        Self {
            positions: vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            normals: vec![[0.0, 0.0, 1.0]; 3],
            tex_coords: Some(vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0]]),
            indices: vec![0, 1, 2],
            index_type: IndexType::U16,
            mode: 4,
        }
    }

    /// Unit square in the XY plane facing +Z, two triangles.
    #[must_use]
    pub fn quad() -> Self {
        Self {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            tex_coords: Some(vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 1.0]]),
            indices: vec![0, 1, 2, 0, 2, 3],
            index_type: IndexType::U16,
            mode: 4,
        }
    }

    fn position_bounds(&self) -> ([f32; 3], [f32; 3]) {
        let mut min = [f32::MAX; 3];
        let mut max = [f32::MIN; 3];
        for position in &self.positions {
            for axis in 0..3 {
                min[axis] = min[axis].min(position[axis]);
                max[axis] = max[axis].max(position[axis]);
            }
        }
        (min, max)
    }
}

fn floats<const N: usize>(values: &[[f32; N]]) -> Vec<u8> {
    values
        .iter()
        .flatten()
        .flat_map(|v| v.to_le_bytes())
        .collect()
}

fn pad_with(bytes: &mut Vec<u8>, fill: u8) {
    bytes.resize(pad4(bytes.len()), fill);
}

/// Appends views to a single binary blob, each aligned to four bytes.
#[derive(Default)]
struct BlobBuilder {
    bin: Vec<u8>,
    views: Vec<(usize, usize)>,
}

impl BlobBuilder {
    fn push(&mut self, bytes: &[u8]) -> usize {
        let offset = self.bin.len();
        self.bin.extend_from_slice(bytes);
        pad_with(&mut self.bin, 0);
        self.views.push((offset, bytes.len()));
        self.views.len() - 1
    }
}

/// Build a version 2 binary container holding one mesh with `primitives`.
#[must_use]
pub fn glb(primitives: &[FixturePrimitive], node_matrix: Option<Mat4>) -> Vec<u8> {
    let (document, bin) = glb_document(primitives, node_matrix);
    glb_raw(&document, &bin)
}

/// Document and binary chunk that [`glb`] would wrap, for tests that edit
/// the document first. Accessor 0 is the first primitive's positions.
#[must_use]
pub fn glb_document(primitives: &[FixturePrimitive], node_matrix: Option<Mat4>) -> (Value, Vec<u8>) {
    let mut blob = BlobBuilder::default();
    let mut accessors = Vec::new();
    let mut gltf_primitives = Vec::new();

    for primitive in primitives {
        let count = primitive.positions.len();
        let (min, max) = primitive.position_bounds();

        let view = blob.push(&floats(&primitive.positions));
        accessors.push(json!({
            "bufferView": view, "componentType": 5126, "count": count,
            "type": "VEC3", "min": min, "max": max,
        }));
        let position = accessors.len() - 1;

        let view = blob.push(&floats(&primitive.normals));
        accessors.push(json!({
            "bufferView": view, "componentType": 5126, "count": count, "type": "VEC3",
        }));
        let mut attributes = json!({ "POSITION": position, "NORMAL": accessors.len() - 1 });

        if let Some(coords) = &primitive.tex_coords {
            let view = blob.push(&floats(coords));
            accessors.push(json!({
                "bufferView": view, "componentType": 5126, "count": count, "type": "VEC2",
            }));
            attributes["TEXCOORD_0"] = json!(accessors.len() - 1);
        }

        let view = blob.push(&primitive.index_type.encode(&primitive.indices));
        accessors.push(json!({
            "bufferView": view,
            "componentType": primitive.index_type.component_type(),
            "count": primitive.indices.len(),
            "type": "SCALAR",
        }));
        gltf_primitives.push(json!({
            "attributes": attributes,
            "indices": accessors.len() - 1,
            "mode": primitive.mode,
        }));
    }

    let buffer_views: Vec<Value> = blob
        .views
        .iter()
        .map(|&(offset, length)| json!({ "buffer": 0, "byteOffset": offset, "byteLength": length }))
        .collect();
    let mut node = json!({ "mesh": 0 });
    if let Some(matrix) = node_matrix {
        node["matrix"] = json!(matrix.to_cols_array());
    }
    let document = json!({
        "asset": { "version": "2.0" },
        "scene": 0,
        "scenes": [{ "nodes": [0] }],
        "nodes": [node],
        "meshes": [{ "primitives": gltf_primitives }],
        "accessors": accessors,
        "bufferViews": buffer_views,
        "buffers": [{ "byteLength": blob.bin.len() }],
    });
    (document, blob.bin)
}

/// Wrap `document` and `bin` in a version 2 container.
#[must_use]
pub fn glb_raw(document: &Value, bin: &[u8]) -> Vec<u8> {
    let mut json_chunk = serde_json::to_vec(document).unwrap_or_default();
    pad_with(&mut json_chunk, b' ');
    let mut bin_chunk = bin.to_vec();
    pad_with(&mut bin_chunk, 0);

    let total = 12 + 8 + json_chunk.len() + 8 + bin_chunk.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&GLB_MAGIC);
    out.extend_from_slice(&2u32.to_le_bytes());
    out.extend_from_slice(&(total as u32).to_le_bytes());
    out.extend_from_slice(&(json_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_TYPE_JSON.to_le_bytes());
    out.extend_from_slice(&json_chunk);
    out.extend_from_slice(&(bin_chunk.len() as u32).to_le_bytes());
    out.extend_from_slice(&CHUNK_TYPE_BIN.to_le_bytes());
    out.extend_from_slice(&bin_chunk);
    out
}

/// Layout choices for [`legacy_glb`].
#[derive(Debug, Clone, Default)]
pub struct LegacyOptions {
    /// Use keyed objects with string ids instead of arrays.
    pub keyed_ids: bool,
    /// Store positions and normals in one strided buffer view.
    pub interleave: bool,
    /// Matrices for the first nodes, one node per primitive.
    pub matrices: Vec<Mat4>,
    /// Value written into the binary chunk's length field.
    pub bin_chunk_length: Option<u32>,
}

/// Build a version 1 binary container with one node and mesh per primitive.
#[must_use]
pub fn legacy_glb(primitives: &[FixturePrimitive], options: &LegacyOptions) -> Vec<u8> {
    let (document, bin) = legacy_document(primitives, options);
    let json_bytes = serde_json::to_vec(&document).unwrap_or_default();
    legacy_container(&json_bytes, &bin, options.bin_chunk_length)
}

/// Document and binary chunk that [`legacy_glb`] would wrap.
#[must_use]
pub fn legacy_document(primitives: &[FixturePrimitive], options: &LegacyOptions) -> (Value, Vec<u8>) {
    let mut blob = BlobBuilder::default();
    let mut views: Vec<Value> = Vec::new();
    let mut accessors: Vec<Value> = Vec::new();
    let mut meshes: Vec<Value> = Vec::new();
    let mut nodes: Vec<Value> = Vec::new();

    for (index, primitive) in primitives.iter().enumerate() {
        let count = primitive.positions.len();
        let (position_view, normal_view, normal_offset) = if options.interleave {
            let interleaved: Vec<u8> = primitive
                .positions
                .iter()
                .zip(&primitive.normals)
                .flat_map(|(p, n)| p.iter().chain(n).flat_map(|v| v.to_le_bytes()))
                .collect();
            let view = blob.push(&interleaved);
            views.push(json!({ "byteOffset": blob.views[view].0, "byteStride": 24 }));
            (views.len() - 1, views.len() - 1, 12)
        } else {
            let position = blob.push(&floats(&primitive.positions));
            views.push(json!({ "byteOffset": blob.views[position].0 }));
            let normal = blob.push(&floats(&primitive.normals));
            views.push(json!({ "byteOffset": blob.views[normal].0 }));
            (views.len() - 2, views.len() - 1, 0)
        };
        accessors.push(json!({ "bufferView": position_view, "componentType": 5126, "count": count }));
        accessors.push(json!({
            "bufferView": normal_view, "byteOffset": normal_offset,
            "componentType": 5126, "count": count,
        }));
        let mut attributes = json!({
            "POSITION": accessors.len() - 2,
            "NORMAL": accessors.len() - 1,
        });
        if let Some(coords) = &primitive.tex_coords {
            let view = blob.push(&floats(coords));
            views.push(json!({ "byteOffset": blob.views[view].0 }));
            accessors.push(json!({ "bufferView": views.len() - 1, "componentType": 5126, "count": count }));
            attributes["TEXCOORD_0"] = json!(accessors.len() - 1);
        }
        let view = blob.push(&primitive.index_type.encode(&primitive.indices));
        views.push(json!({ "byteOffset": blob.views[view].0 }));
        accessors.push(json!({
            "bufferView": views.len() - 1,
            "componentType": primitive.index_type.component_type(),
            "count": primitive.indices.len(),
        }));
        meshes.push(json!({ "primitives": [{
            "attributes": attributes,
            "indices": accessors.len() - 1,
            "mode": primitive.mode,
        }]}));

        let mut node = json!({ "meshes": [index] });
        if let Some(matrix) = options.matrices.get(index) {
            node["matrix"] = json!(matrix.to_cols_array());
        }
        nodes.push(node);
    }

    let node_ids: Vec<usize> = (0..nodes.len()).collect();
    let mut document = json!({
        "scene": 0,
        "scenes": [{ "nodes": node_ids }],
        "nodes": nodes,
        "meshes": meshes,
        "accessors": accessors,
        "bufferViews": views,
    });
    if options.keyed_ids {
        document = to_keyed(&document);
    }
    (document, blob.bin)
}

/// Build a version 1 container around an arbitrary document and blob.
#[must_use]
pub fn legacy_raw(json_bytes: &[u8], bin: &[u8]) -> Vec<u8> {
    legacy_container(json_bytes, bin, None)
}

fn legacy_container(json_bytes: &[u8], bin: &[u8], bin_chunk_length: Option<u32>) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&GLB_MAGIC);
    out.extend_from_slice(&1u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(&(json_bytes.len() as u32).to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(json_bytes);
    pad_with(&mut out, b' ');
    let declared = bin_chunk_length.unwrap_or(bin.len() as u32);
    out.extend_from_slice(&declared.to_le_bytes());
    out.extend_from_slice(&CHUNK_TYPE_BIN.to_le_bytes());
    out.extend_from_slice(bin);
    let total = out.len() as u32;
    out[8..12].copy_from_slice(&total.to_le_bytes());
    out
}

/// Rewrite array collections and integer references into string-keyed form.
fn to_keyed(document: &Value) -> Value {
    let key = |kind: &str, index: &Value| json!(format!("{kind}_{}", index.as_u64().unwrap_or_default()));
    let keyed = |kind: &str, list: &Value| -> Value {
        let map: serde_json::Map<String, Value> = list
            .as_array()
            .into_iter()
            .flatten()
            .enumerate()
            .map(|(index, item)| (format!("{kind}_{index}"), item.clone()))
            .collect();
        Value::Object(map)
    };
    let mut document = document.clone();
    let refs = |kind: &str, list: &mut Value| {
        if let Some(items) = list.as_array_mut() {
            for item in items {
                *item = key(kind, item);
            }
        }
    };

    if let Some(scenes) = document["scenes"].as_array_mut() {
        for scene in scenes {
            refs("node", &mut scene["nodes"]);
        }
    }
    if let Some(nodes) = document["nodes"].as_array_mut() {
        for node in nodes {
            refs("mesh", &mut node["meshes"]);
        }
    }
    if let Some(meshes) = document["meshes"].as_array_mut() {
        for mesh in meshes {
            if let Some(primitives) = mesh["primitives"].as_array_mut() {
                for primitive in primitives {
                    if let Some(attributes) = primitive["attributes"].as_object_mut() {
                        for value in attributes.values_mut() {
                            *value = key("accessor", value);
                        }
                    }
                    primitive["indices"] = key("accessor", &primitive["indices"]);
                }
            }
        }
    }
    if let Some(accessors) = document["accessors"].as_array_mut() {
        for accessor in accessors {
            accessor["bufferView"] = key("bufferView", &accessor["bufferView"]);
        }
    }
    document["scene"] = key("scene", &document["scene"]);
    for (field, kind) in [
        ("scenes", "scene"),
        ("nodes", "node"),
        ("meshes", "mesh"),
        ("accessors", "accessor"),
        ("bufferViews", "bufferView"),
    ] {
        document[field] = keyed(kind, &document[field]);
    }
    document
}

/// Wrap `payload` in a b3dm header with the given table sections.
///
/// Header lengths record the unpadded section sizes; each section is then
/// padded to four bytes in the file.
#[must_use]
pub fn b3dm(payload: &[u8], feature_table_json: &[u8], batch_table_json: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(feature_table_json);
    pad_with(&mut body, b' ');
    body.extend_from_slice(batch_table_json);
    pad_with(&mut body, b' ');
    body.extend_from_slice(payload);

    let total = 28 + body.len();
    let mut out = Vec::with_capacity(total);
    out.extend_from_slice(&B3DM_MAGIC);
    for field in [
        1,
        total as u32,
        feature_table_json.len() as u32,
        0,
        batch_table_json.len() as u32,
        0,
    ] {
        out.extend_from_slice(&field.to_le_bytes());
    }
    out.extend_from_slice(&body);
    out
}
