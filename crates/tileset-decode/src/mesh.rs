//! CPU-side triangle mesh shared by the decoders and the simplifier.

use glam::{Mat4, Vec2, Vec3};

use crate::error::{DecodeError, DecodeResult};

/// One mesh vertex, laid out for direct upload as an interleaved buffer.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[repr(C)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub tex_coords: Vec2,
}

const _: () = assert!(std::mem::size_of::<Vertex>() == 32);

impl Vertex {
    #[must_use]
    pub const fn new(position: Vec3, normal: Vec3, tex_coords: Vec2) -> Self {
        Self {
            position,
            normal,
            tex_coords,
        }
    }
}

/// Triangle-list mesh: every three consecutive indices form one triangle.
///
/// The renderer only sees this type through the read accessors and the
/// [`needs_upload`](Self::needs_upload) flag, which is raised whenever the
/// buffers change after construction.
#[derive(Debug, Clone)]
pub struct Mesh {
    vertices: Vec<Vertex>,
    indices: Vec<u32>,
    transform: Mat4,
    needs_upload: bool,
}

impl Mesh {
    /// Build a mesh from decoded buffers with an identity model transform.
    #[must_use]
    pub fn new(vertices: Vec<Vertex>, indices: Vec<u32>) -> Self {
        Self {
            vertices,
            indices,
            transform: Mat4::IDENTITY,
            needs_upload: true,
        }
    }

    #[must_use]
    pub fn with_transform(mut self, transform: Mat4) -> Self {
        self.transform = transform;
        self
    }

    #[must_use]
    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    #[must_use]
    pub fn indices(&self) -> &[u32] {
        &self.indices
    }

    /// Model matrix to render this mesh with.
    #[must_use]
    pub fn transform(&self) -> Mat4 {
        self.transform
    }

    #[must_use]
    pub fn vertex_count(&self) -> usize {
        self.vertices.len()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Whether the buffers changed since the renderer last uploaded them.
    #[must_use]
    pub fn needs_upload(&self) -> bool {
        self.needs_upload
    }

    /// Acknowledge that the current buffers have been uploaded.
    pub fn mark_uploaded(&mut self) {
        self.needs_upload = false;
    }

    /// Flag the GPU copy as stale.
    pub fn mark_dirty(&mut self) {
        self.needs_upload = true;
    }

    /// Mutable access to both buffers for in-place editing.
    ///
    /// Marks the mesh dirty. Callers must keep the index invariants.
    pub fn buffers_mut(&mut self) -> (&mut Vec<Vertex>, &mut Vec<u32>) {
        self.needs_upload = true;
        (&mut self.vertices, &mut self.indices)
    }

    /// Replace both buffers at once.
    pub fn replace_buffers(&mut self, vertices: Vec<Vertex>, indices: Vec<u32>) {
        self.vertices = vertices;
        self.indices = indices;
        self.needs_upload = true;
    }

    /// Check that the index list is whole triangles referencing real vertices.
    pub fn validate(&self) -> DecodeResult<()> {
        if self.indices.len() % 3 != 0 {
            return Err(DecodeError::format(format!(
                "index count {} is not a multiple of 3",
                self.indices.len()
            )));
        }
        let vertex_count = self.vertices.len();
        match self
            .indices
            .iter()
            .find(|&&index| index as usize >= vertex_count)
        {
            Some(&index) => Err(DecodeError::IndexOutOfRange {
                index,
                vertex_count,
            }),
            None => Ok(()),
        }
    }

    /// Recompute smooth vertex normals by accumulating face normals.
    ///
    /// Degenerate triangles contribute nothing; vertices that end up with no
    /// contribution keep a zero normal.
    pub fn calculate_normals(&mut self) {
        for vertex in &mut self.vertices {
            vertex.normal = Vec3::ZERO;
        }

        for triangle in self.indices.chunks_exact(3) {
            let [a, b, c] = [
                triangle[0] as usize,
                triangle[1] as usize,
                triangle[2] as usize,
            ];
            let p0 = self.vertices[a].position;
            let face = (self.vertices[b].position - p0)
                .cross(self.vertices[c].position - p0)
                .normalize_or_zero();
            for index in [a, b, c] {
                self.vertices[index].normal += face;
            }
        }

        for vertex in &mut self.vertices {
            vertex.normal = vertex.normal.normalize_or_zero();
        }
        self.needs_upload = true;
    }
}
