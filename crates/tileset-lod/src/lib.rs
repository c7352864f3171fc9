//! Progressive edge-collapse simplification.
//!
//! A [`ProgressiveLod`] owns one [`Mesh`] and drives it toward a target
//! simplification ratio in small, bounded steps so it can be called once per
//! frame. Collapses are destructive; asking for a finer mesh than the last
//! request restores the original buffers and replays from there.
//!
//! ```text
//! Uninitialized --precompute--> Precomputed --simplify_to(r)--> Simplified(r)
//!                                                   ^                  |
//!                                                   +------------------+
//! ```

mod error;
mod params;
mod queue;

use std::collections::BTreeMap;

use tileset_decode::{Mesh, Vertex};

pub use error::{LodError, LodResult};
pub use params::LodParameters;
use queue::CollapseQueue;

/// One undirected edge of the original topology.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeCollapse {
    /// Surviving endpoint (the smaller index).
    pub v1: u32,
    /// Endpoint merged into `v1`.
    pub v2: u32,
    pub cost: f32,
    /// Triangles of the original index buffer that use this edge.
    pub triangles: Vec<usize>,
}

/// Candidate set and snapshot built on first use.
#[derive(Debug)]
struct Precomputed {
    original_vertices: Vec<Vertex>,
    original_indices: Vec<u32>,
    live: Vec<bool>,
    candidates: Vec<EdgeCollapse>,
    queue: CollapseQueue,
}

impl Precomputed {
    fn build(mesh: &Mesh, params: &LodParameters) -> Self {
        let original_vertices = mesh.vertices().to_vec();
        let original_indices = mesh.indices().to_vec();
        let vertex_count = original_vertices.len();

        // Sorted keys give a stable candidate order.
        let mut edges: BTreeMap<(u32, u32), Vec<usize>> = BTreeMap::new();
        for (triangle, corners) in original_indices.chunks_exact(3).enumerate() {
            if corners.iter().any(|&v| v as usize >= vertex_count) {
                continue;
            }
            for edge in 0..3 {
                let (a, b) = (corners[edge], corners[(edge + 1) % 3]);
                if a == b {
                    continue;
                }
                edges.entry((a.min(b), a.max(b))).or_default().push(triangle);
            }
        }

        let mut boundary = vec![false; vertex_count];
        for (&(a, b), triangles) in &edges {
            if triangles.len() == 1 {
                boundary[a as usize] = true;
                boundary[b as usize] = true;
            }
        }

        let candidates: Vec<EdgeCollapse> = edges
            .into_iter()
            .filter(|((a, b), triangles)| {
                !(params.preserve_topology
                    && triangles.len() > 1
                    && boundary[*a as usize]
                    && boundary[*b as usize])
            })
            .map(|((v1, v2), triangles)| EdgeCollapse {
                v1,
                v2,
                cost: params.collapse_cost(
                    &original_vertices[v1 as usize],
                    &original_vertices[v2 as usize],
                ),
                triangles,
            })
            .collect();
        let queue = CollapseQueue::from_costs(candidates.iter().map(|c| c.cost));

        tracing::debug!(
            vertices = vertex_count,
            triangles = original_indices.len() / 3,
            candidates = candidates.len(),
            preserve_topology = params.preserve_topology,
            "precomputed collapse candidates"
        );

        Self {
            original_vertices,
            original_indices,
            live: vec![true; vertex_count],
            candidates,
            queue,
        }
    }

    fn rebuild_queue(&mut self) {
        self.queue = CollapseQueue::from_costs(self.candidates.iter().map(|c| c.cost));
    }

    fn is_live(&self, vertex: u32) -> bool {
        self.live.get(vertex as usize).copied().unwrap_or(false)
    }
}

/// Ratio-driven simplifier bound to a single mesh.
#[derive(Debug)]
pub struct ProgressiveLod {
    mesh: Mesh,
    params: LodParameters,
    state: Option<Precomputed>,
    current_vertex_count: usize,
    current_error: f32,
    last_ratio: f32,
}

impl ProgressiveLod {
    #[must_use]
    pub fn new(mesh: Mesh, params: LodParameters) -> Self {
        Self {
            current_vertex_count: mesh.vertex_count(),
            mesh,
            params,
            state: None,
            current_error: 0.0,
            last_ratio: 0.0,
        }
    }

    /// Snapshot the mesh and build the candidate queue. Later calls do nothing.
    pub fn precompute(&mut self) {
        if self.state.is_none() {
            self.state = Some(Precomputed::build(&self.mesh, &self.params));
        }
    }

    #[must_use]
    pub fn is_precomputed(&self) -> bool {
        self.state.is_some()
    }

    /// Move toward `ratio` (0 = original, 1 = fully collapsed).
    ///
    /// Out-of-range ratios are clamped and non-finite ones treated as 0. At
    /// most [`LodParameters::max_collapses_per_call`] collapses are applied,
    /// so reaching a distant target can take several calls.
    #[allow(clippy::cast_sign_loss)]
    pub fn simplify_to(&mut self, ratio: f32) {
        let ratio = if ratio.is_finite() {
            ratio.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let state = self
            .state
            .get_or_insert_with(|| Precomputed::build(&self.mesh, &self.params));

        if ratio < self.last_ratio {
            tracing::debug!(from = self.last_ratio, to = ratio, "restoring original mesh");
            self.mesh.replace_buffers(
                state.original_vertices.clone(),
                state.original_indices.clone(),
            );
            state.live.fill(true);
            state.rebuild_queue();
            self.current_vertex_count = state.original_vertices.len();
            self.current_error = 0.0;
        }
        self.last_ratio = ratio;

        let original = state.original_vertices.len();
        let target = (original as f64 * f64::from(1.0 - ratio)).round() as usize;

        let mut applied = 0;
        while self.current_vertex_count > target && applied < self.params.max_collapses_per_call {
            let Some(index) = state.queue.pop() else {
                break;
            };
            let candidate = &state.candidates[index];
            if !(state.is_live(candidate.v1) && state.is_live(candidate.v2)) {
                continue;
            }
            collapse(&mut self.mesh, &mut state.live, candidate.v1, candidate.v2);
            self.current_vertex_count -= 1;
            self.current_error = candidate.cost;
            applied += 1;
        }

        remove_degenerate_triangles(&mut self.mesh, &state.live);
        tracing::trace!(
            ratio,
            target,
            applied,
            vertices = self.current_vertex_count,
            error = self.current_error,
            "simplified"
        );
    }

    /// Whether [`update_parameters`](Self::update_parameters) would accept `params`.
    ///
    /// The topology policy is fixed once candidates are precomputed.
    pub fn check_parameters(&self, params: &LodParameters) -> LodResult<()> {
        if self.state.is_some() && params.preserve_topology != self.params.preserve_topology {
            return Err(LodError::TopologyPolicyLocked);
        }
        Ok(())
    }

    /// Replace the weights and limits.
    ///
    /// Costs are recomputed and the queue rebuilt if candidates exist.
    /// Changing `preserve_topology` after precomputation is refused.
    pub fn update_parameters(&mut self, params: LodParameters) -> LodResult<()> {
        self.check_parameters(&params)?;
        if let Some(state) = &mut self.state {
            for candidate in &mut state.candidates {
                candidate.cost = params.collapse_cost(
                    &state.original_vertices[candidate.v1 as usize],
                    &state.original_vertices[candidate.v2 as usize],
                );
            }
            state.rebuild_queue();
        }
        self.params = params;
        Ok(())
    }

    /// Vertices still referenced by the simplified mesh.
    #[must_use]
    pub fn current_vertex_count(&self) -> usize {
        self.current_vertex_count
    }

    /// Cost of the most recently applied collapse.
    #[must_use]
    pub fn current_error(&self) -> f32 {
        self.current_error
    }

    #[must_use]
    pub fn last_ratio(&self) -> f32 {
        self.last_ratio
    }

    #[must_use]
    pub fn parameters(&self) -> &LodParameters {
        &self.params
    }

    /// Candidates in queue-index order; empty before precomputation.
    #[must_use]
    pub fn candidates(&self) -> &[EdgeCollapse] {
        match &self.state {
            Some(state) => state.candidates.as_slice(),
            None => &[],
        }
    }

    /// Whether `vertex` has not been merged away.
    #[must_use]
    pub fn is_live(&self, vertex: u32) -> bool {
        match &self.state {
            Some(state) => state.is_live(vertex),
            None => (vertex as usize) < self.mesh.vertex_count(),
        }
    }

    #[must_use]
    pub fn mesh(&self) -> &Mesh {
        &self.mesh
    }

    /// Acknowledge that the current buffers have been consumed by the renderer.
    pub fn mark_uploaded(&mut self) {
        self.mesh.mark_uploaded();
    }

    #[must_use]
    pub fn into_mesh(self) -> Mesh {
        self.mesh
    }
}

/// Merge `removed` into `survivor` and redirect every index that used it.
fn collapse(mesh: &mut Mesh, live: &mut [bool], survivor: u32, removed: u32) {
    let (vertices, indices) = mesh.buffers_mut();
    let gone = vertices[removed as usize];
    let kept = &mut vertices[survivor as usize];
    kept.position = (kept.position + gone.position) * 0.5;
    kept.normal = (kept.normal + gone.normal).normalize_or_zero();
    kept.tex_coords = (kept.tex_coords + gone.tex_coords) * 0.5;
    live[removed as usize] = false;

    for index in indices.iter_mut().filter(|index| **index == removed) {
        *index = survivor;
    }
}

/// Drop triangles touching a dead vertex or repeating a corner.
fn remove_degenerate_triangles(mesh: &mut Mesh, live: &[bool]) {
    let (_, indices) = mesh.buffers_mut();
    let is_live = |v: u32| live.get(v as usize).copied().unwrap_or(false);
    let kept: Vec<u32> = indices
        .chunks_exact(3)
        .filter(|t| {
            t.iter().all(|&v| is_live(v)) && t[0] != t[1] && t[1] != t[2] && t[0] != t[2]
        })
        .flatten()
        .copied()
        .collect();
    *indices = kept;
}
