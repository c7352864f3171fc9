//! Behaviour of `ProgressiveLod` on whole meshes.

use glam::{Vec2, Vec3};
use proptest::prelude::*;
use tileset_decode::{Mesh, Vertex};
use tileset_lod::{LodParameters, ProgressiveLod};

/// Unit cube with four unshared vertices per face.
fn cube() -> Mesh {
    let faces = [
        (Vec3::X, Vec3::Y, Vec3::Z),
        (Vec3::NEG_X, Vec3::Z, Vec3::Y),
        (Vec3::Y, Vec3::Z, Vec3::X),
        (Vec3::NEG_Y, Vec3::X, Vec3::Z),
        (Vec3::Z, Vec3::X, Vec3::Y),
        (Vec3::NEG_Z, Vec3::Y, Vec3::X),
    ];
    let corners = [
        Vec2::new(0.0, 0.0),
        Vec2::new(1.0, 0.0),
        Vec2::new(1.0, 1.0),
        Vec2::new(0.0, 1.0),
    ];
    let mut vertices = Vec::new();
    let mut indices = Vec::new();
    for (normal, u, v) in faces {
        let base = vertices.len() as u32;
        for corner in corners {
            let position = normal * 0.5 + u * (corner.x - 0.5) + v * (corner.y - 0.5);
            vertices.push(Vertex::new(position, normal, corner));
        }
        indices.extend([base, base + 1, base + 2, base, base + 2, base + 3]);
    }
    Mesh::new(vertices, indices)
}

/// `n` by `n` unit quads over shared vertices, texture space matching the XY plane.
fn grid(n: u32) -> Mesh {
    let mut vertices = Vec::new();
    for y in 0..=n {
        for x in 0..=n {
            let cell = Vec2::new(x as f32, y as f32);
            vertices.push(Vertex::new(cell.extend(0.0), Vec3::Z, cell));
        }
    }
    let mut indices = Vec::new();
    for y in 0..n {
        for x in 0..n {
            let i = y * (n + 1) + x;
            indices.extend([i, i + 1, i + n + 2, i, i + n + 2, i + n + 1]);
        }
    }
    Mesh::new(vertices, indices)
}

fn unlimited() -> LodParameters {
    LodParameters {
        max_collapses_per_call: usize::MAX,
        ..LodParameters::default()
    }
}

fn assert_consistent(lod: &ProgressiveLod) {
    let mesh = lod.mesh();
    assert!(mesh.validate().is_ok());
    assert!(mesh.indices().iter().all(|&i| lod.is_live(i)));
    let live = (0..mesh.vertex_count() as u32)
        .filter(|&v| lod.is_live(v))
        .count();
    assert_eq!(live, lod.current_vertex_count());
}

#[test]
fn cube_halves_to_twelve_vertices() {
    let mut lod = ProgressiveLod::new(cube(), LodParameters::default());
    assert_eq!(lod.mesh().vertex_count(), 24);
    assert_eq!(lod.mesh().triangle_count(), 12);

    lod.simplify_to(0.5);
    assert!(lod.current_vertex_count() <= 12);
    assert!(lod.current_error() > 0.0);
    assert_consistent(&lod);
}

#[test]
fn budget_bounds_each_call() {
    let params = LodParameters {
        max_collapses_per_call: 3,
        ..LodParameters::default()
    };
    let mut lod = ProgressiveLod::new(grid(4), params);
    lod.simplify_to(1.0);
    assert_eq!(lod.current_vertex_count(), 22);
    lod.simplify_to(1.0);
    assert_eq!(lod.current_vertex_count(), 19);
    assert_consistent(&lod);
}

#[test]
fn repeated_calls_converge_on_target() {
    let params = LodParameters {
        max_collapses_per_call: 2,
        ..LodParameters::default()
    };
    let mut lod = ProgressiveLod::new(grid(3), params);
    let mut previous = lod.current_vertex_count();
    for _ in 0..32 {
        lod.simplify_to(0.5);
        assert!(lod.current_vertex_count() <= previous);
        previous = lod.current_vertex_count();
    }
    // 16 vertices, target round(16 * 0.5).
    assert_eq!(lod.current_vertex_count(), 8);
}

#[test]
fn reset_matches_fresh_simplification() {
    let mut driven = ProgressiveLod::new(grid(4), unlimited());
    driven.simplify_to(0.8);
    driven.simplify_to(0.3);

    let mut fresh = ProgressiveLod::new(grid(4), unlimited());
    fresh.simplify_to(0.3);

    assert_eq!(driven.current_vertex_count(), fresh.current_vertex_count());
    assert_eq!(driven.mesh().indices(), fresh.mesh().indices());
    assert_eq!(driven.mesh().vertices(), fresh.mesh().vertices());
}

proptest! {
    #[test]
    fn invariants_hold_across_ratio_sequences(
        n in 1u32..6,
        ratios in prop::collection::vec(0.0f32..=1.0, 1..8),
        preserve_topology in any::<bool>(),
    ) {
        let params = LodParameters { preserve_topology, ..LodParameters::default() };
        let mut lod = ProgressiveLod::new(grid(n), params);
        for ratio in ratios {
            lod.simplify_to(ratio);
            assert_consistent(&lod);
        }
    }

    #[test]
    fn increasing_ratio_never_exceeds_direct(
        n in 1u32..6,
        a in 0.0f32..=1.0,
        b in 0.0f32..=1.0,
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let mut stepped = ProgressiveLod::new(grid(n), LodParameters::default());
        stepped.simplify_to(low);
        stepped.simplify_to(high);

        let mut direct = ProgressiveLod::new(grid(n), LodParameters::default());
        direct.simplify_to(high);

        prop_assert!(stepped.current_vertex_count() <= direct.current_vertex_count());
    }

    #[test]
    fn repeating_a_ratio_changes_nothing(n in 1u32..6, ratio in 0.0f32..=1.0) {
        let mut lod = ProgressiveLod::new(grid(n), unlimited());
        lod.simplify_to(ratio);
        let count = lod.current_vertex_count();
        let indices = lod.mesh().indices().to_vec();
        lod.simplify_to(ratio);
        prop_assert_eq!(lod.current_vertex_count(), count);
        prop_assert_eq!(lod.mesh().indices(), indices.as_slice());
    }
}
