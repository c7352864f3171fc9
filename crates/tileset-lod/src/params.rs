//! Tunable simplification settings.

use serde::{Deserialize, Serialize};
use tileset_decode::Vertex;

/// Weights and limits steering edge-collapse order.
///
/// Missing fields fall back to their defaults when deserialized, so a
/// stored settings file only needs the values it overrides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LodParameters {
    /// Weight of the distance between endpoint positions.
    pub geometry_weight: f32,
    /// Weight of `1 - dot(n1, n2)` between endpoint normals.
    pub normal_weight: f32,
    /// Weight of the distance between endpoint texture coordinates.
    pub uv_weight: f32,
    /// Keep interior edges that join two boundary vertices out of the
    /// candidate set.
    pub preserve_topology: bool,
    /// Upper bound on collapses applied by one `simplify_to` call.
    pub max_collapses_per_call: usize,
}

impl Default for LodParameters {
    fn default() -> Self {
        Self {
            geometry_weight: 0.7,
            normal_weight: 0.2,
            uv_weight: 0.1,
            preserve_topology: true,
            max_collapses_per_call: 50,
        }
    }
}

impl LodParameters {
    /// Cost of collapsing the edge between `a` and `b`. Lower collapses first.
    #[must_use]
    pub fn collapse_cost(&self, a: &Vertex, b: &Vertex) -> f32 {
        let geometry = a.position.distance(b.position);
        let normal = 1.0 - a.normal.dot(b.normal);
        let uv = a.tex_coords.distance(b.tex_coords);
        self.geometry_weight * geometry + self.normal_weight * normal + self.uv_weight * uv
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Vec2, Vec3};

    #[test]
    fn partial_settings_keep_defaults() {
        let params: LodParameters =
            serde_json::from_str(r#"{"normal_weight":0.5,"max_collapses_per_call":8}"#).unwrap();
        assert_eq!(params.normal_weight, 0.5);
        assert_eq!(params.max_collapses_per_call, 8);
        assert_eq!(params.geometry_weight, 0.7);
        assert!(params.preserve_topology);
    }

    #[test]
    fn settings_serialize_every_field() {
        let json = serde_json::to_value(LodParameters::default()).unwrap();
        for field in [
            "geometry_weight",
            "normal_weight",
            "uv_weight",
            "preserve_topology",
            "max_collapses_per_call",
        ] {
            assert!(json.get(field).is_some(), "{field}");
        }
    }

    #[test]
    fn cost_combines_weighted_terms() {
        let a = Vertex::new(Vec3::ZERO, Vec3::Z, Vec2::ZERO);
        let b = Vertex::new(Vec3::new(3.0, 4.0, 0.0), Vec3::X, Vec2::new(0.0, 2.0));
        let params = LodParameters::default();
        let expected = 0.7 * 5.0 + 0.2 * 1.0 + 0.1 * 2.0;
        assert!((params.collapse_cost(&a, &b) - expected).abs() < 1e-5);
    }

    #[test]
    fn identical_vertices_cost_nothing() {
        let a = Vertex::new(Vec3::ONE, Vec3::Y, Vec2::splat(0.5));
        assert_eq!(LodParameters::default().collapse_cost(&a, &a), 0.0);
    }
}
