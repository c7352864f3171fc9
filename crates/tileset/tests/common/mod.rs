//! On-disk tileset fixtures shared by the integration tests.

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tempfile::TempDir;
use tileset_decode::fixtures::{self, FixturePrimitive, LegacyOptions};

pub fn init_logging() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

/// Temporary directory that tileset files are written into.
pub struct TilesetDir {
    dir: TempDir,
}

impl TilesetDir {
    pub fn new() -> Self {
        init_logging();
        Self {
            dir: TempDir::new().expect("failed to create temporary directory"),
        }
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    /// Canonical form of `relative`, as the resolver reports it.
    pub fn canonical(&self, relative: &str) -> PathBuf {
        fs::canonicalize(self.path(relative)).expect("fixture file should exist")
    }

    pub fn write_bytes(&self, relative: &str, bytes: &[u8]) -> PathBuf {
        let path = self.path(relative);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).expect("failed to create fixture directory");
        }
        fs::write(&path, bytes).expect("failed to write fixture");
        path
    }

    pub fn write_json(&self, relative: &str, value: &Value) -> PathBuf {
        let bytes = serde_json::to_vec_pretty(value).expect("fixture JSON should serialize");
        self.write_bytes(relative, &bytes)
    }

    pub fn root(&self) -> &Path {
        self.dir.path()
    }
}

/// b3dm tile wrapping a version 2 container with one quad (4 vertices).
pub fn b3dm_quad() -> Vec<u8> {
    let glb = fixtures::glb(&[FixturePrimitive::quad()], None);
    fixtures::b3dm(&glb, br#"{"BATCH_LENGTH":0}"#, b"")
}

/// b3dm tile wrapping a legacy container with one quad (4 vertices).
pub fn legacy_b3dm_quad() -> Vec<u8> {
    let legacy = fixtures::legacy_glb(&[FixturePrimitive::quad()], &LegacyOptions::default());
    fixtures::b3dm(&legacy, b"{}", b"")
}

/// Bare version 2 container with one triangle (3 vertices).
pub fn glb_triangle() -> Vec<u8> {
    fixtures::glb(&[FixturePrimitive::triangle()], None)
}

/// Root with two b3dm leaves and a nested description holding one glb.
pub fn write_example(dir: &TilesetDir) -> PathBuf {
    dir.write_bytes("a.b3dm", &b3dm_quad());
    dir.write_bytes("b.b3dm", &legacy_b3dm_quad());
    dir.write_bytes("nested/leaf.glb", &glb_triangle());
    dir.write_json(
        "nested/tileset.json",
        &serde_json::json!({
            "asset": { "version": "1.0" },
            "root": {
                "geometricError": 5.0,
                "content": { "uri": "leaf.glb" }
            }
        }),
    );
    dir.write_json(
        "tileset.json",
        &serde_json::json!({
            "asset": { "version": "1.0" },
            "geometricError": 500.0,
            "root": {
                "geometricError": 100.0,
                "refine": "ADD",
                "boundingVolume": { "sphere": [0.0, 0.0, 0.0, 10.0] },
                "children": [
                    { "geometricError": 10.0, "content": { "uri": "a.b3dm" } },
                    { "geometricError": 10.0, "content": { "uri": "b.b3dm" } },
                    { "geometricError": 20.0, "content": { "uri": "nested/tileset.json" } }
                ]
            }
        }),
    )
}
