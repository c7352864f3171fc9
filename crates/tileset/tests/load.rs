//! Decoding tiles from disk and assembling datasets.

mod common;

use common::{TilesetDir, b3dm_quad, glb_triangle, write_example};
use serde_json::json;
use tileset::{Dataset, Error, LodParameters, LoadOptions, TileGeometry, load_content};

#[test]
fn loads_each_container_kind() {
    let dir = TilesetDir::new();
    write_example(&dir);

    assert_eq!(load_content(dir.path("a.b3dm")).unwrap().vertex_count(), 4);
    assert_eq!(load_content(dir.path("b.b3dm")).unwrap().triangle_count(), 2);
    assert_eq!(load_content(dir.path("nested/leaf.glb")).unwrap().vertex_count(), 3);
}

#[test]
fn extension_match_ignores_case() {
    let dir = TilesetDir::new();
    let path = dir.write_bytes("LEAF.GLB", &glb_triangle());
    assert_eq!(load_content(path).unwrap().vertex_count(), 3);
}

#[test]
fn missing_file_is_an_io_error() {
    let dir = TilesetDir::new();
    assert!(matches!(
        load_content(dir.path("absent.b3dm")),
        Err(Error::Io { .. })
    ));
}

#[test]
fn corrupt_tile_is_a_decode_error() {
    let dir = TilesetDir::new();
    let mut bytes = b3dm_quad();
    bytes.truncate(40);
    let path = dir.write_bytes("corrupt.b3dm", &bytes);
    let err = load_content(&path).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }));
    assert!(err.to_string().contains("corrupt.b3dm"));
}

#[test]
fn dataset_loads_tree_and_meshes() {
    let dir = TilesetDir::new();
    let root = write_example(&dir);

    let dataset = Dataset::load(&root, &LoadOptions::default()).unwrap();
    assert_eq!(dataset.root_path(), root.as_path());
    assert_eq!(dataset.tree().children.len(), 3);
    assert_eq!(dataset.tiles().len(), 3);
    assert!(dataset.failed().is_empty());
    assert_eq!(dataset.vertex_count(), 4 + 4 + 3);
    assert!(
        dataset
            .tiles()
            .iter()
            .all(|tile| matches!(tile.geometry, TileGeometry::Progressive(_)))
    );
}

#[test]
fn dataset_simplifies_every_tile() {
    let dir = TilesetDir::new();
    let root = write_example(&dir);

    let mut dataset = Dataset::load(&root, &LoadOptions::default()).unwrap();
    dataset.simplify_all(0.5);
    assert_eq!(dataset.vertex_count(), 2 + 2 + 2);
    for tile in dataset.tiles() {
        let mesh = tile.geometry.mesh();
        assert!(mesh.validate().is_ok());
        assert!(mesh.needs_upload());
    }

    dataset.simplify_all(0.0);
    assert_eq!(dataset.vertex_count(), 11);
}

#[test]
fn static_tiles_ignore_simplification() {
    let dir = TilesetDir::new();
    let root = write_example(&dir);

    let options = LoadOptions {
        simplify: false,
        ..LoadOptions::default()
    };
    let mut dataset = Dataset::load(&root, &options).unwrap();
    dataset.simplify_all(1.0);
    assert_eq!(dataset.vertex_count(), 11);
    assert!(dataset.tiles().iter().all(|tile| tile.geometry.lod().is_none()));
}

#[test]
fn dataset_skips_undecodable_tiles() {
    let dir = TilesetDir::new();
    dir.write_bytes("good.b3dm", &b3dm_quad());
    dir.write_bytes("bad.b3dm", b"b3dm but not really");
    let root = dir.write_json(
        "tileset.json",
        &json!({ "root": { "children": [
            { "content": { "uri": "bad.b3dm" } },
            { "content": { "uri": "good.b3dm" } }
        ]}}),
    );

    let dataset = Dataset::load(&root, &LoadOptions::default()).unwrap();
    assert_eq!(dataset.tiles().len(), 1);
    assert_eq!(dataset.failed(), [dir.canonical("bad.b3dm")]);
}

#[test]
fn dataset_parameter_updates_respect_topology_lock() {
    let dir = TilesetDir::new();
    let root = write_example(&dir);
    let mut dataset = Dataset::load(&root, &LoadOptions::default()).unwrap();

    let reweighted = LodParameters {
        uv_weight: 0.0,
        ..LodParameters::default()
    };
    assert!(dataset.update_parameters(reweighted).is_ok());

    dataset.simplify_all(0.25);
    let relaxed = LodParameters {
        preserve_topology: false,
        ..reweighted
    };
    assert!(matches!(
        dataset.update_parameters(relaxed),
        Err(Error::Lod(_))
    ));
}

#[test]
fn refused_parameter_update_leaves_every_tile_unchanged() {
    let dir = TilesetDir::new();
    let root = write_example(&dir);
    let mut dataset = Dataset::load(&root, &LoadOptions::default()).unwrap();
    if let TileGeometry::Progressive(lod) = &mut dataset.tiles_mut()[1].geometry {
        lod.precompute();
    }

    let relaxed = LodParameters {
        preserve_topology: false,
        ..LodParameters::default()
    };
    assert!(matches!(
        dataset.update_parameters(relaxed),
        Err(Error::Lod(_))
    ));
    let policies: Vec<bool> = dataset
        .tiles()
        .iter()
        .map(|tile| tile.geometry.lod().unwrap().parameters().preserve_topology)
        .collect();
    assert_eq!(policies, [true, true, true]);
}

#[test]
fn dataset_requires_a_root_description() {
    let dir = TilesetDir::new();
    assert!(Dataset::load(dir.path("tileset.json"), &LoadOptions::default()).is_err());
}
