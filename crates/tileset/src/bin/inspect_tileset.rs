//! Print a tileset's tile tree and per-tile simplification results.
//!
//! Run: `cargo run -p tileset --features tools --bin inspect_tileset -- <tileset.json> [ratio]`
//!
//! Log output is filtered through `RUST_LOG` (default `info`).

use std::env;
use std::process;

use tileset::{Dataset, LoadOptions, TileNode};
use tracing_subscriber::EnvFilter;

const DEFAULT_RATIO: f32 = 0.5;
const PATH_WIDTH: usize = 50;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();
    let Some(root) = args.get(1) else {
        eprintln!("usage: inspect_tileset <tileset.json> [ratio]");
        process::exit(2);
    };
    let ratio = match args.get(2).map(|arg| arg.parse::<f32>()) {
        None => DEFAULT_RATIO,
        Some(Ok(ratio)) => ratio,
        Some(Err(e)) => {
            eprintln!("invalid ratio {:?}: {e}", args[2]);
            process::exit(2);
        }
    };

    let mut dataset = match Dataset::load(root, &LoadOptions::default()) {
        Ok(dataset) => dataset,
        Err(e) => {
            eprintln!("Failed to load {root}: {e}");
            process::exit(1);
        }
    };

    println!("=== Tile tree ({} tiles) ===", dataset.tree().tile_count());
    print_tree(dataset.tree(), 0);

    let before: Vec<usize> = dataset
        .tiles()
        .iter()
        .map(|tile| tile.geometry.vertex_count())
        .collect();
    // Each call is bounded by the per-call collapse budget.
    let mut previous = dataset.vertex_count();
    loop {
        dataset.simplify_all(ratio);
        let current = dataset.vertex_count();
        if current == previous {
            break;
        }
        previous = current;
    }

    println!("\n=== Tiles at ratio {ratio} ===");
    for (tile, before) in dataset.tiles().iter().zip(before) {
        let error = tile.geometry.lod().map_or(0.0, |lod| lod.current_error());
        println!(
            "{}: {before} -> {} vertices, {} triangles, error {error:.4}",
            tile.path.display(),
            tile.geometry.vertex_count(),
            tile.geometry.mesh().triangle_count(),
        );
    }
    for path in dataset.failed() {
        println!("{}: FAILED", path.display());
    }
    println!("\nTotal vertices: {}", dataset.vertex_count());
}

fn print_tree(node: &TileNode, depth: usize) {
    let format = node
        .content
        .as_ref()
        .map_or("-", |content| content.format.label());
    println!(
        "{:indent$}{} [{format}] error={} refine={} {}",
        "",
        node.name,
        node.geometric_error,
        node.refine.mode.label(),
        node.formatted_path(PATH_WIDTH),
        indent = depth * 2,
    );
    for child in &node.children {
        print_tree(child, depth + 1);
    }
}
