//! Tileset description traversal.
//!
//! Content references are resolved against the directory of the description
//! that contains them and canonicalized. Every traversal owns its own set of
//! visited canonical paths, so a file is processed at most once per call even
//! when descriptions reference each other in a cycle.
//!
//! Only the root description is required to load. Anything below it that
//! cannot be read or parsed is logged and contributes nothing.

use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::tree::{ContentFormat, TileContent, TileDescription, TileNode};

/// Absolute paths of every mesh tile reachable from `root`, in depth-first order.
pub fn list_content_paths(root: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let (root_path, description) = read_root(root.as_ref())?;
    let mut traversal = Traversal::starting_at(&root_path);
    let mut paths = Vec::new();

    let mut pending = vec![(description, parent_dir(&root_path))];
    while let Some((mut tile, base)) = pending.pop() {
        // Pushed first so a nested description this tile expands into is
        // walked before its siblings.
        pending.extend(tile.take_children().into_iter().rev().map(|child| (child, base.clone())));

        let Some(uri) = tile.content_uri() else {
            continue;
        };
        let joined = normalize_lexically(&base.join(uri));
        match traversal.claim(&joined) {
            Ok(Some(path)) => match ContentFormat::from_path(&path) {
                format if format.is_mesh() => {
                    tracing::info!(path = %path.display(), %format, "found tile content");
                    paths.push(path);
                }
                ContentFormat::Tileset => match read_nested(&path) {
                    Ok(nested) => {
                        let nested_base = parent_dir(&path);
                        pending.push((nested, nested_base));
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "skipping nested tileset");
                    }
                },
                _ => tracing::debug!(path = %path.display(), "ignoring unsupported content"),
            },
            Ok(None) => tracing::debug!(path = %joined.display(), "skipping visited content"),
            Err(e) => tracing::warn!(path = %joined.display(), error = %e, "skipping tile content"),
        }
    }

    Ok(paths)
}

/// The annotated tile hierarchy rooted at `root`.
///
/// A nested description becomes the first child of the tile referencing it,
/// ahead of that tile's own children.
pub fn build_tile_tree(root: impl AsRef<Path>) -> Result<TileNode> {
    let (root_path, description) = read_root(root.as_ref())?;
    let mut traversal = Traversal::starting_at(&root_path);
    Ok(traversal.build(description, &parent_dir(&root_path)))
}

struct Traversal {
    visited: HashSet<PathBuf>,
}

impl Traversal {
    fn starting_at(root: &Path) -> Self {
        Self {
            visited: HashSet::from([root.to_path_buf()]),
        }
    }

    /// Canonicalize `path` and mark it visited. `None` if it already was.
    fn claim(&mut self, path: &Path) -> Result<Option<PathBuf>> {
        let canonical = fs::canonicalize(path).map_err(|e| Error::io(path, e))?;
        if self.visited.insert(canonical.clone()) {
            Ok(Some(canonical))
        } else {
            Ok(None)
        }
    }

    fn build(&mut self, mut description: TileDescription, base: &Path) -> TileNode {
        let mut node = TileNode::annotated(&description, base);

        if let Some(uri) = description.content_uri() {
            node.name = uri.to_owned();
            node.path = normalize_lexically(&base.join(uri));
            match self.claim(&node.path) {
                Ok(Some(path)) => self.attach_content(&mut node, uri, path),
                Ok(None) => {
                    tracing::debug!(path = %node.path.display(), "skipping visited content");
                }
                Err(e) => {
                    tracing::warn!(path = %node.path.display(), error = %e, "skipping tile content");
                }
            }
        }

        for child in description.take_children() {
            let child = self.build(child, base);
            node.children.push(child);
        }
        node
    }

    fn attach_content(&mut self, node: &mut TileNode, uri: &str, path: PathBuf) {
        let format = ContentFormat::from_path(&path);
        let byte_length = fs::metadata(&path).map(|m| m.len()).unwrap_or_default();
        node.content = Some(TileContent {
            uri: uri.to_owned(),
            format,
            byte_length,
        });
        node.path.clone_from(&path);

        if format == ContentFormat::Tileset {
            match read_nested(&path) {
                Ok(nested) => {
                    let child = self.build(nested, &parent_dir(&path));
                    node.children.push(child);
                }
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping nested tileset");
                }
            }
        }
    }
}

/// Read the root description; it must carry a `root` tile.
fn read_root(path: &Path) -> Result<(PathBuf, TileDescription)> {
    let canonical = fs::canonicalize(path).map_err(|e| Error::io(path, e))?;
    let mut document = read_document(&canonical)?;
    let root = document
        .get_mut("root")
        .map(Value::take)
        .ok_or_else(|| Error::MissingRoot(canonical.clone()))?;
    let description = parse_tile(root, &canonical)?;
    Ok((canonical, description))
}

/// Read a nested description. Documents without `root` are a tile themselves.
fn read_nested(path: &Path) -> Result<TileDescription> {
    let mut document = read_document(path)?;
    let tile = if document.get("root").is_some() {
        document["root"].take()
    } else {
        document
    };
    parse_tile(tile, path)
}

fn read_document(path: &Path) -> Result<Value> {
    let bytes = fs::read(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_slice(&bytes).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_tile(value: Value, path: &Path) -> Result<TileDescription> {
    TileDescription::deserialize(value).map_err(|source| Error::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

/// Collapse `.` and `..` components without touching the file system.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match normalized.components().next_back() {
                Some(Component::Normal(_)) => {
                    normalized.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => normalized.push(".."),
            },
            other => normalized.push(other),
        }
    }
    normalized
}
