//! Annotated tile tree and the description schema it is built from.

use std::fmt;
use std::path::{Path, PathBuf};

use glam::{DMat4, DVec3};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Name given to tiles without content.
pub const UNNAMED_TILE: &str = "Unnamed Tile";

/// Kind of file a content reference points at, derived from its extension.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ContentFormat {
    /// Batched 3D model tile wrapper.
    #[default]
    B3dm,
    /// Bare binary glTF container.
    Glb,
    /// Nested tileset description.
    Tileset,
    /// Any other extension; not loaded.
    Unknown,
}

impl ContentFormat {
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match extension.as_str() {
            "b3dm" => Self::B3dm,
            "glb" => Self::Glb,
            "json" => Self::Tileset,
            _ => Self::Unknown,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::B3dm => "B3DM",
            Self::Glb => "GLB",
            Self::Tileset => "TILESET",
            Self::Unknown => "UNKNOWN",
        }
    }

    /// Whether the file holds a mesh that can be decoded.
    #[must_use]
    pub fn is_mesh(self) -> bool {
        matches!(self, Self::B3dm | Self::Glb)
    }
}

impl fmt::Display for ContentFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Axis-aligned approximation of a tile's bounding volume.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BoundingVolume {
    pub center: DVec3,
    pub half_size: DVec3,
}

impl BoundingVolume {
    /// From an oriented box: center followed by three half-axis vectors.
    #[must_use]
    pub fn from_box(values: &[f64; 12]) -> Self {
        let center = DVec3::from_slice(&values[0..3]);
        let half_size = values[3..12]
            .chunks_exact(3)
            .map(|axis| DVec3::from_slice(axis).abs())
            .fold(DVec3::ZERO, |sum, axis| sum + axis);
        Self { center, half_size }
    }

    /// From a sphere: center followed by radius.
    #[must_use]
    pub fn from_sphere(values: &[f64; 4]) -> Self {
        Self {
            center: DVec3::from_slice(&values[0..3]),
            half_size: DVec3::splat(values[3].abs()),
        }
    }
}

/// How a tile's content relates to its parent's.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RefineMode {
    Add,
    #[default]
    Replace,
}

impl RefineMode {
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Add => "ADD",
            Self::Replace => "REPLACE",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Refinement {
    pub minimum_pixel_size: f64,
    pub mode: RefineMode,
}

impl Refinement {
    #[must_use]
    pub fn is_additive(&self) -> bool {
        self.mode == RefineMode::Add
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileContent {
    /// Reference as written in the description.
    pub uri: String,
    pub format: ContentFormat,
    /// File size on disk.
    pub byte_length: u64,
}

/// One tile of a resolved hierarchy.
///
/// Nested descriptions appear as a tile whose content format is
/// [`ContentFormat::Tileset`] and whose first child is the nested root.
#[derive(Debug, Clone, PartialEq)]
pub struct TileNode {
    pub name: String,
    /// Resolved content path, or the containing directory for tiles
    /// without content.
    pub path: PathBuf,
    pub geometric_error: f64,
    pub transform: DMat4,
    pub bounding_volume: BoundingVolume,
    pub refine: Refinement,
    /// `None` when the tile has no content or its content was skipped.
    pub content: Option<TileContent>,
    pub children: Vec<TileNode>,
}

impl TileNode {
    /// A content-less tile carrying the annotations of `description`.
    pub(crate) fn annotated(description: &TileDescription, base: &Path) -> Self {
        Self {
            name: UNNAMED_TILE.to_owned(),
            path: base.to_path_buf(),
            geometric_error: description.geometric_error.unwrap_or_default().max(0.0),
            transform: description.transform(),
            bounding_volume: description.bounding_volume(),
            refine: description.refinement(),
            content: None,
            children: Vec::new(),
        }
    }

    /// Depth-first, parent before children.
    pub fn iter(&self) -> Iter<'_> {
        Iter { stack: vec![self] }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    /// Number of tiles in this subtree, including this one.
    #[must_use]
    pub fn tile_count(&self) -> usize {
        self.iter().count()
    }

    /// The path, shortened from the left to roughly `max_len` bytes.
    ///
    /// Cuts at a separator when one exists so the file name stays whole.
    #[must_use]
    pub fn formatted_path(&self, max_len: usize) -> String {
        let path = self.path.to_string_lossy();
        if path.len() <= max_len {
            return path.into_owned();
        }
        let cut = (path.len() - max_len).min(path.len() - 1);
        match path.as_bytes()[..=cut]
            .iter()
            .rposition(|&b| b == b'/' || b == b'\\')
        {
            Some(start) => format!("...{}", &path[start..]),
            None => {
                let keep = path.chars().count().min(max_len);
                let tail: String = path.chars().skip(path.chars().count() - keep).collect();
                format!("...{tail}")
            }
        }
    }
}

impl<'a> IntoIterator for &'a TileNode {
    type Item = &'a TileNode;
    type IntoIter = Iter<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Pre-order iterator over a [`TileNode`] subtree.
#[derive(Debug, Clone)]
pub struct Iter<'a> {
    stack: Vec<&'a TileNode>,
}

impl<'a> Iterator for Iter<'a> {
    type Item = &'a TileNode;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack.extend(node.children.iter().rev());
        Some(node)
    }
}

/// A tile as written in a description file.
///
/// Annotations with the wrong shape fall back to their defaults. Children are
/// kept as raw values and parsed one at a time by [`take_children`].
///
/// [`take_children`]: TileDescription::take_children
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct TileDescription {
    #[serde(default, deserialize_with = "lenient")]
    pub content: Option<ContentDescription>,
    #[serde(default, deserialize_with = "lenient")]
    pub children: Vec<Value>,
    #[serde(default, deserialize_with = "lenient")]
    pub geometric_error: Option<f64>,
    #[serde(default, deserialize_with = "lenient")]
    pub transform: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "lenient")]
    pub bounding_volume: Option<BoundingVolumeDescription>,
    #[serde(default, deserialize_with = "lenient")]
    pub refine: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub minimum_pixel_size: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ContentDescription {
    #[serde(default, deserialize_with = "lenient")]
    pub uri: Option<String>,
    /// Pre-1.0 spelling of `uri`.
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct BoundingVolumeDescription {
    #[serde(rename = "box", default, deserialize_with = "lenient")]
    pub oriented_box: Option<Vec<f64>>,
    #[serde(default, deserialize_with = "lenient")]
    pub sphere: Option<Vec<f64>>,
}

/// Deserialize `T`, or its default when the value has another shape.
fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(T::deserialize(value).unwrap_or_else(|e| {
        tracing::debug!(error = %e, "ignoring malformed tile annotation");
        T::default()
    }))
}

impl TileDescription {
    /// Parse the children, dropping any that are not tile objects.
    pub fn take_children(&mut self) -> Vec<TileDescription> {
        std::mem::take(&mut self.children)
            .into_iter()
            .filter_map(|child| match Self::deserialize(child) {
                Ok(tile) => Some(tile),
                Err(e) => {
                    tracing::warn!(error = %e, "skipping malformed tile");
                    None
                }
            })
            .collect()
    }

    pub fn content_uri(&self) -> Option<&str> {
        let content = self.content.as_ref()?;
        content.uri.as_deref().or(content.url.as_deref())
    }

    fn transform(&self) -> DMat4 {
        match self.transform.as_deref() {
            Some(values) if values.len() == 16 => DMat4::from_cols_slice(values),
            Some(values) => {
                tracing::debug!(len = values.len(), "ignoring malformed tile transform");
                DMat4::IDENTITY
            }
            None => DMat4::IDENTITY,
        }
    }

    fn bounding_volume(&self) -> BoundingVolume {
        let Some(volume) = &self.bounding_volume else {
            return BoundingVolume::default();
        };
        if let Some(values) = volume
            .oriented_box
            .as_deref()
            .and_then(|v| <&[f64; 12]>::try_from(v).ok())
        {
            return BoundingVolume::from_box(values);
        }
        if let Some(values) = volume
            .sphere
            .as_deref()
            .and_then(|v| <&[f64; 4]>::try_from(v).ok())
        {
            return BoundingVolume::from_sphere(values);
        }
        BoundingVolume::default()
    }

    fn refinement(&self) -> Refinement {
        let mode = match self.refine.as_deref() {
            Some(mode) if mode.eq_ignore_ascii_case("ADD") => RefineMode::Add,
            _ => RefineMode::Replace,
        };
        Refinement {
            minimum_pixel_size: self.minimum_pixel_size.unwrap_or_default(),
            mode,
        }
    }
}
