//! Batched 3D model (b3dm) tile wrapper and container dispatch.

use crate::endian::{pad4, read_le_at};
use crate::error::{DecodeError, DecodeResult};
use crate::gltf1::decode_gltf1;
use crate::glb::{GlbHeader, decode_glb};
use crate::mesh::Mesh;

/// Magic of the tile wrapper.
pub const B3DM_MAGIC: [u8; 4] = *b"b3dm";
/// Size of the packed wrapper header.
pub const B3DM_HEADER_LEN: usize = 28;

/// Packed wrapper header. All fields are little-endian on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct B3dmHeader {
    pub version: u32,
    pub byte_length: u32,
    pub feature_table_json_len: u32,
    pub feature_table_bin_len: u32,
    pub batch_table_json_len: u32,
    pub batch_table_bin_len: u32,
}

impl B3dmHeader {
    pub fn parse(bytes: &[u8]) -> DecodeResult<Self> {
        if bytes.len() < B3DM_HEADER_LEN {
            return Err(DecodeError::format(format!(
                "{} bytes is too small for a b3dm header",
                bytes.len()
            )));
        }
        if bytes[..4] != B3DM_MAGIC {
            return Err(DecodeError::format(format!(
                "bad b3dm magic {:?}",
                &bytes[..4]
            )));
        }
        let field = |index: usize| read_le_at::<u32>(bytes, 4 + index * 4).unwrap_or_default();
        Ok(Self {
            version: field(0),
            byte_length: field(1),
            feature_table_json_len: field(2),
            feature_table_bin_len: field(3),
            batch_table_json_len: field(4),
            batch_table_bin_len: field(5),
        })
    }

    /// Offset of the embedded container.
    ///
    /// Each of the four table sections is padded to four bytes on its own.
    #[must_use]
    pub fn payload_offset(&self) -> usize {
        B3DM_HEADER_LEN
            + [
                self.feature_table_json_len,
                self.feature_table_bin_len,
                self.batch_table_json_len,
                self.batch_table_bin_len,
            ]
            .into_iter()
            .map(|len| pad4(len as usize))
            .sum::<usize>()
    }
}

/// Whether a file extension names a bare binary container rather than a wrapped tile.
#[must_use]
pub fn is_raw_container(extension: &str) -> bool {
    extension
        .trim_start_matches('.')
        .eq_ignore_ascii_case("glb")
}

/// Decode a bare binary container, routing on its version field.
pub fn decode_container(bytes: &[u8]) -> DecodeResult<Mesh> {
    let header = GlbHeader::parse(bytes)?;
    tracing::debug!(version = header.version, length = header.length, "dispatching container");
    match header.version {
        1 => decode_gltf1(bytes),
        2 => decode_glb(bytes),
        other => Err(DecodeError::UnsupportedVersion(other)),
    }
}

/// Decode tile content given the extension of the file it came from.
///
/// `.glb` content goes straight to [`decode_container`]; anything else is
/// expected to carry the b3dm wrapper.
pub fn decode_tile(bytes: &[u8], extension: &str) -> DecodeResult<Mesh> {
    if is_raw_container(extension) {
        return decode_container(bytes);
    }

    let header = B3dmHeader::parse(bytes)?;
    let offset = header.payload_offset();
    let end = header.byte_length as usize;
    tracing::debug!(
        version = header.version,
        byte_length = header.byte_length,
        feature_table_json = header.feature_table_json_len,
        feature_table_bin = header.feature_table_bin_len,
        batch_table_json = header.batch_table_json_len,
        batch_table_bin = header.batch_table_bin_len,
        payload_offset = offset,
        "parsed b3dm header"
    );
    if end > bytes.len() {
        return Err(DecodeError::format(format!(
            "b3dm declares {end} bytes but only {} are present",
            bytes.len()
        )));
    }
    if offset >= end {
        return Err(DecodeError::format(format!(
            "embedded container offset {offset} is past the tile end {end}"
        )));
    }
    decode_container(&bytes[offset..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{self, FixturePrimitive, LegacyOptions};
    use proptest::prelude::*;

    fn header_with(lengths: [u32; 4]) -> B3dmHeader {
        B3dmHeader {
            version: 1,
            byte_length: 0,
            feature_table_json_len: lengths[0],
            feature_table_bin_len: lengths[1],
            batch_table_json_len: lengths[2],
            batch_table_bin_len: lengths[3],
        }
    }

    #[test]
    fn pads_each_section_separately() {
        let header = header_with([5, 0, 3, 0]);
        assert_eq!(header.payload_offset(), B3DM_HEADER_LEN + 8 + 4);
    }

    #[test]
    fn raw_container_extensions() {
        assert!(is_raw_container(".glb"));
        assert!(is_raw_container("GLB"));
        assert!(!is_raw_container(".b3dm"));
    }

    #[test]
    fn unwraps_embedded_glb() {
        let glb = fixtures::glb(&[FixturePrimitive::quad()], None);
        let tile = fixtures::b3dm(&glb, br#"{"BATCH_LENGTH":0}"#, b"");
        let mesh = decode_tile(&tile, "b3dm").unwrap();
        assert_eq!(mesh.vertex_count(), 4);
    }

    #[test]
    fn unwraps_embedded_legacy_container() {
        let legacy = fixtures::legacy_glb(&[FixturePrimitive::quad()], &LegacyOptions::default());
        let tile = fixtures::b3dm(&legacy, b"{}", b"{\"id\":[0]}");
        let mesh = decode_tile(&tile, ".b3dm").unwrap();
        assert_eq!(mesh.triangle_count(), 2);
    }

    #[test]
    fn raw_glb_bypasses_wrapper() {
        let glb = fixtures::glb(&[FixturePrimitive::triangle()], None);
        assert_eq!(decode_tile(&glb, ".glb").unwrap().vertex_count(), 3);
        assert!(matches!(decode_tile(&glb, ".b3dm"), Err(DecodeError::Format(_))));
    }

    #[test]
    fn rejects_unknown_embedded_version() {
        let mut glb = fixtures::glb(&[FixturePrimitive::triangle()], None);
        glb[4..8].copy_from_slice(&3u32.to_le_bytes());
        let tile = fixtures::b3dm(&glb, b"", b"");
        assert!(matches!(
            decode_tile(&tile, "b3dm"),
            Err(DecodeError::UnsupportedVersion(3))
        ));
    }

    #[test]
    fn rejects_truncated_tile() {
        let glb = fixtures::glb(&[FixturePrimitive::triangle()], None);
        let tile = fixtures::b3dm(&glb, b"", b"");
        assert!(matches!(
            decode_tile(&tile[..tile.len() - 1], "b3dm"),
            Err(DecodeError::Format(_))
        ));
        assert!(matches!(
            decode_tile(&tile[..10], "b3dm"),
            Err(DecodeError::Format(_))
        ));
    }

    proptest! {
        #[test]
        fn payload_offset_is_aligned_and_tight(lengths in proptest::array::uniform4(0u32..10_000)) {
            let offset = header_with(lengths).payload_offset();
            let raw: usize = lengths.iter().map(|&len| len as usize).sum();
            prop_assert_eq!(offset % 4, 0);
            prop_assert!(offset >= B3DM_HEADER_LEN + raw);
            prop_assert!(offset < B3DM_HEADER_LEN + raw + 4 * 4);
        }
    }
}
