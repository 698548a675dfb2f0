use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ── Capability names ────────────────────────────────────────────────

pub const CAP_SEGMENTATION: &str = "MapSegmentationCapability";
pub const CAP_SEGMENT_RENAME: &str = "MapSegmentRenameCapability";
pub const CAP_SEGMENT_EDIT: &str = "MapSegmentEditCapability";
pub const CAP_SEGMENT_MATERIAL: &str = "MapSegmentMaterialControlCapability";
pub const CAP_MANUAL_CONTROL: &str = "ManualControlCapability";
pub const CAP_HIGH_RES_MANUAL_CONTROL: &str = "HighResolutionManualControlCapability";

/// Opaque capability names reported by the robot firmware.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilitySet(BTreeSet<String>);

impl CapabilitySet {
    pub fn has(&self, capability: &str) -> bool {
        self.0.contains(capability)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<S> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

// ── Segments ────────────────────────────────────────────────────────

/// A robot-defined cleanable region. Identity is `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

impl Segment {
    pub fn new(id: impl Into<String>, name: Option<&str>) -> Self {
        Self {
            id: id.into(),
            name: name.map(str::to_string),
        }
    }

    /// Name as shown to the user; unnamed segments get a label derived from the id.
    pub fn display_name(&self) -> String {
        match self.name.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => format!("Segment {}", self.id),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialProperties {
    #[serde(default)]
    pub supported_materials: Vec<String>,
}

/// Integer point in map units.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MapPoint {
    pub x: i32,
    pub y: i32,
}

impl MapPoint {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

// ── Raw map payload ─────────────────────────────────────────────────

/// Map exactly as the robot reports it, before decoding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MapPayload {
    #[serde(default)]
    pub pixel_size: Option<i32>,
    #[serde(default)]
    pub layers: Vec<LayerPayload>,
    #[serde(default)]
    pub entities: Vec<EntityPayload>,
    /// SHA-256 of the response body, when the payload came off the wire.
    #[serde(skip)]
    pub body_hash: Option<String>,
}

impl MapPayload {
    /// Decode a raw response body, keeping the hash of the bytes as received.
    pub fn from_body(body: &[u8]) -> serde_json::Result<Self> {
        let mut payload: Self = serde_json::from_slice(body)?;
        payload.body_hash = Some(sha256_hex(body));
        Ok(payload)
    }
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerPayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub pixels: Vec<i32>,
    #[serde(default)]
    pub compressed_pixels: Vec<i32>,
    #[serde(default)]
    pub meta_data: Option<LayerMetaPayload>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayerMetaPayload {
    #[serde(default)]
    pub segment_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityPayload {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub points: Vec<i32>,
}

// ── Manual control ──────────────────────────────────────────────────

/// Named drive commands understood by the discrete manual control capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DriveAction {
    Enable,
    Disable,
    Forward,
    Backward,
    RotateLeft,
    RotateRight,
    Stop,
}

impl DriveAction {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Enable => "enable",
            Self::Disable => "disable",
            Self::Forward => "forward",
            Self::Backward => "backward",
            Self::RotateLeft => "rotate_counterclockwise",
            Self::RotateRight => "rotate_clockwise",
            Self::Stop => "stop",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unnamed_segment_falls_back_to_id_label() {
        assert_eq!(Segment::new("17", None).display_name(), "Segment 17");
        assert_eq!(Segment::new("17", Some("   ")).display_name(), "Segment 17");
        assert_eq!(Segment::new("17", Some("Kitchen")).display_name(), "Kitchen");
    }

    #[test]
    fn capability_set_parses_from_json_array() {
        let caps: CapabilitySet =
            serde_json::from_str(r#"["MapSegmentEditCapability","ManualControlCapability"]"#)
                .unwrap();
        assert_eq!(caps.len(), 2);
        assert!(caps.has(CAP_SEGMENT_EDIT));
        assert!(!caps.has(CAP_SEGMENT_RENAME));
    }

    #[test]
    fn map_payload_tolerates_missing_fields() {
        let payload: MapPayload = serde_json::from_str(
            r#"{"layers":[{"type":"segment","pixels":[1,2],"metaData":{"segmentId":"3"}},{"type":"wall"}]}"#,
        )
        .unwrap();
        assert_eq!(payload.pixel_size, None);
        assert_eq!(payload.layers.len(), 2);
        assert_eq!(
            payload.layers[0].meta_data.as_ref().and_then(|m| m.segment_id.as_deref()),
            Some("3")
        );
        assert!(payload.layers[1].pixels.is_empty());
        assert!(payload.entities.is_empty());
    }

    #[test]
    fn map_body_hash_covers_the_bytes_as_received() {
        let compact = br#"{"pixelSize":5,"layers":[]}"#;
        let spaced = br#"{ "pixelSize": 5, "layers": [] }"#;
        let a = MapPayload::from_body(compact).unwrap();
        let b = MapPayload::from_body(spaced).unwrap();
        assert_eq!(a.pixel_size, b.pixel_size);
        assert_eq!(a.body_hash.as_deref(), Some(sha256_hex(compact).as_str()));
        assert_ne!(a.body_hash, b.body_hash);
        assert_eq!(
            sha256_hex(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
