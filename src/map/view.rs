use bevy::log::warn;
use bevy::math::Vec2;

use super::layer::{RobotMap, decode_map};
use super::transform::ViewTransform;
use crate::api::types::{MapPayload, sha256_hex};

/// Content hash of a map payload, used to skip re-decoding identical refreshes.
/// Payloads fetched over HTTP carry the hash of their raw body; anything
/// built in memory is hashed from its JSON form.
pub fn fingerprint(payload: &MapPayload) -> String {
    if let Some(hash) = &payload.body_hash {
        return hash.clone();
    }
    match serde_json::to_vec(payload) {
        Ok(bytes) => sha256_hex(&bytes),
        Err(e) => {
            warn!("Failed to serialize map for fingerprinting: {e}");
            String::new()
        }
    }
}

/// The live map of one screen visit plus the single transform used both to
/// draw it and to read gestures back into map units.
#[derive(Debug, Default)]
pub struct MapViewState {
    map: Option<RobotMap>,
    fingerprint: Option<String>,
    view_size: Vec2,
    padding: f32,
    transform: Option<ViewTransform>,
    dirty: bool,
}

impl MapViewState {
    pub fn new(padding: f32) -> Self {
        Self {
            padding,
            ..Self::default()
        }
    }

    pub fn map(&self) -> Option<&RobotMap> {
        self.map.as_ref()
    }

    pub fn transform(&self) -> Option<&ViewTransform> {
        self.transform.as_ref()
    }

    pub fn view_size(&self) -> Vec2 {
        self.view_size
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.padding);
    }

    /// Take a freshly fetched map. Returns `false` when it is identical to the
    /// one already shown.
    pub fn accept(&mut self, payload: &MapPayload) -> bool {
        let hash = fingerprint(payload);
        if !hash.is_empty() && self.fingerprint.as_deref() == Some(hash.as_str()) {
            return false;
        }
        self.map = Some(decode_map(payload));
        self.fingerprint = Some(hash);
        self.relayout();
        true
    }

    pub fn resize(&mut self, view_size: Vec2) -> bool {
        if view_size == self.view_size {
            return false;
        }
        self.view_size = view_size;
        self.relayout();
        true
    }

    fn relayout(&mut self) {
        self.transform = self
            .map
            .as_ref()
            .and_then(|map| ViewTransform::for_map(map, self.view_size, self.padding));
        self.dirty = true;
    }

    /// Mark the surface for repainting, e.g. after the selection changed.
    pub fn invalidate(&mut self) {
        self.dirty = true;
    }

    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }
}
