use bevy::log::{debug, warn};
use bevy::math::Vec2;

use super::selection::EditSelection;
use crate::api::types::{
    CAP_SEGMENT_EDIT, CAP_SEGMENT_MATERIAL, CAP_SEGMENT_RENAME, CapabilitySet, MapPoint, Segment,
};
use crate::api::{
    Applied, ClientError, Completion, Result, RobotRequest, RobotResponse, SessionToken, Ticket,
};
use crate::map::ViewTransform;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditPhase {
    Uninitialized,
    CapabilitiesLoading,
    CapabilitiesKnown,
    SegmentsLoading,
    Ready,
    ActionInFlight,
}

/// Segment affordances the robot firmware exposes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SegmentFeatures {
    pub can_rename: bool,
    /// Join and split.
    pub can_edit: bool,
    pub can_set_material: bool,
}

impl SegmentFeatures {
    pub fn from_capabilities(capabilities: &CapabilitySet) -> Self {
        Self {
            can_rename: capabilities.has(CAP_SEGMENT_RENAME),
            can_edit: capabilities.has(CAP_SEGMENT_EDIT),
            can_set_material: capabilities.has(CAP_SEGMENT_MATERIAL),
        }
    }
}

/// Segment editing state for one visit to the map screen.
///
/// Nothing here touches the network. Operations hand back [`Ticket`]s for the
/// caller to run; finished round-trips come back through [`SegmentEditor::apply`].
/// Every ticket carries the visit's session token, so answers that arrive after
/// the user left (or re-entered) the screen are ignored.
#[derive(Debug)]
pub struct SegmentEditor {
    session: SessionToken,
    phase: EditPhase,
    features: SegmentFeatures,
    materials: Vec<String>,
    segments: Vec<Segment>,
    selection: EditSelection,
    material_target: Option<String>,
    last_error: Option<String>,
}

impl Default for SegmentEditor {
    fn default() -> Self {
        Self {
            session: SessionToken::default(),
            phase: EditPhase::Uninitialized,
            features: SegmentFeatures::default(),
            materials: Vec::new(),
            segments: Vec::new(),
            selection: EditSelection::default(),
            material_target: None,
            last_error: None,
        }
    }
}

impl SegmentEditor {
    pub fn session(&self) -> SessionToken {
        self.session
    }

    pub fn phase(&self) -> EditPhase {
        self.phase
    }

    pub fn features(&self) -> SegmentFeatures {
        self.features
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.segments.iter().find(|segment| segment.id == id)
    }

    pub fn materials(&self) -> &[String] {
        &self.materials
    }

    pub fn selection(&self) -> &EditSelection {
        &self.selection
    }

    pub fn material_target(&self) -> Option<&str> {
        self.material_target.as_deref()
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn is_busy(&self) -> bool {
        self.phase == EditPhase::ActionInFlight
    }

    fn ticket(&self, request: RobotRequest) -> Ticket {
        Ticket {
            session: self.session,
            request,
        }
    }

    // ── Lifecycle ───────────────────────────────────────────────────

    pub fn enter(&mut self) -> Ticket {
        *self = Self {
            session: self.session.next(),
            phase: EditPhase::CapabilitiesLoading,
            ..Self::default()
        };
        self.ticket(RobotRequest::Capabilities)
    }

    /// Drop everything owned by the visit. Late answers become stale.
    pub fn leave(&mut self) {
        *self = Self {
            session: self.session.next(),
            ..Self::default()
        };
    }

    pub fn load_segments(&mut self) -> Ticket {
        if self.phase == EditPhase::CapabilitiesKnown {
            self.phase = EditPhase::SegmentsLoading;
        }
        self.ticket(RobotRequest::Segments)
    }

    /// Map fetches ride the visit's session so a late map is dropped too.
    pub fn load_map(&self) -> Ticket {
        self.ticket(RobotRequest::Map)
    }

    // ── Selection ───────────────────────────────────────────────────

    pub fn toggle_selection(&mut self, id: &str) {
        self.selection.toggle(id);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn open_material_picker(&mut self, segment_id: &str) -> Result<()> {
        self.require(self.features.can_set_material, CAP_SEGMENT_MATERIAL)?;
        self.material_target = Some(segment_id.to_string());
        Ok(())
    }

    pub fn close_material_picker(&mut self) {
        self.material_target = None;
    }

    // ── Mutating operations ─────────────────────────────────────────

    fn require(&self, available: bool, capability: &'static str) -> Result<()> {
        if available {
            Ok(())
        } else {
            Err(ClientError::Unsupported { capability })
        }
    }

    fn ensure_idle(&self) -> Result<()> {
        match self.phase {
            EditPhase::ActionInFlight => Err(ClientError::Busy),
            EditPhase::Uninitialized | EditPhase::CapabilitiesLoading => {
                Err(ClientError::validation("robot capabilities are not known yet"))
            }
            _ => Ok(()),
        }
    }

    fn dispatch(&mut self, request: RobotRequest) -> Ticket {
        self.phase = EditPhase::ActionInFlight;
        self.last_error = None;
        self.ticket(request)
    }

    pub fn rename(&mut self, segment_id: &str, name: &str) -> Result<Ticket> {
        self.require(self.features.can_rename, CAP_SEGMENT_RENAME)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::validation("segment name must not be empty"));
        }
        self.ensure_idle()?;
        Ok(self.dispatch(RobotRequest::Rename {
            segment_id: segment_id.to_string(),
            name: name.to_string(),
        }))
    }

    /// Join the two selected segments.
    pub fn join(&mut self) -> Result<Ticket> {
        self.require(self.features.can_edit, CAP_SEGMENT_EDIT)?;
        let Some((id_a, id_b)) = self.selection.pair() else {
            return Err(ClientError::validation("select exactly two segments to join"));
        };
        let request = RobotRequest::Join {
            id_a: id_a.to_string(),
            id_b: id_b.to_string(),
        };
        self.ensure_idle()?;
        Ok(self.dispatch(request))
    }

    /// Split `segment_id` along a line given in map units.
    pub fn split(&mut self, segment_id: &str, point_a: MapPoint, point_b: MapPoint) -> Result<Ticket> {
        self.require(self.features.can_edit, CAP_SEGMENT_EDIT)?;
        if point_a == point_b {
            return Err(ClientError::validation("split line needs two distinct points"));
        }
        self.ensure_idle()?;
        Ok(self.dispatch(RobotRequest::Split {
            segment_id: segment_id.to_string(),
            point_a,
            point_b,
        }))
    }

    /// Split along a line drawn on screen, using the transform the map was drawn with.
    pub fn split_from_screen(
        &mut self,
        segment_id: &str,
        from: Vec2,
        to: Vec2,
        transform: Option<&ViewTransform>,
    ) -> Result<Ticket> {
        let transform = transform.ok_or(ClientError::GeometryUndefined)?;
        self.split(
            segment_id,
            transform.screen_to_map(from),
            transform.screen_to_map(to),
        )
    }

    pub fn set_material(&mut self, segment_id: &str, material: &str) -> Result<Ticket> {
        self.require(self.features.can_set_material, CAP_SEGMENT_MATERIAL)?;
        if !self.materials.iter().any(|known| known == material) {
            return Err(ClientError::validation(format!(
                "material {material} is not supported by the robot"
            )));
        }
        self.ensure_idle()?;
        Ok(self.dispatch(RobotRequest::SetMaterial {
            segment_id: segment_id.to_string(),
            material: material.to_string(),
        }))
    }

    // ── Completions ─────────────────────────────────────────────────

    pub fn apply(&mut self, completion: Completion) -> Applied {
        if completion.session != self.session {
            debug!(
                "dropping stale {} completion from session {}",
                completion.request.label(),
                completion.session.value()
            );
            return Applied::default();
        }

        let Completion {
            request, result, ..
        } = completion;

        match result {
            Ok(response) => self.apply_success(request, response),
            Err(error) if request.is_segment_edit() => {
                warn!("{} failed: {error}", request.label());
                self.phase = EditPhase::Ready;
                self.last_error = Some(error.to_string());
                Applied::failed(error)
            }
            Err(error) => {
                warn!("{} failed, degrading: {error}", request.label());
                self.degrade(&request);
                Applied::follow_up(self.session, self.after_capabilities(&request))
            }
        }
    }

    fn apply_success(&mut self, request: RobotRequest, response: RobotResponse) -> Applied {
        match (request, response) {
            (RobotRequest::Capabilities, RobotResponse::Capabilities(capabilities)) => {
                self.features = SegmentFeatures::from_capabilities(&capabilities);
                self.phase = EditPhase::CapabilitiesKnown;
                let follow_ups = self.after_capabilities(&RobotRequest::Capabilities);
                Applied::follow_up(self.session, follow_ups)
            }
            (RobotRequest::MaterialProperties, RobotResponse::MaterialProperties(properties)) => {
                self.materials = properties.supported_materials;
                if self.materials.is_empty() {
                    self.features.can_set_material = false;
                }
                Applied::default()
            }
            (RobotRequest::Segments, RobotResponse::Segments(segments)) => {
                self.segments = segments;
                let known: Vec<String> = self.segments.iter().map(|s| s.id.clone()).collect();
                self.selection.retain_known(|id| known.iter().any(|k| k == id));
                if self
                    .material_target
                    .as_ref()
                    .is_some_and(|target| !known.contains(target))
                {
                    self.material_target = None;
                }
                if self.phase == EditPhase::SegmentsLoading {
                    self.phase = EditPhase::Ready;
                }
                Applied::default()
            }
            (request, RobotResponse::Done) if request.is_segment_edit() => {
                self.phase = EditPhase::Ready;
                match request {
                    RobotRequest::SetMaterial { .. } => {
                        self.material_target = None;
                        Applied::default()
                    }
                    RobotRequest::Join { .. } => {
                        self.selection.clear();
                        Applied::follow_up(self.session, [self.load_segments().request])
                    }
                    _ => Applied::follow_up(self.session, [self.load_segments().request]),
                }
            }
            (request, _) => {
                debug!("ignoring unexpected response to {}", request.label());
                Applied::default()
            }
        }
    }

    /// A read failed: hide what depends on it and keep the screen usable.
    fn degrade(&mut self, request: &RobotRequest) {
        match request {
            RobotRequest::Capabilities => {
                self.features = SegmentFeatures::default();
                self.phase = EditPhase::CapabilitiesKnown;
            }
            RobotRequest::MaterialProperties => {
                self.features.can_set_material = false;
                self.materials.clear();
            }
            RobotRequest::Segments if self.phase == EditPhase::SegmentsLoading => {
                self.phase = EditPhase::Ready;
            }
            _ => {}
        }
    }

    /// Reads that follow the capability check, whether or not it succeeded.
    fn after_capabilities(&mut self, request: &RobotRequest) -> Vec<RobotRequest> {
        if *request != RobotRequest::Capabilities {
            return Vec::new();
        }
        let mut requests = Vec::new();
        if self.features.can_set_material {
            requests.push(RobotRequest::MaterialProperties);
        }
        requests.push(self.load_segments().request);
        requests
    }
}
