use bevy::log::{debug, info, warn};
use bevy::math::Vec2;

use super::manual::{ControlLimits, ControlMode, ManualControlMapper};
use crate::api::{Applied, Completion, RobotRequest, RobotResponse, SessionToken, Ticket};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlPhase {
    Uninitialized,
    CapabilitiesLoading,
    Ready(ControlMode),
}

/// State of one visit to the manual control screen.
#[derive(Debug)]
pub struct ControlScreen {
    session: SessionToken,
    phase: ControlPhase,
    limits: ControlLimits,
    movement_speed: Option<i32>,
    mapper: Option<ManualControlMapper>,
    failed_commands: u32,
}

impl ControlScreen {
    pub fn new(limits: ControlLimits, movement_speed: Option<i32>) -> Self {
        Self {
            session: SessionToken::default(),
            phase: ControlPhase::Uninitialized,
            limits,
            movement_speed,
            mapper: None,
            failed_commands: 0,
        }
    }

    /// Swap in new limits, e.g. after the settings were reloaded. Applies from
    /// the next [`ControlScreen::enter`].
    pub fn configure(&mut self, limits: ControlLimits, movement_speed: Option<i32>) {
        self.limits = limits;
        self.movement_speed = movement_speed;
    }

    pub fn phase(&self) -> ControlPhase {
        self.phase
    }

    pub fn session(&self) -> SessionToken {
        self.session
    }

    pub fn failed_commands(&self) -> u32 {
        self.failed_commands
    }

    pub fn is_dragging(&self) -> bool {
        self.mapper.as_ref().is_some_and(ManualControlMapper::is_active)
    }

    fn ticket(&self, request: RobotRequest) -> Ticket {
        Ticket {
            session: self.session,
            request,
        }
    }

    /// Start a fresh visit: anything still in flight from earlier visits is stale.
    pub fn enter(&mut self) -> Ticket {
        self.session = self.session.next();
        self.phase = ControlPhase::CapabilitiesLoading;
        self.mapper = None;
        self.failed_commands = 0;
        self.ticket(RobotRequest::Capabilities)
    }

    /// Leave the screen, stopping any drag and releasing manual control.
    pub fn leave(&mut self) -> Vec<Ticket> {
        let mut tickets = Vec::new();
        if let Some(mapper) = self.mapper.as_mut() {
            if let Some(stop) = mapper.end_gesture() {
                tickets.push(self.ticket(stop.into_request(self.movement_speed)));
            }
        }
        if let Some(disable) = self.mapper.as_ref().and_then(ManualControlMapper::disable_request) {
            tickets.push(self.ticket(disable));
        }
        self.session = self.session.next();
        self.phase = ControlPhase::Uninitialized;
        self.mapper = None;
        tickets
    }

    pub fn apply(&mut self, completion: Completion) -> Applied {
        if completion.session != self.session {
            debug!(
                "dropping stale {} completion from session {}",
                completion.request.label(),
                completion.session.value()
            );
            return Applied::default();
        }

        match (completion.request, completion.result) {
            (RobotRequest::Capabilities, Ok(RobotResponse::Capabilities(capabilities))) => {
                let mode = ControlMode::from_capabilities(&capabilities);
                info!("manual control mode: {mode:?}");
                self.settle(mode)
            }
            (RobotRequest::Capabilities, Err(error)) => {
                warn!("capability check failed, manual control hidden: {error}");
                self.settle(ControlMode::Unavailable);
                Applied::default()
            }
            (request, Err(error)) => {
                self.failed_commands += 1;
                warn!("{} failed: {error}", request.label());
                Applied::failed(error)
            }
            _ => Applied::default(),
        }
    }

    fn settle(&mut self, mode: ControlMode) -> Applied {
        let mapper = ManualControlMapper::new(mode, self.limits);
        let enable = mapper.enable_request();
        self.mapper = Some(mapper);
        self.phase = ControlPhase::Ready(mode);
        Applied::follow_up(self.session, enable)
    }

    pub fn begin_gesture(&mut self) {
        if let Some(mapper) = self.mapper.as_mut() {
            mapper.begin_gesture();
        }
    }

    pub fn update_gesture(&self, displacement: Vec2) -> Option<Ticket> {
        let command = self.mapper.as_ref()?.update(displacement)?;
        Some(self.ticket(command.into_request(self.movement_speed)))
    }

    pub fn end_gesture(&mut self) -> Option<Ticket> {
        let command = self.mapper.as_mut()?.end_gesture()?;
        Some(self.ticket(command.into_request(self.movement_speed)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ClientError;
    use crate::api::types::{CAP_HIGH_RES_MANUAL_CONTROL, CAP_MANUAL_CONTROL, DriveAction};

    fn capabilities_done(session: SessionToken, names: &[&str]) -> Completion {
        Completion {
            session,
            request: RobotRequest::Capabilities,
            result: Ok(RobotResponse::Capabilities(names.iter().copied().collect())),
        }
    }

    #[test]
    fn capability_check_picks_mode_and_enables_it() {
        let mut screen = ControlScreen::new(ControlLimits::default(), None);
        let entry = screen.enter();
        assert_eq!(entry.request, RobotRequest::Capabilities);
        assert_eq!(screen.phase(), ControlPhase::CapabilitiesLoading);

        let applied = screen.apply(capabilities_done(
            entry.session,
            &[CAP_HIGH_RES_MANUAL_CONTROL],
        ));
        assert_eq!(screen.phase(), ControlPhase::Ready(ControlMode::Continuous));
        assert_eq!(applied.follow_ups.len(), 1);
        assert_eq!(applied.follow_ups[0].request, RobotRequest::EnableHighRes);
    }

    #[test]
    fn stale_check_after_leaving_is_discarded() {
        let mut screen = ControlScreen::new(ControlLimits::default(), None);
        let entry = screen.enter();
        screen.leave();

        let applied = screen.apply(capabilities_done(entry.session, &[CAP_MANUAL_CONTROL]));
        assert!(applied.follow_ups.is_empty());
        assert_eq!(screen.phase(), ControlPhase::Uninitialized);
    }

    #[test]
    fn failed_check_degrades_to_unavailable() {
        let mut screen = ControlScreen::new(ControlLimits::default(), None);
        let entry = screen.enter();
        let applied = screen.apply(Completion {
            session: entry.session,
            request: RobotRequest::Capabilities,
            result: Err(ClientError::status("capabilities", 502)),
        });
        assert!(applied.error.is_none());
        assert_eq!(screen.phase(), ControlPhase::Ready(ControlMode::Unavailable));
        screen.begin_gesture();
        assert_eq!(screen.update_gesture(Vec2::new(0.0, -100.0)), None);
    }

    #[test]
    fn drive_failures_are_reported_without_ending_the_drag() {
        let mut screen = ControlScreen::new(ControlLimits::default(), Some(2));
        let entry = screen.enter();
        screen.apply(capabilities_done(entry.session, &[CAP_MANUAL_CONTROL]));

        screen.begin_gesture();
        let forward = screen.update_gesture(Vec2::new(0.0, -60.0)).unwrap();
        assert_eq!(
            forward.request,
            RobotRequest::Manual {
                action: DriveAction::Forward,
                movement_speed: Some(2),
            }
        );

        let applied = screen.apply(Completion {
            session: forward.session,
            request: forward.request,
            result: Err(ClientError::status("manual", 500)),
        });
        assert!(applied.error.is_some());
        assert!(applied.follow_ups.is_empty());
        assert_eq!(screen.failed_commands(), 1);
        assert!(screen.is_dragging());
        assert!(screen.update_gesture(Vec2::new(0.0, -60.0)).is_some());
    }

    #[test]
    fn leaving_mid_drag_stops_then_disables() {
        let mut screen = ControlScreen::new(ControlLimits::default(), None);
        let entry = screen.enter();
        screen.apply(capabilities_done(entry.session, &[CAP_HIGH_RES_MANUAL_CONTROL]));
        screen.begin_gesture();

        let requests: Vec<_> = screen.leave().into_iter().map(|t| t.request).collect();
        assert_eq!(
            requests,
            vec![
                RobotRequest::HighRes {
                    velocity: 0,
                    angle: 0,
                },
                RobotRequest::DisableHighRes,
            ]
        );
    }
}
