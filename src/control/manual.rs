use bevy::math::Vec2;

use crate::api::RobotRequest;
use crate::api::types::{
    CAP_HIGH_RES_MANUAL_CONTROL, CAP_MANUAL_CONTROL, CapabilitySet, DriveAction,
};

/// Joystick geometry and robot limits.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlLimits {
    /// Largest displacement, per axis, a drag can contribute.
    pub max_offset: f32,
    pub velocity_limit: f32,
    /// Degrees.
    pub angle_limit: f32,
    /// Horizontal drag below this does nothing in discrete mode.
    pub deadzone: f32,
}

impl Default for ControlLimits {
    fn default() -> Self {
        Self {
            max_offset: 100.0,
            velocity_limit: 300.0,
            angle_limit: 90.0,
            deadzone: 20.0,
        }
    }
}

/// How the robot wants to be driven, decided once per screen visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMode {
    /// Velocity/angle vectors.
    Continuous,
    /// Named directions.
    Discrete,
    Unavailable,
}

impl ControlMode {
    pub fn from_capabilities(capabilities: &CapabilitySet) -> Self {
        if capabilities.has(CAP_HIGH_RES_MANUAL_CONTROL) {
            Self::Continuous
        } else if capabilities.has(CAP_MANUAL_CONTROL) {
            Self::Discrete
        } else {
            Self::Unavailable
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveCommand {
    Vector { velocity: i32, angle: i32 },
    Step(DriveAction),
}

impl DriveCommand {
    pub const HALT: Self = Self::Vector {
        velocity: 0,
        angle: 0,
    };

    pub fn into_request(self, movement_speed: Option<i32>) -> RobotRequest {
        match self {
            Self::Vector { velocity, angle } => RobotRequest::HighRes { velocity, angle },
            Self::Step(action) => RobotRequest::Manual {
                action,
                movement_speed,
            },
        }
    }
}

/// Square clamp: each axis is limited on its own, so a full diagonal drag
/// reaches both limits at once.
pub fn clamp_displacement(displacement: Vec2, max_offset: f32) -> Vec2 {
    displacement.clamp(Vec2::splat(-max_offset), Vec2::splat(max_offset))
}

/// Upward drag drives forward; dragging right turns with a negative angle.
pub fn continuous_command(displacement: Vec2, limits: &ControlLimits) -> DriveCommand {
    let d = clamp_displacement(displacement, limits.max_offset);
    let normalized = d / limits.max_offset;
    let velocity = (-normalized.y * limits.velocity_limit)
        .clamp(-limits.velocity_limit, limits.velocity_limit);
    let angle = (-normalized.x * limits.angle_limit).clamp(-limits.angle_limit, limits.angle_limit);

    DriveCommand::Vector {
        velocity: velocity.round() as i32,
        angle: angle.round() as i32,
    }
}

pub fn discrete_command(displacement: Vec2, limits: &ControlLimits) -> Option<DriveAction> {
    let d = clamp_displacement(displacement, limits.max_offset);
    if d.y.abs() > d.x.abs() {
        Some(if d.y < 0.0 {
            DriveAction::Forward
        } else {
            DriveAction::Backward
        })
    } else if d.x.abs() > limits.deadzone {
        Some(if d.x > 0.0 {
            DriveAction::RotateRight
        } else {
            DriveAction::RotateLeft
        })
    } else {
        None
    }
}

/// Turns the live drag of one joystick into drive commands.
#[derive(Debug, Clone)]
pub struct ManualControlMapper {
    mode: ControlMode,
    limits: ControlLimits,
    active: bool,
}

impl ManualControlMapper {
    pub fn new(mode: ControlMode, limits: ControlLimits) -> Self {
        Self {
            mode,
            limits,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn enable_request(&self) -> Option<RobotRequest> {
        match self.mode {
            ControlMode::Continuous => Some(RobotRequest::EnableHighRes),
            ControlMode::Discrete => Some(RobotRequest::Manual {
                action: DriveAction::Enable,
                movement_speed: None,
            }),
            ControlMode::Unavailable => None,
        }
    }

    pub fn disable_request(&self) -> Option<RobotRequest> {
        match self.mode {
            ControlMode::Continuous => Some(RobotRequest::DisableHighRes),
            ControlMode::Discrete => Some(RobotRequest::Manual {
                action: DriveAction::Disable,
                movement_speed: None,
            }),
            ControlMode::Unavailable => None,
        }
    }

    pub fn begin_gesture(&mut self) {
        if self.mode != ControlMode::Unavailable {
            self.active = true;
        }
    }

    /// Command for the current drag, if any. Called on every gesture update.
    pub fn update(&self, displacement: Vec2) -> Option<DriveCommand> {
        if !self.active {
            return None;
        }
        match self.mode {
            ControlMode::Continuous => Some(continuous_command(displacement, &self.limits)),
            ControlMode::Discrete => {
                discrete_command(displacement, &self.limits).map(DriveCommand::Step)
            }
            ControlMode::Unavailable => None,
        }
    }

    /// Terminal command of a gesture. Yields exactly once per started gesture.
    pub fn end_gesture(&mut self) -> Option<DriveCommand> {
        if !std::mem::take(&mut self.active) {
            return None;
        }
        match self.mode {
            ControlMode::Continuous => Some(DriveCommand::HALT),
            ControlMode::Discrete => Some(DriveCommand::Step(DriveAction::Stop)),
            ControlMode::Unavailable => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits() -> ControlLimits {
        ControlLimits::default()
    }

    #[test]
    fn full_upward_drag_is_full_forward_speed() {
        assert_eq!(
            continuous_command(Vec2::new(0.0, -100.0), &limits()),
            DriveCommand::Vector {
                velocity: 300,
                angle: 0,
            }
        );
    }

    #[test]
    fn full_right_drag_is_negative_full_angle() {
        assert_eq!(
            continuous_command(Vec2::new(100.0, 0.0), &limits()),
            DriveCommand::Vector {
                velocity: 0,
                angle: -90,
            }
        );
    }

    #[test]
    fn zero_drag_is_zero_command() {
        assert_eq!(continuous_command(Vec2::ZERO, &limits()), DriveCommand::HALT);
    }

    #[test]
    fn oversized_drag_is_clamped_per_axis() {
        assert_eq!(
            continuous_command(Vec2::new(-450.0, 900.0), &limits()),
            DriveCommand::Vector {
                velocity: -300,
                angle: 90,
            }
        );
    }

    #[test]
    fn full_diagonal_drag_reaches_both_limits() {
        let l = limits();
        let dragged = clamp_displacement(Vec2::new(124.0, -124.0), l.max_offset);
        assert_eq!(dragged, Vec2::new(100.0, -100.0));
        assert_eq!(
            continuous_command(dragged, &l),
            DriveCommand::Vector {
                velocity: 300,
                angle: -90,
            }
        );
        // a radial clamp would have cost both axes about 29%
        let radial = Vec2::new(124.0, -124.0).clamp_length_max(l.max_offset);
        assert_ne!(continuous_command(radial, &l), continuous_command(dragged, &l));
    }

    #[test]
    fn discrete_directions() {
        let l = limits();
        assert_eq!(
            discrete_command(Vec2::new(0.0, -50.0), &l),
            Some(DriveAction::Forward)
        );
        assert_eq!(
            discrete_command(Vec2::new(10.0, 50.0), &l),
            Some(DriveAction::Backward)
        );
        assert_eq!(
            discrete_command(Vec2::new(25.0, 0.0), &l),
            Some(DriveAction::RotateRight)
        );
        assert_eq!(
            discrete_command(Vec2::new(-25.0, 3.0), &l),
            Some(DriveAction::RotateLeft)
        );
        assert_eq!(discrete_command(Vec2::new(5.0, 0.0), &l), None);
    }

    #[test]
    fn mode_prefers_high_resolution_control() {
        let both: CapabilitySet = [CAP_MANUAL_CONTROL, CAP_HIGH_RES_MANUAL_CONTROL]
            .into_iter()
            .collect();
        assert_eq!(ControlMode::from_capabilities(&both), ControlMode::Continuous);

        let basic: CapabilitySet = [CAP_MANUAL_CONTROL].into_iter().collect();
        assert_eq!(ControlMode::from_capabilities(&basic), ControlMode::Discrete);

        assert_eq!(
            ControlMode::from_capabilities(&CapabilitySet::default()),
            ControlMode::Unavailable
        );
    }

    #[test]
    fn gesture_end_emits_terminal_command_once() {
        let mut mapper = ManualControlMapper::new(ControlMode::Continuous, limits());
        assert_eq!(mapper.update(Vec2::new(0.0, -40.0)), None);

        mapper.begin_gesture();
        assert_eq!(
            mapper.update(Vec2::new(0.0, -50.0)),
            Some(DriveCommand::Vector {
                velocity: 150,
                angle: 0,
            })
        );
        assert_eq!(mapper.end_gesture(), Some(DriveCommand::HALT));
        assert_eq!(mapper.end_gesture(), None);
        assert_eq!(mapper.update(Vec2::new(0.0, -50.0)), None);
    }

    #[test]
    fn discrete_gesture_ends_with_stop_and_respects_deadzone() {
        let mut mapper = ManualControlMapper::new(ControlMode::Discrete, limits());
        mapper.begin_gesture();
        assert_eq!(mapper.update(Vec2::new(5.0, 0.0)), None);
        assert_eq!(
            mapper.update(Vec2::new(0.0, -50.0)),
            Some(DriveCommand::Step(DriveAction::Forward))
        );
        assert_eq!(
            mapper.end_gesture(),
            Some(DriveCommand::Step(DriveAction::Stop))
        );
    }

    #[test]
    fn unavailable_mode_never_drives() {
        let mut mapper = ManualControlMapper::new(ControlMode::Unavailable, limits());
        mapper.begin_gesture();
        assert!(!mapper.is_active());
        assert_eq!(mapper.update(Vec2::new(0.0, -100.0)), None);
        assert_eq!(mapper.end_gesture(), None);
        assert_eq!(mapper.enable_request(), None);
    }

    #[test]
    fn commands_become_the_matching_requests() {
        assert_eq!(
            DriveCommand::HALT.into_request(Some(3)),
            RobotRequest::HighRes {
                velocity: 0,
                angle: 0,
            }
        );
        assert_eq!(
            DriveCommand::Step(DriveAction::Forward).into_request(Some(3)),
            RobotRequest::Manual {
                action: DriveAction::Forward,
                movement_speed: Some(3),
            }
        );
    }
}
