use std::path::PathBuf;
use std::time::Duration;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::control::ControlLimits;

/// Client settings, loaded from settings.ron.
#[derive(Debug, Clone, Resource, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientSettings {
    /// Base URL of the robot, e.g. `http://192.168.1.40`.
    pub robot_url: String,
    pub request_timeout_secs: u64,
    /// Gap kept between the map and the edges of its view, in screen units.
    pub map_padding: f32,
    pub map_refresh_secs: f32,
    pub joystick_max_offset: f32,
    pub velocity_limit: f32,
    /// Degrees.
    pub angle_limit: f32,
    pub discrete_deadzone: f32,
    /// Speed sent with discrete drive commands. None lets the robot decide.
    pub movement_speed: Option<i32>,
    /// Width of the side panel next to the map.
    pub panel_width: f32,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            robot_url: "http://valetudo.local".into(),
            request_timeout_secs: 5,
            map_padding: 16.0,
            map_refresh_secs: 5.0,
            joystick_max_offset: 100.0,
            velocity_limit: 300.0,
            angle_limit: 90.0,
            discrete_deadzone: 20.0,
            movement_speed: None,
            panel_width: 320.0,
        }
    }
}

impl ClientSettings {
    pub const ROBOT_URL_ENV: &'static str = "ROBOT_URL";

    /// Get the data directory for settings files.
    pub fn data_dir() -> PathBuf {
        let base = dirs::data_dir().unwrap_or_else(|| PathBuf::from("."));
        base.join("robot_remote")
    }

    pub fn file_path() -> PathBuf {
        Self::data_dir().join("settings.ron")
    }

    /// Load from file (creating it with defaults if absent), then apply
    /// environment overrides.
    pub fn load_or_default() -> Self {
        let mut settings = Self::load_file().unwrap_or_else(|| {
            let settings = Self::default();
            settings.save();
            settings
        });
        if let Ok(url) = std::env::var(Self::ROBOT_URL_ENV) {
            if !url.trim().is_empty() {
                settings.robot_url = url.trim().to_string();
            }
        }
        settings
    }

    fn load_file() -> Option<Self> {
        let path = Self::file_path();
        if !path.exists() {
            return None;
        }
        match std::fs::read_to_string(&path) {
            Ok(contents) => match Self::parse(&contents) {
                Ok(settings) => Some(settings),
                Err(e) => {
                    warn!("Failed to parse settings.ron: {e}, using defaults");
                    Some(Self::default())
                }
            },
            Err(e) => {
                warn!("Failed to read settings.ron: {e}, using defaults");
                Some(Self::default())
            }
        }
    }

    pub fn parse(contents: &str) -> Result<Self, ron::error::SpannedError> {
        ron::from_str(contents)
    }

    pub fn save(&self) {
        let path = Self::file_path();
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        let pretty = ron::ser::PrettyConfig::default();
        match ron::ser::to_string_pretty(self, pretty) {
            Ok(s) => {
                if let Err(e) = std::fs::write(&path, s) {
                    warn!("Failed to write settings.ron: {e}");
                }
            }
            Err(e) => {
                warn!("Failed to serialize settings: {e}");
            }
        }
    }

    pub fn reload(&mut self) {
        *self = Self::load_or_default();
        info!("Settings reloaded");
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs.max(1))
    }

    /// Limits are magnitudes: negative values are flipped and non-finite
    /// ones fall back to the defaults, so the clamps below never see
    /// `min > max`.
    pub fn control_limits(&self) -> ControlLimits {
        let defaults = ControlLimits::default();
        let max_offset = magnitude(
            "joystick_max_offset",
            self.joystick_max_offset,
            defaults.max_offset,
        );
        ControlLimits {
            max_offset: max_offset.max(1.0),
            velocity_limit: magnitude("velocity_limit", self.velocity_limit, defaults.velocity_limit),
            angle_limit: magnitude("angle_limit", self.angle_limit, defaults.angle_limit),
            deadzone: magnitude("discrete_deadzone", self.discrete_deadzone, defaults.deadzone),
        }
    }
}

fn magnitude(name: &str, value: f32, fallback: f32) -> f32 {
    if !value.is_finite() {
        warn!("{name} is {value}, using {fallback}");
        fallback
    } else if value < 0.0 {
        warn!("{name} is negative, using {}", -value);
        -value
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_fills_in_defaults() {
        let settings =
            ClientSettings::parse(r#"(robot_url: "http://10.0.0.7", map_padding: 4.0)"#).unwrap();
        assert_eq!(settings.robot_url, "http://10.0.0.7");
        assert_eq!(settings.map_padding, 4.0);
        assert_eq!(settings.velocity_limit, 300.0);
        assert_eq!(settings.movement_speed, None);
    }

    #[test]
    fn settings_round_trip_through_ron() {
        let mut settings = ClientSettings::default();
        settings.movement_speed = Some(3);
        let text = ron::ser::to_string_pretty(&settings, ron::ser::PrettyConfig::default())
            .unwrap();
        let back = ClientSettings::parse(&text).unwrap();
        assert_eq!(back.movement_speed, Some(3));
        assert_eq!(back.robot_url, settings.robot_url);
    }

    #[test]
    fn control_limits_guard_against_zero_offset() {
        let settings = ClientSettings {
            joystick_max_offset: 0.0,
            ..Default::default()
        };
        assert_eq!(settings.control_limits().max_offset, 1.0);
        assert_eq!(settings.request_timeout(), Duration::from_secs(5));
    }

    #[test]
    fn negative_limits_are_read_as_magnitudes() {
        use crate::control::manual::{DriveCommand, continuous_command};

        let settings =
            ClientSettings::parse("(velocity_limit: -300.0, angle_limit: -90.0)").unwrap();
        let limits = settings.control_limits();
        assert_eq!(limits.velocity_limit, 300.0);
        assert_eq!(limits.angle_limit, 90.0);
        assert_eq!(
            continuous_command(Vec2::new(0.0, -100.0), &limits),
            DriveCommand::Vector {
                velocity: 300,
                angle: 0,
            }
        );
    }

    #[test]
    fn non_finite_limits_fall_back_to_defaults() {
        let settings = ClientSettings {
            velocity_limit: f32::NAN,
            joystick_max_offset: f32::INFINITY,
            discrete_deadzone: -5.0,
            ..Default::default()
        };
        let limits = settings.control_limits();
        assert_eq!(limits.velocity_limit, 300.0);
        assert_eq!(limits.max_offset, 100.0);
        assert_eq!(limits.deadzone, 5.0);
    }
}
