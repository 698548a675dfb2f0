use bevy::prelude::*;

/// Top-level screens. Each visit to a screen is its own session.
#[derive(States, Debug, Clone, PartialEq, Eq, Hash, Default)]
pub enum AppScreen {
    #[default]
    Home,
    MapEdit,
    ManualControl,
}
