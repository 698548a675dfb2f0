mod api;
mod config;
mod control;
mod map;
mod plugins;
mod screen;
mod segments;

use bevy::prelude::*;

use config::settings::ClientSettings;
use plugins::{
    api_plugin::ApiPlugin, control_plugin::ControlPlugin, map_edit_plugin::MapEditPlugin,
    menu_plugin::MenuPlugin,
};

fn main() {
    let settings = ClientSettings::load_or_default();

    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "Robot Remote".into(),
                resolution: (1280u32, 800u32).into(),
                ..default()
            }),
            ..default()
        }))
        .insert_resource(settings)
        .add_plugins(ApiPlugin)
        .add_plugins(MenuPlugin)
        .add_plugins(MapEditPlugin)
        .add_plugins(ControlPlugin)
        .run();
}
