use bevy::prelude::*;

use crate::config::settings::ClientSettings;
use crate::plugins::api_plugin::{RobotHandle, connect};
use crate::plugins::widgets::{
    COLOR_ACCENT, COLOR_BG, COLOR_DANGER, COLOR_TEXT_DIM, button_color, despawn, spawn_button,
    spawn_label,
};
use crate::screen::AppScreen;

pub struct MenuPlugin;

impl Plugin for MenuPlugin {
    fn build(&self, app: &mut App) {
        app.init_state::<AppScreen>();
        app.add_systems(Startup, spawn_camera);

        app.add_systems(OnEnter(AppScreen::Home), spawn_home);
        app.add_systems(OnExit(AppScreen::Home), despawn::<HomeRoot>);
        app.add_systems(
            Update,
            (home_button_system, update_robot_label)
                .chain()
                .run_if(in_state(AppScreen::Home)),
        );
    }
}

// ── Markers ─────────────────────────────────────────────────────────

#[derive(Component)]
struct HomeRoot;

#[derive(Component)]
struct RobotLabel;

#[derive(Component)]
enum HomeButton {
    MapEdit,
    ManualControl,
    ReloadSettings,
}

// ── Systems ─────────────────────────────────────────────────────────

fn spawn_camera(mut commands: Commands) {
    commands.spawn(Camera2d);
}

fn spawn_home(mut commands: Commands) {
    commands
        .spawn((
            HomeRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Column,
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                row_gap: Val::Px(20.0),
                ..default()
            },
            BackgroundColor(COLOR_BG),
        ))
        .with_children(|root| {
            spawn_label(root, "Robot Remote", 48.0, COLOR_ACCENT);
            root.spawn((
                RobotLabel,
                Text::new(""),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(COLOR_TEXT_DIM),
            ));

            root.spawn(Node {
                flex_direction: FlexDirection::Column,
                row_gap: Val::Px(12.0),
                margin: UiRect::top(Val::Px(20.0)),
                ..default()
            })
            .with_children(|col| {
                spawn_button(col, "Map & Segments", HomeButton::MapEdit);
                spawn_button(col, "Manual Control", HomeButton::ManualControl);
                spawn_button(col, "Reload Settings", HomeButton::ReloadSettings);
            });
        });
}

fn home_button_system(
    mut commands: Commands,
    mut q: Query<(&Interaction, &HomeButton, &mut BackgroundColor), Changed<Interaction>>,
    mut settings: ResMut<ClientSettings>,
    robot: Option<Res<RobotHandle>>,
    mut next_state: ResMut<NextState<AppScreen>>,
) {
    for (interaction, button, mut bg) in &mut q {
        let enabled = match button {
            HomeButton::ReloadSettings => true,
            _ => robot.is_some(),
        };
        *bg = BackgroundColor(button_color(*interaction, enabled));
        if *interaction != Interaction::Pressed || !enabled {
            continue;
        }
        match button {
            HomeButton::MapEdit => next_state.set(AppScreen::MapEdit),
            HomeButton::ManualControl => next_state.set(AppScreen::ManualControl),
            HomeButton::ReloadSettings => {
                settings.reload();
                match connect(&settings) {
                    Some(handle) => commands.insert_resource(handle),
                    None => commands.remove_resource::<RobotHandle>(),
                }
            }
        }
    }
}

fn update_robot_label(
    robot: Option<Res<RobotHandle>>,
    settings: Res<ClientSettings>,
    mut q: Query<(&mut Text, &mut TextColor), With<RobotLabel>>,
) {
    let (text, color) = match robot.as_deref() {
        Some(handle) => (format!("Robot: {}", handle.url), COLOR_TEXT_DIM),
        None => (
            format!("Cannot reach {}: check settings.ron", settings.robot_url),
            COLOR_DANGER,
        ),
    };
    for (mut label, mut label_color) in &mut q {
        if **label != text {
            **label = text.clone();
        }
        label_color.0 = color;
    }
}
