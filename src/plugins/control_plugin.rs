use bevy::prelude::*;
use bevy::ui::RelativeCursorPosition;

use crate::api::{RobotRequest, Ticket};
use crate::config::settings::ClientSettings;
use crate::control::manual::clamp_displacement;
use crate::control::{ControlLimits, ControlMode, ControlPhase, ControlScreen};
use crate::plugins::api_plugin::{Inbox, RobotHandle, TokioRuntime};
use crate::plugins::widgets::{
    COLOR_ACCENT, COLOR_BG, COLOR_DANGER, COLOR_PANEL, COLOR_TEXT, COLOR_TEXT_DIM, button_color,
    despawn, spawn_button, spawn_label,
};
use crate::screen::AppScreen;

const KNOB_SIZE: f32 = 48.0;

pub struct ControlPlugin;

impl Plugin for ControlPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<ControlState>();
        app.init_resource::<ControlInbox>();
        app.add_systems(OnEnter(AppScreen::ManualControl), (enter_control, spawn_control));
        app.add_systems(
            OnExit(AppScreen::ManualControl),
            (leave_control, despawn::<ControlRoot>),
        );
        app.add_systems(
            Update,
            (
                drain_control_system,
                joystick_system,
                control_button_system,
                control_visuals,
            )
                .chain()
                .run_if(in_state(AppScreen::ManualControl)),
        );
    }
}

// ── State ───────────────────────────────────────────────────────────

/// Manual control state plus what the joystick last sent, so an unmoved
/// knob does not flood the robot with identical commands.
#[derive(Resource)]
struct ControlState {
    screen: ControlScreen,
    last_sent: Option<Vec2>,
    last_command: Option<String>,
    last_error: Option<String>,
}

impl Default for ControlState {
    fn default() -> Self {
        Self {
            screen: ControlScreen::new(ControlLimits::default(), None),
            last_sent: None,
            last_command: None,
            last_error: None,
        }
    }
}

#[derive(Resource, Default)]
struct ControlInbox(Inbox);

// ── Markers ─────────────────────────────────────────────────────────

#[derive(Component)]
struct ControlRoot;

#[derive(Component)]
struct JoystickPad;

#[derive(Component)]
struct JoystickKnob;

#[derive(Component)]
struct ControlStatus;

#[derive(Component)]
enum ControlButton {
    Back,
}

// ── Lifecycle ───────────────────────────────────────────────────────

fn enter_control(
    mut state: ResMut<ControlState>,
    settings: Res<ClientSettings>,
    inbox: Res<ControlInbox>,
    rt: Option<Res<TokioRuntime>>,
    robot: Option<Res<RobotHandle>>,
) {
    state
        .screen
        .configure(settings.control_limits(), settings.movement_speed);
    let ticket = state.screen.enter();
    state.last_sent = None;
    state.last_command = None;
    state.last_error = None;
    info!("Entering manual control (session {})", state.screen.session().value());
    inbox.0.spawn(rt.as_deref(), robot.as_deref(), ticket);
}

fn leave_control(
    mut state: ResMut<ControlState>,
    inbox: Res<ControlInbox>,
    rt: Option<Res<TokioRuntime>>,
    robot: Option<Res<RobotHandle>>,
) {
    for ticket in state.screen.leave() {
        info!("Leaving manual control: {}", ticket.request.label());
        inbox.0.spawn(rt.as_deref(), robot.as_deref(), ticket);
    }
    state.last_sent = None;
}

fn spawn_control(mut commands: Commands, settings: Res<ClientSettings>) {
    let pad_size = settings.joystick_max_offset * 2.0 + KNOB_SIZE;

    commands
        .spawn((
            ControlRoot,
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
            spawn_label(root, "Manual Control", 36.0, COLOR_ACCENT);
            root.spawn((
                ControlStatus,
                Text::new(""),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(COLOR_TEXT_DIM),
            ));

            root.spawn((
                JoystickPad,
                RelativeCursorPosition::default(),
                Node {
                    width: Val::Px(pad_size),
                    height: Val::Px(pad_size),
                    border_radius: BorderRadius::all(Val::Percent(50.0)),
                    ..default()
                },
                BackgroundColor(COLOR_PANEL),
            ))
            .with_children(|pad| {
                pad.spawn((
                    JoystickKnob,
                    Node {
                        position_type: PositionType::Absolute,
                        width: Val::Px(KNOB_SIZE),
                        height: Val::Px(KNOB_SIZE),
                        left: Val::Px(settings.joystick_max_offset),
                        top: Val::Px(settings.joystick_max_offset),
                        border_radius: BorderRadius::all(Val::Percent(50.0)),
                        ..default()
                    },
                    BackgroundColor(COLOR_ACCENT),
                ));
            });

            spawn_button(root, "Back", ControlButton::Back);
        });
}

// ── Systems ─────────────────────────────────────────────────────────

fn drain_control_system(
    mut state: ResMut<ControlState>,
    inbox: Res<ControlInbox>,
    rt: Option<Res<TokioRuntime>>,
    robot: Option<Res<RobotHandle>>,
) {
    for completion in inbox.0.drain() {
        let applied = state.screen.apply(completion);
        for ticket in applied.follow_ups {
            inbox.0.spawn(rt.as_deref(), robot.as_deref(), ticket);
        }
        if let Some(e) = applied.error {
            state.last_error = Some(e.to_string());
        }
    }
}

/// Drag inside the pad to drive. Commands use the per-axis clamp so a full
/// diagonal drag reaches both limits; the knob itself stays on the round pad.
/// A command goes out whenever the displacement changes.
fn joystick_system(
    mouse: Res<ButtonInput<MouseButton>>,
    settings: Res<ClientSettings>,
    pad: Query<&RelativeCursorPosition, With<JoystickPad>>,
    mut knob: Query<&mut Node, With<JoystickKnob>>,
    mut state: ResMut<ControlState>,
    inbox: Res<ControlInbox>,
    rt: Option<Res<TokioRuntime>>,
    robot: Option<Res<RobotHandle>>,
) {
    let Ok(cursor) = pad.single() else {
        return;
    };
    let max_offset = settings.joystick_max_offset;
    let reach = max_offset + KNOB_SIZE / 2.0;
    // Normalized pad position is centered on the pad, y pointing down.
    let displacement = cursor.normalized.map(|pos| pos * reach * 2.0);

    let mut tickets: Vec<Ticket> = Vec::new();

    let inside = cursor.normalized.is_some_and(|pos| pos.length() <= 0.5);
    if mouse.just_pressed(MouseButton::Left) && inside {
        state.screen.begin_gesture();
        state.last_sent = None;
    }

    if state.screen.is_dragging() {
        if mouse.just_released(MouseButton::Left) {
            tickets.extend(state.screen.end_gesture());
            state.last_sent = None;
        } else if let Some(displacement) = displacement {
            let clamped = clamp_displacement(displacement, max_offset);
            if state.last_sent != Some(clamped) {
                state.last_sent = Some(clamped);
                tickets.extend(state.screen.update_gesture(clamped));
            }
        }
    }

    let knob_offset = if state.screen.is_dragging() {
        state
            .last_sent
            .unwrap_or(Vec2::ZERO)
            .clamp_length_max(max_offset)
    } else {
        Vec2::ZERO
    };
    for mut node in &mut knob {
        node.left = Val::Px(max_offset + knob_offset.x);
        node.top = Val::Px(max_offset + knob_offset.y);
    }

    for ticket in tickets {
        state.last_command = Some(describe(&ticket.request));
        inbox.0.spawn(rt.as_deref(), robot.as_deref(), ticket);
    }
}

fn describe(request: &RobotRequest) -> String {
    match request {
        RobotRequest::HighRes { velocity, angle } => format!("velocity {velocity}, angle {angle}"),
        RobotRequest::Manual { action, .. } => action.as_str().to_string(),
        other => other.label().to_string(),
    }
}

fn control_button_system(
    mut q: Query<(&Interaction, &ControlButton, &mut BackgroundColor), Changed<Interaction>>,
    mut next_state: ResMut<NextState<AppScreen>>,
) {
    for (interaction, button, mut bg) in &mut q {
        *bg = BackgroundColor(button_color(*interaction, true));
        if *interaction != Interaction::Pressed {
            continue;
        }
        match button {
            ControlButton::Back => next_state.set(AppScreen::Home),
        }
    }
}

fn control_visuals(
    state: Res<ControlState>,
    mut status: Query<(&mut Text, &mut TextColor), With<ControlStatus>>,
    mut pad: Query<&mut Node, With<JoystickPad>>,
) {
    let phase = state.screen.phase();

    let mode = match phase {
        ControlPhase::Uninitialized | ControlPhase::CapabilitiesLoading => {
            "Asking the robot what it supports...".to_string()
        }
        ControlPhase::Ready(ControlMode::Continuous) => "Continuous drive".to_string(),
        ControlPhase::Ready(ControlMode::Discrete) => "Step drive".to_string(),
        ControlPhase::Ready(ControlMode::Unavailable) => {
            "This robot does not support manual control".to_string()
        }
    };
    let mut lines = vec![mode];
    if let Some(command) = &state.last_command {
        lines.push(format!("Last command: {command}"));
    }
    let failed = state.screen.failed_commands();
    if failed > 0 {
        lines.push(format!("{failed} command(s) failed"));
    }
    if let Some(error) = &state.last_error {
        lines.push(error.clone());
    }
    let message = lines.join("\n");
    let color = if failed > 0 { COLOR_DANGER } else { COLOR_TEXT };

    for (mut text, mut text_color) in &mut status {
        if **text != message {
            **text = message.clone();
        }
        text_color.0 = color;
    }

    let usable = matches!(
        phase,
        ControlPhase::Ready(ControlMode::Continuous | ControlMode::Discrete)
    );
    for mut node in &mut pad {
        node.display = if usable { Display::Flex } else { Display::None };
    }
}
