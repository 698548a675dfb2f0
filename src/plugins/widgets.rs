use bevy::ecs::hierarchy::ChildSpawnerCommands;
use bevy::input::keyboard::{Key, KeyboardInput};
use bevy::prelude::*;

// ── Colors ──────────────────────────────────────────────────────────

pub const COLOR_BG: Color = Color::srgba(0.08, 0.08, 0.12, 1.0);
pub const COLOR_PANEL: Color = Color::srgba(0.11, 0.12, 0.17, 1.0);
pub const COLOR_BTN: Color = Color::srgba(0.18, 0.20, 0.28, 1.0);
pub const COLOR_BTN_HOVER: Color = Color::srgba(0.28, 0.32, 0.42, 1.0);
pub const COLOR_BTN_PRESS: Color = Color::srgba(0.12, 0.14, 0.20, 1.0);
pub const COLOR_BTN_DISABLED: Color = Color::srgba(0.14, 0.14, 0.18, 1.0);
pub const COLOR_SELECTED: Color = Color::srgba(0.15, 0.45, 0.75, 1.0);
pub const COLOR_TEXT: Color = Color::WHITE;
pub const COLOR_TEXT_DIM: Color = Color::srgba(0.5, 0.5, 0.5, 1.0);
pub const COLOR_ACCENT: Color = Color::srgba(0.2, 0.7, 1.0, 1.0);
pub const COLOR_DANGER: Color = Color::srgba(0.8, 0.2, 0.2, 1.0);
pub const COLOR_INPUT_BG: Color = Color::srgba(0.10, 0.10, 0.16, 1.0);
pub const COLOR_INPUT_FOCUS: Color = Color::srgba(0.15, 0.15, 0.25, 1.0);

pub fn despawn<T: Component>(mut commands: Commands, query: Query<Entity, With<T>>) {
    for entity in &query {
        commands.entity(entity).despawn();
    }
}

pub fn spawn_button<C: Component>(parent: &mut ChildSpawnerCommands, label: &str, marker: C) {
    parent
        .spawn((
            marker,
            Button,
            Node {
                padding: UiRect::axes(Val::Px(16.0), Val::Px(10.0)),
                justify_content: JustifyContent::Center,
                align_items: AlignItems::Center,
                border_radius: BorderRadius::all(Val::Px(6.0)),
                ..default()
            },
            BackgroundColor(COLOR_BTN),
        ))
        .with_children(|btn| {
            btn.spawn((
                Text::new(label),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(COLOR_TEXT),
            ));
        });
}

pub fn spawn_label(parent: &mut ChildSpawnerCommands, text: &str, size: f32, color: Color) {
    parent.spawn((
        Text::new(text),
        TextFont {
            font_size: size,
            ..default()
        },
        TextColor(color),
    ));
}

/// Hover/press feedback for an enabled button; disabled buttons stay flat.
pub fn button_color(interaction: Interaction, enabled: bool) -> Color {
    if !enabled {
        return COLOR_BTN_DISABLED;
    }
    match interaction {
        Interaction::Pressed => COLOR_BTN_PRESS,
        Interaction::Hovered => COLOR_BTN_HOVER,
        Interaction::None => COLOR_BTN,
    }
}

// ── Text field ──────────────────────────────────────────────────────

#[derive(Component)]
pub struct TextField {
    pub value: String,
    pub focused: bool,
}

#[derive(Component)]
pub struct TextFieldDisplay;

pub fn spawn_text_field<C: Component>(
    parent: &mut ChildSpawnerCommands,
    initial: &str,
    width: f32,
    marker: C,
) {
    parent
        .spawn((
            marker,
            TextField {
                value: initial.to_string(),
                focused: false,
            },
            Button,
            Node {
                width: Val::Px(width),
                padding: UiRect::axes(Val::Px(10.0), Val::Px(6.0)),
                border_radius: BorderRadius::all(Val::Px(4.0)),
                ..default()
            },
            BackgroundColor(COLOR_INPUT_BG),
        ))
        .with_children(|input| {
            input.spawn((
                TextFieldDisplay,
                Text::new(initial),
                TextFont {
                    font_size: 16.0,
                    ..default()
                },
                TextColor(COLOR_TEXT),
            ));
        });
}

/// Click to focus, type to edit, Enter/Escape to leave the field.
pub fn text_field_system(
    mut inputs: Query<(&Interaction, &mut TextField, &mut BackgroundColor, &Children)>,
    mut displays: Query<&mut Text, With<TextFieldDisplay>>,
    mut keyboard_events: MessageReader<KeyboardInput>,
) {
    let events: Vec<_> = keyboard_events.read().cloned().collect();
    let any_clicked = inputs
        .iter()
        .any(|(interaction, ..)| *interaction == Interaction::Pressed);

    for (interaction, mut input, mut bg, children) in &mut inputs {
        if any_clicked {
            input.focused = *interaction == Interaction::Pressed;
        }
        if !input.focused {
            *bg = BackgroundColor(COLOR_INPUT_BG);
            continue;
        }
        *bg = BackgroundColor(COLOR_INPUT_FOCUS);

        for event in &events {
            if !event.state.is_pressed() {
                continue;
            }
            match &event.logical_key {
                Key::Backspace => {
                    input.value.pop();
                }
                Key::Escape | Key::Enter => {
                    input.focused = false;
                }
                Key::Space => input.value.push(' '),
                Key::Character(c) => {
                    input.value.push_str(c.as_str());
                }
                _ => {}
            }
        }

        for child in children.iter() {
            if let Ok(mut text) = displays.get_mut(child) {
                **text = if input.value.is_empty() {
                    "...".into()
                } else {
                    input.value.clone()
                };
            }
        }
    }
}
