use bevy::asset::RenderAssetUsages;
use bevy::ecs::hierarchy::ChildSpawnerCommands;
use bevy::prelude::*;
use bevy::render::render_resource::{Extent3d, TextureDimension, TextureFormat};
use bevy::window::PrimaryWindow;

use crate::api::{ClientError, RobotRequest, RobotResponse, Ticket};
use crate::config::settings::ClientSettings;
use crate::map::{MapViewState, Overlay, Scene, render};
use crate::plugins::api_plugin::{Inbox, RobotHandle, TokioRuntime};
use crate::plugins::widgets::{
    COLOR_ACCENT, COLOR_BG, COLOR_DANGER, COLOR_PANEL, COLOR_SELECTED, COLOR_TEXT,
    COLOR_TEXT_DIM, TextField, button_color, despawn, spawn_button, spawn_label, spawn_text_field,
    text_field_system,
};
use crate::screen::AppScreen;
use crate::segments::{EditPhase, SegmentEditor};

// ── Plugin ──────────────────────────────────────────────────────────

pub struct MapEditPlugin;

impl Plugin for MapEditPlugin {
    fn build(&self, app: &mut App) {
        app.init_resource::<MapEditScreen>();
        app.init_resource::<MapEditInbox>();

        app.add_systems(OnEnter(AppScreen::MapEdit), (enter_map_edit, spawn_map_edit).chain());
        app.add_systems(
            OnExit(AppScreen::MapEdit),
            (leave_map_edit, despawn::<MapEditRoot>),
        );
        app.add_systems(
            Update,
            (
                drain_map_edit_system,
                map_refresh_system,
                map_layout_system,
                map_pointer_system,
                text_field_system,
                map_edit_button_system,
                rebuild_segment_list,
                rebuild_material_list,
                map_repaint_system,
                map_panel_visuals,
            )
                .chain()
                .run_if(in_state(AppScreen::MapEdit)),
        );
    }
}

// ── State ───────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum EditTool {
    #[default]
    Select,
    Split,
}

/// Everything the map screen owns. Survives between visits so the editor's
/// session counter keeps moving forward.
#[derive(Resource)]
struct MapEditScreen {
    editor: SegmentEditor,
    view: MapViewState,
    tool: EditTool,
    drag: Option<(Vec2, Vec2)>,
    list_dirty: bool,
    materials_dirty: bool,
    refresh: Option<Timer>,
    status: Option<String>,
}

impl Default for MapEditScreen {
    fn default() -> Self {
        Self {
            editor: SegmentEditor::default(),
            view: MapViewState::default(),
            tool: EditTool::Select,
            drag: None,
            list_dirty: false,
            materials_dirty: false,
            refresh: None,
            status: None,
        }
    }
}

impl MapEditScreen {
    /// Keep the ticket, or record why the editor refused it.
    fn submit(&mut self, result: Result<Ticket, ClientError>) -> Option<Ticket> {
        match result {
            Ok(ticket) => {
                self.status = None;
                Some(ticket)
            }
            Err(e) => {
                info!("Segment action rejected: {e}");
                self.status = Some(e.to_string());
                None
            }
        }
    }

    fn selection_changed(&mut self) {
        self.list_dirty = true;
        self.view.invalidate();
    }
}

#[derive(Resource, Default)]
struct MapEditInbox(Inbox);

#[derive(Resource)]
struct MapCanvas(Handle<Image>);

// ── Markers ─────────────────────────────────────────────────────────

#[derive(Component)]
struct MapEditRoot;

#[derive(Component)]
struct MapSurface;

#[derive(Component)]
struct StatusText;

#[derive(Component)]
struct SelectionText;

#[derive(Component)]
struct SegmentListRoot;

#[derive(Component)]
struct MaterialListRoot;

#[derive(Component)]
struct RenameField;

#[derive(Component)]
struct SegmentRow(String);

#[derive(Component)]
struct MaterialChoice(String);

#[derive(Component, Clone, Copy, PartialEq, Eq)]
enum MapEditButton {
    SelectTool,
    SplitTool,
    Rename,
    Join,
    Material,
    Refresh,
    Back,
}

// ── Lifecycle ───────────────────────────────────────────────────────

fn enter_map_edit(
    mut commands: Commands,
    mut screen: ResMut<MapEditScreen>,
    mut images: ResMut<Assets<Image>>,
    settings: Res<ClientSettings>,
    inbox: Res<MapEditInbox>,
    rt: Option<Res<TokioRuntime>>,
    robot: Option<Res<RobotHandle>>,
) {
    let screen = &mut *screen;
    let entry = screen.editor.enter();
    screen.view = MapViewState::new(settings.map_padding);
    screen.tool = EditTool::Select;
    screen.drag = None;
    screen.status = None;
    screen.list_dirty = true;
    screen.materials_dirty = true;
    screen.refresh = (settings.map_refresh_secs > 0.0)
        .then(|| Timer::from_seconds(settings.map_refresh_secs, TimerMode::Repeating));

    let placeholder = Image::new_fill(
        Extent3d {
            width: 1,
            height: 1,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        &[0, 0, 0, 0],
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
    );
    commands.insert_resource(MapCanvas(images.add(placeholder)));

    info!("Entering map editor (session {})", screen.editor.session().value());
    for ticket in [entry, screen.editor.load_map()] {
        inbox.0.spawn(rt.as_deref(), robot.as_deref(), ticket);
    }
}

fn leave_map_edit(mut commands: Commands, mut screen: ResMut<MapEditScreen>) {
    screen.editor.leave();
    screen.view.reset();
    screen.drag = None;
    screen.refresh = None;
    commands.remove_resource::<MapCanvas>();
}

fn spawn_map_edit(
    mut commands: Commands,
    canvas: Option<Res<MapCanvas>>,
    settings: Res<ClientSettings>,
) {
    let Some(canvas) = canvas else {
        return;
    };

    commands
        .spawn((
            MapEditRoot,
            Node {
                width: Val::Percent(100.0),
                height: Val::Percent(100.0),
                flex_direction: FlexDirection::Row,
                ..default()
            },
            BackgroundColor(COLOR_BG),
        ))
        .with_children(|root| {
            // ── Map surface ──
            root.spawn((
                MapSurface,
                ImageNode::new(canvas.0.clone()),
                Node {
                    flex_grow: 1.0,
                    height: Val::Percent(100.0),
                    ..default()
                },
            ));

            // ── Side panel ──
            root.spawn((
                Node {
                    width: Val::Px(settings.panel_width),
                    height: Val::Percent(100.0),
                    flex_direction: FlexDirection::Column,
                    padding: UiRect::all(Val::Px(14.0)),
                    row_gap: Val::Px(10.0),
                    overflow: Overflow::clip_y(),
                    ..default()
                },
                BackgroundColor(COLOR_PANEL),
            ))
            .with_children(|panel| {
                spawn_label(panel, "Segments", 26.0, COLOR_ACCENT);
                panel.spawn((
                    StatusText,
                    Text::new(""),
                    TextFont {
                        font_size: 14.0,
                        ..default()
                    },
                    TextColor(COLOR_TEXT_DIM),
                ));

                spawn_row(panel, |row| {
                    spawn_button(row, "Select", MapEditButton::SelectTool);
                    spawn_button(row, "Split", MapEditButton::SplitTool);
                });

                panel.spawn((
                    SelectionText,
                    Text::new(""),
                    TextFont {
                        font_size: 14.0,
                        ..default()
                    },
                    TextColor(COLOR_TEXT),
                ));

                spawn_row(panel, |row| {
                    spawn_text_field(row, "", 160.0, RenameField);
                    spawn_button(row, "Rename", MapEditButton::Rename);
                });

                spawn_row(panel, |row| {
                    spawn_button(row, "Join", MapEditButton::Join);
                    spawn_button(row, "Material", MapEditButton::Material);
                });

                panel.spawn((
                    MaterialListRoot,
                    Node {
                        flex_direction: FlexDirection::Row,
                        flex_wrap: FlexWrap::Wrap,
                        column_gap: Val::Px(6.0),
                        row_gap: Val::Px(6.0),
                        ..default()
                    },
                ));

                panel.spawn((
                    SegmentListRoot,
                    Node {
                        flex_direction: FlexDirection::Column,
                        row_gap: Val::Px(4.0),
                        flex_grow: 1.0,
                        ..default()
                    },
                ));

                spawn_row(panel, |row| {
                    spawn_button(row, "Refresh", MapEditButton::Refresh);
                    spawn_button(row, "Back", MapEditButton::Back);
                });
            });
        });
}

fn spawn_row(parent: &mut ChildSpawnerCommands, spawn_children: impl FnOnce(&mut ChildSpawnerCommands)) {
    parent
        .spawn(Node {
            flex_direction: FlexDirection::Row,
            column_gap: Val::Px(8.0),
            align_items: AlignItems::Center,
            ..default()
        })
        .with_children(spawn_children);
}

// ── Robot traffic ───────────────────────────────────────────────────

fn drain_map_edit_system(
    mut screen: ResMut<MapEditScreen>,
    inbox: Res<MapEditInbox>,
    rt: Option<Res<TokioRuntime>>,
    robot: Option<Res<RobotHandle>>,
) {
    let screen = &mut *screen;
    for completion in inbox.0.drain() {
        let current = completion.session == screen.editor.session();

        if completion.request == RobotRequest::Map {
            if !current {
                debug!("Dropping stale map from session {}", completion.session.value());
                continue;
            }
            match completion.result {
                Ok(RobotResponse::Map(payload)) => {
                    if screen.view.accept(&payload) {
                        debug!("Map updated");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    warn!("Map fetch failed: {e}");
                    screen.status = Some(format!("Map unavailable: {e}"));
                }
            }
            continue;
        }

        // Join and split reshape the map, so fetch it again after any edit.
        let reload_map =
            current && completion.request.is_segment_edit() && completion.result.is_ok();

        let applied = screen.editor.apply(completion);
        for ticket in applied.follow_ups {
            inbox.0.spawn(rt.as_deref(), robot.as_deref(), ticket);
        }
        if let Some(e) = applied.error {
            screen.status = Some(e.to_string());
        }
        if reload_map {
            inbox
                .0
                .spawn(rt.as_deref(), robot.as_deref(), screen.editor.load_map());
        }
        if current {
            screen.materials_dirty = true;
            screen.selection_changed();
        }
    }
}

fn map_refresh_system(
    time: Res<Time>,
    mut screen: ResMut<MapEditScreen>,
    inbox: Res<MapEditInbox>,
    rt: Option<Res<TokioRuntime>>,
    robot: Option<Res<RobotHandle>>,
) {
    let Some(timer) = screen.refresh.as_mut() else {
        return;
    };
    if timer.tick(time.delta()).just_finished() {
        inbox
            .0
            .spawn(rt.as_deref(), robot.as_deref(), screen.editor.load_map());
    }
}

// ── Map surface ─────────────────────────────────────────────────────

fn map_layout_system(
    windows: Query<&Window, With<PrimaryWindow>>,
    settings: Res<ClientSettings>,
    mut screen: ResMut<MapEditScreen>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let view = Vec2::new(
        (window.width() - settings.panel_width).max(0.0),
        window.height(),
    );
    if screen.view.view_size() != view {
        screen.view.resize(view);
    }
}

fn map_pointer_system(
    windows: Query<&Window, With<PrimaryWindow>>,
    mouse: Res<ButtonInput<MouseButton>>,
    mut screen: ResMut<MapEditScreen>,
    inbox: Res<MapEditInbox>,
    rt: Option<Res<TokioRuntime>>,
    robot: Option<Res<RobotHandle>>,
) {
    let Ok(window) = windows.single() else {
        return;
    };
    let screen = &mut *screen;
    let view = screen.view.view_size();
    let cursor = window
        .cursor_position()
        .filter(|pos| pos.x < view.x && pos.y < view.y);

    match screen.tool {
        EditTool::Select => {
            let Some(cursor) = cursor else {
                return;
            };
            if !mouse.just_pressed(MouseButton::Left) {
                return;
            }
            let (Some(map), Some(transform)) = (screen.view.map(), screen.view.transform()) else {
                return;
            };
            let hit = map
                .segment_at(transform.screen_to_map(cursor))
                .map(str::to_string);
            if let Some(id) = hit {
                screen.editor.toggle_selection(&id);
                screen.selection_changed();
            }
        }
        EditTool::Split => {
            if let Some(cursor) = cursor {
                if mouse.just_pressed(MouseButton::Left) {
                    screen.drag = Some((cursor, cursor));
                    screen.view.invalidate();
                } else if let Some((_, end)) = screen.drag.as_mut() {
                    if *end != cursor {
                        *end = cursor;
                        screen.view.invalidate();
                    }
                }
            }
            if !mouse.just_released(MouseButton::Left) {
                return;
            }
            let Some((from, to)) = screen.drag.take() else {
                return;
            };
            screen.view.invalidate();

            // Cut the selected segment, or the one the line starts in.
            let target = screen
                .editor
                .selection()
                .first()
                .map(str::to_string)
                .or_else(|| {
                    let map = screen.view.map()?;
                    let transform = screen.view.transform()?;
                    map.segment_at(transform.screen_to_map(from))
                        .map(str::to_string)
                });
            let Some(target) = target else {
                screen.status = Some("Select the segment to split".into());
                return;
            };
            let result = screen
                .editor
                .split_from_screen(&target, from, to, screen.view.transform());
            if let Some(ticket) = screen.submit(result) {
                inbox.0.spawn(rt.as_deref(), robot.as_deref(), ticket);
            }
        }
    }
}

fn map_repaint_system(
    mut screen: ResMut<MapEditScreen>,
    canvas: Option<Res<MapCanvas>>,
    mut images: ResMut<Assets<Image>>,
) {
    let Some(canvas) = canvas else {
        return;
    };
    if !screen.view.take_dirty() {
        return;
    }
    let size = screen.view.view_size().as_uvec2();
    if size.x == 0 || size.y == 0 {
        return;
    }
    let Some(map) = screen.view.map() else {
        return;
    };

    let selected = screen.editor.selection().ids();
    let scene = Scene {
        map,
        transform: screen.view.transform(),
        selected: &selected,
        overlay: screen.drag.map(|(from, to)| Overlay::SplitLine { from, to }),
    };
    let painted = render(&scene, size);

    let image = Image::new(
        Extent3d {
            width: size.x,
            height: size.y,
            depth_or_array_layers: 1,
        },
        TextureDimension::D2,
        painted.into_data(),
        TextureFormat::Rgba8UnormSrgb,
        RenderAssetUsages::RENDER_WORLD | RenderAssetUsages::MAIN_WORLD,
    );
    match images.get_mut(canvas.0.id()) {
        Some(existing) => *existing = image,
        None => warn!("Map canvas image is gone"),
    }
}

// ── Side panel ──────────────────────────────────────────────────────

fn map_edit_button_system(
    buttons: Query<(&Interaction, &MapEditButton), Changed<Interaction>>,
    rows: Query<(&Interaction, &SegmentRow), Changed<Interaction>>,
    choices: Query<(&Interaction, &MaterialChoice), Changed<Interaction>>,
    rename_field: Query<&TextField, With<RenameField>>,
    mut screen: ResMut<MapEditScreen>,
    inbox: Res<MapEditInbox>,
    rt: Option<Res<TokioRuntime>>,
    robot: Option<Res<RobotHandle>>,
    mut next_state: ResMut<NextState<AppScreen>>,
) {
    let mut tickets = Vec::new();

    for (interaction, row) in &rows {
        if *interaction == Interaction::Pressed {
            screen.editor.toggle_selection(&row.0);
            screen.selection_changed();
        }
    }

    for (interaction, choice) in &choices {
        if *interaction != Interaction::Pressed {
            continue;
        }
        let Some(target) = screen.editor.material_target().map(str::to_string) else {
            continue;
        };
        let result = screen.editor.set_material(&target, &choice.0);
        tickets.extend(screen.submit(result));
    }

    for (interaction, button) in &buttons {
        if *interaction != Interaction::Pressed {
            continue;
        }
        match button {
            MapEditButton::SelectTool => {
                screen.tool = EditTool::Select;
                screen.drag = None;
            }
            MapEditButton::SplitTool => screen.tool = EditTool::Split,
            MapEditButton::Rename => {
                let Some(target) = screen.editor.selection().first().map(str::to_string) else {
                    screen.status = Some("Select a segment to rename".into());
                    continue;
                };
                let name = rename_field
                    .iter()
                    .next()
                    .map(|field| field.value.clone())
                    .unwrap_or_default();
                let result = screen.editor.rename(&target, &name);
                tickets.extend(screen.submit(result));
            }
            MapEditButton::Join => {
                let result = screen.editor.join();
                tickets.extend(screen.submit(result));
            }
            MapEditButton::Material => {
                if screen.editor.material_target().is_some() {
                    screen.editor.close_material_picker();
                } else if let Some(target) = screen.editor.selection().first().map(str::to_string) {
                    let result = screen.editor.open_material_picker(&target);
                    if let Err(e) = result {
                        screen.status = Some(e.to_string());
                    }
                } else {
                    screen.status = Some("Select a segment first".into());
                }
                screen.materials_dirty = true;
            }
            MapEditButton::Refresh => {
                tickets.push(screen.editor.load_segments());
                tickets.push(screen.editor.load_map());
            }
            MapEditButton::Back => next_state.set(AppScreen::Home),
        }
    }

    for ticket in tickets {
        inbox.0.spawn(rt.as_deref(), robot.as_deref(), ticket);
    }
}

fn rebuild_segment_list(
    mut commands: Commands,
    mut screen: ResMut<MapEditScreen>,
    list_root: Query<Entity, With<SegmentListRoot>>,
    rows: Query<Entity, With<SegmentRow>>,
) {
    if !screen.list_dirty {
        return;
    }
    let Ok(root) = list_root.single() else {
        return;
    };
    screen.list_dirty = false;

    for row in &rows {
        commands.entity(row).despawn();
    }
    let editor = &screen.editor;
    commands.entity(root).with_children(|list| {
        for segment in editor.segments() {
            spawn_button(list, &segment.display_name(), SegmentRow(segment.id.clone()));
        }
    });
}

fn rebuild_material_list(
    mut commands: Commands,
    mut screen: ResMut<MapEditScreen>,
    list_root: Query<Entity, With<MaterialListRoot>>,
    choices: Query<Entity, With<MaterialChoice>>,
) {
    if !screen.materials_dirty {
        return;
    }
    let Ok(root) = list_root.single() else {
        return;
    };
    screen.materials_dirty = false;

    for choice in &choices {
        commands.entity(choice).despawn();
    }
    if screen.editor.material_target().is_none() {
        return;
    }
    let editor = &screen.editor;
    commands.entity(root).with_children(|list| {
        for material in editor.materials() {
            spawn_button(list, material, MaterialChoice(material.clone()));
        }
    });
}

fn map_panel_visuals(
    screen: Res<MapEditScreen>,
    mut buttons: Query<(&Interaction, &MapEditButton, &mut BackgroundColor, &mut Node)>,
    mut rows: Query<
        (&Interaction, &SegmentRow, &mut BackgroundColor),
        Without<MapEditButton>,
    >,
    mut choices: Query<
        (&Interaction, &mut BackgroundColor),
        (With<MaterialChoice>, Without<MapEditButton>, Without<SegmentRow>),
    >,
    mut rename_field: Query<&mut Node, (With<RenameField>, Without<MapEditButton>)>,
    mut status: Query<(&mut Text, &mut TextColor), (With<StatusText>, Without<SelectionText>)>,
    mut selection_text: Query<&mut Text, (With<SelectionText>, Without<StatusText>)>,
) {
    let editor = &screen.editor;
    let features = editor.features();
    let idle = !editor.is_busy();
    let selected = editor.selection().len();

    for (interaction, button, mut bg, mut node) in &mut buttons {
        let (visible, enabled, active) = match button {
            MapEditButton::SelectTool => (true, true, screen.tool == EditTool::Select),
            MapEditButton::SplitTool => {
                (features.can_edit, idle, screen.tool == EditTool::Split)
            }
            MapEditButton::Rename => (features.can_rename, idle && selected >= 1, false),
            MapEditButton::Join => (features.can_edit, idle && selected == 2, false),
            MapEditButton::Material => (
                features.can_set_material,
                idle && selected >= 1,
                editor.material_target().is_some(),
            ),
            MapEditButton::Refresh | MapEditButton::Back => (true, true, false),
        };
        node.display = if visible { Display::Flex } else { Display::None };
        *bg = BackgroundColor(if active {
            COLOR_SELECTED
        } else {
            button_color(*interaction, enabled)
        });
    }

    for mut node in &mut rename_field {
        node.display = if features.can_rename { Display::Flex } else { Display::None };
    }

    for (interaction, row, mut bg) in &mut rows {
        *bg = BackgroundColor(if editor.selection().contains(&row.0) {
            COLOR_SELECTED
        } else {
            button_color(*interaction, true)
        });
    }

    for (interaction, mut bg) in &mut choices {
        *bg = BackgroundColor(button_color(*interaction, idle));
    }

    let (message, color) = match (screen.status.as_deref(), editor.last_error()) {
        (Some(message), _) | (None, Some(message)) => (message.to_string(), COLOR_DANGER),
        (None, None) => (phase_label(editor.phase()).to_string(), COLOR_TEXT_DIM),
    };
    for (mut text, mut text_color) in &mut status {
        if **text != message {
            **text = message.clone();
        }
        text_color.0 = color;
    }

    let names: Vec<String> = editor
        .selection()
        .ids()
        .iter()
        .map(|id| {
            editor
                .segment(id)
                .map(|segment| segment.display_name())
                .unwrap_or_else(|| id.clone())
        })
        .collect();
    let summary = if names.is_empty() {
        "Nothing selected".to_string()
    } else {
        format!("Selected: {}", names.join(", "))
    };
    for mut text in &mut selection_text {
        if **text != summary {
            **text = summary.clone();
        }
    }
}

fn phase_label(phase: EditPhase) -> &'static str {
    match phase {
        EditPhase::Uninitialized => "",
        EditPhase::CapabilitiesLoading => "Asking the robot what it supports...",
        EditPhase::CapabilitiesKnown | EditPhase::SegmentsLoading => "Loading segments...",
        EditPhase::Ready => "Ready",
        EditPhase::ActionInFlight => "Working...",
    }
}
