pub mod api_plugin;
pub mod control_plugin;
pub mod map_edit_plugin;
pub mod menu_plugin;
pub mod widgets;
