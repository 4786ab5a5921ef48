mod icon_config;
mod logging_config;
#[allow(clippy::module_inception)]
mod config;

pub(crate) use {config::Config, icon_config::IconConfig, logging_config::LoggingConfig};

use notify_tray_core::MenuItemDescriptor;

pub(crate) const DEFAULT_ICON_ID: u16 = 1;
pub(crate) const DEFAULT_TOOLTIP: &str = "Notify-Tray";
pub(crate) const DEFAULT_LOG_FILTER: &str = "notify_tray=info,notify_tray_core=info";

/// Command ids of the default menu.
pub(crate) mod menu_ids {
    pub(crate) const SHOW_NOTIFICATION: u32 = 123;
    pub(crate) const CYCLE_TOOLTIP: u32 = 124;
    pub(crate) const QUIET: u32 = 789;
    pub(crate) const EXIT: u32 = 456;
    pub(crate) const ICON_APPLICATION: u32 = 1;
    pub(crate) const ICON_INFORMATION: u32 = 2;
    pub(crate) const ICON_WARNING: u32 = 3;
    pub(crate) const ICON_ERROR: u32 = 4;
}

pub(crate) fn default_icon_id() -> u16 {
    DEFAULT_ICON_ID
}

pub(crate) fn default_tooltip() -> String {
    DEFAULT_TOOLTIP.to_string()
}

pub(crate) fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_string()
}

pub(crate) fn default_menu() -> Vec<MenuItemDescriptor> {
    vec![
        MenuItemDescriptor::item(menu_ids::SHOW_NOTIFICATION, "Show notification"),
        MenuItemDescriptor::item(menu_ids::CYCLE_TOOLTIP, "Change tooltip"),
        MenuItemDescriptor::separator(),
        MenuItemDescriptor::submenu(
            "Icon",
            vec![
                MenuItemDescriptor::item(menu_ids::ICON_APPLICATION, "Application"),
                MenuItemDescriptor::item(menu_ids::ICON_INFORMATION, "Information"),
                MenuItemDescriptor::item(menu_ids::ICON_WARNING, "Warning"),
                MenuItemDescriptor::item(menu_ids::ICON_ERROR, "Error"),
            ],
        ),
        MenuItemDescriptor::item(menu_ids::QUIET, "Quiet notifications").checked(false),
        MenuItemDescriptor::separator(),
        MenuItemDescriptor::item(menu_ids::EXIT, "Exit"),
    ]
}
