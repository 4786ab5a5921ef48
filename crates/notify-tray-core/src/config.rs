use serde::{Deserialize, Serialize};

/// Settings for one [`crate::TrayEnvironment`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Name given to the message-loop thread.
    #[serde(default = "default_thread_name")]
    pub thread_name: String,

    /// Title of the hidden message window.
    #[serde(default = "default_window_title")]
    pub window_title: String,

    /// Stop the loop thread once no icons or menus are left.
    #[serde(default = "default_stop_pump_when_idle")]
    pub stop_pump_when_idle: bool,

    /// First id tried when an icon is added without one.
    #[serde(default = "default_first_host_icon_id")]
    pub first_host_icon_id: u16,
}

fn default_thread_name() -> String {
    "notify-tray-loop".to_string()
}

fn default_window_title() -> String {
    "Tray Message Window".to_string()
}

fn default_stop_pump_when_idle() -> bool {
    true
}

fn default_first_host_icon_id() -> u16 {
    1
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            thread_name: default_thread_name(),
            window_title: default_window_title(),
            stop_pump_when_idle: default_stop_pump_when_idle(),
            first_host_icon_id: default_first_host_icon_id(),
        }
    }
}
