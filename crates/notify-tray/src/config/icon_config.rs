use crate::config::{default_icon_id, default_tooltip};

use notify_tray_core::platform::SystemIcon;
use serde::{Deserialize, Serialize};

/// The demo icon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IconConfig {
    /// Application icon id, 1 to 0xFFFE.
    #[serde(default = "default_icon_id")]
    pub id: u16,

    /// Persistent identity in canonical GUID form.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,

    /// Tooltip shown on hover.
    #[serde(default = "default_tooltip")]
    pub tooltip: String,

    /// Built-in image shown in the notification area.
    #[serde(default = "default_system_icon")]
    pub system_icon: SystemIcon,
}

fn default_system_icon() -> SystemIcon {
    SystemIcon::Application
}

impl Default for IconConfig {
    fn default() -> Self {
        Self {
            id: default_icon_id(),
            guid: None,
            tooltip: default_tooltip(),
            system_icon: default_system_icon(),
        }
    }
}
