use crate::platform::consts::{MFS_CHECKED, MFS_DISABLED, MFT_SEPARATOR, MFT_STRING};

use serde::{Deserialize, Serialize};

/// Declarative description of one popup menu item.
///
/// An item with `children` (even an empty list) is a submenu.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MenuItemDescriptor {
    /// Command id returned by [`crate::Menu::show`] when chosen.
    pub id: Option<u32>,
    /// Display text.
    pub text: Option<String>,
    /// Render as a separator line.
    pub separator: bool,
    /// Greyed out and not selectable.
    pub disabled: bool,
    /// Check mark shown.
    pub checked: bool,
    /// Submenu items.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub children: Option<Vec<MenuItemDescriptor>>,
}

impl MenuItemDescriptor {
    /// A plain command item.
    pub fn item(id: u32, text: impl Into<String>) -> Self {
        Self {
            id: Some(id),
            text: Some(text.into()),
            ..Self::default()
        }
    }

    /// A separator line.
    pub fn separator() -> Self {
        Self {
            separator: true,
            ..Self::default()
        }
    }

    /// A submenu entry.
    pub fn submenu(text: impl Into<String>, children: Vec<MenuItemDescriptor>) -> Self {
        Self {
            text: Some(text.into()),
            children: Some(children),
            ..Self::default()
        }
    }

    /// Same item, greyed out.
    pub fn disabled(mut self) -> Self {
        self.disabled = true;
        self
    }

    /// Same item with the check mark set as given.
    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = checked;
        self
    }

    pub(crate) fn type_bits(&self) -> u32 {
        if self.separator { MFT_SEPARATOR } else { MFT_STRING }
    }

    pub(crate) fn state_bits(&self) -> u32 {
        let mut state = 0;
        if self.disabled {
            state |= MFS_DISABLED;
        }
        if self.checked {
            state |= MFS_CHECKED;
        }
        state
    }
}

/// Partial update for one existing menu item; `None` fields are untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuItemPatch {
    /// New command id.
    pub id: Option<u32>,
    /// New display text.
    pub text: Option<String>,
    /// Switch between separator and text item.
    pub separator: Option<bool>,
    /// Enable or grey out.
    pub disabled: Option<bool>,
    /// Set or clear the check mark.
    pub checked: Option<bool>,
    /// Replace the attached submenu.
    pub submenu: Option<Vec<MenuItemDescriptor>>,
}

impl MenuItemPatch {
    /// True when applying the patch would change nothing.
    pub fn is_empty(&self) -> bool {
        self.id.is_none()
            && self.text.is_none()
            && self.separator.is_none()
            && self.disabled.is_none()
            && self.checked.is_none()
            && self.submenu.is_none()
    }
}
