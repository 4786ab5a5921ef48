use crate::{HandlerResult, IconId, IconImage, TrayEnvironment};

use std::{fmt, rc::Rc, sync::Arc};

/// Three-way optional field: leave unchanged, clear, or set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Field<T> {
    /// Absent: keep the current value.
    #[default]
    Keep,
    /// Explicit null: remove the current value.
    Clear,
    /// Replace with a new value.
    Set(T),
}

impl<T> Field<T> {
    /// True for [`Field::Keep`].
    pub fn is_keep(&self) -> bool {
        matches!(self, Field::Keep)
    }

    /// The new value, if any.
    pub fn as_set(&self) -> Option<&T> {
        match self {
            Field::Set(value) => Some(value),
            _ => None,
        }
    }

    /// Transform the carried value.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Field<U> {
        match self {
            Field::Keep => Field::Keep,
            Field::Clear => Field::Clear,
            Field::Set(value) => Field::Set(f(value)),
        }
    }

    /// Resolve against the current value.
    pub(crate) fn resolve(self, current: Option<T>) -> Option<T> {
        match self {
            Field::Keep => current,
            Field::Clear => None,
            Field::Set(value) => Some(value),
        }
    }
}

impl<T> From<Option<T>> for Field<T> {
    /// `None` clears, `Some` sets.
    fn from(value: Option<T>) -> Self {
        match value {
            Some(value) => Field::Set(value),
            None => Field::Clear,
        }
    }
}

/// A selection delivered to an icon's handler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SelectEvent {
    /// Icon that was selected.
    pub icon: IconId,
    /// Right button (context menu) rather than left click or keyboard.
    pub right_button: bool,
    /// Screen x in physical pixels.
    pub x: i32,
    /// Screen y in physical pixels.
    pub y: i32,
}

/// Handler invoked on the runtime thread when an icon is selected.
pub type SelectHandler = Rc<dyn Fn(&TrayEnvironment, SelectEvent) -> HandlerResult>;

/// Balloon notification settings.
#[derive(Debug, Clone, Default)]
pub struct NotificationOptions {
    /// Balloon title, truncated to 63 UTF-16 units.
    pub title: Option<String>,
    /// Balloon text, truncated to 255 UTF-16 units.
    pub text: Option<String>,
    /// Play the notification sound (default true).
    pub sound: Option<bool>,
    /// Suppress during quiet time (default true).
    pub respect_quiet_time: Option<bool>,
    /// Drop instead of queueing if it cannot be shown now (default false).
    pub realtime: Option<bool>,
    /// Custom balloon image.
    pub icon: Field<Arc<IconImage>>,
}

/// Options for adding or updating an icon.
///
/// On add, `Keep` and `Clear` are equivalent.
#[derive(Clone, Default)]
pub struct IconOptions {
    /// Hide or show the icon.
    pub hidden: Option<bool>,
    /// Icon image.
    pub icon: Field<Arc<IconImage>>,
    /// Tooltip, truncated to 127 UTF-16 units.
    pub tooltip: Field<String>,
    /// Balloon notification; `Clear` dismisses a shown balloon.
    pub notification: Field<NotificationOptions>,
    /// Selection handler.
    pub on_select: Field<SelectHandler>,
}

impl fmt::Debug for IconOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let on_select = match &self.on_select {
            Field::Keep => "Keep",
            Field::Clear => "Clear",
            Field::Set(_) => "Set(..)",
        };
        f.debug_struct("IconOptions")
            .field("hidden", &self.hidden)
            .field("icon", &self.icon)
            .field("tooltip", &self.tooltip)
            .field("notification", &self.notification)
            .field("on_select", &on_select)
            .finish()
    }
}

impl IconOptions {
    /// Split into the part sent to the loop thread and the handler, which
    /// stays on the runtime thread.
    pub(crate) fn split(self) -> (ShellOptions, Field<SelectHandler>) {
        (
            ShellOptions {
                hidden: self.hidden,
                icon: self.icon,
                tooltip: self.tooltip,
                notification: self.notification,
            },
            self.on_select,
        )
    }
}

/// The `Send` subset of [`IconOptions`] consumed by the gateway.
#[derive(Debug, Clone, Default)]
pub(crate) struct ShellOptions {
    pub(crate) hidden: Option<bool>,
    pub(crate) icon: Field<Arc<IconImage>>,
    pub(crate) tooltip: Field<String>,
    pub(crate) notification: Field<NotificationOptions>,
}
