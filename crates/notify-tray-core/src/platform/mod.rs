//! Operating-system boundary.
//!
//! Every native call made by the crate goes through [`Platform`]. Methods
//! mirror one system call each and report failures as [`SysCallError`], so
//! the failing call's name survives all the way to the caller.

pub mod consts;
mod headless;
#[cfg(windows)]
mod win32;

pub use headless::{HeadlessPlatform, PopupRecord, ShellCall, ShellIconState};
#[cfg(windows)]
pub use win32::Win32Platform;

use crate::Guid;

use std::{rc::Rc, sync::Arc};

use serde::{Deserialize, Serialize};

/// A failed native call: its name and the platform error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysCallError {
    /// Name of the native call, e.g. `"Shell_NotifyIconW"`.
    pub syscall: &'static str,
    /// Platform error code (`GetLastError` on Windows).
    pub code: u32,
}

impl SysCallError {
    /// Pair a call name with an error code.
    pub const fn new(syscall: &'static str, code: u32) -> Self {
        Self { syscall, code }
    }
}

/// Result of a single native call.
pub type SysResult<T> = Result<T, SysCallError>;

/// Native window handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowRef(pub isize);

/// Native menu handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MenuRef(pub isize);

/// Native icon handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct IconRef(pub isize);

/// A window message as retrieved from a thread's queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMessage {
    /// Target window.
    pub window: WindowRef,
    /// Message number.
    pub message: u32,
    /// First message parameter.
    pub wparam: usize,
    /// Second message parameter.
    pub lparam: isize,
}

/// Receives messages dispatched to a message-only window.
///
/// Implementations run on the thread that created the window, possibly
/// re-entrantly (a handler that pumps messages can be called again).
pub trait WindowProcedure {
    /// Handle a message; `None` falls through to the default procedure.
    fn handle_message(&self, message: u32, wparam: usize, lparam: isize) -> Option<isize>;
}

/// Shell notify-icon operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotifyIconOp {
    /// `NIM_ADD`
    Add,
    /// `NIM_MODIFY`
    Modify,
    /// `NIM_DELETE`
    Delete,
    /// `NIM_SETVERSION`
    SetVersion,
}

/// Platform-neutral `NOTIFYICONDATAW`.
///
/// Only fields selected by `flags` are read by the shell, apart from the
/// identity (`window` + `id`, or `guid` when `NIF_GUID` is set).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NotifyIconData {
    /// Window receiving callback messages.
    pub window: Option<WindowRef>,
    /// Application-defined icon id.
    pub id: u32,
    /// Persistent identity, used when `NIF_GUID` is set.
    pub guid: Option<Guid>,
    /// `NIF_*` bits.
    pub flags: u32,
    /// Message posted to `window` on interaction (`NIF_MESSAGE`).
    pub callback_message: u32,
    /// Icon image (`NIF_ICON`); `None` clears it.
    pub icon: Option<IconRef>,
    /// Tooltip (`NIF_TIP`), at most 127 UTF-16 units.
    pub tip: String,
    /// `NIS_*` state bits (`NIF_STATE`).
    pub state: u32,
    /// Which `state` bits are meaningful.
    pub state_mask: u32,
    /// Balloon body (`NIF_INFO`), at most 255 UTF-16 units.
    pub info: String,
    /// Balloon title, at most 63 UTF-16 units.
    pub info_title: String,
    /// `NIIF_*` bits.
    pub info_flags: u32,
    /// Balloon icon, used with `NIIF_USER`.
    pub balloon_icon: Option<IconRef>,
    /// Protocol version for `NIM_SETVERSION`.
    pub version: u32,
}

/// Addresses one menu item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemLocator {
    /// Zero-based position in the menu itself.
    Position(u32),
    /// Command id, searched through submenus as well.
    Command(u32),
}

/// Platform-neutral `MENUITEMINFOW`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MenuItemInfo {
    /// `MIIM_*` bits selecting the fields to read or write.
    pub mask: u32,
    /// `MFT_*` type bits.
    pub kind: u32,
    /// `MFS_*` state bits.
    pub state: u32,
    /// Command id.
    pub id: u32,
    /// Attached submenu.
    pub submenu: Option<MenuRef>,
    /// Text buffer. For reads its length is the buffer capacity including
    /// the terminator; `None` asks only for the length.
    pub text: Option<Vec<u16>>,
    /// Text length in UTF-16 units, excluding the terminator.
    pub text_len: u32,
}

/// Built-in shell icons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SystemIcon {
    /// Generic application icon.
    Application,
    /// Information icon.
    Information,
    /// Warning icon.
    Warning,
    /// Error icon.
    Error,
}

/// System icon metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IconSize {
    /// `SM_CXSMICON` x `SM_CYSMICON`.
    Small,
    /// `SM_CXICON` x `SM_CYICON`.
    Large,
}

/// Interaction reported by the shell for a version-4 notify icon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TrayEventKind {
    /// Left click (`NIN_SELECT`).
    Select,
    /// Keyboard selection (`NIN_KEYSELECT`).
    KeySelect,
    /// Right click or context-menu key (`WM_CONTEXTMENU`).
    ContextMenu,
}

impl TrayEventKind {
    /// Event code carried in the low word of `lparam`.
    pub const fn code(self) -> u16 {
        match self {
            TrayEventKind::Select => consts::NIN_SELECT as u16,
            TrayEventKind::KeySelect => consts::NIN_KEYSELECT as u16,
            TrayEventKind::ContextMenu => consts::WM_CONTEXTMENU as u16,
        }
    }

    /// Inverse of [`TrayEventKind::code`].
    pub const fn from_code(code: u16) -> Option<Self> {
        match code as u32 {
            consts::NIN_SELECT => Some(TrayEventKind::Select),
            consts::NIN_KEYSELECT => Some(TrayEventKind::KeySelect),
            consts::WM_CONTEXTMENU => Some(TrayEventKind::ContextMenu),
            _ => None,
        }
    }
}

/// Native calls used by the tray registry.
///
/// Window and menu methods must be called on the thread that owns the
/// window (the message-loop thread); `post_message` and `send_message` may
/// be called from any thread.
pub trait Platform: Send + Sync + 'static {
    /// Reset the calling thread's last-error value.
    fn clear_last_error(&self);

    /// Register the message window class; later calls are no-ops.
    fn register_window_class(&self) -> SysResult<()>;

    /// Create a message-only window on the calling thread.
    fn create_message_window(
        &self,
        title: &str,
        procedure: Rc<dyn WindowProcedure>,
    ) -> SysResult<WindowRef>;

    /// Destroy a window created by [`Platform::create_message_window`].
    fn destroy_window(&self, window: WindowRef) -> SysResult<()>;

    /// Queue a message for the window's thread and return immediately.
    fn post_message(
        &self,
        window: WindowRef,
        message: u32,
        wparam: usize,
        lparam: isize,
    ) -> SysResult<()>;

    /// Deliver a message to the window procedure and wait for its result.
    fn send_message(&self, window: WindowRef, message: u32, wparam: usize, lparam: isize)
    -> isize;

    /// Block until a posted message matching the filter arrives, running
    /// sent messages meanwhile. `Ok(None)` means a quit was requested.
    fn get_message(
        &self,
        window: Option<WindowRef>,
        filter: Option<(u32, u32)>,
    ) -> SysResult<Option<RawMessage>>;

    /// Remove one posted message for `window` without blocking.
    fn peek_message(&self, window: WindowRef) -> Option<RawMessage>;

    /// Run the window procedure for a retrieved message.
    fn dispatch_message(&self, message: &RawMessage);

    /// Ask the calling thread's message loop to end.
    fn post_quit_message(&self, code: i32);

    /// Bring `window` to the foreground so popup menus dismiss correctly.
    fn set_foreground_window(&self, window: WindowRef) -> bool;

    /// `Shell_NotifyIconW`.
    fn shell_notify_icon(&self, op: NotifyIconOp, data: &NotifyIconData) -> SysResult<()>;

    /// Load a `MENUEX` template.
    fn load_menu_indirect(&self, template: &[u8]) -> SysResult<MenuRef>;

    /// Submenu attached at `position`.
    fn get_sub_menu(&self, menu: MenuRef, position: u32) -> SysResult<MenuRef>;

    /// Detach the item at `position` without destroying its submenu.
    fn remove_menu(&self, menu: MenuRef, position: u32) -> SysResult<()>;

    /// Destroy a menu and its submenus.
    fn destroy_menu(&self, menu: MenuRef) -> SysResult<()>;

    /// Read the fields selected by `info.mask`.
    fn get_menu_item_info(
        &self,
        menu: MenuRef,
        item: ItemLocator,
        info: &mut MenuItemInfo,
    ) -> SysResult<()>;

    /// Write the fields selected by `info.mask`.
    fn set_menu_item_info(
        &self,
        menu: MenuRef,
        item: ItemLocator,
        info: &MenuItemInfo,
    ) -> SysResult<()>;

    /// Show a popup menu and return the chosen command id, 0 if dismissed.
    fn track_popup_menu(&self, menu: MenuRef, x: i32, y: i32, owner: WindowRef) -> u32;

    /// Load a shared built-in icon.
    fn load_system_icon(&self, icon: SystemIcon, size: IconSize) -> SysResult<IconRef>;

    /// Pixel size for a system icon metric.
    fn icon_dimensions(&self, size: IconSize) -> (u32, u32);

    /// Release an owned icon handle.
    fn destroy_icon(&self, icon: IconRef) -> SysResult<()>;
}

/// The platform for the current target: Win32 on Windows, headless elsewhere.
pub fn default_platform() -> Arc<dyn Platform> {
    #[cfg(windows)]
    {
        Arc::new(Win32Platform::new())
    }
    #[cfg(not(windows))]
    {
        Arc::new(HeadlessPlatform::new())
    }
}
