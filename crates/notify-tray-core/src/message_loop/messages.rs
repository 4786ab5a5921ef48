//! Private window messages and tray notification decoding.

use crate::{
    IconId,
    platform::{TrayEventKind, consts::WM_USER},
};

/// Ask the loop to post the native quit message.
pub(crate) const WM_TRAY_QUIT: u32 = WM_USER;
/// Run a cross-thread call; `wparam` says whether it was posted.
pub(crate) const WM_TRAY_CALL: u32 = WM_USER + 1;
/// Shell callback message for every icon.
pub(crate) const WM_TRAY_NOTIFY_ICON: u32 = WM_USER + 2;
/// Wake a loop waiting for the runtime to finish a delivery.
pub(crate) const WM_TRAY_DELIVERED: u32 = WM_USER + 3;

/// `wparam` of a call sent with `SendMessageW`; the sender owns the payload.
pub(crate) const CALL_SENT: usize = 0;
/// `wparam` of a call posted with `PostMessageW`; the receiver frees it.
pub(crate) const CALL_POSTED: usize = 1;

fn low_word(value: usize) -> u16 {
    (value & 0xFFFF) as u16
}

fn high_word(value: usize) -> u16 {
    ((value >> 16) & 0xFFFF) as u16
}

/// A version-4 shell callback, decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TrayNotification {
    pub(crate) kind: TrayEventKind,
    pub(crate) icon: IconId,
    pub(crate) x: i32,
    pub(crate) y: i32,
}

impl TrayNotification {
    /// Decode `lparam` = (event, icon id) and `wparam` = signed (x, y).
    ///
    /// Unrecognized events and invalid ids yield `None`.
    pub(crate) fn decode(wparam: usize, lparam: isize) -> Option<Self> {
        let kind = TrayEventKind::from_code(low_word(lparam as usize))?;
        let icon = IconId::new(high_word(lparam as usize)).ok()?;
        Some(Self {
            kind,
            icon,
            x: i32::from(low_word(wparam) as i16),
            y: i32::from(high_word(wparam) as i16),
        })
    }

    pub(crate) fn right_button(&self) -> bool {
        self.kind == TrayEventKind::ContextMenu
    }
}
