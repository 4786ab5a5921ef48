//! Win32 constants shared by the codec, the gateway and the platforms.

#![allow(missing_docs)]

pub const WM_USER: u32 = 0x0400;
pub const WM_CONTEXTMENU: u32 = 0x007B;

pub const NIN_SELECT: u32 = WM_USER;
pub const NIN_KEYSELECT: u32 = WM_USER + 1;

pub const NIF_MESSAGE: u32 = 0x0001;
pub const NIF_ICON: u32 = 0x0002;
pub const NIF_TIP: u32 = 0x0004;
pub const NIF_STATE: u32 = 0x0008;
pub const NIF_INFO: u32 = 0x0010;
pub const NIF_GUID: u32 = 0x0020;
pub const NIF_REALTIME: u32 = 0x0040;
pub const NIF_SHOWTIP: u32 = 0x0080;

pub const NIS_HIDDEN: u32 = 0x0001;

pub const NIIF_USER: u32 = 0x0004;
pub const NIIF_NOSOUND: u32 = 0x0010;
pub const NIIF_LARGE_ICON: u32 = 0x0020;
pub const NIIF_RESPECT_QUIET_TIME: u32 = 0x0080;

pub const NOTIFYICON_VERSION_4: u32 = 4;

pub const TIP_CAPACITY: usize = 128;
pub const INFO_CAPACITY: usize = 256;
pub const INFO_TITLE_CAPACITY: usize = 64;

pub const MFT_STRING: u32 = 0x0000;
pub const MFT_SEPARATOR: u32 = 0x0800;
pub const MFS_DISABLED: u32 = 0x0003;
pub const MFS_CHECKED: u32 = 0x0008;

/// Last item of a `MENUEX` item list.
pub const MF_END: u16 = 0x0080;
/// `MENUEX` item followed by a submenu (no SDK name).
pub const MF_POPUP_EX: u16 = 0x0001;

pub const MIIM_STATE: u32 = 0x0001;
pub const MIIM_ID: u32 = 0x0002;
pub const MIIM_SUBMENU: u32 = 0x0004;
pub const MIIM_STRING: u32 = 0x0040;
pub const MIIM_FTYPE: u32 = 0x0100;

pub const ERROR_INVALID_PARAMETER: u32 = 87;
pub const ERROR_INVALID_WINDOW_HANDLE: u32 = 1400;
pub const ERROR_INVALID_MENU_HANDLE: u32 = 1401;
pub const ERROR_INVALID_ICON_HANDLE: u32 = 1402;
pub const ERROR_MENU_ITEM_NOT_FOUND: u32 = 1456;
pub const ERROR_INVALID_DATA: u32 = 13;
/// `E_FAIL`, what the shell reports for duplicate or missing icons.
pub const E_FAIL: u32 = 0x8000_4005;
