//! Win32 implementation of [`Platform`].

use crate::platform::{
    IconRef, IconSize, ItemLocator, MenuItemInfo, MenuRef, NotifyIconData, NotifyIconOp, Platform,
    RawMessage, SysCallError, SysResult, SystemIcon, WindowProcedure, WindowRef,
    consts::{INFO_CAPACITY, INFO_TITLE_CAPACITY, TIP_CAPACITY},
};

use std::{ffi::c_void, rc::Rc};

use once_cell::sync::OnceCell;
use tracing::{debug, warn};
use windows::{
    Win32::{
        Foundation::{
            BOOL, ERROR_CLASS_ALREADY_EXISTS, GetLastError, HANDLE, HINSTANCE, HWND, LPARAM,
            LRESULT, SetLastError, WIN32_ERROR, WPARAM,
        },
        System::LibraryLoader::GetModuleHandleW,
        UI::{
            HiDpi::{DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2, SetThreadDpiAwarenessContext},
            Shell::{
                NIM_ADD, NIM_DELETE, NIM_MODIFY, NIM_SETVERSION, NOTIFY_ICON_DATA_FLAGS,
                NOTIFY_ICON_INFOTIP_FLAGS, NOTIFY_ICON_MESSAGE, NOTIFY_ICON_STATE, NOTIFYICONDATAW,
                NOTIFYICONDATAW_0, Shell_NotifyIconW,
            },
            WindowsAndMessaging::{
                CreateWindowExW, DefWindowProcW, DestroyIcon, DestroyMenu, DestroyWindow,
                DispatchMessageW, GWLP_USERDATA, GetMenuItemInfoW, GetMessageW, GetSubMenu,
                GetSystemMetrics, GetWindowLongPtrW, HICON, HMENU, HWND_MESSAGE, IDI_APPLICATION,
                IDI_ERROR, IDI_INFORMATION, IDI_WARNING, IMAGE_ICON, LR_SHARED, LoadImageW,
                LoadMenuIndirectW, MENU_ITEM_MASK, MENU_ITEM_STATE,
                MENU_ITEM_TYPE, MENUITEMINFOW, MF_BYPOSITION, MSG, PM_REMOVE, PeekMessageW,
                PostMessageW, PostQuitMessage, RegisterClassW, RemoveMenu, SM_CXICON, SM_CXSMICON,
                SM_CYICON, SM_CYSMICON, SM_MENUDROPALIGNMENT, SendMessageW, SetForegroundWindow,
                SetMenuItemInfoW, SetWindowLongPtrW, TPM_LEFTALIGN, TPM_NONOTIFY, TPM_RETURNCMD,
                TPM_RIGHTALIGN, TrackPopupMenuEx, WINDOW_EX_STYLE, WINDOW_STYLE, WM_NCDESTROY,
                WNDCLASSW,
            },
        },
    },
    core::{GUID, HSTRING, PCWSTR, PWSTR, w},
};

const CLASS_NAME: PCWSTR = w!("Tray Message Window");

static CLASS_ATOM: OnceCell<u16> = OnceCell::new();

type ProcedureBox = Box<Rc<dyn WindowProcedure>>;

fn last_error(syscall: &'static str) -> SysCallError {
    // SAFETY: reads thread-local state only.
    let code = unsafe { GetLastError() };
    SysCallError::new(syscall, code.0)
}

fn hwnd(window: WindowRef) -> HWND {
    HWND(window.0 as *mut c_void)
}

fn hmenu(menu: MenuRef) -> HMENU {
    HMENU(menu.0 as *mut c_void)
}

fn hicon(icon: Option<IconRef>) -> HICON {
    icon.map(|icon| HICON(icon.0 as *mut c_void))
        .unwrap_or_default()
}

fn copy_wide<const N: usize>(target: &mut [u16; N], text: &str) {
    for (slot, unit) in target.iter_mut().take(N - 1).zip(text.encode_utf16()) {
        *slot = unit;
    }
}

unsafe extern "system" fn window_proc(
    hwnd: HWND,
    msg: u32,
    wparam: WPARAM,
    lparam: LPARAM,
) -> LRESULT {
    // SAFETY: GWLP_USERDATA holds either 0 or a ProcedureBox installed by
    // create_message_window and released here on WM_NCDESTROY.
    unsafe {
        let ptr = GetWindowLongPtrW(hwnd, GWLP_USERDATA) as *mut Rc<dyn WindowProcedure>;

        if msg == WM_NCDESTROY {
            if !ptr.is_null() {
                SetWindowLongPtrW(hwnd, GWLP_USERDATA, 0);
                drop(Box::from_raw(ptr));
            }
            return DefWindowProcW(hwnd, msg, wparam, lparam);
        }

        if !ptr.is_null() {
            let procedure = Rc::clone(&*ptr);
            if let Some(result) = procedure.handle_message(msg, wparam.0, lparam.0) {
                return LRESULT(result);
            }
        }

        DefWindowProcW(hwnd, msg, wparam, lparam)
    }
}

/// Native platform backed by the `windows` crate.
#[derive(Debug, Default)]
pub struct Win32Platform;

impl Win32Platform {
    /// The native platform.
    pub fn new() -> Self {
        Self
    }
}

impl Platform for Win32Platform {
    fn clear_last_error(&self) {
        // SAFETY: writes thread-local state only.
        unsafe { SetLastError(WIN32_ERROR(0)) };
    }

    fn register_window_class(&self) -> SysResult<()> {
        CLASS_ATOM
            .get_or_try_init(|| {
                // SAFETY: the class struct outlives the call and names a
                // static string and a valid window procedure.
                unsafe {
                    let instance = GetModuleHandleW(None)
                        .map_err(|_| last_error("GetModuleHandleW"))?;
                    let class = WNDCLASSW {
                        lpfnWndProc: Some(window_proc),
                        hInstance: instance.into(),
                        lpszClassName: CLASS_NAME,
                        ..Default::default()
                    };
                    match RegisterClassW(&class) {
                        0 => {
                            let error = last_error("RegisterClassW");
                            if error.code == ERROR_CLASS_ALREADY_EXISTS.0 {
                                Ok(0)
                            } else {
                                Err(error)
                            }
                        }
                        atom => Ok(atom),
                    }
                }
            })
            .map(|_| ())
    }

    fn create_message_window(
        &self,
        title: &str,
        procedure: Rc<dyn WindowProcedure>,
    ) -> SysResult<WindowRef> {
        let title = HSTRING::from(title);

        // SAFETY: the class is registered, strings outlive the call, and the
        // procedure box is owned by the window from SetWindowLongPtrW on.
        unsafe {
            let instance =
                GetModuleHandleW(None).map_err(|_| last_error("GetModuleHandleW"))?;

            // Click coordinates must be physical pixels on every monitor.
            let previous = SetThreadDpiAwarenessContext(DPI_AWARENESS_CONTEXT_PER_MONITOR_AWARE_V2);
            let created = CreateWindowExW(
                WINDOW_EX_STYLE(0),
                CLASS_NAME,
                &title,
                WINDOW_STYLE(0),
                0,
                0,
                0,
                0,
                HWND_MESSAGE,
                HMENU::default(),
                HINSTANCE::from(instance),
                None,
            )
            .map_err(|_| last_error("CreateWindowExW"));
            if !previous.is_invalid() {
                let _ = SetThreadDpiAwarenessContext(previous);
            }

            let window = created?;
            let boxed: ProcedureBox = Box::new(procedure);
            SetWindowLongPtrW(window, GWLP_USERDATA, Box::into_raw(boxed) as isize);

            debug!(window = ?window.0, "Message window created");
            Ok(WindowRef(window.0 as isize))
        }
    }

    fn destroy_window(&self, window: WindowRef) -> SysResult<()> {
        // SAFETY: called on the owning thread.
        unsafe { DestroyWindow(hwnd(window)) }.map_err(|_| last_error("DestroyWindow"))
    }

    fn post_message(
        &self,
        window: WindowRef,
        message: u32,
        wparam: usize,
        lparam: isize,
    ) -> SysResult<()> {
        // SAFETY: posting is valid from any thread.
        unsafe { PostMessageW(hwnd(window), message, WPARAM(wparam), LPARAM(lparam)) }
            .map_err(|_| last_error("PostMessageW"))
    }

    fn send_message(
        &self,
        window: WindowRef,
        message: u32,
        wparam: usize,
        lparam: isize,
    ) -> isize {
        // SAFETY: the receiver interprets the parameters; see the dispatcher.
        unsafe { SendMessageW(hwnd(window), message, WPARAM(wparam), LPARAM(lparam)) }.0
    }

    fn get_message(
        &self,
        window: Option<WindowRef>,
        filter: Option<(u32, u32)>,
    ) -> SysResult<Option<RawMessage>> {
        let mut msg = MSG::default();
        let (low, high) = filter.unwrap_or((0, 0));
        let target = window.map(hwnd).unwrap_or_default();

        // SAFETY: msg is a valid out-parameter.
        let result = unsafe { GetMessageW(&mut msg, target, low, high) };
        match result.0 {
            -1 => Err(last_error("GetMessageW")),
            0 => Ok(None),
            _ => Ok(Some(RawMessage {
                window: WindowRef(msg.hwnd.0 as isize),
                message: msg.message,
                wparam: msg.wParam.0,
                lparam: msg.lParam.0,
            })),
        }
    }

    fn peek_message(&self, window: WindowRef) -> Option<RawMessage> {
        let mut msg = MSG::default();
        // SAFETY: msg is a valid out-parameter.
        let found = unsafe { PeekMessageW(&mut msg, hwnd(window), 0, 0, PM_REMOVE) };
        found.as_bool().then(|| RawMessage {
            window: WindowRef(msg.hwnd.0 as isize),
            message: msg.message,
            wparam: msg.wParam.0,
            lparam: msg.lParam.0,
        })
    }

    fn dispatch_message(&self, message: &RawMessage) {
        let msg = MSG {
            hwnd: hwnd(message.window),
            message: message.message,
            wParam: WPARAM(message.wparam),
            lParam: LPARAM(message.lparam),
            ..Default::default()
        };
        // SAFETY: msg was retrieved from this thread's queue.
        unsafe { DispatchMessageW(&msg) };
    }

    fn post_quit_message(&self, code: i32) {
        // SAFETY: affects the calling thread's queue only.
        unsafe { PostQuitMessage(code) };
    }

    fn set_foreground_window(&self, window: WindowRef) -> bool {
        // SAFETY: window belongs to this thread.
        unsafe { SetForegroundWindow(hwnd(window)) }.as_bool()
    }

    fn shell_notify_icon(&self, op: NotifyIconOp, data: &NotifyIconData) -> SysResult<()> {
        let mut nid = NOTIFYICONDATAW {
            cbSize: size_of::<NOTIFYICONDATAW>() as u32,
            hWnd: data.window.map(hwnd).unwrap_or_default(),
            uID: data.id,
            uFlags: NOTIFY_ICON_DATA_FLAGS(data.flags),
            uCallbackMessage: data.callback_message,
            hIcon: hicon(data.icon),
            dwState: NOTIFY_ICON_STATE(data.state),
            dwStateMask: NOTIFY_ICON_STATE(data.state_mask),
            Anonymous: NOTIFYICONDATAW_0 {
                uVersion: data.version,
            },
            dwInfoFlags: NOTIFY_ICON_INFOTIP_FLAGS(data.info_flags),
            guidItem: data
                .guid
                .map(|guid| GUID::from_u128(guid.as_u128()))
                .unwrap_or_default(),
            hBalloonIcon: hicon(data.balloon_icon),
            ..Default::default()
        };
        debug_assert_eq!(nid.szTip.len(), TIP_CAPACITY);
        debug_assert_eq!(nid.szInfo.len(), INFO_CAPACITY);
        debug_assert_eq!(nid.szInfoTitle.len(), INFO_TITLE_CAPACITY);
        copy_wide(&mut nid.szTip, &data.tip);
        copy_wide(&mut nid.szInfo, &data.info);
        copy_wide(&mut nid.szInfoTitle, &data.info_title);

        let message: NOTIFY_ICON_MESSAGE = match op {
            NotifyIconOp::Add => NIM_ADD,
            NotifyIconOp::Modify => NIM_MODIFY,
            NotifyIconOp::Delete => NIM_DELETE,
            NotifyIconOp::SetVersion => NIM_SETVERSION,
        };

        // SAFETY: nid is fully initialized and outlives the call.
        if unsafe { Shell_NotifyIconW(message, &nid) }.as_bool() {
            Ok(())
        } else {
            Err(last_error("Shell_NotifyIconW"))
        }
    }

    fn load_menu_indirect(&self, template: &[u8]) -> SysResult<MenuRef> {
        // The loader reads the template as DWORD-aligned memory.
        let mut aligned = vec![0u32; template.len().div_ceil(4)];
        for (word, chunk) in aligned.iter_mut().zip(template.chunks(4)) {
            let mut bytes = [0u8; 4];
            bytes[..chunk.len()].copy_from_slice(chunk);
            *word = u32::from_le_bytes(bytes);
        }

        // SAFETY: aligned holds a complete template and outlives the call.
        unsafe { LoadMenuIndirectW(aligned.as_ptr() as *const c_void) }
            .map(|menu| MenuRef(menu.0 as isize))
            .map_err(|_| last_error("LoadMenuIndirectW"))
    }

    fn get_sub_menu(&self, menu: MenuRef, position: u32) -> SysResult<MenuRef> {
        // SAFETY: menu is owned by this thread.
        let submenu = unsafe { GetSubMenu(hmenu(menu), position as i32) };
        if submenu.is_invalid() {
            Err(last_error("GetSubMenu"))
        } else {
            Ok(MenuRef(submenu.0 as isize))
        }
    }

    fn remove_menu(&self, menu: MenuRef, position: u32) -> SysResult<()> {
        // SAFETY: menu is owned by this thread.
        unsafe { RemoveMenu(hmenu(menu), position, MF_BYPOSITION) }
            .map_err(|_| last_error("RemoveMenu"))
    }

    fn destroy_menu(&self, menu: MenuRef) -> SysResult<()> {
        // SAFETY: menu is owned by this thread.
        unsafe { DestroyMenu(hmenu(menu)) }.map_err(|_| last_error("DestroyMenu"))
    }

    fn get_menu_item_info(
        &self,
        menu: MenuRef,
        item: ItemLocator,
        info: &mut MenuItemInfo,
    ) -> SysResult<()> {
        let (index, by_position) = locate(item);
        let mut native = MENUITEMINFOW {
            cbSize: size_of::<MENUITEMINFOW>() as u32,
            fMask: MENU_ITEM_MASK(info.mask),
            ..Default::default()
        };
        if let Some(buffer) = info.text.as_mut() {
            native.dwTypeData = PWSTR(buffer.as_mut_ptr());
            native.cch = buffer.len() as u32;
        }

        // SAFETY: native points into info.text, which outlives the call.
        unsafe { GetMenuItemInfoW(hmenu(menu), index, BOOL::from(by_position), &mut native) }
            .map_err(|_| last_error("GetMenuItemInfoW"))?;

        info.kind = native.fType.0;
        info.state = native.fState.0;
        info.id = native.wID;
        info.submenu = (!native.hSubMenu.is_invalid()).then(|| MenuRef(native.hSubMenu.0 as isize));
        info.text_len = native.cch;
        Ok(())
    }

    fn set_menu_item_info(
        &self,
        menu: MenuRef,
        item: ItemLocator,
        info: &MenuItemInfo,
    ) -> SysResult<()> {
        let (index, by_position) = locate(item);
        let mut text = info.text.clone().unwrap_or_else(|| vec![0]);
        let native = MENUITEMINFOW {
            cbSize: size_of::<MENUITEMINFOW>() as u32,
            fMask: MENU_ITEM_MASK(info.mask),
            fType: MENU_ITEM_TYPE(info.kind),
            fState: MENU_ITEM_STATE(info.state),
            wID: info.id,
            hSubMenu: info.submenu.map(hmenu).unwrap_or_default(),
            dwTypeData: PWSTR(text.as_mut_ptr()),
            cch: info.text_len,
            ..Default::default()
        };

        // SAFETY: native points into text, which outlives the call.
        unsafe { SetMenuItemInfoW(hmenu(menu), index, BOOL::from(by_position), &native) }
            .map_err(|_| last_error("SetMenuItemInfoW"))
    }

    fn track_popup_menu(&self, menu: MenuRef, x: i32, y: i32, owner: WindowRef) -> u32 {
        // SAFETY: menu and owner belong to this thread.
        unsafe {
            let align = if GetSystemMetrics(SM_MENUDROPALIGNMENT) != 0 {
                TPM_RIGHTALIGN
            } else {
                TPM_LEFTALIGN
            };
            let flags = align | TPM_RETURNCMD | TPM_NONOTIFY;
            TrackPopupMenuEx(hmenu(menu), flags.0, x, y, hwnd(owner), None).0 as u32
        }
    }

    fn load_system_icon(&self, icon: SystemIcon, size: IconSize) -> SysResult<IconRef> {
        let name = match icon {
            SystemIcon::Application => IDI_APPLICATION,
            SystemIcon::Information => IDI_INFORMATION,
            SystemIcon::Warning => IDI_WARNING,
            SystemIcon::Error => IDI_ERROR,
        };
        let (width, height) = self.icon_dimensions(size);

        // SAFETY: shared system resources need no module handle.
        let handle: HANDLE = unsafe {
            LoadImageW(
                HINSTANCE::default(),
                name,
                IMAGE_ICON,
                width as i32,
                height as i32,
                LR_SHARED,
            )
        }
        .map_err(|_| last_error("LoadImageW"))?;

        Ok(IconRef(handle.0 as isize))
    }

    fn icon_dimensions(&self, size: IconSize) -> (u32, u32) {
        let (x, y) = match size {
            IconSize::Small => (SM_CXSMICON, SM_CYSMICON),
            IconSize::Large => (SM_CXICON, SM_CYICON),
        };
        // SAFETY: metric queries have no preconditions.
        unsafe { (GetSystemMetrics(x) as u32, GetSystemMetrics(y) as u32) }
    }

    fn destroy_icon(&self, icon: IconRef) -> SysResult<()> {
        // SAFETY: only owned (non-shared) handles reach this call.
        unsafe { DestroyIcon(hicon(Some(icon))) }.map_err(|_| {
            let error = last_error("DestroyIcon");
            warn!(icon = ?icon, code = error.code, "DestroyIcon failed");
            error
        })
    }
}

fn locate(item: ItemLocator) -> (u32, bool) {
    match item {
        ItemLocator::Position(position) => (position, true),
        ItemLocator::Command(id) => (id, false),
    }
}
