//! In-process emulation of the shell, popup menus and thread message queues.
//!
//! Used on hosts without a notification area and by the test-suite. Message
//! semantics follow Win32 where the registry depends on them: posted messages
//! queue per owning thread, sent messages run on the owner thread (directly
//! when sent from it), `get_message` services sent messages while it waits,
//! and a quit request is returned regardless of the filter.

use crate::{
    Guid,
    menu::{TemplateItem, parse_template},
    platform::{
        IconRef, IconSize, ItemLocator, MenuItemInfo, MenuRef, NotifyIconData, NotifyIconOp,
        Platform, RawMessage, SysCallError, SysResult, SystemIcon, TrayEventKind, WindowProcedure,
        WindowRef,
        consts::{
            E_FAIL, ERROR_INVALID_DATA, ERROR_INVALID_ICON_HANDLE, ERROR_INVALID_MENU_HANDLE,
            ERROR_INVALID_PARAMETER, ERROR_INVALID_WINDOW_HANDLE, ERROR_MENU_ITEM_NOT_FOUND,
            MIIM_FTYPE, MIIM_ID, MIIM_STATE, MIIM_STRING, MIIM_SUBMENU, NIF_GUID, NIF_ICON,
            NIF_INFO, NIF_MESSAGE, NIF_REALTIME, NIF_SHOWTIP, NIF_STATE, NIF_TIP, NIS_HIDDEN,
        },
    },
};

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeMap, HashMap, HashSet, VecDeque},
    rc::Rc,
    sync::{
        Condvar, Mutex, MutexGuard, PoisonError,
        atomic::{AtomicIsize, AtomicUsize, Ordering},
        mpsc::{SyncSender, sync_channel},
    },
    thread::{self, ThreadId},
};

use once_cell::sync::OnceCell;
use tracing::debug;

const SMALL_ICON_PX: u32 = 16;
const LARGE_ICON_PX: u32 = 32;

static NEXT_HANDLE: AtomicIsize = AtomicIsize::new(0x1000);

thread_local! {
    static LAST_ERROR: Cell<u32> = const { Cell::new(0) };
    static PROCEDURES: RefCell<HashMap<WindowRef, Rc<dyn WindowProcedure>>> =
        RefCell::new(HashMap::new());
}

fn next_handle() -> isize {
    NEXT_HANDLE.fetch_add(4, Ordering::Relaxed)
}

fn fail<T>(syscall: &'static str, code: u32) -> SysResult<T> {
    LAST_ERROR.with(|last| last.set(code));
    Err(SysCallError::new(syscall, code))
}

/// Icon as currently shown by the emulated shell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShellIconState {
    /// Callback window.
    pub window: Option<WindowRef>,
    /// Application icon id.
    pub id: u32,
    /// Persistent identity.
    pub guid: Option<Guid>,
    /// Callback message number.
    pub callback_message: u32,
    /// Current image.
    pub icon: Option<IconRef>,
    /// Tooltip text.
    pub tooltip: String,
    /// Standard tooltip enabled.
    pub show_tip: bool,
    /// Hidden from the notification area.
    pub hidden: bool,
    /// Balloon title.
    pub info_title: String,
    /// Balloon text.
    pub info_text: String,
    /// Balloon `NIIF_*` flags.
    pub info_flags: u32,
    /// Balloon image.
    pub balloon_icon: Option<IconRef>,
    /// Balloon requested as realtime.
    pub realtime: bool,
    /// Negotiated protocol version.
    pub version: u32,
    /// Left behind by another (crashed) process.
    pub stale: bool,
}

/// One recorded `Shell_NotifyIconW` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCall {
    /// Operation requested.
    pub op: NotifyIconOp,
    /// Icon id passed.
    pub id: u32,
    /// GUID passed, when `NIF_GUID` was set.
    pub guid: Option<Guid>,
    /// `NIF_*` flags passed.
    pub flags: u32,
    /// Whether the shell accepted the call.
    pub succeeded: bool,
}

/// One popup menu shown through `track_popup_menu`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopupRecord {
    /// Menu shown.
    pub menu: MenuRef,
    /// Screen x.
    pub x: i32,
    /// Screen y.
    pub y: i32,
    /// Owner window.
    pub owner: WindowRef,
    /// Command id returned.
    pub chosen: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
enum ShellKey {
    Guid(Guid),
    Window(Option<WindowRef>, u32),
}

impl ShellKey {
    fn of(data: &NotifyIconData) -> Self {
        match data.guid {
            Some(guid) if data.flags & NIF_GUID != 0 => ShellKey::Guid(guid),
            _ => ShellKey::Window(data.window, data.id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailurePoint {
    Syscall(&'static str),
    Shell(NotifyIconOp),
}

#[derive(Debug, Clone)]
struct MenuEntry {
    kind: u32,
    state: u32,
    id: u32,
    text: Vec<u16>,
    submenu: Option<MenuRef>,
}

struct SentMessage {
    message: RawMessage,
    reply: SyncSender<isize>,
}

#[derive(Default)]
struct ThreadQueue {
    posted: VecDeque<RawMessage>,
    sent: VecDeque<SentMessage>,
    quit: Option<i32>,
}

#[derive(Default)]
struct HeadlessState {
    windows: HashMap<WindowRef, ThreadId>,
    windows_created: usize,
    queues: HashMap<ThreadId, ThreadQueue>,
    shell: BTreeMap<ShellKey, ShellIconState>,
    journal: Vec<ShellCall>,
    failures: Vec<(FailurePoint, u32)>,
    menus: HashMap<MenuRef, Vec<MenuEntry>>,
    popup_choices: VecDeque<u32>,
    popups: Vec<PopupRecord>,
    foreground_claims: usize,
    live_icons: HashSet<IconRef>,
    destroyed_icons: Vec<IconRef>,
}

impl HeadlessState {
    fn take_failure(&mut self, point: FailurePoint) -> Option<u32> {
        let index = self.failures.iter().position(|(p, _)| *p == point)?;
        Some(self.failures.remove(index).1)
    }

    fn build_menu(&mut self, items: &[TemplateItem]) -> MenuRef {
        let handle = MenuRef(next_handle());
        let entries = items
            .iter()
            .map(|item| MenuEntry {
                kind: item.kind,
                state: item.state,
                id: item.id,
                text: item.text.encode_utf16().collect(),
                submenu: item.children.as_deref().map(|children| self.build_menu(children)),
            })
            .collect();
        self.menus.insert(handle, entries);
        handle
    }

    fn destroy_menu_tree(&mut self, menu: MenuRef) -> bool {
        let Some(entries) = self.menus.remove(&menu) else {
            return false;
        };
        for submenu in entries.into_iter().filter_map(|entry| entry.submenu) {
            self.destroy_menu_tree(submenu);
        }
        true
    }

    fn find_item(&self, menu: MenuRef, locator: ItemLocator) -> Option<(MenuRef, usize)> {
        let entries = self.menus.get(&menu)?;
        match locator {
            ItemLocator::Position(position) => {
                let position = position as usize;
                (position < entries.len()).then_some((menu, position))
            }
            ItemLocator::Command(id) => entries.iter().enumerate().find_map(|(index, entry)| {
                if entry.id == id && entry.submenu.is_none() {
                    return Some((menu, index));
                }
                entry
                    .submenu
                    .and_then(|submenu| self.find_item(submenu, locator))
            }),
        }
    }
}

/// Emulated platform; see the module docs.
pub struct HeadlessPlatform {
    state: Mutex<HeadlessState>,
    wake: Condvar,
    class: OnceCell<()>,
    class_registrations: AtomicUsize,
}

impl Default for HeadlessPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl HeadlessPlatform {
    /// An empty shell with no windows, icons or menus.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HeadlessState::default()),
            wake: Condvar::new(),
            class: OnceCell::new(),
            class_registrations: AtomicUsize::new(0),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HeadlessState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn call_procedure(message: &RawMessage) -> isize {
        let procedure = PROCEDURES.with(|procedures| procedures.borrow().get(&message.window).cloned());
        procedure
            .and_then(|procedure| procedure.handle_message(message.message, message.wparam, message.lparam))
            .unwrap_or(0)
    }

    /// Make the next call to `syscall` fail with `code`.
    pub fn fail_next(&self, syscall: &'static str, code: u32) {
        self.lock().failures.push((FailurePoint::Syscall(syscall), code));
    }

    /// Make the next `Shell_NotifyIconW` call with `op` fail with `code`.
    pub fn fail_next_shell(&self, op: NotifyIconOp, code: u32) {
        self.lock().failures.push((FailurePoint::Shell(op), code));
    }

    /// Leave an icon registered under `guid` as if its process had crashed.
    pub fn inject_stale_icon(&self, guid: Guid) {
        let state = ShellIconState {
            guid: Some(guid),
            stale: true,
            ..ShellIconState::default()
        };
        self.lock().shell.insert(ShellKey::Guid(guid), state);
    }

    /// Queue the command id the next popup menu returns.
    pub fn script_popup_choice(&self, id: u32) {
        self.lock().popup_choices.push_back(id);
    }

    /// Simulate a user interaction with the live icon `id`.
    ///
    /// Returns false when no such icon is shown or its window is gone.
    pub fn post_tray_event(&self, id: u16, kind: TrayEventKind, x: i16, y: i16) -> bool {
        let target = self
            .lock()
            .shell
            .values()
            .find(|icon| !icon.stale && icon.id == u32::from(id))
            .and_then(|icon| icon.window.map(|window| (window, icon.callback_message)));

        let Some((window, message)) = target else {
            return false;
        };

        let wparam = usize::from(x as u16) | (usize::from(y as u16) << 16);
        let lparam = (kind.code() as isize) | ((id as isize) << 16);
        self.post_message(window, message, wparam, lparam).is_ok()
    }

    /// Every icon the shell currently shows, including stale ones.
    pub fn shell_icons(&self) -> Vec<ShellIconState> {
        self.lock().shell.values().cloned().collect()
    }

    /// The live (non-stale) icon with `id`, if shown.
    pub fn shell_icon(&self, id: u16) -> Option<ShellIconState> {
        self.lock()
            .shell
            .values()
            .find(|icon| !icon.stale && icon.id == u32::from(id))
            .cloned()
    }

    /// The icon registered under `guid`, if shown.
    pub fn shell_icon_by_guid(&self, guid: Guid) -> Option<ShellIconState> {
        self.lock().shell.get(&ShellKey::Guid(guid)).cloned()
    }

    /// All `Shell_NotifyIconW` calls so far, in order.
    pub fn journal(&self) -> Vec<ShellCall> {
        self.lock().journal.clone()
    }

    /// Number of message windows ever created.
    pub fn windows_created(&self) -> usize {
        self.lock().windows_created
    }

    /// Number of message windows currently alive.
    pub fn live_windows(&self) -> usize {
        self.lock().windows.len()
    }

    /// Number of times the window class was actually registered.
    pub fn class_registrations(&self) -> usize {
        self.class_registrations.load(Ordering::SeqCst)
    }

    /// Number of foreground claims made before showing menus.
    pub fn foreground_claims(&self) -> usize {
        self.lock().foreground_claims
    }

    /// Popup menus shown so far.
    pub fn popups(&self) -> Vec<PopupRecord> {
        self.lock().popups.clone()
    }

    /// Number of menu handles (including submenus) currently alive.
    pub fn live_menus(&self) -> usize {
        self.lock().menus.len()
    }

    /// Icon handles released through `destroy_icon`.
    pub fn destroyed_icons(&self) -> Vec<IconRef> {
        self.lock().destroyed_icons.clone()
    }

    /// Create an owned icon handle, as an image provider would.
    pub fn create_icon(&self) -> IconRef {
        let icon = IconRef(next_handle());
        self.lock().live_icons.insert(icon);
        icon
    }
}

impl Platform for HeadlessPlatform {
    fn clear_last_error(&self) {
        LAST_ERROR.with(|last| last.set(0));
    }

    fn register_window_class(&self) -> SysResult<()> {
        if self.class.get().is_some() {
            return Ok(());
        }
        if let Some(code) = self.lock().take_failure(FailurePoint::Syscall("RegisterClassW")) {
            return fail("RegisterClassW", code);
        }
        self.class.get_or_init(|| {
            self.class_registrations.fetch_add(1, Ordering::SeqCst);
        });
        Ok(())
    }

    fn create_message_window(
        &self,
        title: &str,
        procedure: Rc<dyn WindowProcedure>,
    ) -> SysResult<WindowRef> {
        let mut state = self.lock();
        if let Some(code) = state.take_failure(FailurePoint::Syscall("CreateWindowExW")) {
            return fail("CreateWindowExW", code);
        }

        let window = WindowRef(next_handle());
        state.windows.insert(window, thread::current().id());
        state.windows_created += 1;
        drop(state);

        PROCEDURES.with(|procedures| procedures.borrow_mut().insert(window, procedure));
        debug!(window = ?window, title, "Headless message window created");
        Ok(window)
    }

    fn destroy_window(&self, window: WindowRef) -> SysResult<()> {
        let mut state = self.lock();
        let Some(owner) = state.windows.remove(&window) else {
            return fail("DestroyWindow", ERROR_INVALID_WINDOW_HANDLE);
        };
        if let Some(queue) = state.queues.get_mut(&owner) {
            queue.posted.retain(|message| message.window != window);
            // Dropping the reply senders releases any thread blocked in send_message.
            queue.sent.retain(|sent| sent.message.window != window);
        }
        drop(state);

        let procedure = PROCEDURES.with(|procedures| procedures.borrow_mut().remove(&window));
        drop(procedure);
        Ok(())
    }

    fn post_message(
        &self,
        window: WindowRef,
        message: u32,
        wparam: usize,
        lparam: isize,
    ) -> SysResult<()> {
        let mut state = self.lock();
        if let Some(code) = state.take_failure(FailurePoint::Syscall("PostMessageW")) {
            return fail("PostMessageW", code);
        }
        let Some(&owner) = state.windows.get(&window) else {
            return fail("PostMessageW", ERROR_INVALID_WINDOW_HANDLE);
        };

        state.queues.entry(owner).or_default().posted.push_back(RawMessage {
            window,
            message,
            wparam,
            lparam,
        });
        drop(state);
        self.wake.notify_all();
        Ok(())
    }

    fn send_message(
        &self,
        window: WindowRef,
        message: u32,
        wparam: usize,
        lparam: isize,
    ) -> isize {
        let raw = RawMessage {
            window,
            message,
            wparam,
            lparam,
        };

        let mut state = self.lock();
        let Some(&owner) = state.windows.get(&window) else {
            LAST_ERROR.with(|last| last.set(ERROR_INVALID_WINDOW_HANDLE));
            return 0;
        };

        if owner == thread::current().id() {
            drop(state);
            return Self::call_procedure(&raw);
        }

        let (reply, result) = sync_channel(1);
        state
            .queues
            .entry(owner)
            .or_default()
            .sent
            .push_back(SentMessage {
                message: raw,
                reply,
            });
        drop(state);
        self.wake.notify_all();

        result.recv().unwrap_or(0)
    }

    fn get_message(
        &self,
        window: Option<WindowRef>,
        filter: Option<(u32, u32)>,
    ) -> SysResult<Option<RawMessage>> {
        let thread = thread::current().id();
        let matches = |message: &RawMessage| {
            window.is_none_or(|window| window == message.window)
                && filter.is_none_or(|(low, high)| (low..=high).contains(&message.message))
        };

        let mut state = self.lock();
        loop {
            let queue = state.queues.entry(thread).or_default();

            if let Some(sent) = queue.sent.pop_front() {
                drop(state);
                let result = Self::call_procedure(&sent.message);
                let _ = sent.reply.send(result);
                state = self.lock();
                continue;
            }

            if let Some(index) = queue.posted.iter().position(&matches) {
                return Ok(queue.posted.remove(index));
            }

            if queue.quit.take().is_some() {
                return Ok(None);
            }

            state = self.wake.wait(state).unwrap_or_else(PoisonError::into_inner);
        }
    }

    fn peek_message(&self, window: WindowRef) -> Option<RawMessage> {
        let mut state = self.lock();
        let queue = state.queues.get_mut(&thread::current().id())?;
        let index = queue.posted.iter().position(|message| message.window == window)?;
        queue.posted.remove(index)
    }

    fn dispatch_message(&self, message: &RawMessage) {
        Self::call_procedure(message);
    }

    fn post_quit_message(&self, code: i32) {
        self.lock()
            .queues
            .entry(thread::current().id())
            .or_default()
            .quit = Some(code);
    }

    fn set_foreground_window(&self, _window: WindowRef) -> bool {
        self.lock().foreground_claims += 1;
        true
    }

    fn shell_notify_icon(&self, op: NotifyIconOp, data: &NotifyIconData) -> SysResult<()> {
        let mut state = self.lock();
        let key = ShellKey::of(data);

        let outcome = match state.take_failure(FailurePoint::Shell(op)) {
            Some(code) => Err(code),
            None => match op {
                NotifyIconOp::Add if state.shell.contains_key(&key) => Err(E_FAIL),
                NotifyIconOp::Add => {
                    let mut icon = ShellIconState {
                        window: data.window,
                        id: data.id,
                        guid: data.guid.filter(|_| data.flags & NIF_GUID != 0),
                        ..ShellIconState::default()
                    };
                    apply(&mut icon, data);
                    state.shell.insert(key, icon);
                    Ok(())
                }
                NotifyIconOp::Modify => match state.shell.get_mut(&key) {
                    Some(icon) => {
                        apply(icon, data);
                        Ok(())
                    }
                    None => Err(E_FAIL),
                },
                NotifyIconOp::Delete => match state.shell.remove(&key) {
                    Some(_) => Ok(()),
                    None => Err(E_FAIL),
                },
                NotifyIconOp::SetVersion => match state.shell.get_mut(&key) {
                    Some(icon) => {
                        icon.version = data.version;
                        Ok(())
                    }
                    None => Err(E_FAIL),
                },
            },
        };

        state.journal.push(ShellCall {
            op,
            id: data.id,
            guid: data.guid.filter(|_| data.flags & NIF_GUID != 0),
            flags: data.flags,
            succeeded: outcome.is_ok(),
        });
        drop(state);

        outcome.or_else(|code| fail("Shell_NotifyIconW", code))
    }

    fn load_menu_indirect(&self, template: &[u8]) -> SysResult<MenuRef> {
        let mut state = self.lock();
        if let Some(code) = state.take_failure(FailurePoint::Syscall("LoadMenuIndirectW")) {
            return fail("LoadMenuIndirectW", code);
        }
        match parse_template(template) {
            Ok(items) => Ok(state.build_menu(&items)),
            Err(_) => fail("LoadMenuIndirectW", ERROR_INVALID_DATA),
        }
    }

    fn get_sub_menu(&self, menu: MenuRef, position: u32) -> SysResult<MenuRef> {
        let state = self.lock();
        let submenu = state
            .menus
            .get(&menu)
            .and_then(|entries| entries.get(position as usize))
            .and_then(|entry| entry.submenu);
        match submenu {
            Some(submenu) => Ok(submenu),
            None => fail("GetSubMenu", ERROR_INVALID_PARAMETER),
        }
    }

    fn remove_menu(&self, menu: MenuRef, position: u32) -> SysResult<()> {
        let mut state = self.lock();
        if let Some(code) = state.take_failure(FailurePoint::Syscall("RemoveMenu")) {
            return fail("RemoveMenu", code);
        }
        match state.menus.get_mut(&menu) {
            Some(entries) if (position as usize) < entries.len() => {
                entries.remove(position as usize);
                Ok(())
            }
            Some(_) => fail("RemoveMenu", ERROR_MENU_ITEM_NOT_FOUND),
            None => fail("RemoveMenu", ERROR_INVALID_MENU_HANDLE),
        }
    }

    fn destroy_menu(&self, menu: MenuRef) -> SysResult<()> {
        if self.lock().destroy_menu_tree(menu) {
            Ok(())
        } else {
            fail("DestroyMenu", ERROR_INVALID_MENU_HANDLE)
        }
    }

    fn get_menu_item_info(
        &self,
        menu: MenuRef,
        item: ItemLocator,
        info: &mut MenuItemInfo,
    ) -> SysResult<()> {
        let state = self.lock();
        let Some((owner, index)) = state.find_item(menu, item) else {
            return fail("GetMenuItemInfoW", ERROR_MENU_ITEM_NOT_FOUND);
        };
        let Some(entry) = state.menus.get(&owner).and_then(|entries| entries.get(index)) else {
            return fail("GetMenuItemInfoW", ERROR_MENU_ITEM_NOT_FOUND);
        };

        if info.mask & MIIM_ID != 0 {
            info.id = entry.id;
        }
        if info.mask & MIIM_FTYPE != 0 {
            info.kind = entry.kind;
        }
        if info.mask & MIIM_STATE != 0 {
            info.state = entry.state;
        }
        if info.mask & MIIM_SUBMENU != 0 {
            info.submenu = entry.submenu;
        }
        if info.mask & MIIM_STRING != 0 {
            match info.text.as_mut() {
                None => info.text_len = entry.text.len() as u32,
                Some(buffer) if buffer.is_empty() => info.text_len = entry.text.len() as u32,
                Some(buffer) => {
                    let copied = entry.text.len().min(buffer.len() - 1);
                    buffer[..copied].copy_from_slice(&entry.text[..copied]);
                    buffer[copied] = 0;
                    info.text_len = copied as u32;
                }
            }
        }
        Ok(())
    }

    fn set_menu_item_info(
        &self,
        menu: MenuRef,
        item: ItemLocator,
        info: &MenuItemInfo,
    ) -> SysResult<()> {
        let mut state = self.lock();
        let Some((owner, index)) = state.find_item(menu, item) else {
            return fail("SetMenuItemInfoW", ERROR_MENU_ITEM_NOT_FOUND);
        };
        let Some(entry) = state
            .menus
            .get_mut(&owner)
            .and_then(|entries| entries.get_mut(index))
        else {
            return fail("SetMenuItemInfoW", ERROR_MENU_ITEM_NOT_FOUND);
        };

        if info.mask & MIIM_ID != 0 {
            entry.id = info.id;
        }
        if info.mask & MIIM_FTYPE != 0 {
            entry.kind = info.kind;
        }
        if info.mask & MIIM_STATE != 0 {
            entry.state = info.state;
        }
        if info.mask & MIIM_SUBMENU != 0 {
            entry.submenu = info.submenu;
        }
        if info.mask & MIIM_STRING != 0 {
            let text = info.text.as_deref().unwrap_or_default();
            entry.text = text.iter().copied().take_while(|&unit| unit != 0).collect();
        }
        Ok(())
    }

    fn track_popup_menu(&self, menu: MenuRef, x: i32, y: i32, owner: WindowRef) -> u32 {
        let mut state = self.lock();
        let chosen = state.popup_choices.pop_front().unwrap_or(0);
        state.popups.push(PopupRecord {
            menu,
            x,
            y,
            owner,
            chosen,
        });
        chosen
    }

    fn load_system_icon(&self, icon: SystemIcon, size: IconSize) -> SysResult<IconRef> {
        let mut state = self.lock();
        if let Some(code) = state.take_failure(FailurePoint::Syscall("LoadImageW")) {
            return fail("LoadImageW", code);
        }
        let handle = IconRef(next_handle());
        debug!(icon = ?icon, size = ?size, handle = ?handle, "Headless system icon loaded");
        Ok(handle)
    }

    fn icon_dimensions(&self, size: IconSize) -> (u32, u32) {
        match size {
            IconSize::Small => (SMALL_ICON_PX, SMALL_ICON_PX),
            IconSize::Large => (LARGE_ICON_PX, LARGE_ICON_PX),
        }
    }

    fn destroy_icon(&self, icon: IconRef) -> SysResult<()> {
        let mut state = self.lock();
        if !state.live_icons.remove(&icon) {
            return fail("DestroyIcon", ERROR_INVALID_ICON_HANDLE);
        }
        state.destroyed_icons.push(icon);
        Ok(())
    }
}

fn apply(icon: &mut ShellIconState, data: &NotifyIconData) {
    if data.flags & NIF_MESSAGE != 0 {
        icon.callback_message = data.callback_message;
    }
    if data.flags & NIF_ICON != 0 {
        icon.icon = data.icon;
    }
    if data.flags & NIF_TIP != 0 {
        icon.tooltip = data.tip.clone();
    }
    if data.flags & NIF_SHOWTIP != 0 {
        icon.show_tip = true;
    }
    if data.flags & NIF_STATE != 0 && data.state_mask & NIS_HIDDEN != 0 {
        icon.hidden = data.state & NIS_HIDDEN != 0;
    }
    if data.flags & NIF_INFO != 0 {
        icon.info_title = data.info_title.clone();
        icon.info_text = data.info.clone();
        icon.info_flags = data.info_flags;
        icon.balloon_icon = data.balloon_icon;
        icon.realtime = data.flags & NIF_REALTIME != 0;
    }
}
