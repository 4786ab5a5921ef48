//! State owned by the message-loop thread and its window procedure.

use crate::{
    CallbackRef, CoreResult, Guid, IconId, SelectEvent, TrayError,
    icon::{Field, IconHandleTable, IconRecord, NotifyIconGateway, ShellOptions},
    menu::{MenuItemDescriptor, MenuItemPatch, popup},
    message_loop::{
        dispatcher,
        messages::{
            TrayNotification, WM_TRAY_CALL, WM_TRAY_DELIVERED, WM_TRAY_NOTIFY_ICON, WM_TRAY_QUIT,
        },
    },
    platform::{ItemLocator, MenuRef, Platform, WindowProcedure, WindowRef},
    runtime::{DeliveryOutcome, RuntimeHandle},
};

use std::{
    cell::{Cell, RefCell},
    collections::{HashSet, VecDeque},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use tracing::{debug, info, warn};

/// State shared between the loop thread and the thread that owns the loop.
pub(crate) struct LoopShared {
    closing: AtomicBool,
    pub(crate) runtime: RuntimeHandle,
}

impl LoopShared {
    pub(crate) fn new(runtime: RuntimeHandle) -> Self {
        Self {
            closing: AtomicBool::new(false),
            runtime,
        }
    }

    pub(crate) fn is_closing(&self) -> bool {
        self.closing.load(Ordering::Acquire)
    }

    pub(crate) fn mark_closing(&self) {
        self.closing.store(true, Ordering::Release);
    }
}

/// Everything the loop thread owns: the window, the shell icons, the icon
/// table and the live menus.
pub(crate) struct LoopContext {
    pub(crate) platform: Arc<dyn Platform>,
    window: Cell<Option<WindowRef>>,
    gateway: RefCell<NotifyIconGateway>,
    table: RefCell<IconHandleTable>,
    menus: RefCell<HashSet<MenuRef>>,
    pub(crate) shared: Arc<LoopShared>,
    busy: Cell<u32>,
    deferred: RefCell<VecDeque<TrayNotification>>,
}

/// Result of [`LoopContext::add_icon`].
pub(crate) struct AddOutcome {
    pub(crate) id: IconId,
    /// Whether the icon is now in the table, even if `result` is an error.
    pub(crate) tracked: bool,
    pub(crate) result: CoreResult<()>,
}

impl AddOutcome {
    fn rejected(id: IconId, error: TrayError) -> Self {
        Self {
            id,
            tracked: false,
            result: Err(error),
        }
    }
}

/// Marks the loop as inside a call or delivery; notifications are deferred
/// until the outermost section ends.
pub(crate) struct BusyGuard<'a> {
    context: &'a LoopContext,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.context.busy.set(self.context.busy.get() - 1);
    }
}

impl LoopContext {
    pub(crate) fn new(platform: Arc<dyn Platform>, shared: Arc<LoopShared>) -> Self {
        Self {
            gateway: RefCell::new(NotifyIconGateway::new(
                Arc::clone(&platform),
                WM_TRAY_NOTIFY_ICON,
            )),
            platform,
            window: Cell::new(None),
            table: RefCell::new(IconHandleTable::new()),
            menus: RefCell::new(HashSet::new()),
            shared,
            busy: Cell::new(0),
            deferred: RefCell::new(VecDeque::new()),
        }
    }

    pub(crate) fn bind(&self, window: WindowRef) {
        self.window.set(Some(window));
        self.gateway.borrow_mut().bind(window);
    }

    pub(crate) fn window(&self) -> Option<WindowRef> {
        self.window.get()
    }

    pub(crate) fn enter(&self) -> BusyGuard<'_> {
        self.busy.set(self.busy.get() + 1);
        BusyGuard { context: self }
    }

    fn is_busy(&self) -> bool {
        self.busy.get() > 0
    }

    /// Add an icon under `id`, or under the first free id at or after
    /// `first_free` when none is given.
    pub(crate) fn add_icon(
        &self,
        id: Option<IconId>,
        first_free: IconId,
        guid: Option<Guid>,
        replace: bool,
        options: ShellOptions,
        callback: Option<CallbackRef>,
    ) -> AddOutcome {
        let id = match id {
            Some(id) => id,
            None => match self.table.borrow().next_free_id(first_free) {
                Some(id) => id,
                None => {
                    return AddOutcome::rejected(
                        first_free,
                        TrayError::validation("no free icon id is left"),
                    );
                }
            },
        };

        if self.table.borrow().contains(id) {
            return AddOutcome::rejected(
                id,
                TrayError::validation(format!("icon id {} is already registered", id)),
            );
        }

        let result = self
            .gateway
            .borrow_mut()
            .add(id, guid, replace, &options);

        // A failed version upgrade leaves the icon in the shell; keep it
        // tracked so it can still be removed.
        let tracked = result.is_ok() || self.gateway.borrow().is_added(id);
        if tracked {
            let record = IconRecord {
                guid,
                callback,
                icon: options.icon.as_set().cloned(),
                notification_icon: options
                    .notification
                    .as_set()
                    .and_then(|notification| notification.icon.as_set().cloned()),
            };
            if let Err(e) = self.table.borrow_mut().insert(id, record) {
                return AddOutcome::rejected(id, e);
            }
        }

        AddOutcome { id, tracked, result }
    }

    /// Returns the callback the record no longer references, if any.
    pub(crate) fn update_icon(
        &self,
        id: IconId,
        options: ShellOptions,
        callback: Field<CallbackRef>,
    ) -> CoreResult<Option<CallbackRef>> {
        let Some(current) = self.table.borrow().get(id) else {
            return Err(TrayError::validation(format!("icon id {} is not registered", id)));
        };

        self.gateway.borrow_mut().modify(id, &options)?;

        let notification_icon = match options.notification {
            Field::Keep => current.notification_icon.clone(),
            Field::Clear => None,
            Field::Set(notification) => notification
                .icon
                .resolve(current.notification_icon.clone()),
        };
        let record = IconRecord {
            guid: current.guid,
            callback: callback.clone().resolve(current.callback),
            icon: options.icon.resolve(current.icon.clone()),
            notification_icon,
        };
        let released = match callback {
            Field::Keep => None,
            Field::Clear | Field::Set(_) => current.callback,
        };

        self.table.borrow_mut().replace(id, record)?;
        Ok(released)
    }

    /// Idempotent; returns the removed record's callback.
    pub(crate) fn remove_icon(&self, id: IconId) -> CoreResult<Option<CallbackRef>> {
        if !self.table.borrow().contains(id) {
            return Ok(None);
        }
        // The record outlives a failed delete so teardown still sees it.
        self.gateway.borrow_mut().remove(id)?;
        let Some(record) = self.table.borrow_mut().remove(id) else {
            return Ok(None);
        };
        if self.table.borrow().is_empty() {
            debug!("Last icon removed from the table");
        }
        Ok(record.callback)
    }

    pub(crate) fn create_menu(&self, items: &[MenuItemDescriptor]) -> CoreResult<MenuRef> {
        let menu = popup::build_popup(self.platform.as_ref(), items)?;
        self.menus.borrow_mut().insert(menu);
        Ok(menu)
    }

    pub(crate) fn create_menu_from_template(&self, bytes: &[u8]) -> CoreResult<MenuRef> {
        let menu = popup::build_popup_from_template(self.platform.as_ref(), bytes)?;
        self.menus.borrow_mut().insert(menu);
        Ok(menu)
    }

    pub(crate) fn destroy_menu(&self, menu: MenuRef) {
        if !self.menus.borrow_mut().remove(&menu) {
            return;
        }
        if let Err(e) = self.platform.destroy_menu(menu) {
            warn!(menu = ?menu, code = e.code, "Failed to destroy menu");
        }
    }

    #[track_caller]
    fn live_menu(&self, menu: MenuRef) -> CoreResult<MenuRef> {
        if self.menus.borrow().contains(&menu) {
            Ok(menu)
        } else {
            Err(TrayError::validation("menu has already been destroyed"))
        }
    }

    pub(crate) fn show_menu(&self, menu: MenuRef, x: i32, y: i32) -> CoreResult<u32> {
        let menu = self.live_menu(menu)?;
        let owner = self
            .window()
            .ok_or_else(|| TrayError::loop_unavailable("message window is gone"))?;
        Ok(popup::show(self.platform.as_ref(), menu, owner, x, y))
    }

    pub(crate) fn decode_menu_item(
        &self,
        menu: MenuRef,
        locator: ItemLocator,
    ) -> CoreResult<MenuItemDescriptor> {
        popup::decode(self.platform.as_ref(), self.live_menu(menu)?, locator)
    }

    pub(crate) fn update_menu_item(
        &self,
        menu: MenuRef,
        locator: ItemLocator,
        patch: &MenuItemPatch,
    ) -> CoreResult<()> {
        popup::update(self.platform.as_ref(), self.live_menu(menu)?, locator, patch)
    }

    fn on_notify_icon(&self, wparam: usize, lparam: isize) {
        let Some(notification) = TrayNotification::decode(wparam, lparam) else {
            return;
        };

        if self.is_busy() {
            debug!(
                icon = %notification.icon,
                "Notification deferred until the current call returns"
            );
            self.deferred.borrow_mut().push_back(notification);
            return;
        }

        self.handle_notification(notification);
        self.drain_deferred();
    }

    pub(crate) fn drain_deferred(&self) {
        while !self.is_busy() {
            let next = self.deferred.borrow_mut().pop_front();
            let Some(notification) = next else {
                return;
            };
            self.handle_notification(notification);
        }
    }

    fn handle_notification(&self, notification: TrayNotification) {
        let record = self.table.borrow().get(notification.icon);
        let Some(record) = record else {
            debug!(icon = %notification.icon, "Notification for unknown icon dropped");
            return;
        };

        if let Some(window) = self.window() {
            self.platform.set_foreground_window(window);
        }

        let Some(callback) = record.callback else {
            return;
        };
        let event = SelectEvent {
            icon: notification.icon,
            right_button: notification.right_button(),
            x: notification.x,
            y: notification.y,
        };

        match dispatcher::deliver_to_runtime(self, callback, event) {
            DeliveryOutcome::Handled => debug!(icon = %event.icon, "Selection handled"),
            DeliveryOutcome::Failed => warn!(icon = %event.icon, "Select handler failed"),
            outcome => debug!(icon = %event.icon, outcome = ?outcome, "Selection not handled"),
        }
    }

    /// Release everything the loop owns; the window is destroyed last.
    pub(crate) fn teardown(&self) {
        let Some(window) = self.window() else {
            return;
        };

        let remaining = self.table.borrow().len();
        debug!(icons = ?self.table.borrow().ids(), "Deleting remaining shell icons");
        self.gateway.borrow_mut().remove_all();
        drop(self.table.borrow_mut().drain());

        let menus: Vec<MenuRef> = self.menus.borrow_mut().drain().collect();
        for menu in menus {
            if let Err(e) = self.platform.destroy_menu(menu) {
                warn!(menu = ?menu, code = e.code, "Failed to destroy menu during teardown");
            }
        }

        let mut freed = 0;
        while let Some(message) = self.platform.peek_message(window) {
            if message.message == WM_TRAY_CALL {
                // SAFETY: posted WM_TRAY_CALL payloads are only produced by
                // Dispatcher::nonblocking and are still owned by the queue.
                unsafe { dispatcher::discard_incoming(message.wparam, message.lparam) };
                freed += 1;
            }
        }
        self.deferred.borrow_mut().clear();

        if let Err(e) = self.platform.destroy_window(window) {
            warn!(code = e.code, "Failed to destroy message window");
        }
        self.window.set(None);

        info!(icons = remaining, discarded_calls = freed, "Message loop torn down");
    }
}

impl WindowProcedure for LoopContext {
    fn handle_message(&self, message: u32, wparam: usize, lparam: isize) -> Option<isize> {
        match message {
            WM_TRAY_QUIT => {
                self.platform.post_quit_message(0);
                Some(0)
            }
            WM_TRAY_CALL => {
                // SAFETY: WM_TRAY_CALL is private to this window and only
                // produced by Dispatcher.
                unsafe { dispatcher::run_incoming(self, wparam, lparam) };
                self.drain_deferred();
                Some(0)
            }
            WM_TRAY_DELIVERED => Some(0),
            WM_TRAY_NOTIFY_ICON => {
                self.on_notify_icon(wparam, lparam);
                Some(0)
            }
            _ => None,
        }
    }
}
