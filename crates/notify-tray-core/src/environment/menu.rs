use crate::{
    CoreResult, MenuItemDescriptor, MenuItemPatch, TrayError,
    environment::EnvironmentInner,
    message_loop::window::LoopContext,
    platform::{ItemLocator, MenuRef},
};

use std::{fmt, rc::Rc};

use tracing::{debug, instrument};

/// A popup menu owned by the message-loop thread.
///
/// Keeps the loop running while alive; dropping it destroys the native menu.
pub struct Menu {
    inner: Rc<EnvironmentInner>,
    handle: MenuRef,
}

impl Menu {
    pub(crate) fn new(inner: Rc<EnvironmentInner>, handle: MenuRef) -> Self {
        Self { inner, handle }
    }

    /// Native handle.
    pub fn handle(&self) -> MenuRef {
        self.handle
    }

    /// Show the menu at screen coordinates and return the chosen command id,
    /// or 0 when it was dismissed.
    #[instrument(skip(self), fields(menu = ?self.handle))]
    pub fn show(&self, x: i32, y: i32) -> CoreResult<u32> {
        let handle = self.handle;
        let chosen = self.call(move |context| context.show_menu(handle, x, y))?;
        debug!(chosen, "Popup menu closed");
        Ok(chosen)
    }

    /// Read the item with command `id`, searching submenus too.
    pub fn get_by_id(&self, id: u32) -> CoreResult<MenuItemDescriptor> {
        let handle = self.handle;
        self.call(move |context| context.decode_menu_item(handle, ItemLocator::Command(id)))
    }

    /// Read the item at `index` in the top level.
    pub fn get_by_index(&self, index: u32) -> CoreResult<MenuItemDescriptor> {
        let handle = self.handle;
        self.call(move |context| context.decode_menu_item(handle, ItemLocator::Position(index)))
    }

    /// Patch the item with command `id`.
    pub fn update_by_id(&self, id: u32, patch: MenuItemPatch) -> CoreResult<()> {
        self.update(ItemLocator::Command(id), patch)
    }

    /// Patch the item at `index` in the top level.
    pub fn update_at(&self, index: u32, patch: MenuItemPatch) -> CoreResult<()> {
        self.update(ItemLocator::Position(index), patch)
    }

    #[instrument(skip(self, patch), fields(menu = ?self.handle))]
    fn update(&self, locator: ItemLocator, patch: MenuItemPatch) -> CoreResult<()> {
        if patch.is_empty() {
            return Ok(());
        }
        let handle = self.handle;
        self.call(move |context| context.update_menu_item(handle, locator, &patch))
    }

    fn call<R, F>(&self, call: F) -> CoreResult<R>
    where
        F: FnOnce(&LoopContext) -> CoreResult<R> + Send,
        R: Send,
    {
        self.inner.check_usable()?;
        let dispatcher = self
            .inner
            .running_dispatcher()
            .map_err(|_| TrayError::loop_unavailable("menu outlived its message loop"))?;
        dispatcher.blocking(call)?
    }
}

impl fmt::Debug for Menu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Menu").field("handle", &self.handle).finish()
    }
}

impl Drop for Menu {
    fn drop(&mut self) {
        let handle = self.handle;
        let dispatcher = self.inner.pump.borrow().dispatcher();
        if let Some(dispatcher) = dispatcher
            && let Err(e) = dispatcher.nonblocking(move |context| context.destroy_menu(handle))
        {
            debug!(menu = ?handle, error = %e, "Menu destroy not queued");
        }

        self.inner
            .live_menus
            .set(self.inner.live_menus.get().saturating_sub(1));
        self.inner.stop_if_idle();
    }
}
