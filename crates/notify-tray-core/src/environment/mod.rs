//! Runtime-side registry of tray icons.
//!
//! A [`TrayEnvironment`] lives on the embedding runtime's thread. It owns
//! the message-loop thread (started lazily, stopped when idle), keeps the
//! selection handlers, and runs them when the loop delivers a selection.

mod menu;

pub use menu::Menu;

use crate::{
    CallbackRef, CoreResult, Field, Guid, IconId, IconImage, IconOptions, MenuItemDescriptor,
    RegistryConfig, SelectHandler, TrayError,
    message_loop::{Dispatcher, LoopPhase, MessageLoopThread, window::LoopContext},
    platform::{IconSize, MenuRef, Platform, SystemIcon, default_platform},
    runtime::{DeliveryOutcome, RuntimeHandle, RuntimeTask},
};

use std::{
    cell::{Cell, RefCell},
    collections::{BTreeSet, HashMap},
    panic::Location,
    rc::Rc,
    sync::Arc,
};

use error_location::ErrorLocation;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, info, instrument, warn};

/// Request to show a new icon.
#[derive(Debug, Clone, Default)]
pub struct AddIconRequest {
    /// Icon id; the first free id from
    /// [`RegistryConfig::first_host_icon_id`] when `None`.
    pub id: Option<IconId>,
    /// Persistent shell identity.
    pub guid: Option<Guid>,
    /// Delete an icon the shell still holds under `guid` before adding
    /// (default true).
    pub replace: Option<bool>,
    /// Initial state.
    pub options: IconOptions,
}

impl AddIconRequest {
    /// A request with the given initial state and a host-assigned id.
    pub fn new(options: IconOptions) -> Self {
        Self {
            options,
            ..Self::default()
        }
    }

    /// Use a specific id.
    pub fn with_id(mut self, id: IconId) -> Self {
        self.id = Some(id);
        self
    }

    /// Attach a persistent identity.
    pub fn with_guid(mut self, guid: Guid) -> Self {
        self.guid = Some(guid);
        self
    }
}

pub(crate) struct EnvironmentInner {
    platform: Arc<dyn Platform>,
    config: RegistryConfig,
    pump: RefCell<MessageLoopThread>,
    runtime: RuntimeHandle,
    tasks: RefCell<Option<UnboundedReceiver<RuntimeTask>>>,
    handlers: RefCell<HashMap<CallbackRef, SelectHandler>>,
    next_callback: Cell<u64>,
    icons: RefCell<BTreeSet<IconId>>,
    live_menus: Cell<usize>,
    dispatching: Cell<bool>,
    poisoned: RefCell<Option<String>>,
    shut_down: Cell<bool>,
}

impl EnvironmentInner {
    #[track_caller]
    fn check_usable(&self) -> CoreResult<()> {
        if self.shut_down.get() {
            return Err(TrayError::registry_unavailable("registry has been shut down"));
        }
        match self.poisoned.borrow().as_ref() {
            Some(reason) => Err(TrayError::registry_unavailable(reason.clone())),
            None => Ok(()),
        }
    }

    fn ensure_pump(&self) -> CoreResult<Dispatcher> {
        let started = self.pump.borrow_mut().start(self.runtime.clone());
        started.map_err(|failure| {
            if failure.fatal {
                warn!(error = %failure.error, "Registry poisoned by fatal start failure");
                *self.poisoned.borrow_mut() = Some(failure.error.to_string());
            }
            failure.error
        })
    }

    #[track_caller]
    fn running_dispatcher(&self) -> CoreResult<Dispatcher> {
        self.pump
            .borrow()
            .dispatcher()
            .ok_or_else(|| TrayError::loop_unavailable("message loop is not running"))
    }

    fn register_handler(&self, handler: SelectHandler) -> CallbackRef {
        let callback = CallbackRef(self.next_callback.get());
        self.next_callback.set(self.next_callback.get() + 1);
        self.handlers.borrow_mut().insert(callback, handler);
        callback
    }

    fn release_handler(&self, callback: Option<CallbackRef>) {
        let Some(callback) = callback else {
            return;
        };
        let released = self.handlers.borrow_mut().remove(&callback);
        drop(released);
    }

    fn stop_if_idle(&self) {
        if !self.config.stop_pump_when_idle {
            return;
        }
        if self.icons.borrow().is_empty() && self.live_menus.get() == 0 {
            let mut pump = self.pump.borrow_mut();
            if pump.phase() != LoopPhase::Uninitialized && pump.phase() != LoopPhase::Stopped {
                debug!("No icons or menus left, stopping message loop");
                pump.stop();
            }
        }
    }
}

/// Tray icon registry bound to the current (runtime) thread.
///
/// Not `Send`: every icon operation and every selection handler runs on the
/// thread that created the environment.
pub struct TrayEnvironment {
    inner: Rc<EnvironmentInner>,
}

impl TrayEnvironment {
    /// Registry on the platform for this target.
    pub fn new(config: RegistryConfig) -> Self {
        Self::with_platform(default_platform(), config)
    }

    /// Registry on an explicit platform, e.g. [`crate::platform::HeadlessPlatform`].
    pub fn with_platform(platform: Arc<dyn Platform>, config: RegistryConfig) -> Self {
        let (runtime, tasks) = RuntimeHandle::channel();
        let pump = MessageLoopThread::new(Arc::clone(&platform), config.clone());
        Self {
            inner: Rc::new(EnvironmentInner {
                platform,
                config,
                pump: RefCell::new(pump),
                runtime,
                tasks: RefCell::new(Some(tasks)),
                handlers: RefCell::new(HashMap::new()),
                next_callback: Cell::new(1),
                icons: RefCell::new(BTreeSet::new()),
                live_menus: Cell::new(0),
                dispatching: Cell::new(false),
                poisoned: RefCell::new(None),
                shut_down: Cell::new(false),
            }),
        }
    }

    /// Platform the registry talks to.
    pub fn platform(&self) -> &Arc<dyn Platform> {
        &self.inner.platform
    }

    /// Show a new icon and return its id.
    #[instrument(skip(self, request), fields(id = ?request.id, guid = ?request.guid))]
    pub fn add_icon(&self, request: AddIconRequest) -> CoreResult<IconId> {
        let inner = &self.inner;
        inner.check_usable()?;

        if let Some(id) = request.id
            && inner.icons.borrow().contains(&id)
        {
            return Err(TrayError::validation(format!(
                "icon id {} is already registered",
                id
            )));
        }
        let first_free = match request.id {
            Some(id) => id,
            None => IconId::new(inner.config.first_host_icon_id)?,
        };
        let replace = request.replace.unwrap_or(true);

        let (shell, on_select) = request.options.split();
        let callback = match on_select {
            Field::Set(handler) => Some(inner.register_handler(handler)),
            Field::Keep | Field::Clear => None,
        };

        let dispatcher = match inner.ensure_pump() {
            Ok(dispatcher) => dispatcher,
            Err(e) => {
                inner.release_handler(callback);
                return Err(e);
            }
        };

        let (id, guid) = (request.id, request.guid);
        let outcome = dispatcher.blocking(move |context| {
            context.add_icon(id, first_free, guid, replace, shell, callback)
        });

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(e) => {
                inner.release_handler(callback);
                inner.stop_if_idle();
                return Err(e);
            }
        };

        if outcome.tracked {
            inner.icons.borrow_mut().insert(outcome.id);
        } else {
            inner.release_handler(callback);
        }

        match outcome.result {
            Ok(()) => {
                info!(id = %outcome.id, "Icon added");
                Ok(outcome.id)
            }
            Err(e) => {
                warn!(id = %outcome.id, tracked = outcome.tracked, error = %e, "Icon add failed");
                inner.stop_if_idle();
                Err(e)
            }
        }
    }

    /// Change the state of a registered icon; `Keep` fields are untouched.
    #[instrument(skip(self, options), fields(id = %id))]
    pub fn update_icon(&self, id: IconId, options: IconOptions) -> CoreResult<()> {
        let inner = &self.inner;
        inner.check_usable()?;

        if !inner.icons.borrow().contains(&id) {
            return Err(TrayError::validation(format!("icon id {} is not registered", id)));
        }
        let dispatcher = inner.running_dispatcher()?;

        let (shell, on_select) = options.split();
        let callback = on_select.map(|handler| inner.register_handler(handler));
        let added = callback.as_set().copied();

        let updated = dispatcher
            .blocking(move |context| context.update_icon(id, shell, callback))
            .and_then(|result| result);

        match updated {
            Ok(released) => {
                inner.release_handler(released);
                debug!("Icon updated");
                Ok(())
            }
            Err(e) => {
                inner.release_handler(added);
                Err(e)
            }
        }
    }

    /// Remove an icon. Removing an unknown id succeeds without a native call.
    #[instrument(skip(self), fields(id = %id))]
    pub fn remove_icon(&self, id: IconId) -> CoreResult<()> {
        let inner = &self.inner;
        inner.check_usable()?;

        if !inner.icons.borrow_mut().remove(&id) {
            debug!("Icon not registered, nothing to remove");
            return Ok(());
        }

        let removed = inner
            .running_dispatcher()
            .and_then(|dispatcher| dispatcher.blocking(move |context| context.remove_icon(id)))
            .and_then(|result| result);

        let result = match removed {
            Ok(callback) => {
                inner.release_handler(callback);
                info!("Icon removed");
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "Icon removal failed, icon stays registered");
                inner.icons.borrow_mut().insert(id);
                Err(e)
            }
        };

        inner.stop_if_idle();
        result
    }

    /// Whether `id` is registered.
    pub fn contains_icon(&self, id: IconId) -> bool {
        self.inner.icons.borrow().contains(&id)
    }

    /// Number of registered icons.
    pub fn icon_count(&self) -> usize {
        self.inner.icons.borrow().len()
    }

    /// Registered icon ids in ascending order.
    pub fn icon_ids(&self) -> Vec<IconId> {
        self.inner.icons.borrow().iter().copied().collect()
    }

    /// Whether the message-loop thread is currently running.
    pub fn is_pump_running(&self) -> bool {
        self.loop_phase() == LoopPhase::Running
    }

    /// Current phase of the message-loop thread.
    pub fn loop_phase(&self) -> LoopPhase {
        self.inner.pump.borrow().phase()
    }

    /// Build a popup menu from descriptors.
    #[instrument(skip(self, items), fields(items = items.len()))]
    pub fn create_menu(&self, items: Vec<MenuItemDescriptor>) -> CoreResult<Menu> {
        self.open_menu(move |context| context.create_menu(&items))
    }

    /// Build a popup menu from a raw `MENUEX` template.
    #[instrument(skip(self, template), fields(bytes = template.len()))]
    pub fn create_menu_from_template(&self, template: Vec<u8>) -> CoreResult<Menu> {
        self.open_menu(move |context| context.create_menu_from_template(&template))
    }

    fn open_menu<F>(&self, build: F) -> CoreResult<Menu>
    where
        F: FnOnce(&LoopContext) -> CoreResult<MenuRef> + Send,
    {
        let inner = &self.inner;
        inner.check_usable()?;
        let dispatcher = inner.ensure_pump()?;

        match dispatcher.blocking(build).and_then(|result| result) {
            Ok(handle) => {
                inner.live_menus.set(inner.live_menus.get() + 1);
                Ok(Menu::new(Rc::clone(inner), handle))
            }
            Err(e) => {
                inner.stop_if_idle();
                Err(e)
            }
        }
    }

    /// A shared built-in icon image.
    pub fn load_system_icon(&self, icon: SystemIcon, size: IconSize) -> CoreResult<Arc<IconImage>> {
        let platform = &self.inner.platform;
        let raw = platform.load_system_icon(icon, size)?;
        let (width, height) = platform.icon_dimensions(size);
        Ok(IconImage::shared(Arc::clone(platform), raw, width, height))
    }

    /// Run every queued selection on this thread and return how many ran.
    ///
    /// A handler error stops the batch and is returned as
    /// [`TrayError::Callback`]; remaining selections stay queued. Calls made
    /// from inside a handler return `Ok(0)`.
    pub fn dispatch_pending(&self) -> CoreResult<usize> {
        self.inner.check_usable()?;
        if self.inner.dispatching.get() {
            return Ok(0);
        }

        let mut handled = 0;
        loop {
            let task = match self.inner.tasks.borrow_mut().as_mut() {
                Some(tasks) => tasks.try_recv().ok(),
                None => None,
            };
            let Some(task) = task else {
                return Ok(handled);
            };
            if self.run_task(task)? {
                handled += 1;
            }
        }
    }

    /// Drive selections until [`TrayEnvironment::shutdown`] is called.
    ///
    /// Returns early with [`TrayError::Callback`] when a handler fails;
    /// calling it again resumes.
    pub async fn run_until_shutdown(&self) -> CoreResult<()> {
        self.inner.check_usable()?;
        let Some(tasks) = self.inner.tasks.borrow_mut().take() else {
            return Err(TrayError::validation("selections are already being driven"));
        };
        let mut lease = TaskLease {
            inner: &self.inner,
            tasks: Some(tasks),
        };

        while !self.inner.shut_down.get() {
            let next = match lease.tasks.as_mut() {
                Some(tasks) => tasks.recv().await,
                None => None,
            };
            let Some(task) = next else {
                break;
            };
            self.run_task(task)?;
        }
        Ok(())
    }

    /// Returns whether a handler ran.
    fn run_task(&self, task: RuntimeTask) -> CoreResult<bool> {
        let RuntimeTask::Select {
            callback,
            event,
            reply,
        } = task
        else {
            return Ok(false);
        };

        let handler = self.inner.handlers.borrow().get(&callback).cloned();
        let Some(handler) = handler else {
            debug!(icon = %event.icon, "Handler released before delivery, selection dropped");
            reply.complete(DeliveryOutcome::Dropped);
            return Ok(false);
        };

        self.inner.dispatching.set(true);
        let result = handler(self, event);
        self.inner.dispatching.set(false);

        match result {
            Ok(()) => {
                reply.complete(DeliveryOutcome::Handled);
                Ok(true)
            }
            Err(source) => {
                reply.complete(DeliveryOutcome::Failed);
                Err(TrayError::Callback {
                    icon: event.icon,
                    source,
                    location: ErrorLocation::from(Location::caller()),
                })
            }
        }
    }

    /// Remove every icon, stop the loop and drop all handlers. Runs once;
    /// later operations fail with [`TrayError::RegistryUnavailable`].
    #[instrument(skip(self))]
    pub fn shutdown(&self) {
        let inner = &self.inner;
        if inner.shut_down.replace(true) {
            return;
        }

        inner.pump.borrow_mut().stop();
        inner.icons.borrow_mut().clear();

        let handlers = std::mem::take(&mut *inner.handlers.borrow_mut());
        drop(handlers);

        let pending = inner
            .tasks
            .borrow_mut()
            .as_mut()
            .map(|tasks| {
                let mut dropped = 0;
                while tasks.try_recv().is_ok() {
                    dropped += 1;
                }
                dropped
            })
            .unwrap_or(0);

        if inner.runtime.send(RuntimeTask::Wake).is_err() {
            debug!("Runtime queue already closed");
        }
        info!(dropped_selections = pending, "Tray registry shut down");
    }
}

impl Drop for TrayEnvironment {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Returns the task receiver to the environment when the driving future
/// ends or is dropped.
struct TaskLease<'a> {
    inner: &'a EnvironmentInner,
    tasks: Option<UnboundedReceiver<RuntimeTask>>,
}

impl Drop for TaskLease<'_> {
    fn drop(&mut self) {
        if let Some(tasks) = self.tasks.take() {
            *self.inner.tasks.borrow_mut() = Some(tasks);
        }
    }
}
