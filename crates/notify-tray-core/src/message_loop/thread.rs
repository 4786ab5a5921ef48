//! Lifecycle of the dedicated message-loop thread.

use crate::{
    RegistryConfig, TrayError,
    message_loop::{
        dispatcher::Dispatcher,
        messages::{WM_TRAY_DELIVERED, WM_TRAY_QUIT},
        window::{LoopContext, LoopShared},
    },
    platform::{Platform, SysCallError, WindowProcedure, WindowRef},
    runtime::RuntimeHandle,
};

use std::{
    rc::Rc,
    sync::{
        Arc,
        mpsc::{SyncSender, sync_channel},
    },
    thread::{self, JoinHandle},
};

use tracing::{debug, error, info, instrument, warn};

/// Observable state of the message loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopPhase {
    /// Never started.
    Uninitialized,
    /// Thread spawned, window not yet created.
    Starting,
    /// Pumping messages.
    Running,
    /// Quit requested, waiting for the thread to exit.
    Stopping,
    /// Thread joined.
    Stopped,
}

/// Which initialization step failed on the loop thread.
#[derive(Debug, Clone, Copy)]
enum InitFailure {
    RegisterClass(SysCallError),
    CreateWindow(SysCallError),
}

/// A failed start; `fatal` failures make the registry unusable.
#[derive(Debug)]
pub(crate) struct StartFailure {
    pub(crate) error: TrayError,
    pub(crate) fatal: bool,
}

impl StartFailure {
    #[track_caller]
    fn fatal(reason: impl Into<String>) -> Self {
        Self {
            error: TrayError::registry_unavailable(reason),
            fatal: true,
        }
    }
}

/// Owns the loop thread and its readiness handshake.
pub(crate) struct MessageLoopThread {
    platform: Arc<dyn Platform>,
    config: RegistryConfig,
    phase: LoopPhase,
    window: Option<WindowRef>,
    shared: Option<Arc<LoopShared>>,
    handle: Option<JoinHandle<()>>,
}

impl MessageLoopThread {
    pub(crate) fn new(platform: Arc<dyn Platform>, config: RegistryConfig) -> Self {
        Self {
            platform,
            config,
            phase: LoopPhase::Uninitialized,
            window: None,
            shared: None,
            handle: None,
        }
    }

    pub(crate) fn phase(&self) -> LoopPhase {
        match (&self.phase, &self.handle) {
            (LoopPhase::Running, Some(handle)) if handle.is_finished() => LoopPhase::Stopped,
            (phase, _) => *phase,
        }
    }

    /// Dispatcher for the running loop, if any.
    pub(crate) fn dispatcher(&self) -> Option<Dispatcher> {
        match self.phase() {
            LoopPhase::Running => self
                .window
                .map(|window| Dispatcher::new(Arc::clone(&self.platform), window)),
            _ => None,
        }
    }

    /// Spawn the loop thread and block until its window exists.
    #[instrument(skip(self, runtime), fields(thread = %self.config.thread_name))]
    pub(crate) fn start(&mut self, runtime: RuntimeHandle) -> Result<Dispatcher, StartFailure> {
        if let Some(dispatcher) = self.dispatcher() {
            return Ok(dispatcher);
        }
        // Reap a loop that exited on its own.
        self.stop();

        self.phase = LoopPhase::Starting;
        let shared = Arc::new(LoopShared::new(runtime));
        let (ready_tx, ready_rx) = sync_channel(1);

        let platform = Arc::clone(&self.platform);
        let thread_shared = Arc::clone(&shared);
        let title = self.config.window_title.clone();
        let spawned = thread::Builder::new()
            .name(self.config.thread_name.clone())
            .spawn(move || run_loop(platform, thread_shared, title, ready_tx));

        let handle = match spawned {
            Ok(handle) => handle,
            Err(e) => {
                self.phase = LoopPhase::Stopped;
                return Err(StartFailure {
                    error: TrayError::loop_unavailable(format!(
                        "failed to spawn message loop thread: {}",
                        e
                    )),
                    fatal: false,
                });
            }
        };

        let ready = ready_rx.recv();
        self.handle = Some(handle);

        match ready {
            Ok(Ok(window)) => {
                self.window = Some(window);
                self.shared = Some(shared);
                self.phase = LoopPhase::Running;
                info!(window = ?window, "Message loop running");
                Ok(Dispatcher::new(Arc::clone(&self.platform), window))
            }
            Ok(Err(InitFailure::RegisterClass(e))) => {
                self.join();
                Err(StartFailure {
                    error: TrayError::from(e),
                    fatal: true,
                })
            }
            Ok(Err(InitFailure::CreateWindow(e))) => {
                self.join();
                Err(StartFailure {
                    error: TrayError::from(e),
                    fatal: false,
                })
            }
            Err(_) => {
                self.join();
                Err(StartFailure::fatal(
                    "message loop thread exited before signalling readiness",
                ))
            }
        }
    }

    /// Ask the loop to quit and join it. Idempotent.
    #[instrument(skip(self))]
    pub(crate) fn stop(&mut self) {
        if matches!(self.phase, LoopPhase::Uninitialized | LoopPhase::Stopped) {
            return;
        }
        self.phase = LoopPhase::Stopping;

        if let Some(shared) = self.shared.take() {
            shared.mark_closing();
        }
        if let Some(window) = self.window.take() {
            // Release a delivery wait first, then end the loop.
            if let Err(e) = self.platform.post_message(window, WM_TRAY_DELIVERED, 0, 0) {
                debug!(code = e.code, "Wake-up not posted");
            }
            if let Err(e) = self.platform.post_message(window, WM_TRAY_QUIT, 0, 0) {
                warn!(code = e.code, "Quit request not posted, loop may have exited");
            }
        }

        self.join();
        info!("Message loop stopped");
    }

    fn join(&mut self) {
        if let Some(handle) = self.handle.take()
            && handle.join().is_err()
        {
            error!("Message loop thread panicked");
        }
        self.phase = LoopPhase::Stopped;
    }
}

impl Drop for MessageLoopThread {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_loop(
    platform: Arc<dyn Platform>,
    shared: Arc<LoopShared>,
    title: String,
    ready: SyncSender<Result<WindowRef, InitFailure>>,
) {
    if let Err(e) = platform.register_window_class() {
        error!(code = e.code, "Window class registration failed");
        let _ = ready.send(Err(InitFailure::RegisterClass(e)));
        return;
    }

    let context = Rc::new(LoopContext::new(Arc::clone(&platform), shared));
    let procedure: Rc<dyn WindowProcedure> = context.clone();
    let window = match platform.create_message_window(&title, procedure) {
        Ok(window) => window,
        Err(e) => {
            error!(code = e.code, "Message window creation failed");
            let _ = ready.send(Err(InitFailure::CreateWindow(e)));
            return;
        }
    };
    context.bind(window);

    if ready.send(Ok(window)).is_err() {
        warn!("Loop owner went away during startup");
        context.teardown();
        return;
    }
    drop(ready);

    loop {
        match platform.get_message(None, None) {
            Ok(Some(message)) => platform.dispatch_message(&message),
            Ok(None) => break,
            Err(e) => {
                error!(code = e.code, "GetMessageW failed, leaving message loop");
                break;
            }
        }
    }

    context.teardown();
}
