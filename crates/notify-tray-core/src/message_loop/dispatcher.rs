//! Calls between the runtime thread and the message-loop thread.
//!
//! Runtime to loop: [`Dispatcher::blocking`] sends a borrowed closure and
//! waits; [`Dispatcher::nonblocking`] posts an owned one. Loop to runtime:
//! [`deliver_to_runtime`] queues a task and waits for its completion while
//! still servicing blocking calls, so a handler may call back into the loop.

use crate::{
    CallbackRef, CoreResult, SelectEvent, TrayError,
    message_loop::{
        messages::{CALL_POSTED, CALL_SENT, WM_TRAY_CALL, WM_TRAY_DELIVERED},
        window::LoopContext,
    },
    platform::{Platform, WindowRef},
    runtime::{DeliveryOutcome, DeliveryReply, RuntimeTask},
};

use std::sync::{
    Arc,
    mpsc::{TryRecvError, sync_channel},
};

use tracing::{debug, instrument, warn};

/// Owned call posted to the loop thread.
type PostedCall = Box<dyn FnOnce(&LoopContext) + Send>;

/// Borrowed call sent to the loop thread; lives on the sender's stack.
type SentCall<'a> = &'a mut (dyn FnMut(&LoopContext) + Send);

/// Handle for running closures on the message-loop thread.
#[derive(Clone)]
pub(crate) struct Dispatcher {
    platform: Arc<dyn Platform>,
    window: WindowRef,
}

impl Dispatcher {
    pub(crate) fn new(platform: Arc<dyn Platform>, window: WindowRef) -> Self {
        Self { platform, window }
    }

    /// Run `call` on the loop thread and wait for its result.
    ///
    /// Safe to use from the loop thread itself (the call runs inline) and
    /// from a handler the loop is currently waiting on.
    #[track_caller]
    pub(crate) fn blocking<R, F>(&self, call: F) -> CoreResult<R>
    where
        F: FnOnce(&LoopContext) -> R + Send,
        R: Send,
    {
        let mut slot: Option<R> = None;
        {
            let mut call = Some(call);
            let mut run = |context: &LoopContext| {
                if let Some(call) = call.take() {
                    slot = Some(call(context));
                }
            };
            let mut erased: SentCall<'_> = &mut run;
            let pointer = &mut erased as *mut SentCall<'_>;

            self.platform
                .send_message(self.window, WM_TRAY_CALL, CALL_SENT, pointer as isize);
        }

        slot.ok_or_else(|| TrayError::loop_unavailable("message loop did not run the call"))
    }

    /// Queue `call` on the loop thread without waiting.
    ///
    /// Ownership passes to the loop only when the post succeeds; otherwise
    /// the call is dropped here.
    #[track_caller]
    pub(crate) fn nonblocking<F>(&self, call: F) -> CoreResult<()>
    where
        F: FnOnce(&LoopContext) + Send + 'static,
    {
        let boxed: Box<PostedCall> = Box::new(Box::new(call));
        let pointer = Box::into_raw(boxed);

        match self
            .platform
            .post_message(self.window, WM_TRAY_CALL, CALL_POSTED, pointer as isize)
        {
            Ok(()) => Ok(()),
            Err(e) => {
                // SAFETY: the post failed, so the pointer was never handed over.
                drop(unsafe { Box::from_raw(pointer) });
                Err(TrayError::from(e))
            }
        }
    }
}

/// Run a `WM_TRAY_CALL` payload on the loop thread.
///
/// # Safety
///
/// `lparam` must come from [`Dispatcher::blocking`] (with `CALL_SENT`,
/// sender still waiting) or [`Dispatcher::nonblocking`] (with `CALL_POSTED`,
/// not yet run or freed).
pub(crate) unsafe fn run_incoming(context: &LoopContext, wparam: usize, lparam: isize) {
    if lparam == 0 {
        return;
    }
    let _busy = context.enter();

    if wparam == CALL_POSTED {
        // SAFETY: produced by Box::into_raw in nonblocking.
        let call = unsafe { Box::from_raw(lparam as *mut PostedCall) };
        (*call)(context);
    } else {
        // SAFETY: points at a SentCall on the blocked sender's stack.
        let call = unsafe { &mut *(lparam as *mut SentCall<'_>) };
        call(context);
    }
}

/// Free a posted payload that will never run.
///
/// # Safety
///
/// Same contract as [`run_incoming`]; sent payloads are left untouched.
pub(crate) unsafe fn discard_incoming(wparam: usize, lparam: isize) {
    if wparam == CALL_POSTED && lparam != 0 {
        // SAFETY: produced by Box::into_raw in nonblocking.
        drop(unsafe { Box::from_raw(lparam as *mut PostedCall) });
    }
}

/// Hand a selection to the runtime thread and wait until it has run.
///
/// The wait only retrieves `WM_TRAY_DELIVERED`; other posted messages stay
/// queued, while blocking calls from the runtime are still executed.
#[instrument(skip(context))]
pub(crate) fn deliver_to_runtime(
    context: &LoopContext,
    callback: CallbackRef,
    event: SelectEvent,
) -> DeliveryOutcome {
    let shared = Arc::clone(&context.shared);
    if shared.is_closing() {
        return DeliveryOutcome::Abandoned;
    }
    let Some(window) = context.window() else {
        return DeliveryOutcome::Abandoned;
    };

    let _busy = context.enter();
    let (sender, outcome) = sync_channel(1);
    let reply = DeliveryReply::new(sender, Arc::clone(&context.platform), window);
    let task = RuntimeTask::Select {
        callback,
        event,
        reply,
    };

    if shared.runtime.send(task).is_err() {
        debug!("Runtime queue closed, delivery abandoned");
        return DeliveryOutcome::Abandoned;
    }

    loop {
        match context
            .platform
            .get_message(Some(window), Some((WM_TRAY_DELIVERED, WM_TRAY_DELIVERED)))
        {
            Ok(Some(_)) => match outcome.try_recv() {
                Ok(result) => return result,
                Err(TryRecvError::Disconnected) => return DeliveryOutcome::Dropped,
                Err(TryRecvError::Empty) if shared.is_closing() => {
                    return DeliveryOutcome::Abandoned;
                }
                Err(TryRecvError::Empty) => continue,
            },
            Ok(None) => {
                // The quit was consumed here; re-arm it for the outer loop.
                context.platform.post_quit_message(0);
                return DeliveryOutcome::Abandoned;
            }
            Err(e) => {
                warn!(code = e.code, "Waiting for delivery failed");
                return DeliveryOutcome::Abandoned;
            }
        }
    }
}
