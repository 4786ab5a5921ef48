//! Work queued from the message-loop thread to the runtime thread.

use crate::{
    CallbackRef, SelectEvent,
    message_loop::messages::WM_TRAY_DELIVERED,
    platform::{Platform, WindowRef},
};

use std::sync::{Arc, mpsc::SyncSender};

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender, error::SendError, unbounded_channel};
use tracing::debug;

/// How a delivery to the runtime thread ended, as seen by the loop thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeliveryOutcome {
    /// The handler ran and succeeded.
    Handled,
    /// The handler ran and returned an error (reported on the runtime side).
    Failed,
    /// The task was discarded without running.
    Dropped,
    /// The loop stopped waiting: it is closing or the runtime queue is gone.
    Abandoned,
}

/// Completion side of a delivery.
///
/// Dropping it, completed or not, wakes the waiting loop thread.
pub(crate) struct DeliveryReply {
    sender: Option<SyncSender<DeliveryOutcome>>,
    platform: Arc<dyn Platform>,
    window: WindowRef,
}

impl DeliveryReply {
    pub(crate) fn new(
        sender: SyncSender<DeliveryOutcome>,
        platform: Arc<dyn Platform>,
        window: WindowRef,
    ) -> Self {
        Self {
            sender: Some(sender),
            platform,
            window,
        }
    }

    pub(crate) fn complete(mut self, outcome: DeliveryOutcome) {
        if let Some(sender) = self.sender.take() {
            let _ = sender.try_send(outcome);
        }
    }
}

impl Drop for DeliveryReply {
    fn drop(&mut self) {
        self.sender.take();
        if let Err(e) = self
            .platform
            .post_message(self.window, WM_TRAY_DELIVERED, 0, 0)
        {
            debug!(code = e.code, "Delivery wake-up not posted, loop already gone");
        }
    }
}

/// A unit of work for the runtime thread.
pub(crate) enum RuntimeTask {
    /// Run the handler registered under `callback`.
    Select {
        callback: CallbackRef,
        event: SelectEvent,
        reply: DeliveryReply,
    },
    /// Re-check shutdown state.
    Wake,
}

/// Thread-safe sender into the runtime task queue.
#[derive(Clone)]
pub(crate) struct RuntimeHandle {
    sender: UnboundedSender<RuntimeTask>,
}

impl RuntimeHandle {
    pub(crate) fn channel() -> (Self, UnboundedReceiver<RuntimeTask>) {
        let (sender, receiver) = unbounded_channel();
        (Self { sender }, receiver)
    }

    pub(crate) fn send(&self, task: RuntimeTask) -> Result<(), SendError<RuntimeTask>> {
        self.sender.send(task)
    }
}
