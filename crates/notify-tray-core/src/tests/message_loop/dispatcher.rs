use crate::{
    RegistryConfig, TrayError,
    message_loop::{
        Dispatcher, MessageLoopThread,
        window::{LoopContext, LoopShared},
    },
    platform::{HeadlessPlatform, Platform},
    runtime::RuntimeHandle,
    tests::WAIT_TIMEOUT,
};

use std::{
    rc::Rc,
    sync::{Arc, mpsc::channel},
    thread,
};

#[allow(clippy::unwrap_used)]
fn running_loop(platform: &Arc<HeadlessPlatform>) -> (MessageLoopThread, Dispatcher) {
    let mut pump = MessageLoopThread::new(platform.clone(), RegistryConfig::default());
    let (runtime, _tasks) = RuntimeHandle::channel();
    let dispatcher = pump.start(runtime).unwrap();
    (pump, dispatcher)
}

/// WHAT: Blocking calls run on the loop thread and return their result
/// WHY: All handle-owning work must happen on the loop thread
#[test]
#[allow(clippy::unwrap_used)]
fn given_running_loop_when_calling_blocking_then_runs_on_loop_thread() {
    // Given: A running loop
    let platform = Arc::new(HeadlessPlatform::new());
    let (_pump, dispatcher) = running_loop(&platform);

    // When: Asking for the current thread name from the loop
    let name = dispatcher
        .blocking(|_| thread::current().name().map(str::to_string))
        .unwrap();

    // Then: The loop thread answered
    assert_eq!(name.as_deref(), Some("notify-tray-loop"));
}

/// WHAT: A blocking call made on the loop thread runs inline
/// WHY: Loop code must be able to use the dispatcher without deadlocking
#[test]
#[allow(clippy::unwrap_used)]
fn given_call_on_loop_thread_when_calling_blocking_again_then_runs_inline() {
    // Given: A running loop and a second handle to it
    let platform = Arc::new(HeadlessPlatform::new());
    let (_pump, dispatcher) = running_loop(&platform);
    let nested = dispatcher.clone();

    // When: Nesting a blocking call inside another
    let value = dispatcher
        .blocking(move |_| nested.blocking(|_| 7))
        .unwrap()
        .unwrap();

    // Then: Inner result returned
    assert_eq!(value, 7);
}

/// WHAT: Non-blocking calls run later on the loop thread
/// WHY: Fire-and-forget work must still happen
#[test]
#[allow(clippy::unwrap_used)]
fn given_running_loop_when_posting_call_then_it_runs() {
    // Given: A running loop
    let platform = Arc::new(HeadlessPlatform::new());
    let (_pump, dispatcher) = running_loop(&platform);
    let (sender, receiver) = channel();

    // When: Posting a call
    dispatcher
        .nonblocking(move |_| {
            let _ = sender.send(thread::current().name().map(str::to_string));
        })
        .unwrap();

    // Then: It ran on the loop thread
    let name = receiver.recv_timeout(WAIT_TIMEOUT).unwrap();
    assert_eq!(name.as_deref(), Some("notify-tray-loop"));
}

/// WHAT: A call whose post fails is dropped by the caller
/// WHY: Ownership moves to the loop only on a successful post
#[test]
#[allow(clippy::unwrap_used)]
fn given_post_failure_when_posting_call_then_call_dropped_and_error_returned() {
    // Given: PostMessageW set to fail
    let platform = Arc::new(HeadlessPlatform::new());
    let (_pump, dispatcher) = running_loop(&platform);
    let marker = Arc::new(());
    let held = Arc::clone(&marker);
    platform.fail_next("PostMessageW", 1816);

    // When: Posting a call that holds the marker
    let result = dispatcher.nonblocking(move |_| drop(held));

    // Then: Os error and the closure (with its capture) released
    assert_eq!(
        result.err().as_ref().and_then(TrayError::os_code),
        Some(("PostMessageW", 1816))
    );
    assert_eq!(Arc::strong_count(&marker), 1);
}

/// WHAT: Blocking calls to a stopped loop fail instead of hanging
/// WHY: A caller must never wait on a window that is gone
#[test]
fn given_stopped_loop_when_calling_blocking_then_loop_unavailable() {
    // Given: A loop that was stopped
    let platform = Arc::new(HeadlessPlatform::new());
    let (mut pump, dispatcher) = running_loop(&platform);
    pump.stop();

    // When: Calling
    let result = dispatcher.blocking(|_| 1);

    // Then: LoopUnavailable
    assert!(matches!(result, Err(TrayError::LoopUnavailable { .. })));
}

/// WHAT: Teardown frees posted calls that never ran
/// WHY: Queued payloads own their captures and must not leak
#[test]
#[allow(clippy::unwrap_used)]
fn given_queued_posted_call_when_tearing_down_then_payload_freed() {
    // Given: A loop context on this thread with one call queued
    let platform = Arc::new(HeadlessPlatform::new());
    let shared: Arc<dyn Platform> = platform.clone();
    let (runtime, _tasks) = RuntimeHandle::channel();
    let context = Rc::new(LoopContext::new(
        Arc::clone(&shared),
        Arc::new(LoopShared::new(runtime)),
    ));
    shared.register_window_class().unwrap();
    let window = shared
        .create_message_window("test window", context.clone())
        .unwrap();
    context.bind(window);

    let marker = Arc::new(());
    let held = Arc::clone(&marker);
    Dispatcher::new(Arc::clone(&shared), window)
        .nonblocking(move |_| drop(held))
        .unwrap();
    assert_eq!(Arc::strong_count(&marker), 2);

    // When: Tearing down without pumping
    context.teardown();

    // Then: Payload freed and window destroyed
    assert_eq!(Arc::strong_count(&marker), 1);
    assert_eq!(platform.live_windows(), 0);
}
