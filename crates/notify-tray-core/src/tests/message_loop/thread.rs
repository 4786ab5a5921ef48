use crate::{
    LoopPhase, RegistryConfig,
    message_loop::MessageLoopThread,
    platform::HeadlessPlatform,
    runtime::RuntimeHandle,
};

use std::sync::Arc;

fn loop_thread(platform: &Arc<HeadlessPlatform>) -> MessageLoopThread {
    MessageLoopThread::new(platform.clone(), RegistryConfig::default())
}

/// WHAT: Starting twice reuses the running loop
/// WHY: One registry owns exactly one message window
#[test]
#[allow(clippy::unwrap_used)]
fn given_running_loop_when_starting_again_then_no_second_window() {
    // Given: A started loop
    let platform = Arc::new(HeadlessPlatform::new());
    let mut pump = loop_thread(&platform);
    let (runtime, _tasks) = RuntimeHandle::channel();
    pump.start(runtime.clone()).unwrap();

    // When: Starting again
    pump.start(runtime).unwrap();

    // Then: Still one window, running
    assert_eq!(platform.windows_created(), 1);
    assert_eq!(pump.phase(), LoopPhase::Running);
}

/// WHAT: Stop joins the thread and destroys the window; repeat stops are no-ops
/// WHY: Teardown must happen exactly once
#[test]
#[allow(clippy::unwrap_used)]
fn given_running_loop_when_stopping_twice_then_stopped_once() {
    // Given: A started loop
    let platform = Arc::new(HeadlessPlatform::new());
    let mut pump = loop_thread(&platform);
    let (runtime, _tasks) = RuntimeHandle::channel();
    pump.start(runtime).unwrap();

    // When: Stopping twice
    pump.stop();
    pump.stop();

    // Then: Stopped, window gone, no dispatcher
    assert_eq!(pump.phase(), LoopPhase::Stopped);
    assert_eq!(platform.live_windows(), 0);
    assert!(pump.dispatcher().is_none());
}

/// WHAT: A stopped loop can be started again without re-registering the class
/// WHY: Class registration is process-wide; the pump restarts on demand
#[test]
#[allow(clippy::unwrap_used)]
fn given_stopped_loop_when_starting_then_new_window_same_class() {
    // Given: A loop started and stopped
    let platform = Arc::new(HeadlessPlatform::new());
    let mut pump = loop_thread(&platform);
    let (runtime, _tasks) = RuntimeHandle::channel();
    pump.start(runtime.clone()).unwrap();
    pump.stop();

    // When: Starting again
    pump.start(runtime).unwrap();

    // Then: Second window, single registration
    assert_eq!(platform.windows_created(), 2);
    assert_eq!(platform.class_registrations(), 1);
    assert_eq!(platform.live_windows(), 1);
}

/// WHAT: Window class registration failure is fatal
/// WHY: Without a class no window can ever be created
#[test]
#[allow(clippy::unwrap_used)]
fn given_class_registration_failure_when_starting_then_fatal_os_error() {
    // Given: RegisterClassW set to fail
    let platform = Arc::new(HeadlessPlatform::new());
    platform.fail_next("RegisterClassW", 5);
    let mut pump = loop_thread(&platform);
    let (runtime, _tasks) = RuntimeHandle::channel();

    // When: Starting
    let failure = pump.start(runtime).err().unwrap();

    // Then: Fatal, named after the call, thread joined
    assert!(failure.fatal);
    assert_eq!(failure.error.os_code(), Some(("RegisterClassW", 5)));
    assert_eq!(pump.phase(), LoopPhase::Stopped);
}

/// WHAT: Window creation failure is reported but not fatal
/// WHY: A later start may succeed
#[test]
#[allow(clippy::unwrap_used)]
fn given_window_creation_failure_when_starting_then_retry_succeeds() {
    // Given: CreateWindowExW set to fail once
    let platform = Arc::new(HeadlessPlatform::new());
    platform.fail_next("CreateWindowExW", 8);
    let mut pump = loop_thread(&platform);
    let (runtime, _tasks) = RuntimeHandle::channel();

    // When: Starting twice
    let failure = pump.start(runtime.clone()).err().unwrap();
    let retry = pump.start(runtime);

    // Then: Non-fatal first failure, then running
    assert!(!failure.fatal);
    assert_eq!(failure.error.os_code(), Some(("CreateWindowExW", 8)));
    assert!(retry.is_ok());
    assert_eq!(pump.phase(), LoopPhase::Running);
}
