mod menu;
mod message_loop;

use crate::{CoreResult, RegistryConfig, TrayEnvironment, platform::HeadlessPlatform};

use std::{
    sync::Arc,
    thread::sleep,
    time::{Duration, Instant},
};

const WAIT_TIMEOUT: Duration = Duration::from_secs(5);
const POLL_INTERVAL: Duration = Duration::from_millis(5);

/// Environment on a fresh emulated shell.
fn headless_environment() -> (Arc<HeadlessPlatform>, TrayEnvironment) {
    let platform = Arc::new(HeadlessPlatform::new());
    let environment = TrayEnvironment::with_platform(platform.clone(), RegistryConfig::default());
    (platform, environment)
}

/// Dispatch queued selections until `done` holds; false on timeout.
fn dispatch_until(
    environment: &TrayEnvironment,
    mut done: impl FnMut() -> bool,
) -> CoreResult<bool> {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        environment.dispatch_pending()?;
        if done() {
            return Ok(true);
        }
        sleep(POLL_INTERVAL);
    }
    Ok(false)
}

/// Poll `done` without dispatching; false on timeout.
fn wait_until(mut done: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + WAIT_TIMEOUT;
    while Instant::now() < deadline {
        if done() {
            return true;
        }
        sleep(POLL_INTERVAL);
    }
    false
}
