use crate::platform::{IconRef, Platform};

use std::{fmt, sync::Arc};

use tracing::{debug, warn};

/// A native icon handle with single-owner release semantics.
///
/// Owned handles are destroyed exactly once, when the last `Arc` drops;
/// shared (system) handles are never destroyed.
pub struct IconImage {
    raw: IconRef,
    shared: bool,
    width: u32,
    height: u32,
    platform: Arc<dyn Platform>,
}

impl IconImage {
    /// Take ownership of a handle created by an image provider.
    pub fn owned(platform: Arc<dyn Platform>, raw: IconRef, width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            raw,
            shared: false,
            width,
            height,
            platform,
        })
    }

    /// Wrap a shared handle that must never be destroyed.
    pub fn shared(platform: Arc<dyn Platform>, raw: IconRef, width: u32, height: u32) -> Arc<Self> {
        Arc::new(Self {
            raw,
            shared: true,
            width,
            height,
            platform,
        })
    }

    /// The native handle.
    pub fn raw(&self) -> IconRef {
        self.raw
    }

    /// Whether the handle is a shared system resource.
    pub fn is_shared(&self) -> bool {
        self.shared
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }
}

impl fmt::Debug for IconImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IconImage")
            .field("raw", &self.raw)
            .field("shared", &self.shared)
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

impl Drop for IconImage {
    fn drop(&mut self) {
        if self.shared {
            return;
        }
        match self.platform.destroy_icon(self.raw) {
            Ok(()) => debug!(icon = ?self.raw, "Icon destroyed"),
            Err(e) => warn!(icon = ?self.raw, code = e.code, "Failed to destroy icon"),
        }
    }
}
