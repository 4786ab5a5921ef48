use crate::{IconId, platform::SysCallError};

use std::{panic::Location, result::Result as StdResult};

use error_location::ErrorLocation;
use thiserror::Error;

/// Error returned by a selection handler running on the runtime thread.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Tray registry errors with source location tracking.
#[derive(Error, Debug)]
pub enum TrayError {
    /// A native call failed.
    #[error("{syscall} failed with OS error {code:#010x} {location}")]
    Os {
        /// Name of the failing native call, preserved verbatim.
        syscall: &'static str,
        /// Platform error code reported for the call.
        code: u32,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// Input rejected before any native call was attempted.
    #[error("Invalid input: {reason} {location}")]
    Validation {
        /// Description of what was rejected.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The message loop could not accept a call.
    #[error("Message loop unavailable: {reason} {location}")]
    LoopUnavailable {
        /// Why the loop could not take the call.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// The registry failed fatally during initialization or was torn down.
    #[error("Tray registry unavailable: {reason} {location}")]
    RegistryUnavailable {
        /// Why the registry cannot be used.
        reason: String,
        /// Source location where error occurred.
        location: ErrorLocation,
    },

    /// A selection handler returned an error.
    #[error("Select handler for icon {icon} failed: {source} {location}")]
    Callback {
        /// Icon whose handler failed.
        icon: IconId,
        /// Error returned by the handler.
        #[source]
        source: HandlerError,
        /// Source location where error occurred.
        location: ErrorLocation,
    },
}

impl TrayError {
    /// Build a [`TrayError::Validation`] at the caller's location.
    #[track_caller]
    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        TrayError::Validation {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Build a [`TrayError::LoopUnavailable`] at the caller's location.
    #[track_caller]
    pub(crate) fn loop_unavailable(reason: impl Into<String>) -> Self {
        TrayError::LoopUnavailable {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Build a [`TrayError::RegistryUnavailable`] at the caller's location.
    #[track_caller]
    pub(crate) fn registry_unavailable(reason: impl Into<String>) -> Self {
        TrayError::RegistryUnavailable {
            reason: reason.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Native call name and code, if this is an OS failure.
    pub fn os_code(&self) -> Option<(&'static str, u32)> {
        match self {
            TrayError::Os { syscall, code, .. } => Some((syscall, *code)),
            _ => None,
        }
    }
}

// Manual From<SysCallError> with location tracking.
// Cannot use #[from] because it does not support extra fields.
impl From<SysCallError> for TrayError {
    #[track_caller]
    fn from(error: SysCallError) -> Self {
        TrayError::Os {
            syscall: error.syscall,
            code: error.code,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

/// Result type alias using [`TrayError`].
pub type Result<T> = StdResult<T, TrayError>;
