//! Persistent icon identity.
//!
//! The shell uses a GUID to remember per-icon user preferences across process
//! restarts, and allows only one live icon per GUID system-wide.

use crate::{CoreResult, TrayError};

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

const GUID_TEXT_LEN: usize = 36;
const HYPHEN_OFFSETS: [usize; 4] = [8, 13, 18, 23];

/// 128-bit persistent identifier for a notification icon.
///
/// Generate values once and keep them as constants; a GUID created at
/// runtime defeats its purpose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Guid(Uuid);

impl Guid {
    /// Parse the canonical `xxxxxxxx-xxxx-xxxx-xxxx-xxxxxxxxxxxx` form.
    ///
    /// Braced, URN and unhyphenated forms are rejected.
    #[track_caller]
    pub fn parse(text: &str) -> CoreResult<Self> {
        if text.len() != GUID_TEXT_LEN {
            return Err(TrayError::validation("invalid guid: must be 36 chars."));
        }

        let bytes = text.as_bytes();
        if HYPHEN_OFFSETS.iter().any(|&offset| bytes[offset] != b'-') {
            return Err(TrayError::validation(
                "invalid guid: must have '-' at offsets 8, 13, 18 and 23.",
            ));
        }

        let hex_only = bytes
            .iter()
            .enumerate()
            .filter(|(offset, _)| !HYPHEN_OFFSETS.contains(offset))
            .all(|(_, byte)| byte.is_ascii_hexdigit());
        if !hex_only {
            return Err(TrayError::validation(
                "invalid guid: invalid hexadecimal characters.",
            ));
        }

        Uuid::try_parse(text)
            .map(Guid)
            .map_err(|e| TrayError::validation(format!("invalid guid: {}", e)))
    }

    /// Build from the 16-byte in-memory layout used by Windows `GUID`
    /// (first three fields little-endian).
    #[track_caller]
    pub fn from_le_bytes(bytes: &[u8]) -> CoreResult<Self> {
        if bytes.len() != 16 {
            return Err(TrayError::validation(format!(
                "invalid guid buffer: must be 16 bytes, got {}.",
                bytes.len()
            )));
        }
        Uuid::from_slice_le(bytes)
            .map(Guid)
            .map_err(|e| TrayError::validation(format!("invalid guid buffer: {}", e)))
    }

    /// The value as a single 128-bit integer (`Data1` in the high bits).
    pub fn as_u128(&self) -> u128 {
        self.0.as_u128()
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl From<Uuid> for Guid {
    fn from(value: Uuid) -> Self {
        Guid(value)
    }
}

impl FromStr for Guid {
    type Err = TrayError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Guid::parse(s)
    }
}

impl TryFrom<String> for Guid {
    type Error = TrayError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Guid::parse(&value)
    }
}

impl From<Guid> for String {
    fn from(value: Guid) -> Self {
        value.to_string()
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}
