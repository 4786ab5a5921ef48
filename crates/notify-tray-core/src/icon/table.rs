use crate::{CoreResult, Guid, IconImage, TrayError};

use std::{collections::BTreeMap, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

/// Per-registry icon identifier in `1..=0xFFFE`.
///
/// Unique while registered; may be reused after removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct IconId(u16);

impl IconId {
    /// Smallest valid id.
    pub const MIN: IconId = IconId(1);
    /// Largest valid id.
    pub const MAX: IconId = IconId(0xFFFE);

    /// Validate a raw id.
    ///
    /// # Errors
    ///
    /// Returns [`TrayError::Validation`] for 0 and 0xFFFF.
    #[track_caller]
    pub fn new(raw: u16) -> CoreResult<Self> {
        if raw < Self::MIN.0 || raw > Self::MAX.0 {
            return Err(TrayError::validation(format!(
                "icon id {} is outside {}..={}",
                raw,
                Self::MIN.0,
                Self::MAX.0
            )));
        }
        Ok(IconId(raw))
    }

    /// The raw value.
    pub fn get(self) -> u16 {
        self.0
    }

    fn next(self) -> IconId {
        if self.0 >= Self::MAX.0 {
            Self::MIN
        } else {
            IconId(self.0 + 1)
        }
    }
}

impl TryFrom<u16> for IconId {
    type Error = TrayError;

    fn try_from(value: u16) -> Result<Self, Self::Error> {
        IconId::new(value)
    }
}

impl From<IconId> for u16 {
    fn from(value: IconId) -> Self {
        value.0
    }
}

impl fmt::Display for IconId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque key for a selection handler held on the runtime thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackRef(pub(crate) u64);

/// Loop-side state for one registered icon.
#[derive(Debug, Clone, Default)]
pub(crate) struct IconRecord {
    pub(crate) guid: Option<Guid>,
    pub(crate) callback: Option<CallbackRef>,
    /// Keeps the shown image alive while the shell uses it.
    pub(crate) icon: Option<Arc<IconImage>>,
    /// Keeps the balloon image alive while the shell uses it.
    pub(crate) notification_icon: Option<Arc<IconImage>>,
}

/// Ordered registry of icon records, owned by the message-loop thread.
#[derive(Debug, Default)]
pub(crate) struct IconHandleTable {
    records: BTreeMap<IconId, Arc<IconRecord>>,
}

impl IconHandleTable {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    #[track_caller]
    pub(crate) fn insert(&mut self, id: IconId, record: IconRecord) -> CoreResult<()> {
        if self.records.contains_key(&id) {
            return Err(TrayError::validation(format!(
                "icon id {} is already registered",
                id
            )));
        }
        self.records.insert(id, Arc::new(record));
        Ok(())
    }

    pub(crate) fn get(&self, id: IconId) -> Option<Arc<IconRecord>> {
        self.records.get(&id).cloned()
    }

    /// Swap in a new record; holders of the old `Arc` keep their snapshot.
    #[track_caller]
    pub(crate) fn replace(&mut self, id: IconId, record: IconRecord) -> CoreResult<Arc<IconRecord>> {
        match self.records.get_mut(&id) {
            Some(slot) => Ok(std::mem::replace(slot, Arc::new(record))),
            None => Err(TrayError::validation(format!("icon id {} is not registered", id))),
        }
    }

    pub(crate) fn remove(&mut self, id: IconId) -> Option<Arc<IconRecord>> {
        self.records.remove(&id)
    }

    pub(crate) fn contains(&self, id: IconId) -> bool {
        self.records.contains_key(&id)
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn ids(&self) -> Vec<IconId> {
        self.records.keys().copied().collect()
    }

    /// First unused id at or after `hint`, wrapping around once.
    pub(crate) fn next_free_id(&self, hint: IconId) -> Option<IconId> {
        next_free_id(|id| self.records.contains_key(&id), hint)
    }

    pub(crate) fn drain(&mut self) -> Vec<(IconId, Arc<IconRecord>)> {
        std::mem::take(&mut self.records).into_iter().collect()
    }
}

/// First id at or after `hint` for which `taken` is false.
pub(crate) fn next_free_id(taken: impl Fn(IconId) -> bool, hint: IconId) -> Option<IconId> {
    let mut candidate = hint;
    for _ in IconId::MIN.0..=IconId::MAX.0 {
        if !taken(candidate) {
            return Some(candidate);
        }
        candidate = candidate.next();
    }
    None
}
