//! `Shell_NotifyIconW` wrapper keyed by icon id and optional GUID.

use crate::{
    CoreResult, Guid, IconId, TrayError,
    icon::options::{Field, NotificationOptions, ShellOptions},
    platform::{
        IconSize, NotifyIconData, NotifyIconOp, Platform, WindowRef,
        consts::{
            INFO_CAPACITY, INFO_TITLE_CAPACITY, NIF_GUID, NIF_ICON, NIF_INFO, NIF_MESSAGE,
            NIF_REALTIME, NIF_SHOWTIP, NIF_STATE, NIF_TIP, NIIF_LARGE_ICON, NIIF_NOSOUND,
            NIIF_RESPECT_QUIET_TIME, NIIF_USER, NIS_HIDDEN, NOTIFYICON_VERSION_4, TIP_CAPACITY,
        },
    },
};

use std::{collections::HashMap, sync::Arc};

use tracing::{debug, instrument, warn};

/// Truncate to at most `max_units` UTF-16 units without splitting a pair.
pub(crate) fn truncate_utf16(text: &str, max_units: usize) -> String {
    let mut units = 0;
    text.chars()
        .take_while(|c| {
            units += c.len_utf16();
            units <= max_units
        })
        .collect()
}

/// Adds, modifies and deletes shell icons for one message window.
pub(crate) struct NotifyIconGateway {
    platform: Arc<dyn Platform>,
    window: Option<WindowRef>,
    callback_message: u32,
    added: HashMap<IconId, Option<Guid>>,
}

impl NotifyIconGateway {
    pub(crate) fn new(platform: Arc<dyn Platform>, callback_message: u32) -> Self {
        Self {
            platform,
            window: None,
            callback_message,
            added: HashMap::new(),
        }
    }

    pub(crate) fn bind(&mut self, window: WindowRef) {
        self.window = Some(window);
    }

    pub(crate) fn is_added(&self, id: IconId) -> bool {
        self.added.contains_key(&id)
    }

    fn identity(&self, id: IconId, guid: Option<Guid>) -> NotifyIconData {
        NotifyIconData {
            window: self.window,
            id: u32::from(id.get()),
            guid,
            flags: if guid.is_some() { NIF_GUID } else { 0 },
            ..NotifyIconData::default()
        }
    }

    #[track_caller]
    fn call(&self, op: NotifyIconOp, data: &NotifyIconData) -> CoreResult<()> {
        self.platform.clear_last_error();
        self.platform
            .shell_notify_icon(op, data)
            .map_err(TrayError::from)
    }

    /// Add the icon and upgrade it to protocol version 4.
    ///
    /// With a GUID and `replace`, an icon left under the same GUID by a
    /// crashed process is deleted first. If the version upgrade fails the
    /// icon stays added and tracked, and the error is returned.
    #[instrument(skip(self, options))]
    pub(crate) fn add(
        &mut self,
        id: IconId,
        guid: Option<Guid>,
        replace: bool,
        options: &ShellOptions,
    ) -> CoreResult<()> {
        if let Some(guid) = guid
            && replace
            && let Err(e) = self.call(NotifyIconOp::Delete, &self.identity(id, Some(guid)))
        {
            debug!(%guid, error = %e, "No previous icon to replace");
        }

        let mut data = self.identity(id, guid);
        data.flags |= NIF_MESSAGE;
        data.callback_message = self.callback_message;
        self.apply(&mut data, options);
        self.call(NotifyIconOp::Add, &data)?;
        self.added.insert(id, guid);

        let version = NotifyIconData {
            version: NOTIFYICON_VERSION_4,
            ..self.identity(id, guid)
        };
        self.call(NotifyIconOp::SetVersion, &version)?;

        debug!(icon = %id, "Shell icon added");
        Ok(())
    }

    /// Apply only the fields present in `options`.
    #[instrument(skip(self, options))]
    pub(crate) fn modify(&mut self, id: IconId, options: &ShellOptions) -> CoreResult<()> {
        let Some(&guid) = self.added.get(&id) else {
            return Err(TrayError::validation(format!("icon {} was never added", id)));
        };

        let identity = self.identity(id, guid);
        let mut data = identity.clone();
        self.apply(&mut data, options);
        if data == identity {
            return Ok(());
        }

        self.call(NotifyIconOp::Modify, &data)
    }

    /// Delete the icon; unknown ids succeed without an OS call.
    ///
    /// The id stays tracked when the delete fails, so it can be retried.
    #[instrument(skip(self))]
    pub(crate) fn remove(&mut self, id: IconId) -> CoreResult<()> {
        let Some(&guid) = self.added.get(&id) else {
            return Ok(());
        };
        self.call(NotifyIconOp::Delete, &self.identity(id, guid))?;
        self.added.remove(&id);
        Ok(())
    }

    /// Delete every tracked icon, logging failures.
    pub(crate) fn remove_all(&mut self) {
        let ids: Vec<IconId> = self.added.keys().copied().collect();
        for id in ids {
            if let Err(e) = self.remove(id) {
                warn!(icon = %id, error = %e, "Failed to delete shell icon during teardown");
            }
        }
    }

    fn apply(&self, data: &mut NotifyIconData, options: &ShellOptions) {
        if let Some(hidden) = options.hidden {
            data.flags |= NIF_STATE;
            data.state_mask |= NIS_HIDDEN;
            if hidden {
                data.state |= NIS_HIDDEN;
            }
        }

        match &options.icon {
            Field::Keep => {}
            Field::Clear => {
                data.flags |= NIF_ICON;
                data.icon = None;
            }
            Field::Set(image) => {
                data.flags |= NIF_ICON;
                data.icon = Some(image.raw());
            }
        }

        match &options.tooltip {
            Field::Keep => {}
            Field::Clear => {
                data.flags |= NIF_TIP | NIF_SHOWTIP;
                data.tip.clear();
            }
            Field::Set(tip) => {
                data.flags |= NIF_TIP | NIF_SHOWTIP;
                data.tip = truncate_utf16(tip, TIP_CAPACITY - 1);
            }
        }

        match &options.notification {
            Field::Keep => {}
            Field::Clear => {
                data.flags |= NIF_INFO;
                data.info_title.clear();
                data.info.clear();
            }
            Field::Set(notification) => self.apply_notification(data, notification),
        }
    }

    fn apply_notification(&self, data: &mut NotifyIconData, notification: &NotificationOptions) {
        data.flags |= NIF_INFO;
        if notification.realtime.unwrap_or(false) {
            data.flags |= NIF_REALTIME;
        }
        if !notification.sound.unwrap_or(true) {
            data.info_flags |= NIIF_NOSOUND;
        }
        if notification.respect_quiet_time.unwrap_or(true) {
            data.info_flags |= NIIF_RESPECT_QUIET_TIME;
        }
        if let Field::Set(image) = &notification.icon {
            data.info_flags |= NIIF_USER;
            data.balloon_icon = Some(image.raw());
            let (large_width, _) = self.platform.icon_dimensions(IconSize::Large);
            if image.width() == large_width {
                data.info_flags |= NIIF_LARGE_ICON;
            }
        }
        data.info_title = truncate_utf16(
            notification.title.as_deref().unwrap_or(""),
            INFO_TITLE_CAPACITY - 1,
        );
        data.info = truncate_utf16(notification.text.as_deref().unwrap_or(""), INFO_CAPACITY - 1);
    }
}
