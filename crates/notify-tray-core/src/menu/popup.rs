//! Native popup menus built from templates.
//!
//! All functions here must run on the thread that owns the menu handles.

use crate::{
    CoreResult, TrayError,
    menu::{MenuItemDescriptor, MenuItemPatch, template},
    platform::{
        ItemLocator, MenuItemInfo, MenuRef, Platform, WindowRef,
        consts::{
            MFS_CHECKED, MFS_DISABLED, MFT_SEPARATOR, MFT_STRING, MIIM_FTYPE, MIIM_ID, MIIM_STATE,
            MIIM_STRING, MIIM_SUBMENU,
        },
    },
};

use tracing::{debug, warn};

/// Destroys the held menu on drop unless released.
pub(crate) struct MenuGuard<'a> {
    platform: &'a dyn Platform,
    menu: Option<MenuRef>,
}

impl<'a> MenuGuard<'a> {
    pub(crate) fn new(platform: &'a dyn Platform, menu: MenuRef) -> Self {
        Self {
            platform,
            menu: Some(menu),
        }
    }

    pub(crate) fn release(mut self) -> Option<MenuRef> {
        self.menu.take()
    }
}

impl Drop for MenuGuard<'_> {
    fn drop(&mut self) {
        if let Some(menu) = self.menu.take()
            && let Err(e) = self.platform.destroy_menu(menu)
        {
            warn!(menu = ?menu, code = e.code, "DestroyMenu failed");
        }
    }
}

/// Encode `items` and load them as an owned popup menu.
pub fn build_popup(platform: &dyn Platform, items: &[MenuItemDescriptor]) -> CoreResult<MenuRef> {
    build_popup_from_template(platform, &template::encode(items))
}

/// Load a caller-supplied `MENUEX` template and unwrap its first submenu.
///
/// # Errors
///
/// Returns [`TrayError::Validation`] when the buffer is shorter than the
/// template header, or the failing native call otherwise. No handle is
/// leaked on any error path.
#[track_caller]
pub fn build_popup_from_template(platform: &dyn Platform, bytes: &[u8]) -> CoreResult<MenuRef> {
    if bytes.len() < template::HEADER_SIZE {
        return Err(TrayError::validation(format!(
            "menu template must be at least {} bytes, got {}",
            template::HEADER_SIZE,
            bytes.len()
        )));
    }

    platform.clear_last_error();
    let bar_menu = platform.load_menu_indirect(bytes)?;
    let bar = MenuGuard::new(platform, bar_menu);

    let popup = platform.get_sub_menu(bar_menu, 0)?;
    // Once detached the popup survives the bar's destruction.
    platform.remove_menu(bar_menu, 0)?;
    drop(bar);

    debug!(menu = ?popup, "Popup menu built");
    Ok(popup)
}

/// Read one item back as a descriptor (without its submenu).
#[track_caller]
pub fn decode(
    platform: &dyn Platform,
    menu: MenuRef,
    locator: ItemLocator,
) -> CoreResult<MenuItemDescriptor> {
    let mut info = MenuItemInfo {
        mask: MIIM_ID | MIIM_FTYPE | MIIM_STATE,
        ..MenuItemInfo::default()
    };
    platform.clear_last_error();
    platform.get_menu_item_info(menu, locator, &mut info)?;

    let text = if info.kind == MFT_STRING {
        let mut probe = MenuItemInfo {
            mask: MIIM_STRING,
            ..MenuItemInfo::default()
        };
        platform.get_menu_item_info(menu, locator, &mut probe)?;

        let mut read = MenuItemInfo {
            mask: MIIM_STRING,
            text: Some(vec![0; probe.text_len as usize + 1]),
            ..MenuItemInfo::default()
        };
        platform.get_menu_item_info(menu, locator, &mut read)?;

        let buffer = read.text.unwrap_or_default();
        let len = (read.text_len as usize).min(buffer.len());
        Some(String::from_utf16_lossy(&buffer[..len]))
    } else {
        None
    };

    Ok(MenuItemDescriptor {
        id: Some(info.id),
        text,
        separator: info.kind & MFT_SEPARATOR != 0,
        disabled: info.state & MFS_DISABLED != 0,
        checked: info.state & MFS_CHECKED != 0,
        children: None,
    })
}

/// Apply a partial update to one item.
///
/// Unpatched state bits are preserved. A replaced submenu is destroyed after
/// the new one is attached.
#[track_caller]
pub fn update(
    platform: &dyn Platform,
    menu: MenuRef,
    locator: ItemLocator,
    patch: &MenuItemPatch,
) -> CoreResult<()> {
    if patch.is_empty() {
        return Ok(());
    }

    platform.clear_last_error();

    let mut current = MenuItemInfo {
        mask: MIIM_STATE | MIIM_SUBMENU,
        ..MenuItemInfo::default()
    };
    platform.get_menu_item_info(menu, locator, &mut current)?;

    let mut info = MenuItemInfo::default();

    if let Some(id) = patch.id {
        info.mask |= MIIM_ID;
        info.id = id;
    }
    if let Some(separator) = patch.separator {
        info.mask |= MIIM_FTYPE;
        info.kind = if separator { MFT_SEPARATOR } else { MFT_STRING };
    }
    if let Some(text) = &patch.text {
        info.mask |= MIIM_STRING;
        let mut units: Vec<u16> = text.encode_utf16().collect();
        info.text_len = units.len() as u32;
        units.push(0);
        info.text = Some(units);
    }
    if patch.disabled.is_some() || patch.checked.is_some() {
        let mut state = current.state;
        if let Some(disabled) = patch.disabled {
            state = if disabled {
                state | MFS_DISABLED
            } else {
                state & !MFS_DISABLED
            };
        }
        if let Some(checked) = patch.checked {
            state = if checked {
                state | MFS_CHECKED
            } else {
                state & !MFS_CHECKED
            };
        }
        info.mask |= MIIM_STATE;
        info.state = state;
    }

    let replacement = match &patch.submenu {
        Some(children) => {
            let built = build_popup(platform, children)?;
            info.mask |= MIIM_SUBMENU;
            info.submenu = Some(built);
            Some(MenuGuard::new(platform, built))
        }
        None => None,
    };

    platform.set_menu_item_info(menu, locator, &info)?;

    if let Some(guard) = replacement {
        guard.release();
        if let Some(old) = current.submenu
            && let Err(e) = platform.destroy_menu(old)
        {
            warn!(menu = ?old, code = e.code, "DestroyMenu failed for replaced submenu");
        }
    }

    Ok(())
}

/// Show `menu` at screen coordinates and return the chosen id, 0 if none.
pub fn show(platform: &dyn Platform, menu: MenuRef, owner: WindowRef, x: i32, y: i32) -> u32 {
    let chosen = platform.track_popup_menu(menu, x, y, owner);
    debug!(menu = ?menu, x, y, chosen, "Popup menu closed");
    chosen
}
