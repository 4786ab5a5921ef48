//! `MENUEX` in-memory template layout.
//!
//! ```text
//! header   u16 version = 1, u16 offset = 4, u32 help id = 0
//! item     u32 type, u32 state, u32 id, u16 flags,
//!          UTF-16 text + NUL, zero padding to a 4-byte boundary
//! submenu  item with flags & 0x01, then u32 help id and its item list
//! ```
//!
//! The encoded tree is wrapped in a synthetic `"root"` popup so that loading
//! it yields a menu bar whose first submenu is the popup itself.

use crate::{
    CoreResult, TrayError,
    menu::MenuItemDescriptor,
    platform::consts::{MF_END, MF_POPUP_EX, MFS_DISABLED},
};

pub(crate) const HEADER_SIZE: usize = 8;
const TEMPLATE_VERSION: u16 = 1;
const HEADER_OFFSET: u16 = 4;
const ITEM_FIXED_SIZE: usize = 14;
const HELP_ID_SIZE: usize = 4;
const ROOT_TEXT: &str = "root";
const PLACEHOLDER_TEXT: &str = "Empty";
/// Deepest item-list nesting [`parse_template`] accepts, counting the top level.
pub const MAX_TEMPLATE_DEPTH: usize = 32;

/// One item read back from a template by [`parse_template`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TemplateItem {
    /// `MFT_*` type bits.
    pub kind: u32,
    /// `MFS_*` state bits.
    pub state: u32,
    /// Command id.
    pub id: u32,
    /// Raw item flags (last item, has submenu).
    pub flags: u16,
    /// Item text without the terminator.
    pub text: String,
    /// Submenu items when the item is a popup.
    pub children: Option<Vec<TemplateItem>>,
}

fn text_units(text: &str) -> usize {
    text.encode_utf16().count()
}

/// Size of one item header plus its padded text, excluding any submenu.
fn item_size(units: usize) -> usize {
    ITEM_FIXED_SIZE + 2 * units + if units % 2 == 1 { 4 } else { 2 }
}

fn descriptor_size(item: &MenuItemDescriptor) -> usize {
    let own = item_size(text_units(item.text.as_deref().unwrap_or("")));
    match &item.children {
        Some(children) => own + HELP_ID_SIZE + list_size(children),
        None => own,
    }
}

fn list_size(items: &[MenuItemDescriptor]) -> usize {
    if items.is_empty() {
        return item_size(text_units(PLACEHOLDER_TEXT));
    }
    items.iter().map(descriptor_size).sum()
}

/// Exact byte length [`encode`] produces for `items`.
pub fn template_size(items: &[MenuItemDescriptor]) -> usize {
    HEADER_SIZE + item_size(text_units(ROOT_TEXT)) + HELP_ID_SIZE + list_size(items)
}

/// Encode `items` as a complete `MENUEX` template.
pub fn encode(items: &[MenuItemDescriptor]) -> Vec<u8> {
    let size = template_size(items);
    let mut writer = TemplateWriter {
        buf: Vec::with_capacity(size),
    };

    writer.u16(TEMPLATE_VERSION);
    writer.u16(HEADER_OFFSET);
    writer.u32(0);
    writer.item(0, 0, 0, MF_END | MF_POPUP_EX, ROOT_TEXT);
    writer.u32(0);
    writer.list(items);

    debug_assert_eq!(writer.buf.len(), size);
    writer.buf
}

struct TemplateWriter {
    buf: Vec<u8>,
}

impl TemplateWriter {
    fn u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    fn item(&mut self, kind: u32, state: u32, id: u32, flags: u16, text: &str) {
        self.u32(kind);
        self.u32(state);
        self.u32(id);
        self.u16(flags);
        for unit in text.encode_utf16() {
            self.u16(unit);
        }
        self.u16(0);
        while self.buf.len() % 4 != 0 {
            self.buf.push(0);
        }
    }

    fn list(&mut self, items: &[MenuItemDescriptor]) {
        if items.is_empty() {
            self.item(0, MFS_DISABLED, 0, MF_END, PLACEHOLDER_TEXT);
            return;
        }

        let last = items.len() - 1;
        for (index, item) in items.iter().enumerate() {
            let mut flags = if index == last { MF_END } else { 0 };
            if item.children.is_some() {
                flags |= MF_POPUP_EX;
            }

            self.item(
                item.type_bits(),
                item.state_bits(),
                item.id.unwrap_or(0),
                flags,
                item.text.as_deref().unwrap_or(""),
            );

            if let Some(children) = &item.children {
                self.u32(0);
                self.list(children);
            }
        }
    }
}

/// Read a `MENUEX` template back into its item tree.
///
/// Returns the top-level list; for templates produced by [`encode`] that is
/// the single synthetic root item.
///
/// # Errors
///
/// Returns [`TrayError::Validation`] for an unknown version, a truncated
/// item, unterminated text or nesting past [`MAX_TEMPLATE_DEPTH`].
#[track_caller]
pub fn parse_template(bytes: &[u8]) -> CoreResult<Vec<TemplateItem>> {
    let mut reader = TemplateReader {
        bytes,
        pos: 0,
        depth: 0,
    };

    let version = reader.u16()?;
    let offset = reader.u16()?;
    if version != TEMPLATE_VERSION {
        return Err(TrayError::validation(format!(
            "menu template version {} is not supported",
            version
        )));
    }

    reader.pos = 4 + usize::from(offset);
    if reader.pos > bytes.len() {
        return Err(TrayError::validation("menu template header offset out of range"));
    }

    reader.list()
}

struct TemplateReader<'a> {
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
}

impl TemplateReader<'_> {
    #[track_caller]
    fn take<const N: usize>(&mut self) -> CoreResult<[u8; N]> {
        let end = self.pos + N;
        let chunk = self
            .bytes
            .get(self.pos..end)
            .and_then(|slice| <[u8; N]>::try_from(slice).ok())
            .ok_or_else(|| {
                TrayError::validation(format!("menu template truncated at byte {}", self.pos))
            })?;
        self.pos = end;
        Ok(chunk)
    }

    #[track_caller]
    fn u16(&mut self) -> CoreResult<u16> {
        self.take::<2>().map(u16::from_le_bytes)
    }

    #[track_caller]
    fn u32(&mut self) -> CoreResult<u32> {
        self.take::<4>().map(u32::from_le_bytes)
    }

    #[track_caller]
    fn list(&mut self) -> CoreResult<Vec<TemplateItem>> {
        if self.depth >= MAX_TEMPLATE_DEPTH {
            return Err(TrayError::validation(format!(
                "menu template nests deeper than {} levels",
                MAX_TEMPLATE_DEPTH
            )));
        }
        self.depth += 1;
        let mut items = Vec::new();
        loop {
            let item = self.item()?;
            let last = item.flags & MF_END != 0;
            items.push(item);
            if last {
                self.depth -= 1;
                return Ok(items);
            }
        }
    }

    #[track_caller]
    fn item(&mut self) -> CoreResult<TemplateItem> {
        let kind = self.u32()?;
        let state = self.u32()?;
        let id = self.u32()?;
        let flags = self.u16()?;

        let mut units = Vec::new();
        loop {
            match self.u16() {
                Ok(0) => break,
                Ok(unit) => units.push(unit),
                Err(_) => {
                    return Err(TrayError::validation(
                        "menu template item text is not terminated",
                    ));
                }
            }
        }
        self.pos = self.pos.next_multiple_of(4);

        let children = if flags & MF_POPUP_EX != 0 {
            self.u32()?;
            Some(self.list()?)
        } else {
            None
        };

        Ok(TemplateItem {
            kind,
            state,
            id,
            flags,
            text: String::from_utf16_lossy(&units),
            children,
        })
    }
}
