mod descriptor;
pub(crate) mod popup;
mod template;

pub use {
    descriptor::{MenuItemDescriptor, MenuItemPatch},
    template::{MAX_TEMPLATE_DEPTH, TemplateItem, encode, parse_template, template_size},
};
