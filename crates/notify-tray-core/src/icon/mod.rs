pub(crate) mod gateway;
mod image;
mod options;
pub(crate) mod table;

pub use {
    image::IconImage,
    options::{Field, IconOptions, NotificationOptions, SelectEvent, SelectHandler},
    table::{CallbackRef, IconId},
};

pub(crate) use {
    gateway::NotifyIconGateway,
    options::ShellOptions,
    table::{IconHandleTable, IconRecord},
};
