//! Notify-tray Core Library
//!
//! System-tray icons, popup menus and selection callbacks for a
//! single-threaded runtime. Native handles live on a dedicated message-loop
//! thread; handlers run on the thread that owns the [`TrayEnvironment`].
//!
//! # Example
//!
//! ```no_run
//! use notify_tray_core::{
//!     AddIconRequest, CoreResult, Field, HandlerResult, IconOptions, RegistryConfig, SelectEvent,
//!     SelectHandler, TrayEnvironment,
//!     platform::{IconSize, SystemIcon},
//! };
//!
//! use std::rc::Rc;
//!
//! fn main() -> CoreResult<()> {
//!     let environment = TrayEnvironment::new(RegistryConfig::default());
//!     let image = environment.load_system_icon(SystemIcon::Application, IconSize::Small)?;
//!
//!     let on_select: SelectHandler = Rc::new(
//!         |_: &TrayEnvironment, event: SelectEvent| -> HandlerResult {
//!             println!("Selected at {},{}", event.x, event.y);
//!             Ok(())
//!         },
//!     );
//!     let id = environment.add_icon(AddIconRequest::new(IconOptions {
//!         icon: Field::Set(image),
//!         tooltip: Field::Set("Hello".to_string()),
//!         on_select: Field::Set(on_select),
//!         ..IconOptions::default()
//!     }))?;
//!
//!     environment.dispatch_pending()?;
//!     environment.remove_icon(id)?;
//!     Ok(())
//! }
//! ```

mod config;
mod environment;
mod error;
mod guid;
mod icon;
mod menu;
mod message_loop;
pub mod platform;
mod runtime;

pub use {
    config::RegistryConfig,
    environment::{AddIconRequest, Menu, TrayEnvironment},
    error::{HandlerError, Result as CoreResult, TrayError},
    guid::Guid,
    icon::{
        CallbackRef, Field, IconId, IconImage, IconOptions, NotificationOptions, SelectEvent,
        SelectHandler,
    },
    menu::{
        MAX_TEMPLATE_DEPTH, MenuItemDescriptor, MenuItemPatch, TemplateItem, encode, parse_template,
        template_size,
    },
    message_loop::LoopPhase,
};

/// Outcome of a selection handler.
pub type HandlerResult = std::result::Result<(), HandlerError>;

#[cfg(test)]
mod tests;
