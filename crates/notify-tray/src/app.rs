use crate::{
    AppResult,
    config::{Config, menu_ids},
};

use notify_tray_core::{
    AddIconRequest, CoreResult, Field, HandlerResult, IconId, IconOptions, Menu, MenuItemPatch,
    NotificationOptions, SelectEvent, SelectHandler, TrayEnvironment, TrayError,
    platform::{IconSize, SystemIcon},
};
#[cfg(not(windows))]
use notify_tray_core::platform::{HeadlessPlatform, TrayEventKind};

use std::{cell::Cell, rc::Rc};
#[cfg(not(windows))]
use std::sync::Arc;

use tracing::{debug, error, info, instrument};

/// Main application state.
///
/// Runs on the single-threaded runtime. The tray registry is `!Send`, so
/// handlers and the registry share this thread; native calls are marshalled
/// to the registry's own message-loop thread.
pub struct App {
    environment: TrayEnvironment,
    config: Config,
    #[cfg(not(windows))]
    shell: Arc<HeadlessPlatform>,
}

/// State shared by the demo icon's select handler.
struct DemoState {
    menu: Menu,
    base_tooltip: String,
    tooltip_changes: Cell<u32>,
    quiet: Cell<bool>,
}

impl App {
    /// Create the application on the platform's notification area.
    #[cfg(windows)]
    pub(crate) fn new(config: Config) -> Self {
        let environment = TrayEnvironment::new(config.registry.clone());
        Self {
            environment,
            config,
        }
    }

    /// Create the application on an emulated shell driven by a scripted
    /// session; hosts other than Windows have no notification area.
    #[cfg(not(windows))]
    pub(crate) fn new(config: Config) -> Self {
        let shell = Arc::new(HeadlessPlatform::new());
        let environment = TrayEnvironment::with_platform(shell.clone(), config.registry.clone());
        Self {
            environment,
            config,
            shell,
        }
    }

    /// Run until the Exit command or Ctrl+C.
    #[instrument(skip(self))]
    pub(crate) async fn run(self) -> AppResult<()> {
        info!("Notify-Tray starting");

        let id = self.install()?;
        info!(icon = %id, "Tray icon installed");

        #[cfg(not(windows))]
        self.script_session(id);

        loop {
            tokio::select! {
                result = self.environment.run_until_shutdown() => match result {
                    Ok(()) => break,
                    Err(e @ TrayError::Callback { .. }) => {
                        error!(error = %e, "Select handler failed");
                    }
                    Err(e) => return Err(e.into()),
                },

                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        error!(error = ?e, "Failed to listen for Ctrl+C");
                    }
                    info!("Shutdown requested");
                    self.environment.shutdown();
                    break;
                }
            }
        }

        info!("Notify-Tray shut down successfully");

        Ok(())
    }

    /// Create the menu and show the icon with its select handler.
    #[instrument(skip(self))]
    fn install(&self) -> AppResult<IconId> {
        let config = &self.config;
        let image = self
            .environment
            .load_system_icon(config.icon.system_icon, IconSize::Small)?;
        let menu = self.environment.create_menu(config.menu.clone())?;

        let quiet = menu
            .get_by_id(menu_ids::QUIET)
            .is_ok_and(|item| item.checked);
        let state = DemoState {
            menu,
            base_tooltip: config.icon.tooltip.clone(),
            tooltip_changes: Cell::new(0),
            quiet: Cell::new(quiet),
        };
        let handler: SelectHandler = Rc::new(
            move |environment: &TrayEnvironment, event: SelectEvent| -> HandlerResult {
                state.on_select(environment, event).map_err(Into::into)
            },
        );

        let options = IconOptions {
            icon: Field::Set(image),
            tooltip: Field::Set(config.icon.tooltip.clone()),
            on_select: Field::Set(handler),
            ..IconOptions::default()
        };
        let mut request = AddIconRequest::new(options).with_id(config.icon_id()?);
        if let Some(guid) = config.icon_guid()? {
            request = request.with_guid(guid);
        }

        Ok(self.environment.add_icon(request)?)
    }

    /// Click the icon and walk its menu on the emulated shell.
    #[cfg(not(windows))]
    fn script_session(&self, id: IconId) {
        info!("No notification area on this host, running a scripted session");

        for choice in [menu_ids::SHOW_NOTIFICATION, menu_ids::QUIET, menu_ids::EXIT] {
            self.shell.script_popup_choice(choice);
        }
        let events = [
            TrayEventKind::Select,
            TrayEventKind::ContextMenu,
            TrayEventKind::ContextMenu,
            TrayEventKind::ContextMenu,
        ];
        for kind in events {
            if !self.shell.post_tray_event(id.get(), kind, 0, 0) {
                error!(icon = %id, ?kind, "Scripted event not delivered");
            }
        }
    }
}

impl DemoState {
    fn on_select(&self, environment: &TrayEnvironment, event: SelectEvent) -> AppResult<()> {
        if !event.right_button {
            let text = format!("Selected at {}, {}", event.x, event.y);
            return Ok(self.notify(environment, event.icon, "Notify-Tray", &text)?);
        }

        let chosen = self.menu.show(event.x, event.y)?;
        match chosen {
            0 => debug!("Menu dismissed"),
            menu_ids::SHOW_NOTIFICATION => {
                self.notify(environment, event.icon, "Notify-Tray", "Hello from the tray")?;
            }
            menu_ids::CYCLE_TOOLTIP => {
                let changes = self.tooltip_changes.get() + 1;
                self.tooltip_changes.set(changes);
                let options = IconOptions {
                    tooltip: Field::Set(format!("{} ({})", self.base_tooltip, changes)),
                    ..IconOptions::default()
                };
                environment.update_icon(event.icon, options)?;
            }
            menu_ids::QUIET => {
                let quiet = !self.quiet.get();
                let patch = MenuItemPatch {
                    checked: Some(quiet),
                    ..MenuItemPatch::default()
                };
                self.menu.update_by_id(menu_ids::QUIET, patch)?;
                self.quiet.set(quiet);
                info!(quiet, "Notification sound toggled");
            }
            menu_ids::EXIT => {
                info!("Exit selected");
                environment.shutdown();
            }
            other => match image_for_command(other) {
                Some(system) => self.set_image(environment, event.icon, system)?,
                None => debug!(command = other, "No action for menu command"),
            },
        }
        Ok(())
    }

    fn notify(
        &self,
        environment: &TrayEnvironment,
        icon: IconId,
        title: &str,
        text: &str,
    ) -> CoreResult<()> {
        let notification = NotificationOptions {
            title: Some(title.to_string()),
            text: Some(text.to_string()),
            sound: Some(!self.quiet.get()),
            ..NotificationOptions::default()
        };
        let options = IconOptions {
            notification: Field::Set(notification),
            ..IconOptions::default()
        };
        environment.update_icon(icon, options)
    }

    fn set_image(
        &self,
        environment: &TrayEnvironment,
        icon: IconId,
        system: SystemIcon,
    ) -> CoreResult<()> {
        let image = environment.load_system_icon(system, IconSize::Small)?;
        let options = IconOptions {
            icon: Field::Set(image),
            ..IconOptions::default()
        };
        environment.update_icon(icon, options)
    }
}

fn image_for_command(command: u32) -> Option<SystemIcon> {
    match command {
        menu_ids::ICON_APPLICATION => Some(SystemIcon::Application),
        menu_ids::ICON_INFORMATION => Some(SystemIcon::Information),
        menu_ids::ICON_WARNING => Some(SystemIcon::Warning),
        menu_ids::ICON_ERROR => Some(SystemIcon::Error),
        _ => None,
    }
}
