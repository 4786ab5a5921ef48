use crate::{
    AddIconRequest, IconOptions, LoopPhase, MenuItemDescriptor, MenuItemPatch, TrayError, encode,
    tests::headless_environment,
};

// Test constants
const OPEN_ID: u32 = 123;
const QUIT_ID: u32 = 456;

fn items() -> Vec<MenuItemDescriptor> {
    vec![
        MenuItemDescriptor::item(OPEN_ID, "Open"),
        MenuItemDescriptor::separator(),
        MenuItemDescriptor::submenu(
            "Options",
            vec![MenuItemDescriptor::item(789, "Verbose").checked(false)],
        ),
        MenuItemDescriptor::item(QUIT_ID, "Quit"),
    ]
}

/// WHAT: A menu can be shown, read and patched through the environment
/// WHY: Menu handles live on the loop thread and are reached only through it
#[test]
#[allow(clippy::unwrap_used)]
fn given_menu_when_showing_reading_and_patching_then_loop_side_state_changes() {
    // Given: A menu and a scripted choice
    let (platform, environment) = headless_environment();
    let menu = environment.create_menu(items()).unwrap();
    platform.script_popup_choice(QUIT_ID);

    // When: Showing it
    let chosen = menu.show(100, 200).unwrap();

    // Then: Scripted item returned
    assert_eq!(chosen, QUIT_ID);

    // When: Checking a nested item and renaming the first
    let check = MenuItemPatch {
        checked: Some(true),
        ..MenuItemPatch::default()
    };
    menu.update_by_id(789, check).unwrap();
    let rename = MenuItemPatch {
        text: Some("Open window".to_string()),
        ..MenuItemPatch::default()
    };
    menu.update_at(0, rename).unwrap();

    // Then: Reads reflect both patches
    assert!(menu.get_by_id(789).unwrap().checked);
    let first = menu.get_by_index(0).unwrap();
    assert_eq!(first.text.as_deref(), Some("Open window"));
    assert_eq!(first.id, Some(OPEN_ID));
    assert!(menu.get_by_index(1).unwrap().separator);
}

/// WHAT: A live menu keeps the loop running after the last icon is removed
/// WHY: Its native handle belongs to the loop thread
#[test]
#[allow(clippy::unwrap_used)]
fn given_live_menu_when_last_icon_removed_then_loop_stops_only_after_menu_dropped() {
    // Given: An icon and a menu
    let (platform, environment) = headless_environment();
    let added = environment
        .add_icon(AddIconRequest::new(IconOptions::default()))
        .unwrap();
    let menu = environment.create_menu(items()).unwrap();

    // When: Removing the icon
    environment.remove_icon(added).unwrap();

    // Then: Still running
    assert!(environment.is_pump_running());

    // When: Dropping the menu
    drop(menu);

    // Then: Menu destroyed and loop stopped
    assert_eq!(environment.loop_phase(), LoopPhase::Stopped);
    assert_eq!(platform.live_menus(), 0);
    assert_eq!(platform.live_windows(), 0);
}

/// WHAT: Menus can be built from raw templates, and short buffers are rejected
/// WHY: Hosts may ship prebuilt MENUEX resources
#[test]
#[allow(clippy::unwrap_used)]
fn given_raw_template_when_creating_menu_then_items_readable_and_short_buffer_rejected() {
    // Given: An encoded template and a truncated header
    let (_platform, environment) = headless_environment();
    let template = encode(&items());

    // When: Building from both
    let menu = environment.create_menu_from_template(template).unwrap();
    let short = environment.create_menu_from_template(vec![1, 0, 4]);

    // Then: The full template works, the short one is a validation error
    assert_eq!(
        menu.get_by_id(QUIT_ID).unwrap().text.as_deref(),
        Some("Quit")
    );
    assert!(matches!(short, Err(TrayError::Validation { .. })));
}

/// WHAT: Menus cannot be used after shutdown
/// WHY: Their handles were destroyed with the loop
#[test]
#[allow(clippy::unwrap_used)]
fn given_menu_when_environment_shut_down_then_registry_unavailable() {
    // Given: A menu
    let (platform, environment) = headless_environment();
    let menu = environment.create_menu(items()).unwrap();

    // When: Shutting down
    environment.shutdown();

    // Then: Menu calls rejected, handles released
    assert!(matches!(
        menu.show(0, 0),
        Err(TrayError::RegistryUnavailable { .. })
    ));
    assert_eq!(platform.live_menus(), 0);
}
