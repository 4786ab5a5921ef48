use crate::{
    MenuItemDescriptor, MenuItemPatch, TrayError, encode,
    menu::popup,
    platform::{HeadlessPlatform, ItemLocator, Platform, WindowRef},
};

// Test constants
const OPEN_ID: u32 = 123;
const CHECKED_ID: u32 = 789;
const DISABLED_ID: u32 = 790;
const QUIT_ID: u32 = 456;
const OWNER: WindowRef = WindowRef(0x42);

fn sample_tree() -> Vec<MenuItemDescriptor> {
    vec![
        MenuItemDescriptor::item(OPEN_ID, "Open"),
        MenuItemDescriptor::separator(),
        MenuItemDescriptor::submenu(
            "More",
            vec![
                MenuItemDescriptor::item(CHECKED_ID, "Checked").checked(true),
                MenuItemDescriptor::item(DISABLED_ID, "Disabled").disabled(),
            ],
        ),
        MenuItemDescriptor::item(QUIT_ID, "Quit"),
    ]
}

/// WHAT: Every leaf decodes back to its descriptor after building
/// WHY: The codec and the native menu must agree on types, states and text
#[test]
#[allow(clippy::unwrap_used)]
fn given_built_popup_when_decoding_leaves_then_descriptors_round_trip() {
    // Given: A popup built from a nested tree
    let platform = HeadlessPlatform::new();
    let menu = popup::build_popup(&platform, &sample_tree()).unwrap();

    // When: Decoding every leaf by command id
    let leaves = [
        MenuItemDescriptor::item(OPEN_ID, "Open"),
        MenuItemDescriptor::item(CHECKED_ID, "Checked").checked(true),
        MenuItemDescriptor::item(DISABLED_ID, "Disabled").disabled(),
        MenuItemDescriptor::item(QUIT_ID, "Quit"),
    ];

    // Then: Each matches its descriptor
    for leaf in &leaves {
        let id = leaf.id.unwrap();
        let decoded = popup::decode(&platform, menu, ItemLocator::Command(id)).unwrap();
        assert_eq!(&decoded, leaf);
    }
    let separator = popup::decode(&platform, menu, ItemLocator::Position(1)).unwrap();
    assert!(separator.separator);
    assert_eq!(separator.text, None);
}

/// WHAT: Building a popup leaves only the popup tree alive
/// WHY: The wrapping menu bar must be destroyed without taking the popup along
#[test]
#[allow(clippy::unwrap_used)]
fn given_tree_with_submenu_when_building_then_only_popup_handles_remain() {
    // Given: An emulated shell
    let platform = HeadlessPlatform::new();

    // When: Building a popup with one submenu
    let menu = popup::build_popup(&platform, &sample_tree()).unwrap();

    // Then: Popup plus submenu alive; destroying the popup frees both
    assert_eq!(platform.live_menus(), 2);
    platform.destroy_menu(menu).unwrap();
    assert_eq!(platform.live_menus(), 0);
}

/// WHAT: Short template buffers are rejected before any native call
/// WHY: A buffer without a header cannot be a template
#[test]
fn given_short_buffer_when_building_from_template_then_validation_error() {
    // Given: Seven bytes
    let platform = HeadlessPlatform::new();
    let bytes = [1u8, 0, 4, 0, 0, 0, 0];

    // When: Building
    let result = popup::build_popup_from_template(&platform, &bytes);

    // Then: Validation error and nothing allocated
    assert!(matches!(result, Err(TrayError::Validation { .. })));
    assert_eq!(platform.live_menus(), 0);
}

/// WHAT: A failure while detaching the popup releases every handle
/// WHY: Error paths must not leak native menus
#[test]
fn given_remove_menu_failure_when_building_then_error_names_call_and_bar_destroyed() {
    // Given: RemoveMenu set to fail
    let platform = HeadlessPlatform::new();
    platform.fail_next("RemoveMenu", 5);

    // When: Building
    let result = popup::build_popup_from_template(&platform, &encode(&[]));

    // Then: Os error for RemoveMenu and the bar (with its popup) destroyed
    let error = result.err();
    assert_eq!(error.as_ref().and_then(TrayError::os_code), Some(("RemoveMenu", 5)));
    assert_eq!(platform.live_menus(), 0);
}

/// WHAT: Patching text keeps the item's other state
/// WHY: Partial updates must not reset checked or disabled bits
#[test]
#[allow(clippy::unwrap_used)]
fn given_checked_item_when_patching_text_then_check_mark_preserved() {
    // Given: A popup with a checked item
    let platform = HeadlessPlatform::new();
    let menu = popup::build_popup(&platform, &sample_tree()).unwrap();

    // When: Changing only the text
    let patch = MenuItemPatch {
        text: Some("Still checked".to_string()),
        ..MenuItemPatch::default()
    };
    popup::update(&platform, menu, ItemLocator::Command(CHECKED_ID), &patch).unwrap();

    // Then: Text changed, check mark kept
    let decoded = popup::decode(&platform, menu, ItemLocator::Command(CHECKED_ID)).unwrap();
    assert_eq!(decoded.text.as_deref(), Some("Still checked"));
    assert!(decoded.checked);
    assert!(!decoded.disabled);
}

/// WHAT: Replacing a submenu destroys the old one
/// WHY: Each submenu replacement would otherwise leak a handle
#[test]
#[allow(clippy::unwrap_used)]
fn given_submenu_item_when_replacing_children_then_old_submenu_destroyed() {
    // Given: A popup whose third item has a submenu
    let platform = HeadlessPlatform::new();
    let menu = popup::build_popup(&platform, &sample_tree()).unwrap();
    let before = platform.live_menus();

    // When: Replacing the submenu
    let patch = MenuItemPatch {
        submenu: Some(vec![MenuItemDescriptor::item(900, "New")]),
        ..MenuItemPatch::default()
    };
    popup::update(&platform, menu, ItemLocator::Position(2), &patch).unwrap();

    // Then: Same number of live menus and the new child is reachable
    assert_eq!(platform.live_menus(), before);
    let child = popup::decode(&platform, menu, ItemLocator::Command(900)).unwrap();
    assert_eq!(child.text.as_deref(), Some("New"));
    assert!(popup::decode(&platform, menu, ItemLocator::Command(CHECKED_ID)).is_err());
}

/// WHAT: Showing a menu returns the scripted choice
/// WHY: The chosen command id is the only result of a popup
#[test]
#[allow(clippy::unwrap_used)]
fn given_scripted_choice_when_showing_then_choice_returned_and_recorded() {
    // Given: A popup and a scripted choice
    let platform = HeadlessPlatform::new();
    let menu = popup::build_popup(&platform, &sample_tree()).unwrap();
    platform.script_popup_choice(QUIT_ID);

    // When: Showing it twice
    let first = popup::show(&platform, menu, OWNER, 10, -20);
    let second = popup::show(&platform, menu, OWNER, 0, 0);

    // Then: Scripted id, then dismissed
    assert_eq!(first, QUIT_ID);
    assert_eq!(second, 0);
    let popups = platform.popups();
    assert_eq!(popups.len(), 2);
    assert_eq!((popups[0].x, popups[0].y), (10, -20));
    assert_eq!(popups[0].owner, OWNER);
}
