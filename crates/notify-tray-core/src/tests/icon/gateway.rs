use crate::{
    Field, Guid, IconId, IconImage, NotificationOptions, TrayError,
    icon::{NotifyIconGateway, ShellOptions, gateway::truncate_utf16},
    platform::{
        HeadlessPlatform, NotifyIconOp, WindowRef,
        consts::{
            E_FAIL, NIF_GUID, NIF_ICON, NIF_INFO, NIF_MESSAGE, NIF_REALTIME, NIF_TIP, NIIF_LARGE_ICON,
            NIIF_NOSOUND, NIIF_RESPECT_QUIET_TIME, NIIF_USER, NOTIFYICON_VERSION_4,
        },
    },
};

use std::sync::Arc;

// Test constants
const CALLBACK_MESSAGE: u32 = 0x0402;
const WINDOW: WindowRef = WindowRef(0x100);
const GUID_TEXT: &str = "6b5f2d8e-3c4a-4e1b-9f0d-2a7c8e9b1d3f";

fn gateway(platform: &Arc<HeadlessPlatform>) -> NotifyIconGateway {
    let mut gateway = NotifyIconGateway::new(platform.clone(), CALLBACK_MESSAGE);
    gateway.bind(WINDOW);
    gateway
}

fn tooltip(text: &str) -> ShellOptions {
    ShellOptions {
        tooltip: Field::Set(text.to_string()),
        ..ShellOptions::default()
    }
}

/// WHAT: Adding an icon sends ADD with the callback message, then SETVERSION 4
/// WHY: Version 4 is what makes the shell report coordinates and icon ids
#[test]
#[allow(clippy::unwrap_used)]
fn given_new_icon_when_adding_then_add_then_setversion() {
    // Given: A gateway on an empty shell
    let platform = Arc::new(HeadlessPlatform::new());
    let mut gateway = gateway(&platform);
    let id = IconId::new(1).unwrap();

    // When: Adding with a tooltip
    gateway.add(id, None, true, &tooltip("T")).unwrap();

    // Then: Two calls, and the shell shows the icon at version 4
    let journal = platform.journal();
    assert_eq!(journal.len(), 2);
    assert_eq!(journal[0].op, NotifyIconOp::Add);
    assert_ne!(journal[0].flags & NIF_MESSAGE, 0);
    assert_ne!(journal[0].flags & NIF_TIP, 0);
    assert_eq!(journal[1].op, NotifyIconOp::SetVersion);

    let icon = platform.shell_icon(1).unwrap();
    assert_eq!(icon.tooltip, "T");
    assert_eq!(icon.callback_message, CALLBACK_MESSAGE);
    assert_eq!(icon.window, Some(WINDOW));
    assert_eq!(icon.version, NOTIFYICON_VERSION_4);
}

/// WHAT: With a GUID and replace, a best-effort delete precedes the add
/// WHY: A crashed process can leave an icon holding the GUID
#[test]
#[allow(clippy::unwrap_used)]
fn given_guid_without_stale_icon_when_adding_then_failed_delete_is_ignored() {
    // Given: No stale icon for the GUID
    let platform = Arc::new(HeadlessPlatform::new());
    let mut gateway = gateway(&platform);
    let guid = Guid::parse(GUID_TEXT).unwrap();

    // When: Adding with replace
    let result = gateway.add(IconId::new(3).unwrap(), Some(guid), true, &tooltip("G"));

    // Then: Delete failed quietly, add succeeded, GUID flag used throughout
    assert!(result.is_ok());
    let journal = platform.journal();
    assert_eq!(journal[0].op, NotifyIconOp::Delete);
    assert!(!journal[0].succeeded);
    assert!(journal.iter().all(|call| call.flags & NIF_GUID != 0));
    assert!(platform.shell_icon_by_guid(guid).is_some());
}

/// WHAT: A failed version upgrade is reported but the icon stays tracked
/// WHY: The icon is already visible and must remain removable
#[test]
#[allow(clippy::unwrap_used)]
fn given_setversion_failure_when_adding_then_error_and_icon_still_added() {
    // Given: SETVERSION set to fail
    let platform = Arc::new(HeadlessPlatform::new());
    platform.fail_next_shell(NotifyIconOp::SetVersion, E_FAIL);
    let mut gateway = gateway(&platform);
    let id = IconId::new(2).unwrap();

    // When: Adding
    let result = gateway.add(id, None, true, &tooltip("T"));

    // Then: Os error, tracked, and removable
    assert_eq!(
        result.as_ref().err().and_then(TrayError::os_code),
        Some(("Shell_NotifyIconW", E_FAIL))
    );
    assert!(gateway.is_added(id));
    gateway.remove(id).unwrap();
    assert!(platform.shell_icons().is_empty());
}

/// WHAT: Modify without changes makes no shell call
/// WHY: Keep-only updates must not touch the shell
#[test]
#[allow(clippy::unwrap_used)]
fn given_keep_only_options_when_modifying_then_no_shell_call() {
    // Given: An added icon
    let platform = Arc::new(HeadlessPlatform::new());
    let mut gateway = gateway(&platform);
    let id = IconId::new(1).unwrap();
    gateway.add(id, None, true, &tooltip("T")).unwrap();
    let calls = platform.journal().len();

    // When: Modifying with nothing set
    gateway.modify(id, &ShellOptions::default()).unwrap();

    // Then: No new call
    assert_eq!(platform.journal().len(), calls);
}

/// WHAT: Unknown ids cannot be modified
/// WHY: Modify addresses an icon this gateway added
#[test]
#[allow(clippy::unwrap_used)]
fn given_unknown_id_when_modifying_then_validation_error() {
    // Given: An empty gateway
    let platform = Arc::new(HeadlessPlatform::new());
    let mut gateway = gateway(&platform);

    // When: Modifying id 9
    let result = gateway.modify(IconId::new(9).unwrap(), &tooltip("T"));

    // Then: Validation error, no shell call
    assert!(matches!(result, Err(TrayError::Validation { .. })));
    assert!(platform.journal().is_empty());
}

/// WHAT: Notification options map to NIF_INFO and NIIF flags
/// WHY: Sound, quiet time, realtime and custom images are flag-driven
#[test]
#[allow(clippy::unwrap_used)]
fn given_notification_with_large_image_when_modifying_then_info_flags_set() {
    // Given: An added icon and a 32 px balloon image
    let platform = Arc::new(HeadlessPlatform::new());
    let mut gateway = gateway(&platform);
    let id = IconId::new(1).unwrap();
    gateway.add(id, None, true, &ShellOptions::default()).unwrap();
    let image = IconImage::owned(platform.clone(), platform.create_icon(), 32, 32);

    let options = ShellOptions {
        notification: Field::Set(NotificationOptions {
            title: Some("Title".to_string()),
            text: Some("Body".to_string()),
            sound: Some(false),
            realtime: Some(true),
            icon: Field::Set(image.clone()),
            ..NotificationOptions::default()
        }),
        ..ShellOptions::default()
    };

    // When: Modifying
    gateway.modify(id, &options).unwrap();

    // Then: Balloon shown with the expected flags
    let last = platform.journal().pop().unwrap();
    assert_eq!(last.op, NotifyIconOp::Modify);
    assert_ne!(last.flags & NIF_INFO, 0);
    assert_ne!(last.flags & NIF_REALTIME, 0);
    assert_eq!(last.flags & NIF_ICON, 0);

    let icon = platform.shell_icon(1).unwrap();
    assert_eq!(icon.info_title, "Title");
    assert_eq!(icon.info_text, "Body");
    assert_eq!(
        icon.info_flags,
        NIIF_NOSOUND | NIIF_RESPECT_QUIET_TIME | NIIF_USER | NIIF_LARGE_ICON
    );
    assert_eq!(icon.balloon_icon, Some(image.raw()));
}

/// WHAT: Removing twice makes one shell call
/// WHY: Remove is idempotent
#[test]
#[allow(clippy::unwrap_used)]
fn given_added_icon_when_removing_twice_then_single_delete() {
    // Given: An added icon
    let platform = Arc::new(HeadlessPlatform::new());
    let mut gateway = gateway(&platform);
    let id = IconId::new(1).unwrap();
    gateway.add(id, None, true, &ShellOptions::default()).unwrap();

    // When: Removing twice
    gateway.remove(id).unwrap();
    gateway.remove(id).unwrap();

    // Then: Exactly one DELETE
    let deletes = platform
        .journal()
        .iter()
        .filter(|call| call.op == NotifyIconOp::Delete)
        .count();
    assert_eq!(deletes, 1);
}

/// WHAT: A failed delete keeps the icon tracked so a retry deletes it
/// WHY: Forgetting the id on failure would leave the shell icon behind for good
#[test]
#[allow(clippy::unwrap_used)]
fn given_delete_failure_when_removing_then_retry_deletes() {
    // Given: An added icon and a shell that rejects the next delete
    let platform = Arc::new(HeadlessPlatform::new());
    let mut gateway = gateway(&platform);
    let id = IconId::new(1).unwrap();
    gateway.add(id, None, true, &ShellOptions::default()).unwrap();
    platform.fail_next_shell(NotifyIconOp::Delete, E_FAIL);

    // When: Removing, then removing again
    let first = gateway.remove(id);
    gateway.remove(id).unwrap();

    // Then: The first call failed, the second reached the shell
    assert!(first.is_err());
    let deletes: Vec<bool> = platform
        .journal()
        .iter()
        .filter(|call| call.op == NotifyIconOp::Delete)
        .map(|call| call.succeeded)
        .collect();
    assert_eq!(deletes, vec![false, true]);
    assert!(platform.shell_icon(1).is_none());
}

/// WHAT: Long text is cut at UTF-16 capacity without splitting pairs
/// WHY: The shell stores tooltips in fixed 128-unit buffers
#[test]
fn given_text_with_surrogate_pairs_when_truncating_then_pair_not_split() {
    // Given: 126 ASCII units followed by an emoji (2 units)
    let text = format!("{}\u{1F600}", "a".repeat(126));

    // When: Truncating to 127 units
    let truncated = truncate_utf16(&text, 127);

    // Then: The emoji is dropped whole
    assert_eq!(truncated.encode_utf16().count(), 126);
    assert!(!truncated.contains('\u{1F600}'));
    assert_eq!(truncate_utf16("short", 127), "short");
}
