use crate::{
    IconImage,
    platform::{HeadlessPlatform, IconSize, Platform, SystemIcon},
};

use std::sync::Arc;

/// WHAT: Owned icon handles are destroyed once, when the last reference drops
/// WHY: The shell may still display an icon some other holder references
#[test]
fn given_owned_image_with_two_holders_when_both_drop_then_destroyed_once() {
    // Given: An owned handle held twice
    let platform = Arc::new(HeadlessPlatform::new());
    let raw = platform.create_icon();
    let image = IconImage::owned(platform.clone(), raw, 16, 16);
    let other = Arc::clone(&image);

    // When: Dropping the first holder
    drop(image);

    // Then: Still alive
    assert!(platform.destroyed_icons().is_empty());

    // When: Dropping the last holder
    drop(other);

    // Then: Destroyed exactly once
    assert_eq!(platform.destroyed_icons(), vec![raw]);
}

/// WHAT: Shared handles are never destroyed
/// WHY: System icons belong to the OS
#[test]
#[allow(clippy::unwrap_used)]
fn given_shared_system_icon_when_dropped_then_not_destroyed() {
    // Given: A shared system icon
    let platform = Arc::new(HeadlessPlatform::new());
    let raw = platform
        .load_system_icon(SystemIcon::Information, IconSize::Large)
        .unwrap();
    let image = IconImage::shared(platform.clone(), raw, 32, 32);
    assert!(image.is_shared());

    // When: Dropping it
    drop(image);

    // Then: No destroy call
    assert!(platform.destroyed_icons().is_empty());
}
