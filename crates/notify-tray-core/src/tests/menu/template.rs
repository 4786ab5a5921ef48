use crate::{
    MAX_TEMPLATE_DEPTH, MenuItemDescriptor, TrayError, encode, parse_template,
    platform::consts::{MF_END, MF_POPUP_EX, MFS_CHECKED, MFS_DISABLED, MFT_SEPARATOR},
    template_size,
};

// Test constants
const HEADER_AND_ROOT_SIZE: usize = 36;
const PLACEHOLDER_ITEM_SIZE: usize = 28;
const OPEN_ID: u32 = 123;
const QUIT_ID: u32 = 456;

fn sample_tree() -> Vec<MenuItemDescriptor> {
    vec![
        MenuItemDescriptor::item(OPEN_ID, "Open"),
        MenuItemDescriptor::separator(),
        MenuItemDescriptor::submenu(
            "More",
            vec![
                MenuItemDescriptor::item(789, "Odd").checked(true),
                MenuItemDescriptor::item(790, "Even").disabled(),
                MenuItemDescriptor::submenu("Nothing here", Vec::new()),
            ],
        ),
        MenuItemDescriptor::item(QUIT_ID, "Quit \u{1F600}"),
    ]
}

fn nested_tree(levels: usize) -> Vec<MenuItemDescriptor> {
    let mut items = vec![MenuItemDescriptor::item(OPEN_ID, "Leaf")];
    for level in 0..levels {
        items = vec![MenuItemDescriptor::submenu(format!("Level {}", level), items)];
    }
    items
}

/// WHAT: An empty item list encodes a single disabled placeholder
/// WHY: Native menus cannot be empty, so an empty submenu still needs one item
#[test]
#[allow(clippy::unwrap_used)]
fn given_empty_item_list_when_encoding_then_single_disabled_placeholder() {
    // Given: No items
    let items: Vec<MenuItemDescriptor> = Vec::new();

    // When: Encoding and parsing the template back
    let bytes = encode(&items);
    let parsed = parse_template(&bytes).unwrap();

    // Then: The root popup holds exactly one disabled, terminating item
    assert_eq!(bytes.len(), HEADER_AND_ROOT_SIZE + PLACEHOLDER_ITEM_SIZE);
    assert_eq!(parsed.len(), 1);
    let children = parsed[0].children.as_ref().unwrap();
    assert_eq!(children.len(), 1);
    assert_eq!(children[0].state, MFS_DISABLED);
    assert_eq!(children[0].text, "Empty");
    assert_eq!(children[0].flags, MF_END);
}

/// WHAT: template_size predicts the encoded length exactly
/// WHY: The buffer is sized up front; any mismatch corrupts the template
#[test]
fn given_nested_tree_when_encoding_then_length_matches_template_size() {
    // Given: Trees mixing odd and even text lengths, separators and submenus
    let trees = [
        Vec::new(),
        vec![MenuItemDescriptor::item(1, "a")],
        vec![MenuItemDescriptor::item(1, "ab")],
        vec![MenuItemDescriptor::separator()],
        sample_tree(),
    ];

    for items in &trees {
        // When: Encoding
        let bytes = encode(items);

        // Then: Size matches and the template stays 4-byte aligned
        assert_eq!(bytes.len(), template_size(items));
        assert_eq!(bytes.len() % 4, 0);
    }
}

/// WHAT: Parsing an encoded tree recovers types, states, ids and texts
/// WHY: The emulated shell builds menus from parsed templates
#[test]
#[allow(clippy::unwrap_used)]
fn given_sample_tree_when_encoding_then_parse_recovers_structure() {
    // Given: A tree with a nested empty submenu
    let items = sample_tree();

    // When: Encoding and parsing back
    let parsed = parse_template(&encode(&items)).unwrap();

    // Then: The root wraps the items with the right flags
    let root = &parsed[0];
    assert_eq!(root.text, "root");
    assert_eq!(root.flags, MF_END | MF_POPUP_EX);

    let top = root.children.as_ref().unwrap();
    assert_eq!(top.len(), 4);
    assert_eq!(top[0].id, OPEN_ID);
    assert_eq!(top[0].text, "Open");
    assert_eq!(top[0].flags, 0);
    assert_eq!(top[1].kind, MFT_SEPARATOR);
    assert_eq!(top[2].flags, MF_POPUP_EX);
    assert_eq!(top[3].id, QUIT_ID);
    assert_eq!(top[3].text, "Quit \u{1F600}");
    assert_eq!(top[3].flags, MF_END);

    let more = top[2].children.as_ref().unwrap();
    assert_eq!(more[0].state, MFS_CHECKED);
    assert_eq!(more[1].state, MFS_DISABLED);
    assert_eq!(more[2].children.as_ref().unwrap()[0].text, "Empty");
}

/// WHAT: A truncated template is rejected
/// WHY: Caller-supplied templates must not be read past their end
#[test]
fn given_truncated_template_when_parsing_then_validation_error() {
    // Given: A valid template cut short
    let bytes = encode(&sample_tree());
    let truncated = &bytes[..bytes.len() - 6];

    // When: Parsing
    let result = parse_template(truncated);

    // Then: Validation error
    assert!(matches!(result, Err(TrayError::Validation { .. })));
}

/// WHAT: Unknown template versions are rejected
/// WHY: Only MENUEX (version 1) templates are understood
#[test]
fn given_wrong_version_when_parsing_then_validation_error() {
    // Given: A template whose version field is 0
    let mut bytes = encode(&sample_tree());
    bytes[0] = 0;

    // When: Parsing
    let result = parse_template(&bytes);

    // Then: Validation error mentioning the version
    assert!(
        matches!(&result, Err(TrayError::Validation { reason, .. }) if reason.contains("version")),
        "unexpected result: {:?}",
        result
    );
}

/// WHAT: Templates nested past the depth limit are rejected
/// WHY: Parsing recurses per submenu, so hostile input must not exhaust the stack
#[test]
fn given_template_nested_past_limit_when_parsing_then_validation_error() {
    // Given: A tree nested well beyond the limit
    let bytes = encode(&nested_tree(MAX_TEMPLATE_DEPTH + 8));

    // When: Parsing
    let result = parse_template(&bytes);

    // Then: Validation error mentioning the nesting
    assert!(
        matches!(&result, Err(TrayError::Validation { reason, .. }) if reason.contains("nests")),
        "unexpected result: {:?}",
        result
    );
}

/// WHAT: Nesting just inside the limit still parses
/// WHY: The limit must only reject templates that exceed it
#[test]
#[allow(clippy::unwrap_used)]
fn given_template_at_depth_limit_when_parsing_then_leaf_reached() {
    // Given: Top level, root popup and submenus filling the limit exactly
    let levels = MAX_TEMPLATE_DEPTH - 2;
    let bytes = encode(&nested_tree(levels));

    // When: Parsing
    let parsed = parse_template(&bytes).unwrap();

    // Then: The innermost leaf is reachable
    let mut list = parsed[0].children.as_ref().unwrap();
    for _ in 0..levels {
        list = list[0].children.as_ref().unwrap();
    }
    assert_eq!(list[0].text, "Leaf");
    assert_eq!(list[0].id, OPEN_ID);
}
