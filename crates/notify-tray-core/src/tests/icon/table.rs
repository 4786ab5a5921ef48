use crate::{
    IconId, TrayError,
    icon::{IconHandleTable, IconRecord},
};

/// WHAT: Icon ids outside 1..=0xFFFE are rejected
/// WHY: 0 and 0xFFFF cannot round-trip through the shell callback encoding
#[test]
fn given_out_of_range_values_when_creating_icon_id_then_validation_error() {
    // Given / When: Boundary values
    let zero = IconId::new(0);
    let max = IconId::new(0xFFFF);
    let low = IconId::new(1);
    let high = IconId::new(0xFFFE);

    // Then: Only the inner range is accepted
    assert!(matches!(zero, Err(TrayError::Validation { .. })));
    assert!(matches!(max, Err(TrayError::Validation { .. })));
    assert_eq!(low.ok(), Some(IconId::MIN));
    assert_eq!(high.ok(), Some(IconId::MAX));
}

/// WHAT: Inserting an id twice fails and keeps the first record
/// WHY: Ids are unique while registered
#[test]
#[allow(clippy::unwrap_used)]
fn given_registered_id_when_inserting_again_then_validation_error() {
    // Given: A table holding id 5
    let mut table = IconHandleTable::new();
    let id = IconId::new(5).unwrap();
    table.insert(id, IconRecord::default()).unwrap();

    // When: Inserting id 5 again
    let result = table.insert(id, IconRecord::default());

    // Then: Rejected, still one record
    assert!(matches!(result, Err(TrayError::Validation { .. })));
    assert_eq!(table.len(), 1);
}

/// WHAT: Free id search skips taken ids and wraps once
/// WHY: Host-assigned ids must never collide with live icons
#[test]
#[allow(clippy::unwrap_used)]
fn given_taken_ids_when_searching_free_id_then_next_unused_returned() {
    // Given: Ids 1, 2 and 0xFFFE taken
    let mut table = IconHandleTable::new();
    for raw in [1, 2, 0xFFFE] {
        table
            .insert(IconId::new(raw).unwrap(), IconRecord::default())
            .unwrap();
    }

    // When: Searching from 1 and from the top of the range
    let from_start = table.next_free_id(IconId::MIN);
    let from_top = table.next_free_id(IconId::MAX);

    // Then: 3 in both cases
    assert_eq!(from_start, Some(IconId::new(3).unwrap()));
    assert_eq!(from_top, Some(IconId::new(3).unwrap()));
}

/// WHAT: Removing an id returns its record once
/// WHY: Removal is idempotent at every layer
#[test]
#[allow(clippy::unwrap_used)]
fn given_registered_id_when_removing_twice_then_second_returns_none() {
    // Given: A table holding id 7
    let mut table = IconHandleTable::new();
    let id = IconId::new(7).unwrap();
    table.insert(id, IconRecord::default()).unwrap();

    // When: Removing twice
    let first = table.remove(id);
    let second = table.remove(id);

    // Then: Record once, then nothing
    assert!(first.is_some());
    assert!(second.is_none());
    assert!(table.is_empty());
}
