//! Unit tests for the type registry and layout computation.

use super::types::{Type, builtin_types, field_path, size_of};

fn registry() -> super::types::TypeTable {
    let mut types = builtin_types();
    types.insert(
        "Content".to_string(),
        Type::Struct(vec![
            ("a".to_string(), "Byte".to_string()),
            ("b".to_string(), "Byte".to_string()),
        ]),
    );
    types.insert(
        "X".to_string(),
        Type::Struct(vec![
            ("content".to_string(), "Content".to_string()),
            ("is_present".to_string(), "Byte".to_string()),
        ]),
    );
    types
}

#[test]
fn byte_is_one_cell() {
    assert_eq!(size_of(&builtin_types(), "Byte"), 1);
}

#[test]
fn struct_size_is_the_sum_of_field_sizes() {
    let types = registry();
    assert_eq!(size_of(&types, "Content"), 2);
    assert_eq!(size_of(&types, "X"), 3);
}

#[test]
fn unknown_types_have_size_zero() {
    assert_eq!(size_of(&builtin_types(), "Ghost"), 0);
}

#[test]
fn empty_path_is_the_type_itself() {
    let types = registry();
    assert_eq!(field_path(&types, "X", &[]), Some((0, "X".to_string())));
}

#[test]
fn paths_accumulate_offsets() {
    let types = registry();
    let path = |parts: &[&str]| parts.iter().map(|s| s.to_string()).collect::<Vec<_>>();

    assert_eq!(
        field_path(&types, "X", &path(&["content"])),
        Some((0, "Content".to_string()))
    );
    assert_eq!(
        field_path(&types, "X", &path(&["content", "b"])),
        Some((1, "Byte".to_string()))
    );
    assert_eq!(
        field_path(&types, "X", &path(&["is_present"])),
        Some((2, "Byte".to_string()))
    );
}

#[test]
fn missing_fields_are_signalled() {
    let types = registry();
    assert_eq!(field_path(&types, "X", &["ghost".to_string()]), None);
}

#[test]
fn bytes_have_no_fields() {
    let types = registry();
    assert_eq!(field_path(&types, "Byte", &["a".to_string()]), None);
    // Stepping through a leaf mid-path fails the same way.
    assert_eq!(
        field_path(
            &types,
            "X",
            &["is_present".to_string(), "a".to_string()]
        ),
        None
    );
}
