//! The source language's memory types.
//!
//! A location is either a single `Byte` cell or a struct of named fields
//! laid out contiguously. Types are registered by name and may reference
//! any type already registered; the layout computation assumes the
//! references form a DAG.

use indexmap::IndexMap;

/// A registered memory type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Type {
    /// One tape cell.
    Byte,
    /// Named fields in declaration order, each referencing a type by name.
    Struct(Vec<(String, String)>),
}

/// Type registry, keyed by type name. Iteration order is registration
/// order.
pub type TypeTable = IndexMap<String, Type>;

/// Registry with the primitive `Byte` type installed.
pub fn builtin_types() -> TypeTable {
    let mut types = TypeTable::new();
    types.insert("Byte".to_string(), Type::Byte);
    types
}

/// Size in cells of the type named `name`. Unknown names count as zero so
/// a single missing type doesn't cascade into bogus layout errors.
pub fn size_of(types: &TypeTable, name: &str) -> i64 {
    match types.get(name) {
        None => 0,
        Some(Type::Byte) => 1,
        Some(Type::Struct(fields)) => fields
            .iter()
            .map(|(_, field_type)| size_of(types, field_type))
            .sum(),
    }
}

/// Walk a field path starting at `type_name`, returning the byte offset
/// of the leaf and the leaf's type name, or `None` when a step doesn't
/// exist. An empty path resolves to the type itself at offset zero.
pub fn field_path(types: &TypeTable, type_name: &str, path: &[String]) -> Option<(i64, String)> {
    let mut offset = 0i64;
    let mut current = type_name.to_string();

    for part in path {
        let Some(Type::Struct(fields)) = types.get(&current) else {
            return None;
        };

        let mut step = None;
        let mut field_offset = 0i64;
        for (field_name, field_type) in fields {
            if field_name == part {
                step = Some((field_offset, field_type.clone()));
                break;
            }
            field_offset += size_of(types, field_type);
        }

        let (field_offset, field_type) = step?;
        offset += field_offset;
        current = field_type;
    }

    Some((offset, current))
}
