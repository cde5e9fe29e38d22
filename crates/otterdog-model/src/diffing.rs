//! The field-diff macro every entity's `get_difference_from` is built from.
//! Centralizing it keeps the tie-break rules (§4.1) in one place rather than
//! reimplemented per entity.

use otterdog_types::{Attr, Change, FieldMap};
use serde::Serialize;

/// Compares one field across expected/current and records a `Change` per
/// the rules in §4.1:
/// - expected `Unset` never diffs.
/// - expected `Null`, current `Set` -> `Change(null, current)`.
/// - expected `Set`, current `Null` -> `Change(expected, null)`.
/// - both `Set` and unequal -> `Change(expected, current)`.
pub fn diff_attr<T: Serialize + PartialEq>(
    map: &mut FieldMap,
    name: &'static str,
    expected: &Attr<T>,
    current: &Attr<T>,
) {
    let change = match (expected, current) {
        (Attr::Set(e), Attr::Set(c)) if e != c => {
            Some((serde_json::to_value(e).unwrap(), serde_json::to_value(c).unwrap()))
        }
        (Attr::Null, Attr::Set(c)) => Some((serde_json::Value::Null, serde_json::to_value(c).unwrap())),
        (Attr::Set(e), Attr::Null) => Some((serde_json::to_value(e).unwrap(), serde_json::Value::Null)),
        _ => None,
    };
    if let Some((expected, current)) = change {
        map.insert(name, Change { expected, current });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unset_expected_never_diffs() {
        let mut map = FieldMap::new();
        diff_attr(&mut map, "field", &Attr::<bool>::Unset, &Attr::Set(true));
        assert!(map.is_empty());
    }

    #[test]
    fn null_expected_against_set_current_diffs() {
        let mut map = FieldMap::new();
        diff_attr(&mut map, "field", &Attr::<bool>::Null, &Attr::Set(true));
        assert_eq!(map["field"].current, serde_json::json!(true));
        assert_eq!(map["field"].expected, serde_json::Value::Null);
    }

    #[test]
    fn equal_set_values_do_not_diff() {
        let mut map = FieldMap::new();
        diff_attr(&mut map, "field", &Attr::Set(true), &Attr::Set(true));
        assert!(map.is_empty());
    }
}
