use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single field-level difference: what the expected side wants versus what
/// the current side has. Values are type-erased to `serde_json::Value` since
/// the map this is collected into (`FieldMap`) spans heterogeneous fields of
/// one entity and is consumed generically by the differ and by plan-output
/// rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Change {
    pub expected: Value,
    pub current: Value,
}

impl Change {
    pub fn new(expected: impl Into<Value>, current: impl Into<Value>) -> Self {
        Self {
            expected: expected.into(),
            current: current.into(),
        }
    }
}

/// `field -> Change(expected, current)`, as produced by
/// `Model::get_difference_from`.
pub type FieldMap = BTreeMap<&'static str, Change>;
