use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map, Value};

/// Before/after value of a single changed field.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldChange {
    pub before: Value,
    pub after: Value,
}

/// Changed fields keyed by name. Empty when nothing changed.
pub type FieldDiff = BTreeMap<String, FieldChange>;

/// Compare the top-level fields of two serializable values.
///
/// Fields present on only one side are reported with `null` on the other. Values that do not
/// serialize to an object are compared as a single field named `value`.
pub fn field_diff<T: Serialize>(before: &T, after: &T) -> Result<FieldDiff, serde_json::Error> {
    let before = as_fields(serde_json::to_value(before)?);
    let after = as_fields(serde_json::to_value(after)?);

    let mut diff = FieldDiff::new();
    for (key, old) in &before {
        let new = after.get(key).cloned().unwrap_or(Value::Null);
        if *old != new {
            diff.insert(
                key.clone(),
                FieldChange {
                    before: old.clone(),
                    after: new,
                },
            );
        }
    }

    for (key, new) in after {
        if !before.contains_key(&key) {
            diff.insert(
                key,
                FieldChange {
                    before: Value::Null,
                    after: new,
                },
            );
        }
    }

    Ok(diff)
}

/// Render a diff as a compact change message for the audit log.
pub fn change_message(diff: &FieldDiff) -> String {
    diff.iter()
        .map(|(field, change)| format!("{field}: {} -> {}", change.before, change.after))
        .collect::<Vec<_>>()
        .join("; ")
}

fn as_fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => {
            let mut map = Map::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}
