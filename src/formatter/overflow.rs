//! Places whatever the schema did not consume under a configurable path of the output tree.

use std::collections::HashSet;

use serde_json::Map as JsonMap;
use serde_json::value::Value as JsonValue;

use crate::record::{LogRecord, RecordArgs};

/// Moves the unconsumed, non native, source entries to `extra_keys` and the plain positional
/// arguments of `record` to `extra_keys` + `args_key`.
///
/// A record whose arguments are a single mapping has no plain arguments.
pub fn collect_overflow(
    record: &LogRecord,
    source: &JsonMap<String, JsonValue>,
    consumed: &HashSet<String>,
    extra_keys: &[String],
    args_key: &[String],
    tree: &mut JsonMap<String, JsonValue>,
) {
    let remainder: JsonMap<String, JsonValue> = source
        .iter()
        .filter(|(key, _)| !consumed.contains(key.as_str()) && !record.is_native(key))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect();

    if !remainder.is_empty() {
        set_extra(tree, extra_keys, JsonValue::Object(remainder));
    }

    if let RecordArgs::Mapping(_) = record.args {
        return;
    }

    let plain = record.args.plain_values();
    if !plain.is_empty() {
        let path: Vec<String> = extra_keys.iter().chain(args_key).cloned().collect();
        set_extra(tree, &path, JsonValue::Array(plain));
    }
}

/// Sets `value` at `path`, creating intermediate objects as needed.
///
/// - An intermediate key holding anything but an object is overwritten with an empty object.
/// - If the last key already holds an object and `value` is an object, the entries are merged, existing entries win.
/// - An object `value` overwrites anything else held by the last key.
/// - Any other `value` is only set if the last key is free.
/// - An empty `path` merges an object `value` into `tree` itself and ignores anything else.
pub fn set_extra(tree: &mut JsonMap<String, JsonValue>, path: &[String], value: JsonValue) {
    let Some((last, parents)) = path.split_last() else {
        if let JsonValue::Object(incoming) = value {
            merge_missing(tree, incoming);
        }
        return;
    };

    let mut node = tree;
    for key in parents {
        let entry = node
            .entry(key.clone())
            .or_insert_with(|| JsonValue::Object(JsonMap::new()));
        if !entry.is_object() {
            *entry = JsonValue::Object(JsonMap::new());
        }
        node = match entry {
            JsonValue::Object(map) => map,
            _ => return,
        };
    }

    match value {
        JsonValue::Object(incoming) if node.get(last).is_some_and(JsonValue::is_object) => {
            if let Some(JsonValue::Object(existing)) = node.get_mut(last) {
                merge_missing(existing, incoming);
            }
        }
        JsonValue::Object(incoming) => {
            node.insert(last.clone(), JsonValue::Object(incoming));
        }
        value => {
            node.entry(last.clone()).or_insert(value);
        }
    }
}

fn merge_missing(existing: &mut JsonMap<String, JsonValue>, incoming: JsonMap<String, JsonValue>) {
    for (key, value) in incoming {
        existing.entry(key).or_insert(value);
    }
}
