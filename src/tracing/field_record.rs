use std::error::Error as StdError;
use std::fmt::Debug;

use serde_json::json;
use serde_json::Map as JsonMap;
use serde_json::value::Value as JsonValue;

use t::field::{Field as TField, Visit as TFieldVisit};

use crate::record::ExcInfo;

/// The recorded fields of a span or an event.
///
/// Spans keep one in their [`Extensions`][struct@ts::registry::Extensions], events build one on the fly.
///
/// - `map` : key-value ordered map of the recorded fields, without `message`
/// - `message` : the formatted `message` field, if any
/// - `error` : the first field recorded as a [`std::error::Error`], the field itself also stays in `map` as its display string
#[derive(Debug, Clone, Default)]
pub struct FieldRecord {
    pub map: JsonMap<String, JsonValue>,
    pub message: Option<String>,
    pub error: Option<ExcInfo>,
}

impl FieldRecord {
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&mut self, field: &TField, value: JsonValue) {
        self.map.insert(field.name().to_owned(), value);
    }
}

impl TFieldVisit for FieldRecord {
    fn record_debug(&mut self, field: &TField, value: &dyn Debug) {
        if field.name() == "message" {
            self.message = Some(format!("{value:?}"));
        } else {
            self.insert(field, json!(format!("{value:?}")));
        }
    }

    fn record_str(&mut self, field: &TField, value: &str) {
        if field.name() == "message" {
            self.message = Some(value.to_owned());
        } else {
            self.insert(field, json!(value));
        }
    }

    fn record_bool(&mut self, field: &TField, value: bool) {
        self.insert(field, json!(value));
    }

    fn record_u64(&mut self, field: &TField, value: u64) {
        self.insert(field, json!(value));
    }

    fn record_i64(&mut self, field: &TField, value: i64) {
        self.insert(field, json!(value));
    }

    fn record_f64(&mut self, field: &TField, value: f64) {
        self.insert(field, json!(value));
    }

    fn record_i128(&mut self, field: &TField, value: i128) {
        self.insert(field, json!(value));
    }

    fn record_u128(&mut self, field: &TField, value: u128) {
        self.insert(field, json!(value));
    }

    fn record_error(&mut self, field: &TField, value: &(dyn StdError + 'static)) {
        if self.error.is_none() {
            self.error = Some(ExcInfo::from_dyn_error(&error_type_name(value), value));
        }
        self.insert(field, json!(value.to_string()));
    }
}

/// Trait objects have no type name, the leading identifier of the debug output is used instead,
/// `ParseIntError { kind: InvalidDigit }` gives `ParseIntError`.
fn error_type_name(error: &(dyn StdError + 'static)) -> String {
    let debug = format!("{error:?}");
    let name: String = debug
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    if name.is_empty() {
        "Error".to_owned()
    } else {
        name
    }
}
