//! The log record handed to the [`JsonMapFormatter`][struct@crate::formatter::JsonMapFormatter].
//!
//! A [`LogRecord`][struct@LogRecord] carries the call-site metadata of a single log event.
//! Its [`fields`][fn@LogRecord::fields] view is the flat map of *native* fields that the formatter
//! resolves the schema against, native field names are never moved to the overflow subtree.

use std::error::Error as StdError;
use std::path::Path;

use chrono::{DateTime, Utc};

use serde_json::json;
use serde_json::Map as JsonMap;
use serde_json::value::Value as JsonValue;

/// Native field names, in the order [`LogRecord::fields`] produces them.
pub const NATIVE_FIELDS: [&str; 17] = [
    "name",
    "msg",
    "args",
    "levelname",
    "levelno",
    "pathname",
    "filename",
    "module",
    "lineno",
    "funcName",
    "created",
    "msecs",
    "thread",
    "threadName",
    "process",
    "exc_info",
    "exc_text",
];

/// The arguments of a log call.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordArgs {
    /// Any number of values, json objects among them are structured arguments.
    Positional(Vec<JsonValue>),
    /// The call had a single mapping argument.
    Mapping(JsonMap<String, JsonValue>),
}

impl RecordArgs {
    /// A sole json object argument becomes [`RecordArgs::Mapping`].
    pub fn from_values(mut values: Vec<JsonValue>) -> Self {
        if values.len() == 1 && values[0].is_object() {
            if let Some(JsonValue::Object(map)) = values.pop() {
                return RecordArgs::Mapping(map);
            }
        }
        RecordArgs::Positional(values)
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RecordArgs::Positional(values) => values.is_empty(),
            RecordArgs::Mapping(map) => map.is_empty(),
        }
    }

    /// Structured arguments in call order.
    pub fn mappings(&self) -> Vec<&JsonMap<String, JsonValue>> {
        match self {
            RecordArgs::Mapping(map) => vec![map],
            RecordArgs::Positional(values) => values.iter().filter_map(JsonValue::as_object).collect(),
        }
    }

    /// Positional values that are not json objects, empty for [`RecordArgs::Mapping`].
    pub fn plain_values(&self) -> Vec<JsonValue> {
        match self {
            RecordArgs::Mapping(_) => Vec::new(),
            RecordArgs::Positional(values) => {
                values.iter().filter(|v| !v.is_object()).cloned().collect()
            }
        }
    }

    fn to_json(&self) -> JsonValue {
        match self {
            RecordArgs::Positional(values) => JsonValue::Array(values.clone()),
            RecordArgs::Mapping(map) => JsonValue::Object(map.clone()),
        }
    }
}

impl Default for RecordArgs {
    fn default() -> Self {
        RecordArgs::Positional(Vec::new())
    }
}

/// Exception information attached to a record.
///
/// - `type_name` : the exception type, e.g. `ParseIntError`
/// - `args` : the constructor arguments of the exception, may be empty
/// - `trace` : trace lines, innermost last
#[derive(Debug, Clone, PartialEq)]
pub struct ExcInfo {
    pub type_name: String,
    pub args: Vec<JsonValue>,
    pub trace: Vec<String>,
}

impl ExcInfo {
    pub fn new(type_name: &str, args: Vec<JsonValue>) -> Self {
        Self {
            type_name: type_name.to_owned(),
            args,
            trace: Vec::new(),
        }
    }

    pub fn with_trace(mut self, trace: Vec<String>) -> Self {
        self.trace = trace;
        self
    }

    /// The type name is the last path segment of `E`, the single argument is the display string
    /// and the trace lists the [`source`][fn@StdError::source] chain.
    pub fn from_error<E>(error: &E) -> Self
    where
        E: StdError + 'static,
    {
        let full_name = std::any::type_name::<E>();
        let type_name = short_type_name(full_name);
        Self::from_dyn_error(type_name, error)
    }

    /// Same as [`from_error`][fn@Self::from_error] for trait objects, where the type name has to be supplied.
    pub fn from_dyn_error(type_name: &str, error: &(dyn StdError + 'static)) -> Self {
        let mut trace = Vec::new();
        let mut source = error.source();
        while let Some(cause) = source {
            trace.push(format!("Caused by: {cause}"));
            source = cause.source();
        }
        Self::new(type_name, vec![json!(error.to_string())]).with_trace(trace)
    }

    /// Renders the trace the way a traceback reads, header, trace lines, then `type: value`.
    pub fn render(&self) -> String {
        let mut lines = Vec::with_capacity(self.trace.len() + 2);
        lines.push("Traceback (most recent call last):".to_owned());
        for line in &self.trace {
            lines.push(format!("  {line}"));
        }
        let value = self
            .args
            .iter()
            .map(json_value_to_string)
            .collect::<Vec<_>>()
            .join(", ");
        if value.is_empty() {
            lines.push(self.type_name.clone());
        } else {
            lines.push(format!("{}: {value}", self.type_name));
        }
        lines.join("\n")
    }
}

/// Strips module paths and generic parameters, `core::num::ParseIntError` becomes `ParseIntError`.
fn short_type_name(full_name: &str) -> &str {
    let without_generics = full_name.split('<').next().unwrap_or(full_name);
    without_generics
        .rsplit("::")
        .next()
        .unwrap_or(without_generics)
}

/// A single log event.
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Logger name
    pub name: String,
    /// Raw message, replaced by the formatted document once formatted
    pub msg: String,
    pub args: RecordArgs,
    pub levelname: String,
    pub levelno: u8,
    pub pathname: Option<String>,
    pub module: Option<String>,
    pub lineno: Option<u32>,
    pub func_name: Option<String>,
    pub created: DateTime<Utc>,
    pub thread: Option<String>,
    pub thread_name: Option<String>,
    pub process: u32,
    pub exc_info: Option<ExcInfo>,
    /// Pre-rendered exception text, preferred over rendering `exc_info`
    pub exc_text: Option<String>,
    /// Caller attached attributes, these are native fields as well
    pub extra: JsonMap<String, JsonValue>,
}

impl LogRecord {
    /// A record created now, on the current thread, with no call-site information.
    pub fn new(name: &str, levelname: &str, msg: &str) -> Self {
        let current = std::thread::current();
        Self {
            name: name.to_owned(),
            msg: msg.to_owned(),
            args: RecordArgs::default(),
            levelname: levelname.to_owned(),
            levelno: level_number(levelname),
            pathname: None,
            module: None,
            lineno: None,
            func_name: None,
            created: Utc::now(),
            thread: Some(format!("{:?}", current.id())),
            thread_name: current.name().map(|name| name.to_owned()),
            process: std::process::id(),
            exc_info: None,
            exc_text: None,
            extra: JsonMap::new(),
        }
    }

    pub fn with_args(mut self, args: Vec<JsonValue>) -> Self {
        self.args = RecordArgs::from_values(args);
        self
    }

    pub fn with_pathname(mut self, pathname: &str) -> Self {
        self.pathname = Some(pathname.to_owned());
        self
    }

    pub fn with_module(mut self, module: &str) -> Self {
        self.module = Some(module.to_owned());
        self
    }

    pub fn with_lineno(mut self, lineno: u32) -> Self {
        self.lineno = Some(lineno);
        self
    }

    pub fn with_func_name(mut self, func_name: &str) -> Self {
        self.func_name = Some(func_name.to_owned());
        self
    }

    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = created;
        self
    }

    pub fn with_exc_info(mut self, exc_info: ExcInfo) -> Self {
        self.exc_info = Some(exc_info);
        self
    }

    pub fn with_exc_text(mut self, exc_text: &str) -> Self {
        self.exc_text = Some(exc_text.to_owned());
        self
    }

    pub fn with_extra(mut self, key: &str, value: JsonValue) -> Self {
        self.extra.insert(key.to_owned(), value);
        self
    }

    /// File name component of `pathname`.
    pub fn filename(&self) -> Option<String> {
        self.pathname.as_deref().map(|pathname| {
            Path::new(pathname)
                .file_name()
                .map(|file_name| file_name.to_string_lossy().into_owned())
                .unwrap_or_else(|| pathname.to_owned())
        })
    }

    /// Returns `true` if `key` names a native field of this record, including `extra` attributes.
    pub fn is_native(&self, key: &str) -> bool {
        NATIVE_FIELDS.contains(&key) || self.extra.contains_key(key)
    }

    /// The flat json view of the native fields followed by the `extra` attributes.
    ///
    /// Call-site information the record does not have is left out, a schema leaf naming it resolves as missing.
    pub fn fields(&self) -> JsonMap<String, JsonValue> {
        let created_secs = self.created.timestamp() as f64
            + f64::from(self.created.timestamp_subsec_micros()) / 1_000_000.0;

        let mut map = JsonMap::new();
        map.insert("name".to_owned(), json!(self.name));
        map.insert("msg".to_owned(), json!(self.msg));
        map.insert("args".to_owned(), self.args.to_json());
        map.insert("levelname".to_owned(), json!(self.levelname));
        map.insert("levelno".to_owned(), json!(self.levelno));
        insert_some(&mut map, "pathname", self.pathname.as_ref().map(|v| json!(v)));
        insert_some(&mut map, "filename", self.filename().map(JsonValue::String));
        insert_some(&mut map, "module", self.module.as_ref().map(|v| json!(v)));
        insert_some(&mut map, "lineno", self.lineno.map(|v| json!(v)));
        insert_some(&mut map, "funcName", self.func_name.as_ref().map(|v| json!(v)));
        map.insert("created".to_owned(), json!(created_secs));
        map.insert("msecs".to_owned(), json!(self.created.timestamp_subsec_millis()));
        insert_some(&mut map, "thread", self.thread.as_ref().map(|v| json!(v)));
        insert_some(&mut map, "threadName", self.thread_name.as_ref().map(|v| json!(v)));
        map.insert("process".to_owned(), json!(self.process));
        let exc_info = self
            .exc_info
            .as_ref()
            .map(|exc_info| json!({ "type": exc_info.type_name, "args": exc_info.args }));
        insert_some(&mut map, "exc_info", exc_info);
        insert_some(&mut map, "exc_text", self.exc_text.as_ref().map(|v| json!(v)));
        for (key, value) in &self.extra {
            // extra attributes never shadow a native field
            if !map.contains_key(key) {
                map.insert(key.clone(), value.clone());
            }
        }
        map
    }
}

fn insert_some(map: &mut JsonMap<String, JsonValue>, key: &str, value: Option<JsonValue>) {
    if let Some(value) = value {
        map.insert(key.to_owned(), value);
    }
}

/// Numeric severity for a level name, unknown names map to `0`.
pub fn level_number(levelname: &str) -> u8 {
    match levelname.to_ascii_uppercase().as_str() {
        "TRACE" => 5,
        "DEBUG" => 10,
        "INFO" => 20,
        "WARN" | "WARNING" => 30,
        "ERROR" => 40,
        "CRITICAL" | "FATAL" => 50,
        _ => 0,
    }
}

/// Strings without quotes, everything else as compact json.
pub(crate) fn json_value_to_string(value: &JsonValue) -> String {
    match value {
        JsonValue::String(s) => s.clone(),
        _ => value.to_string(),
    }
}
