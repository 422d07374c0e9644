//! Values that are derived from a record rather than read from it.

use std::fmt::{Display, Write as _};

use chrono::{DateTime, Local as DateTimeLocal, TimeZone, Utc};
use chrono_tz::Tz;

use indexmap::IndexMap;

use serde::{Deserialize, Serialize};

use serde_json::json;
use serde_json::Map as JsonMap;
use serde_json::value::Value as JsonValue;

use crate::error::JsonMapError;
use crate::record::LogRecord;

/// Key names under which auxiliary values are injected into the source map.
///
/// A schema references them like any other record field.
/// ```toml
/// [formatter.aux_map]
/// time = "@timestamp"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuxKeys {
    /// Formatted record time
    pub time: String,
    /// Exception type name
    pub exctype: String,
    /// Exception arguments
    pub excvalue: String,
    /// Rendered exception trace
    pub exctrace: String,
}

impl Default for AuxKeys {
    fn default() -> Self {
        Self {
            time: "time".to_owned(),
            exctype: "exctype".to_owned(),
            excvalue: "excvalue".to_owned(),
            exctrace: "exctrace".to_owned(),
        }
    }
}

impl AuxKeys {
    /// The default keys with `overrides` applied, unknown logical names are ignored.
    pub fn remapped(overrides: &IndexMap<String, String>) -> Self {
        let mut keys = Self::default();
        for (logical, name) in overrides {
            let slot = match logical.as_str() {
                "time" => &mut keys.time,
                "exctype" => &mut keys.exctype,
                "excvalue" => &mut keys.excvalue,
                "exctrace" => &mut keys.exctrace,
                _ => continue,
            };
            *slot = name.clone();
        }
        keys
    }
}

/// Renders record timestamps.
///
/// Without a date format the time reads `2024-05-01 13:45:12,042`.
/// Without a timezone the local timezone is used.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeFormat {
    datefmt: Option<String>,
    timezone: Option<Tz>,
}

impl TimeFormat {
    pub fn new() -> Self {
        Self::default()
    }

    /// A `chrono` strftime format string, e.g. `%Y-%m-%dT%H:%M:%S%.3f%:z`.
    pub fn with_datefmt(mut self, datefmt: Option<String>) -> Self {
        self.datefmt = datefmt;
        self
    }

    pub fn with_timezone(mut self, timezone: Option<Tz>) -> Self {
        self.timezone = timezone;
        self
    }

    /// Parses an IANA timezone name such as `UTC` or `Europe/Bucharest`.
    pub fn with_timezone_name(self, name: &str) -> Result<Self, JsonMapError> {
        let timezone: Tz = name
            .parse()
            .map_err(|_| JsonMapError::UnknownTimezone(name.to_owned()))?;
        Ok(self.with_timezone(Some(timezone)))
    }

    pub fn format(&self, created: DateTime<Utc>) -> String {
        match self.timezone {
            Some(timezone) => self.format_in(created.with_timezone(&timezone)),
            None => self.format_in(created.with_timezone(&DateTimeLocal)),
        }
    }

    fn format_in<Z>(&self, time: DateTime<Z>) -> String
    where
        Z: TimeZone,
        Z::Offset: Display,
    {
        if let Some(datefmt) = &self.datefmt {
            let mut out = String::new();
            // an invalid format string falls back to the default layout
            if write!(out, "{}", time.format(datefmt)).is_ok() {
                return out;
            }
        }
        format!(
            "{},{:03}",
            time.format("%Y-%m-%d %H:%M:%S"),
            time.timestamp_subsec_millis()
        )
    }
}

/// Builds the auxiliary map of `record`.
///
/// The formatted time is always present, the exception entries only when the record carries exception info.
/// A pre-rendered `exc_text` is preferred over rendering the exception again.
pub fn prepare_auxiliary(
    record: &LogRecord,
    keys: &AuxKeys,
    time_format: &TimeFormat,
) -> JsonMap<String, JsonValue> {
    let mut aux = JsonMap::new();
    aux.insert(keys.time.clone(), json!(time_format.format(record.created)));

    if let Some(exc_info) = &record.exc_info {
        let trace = match &record.exc_text {
            Some(exc_text) => exc_text.clone(),
            None => exc_info.render(),
        };
        aux.insert(keys.exctype.clone(), json!(exc_info.type_name));
        aux.insert(keys.excvalue.clone(), JsonValue::Array(exc_info.args.clone()));
        aux.insert(keys.exctrace.clone(), json!(trace));
    }

    aux
}
