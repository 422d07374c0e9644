//! This module contains the configuration file data model.
//!
//! All [`Option`][enum@std::option::Option] fields are optional and fall back to the [`JsonMapFormatter`][struct@crate::formatter::JsonMapFormatter] defaults.
//!
//! # Example detailed configuration file.
//!
//! ```toml
//! title = "My App tracing-jsonmap Config"
//!
//! [formatter]
//! extra_keys = ["extra", "data"] # unmapped fields go under this path
//! args_key = ["args"] # plain positional arguments go under extra_keys + args_key
//! null = "" # written for leaves without a value
//! strip = false # true removes leaves without a value and branches left empty
//! merge_order = "auxiliary_first" # or "arguments_first"
//! reuse_tree = false
//! pretty_json = false
//! fmt = "%(asctime)s %(message)s" # the final line, %(message)s is the json document
//! datefmt = "%Y-%m-%dT%H:%M:%S%.3f%:z" # chrono strftime, the default reads 2024-05-01 13:45:12,042
//! style = "percent" # "percent" %(key)s, "brace" {key}, "dollar" ${key}
//! timezone = "${env:APP_TIMEZONE}" # IANA name, local time when absent
//!
//! # the document layout, keys only, the values are placeholders
//! [formatter.schema]
//! time = ""
//! levelname = ""
//! msg = ""
//! [formatter.schema.extra]
//! funcName = ""
//! lineno = ""
//!
//! # output key per schema key
//! [formatter.remap]
//! levelname = "level"
//!
//! # names of the auxiliary values: time, exctype, excvalue, exctrace
//! [formatter.aux_map]
//! time = "time"
//!
//! [writer]
//! type = "standard_output" # or "standard_error"
//!
//! [filter]
//! level = "info"
//! directives = [
//!     "hyper=error",
//!     "my_module::proto=debug",
//! ]
//! ```

use indexmap::IndexMap;

use serde::{Deserialize, Serialize};

use crate::formatter::MergeOrder;
use crate::schema::Schema;
use crate::template::FormatStyle;

/// A [`tracing`][mod@t] [`Level (check docs)`][struct@t::Level]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Level {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

/// Where formatted lines are written.
/// # Example
/// ```toml
/// [writer]
/// type = "standard_error"
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[serde(tag = "type")]
pub enum Writer {
    StandardOutput,
    StandardError,
}

/// The root filter.
/// # Example
/// ```toml
/// [filter]
/// level = "trace" # possible values are : "trace", "debug", "info", "warn", "error"
/// directives = [ # see tracing subscriber env filter for more details
///     "my_module::proto=info" # however my_module::proto only emits info events and above
/// ]
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    /// Base filter level
    pub level: Level,
    /// See docs at [`EnvFilter`][struct@ts::filter::EnvFilter] `Directives` section
    pub directives: Option<Vec<String>>,
}

/// [`JsonMapFormatter`][struct@crate::formatter::JsonMapFormatter] configuration.
///
/// `null` is a string here, toml has no null value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FormatterConfig {
    /// Overflow path
    pub extra_keys: Option<Vec<String>>,
    /// Sub path of `extra_keys` for plain positional arguments
    pub args_key: Option<Vec<String>>,
    pub null: Option<String>,
    pub strip: Option<bool>,
    pub merge_order: Option<MergeOrder>,
    pub reuse_tree: Option<bool>,
    pub pretty_json: Option<bool>,
    pub fmt: Option<String>,
    pub datefmt: Option<String>,
    pub style: Option<FormatStyle>,
    /// IANA timezone name
    pub timezone: Option<String>,
    pub remap: Option<IndexMap<String, String>>,
    pub aux_map: Option<IndexMap<String, String>>,
    pub schema: Option<Schema>,
}

/// This represents the whole configuration file.
/// - `title` : does not do anything, it is for your reference
/// - `formatter` : the formatter settings, may be omitted entirely
/// - `writer` : where the formatted lines go
/// - `filter` : the root filter
///
/// # Example :
/// ```toml
/// title = "My App tracing-jsonmap Config"
///
/// [formatter]
/// strip = true
///
/// [writer]
/// type = "standard_output"
///
/// [filter]
/// level = "info"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonMapConfig {
    pub title: String,
    #[serde(default)]
    pub formatter: FormatterConfig,
    pub writer: Writer,
    pub filter: Filter,
}
