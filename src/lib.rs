// #![deny(missing_docs)]
#![forbid(unsafe_code)]

//! Formats log records as json documents whose layout is declared by a nested key schema.
//!
//! A [`Schema`][struct@schema::Schema] is an ordered template of keys.
//! For every record the [`JsonMapFormatter`][struct@formatter::JsonMapFormatter] fills each schema leaf with the
//! record field of the same name, places whatever the schema did not ask for under an overflow path
//! (`extra.data` by default) and renders the document through a classic format string (`%(message)s` by default).
//!
//! ```json
//! {"time": "2024-05-01 13:45:12,042", "levelname": "INFO", "name": "app", "msg": "hello",
//!  "extra": {"funcName": "handle", "lineno": 42, "pathname": "src/main.rs",
//!            "exception": {"exctype": "", "excvalue": "", "exctrace": ""},
//!            "data": {"user": "bob"}}}
//! ```
//!
//! Records come either from your own code, see [`LogRecord`][struct@record::LogRecord],
//! or from [`tracing`][mod@t] events through the [`JsonMapLayer`][struct@tracing::JsonMapLayer].
//!
//! # Getting started
//! ```toml
//! # Cargo.toml
//! tracing-jsonmap = { version = "0.1" }
//! tracing = { version = "0.1" }
//! ```
//! ```rust ignore
//! // main.rs
//! use tracing::info;
//! use tracing::info_span;
//! fn main() {
//!     // Beware, the init() function panics ! Read the docs.
//!     tracing_jsonmap::init();
//!     let _span = info_span!("main").entered();
//!     info!(user = "bob", "Hello World");
//! }
//! ```
//!
//! # Without a configuration file
//! ```rust ignore
//! use tracing_jsonmap::formatter::JsonMapFormatter;
//! use tracing_jsonmap::schema::Schema;
//! use tracing_jsonmap::tracing::JsonMapLayer;
//! use tracing_subscriber::layer::SubscriberExt as _;
//!
//! let formatter = JsonMapFormatter::new()
//!     .with_schema(Schema::new().leaf("time").leaf("levelname").leaf("msg"))
//!     .with_strip(true);
//! let subscriber = tracing_subscriber::registry()
//!     .with(JsonMapLayer::new(std::io::stdout).with_formatter(formatter));
//! tracing::subscriber::with_default(subscriber, || tracing::info!("hello"));
//! ```
//!
//! # Configuration file search path
//! The [`init`][fn@init] function will load a `tracing-jsonmap.toml` configuration file given a default search path.
//! To understand the `search path` please read the documentation at [`find_config_path`][fn@config::find_config_path]
//! and/or enable `debug_mode` by setting the environment variable `tracing_jsonmap_debug`=`true` and monitoring your program standard output.
//!
//! # Rudimentary configuration file.
//! - `Note`: The configuration file can include environment variables in the form of `${env:key}` tokens where a toml string is present,
//!   for more details, read the [`config`][mod@config] module level docs and the [`template`][mod@template] module level docs.
//! ```toml
//! # tracing-jsonmap.toml
//! title = "json to stdout"
//!
//! [formatter]
//! strip = true
//!
//! [writer]
//! type = "standard_output"
//!
//! [filter]
//! level = "trace"
//! ```
//!
//! # Public modules
//! - [`formatter`][mod@formatter]: The formatter and its steps, field resolution, overflow, auxiliary values and the text layer.
//! - [`schema`][mod@schema]: The nested key template.
//! - [`record`][mod@record]: The log record data model.
//! - [`template`][mod@template]: Placeholder rendering and `${env:key}` resolution.
//! - [`tracing`][mod@tracing]: The tracing-subscriber layer.
//! - [`config`][mod@config]: Reads a configuration file, creates a tracing subscriber from it and initializes tracing's global subscriber.

// public crate level modules.

pub mod config;
pub mod formatter;
pub mod record;
pub mod schema;
pub mod template;
pub mod tracing;

// private crate level modules.

mod error;

// re-export the basic public api;
// advanced usage should require specific imports.

pub use self::config::init;
pub use self::config::init_path;
pub use self::config::try_init;
pub use self::error::JsonMapError;
pub use self::formatter::{JsonMapFormatter, MergeOrder};
pub use self::record::LogRecord;
pub use self::schema::Schema;
