//! The config module contains the data model for the configuration file and [`tracing`][mod@t] initialization routines.
//!
//! This uses the [`serde`][mod@serde] and [`toml`][mod@toml] crates to serialize and deserialize the configuration file.
//! Once the configuration is read from disk, environment variables are then resolved.
//!
//! See the [`template`][mod@crate::template] module for an understanding of how the variables are resolved.
//!
//! The [`model`][mod@model] submodule simply contains the configuration data model, start from there to understand how to write your tracing-jsonmap.toml.
//!
//! This module contains tracing initialization routines.
//!
//! - [`init`][fn@init] in your `main()`, panics
//! - [`try_init`][fn@try_init] If you would like to avoid panics
//! - [`init_path`][fn@init_path] You already know the configuration file path.
//! - [`init_config`][fn@init_config] You build the configuration in code.

pub mod model;

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::{fs, io::Write as _};

use serde_json::value::Value as JsonValue;

use ts::layer::SubscriberExt as _;
use ts::Layer as _;

use crate::error::JsonMapError;
use crate::formatter::auxiliary::{AuxKeys, TimeFormat};
use crate::formatter::text::TextFormatter;
use crate::formatter::JsonMapFormatter;
use crate::template::resolve_from_env_recursive;
use crate::tracing::JsonMapLayer;

/// The value is set in stone at `25`
///
/// This represents the `depth` with which [`resolve_from_env_recursive`][fn@resolve_from_env_recursive] is called by this module.
pub const RESOLVE_FROM_ENV_DEPTH: u8 = 25;

/// Name of the configuration file searched for by [`find_config_path`][fn@find_config_path].
pub const CONFIG_FILE_NAME: &str = "tracing-jsonmap.toml";

/// Allows the init functions to return [`AlreadyInitialized`][JsonMapError::AlreadyInitialized] rather than other more ambiguous errors.
static TRACING_INITIALIZED: Mutex<bool> = Mutex::new(false);

/// A [`boxed`][fn@ts::Layer::boxed] [`tracing subscriber`][mod@ts] [`Layer`][trait@ts::layer::Layer]
pub type BoxDynLayer<S> = Box<dyn ts::Layer<S> + Send + Sync>;
/// The registry with the root filter applied.
pub type FilteredRegistry = ts::layer::Layered<ts::EnvFilter, ts::Registry>;
/// Represents a full [`tracing`][mod@t] [`Subscriber`][trait@t::Subscriber] : registry, root filter and the [`JsonMapLayer`][struct@JsonMapLayer].
pub type JsonMapSubscriber = ts::layer::Layered<BoxDynLayer<FilteredRegistry>, FilteredRegistry>;

/// Helper macro to set formatter.with_
macro_rules! set_conf {
    ($target:ident, $cfg:ident, $prop:ident, $with_fn:ident) => {
        match &$cfg.$prop {
            Some(val) => $target.$with_fn(val.clone()),
            None => $target,
        }
    };
}

/// String representation for data model Level
impl AsRef<str> for model::Level {
    fn as_ref(&self) -> &str {
        match self {
            model::Level::Trace => "trace",
            model::Level::Debug => "debug",
            model::Level::Info => "info",
            model::Level::Warn => "warn",
            model::Level::Error => "error",
        }
    }
}

/// Builds a formatter from its configuration, unset properties keep the formatter defaults.
impl TryFrom<&model::FormatterConfig> for JsonMapFormatter {
    type Error = JsonMapError;

    fn try_from(cfg: &model::FormatterConfig) -> Result<Self, Self::Error> {
        let time_format = TimeFormat::new().with_datefmt(cfg.datefmt.clone());
        let time_format = match &cfg.timezone {
            Some(timezone) => time_format.with_timezone_name(timezone)?,
            None => time_format,
        };

        let text = TextFormatter::default();
        let text = TextFormatter::new(
            cfg.fmt.as_deref().unwrap_or(text.fmt()),
            cfg.style.unwrap_or(text.style()),
        );

        let formatter = JsonMapFormatter::new()
            .with_remap(cfg.remap.clone())
            .with_time_format(time_format)
            .with_text(text);
        let formatter = set_conf!(formatter, cfg, schema, with_schema);
        let formatter = set_conf!(formatter, cfg, extra_keys, with_extra_keys);
        let formatter = set_conf!(formatter, cfg, args_key, with_args_key);
        let formatter = set_conf!(formatter, cfg, strip, with_strip);
        let formatter = set_conf!(formatter, cfg, merge_order, with_merge_order);
        let formatter = set_conf!(formatter, cfg, reuse_tree, with_reuse_tree);
        let formatter = set_conf!(formatter, cfg, pretty_json, with_pretty_json);
        let formatter = match &cfg.aux_map {
            Some(aux_map) => formatter.with_aux_keys(AuxKeys::remapped(aux_map)),
            None => formatter,
        };
        let formatter = match &cfg.null {
            Some(null) => formatter.with_null(JsonValue::String(null.clone())),
            None => formatter,
        };

        Ok(formatter)
    }
}

/// Creates the root [`EnvFilter`][struct@ts::filter::EnvFilter] from `cfg_filter`.
///
/// # Returns
/// The `EnvFilter` or a [`FilterParseError`][JsonMapError::FilterParseError] naming the offending directive.
fn create_root_filter(cfg_filter: &model::Filter) -> Result<ts::filter::EnvFilter, JsonMapError> {
    let mut env_filter = ts::filter::EnvFilter::builder()
        .parse(cfg_filter.level)
        .map_err(|error| JsonMapError::FilterParseError {
            directive: cfg_filter.level.as_ref().to_owned(),
            error,
        })?;

    if let Some(directives) = &cfg_filter.directives {
        for directive in directives {
            let parsed = directive
                .parse()
                .map_err(|error| JsonMapError::FilterParseError {
                    directive: directive.clone(),
                    error,
                })?;
            env_filter = env_filter.add_directive(parsed);
        }
    }

    Ok(env_filter)
}

/// Creates the [`boxed`][fn@ts::Layer::boxed] [`JsonMapLayer`][struct@JsonMapLayer] writing to the configured writer.
fn create_layer(
    config: &model::JsonMapConfig,
) -> Result<BoxDynLayer<FilteredRegistry>, JsonMapError> {
    let formatter = JsonMapFormatter::try_from(&config.formatter)?;
    let layer = match config.writer {
        model::Writer::StandardOutput => JsonMapLayer::new(std::io::stdout)
            .with_formatter(formatter)
            .boxed(),
        model::Writer::StandardError => JsonMapLayer::new(std::io::stderr)
            .with_formatter(formatter)
            .boxed(),
    };
    Ok(layer)
}

/// Creates a [`tracing`][mod@t] [`Subscriber`][trait@t::Subscriber] implemented by a [`tracing-subscriber`][mod@ts] [`Layered`][struct@ts::layer::Layered] [`Registry`][struct@ts::registry::Registry]
///
/// The layered registry calls, in order:
/// - The root [`EnvFilter`][struct@ts::EnvFilter] configured by the `[filter]` table.
/// - The [`JsonMapLayer`][struct@JsonMapLayer], which also keeps the span fields in the span [`Extensions`][struct@ts::registry::Extensions].
pub fn create_subscriber(
    config: &model::JsonMapConfig,
) -> Result<JsonMapSubscriber, JsonMapError> {
    let layer = create_layer(config)?;

    // registry -> filter -> jsonmap layer
    let registry = ts::registry::Registry::default()
        .with(create_root_filter(&config.filter)?)
        .with(layer);

    Ok(registry)
}

/// Searches for a configuration file and returns it's path.
///
/// The function will first check if the environment variable `tracing_jsonmap` is set.
/// If set it will resolve all `${env:key}` tokens where `key` is another environment variable (see [`resolve_from_env_recursive`][fn@resolve_from_env_recursive]).
/// Should errors occur during `resolve_from_env_recursive`, the original `tracing_jsonmap` value will be used.
///
/// - If it points to an existing file, it's path is returned.
/// - If it points to an existing directory, the directory is searched first.
///
/// The fallback directories are the directory of the executable and then the current working directory.
/// In each directory the file searched for is [`CONFIG_FILE_NAME`][CONFIG_FILE_NAME].
///
/// # Arguments
/// * `debug_mode` - If `true` it will [`println`][macro@println] information about the search.
pub fn find_config_path(debug_mode: bool) -> Option<PathBuf> {
    use std::env;

    let mut directories = Vec::new();

    if let Ok(env_path) = env::var("tracing_jsonmap") {
        let env_path = resolve_from_env_recursive(&env_path, RESOLVE_FROM_ENV_DEPTH)
            .unwrap_or_else(|var_error| {
                if debug_mode {
                    println!(
                        "[tracing-jsonmap] could not resolve ${{env:key}} tokens, error is : {var_error:?}"
                    );
                }
                env_path
            });
        let env_path = PathBuf::from(env_path);

        if env_path.is_file() {
            return Some(env_path);
        }
        directories.push(env_path);
    }

    if let Some(bin_dir) = env::current_exe()
        .ok()
        .and_then(|exe_path| exe_path.parent().map(Path::to_path_buf))
    {
        directories.push(bin_dir);
    }
    if let Ok(current_dir) = env::current_dir() {
        directories.push(current_dir);
    }

    for dir in directories {
        let config_path = dir.join(CONFIG_FILE_NAME);
        if debug_mode {
            println!("[tracing-jsonmap] checking path: {}", config_path.display());
        }
        if config_path.is_file() {
            if debug_mode {
                println!(
                    "[tracing-jsonmap] found configuration file path: {}",
                    config_path.display()
                );
            }
            return Some(config_path);
        }
    }

    None
}

/// Writes `config` to `file_path`.
///
/// This is useful if you don't want to bother to read the docs, build a [`JsonMapConfig`][struct@model::JsonMapConfig] in code and let the compiler guide you.
///
/// # Returns
/// A [`JsonMapError`][enum@JsonMapError] in case the operation could not be completed.
pub fn write_config(config: &model::JsonMapConfig, file_path: &Path) -> Result<(), JsonMapError> {
    let toml_string = toml::to_string(config)?;

    let mut file = fs::File::create(file_path)?;
    file.write_all(toml_string.as_bytes())?;

    t::debug!(path = %file_path.display(), "configuration written");
    Ok(())
}

/// Reads a [`JsonMapConfig`][struct@model::JsonMapConfig] from `file_path`.
///
/// This function also resolves all environment variables `${env:key}` up to `resolve_from_env_depth` for all [`toml String`][type@toml::Value::String] values
/// (see [`resolve_from_env_recursive`][fn@crate::template::toml::resolve_from_env_recursive]).
///
/// # Returns
/// A [`JsonMapConfig`][struct@model::JsonMapConfig] object or a [`JsonMapError`][enum@JsonMapError] in case the operation could not be completed.
pub fn read_config(
    file_path: &Path,
    resolve_from_env_depth: u8,
) -> Result<model::JsonMapConfig, JsonMapError> {
    let toml_string = fs::read_to_string(file_path)?;

    let mut toml_value: toml::Value = toml::from_str(&toml_string)?;
    crate::template::toml::resolve_from_env_recursive(&mut toml_value, resolve_from_env_depth)?;

    let config: model::JsonMapConfig = toml_value.try_into()?;

    t::debug!(path = %file_path.display(), title = %config.title, "configuration read");
    Ok(config)
}

/// Returns `true` if the environment variable `tracing_jsonmap_debug` is set to the value `true`
#[inline(always)]
pub fn get_env_debug_mode() -> bool {
    std::env::var("tracing_jsonmap_debug")
        .map(|val| val == "true")
        .unwrap_or(false)
}

/// Calls [`try_init`][fn@try_init] with `debug_mode` = true if environment variable `tracing_jsonmap_debug = true`
///
/// See docs at [`find_config_path`][fn@find_config_path] to understand where this function looks for the configuration file.
///
/// # Panics
/// If `try_init` returns an error this panics with the same error.
pub fn init() {
    let debug_mode = get_env_debug_mode();
    if let Err(init_error) = try_init(debug_mode) {
        if debug_mode {
            println!("[tracing-jsonmap] init error; : (see previous messages) {init_error:#?}");
        }
        panic!("[tracing-jsonmap] init error; : {init_error:#?}");
    }
}

/// Initializes [`tracing`][mod@t] from the configuration file found by [`find_config_path`][fn@find_config_path].
///
/// # Parameters
/// * `debug_mode` - If true and something goes wrong, prints the error message.
pub fn try_init(debug_mode: bool) -> Result<(), JsonMapError> {
    let config_path = match find_config_path(debug_mode) {
        Some(config_path) => config_path,
        None => {
            if debug_mode {
                println!("[tracing-jsonmap] could not find the configuration file, please create a {CONFIG_FILE_NAME} file or set the tracing_jsonmap env var");
            }
            return Err(JsonMapError::Other(
                "could not find the configuration file".to_owned(),
            ));
        }
    };
    init_path(debug_mode, config_path.as_path())
}

/// Initializes [`tracing`][mod@t] given `config_path`
///
/// # Parameters
/// * `debug_mode` - If true and something goes wrong, prints the error message.
/// * `config_path` - Path to a toml file which deserializes into a [`JsonMapConfig`][struct@model::JsonMapConfig].
pub fn init_path(debug_mode: bool, config_path: &Path) -> Result<(), JsonMapError> {
    let config = match read_config(config_path, RESOLVE_FROM_ENV_DEPTH) {
        Ok(config) => config,
        Err(read_error) => {
            if debug_mode {
                println!("[tracing-jsonmap] init error; could not read the config file. path = {}; error : {read_error:?}", config_path.display());
            }
            return Err(read_error);
        }
    };

    if debug_mode {
        println!(
            "[tracing-jsonmap] loaded configuration file titled : {}",
            config.title
        );
    }

    init_config(debug_mode, &config)
}

/// Initializes [`tracing`][mod@t] given `config`
///
/// See docs at [`set_global_default`][fn@t::subscriber::set_global_default]
///
/// # Parameters
/// * `debug_mode` - If true and something goes wrong, prints the error message.
/// * `config` - A [`JsonMapConfig`][struct@model::JsonMapConfig] object containing everything.
pub fn init_config(debug_mode: bool, config: &model::JsonMapConfig) -> Result<(), JsonMapError> {
    let mut is_tracing_initialized = match TRACING_INITIALIZED.lock() {
        Ok(mtx_guard) => mtx_guard,
        Err(_poison) => {
            if debug_mode {
                println!("[tracing-jsonmap] init error; init lock is poisoned, this is a bug!");
            }
            return Err(JsonMapError::PoisonError("TRACING_INITIALIZED".to_owned()));
        }
    };

    if *is_tracing_initialized {
        if debug_mode {
            println!("[tracing-jsonmap] init error; init functions may be called only once, usually in the main() function");
        }
        return Err(JsonMapError::AlreadyInitialized);
    }

    let subscriber = match create_subscriber(config) {
        Ok(subscriber) => subscriber,
        Err(error) => {
            if debug_mode {
                println!("[tracing-jsonmap] init error; could not create a subscriber : {error:#?}");
            }
            return Err(error);
        }
    };

    if let Err(error) = t::subscriber::set_global_default(subscriber) {
        if debug_mode {
            println!("[tracing-jsonmap] init error; could not set subscriber as global default : {error:#?}");
        }
        return Err(error.into());
    }

    *is_tracing_initialized = true;

    t::info!("Tracing successfully initialized!");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::MergeOrder;

    #[test]
    fn formatter_from_config() {
        let cfg = model::FormatterConfig {
            merge_order: Some(MergeOrder::ArgumentsFirst),
            null: Some("-".to_owned()),
            timezone: Some("UTC".to_owned()),
            ..Default::default()
        };
        assert!(JsonMapFormatter::try_from(&cfg).is_ok());

        let cfg = model::FormatterConfig {
            timezone: Some("Nowhere/Atlantis".to_owned()),
            ..Default::default()
        };
        assert!(matches!(
            JsonMapFormatter::try_from(&cfg),
            Err(JsonMapError::UnknownTimezone(_))
        ));
    }

    #[test]
    fn invalid_directive_is_reported() {
        let filter = model::Filter {
            level: model::Level::Info,
            directives: Some(vec!["my_crate=verbose".to_owned()]),
        };
        match create_root_filter(&filter) {
            Err(JsonMapError::FilterParseError { directive, .. }) => {
                assert_eq!(directive, "my_crate=verbose")
            }
            other => panic!("unexpected : {other:?}"),
        }
    }
}
