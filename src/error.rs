//! Primary error types for this crate.

use crate::template::VarError;
use t::subscriber::SetGlobalDefaultError;

use serde_json::Error as JsonError;
use std::io::Error as StdIoError;
use thiserror::Error as ThisError;
use toml::de::Error as TomlDeError;
use toml::ser::Error as TomlSerError;
use ts::filter::ParseError as TsFilterParseError;

/// The only error type, wraps other errors
///
/// Formatting a record only ever fails with [`Serialization`][JsonMapError::Serialization];
/// missing fields and overflow path collisions are handled without errors.
/// Every other variant comes from reading a configuration file or installing the global subscriber.
#[derive(ThisError, Debug)]
pub enum JsonMapError {
    #[error("Tracing was already initialized")]
    AlreadyInitialized,
    #[error("Could not initialize because : `{0}`")]
    Other(String),
    #[error("The schema is not a json object, found : `{0}`")]
    SchemaNotAnObject(String),
    #[error("Unknown timezone `{0}`")]
    UnknownTimezone(String),
    #[error("Could not parse the filter directive `{directive}`")]
    FilterParseError {
        directive: String,
        error: TsFilterParseError,
    },

    #[error("The assembled document could not be serialized : `{0}`")]
    Serialization(#[from] JsonError),
    #[error("Could not find environment variable : `{0}`")]
    MissingEnvironmentVariable(#[from] VarError),
    #[error("Configuration file does not exist or it could not be read : `{0}`")]
    IoError(#[from] StdIoError),
    #[error("Deserialization error, configuration file is either not syntactically a toml file or not a JsonMapConfig struct : `{0}`")]
    Deserialization(#[from] TomlDeError),
    #[error("Serialization error, configuration file could not be serialized : `{0}`")]
    ConfigSerialization(#[from] TomlSerError),
    #[error("Could not set tracing global subscriber : `{0}`")]
    InitError(#[from] SetGlobalDefaultError),
    #[error("A lock was poisoned lock name = `{0}`")]
    PoisonError(String),
}
