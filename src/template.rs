//! Placeholder rendering for the text layer and the configuration file.
//!
//! Three placeholder styles are understood, see [`FormatStyle`][enum@FormatStyle]:
//! - `percent` : `%(key)s`, with an optional `-` flag, width and `.precision`, e.g. `%(levelname)-8s`. `%%` is a literal `%`.
//! - `brace` : `{key}`, with an optional `:` alignment (`<`, `>`, `^`) and width, e.g. `{levelname:<8}`. `{{` and `}}` are literal braces.
//! - `dollar` : `${key}` or `$key`. `$$` is a literal `$`.
//!
//! # Resolver function
//! Rendering calls a `resolver` closure for every placeholder key.
//! - If the key is known it should return `Ok(Some(value))` and the placeholder is replaced.
//! - If the key is unknown it should return `Ok(None)`, the placeholder is left verbatim.
//! - Should the resolver return an `Err` the same error is returned to the caller.
//!
//! The resolver is only called once per key, other occurrences of the same key use a cached value.
//!
//! # Environment variables
//! Configuration files may contain `${env:key}` tokens, these are resolved by [`resolve_from_env_recursive`][fn@resolve_from_env_recursive].
//! Only the braced form is recognized there, any other `$` is kept as is.

pub use self::error::VarError;

use std::collections::hash_map::Entry::{Occupied, Vacant};
use std::collections::HashMap;
use std::iter::Peekable;
use std::str::Chars;

use serde::{Deserialize, Serialize};

/// Placeholder style of a text format string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FormatStyle {
    /// `%(key)s`
    #[default]
    Percent,
    /// `{key}`
    Brace,
    /// `${key}`
    Dollar,
}

/// Renders `template` replacing every placeholder of the given `style`.
/// See [`module`][mod@self] level docs.
///
/// # Usage
/// ```
/// # use tracing_jsonmap::template::{render, FormatStyle};
/// let line = render::<std::convert::Infallible, _>("%(levelname)-5s|%(msg)s", FormatStyle::Percent, |key| {
///     Ok(match key {
///         "levelname" => Some("INFO".to_owned()),
///         "msg" => Some("hello".to_owned()),
///         _ => None,
///     })
/// })
/// .unwrap();
/// assert_eq!(line, "INFO |hello");
/// ```
pub fn render<E, F>(template: &str, style: FormatStyle, mut resolver: F) -> Result<String, E>
where
    F: FnMut(&str) -> Result<Option<String>, E>,
{
    let mut cache = HashMap::new();
    Ok(render_private(template, style, false, &mut cache, &mut resolver)?.0)
}

/// Same as [`render`][fn@render] for resolvers that never fail.
pub fn render_infallible<F>(template: &str, style: FormatStyle, mut resolver: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let mut cache = HashMap::new();
    match render_private::<std::convert::Infallible, _>(
        template,
        style,
        false,
        &mut cache,
        &mut |key| Ok(resolver(key)),
    ) {
        Ok((result, _)) => result,
        Err(never) => match never {},
    }
}

/// Iteratively replaces `${env:key}` tokens with environment variable values up to `depth` times,
/// values that contain tokens themselves are resolved on the next pass.
///
/// # Returns
/// The interpolated `input` or a [`VarError`][enum@VarError] naming the missing variable.
pub fn resolve_from_env_recursive(input: &str, mut depth: u8) -> Result<String, VarError> {
    let mut cache = HashMap::new();
    let mut resolver = |key: &str| match key.strip_prefix("env:") {
        Some(name) => std::env::var(name)
            .map(Some)
            .map_err(|err| VarError::from_std(name, err)),
        None => Ok(None),
    };

    let mut result = input.to_owned();
    while depth >= 1 {
        let (rendered, resolver_useful) =
            render_private(&result, FormatStyle::Dollar, true, &mut cache, &mut resolver)?;
        result = rendered;
        if !resolver_useful {
            break;
        }
        depth -= 1;
    }
    Ok(result)
}

/// Horizontal alignment of a padded value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Align {
    Left,
    Right,
    Center,
}

/// Formatting options parsed from a placeholder.
#[derive(Debug, Clone, Copy)]
struct Conversion {
    align: Align,
    width: usize,
    precision: Option<usize>,
}

impl Conversion {
    fn apply(&self, value: &str) -> String {
        let value = match self.precision.and_then(|p| value.parse::<f64>().ok().map(|v| (p, v))) {
            Some((precision, number)) => format!("{number:.precision$}"),
            None => value.to_owned(),
        };
        let width = self.width;
        match self.align {
            Align::Left => format!("{value:<width$}"),
            Align::Right => format!("{value:>width$}"),
            Align::Center => format!("{value:^width$}"),
        }
    }
}

type Cache = HashMap<String, Option<String>>;

/// Looks up `key` in `cache`, calling `resolver` on a miss.
///
/// # Returns
/// The cached value and whether `resolver` was called and returned `Some`.
fn lookup<'c, E, F>(
    key: &str,
    cache: &'c mut Cache,
    resolver: &mut F,
) -> Result<(&'c Option<String>, bool), E>
where
    F: FnMut(&str) -> Result<Option<String>, E>,
{
    match cache.entry(key.to_owned()) {
        Occupied(entry) => Ok((entry.into_mut(), false)),
        Vacant(entry) => {
            let value = resolver(key)?;
            let useful = value.is_some();
            Ok((entry.insert(value), useful))
        }
    }
}

/// # Returns
/// - `Ok`(`rendered`, `resolver_useful`); `resolver_useful` is `true` if `resolver` returned `Ok(Some(value))`
/// - `Err`(`resolver_error`) In case `resolver` returns an `Err`.
fn render_private<E, F>(
    template: &str,
    style: FormatStyle,
    braced_only: bool,
    cache: &mut Cache,
    resolver: &mut F,
) -> Result<(String, bool), E>
where
    F: FnMut(&str) -> Result<Option<String>, E>,
{
    let mut out = String::with_capacity(template.len());
    let mut useful = false;
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        let token = match (style, c) {
            (FormatStyle::Percent, '%') => parse_percent(&mut chars),
            (FormatStyle::Brace, '{') => parse_brace(&mut chars),
            (FormatStyle::Brace, '}') => {
                if chars.peek() == Some(&'}') {
                    chars.next();
                }
                Token::Literal("}".to_owned())
            }
            (FormatStyle::Dollar, '$') => parse_dollar(&mut chars, braced_only),
            _ => Token::Literal(c.to_string()),
        };

        match token {
            Token::Literal(literal) => out.push_str(&literal),
            Token::Placeholder { key, spec, raw } => {
                let (value, resolved) = lookup(&key, cache, resolver)?;
                useful |= resolved;
                match value {
                    Some(value) => out.push_str(&spec.apply(value)),
                    None => out.push_str(&raw),
                }
            }
        }
    }

    Ok((out, useful))
}

enum Token {
    Literal(String),
    Placeholder { key: String, spec: Conversion, raw: String },
}

// #states (percent)
// Start   : '%' > Literal("%") | '(' > Key | other > Literal("%" + other)
// Key     : ')' > Flags | other > Key
// Flags   : '-' > Width | digit > Width | other > Width
// Width   : digit > Width | '.' > Precision | alpha > Done
// Precision : digit > Precision | alpha > Done
fn parse_percent(chars: &mut Peekable<Chars<'_>>) -> Token {
    let mut raw = String::from("%");
    match chars.peek() {
        Some('%') => {
            chars.next();
            return Token::Literal("%".to_owned());
        }
        Some('(') => {
            chars.next();
            raw.push('(');
        }
        _ => return Token::Literal(raw),
    }

    let mut key = String::new();
    loop {
        match chars.next() {
            Some(')') => {
                raw.push(')');
                break;
            }
            Some(c) => {
                raw.push(c);
                key.push(c);
            }
            None => return Token::Literal(raw),
        }
    }

    let mut spec = Conversion {
        align: Align::Right,
        width: 0,
        precision: None,
    };
    if chars.peek() == Some(&'-') {
        chars.next();
        raw.push('-');
        spec.align = Align::Left;
    }
    spec.width = take_number(chars, &mut raw).unwrap_or(0);
    if chars.peek() == Some(&'.') {
        chars.next();
        raw.push('.');
        spec.precision = Some(take_number(chars, &mut raw).unwrap_or(0));
    }
    match chars.peek() {
        Some(c) if c.is_ascii_alphabetic() => {
            raw.push(*c);
            chars.next();
            Token::Placeholder { key, spec, raw }
        }
        _ => Token::Literal(raw),
    }
}

fn parse_brace(chars: &mut Peekable<Chars<'_>>) -> Token {
    if chars.peek() == Some(&'{') {
        chars.next();
        return Token::Literal("{".to_owned());
    }

    let mut raw = String::from("{");
    let mut key = String::new();
    let mut format_spec: Option<String> = None;
    loop {
        match chars.next() {
            Some('}') => {
                raw.push('}');
                break;
            }
            Some(':') if format_spec.is_none() => {
                raw.push(':');
                format_spec = Some(String::new());
            }
            Some(c) => {
                raw.push(c);
                match format_spec.as_mut() {
                    Some(format_spec) => format_spec.push(c),
                    None => key.push(c),
                }
            }
            None => return Token::Literal(raw),
        }
    }

    let mut spec = Conversion {
        align: Align::Left,
        width: 0,
        precision: None,
    };
    if let Some(format_spec) = format_spec {
        let mut rest = format_spec.as_str();
        if let Some(first) = rest.chars().next() {
            let align = match first {
                '<' => Some(Align::Left),
                '>' => Some(Align::Right),
                '^' => Some(Align::Center),
                _ => None,
            };
            if let Some(align) = align {
                spec.align = align;
                rest = &rest[1..];
            }
        }
        let (width, precision) = match rest.split_once('.') {
            Some((width, precision)) => (width, precision.trim_end_matches('f').parse().ok()),
            None => (rest, None),
        };
        spec.width = width.parse().unwrap_or(0);
        spec.precision = precision;
    }
    Token::Placeholder { key, spec, raw }
}

fn parse_dollar(chars: &mut Peekable<Chars<'_>>, braced_only: bool) -> Token {
    let plain = Conversion {
        align: Align::Left,
        width: 0,
        precision: None,
    };
    match chars.peek() {
        Some('$') if !braced_only => {
            chars.next();
            Token::Literal("$".to_owned())
        }
        Some('{') => {
            chars.next();
            let mut raw = String::from("${");
            let mut key = String::new();
            loop {
                match chars.next() {
                    Some('}') => {
                        raw.push('}');
                        return Token::Placeholder {
                            key,
                            spec: plain,
                            raw,
                        };
                    }
                    Some(c) => {
                        raw.push(c);
                        key.push(c);
                    }
                    None => return Token::Literal(raw),
                }
            }
        }
        Some(c) if !braced_only && (c.is_ascii_alphabetic() || *c == '_') => {
            let mut key = String::new();
            while let Some(c) = chars.peek() {
                if c.is_ascii_alphanumeric() || *c == '_' {
                    key.push(*c);
                    chars.next();
                } else {
                    break;
                }
            }
            let raw = format!("${key}");
            Token::Placeholder {
                key,
                spec: plain,
                raw,
            }
        }
        _ => Token::Literal("$".to_owned()),
    }
}

fn take_number(chars: &mut Peekable<Chars<'_>>, raw: &mut String) -> Option<usize> {
    let mut digits = String::new();
    while let Some(c) = chars.peek() {
        if c.is_ascii_digit() {
            digits.push(*c);
            raw.push(*c);
            chars.next();
        } else {
            break;
        }
    }
    digits.parse().ok()
}

/// Interpolation for [`toml`][mod@::toml] [`Value`][enum@::toml::Value].
pub mod toml {
    use super::error::VarError;
    use toml::Value::{
        self as TomlValue, Array as TomlArray, Boolean as TomlBool, Datetime as TomlDateTime,
        Float as TomlFloat, Integer as TomlInt, String as TomlString, Table as TomlTable,
    };

    /// Recursively replaces any `${env:key}` placeholders with environment variable values in any toml [`Value`][enum@TomlValue] where the value is a toml [`String`][type@TomlString].
    /// See the [`resolve_from_env_recursive`][fn@super::resolve_from_env_recursive] function.
    pub fn resolve_from_env_recursive(value: &mut TomlValue, depth: u8) -> Result<(), VarError> {
        match value {
            TomlBool(_) | TomlInt(_) | TomlFloat(_) | TomlDateTime(_) => Ok(()),
            TomlString(str_val) => {
                let replaced = super::resolve_from_env_recursive(str_val, depth)?;
                *value = TomlString(replaced);
                Ok(())
            }
            TomlTable(map) => {
                for (_key, val) in map.iter_mut() {
                    resolve_from_env_recursive(val, depth)?;
                }
                Ok(())
            }
            TomlArray(array) => {
                for val in array.iter_mut() {
                    resolve_from_env_recursive(val, depth)?;
                }
                Ok(())
            }
        }
    }
}

/// Interpolation errors
mod error {
    use std::env::VarError as StdVarError;
    use std::error::Error as StdError;
    use std::ffi::OsString;
    use std::fmt::Display;
    use std::fmt::Formatter;
    use std::fmt::Result as FmtResult;

    /// This is the same error type as defined in [`std::env::VarError`][enum@StdVarError] with the added originally requested `key`.
    #[derive(Debug)]
    pub enum VarError {
        NotPresent { key: String },
        NotUnicode { key: String, value: OsString },
    }

    impl StdError for VarError {}

    impl Display for VarError {
        fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
            match &self {
                VarError::NotPresent { key } => write!(f, "environment variable `{key}` not found"),
                VarError::NotUnicode { key, value } => {
                    write!(f, "environment variable `{key}` was not valid unicode: {value:?}")
                }
            }
        }
    }

    impl VarError {
        pub fn from_std(key: &str, err: StdVarError) -> Self {
            match err {
                StdVarError::NotPresent => Self::NotPresent {
                    key: key.to_owned(),
                },
                StdVarError::NotUnicode(os_str) => Self::NotUnicode {
                    key: key.to_owned(),
                    value: os_str,
                },
            }
        }
    }
}
