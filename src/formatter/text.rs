//! The final line renderer, driven by a format string and a placeholder style.

use serde_json::value::Value as JsonValue;

use crate::formatter::auxiliary::TimeFormat;
use crate::record::{json_value_to_string, LogRecord};
use crate::template::{self, FormatStyle};

/// Renders a [`LogRecord`][struct@LogRecord] into a line of text.
///
/// Placeholders may name any native field of the record plus:
/// - `message` : the record message
/// - `asctime` : the record time, rendered by the formatter's [`TimeFormat`][struct@TimeFormat]
///
/// Native fields the record has no value for render as an empty string, unknown keys are kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct TextFormatter {
    fmt: String,
    style: FormatStyle,
}

impl Default for TextFormatter {
    fn default() -> Self {
        Self {
            fmt: "%(message)s".to_owned(),
            style: FormatStyle::Percent,
        }
    }
}

impl TextFormatter {
    pub fn new(fmt: &str, style: FormatStyle) -> Self {
        Self {
            fmt: fmt.to_owned(),
            style,
        }
    }

    pub fn fmt(&self) -> &str {
        &self.fmt
    }

    pub fn style(&self) -> FormatStyle {
        self.style
    }

    pub fn format(&self, record: &LogRecord, time_format: &TimeFormat) -> String {
        let fields = record.fields();
        let mut line = template::render_infallible(&self.fmt, self.style, |key| match key {
            "message" => Some(record.msg.clone()),
            "asctime" => Some(time_format.format(record.created)),
            key => match fields.get(key) {
                Some(JsonValue::Null) => Some(String::new()),
                Some(value) => Some(json_value_to_string(value)),
                None if record.is_native(key) => Some(String::new()),
                None => None,
            },
        });

        if let Some(exc_info) = &record.exc_info {
            let trace = match &record.exc_text {
                Some(exc_text) => exc_text.clone(),
                None => exc_info.render(),
            };
            if !line.ends_with('\n') {
                line.push('\n');
            }
            line.push_str(&trace);
        }

        line
    }
}
