//! The schema driven json formatter.
//!
//! A single [`format`][fn@JsonMapFormatter::format] call runs these steps:
//! 1. [`prepare_auxiliary`][fn@auxiliary::prepare_auxiliary] derives the formatted time and the exception entries.
//! 2. The record's native fields, the auxiliary map and the record's mapping arguments are merged into one flat source map,
//!    see [`MergeOrder`][enum@MergeOrder].
//! 3. [`resolve`][fn@resolve::resolve] fills the output tree in schema order.
//! 4. [`collect_overflow`][fn@overflow::collect_overflow] nests whatever was not consumed under the extra path.
//! 5. If the record carries an exception, the top level `msg` becomes the exception value (or type name).
//! 6. The tree is serialized, stored in the record's `msg`, and the record is rendered by the [`TextFormatter`][struct@TextFormatter].
//!
//! # Usage
//! ```
//! use serde_json::json;
//! use tracing_jsonmap::formatter::JsonMapFormatter;
//! use tracing_jsonmap::record::LogRecord;
//! use tracing_jsonmap::schema::Schema;
//!
//! let schema = Schema::new().leaf("time").leaf("levelname").leaf("msg");
//! let mut formatter = JsonMapFormatter::new().with_schema(schema);
//! let mut record = LogRecord::new("app", "INFO", "hello").with_args(vec![json!({"user": "bob"})]);
//!
//! let line = formatter.format(&mut record).unwrap();
//! let document: serde_json::Value = serde_json::from_str(&line).unwrap();
//! assert_eq!(document["levelname"], "INFO");
//! assert_eq!(document["msg"], "hello");
//! assert_eq!(document["extra"]["data"]["user"], "bob");
//! ```

pub mod auxiliary;
pub mod overflow;
pub mod resolve;
pub mod text;

use std::collections::HashSet;

use indexmap::IndexMap;

use serde::{Deserialize, Serialize};

use serde_json::json;
use serde_json::Map as JsonMap;
use serde_json::value::Value as JsonValue;

use crate::error::JsonMapError;
use crate::record::LogRecord;
use crate::schema::Schema;

use self::auxiliary::{prepare_auxiliary, AuxKeys, TimeFormat};
use self::overflow::collect_overflow;
use self::resolve::{resolve, ResolveOptions};
use self::text::TextFormatter;

/// Precedence of the auxiliary map and the record's mapping arguments when both carry the same key.
///
/// Native fields are always merged first, either of the two may overwrite them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeOrder {
    /// native, then auxiliary, then arguments: an argument overrides an auxiliary value
    #[default]
    AuxiliaryFirst,
    /// native, then arguments, then auxiliary: the auxiliary value wins
    ArgumentsFirst,
}

/// Maps log records onto a nested key schema and renders them as json.
///
/// Every setting is fixed at construction through the `with_*` builder methods.
/// [`format`][fn@Self::format] takes `&mut self`, use one formatter per output target or wrap it in a `Mutex`
/// the way [`JsonMapLayer`][struct@crate::tracing::JsonMapLayer] does.
#[derive(Debug, Clone)]
pub struct JsonMapFormatter {
    schema: Schema,
    remap: Option<IndexMap<String, String>>,
    aux_keys: AuxKeys,
    extra_keys: Vec<String>,
    args_key: Vec<String>,
    null: JsonValue,
    strip: bool,
    merge_order: MergeOrder,
    reuse_tree: bool,
    pretty_json: bool,
    time_format: TimeFormat,
    text: TextFormatter,
    cached_document: Option<String>,
}

impl Default for JsonMapFormatter {
    fn default() -> Self {
        Self {
            schema: Schema::default(),
            remap: None,
            aux_keys: AuxKeys::default(),
            extra_keys: vec!["extra".to_owned(), "data".to_owned()],
            args_key: vec!["args".to_owned()],
            null: json!(""),
            strip: false,
            merge_order: MergeOrder::default(),
            reuse_tree: false,
            pretty_json: false,
            time_format: TimeFormat::default(),
            text: TextFormatter::default(),
            cached_document: None,
        }
    }
}

impl JsonMapFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schema(mut self, schema: Schema) -> Self {
        self.schema = schema;
        self
    }

    /// Schema leaf key to output key, the source is still queried by the schema key.
    pub fn with_remap(mut self, remap: Option<IndexMap<String, String>>) -> Self {
        self.remap = remap.filter(|remap| !remap.is_empty());
        self
    }

    pub fn with_aux_keys(mut self, aux_keys: AuxKeys) -> Self {
        self.aux_keys = aux_keys;
        self
    }

    /// Path of the overflow subtree, `["extra", "data"]` by default.
    pub fn with_extra_keys(mut self, extra_keys: Vec<String>) -> Self {
        self.extra_keys = extra_keys;
        self
    }

    /// Sub path of the extra path for plain positional arguments, `["args"]` by default.
    pub fn with_args_key(mut self, args_key: Vec<String>) -> Self {
        self.args_key = args_key;
        self
    }

    /// Value written for missing leaves, an empty string by default.
    pub fn with_null(mut self, null: JsonValue) -> Self {
        self.null = null;
        self
    }

    pub fn with_strip(mut self, strip: bool) -> Self {
        self.strip = strip;
        self
    }

    pub fn with_merge_order(mut self, merge_order: MergeOrder) -> Self {
        self.merge_order = merge_order;
        self
    }

    /// Keep the document built for the first record and emit it for every later record.
    pub fn with_reuse_tree(mut self, reuse_tree: bool) -> Self {
        self.reuse_tree = reuse_tree;
        self.cached_document = None;
        self
    }

    pub fn with_pretty_json(mut self, pretty_json: bool) -> Self {
        self.pretty_json = pretty_json;
        self
    }

    pub fn with_time_format(mut self, time_format: TimeFormat) -> Self {
        self.time_format = time_format;
        self
    }

    pub fn with_text(mut self, text: TextFormatter) -> Self {
        self.text = text;
        self
    }

    /// Builds the output tree of `record` without touching the record.
    pub fn build_tree(&self, record: &LogRecord) -> JsonMap<String, JsonValue> {
        let aux = prepare_auxiliary(record, &self.aux_keys, &self.time_format);
        let source = self.source(record, aux);

        let options = ResolveOptions {
            null: &self.null,
            strip: self.strip,
            remap: self.remap.as_ref(),
        };
        let mut consumed = HashSet::new();
        let (mut tree, _) = resolve(&self.schema, &source, &mut consumed, &options);

        collect_overflow(
            record,
            &source,
            &consumed,
            &self.extra_keys,
            &self.args_key,
            &mut tree,
        );

        // the exception itself is not json, its value stands in for the message
        if let Some(exc_info) = &record.exc_info {
            let value = match exc_info.args.first() {
                Some(first) => first.clone(),
                None => json!(exc_info.type_name),
            };
            tree.insert(options.output_key("msg").to_owned(), value);
        }

        tree
    }

    /// Serializes `tree` honoring the pretty json setting.
    pub fn to_document(&self, tree: &JsonMap<String, JsonValue>) -> Result<String, JsonMapError> {
        let document = if self.pretty_json {
            serde_json::to_string_pretty(tree)?
        } else {
            serde_json::to_string(tree)?
        };
        Ok(document)
    }

    /// Formats `record`.
    ///
    /// On return `record.msg` holds the json document, `record.args` is empty and the record's exception info is cleared.
    ///
    /// # Returns
    /// The line rendered by the text formatter, the document itself with the default `%(message)s` format.
    pub fn format(&mut self, record: &mut LogRecord) -> Result<String, JsonMapError> {
        let document = match (&self.cached_document, self.reuse_tree) {
            (Some(document), true) => document.clone(),
            _ => {
                let tree = self.build_tree(record);
                let document = self.to_document(&tree)?;
                if self.reuse_tree {
                    self.cached_document = Some(document.clone());
                }
                document
            }
        };

        record.exc_info = None;
        record.msg = document;
        record.args = Default::default();

        Ok(self.text.format(record, &self.time_format))
    }

    fn source(
        &self,
        record: &LogRecord,
        aux: JsonMap<String, JsonValue>,
    ) -> JsonMap<String, JsonValue> {
        let mut source = record.fields();
        let mappings = record.args.mappings();

        match self.merge_order {
            MergeOrder::AuxiliaryFirst => {
                source.extend(aux);
                for mapping in mappings {
                    source.extend(mapping.clone());
                }
            }
            MergeOrder::ArgumentsFirst => {
                for mapping in mappings {
                    source.extend(mapping.clone());
                }
                source.extend(aux);
            }
        }
        source
    }
}
