//! The nested key template that describes the shape of every formatted document.
//!
//! A [`Schema`][struct@Schema] is an ordered map from key to [`Node`][enum@Node].
//! A [`Node::Leaf`] marks a key whose value is pulled from the record, the placeholder value it carries is ignored.
//! A [`Node::Branch`] is a nested schema and becomes a nested json object in the output.
//!
//! Key order is preserved and determines the key order of the formatted document.
//!
//! # Example
//! ```toml
//! [formatter.schema]
//! time = ""
//! levelname = ""
//! msg = ""
//! [formatter.schema.extra]
//! funcName = ""
//! lineno = ""
//! ```

use indexmap::IndexMap;

use serde::de::Error as _;
use serde::ser::{SerializeMap as _, SerializeSeq as _};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use serde_json::value::Value as JsonValue;

use crate::error::JsonMapError;

/// A single schema entry.
#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    /// Pulls the value with the same key from the record.
    Leaf(JsonValue),
    /// A nested template.
    Branch(Schema),
}

/// Ordered nested key template, see [`module`][mod@self] level docs.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    children: IndexMap<String, Node>,
}

impl Schema {
    /// An empty schema, formats every record as overflow only.
    pub fn new() -> Self {
        Self {
            children: IndexMap::new(),
        }
    }

    /// Appends a leaf.
    pub fn leaf(mut self, key: &str) -> Self {
        self.children
            .insert(key.to_owned(), Node::Leaf(JsonValue::String(String::new())));
        self
    }

    /// Appends a nested template.
    pub fn branch(mut self, key: &str, schema: Schema) -> Self {
        self.children.insert(key.to_owned(), Node::Branch(schema));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Node> {
        self.children.get(key)
    }

    pub fn iter(&self) -> indexmap::map::Iter<'_, String, Node> {
        self.children.iter()
    }

    pub fn len(&self) -> usize {
        self.children.len()
    }

    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// Every leaf key of this schema and its branches, depth first in declaration order.
    pub fn leaf_keys(&self) -> Vec<&str> {
        let mut keys = Vec::new();
        collect_leaf_keys(self, &mut keys);
        keys
    }

    /// The json representation of this template, leaves keep their placeholder values.
    pub fn to_json(&self) -> JsonValue {
        let mut map = serde_json::Map::new();
        for (key, node) in &self.children {
            let value = match node {
                Node::Leaf(placeholder) => placeholder.clone(),
                Node::Branch(schema) => schema.to_json(),
            };
            map.insert(key.clone(), value);
        }
        JsonValue::Object(map)
    }
}

fn collect_leaf_keys<'a>(schema: &'a Schema, keys: &mut Vec<&'a str>) {
    for (key, node) in &schema.children {
        match node {
            Node::Leaf(_) => keys.push(key),
            Node::Branch(schema) => collect_leaf_keys(schema, keys),
        }
    }
}

/// The default document layout.
///
/// ```json
/// {
///   "time": "", "levelname": "", "name": "", "msg": "",
///   "extra": {
///     "funcName": "", "lineno": "", "pathname": "",
///     "exception": { "exctype": "", "excvalue": "", "exctrace": "" }
///   }
/// }
/// ```
impl Default for Schema {
    fn default() -> Self {
        Schema::new()
            .leaf("time")
            .leaf("levelname")
            .leaf("name")
            .leaf("msg")
            .branch(
                "extra",
                Schema::new()
                    .leaf("funcName")
                    .leaf("lineno")
                    .leaf("pathname")
                    .branch(
                        "exception",
                        Schema::new().leaf("exctype").leaf("excvalue").leaf("exctrace"),
                    ),
            )
    }
}

/// Every json object becomes a branch, any other value is a leaf placeholder.
impl TryFrom<JsonValue> for Schema {
    type Error = JsonMapError;

    fn try_from(value: JsonValue) -> Result<Self, Self::Error> {
        match value {
            JsonValue::Object(map) => {
                let mut children = IndexMap::with_capacity(map.len());
                for (key, value) in map {
                    let node = match value {
                        JsonValue::Object(_) => Node::Branch(Schema::try_from(value)?),
                        leaf => Node::Leaf(leaf),
                    };
                    children.insert(key, node);
                }
                Ok(Self { children })
            }
            other => Err(JsonMapError::SchemaNotAnObject(other.to_string())),
        }
    }
}

/// Serializes as a map in declaration order.
///
/// Toml writes the plain keys of a table before its sub tables, a leaf declared after a branch
/// of the same level is read back ahead of that branch.
impl Serialize for Schema {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.children.len()))?;
        for (key, node) in &self.children {
            match node {
                Node::Leaf(placeholder) => map.serialize_entry(key, &Placeholder(placeholder))?,
                Node::Branch(schema) => map.serialize_entry(key, schema)?,
            }
        }
        map.end()
    }
}

/// A leaf placeholder written with native numbers.
///
/// `arbitrary_precision` numbers serialize as a private struct, toml would turn it into a sub table.
/// Toml has no null, a null placeholder is written as an empty string.
struct Placeholder<'a>(&'a JsonValue);

impl Serialize for Placeholder<'_> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self.0 {
            JsonValue::Null => serializer.serialize_str(""),
            JsonValue::Bool(value) => serializer.serialize_bool(*value),
            JsonValue::Number(number) => {
                if let Some(value) = number.as_u64() {
                    serializer.serialize_u64(value)
                } else if let Some(value) = number.as_i64() {
                    serializer.serialize_i64(value)
                } else if let Some(value) = number.as_f64() {
                    serializer.serialize_f64(value)
                } else {
                    serializer.serialize_str(&number.to_string())
                }
            }
            JsonValue::String(value) => serializer.serialize_str(value),
            JsonValue::Array(values) => {
                let mut seq = serializer.serialize_seq(Some(values.len()))?;
                for value in values {
                    seq.serialize_element(&Placeholder(value))?;
                }
                seq.end()
            }
            JsonValue::Object(entries) => {
                let mut map = serializer.serialize_map(Some(entries.len()))?;
                for (key, value) in entries {
                    map.serialize_entry(key, &Placeholder(value))?;
                }
                map.end()
            }
        }
    }
}

// goes through JsonValue rather than an untagged enum, untagged buffering
// does not play well with serde_json's arbitrary_precision numbers.
impl<'de> Deserialize<'de> for Schema {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = JsonValue::deserialize(deserializer)?;
        Schema::try_from(value).map_err(D::Error::custom)
    }
}

impl From<Schema> for JsonValue {
    fn from(schema: Schema) -> Self {
        schema.to_json()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn default_schema_layout() {
        let schema = Schema::default();
        assert_eq!(
            schema.leaf_keys(),
            vec![
                "time", "levelname", "name", "msg", "funcName", "lineno", "pathname", "exctype",
                "excvalue", "exctrace"
            ]
        );
        assert!(matches!(schema.get("extra"), Some(Node::Branch(_))));
    }

    #[test]
    fn from_json_keeps_order_and_shape() {
        let schema = Schema::try_from(json!({
            "b": 1,
            "a": { "z": null, "y": "" },
            "c": [1, 2]
        }))
        .unwrap();

        let keys: Vec<&String> = schema.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["b", "a", "c"]);
        assert_eq!(schema.get("c"), Some(&Node::Leaf(json!([1, 2]))));
        assert_eq!(schema.leaf_keys(), vec!["b", "z", "y", "c"]);
    }

    #[test]
    fn non_object_schema_is_rejected() {
        assert!(matches!(
            Schema::try_from(json!("nope")),
            Err(JsonMapError::SchemaNotAnObject(_))
        ));
    }

    #[test]
    fn numeric_placeholders_serialize_as_numbers() {
        let schema = Schema::try_from(json!({"lineno": 0, "ratio": 0.5, "msg": null})).unwrap();
        let toml_string = toml::to_string(&schema).unwrap();
        assert!(!toml_string.contains("serde_json"));
        let back: Schema = toml::from_str(&toml_string).unwrap();
        assert_eq!(back.leaf_keys(), vec!["lineno", "ratio", "msg"]);
        assert_eq!(back.get("lineno"), Some(&Node::Leaf(json!(0))));
        assert_eq!(back.get("msg"), Some(&Node::Leaf(json!(""))));
    }

    #[test]
    fn default_instances_do_not_alias() {
        let mut a = Schema::default();
        a.children.shift_remove("time");
        assert!(Schema::default().get("time").is_some());
    }
}
