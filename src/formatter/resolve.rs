//! Fills an output tree from a flat source map by walking a [`Schema`][struct@Schema].

use std::collections::HashSet;

use indexmap::IndexMap;

use serde_json::Map as JsonMap;
use serde_json::value::Value as JsonValue;

use crate::schema::{Node, Schema};

/// Resolution policy, borrowed from the formatter for the duration of one pass.
#[derive(Debug, Clone, Copy)]
pub struct ResolveOptions<'a> {
    /// Written for leaves that have no source value
    pub null: &'a JsonValue,
    /// Omit missing or null valued leaves and branches left empty
    pub strip: bool,
    /// Output key per schema leaf key
    pub remap: Option<&'a IndexMap<String, String>>,
}

impl ResolveOptions<'_> {
    /// The key a schema leaf is written under.
    pub fn output_key<'k>(&'k self, key: &'k str) -> &'k str {
        self.remap
            .and_then(|remap| remap.get(key))
            .map(String::as_str)
            .unwrap_or(key)
    }
}

/// Builds the output tree for `schema`.
///
/// Each leaf consumes the source entry with the same key, `consumed` records the keys taken so far.
/// A key that was consumed earlier in the pass is treated as missing, like a popped entry would be.
/// `source` itself is never modified.
///
/// # Returns
/// The tree and `true` if at least one leaf was written.
pub fn resolve(
    schema: &Schema,
    source: &JsonMap<String, JsonValue>,
    consumed: &mut HashSet<String>,
    options: &ResolveOptions<'_>,
) -> (JsonMap<String, JsonValue>, bool) {
    let mut tree = JsonMap::new();
    let set = fill(schema, source, consumed, options, &mut tree);
    (tree, set)
}

fn fill(
    schema: &Schema,
    source: &JsonMap<String, JsonValue>,
    consumed: &mut HashSet<String>,
    options: &ResolveOptions<'_>,
    dest: &mut JsonMap<String, JsonValue>,
) -> bool {
    let mut set = false;

    for (key, node) in schema.iter() {
        match node {
            Node::Branch(child) => {
                let mut branch = JsonMap::new();
                let branch_set = fill(child, source, consumed, options, &mut branch);
                if options.strip && !branch_set {
                    continue;
                }
                // first writer wins, a remapped leaf may already own this key
                if !dest.contains_key(key) {
                    dest.insert(key.clone(), JsonValue::Object(branch));
                    set |= branch_set;
                }
            }
            Node::Leaf(_) => {
                let value = match take(source, consumed, key) {
                    Some(value) if options.strip && value == options.null => continue,
                    Some(value) => value.clone(),
                    None if options.strip => continue,
                    None => options.null.clone(),
                };
                let output_key = options.output_key(key);
                if !dest.contains_key(output_key) {
                    dest.insert(output_key.to_owned(), value);
                    set = true;
                }
            }
        }
    }

    set
}

fn take<'s>(
    source: &'s JsonMap<String, JsonValue>,
    consumed: &mut HashSet<String>,
    key: &str,
) -> Option<&'s JsonValue> {
    if !consumed.insert(key.to_owned()) {
        return None;
    }
    source.get(key)
}
