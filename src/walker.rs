//! Schema Walking
//!
//! Recursive, cycle-safe traversal of a legacy schema. Every node is visited in a
//! fixed order (own extensions, `properties`, `items`, `allOf`, `oneOf`, then the
//! remaining sub-schema keywords, then its `$ref` target) and rebuilt as a new
//! value; the input is only ever borrowed.
//!
//! `definitions` / `$defs` are never walked directly. A definition is migrated the
//! first time a `$ref` reaches it and stored in an arena keyed by pointer, so a
//! definition referencing itself through any depth of nesting is walked once.

use percent_encoding::percent_decode_str;
use serde_json::{Map, Value};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

use crate::error::{CompatError, Result};
use crate::layout;
use crate::mapper::{display_path, ExtensionTable};
use crate::template::TemplateDetector;

/// Sub-schema keywords, in traversal order
const TRAVERSAL_ORDER: &[&str] = &[
    "properties",
    "items",
    "allOf",
    "oneOf",
    "anyOf",
    "dependencies",
    "patternProperties",
    "additionalProperties",
    "additionalItems",
    "contains",
    "propertyNames",
    "if",
    "then",
    "else",
    "not",
];

/// Output of a walk
#[derive(Debug)]
pub struct Walked {
    pub schema: Value,
    /// Lazily migrated `$ref` targets, in the order they were first reached
    pub resolved: Vec<String>,
}

/// One traversal over one document
pub struct Walker<'a> {
    root: &'a Value,
    table: &'a ExtensionTable,
    detector: &'a TemplateDetector,
    /// Pointers already reserved, whether or not they needed a walk
    visited: HashSet<String>,
    /// Lazily walked pointers, in the order they were reserved
    reached: Vec<String>,
    /// Migrated definitions, keyed by pointer fragment (without `#`)
    arena: Vec<(String, Value)>,
}

impl<'a> Walker<'a> {
    pub fn new(root: &'a Value, table: &'a ExtensionTable, detector: &'a TemplateDetector) -> Self {
        Self {
            root,
            table,
            detector,
            visited: HashSet::new(),
            reached: Vec::new(),
            arena: Vec::new(),
        }
    }

    /// Walk the whole document and splice migrated definitions back in place
    pub fn walk(mut self) -> Result<Walked> {
        let root = self.root;
        let mut schema = self.walk_node(root, "")?;

        // Shallow pointers first so nested definitions land inside their parent.
        let mut arena = std::mem::take(&mut self.arena);
        arena.sort_by_key(|(ptr, _)| ptr.matches('/').count());
        for (ptr, value) in arena {
            match schema.pointer_mut(&ptr) {
                Some(slot) => *slot = value,
                None => warn!(pointer = %ptr, "migrated definition has no slot in output"),
            }
        }

        Ok(Walked {
            schema,
            resolved: self.reached,
        })
    }

    fn walk_node(&mut self, node: &Value, path: &str) -> Result<Value> {
        let Value::Object(map) = node else {
            // boolean schemas and non-schema values are copied as-is
            return Ok(node.clone());
        };

        let mapped = self.table.map_node(map, path, self.detector)?;

        let mut rewritten: HashMap<&'static str, Value> = HashMap::new();
        for &key in TRAVERSAL_ORDER {
            let Some(child) = map.get(key) else { continue };
            let child_path = format!("{}/{}", path, key);
            if let Some(value) = self.walk_keyword(key, child, &child_path)? {
                rewritten.insert(key, value);
            }
        }

        match map.get("$ref") {
            Some(Value::String(pointer)) => self.resolve_ref(pointer, path)?,
            Some(other) => {
                return Err(CompatError::UnresolvedRef {
                    pointer: other.to_string(),
                    path: display_path(path),
                })
            }
            None => {}
        }

        let mut out = Map::with_capacity(map.len() + 1);
        for (key, value) in map {
            if mapped.consumed.contains(key) {
                continue;
            }
            let value = rewritten.remove(key.as_str()).unwrap_or_else(|| value.clone());
            out.insert(key.clone(), value);
        }
        if let Some(layout) = mapped.layout {
            out.insert("layout".to_string(), serde_json::to_value(layout)?);
        }

        Ok(Value::Object(out))
    }

    /// Rebuild the value of one sub-schema keyword. `None` means copy verbatim.
    fn walk_keyword(&mut self, key: &str, value: &Value, path: &str) -> Result<Option<Value>> {
        let walked = match (key, value) {
            ("properties" | "patternProperties" | "dependencies", Value::Object(entries)) => {
                let mut out = Map::with_capacity(entries.len());
                for (name, schema) in entries {
                    let child_path = format!("{}/{}", path, escape_segment(name));
                    // array-valued `dependencies` are property lists, not schemas
                    let value = match schema {
                        Value::Object(_) => self.walk_node(schema, &child_path)?,
                        other => other.clone(),
                    };
                    out.insert(name.clone(), value);
                }
                Value::Object(out)
            }
            ("items", Value::Object(_)) => self.walk_node(value, path)?,
            ("items" | "oneOf" | "anyOf", Value::Array(elements)) => {
                Value::Array(self.walk_elements(elements, path)?)
            }
            ("allOf", Value::Array(elements)) => {
                let mut walked = self.walk_elements(elements, path)?;
                for (i, element) in walked.iter_mut().enumerate() {
                    if let Value::Object(element) = element {
                        layout::attach_one_of_label(element, &format!("{}/{}", path, i))?;
                    }
                }
                Value::Array(walked)
            }
            (
                "additionalProperties" | "additionalItems" | "contains" | "propertyNames" | "if"
                | "then" | "else" | "not",
                Value::Object(_),
            ) => self.walk_node(value, path)?,
            _ => return Ok(None),
        };
        Ok(Some(walked))
    }

    fn walk_elements(&mut self, elements: &[Value], path: &str) -> Result<Vec<Value>> {
        elements
            .iter()
            .enumerate()
            .map(|(i, element)| self.walk_node(element, &format!("{}/{}", path, i)))
            .collect()
    }

    /// Reserve `pointer` and migrate its target if it lives in a lazily walked region
    fn resolve_ref(&mut self, pointer: &str, path: &str) -> Result<()> {
        let Some(fragment) = pointer.strip_prefix('#') else {
            warn!(pointer, path = %display_path(path), "leaving external $ref untouched");
            return Ok(());
        };
        if !self.visited.insert(pointer.to_string()) {
            return Ok(());
        }

        // `#/definitions/my%20def` and `#/definitions/my def` name the same slot
        let fragment = percent_decode_str(fragment).decode_utf8_lossy().into_owned();
        let root = self.root;
        let target = root.pointer(&fragment).ok_or_else(|| CompatError::UnresolvedRef {
            pointer: pointer.to_string(),
            path: display_path(path),
        })?;

        if !is_lazy_pointer(&fragment) {
            // target sits in the main tree and is migrated where it stands
            return Ok(());
        }

        debug!(pointer, "migrating referenced definition");
        self.reached.push(pointer.to_string());
        let migrated = self.walk_node(target, &fragment)?;
        self.arena.push((fragment, migrated));
        Ok(())
    }
}

/// Whether a pointer fragment goes through a `definitions` / `$defs` keyword
fn is_lazy_pointer(fragment: &str) -> bool {
    let mut expect_name = false;
    for segment in fragment.split('/').skip(1) {
        if expect_name {
            expect_name = false;
            continue;
        }
        match segment {
            "definitions" | "$defs" => return true,
            "properties" | "patternProperties" | "dependencies" => expect_name = true,
            _ => {}
        }
    }
    false
}

/// Escape a property name for use as a JSON pointer segment
fn escape_segment(name: &str) -> String {
    name.replace('~', "~0").replace('/', "~1")
}
