//! Output Contract Linting
//!
//! Structural checks on migrated schemas against what the layout compiler
//! expects. This is not a renderability check; it catches migrations that would
//! be rejected outright.
//!
//! ## Lints
//! 1. **Layout shape**: `layout` is a component name or a well-typed layout node
//! 2. **Item sources**: every `getItems` carries exactly one of `expr` or `url`
//! 3. **Item references**: `itemKey` / `itemTitle` name a declared item property
//! 4. **Root identity**: documents with internal `$ref`s carry a root `$id`
//! 5. **Leftovers**: legacy keys or unpromoted `{context.path}` markers remain

use regex::Regex;
use serde::Deserialize;
use serde_json::{Map, Value};
use std::collections::HashSet;

use crate::layout::LayoutNode;
use crate::mapper::ExtensionTable;

/// Result of linting a migrated schema
#[derive(Debug, Default)]
pub struct LintResult {
    pub schema_id: String,
    pub errors: Vec<LintError>,
    pub warnings: Vec<LintWarning>,
}

impl LintResult {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

#[derive(Debug)]
pub struct LintError {
    pub code: &'static str,
    pub message: String,
    pub path: String,
}

#[derive(Debug)]
pub struct LintWarning {
    pub code: &'static str,
    pub message: String,
    pub path: String,
}

/// The output contract linter
pub struct ContractLinter {
    /// `{a.b}` not preceded by `$`
    unpromoted: Regex,
    legacy_keys: HashSet<&'static str>,
}

impl Default for ContractLinter {
    fn default() -> Self {
        Self::new()
    }
}

impl ContractLinter {
    pub fn new() -> Self {
        Self {
            unpromoted: Regex::new(
                r"(^|[^$])\{[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)+\}",
            )
            .expect("unpromoted marker pattern is valid"),
            legacy_keys: ExtensionTable::global().recognized_keys().collect(),
        }
    }

    /// Lint a migrated schema
    pub fn lint(&self, schema: &Value) -> LintResult {
        let mut result = LintResult {
            schema_id: schema
                .get("$id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            ..Default::default()
        };

        let mut has_internal_refs = false;
        self.lint_value(schema, "", &mut result, &mut has_internal_refs);

        if has_internal_refs && schema.get("$id").is_none() {
            result.errors.push(LintError {
                code: "MISSING_ROOT_ID",
                message: "Schema uses internal $refs but the root has no $id".to_string(),
                path: "#".to_string(),
            });
        }
        result
    }

    fn lint_value(&self, value: &Value, path: &str, result: &mut LintResult, has_refs: &mut bool) {
        match value {
            Value::Object(obj) => {
                if let Some(Value::String(ptr)) = obj.get("$ref") {
                    *has_refs |= ptr.starts_with('#');
                }
                if let Some(layout) = obj.get("layout") {
                    self.lint_layout(obj, layout, &format!("{}/layout", path), result);
                }
                for (key, val) in obj {
                    let segment = key.replace('~', "~0").replace('/', "~1");
                    let child_path = format!("{}/{}", path, segment);
                    if self.legacy_keys.contains(key.as_str()) {
                        result.warnings.push(LintWarning {
                            code: "LEGACY_EXTENSION",
                            message: format!("Legacy extension '{}' was not migrated", key),
                            path: format!("#{}", child_path),
                        });
                    }
                    self.lint_value(val, &child_path, result, has_refs);
                }
            }
            Value::Array(arr) => {
                for (i, val) in arr.iter().enumerate() {
                    self.lint_value(val, &format!("{}/{}", path, i), result, has_refs);
                }
            }
            _ => {}
        }
    }

    fn lint_layout(
        &self,
        node: &Map<String, Value>,
        layout: &Value,
        path: &str,
        result: &mut LintResult,
    ) {
        let layout = match layout {
            Value::String(_) => return,
            Value::Object(fields) => {
                if let Err(error) = LayoutNode::deserialize(layout) {
                    result.errors.push(LintError {
                        code: "INVALID_LAYOUT",
                        message: format!("layout node is malformed: {}", error),
                        path: format!("#{}", path),
                    });
                }
                fields
            }
            _ => {
                result.errors.push(LintError {
                    code: "INVALID_LAYOUT",
                    message: "layout must be a component name or an object".to_string(),
                    path: format!("#{}", path),
                });
                return;
            }
        };

        if let Some(get_items) = layout.get("getItems") {
            self.lint_get_items(node, get_items, &format!("{}/getItems", path), result);
        }

        // list display fields refer to the array's item schema
        for field in ["itemKey", "itemTitle"] {
            if let Some(Value::String(name)) = layout.get(field) {
                self.check_item_property(node, field, name, &format!("{}/{}", path, field), result);
            }
        }
    }

    fn lint_get_items(
        &self,
        node: &Map<String, Value>,
        get_items: &Value,
        path: &str,
        result: &mut LintResult,
    ) {
        let Some(get_items) = get_items.as_object() else {
            result.errors.push(LintError {
                code: "GET_ITEMS_SOURCE",
                message: "getItems must be an object".to_string(),
                path: format!("#{}", path),
            });
            return;
        };

        match (get_items.get("expr"), get_items.get("url")) {
            (Some(_), Some(_)) | (None, None) => {
                result.errors.push(LintError {
                    code: "GET_ITEMS_SOURCE",
                    message: "getItems must carry exactly one of 'expr' or 'url'".to_string(),
                    path: format!("#{}", path),
                });
            }
            (None, Some(url)) => match url.get("expr").and_then(Value::as_str) {
                Some(expr) => {
                    if self.unpromoted.is_match(expr) {
                        result.warnings.push(LintWarning {
                            code: "UNPROMOTED_PLACEHOLDER",
                            message: format!(
                                "URL template '{}' still contains legacy {{context.path}} markers",
                                expr
                            ),
                            path: format!("#{}/url", path),
                        });
                    }
                }
                None => result.errors.push(LintError {
                    code: "INVALID_URL_DESCRIPTOR",
                    message: "getItems.url must be a descriptor with a string 'expr'".to_string(),
                    path: format!("#{}/url", path),
                }),
            },
            (Some(_), None) => {}
        }

        for field in ["itemKey", "itemTitle"] {
            if let Some(Value::String(name)) = get_items.get(field) {
                self.check_item_property(node, field, name, &format!("{}/{}", path, field), result);
            }
        }
    }

    /// `name` must exist on the listed item schema whenever that schema declares
    /// its properties. Items described elsewhere (context data, remote) are not checked.
    fn check_item_property(
        &self,
        node: &Map<String, Value>,
        field: &str,
        name: &str,
        path: &str,
        result: &mut LintResult,
    ) {
        let item_properties = node
            .get("items")
            .and_then(|items| items.get("properties"))
            .or_else(|| node.get("properties"))
            .and_then(Value::as_object);

        if let Some(properties) = item_properties {
            if !properties.contains_key(name) {
                result.errors.push(LintError {
                    code: "UNKNOWN_ITEM_PROPERTY",
                    message: format!("{} '{}' is not a property of the listed items", field, name),
                    path: format!("#{}", path),
                });
            }
        }
    }
}

/// Lint a migrated schema with the default linter
pub fn lint_output(schema: &Value) -> LintResult {
    ContractLinter::new().lint(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_valid_output() {
        let schema = json!({
            "$id": "_jl",
            "type": "object",
            "properties": {
                "dataset": {
                    "type": "object",
                    "properties": { "id": { "type": "string" }, "title": { "type": "string" } },
                    "layout": {
                        "comp": "select",
                        "getItems": {
                            "url": {
                                "expr": "${context.url}/datasets?q={q}",
                                "type": "js-tpl",
                                "pure": true
                            },
                            "itemsProp": "results",
                            "itemKey": "id",
                            "itemTitle": "title"
                        }
                    }
                }
            }
        });
        let result = lint_output(&schema);
        assert!(result.is_clean(), "{:?}", result.errors);
        assert!(!result.has_warnings());
        assert_eq!(result.schema_id, "_jl");
    }

    #[test]
    fn test_layout_fields_are_typed() {
        let labelled = json!({ "$id": "_jl", "layout": { "comp": "select", "label": "Pick one" } });
        assert!(lint_output(&labelled).is_clean());

        let schema = json!({
            "$id": "_jl",
            "properties": { "a": { "layout": { "comp": "select", "label": 3 } } }
        });
        let result = lint_output(&schema);
        let error = result.errors.iter().find(|e| e.code == "INVALID_LAYOUT").unwrap();
        assert_eq!(error.path, "#/properties/a/layout");
    }

    #[test]
    fn test_both_sources() {
        let schema = json!({
            "layout": { "getItems": { "expr": "context.a", "url": { "expr": "x" } } }
        });
        let result = lint_output(&schema);
        assert!(result.errors.iter().any(|e| e.code == "GET_ITEMS_SOURCE"));
    }

    #[test]
    fn test_unknown_item_property() {
        let schema = json!({
            "type": "array",
            "items": { "type": "object", "properties": { "key": { "type": "string" } } },
            "layout": { "itemTitle": "name" }
        });
        let result = lint_output(&schema);
        let error = result.errors.iter().find(|e| e.code == "UNKNOWN_ITEM_PROPERTY").unwrap();
        assert_eq!(error.path, "#/layout/itemTitle");
    }

    #[test]
    fn test_missing_root_id() {
        let schema = json!({
            "properties": { "a": { "$ref": "#/definitions/a" } },
            "definitions": { "a": { "type": "string" } }
        });
        let result = lint_output(&schema);
        assert!(result.errors.iter().any(|e| e.code == "MISSING_ROOT_ID"));
    }

    #[test]
    fn test_leftovers_are_warnings() {
        let schema = json!({
            "$id": "_jl",
            "properties": {
                "a": { "type": "string", "x-display": "textarea" },
                "b": { "layout": { "getItems": { "url": { "expr": "{context.url}/items" } } } }
            }
        });
        let result = lint_output(&schema);
        assert!(result.is_clean());
        assert!(result
            .warnings
            .iter()
            .any(|w| w.code == "LEGACY_EXTENSION" && w.path == "#/properties/a/x-display"));
        assert!(result.warnings.iter().any(|w| w.code == "UNPROMOTED_PLACEHOLDER"));
    }
}
