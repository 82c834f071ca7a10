//! Extension Mapping
//!
//! Table-driven translation of legacy `x-*` keys into layout mutations. Each rule
//! is an [`ExtensionHandler`] claiming a set of keys; the walker only ever talks to
//! the [`ExtensionTable`], so new rules plug in without touching traversal.
//!
//! ## Rules
//! | Legacy input | Layout |
//! |---|---|
//! | `x-display` | `comp` |
//! | `x-fromData` (+ `x-itemKey`, `x-itemTitle`) | `comp: select`, `getItems.expr` |
//! | `x-fromUrl` (+ `x-itemsProp`, `x-itemKey`, `x-itemTitle`) | `comp: select`, `getItems.url` |
//! | `x-if` | `cond` |
//! | `x-props`, `x-cols` | `props`, `cols` |
//!
//! Unrecognized `x-*` keys are left on the node.

pub mod handlers;

pub use handlers::{ConditionHandler, DisplayHandler, ItemSourceHandler, PresentationHandler};

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::sync::OnceLock;
use tracing::trace;

use crate::error::{CompatError, Result};
use crate::layout::{self, Layout, LayoutNode};
use crate::template::TemplateDetector;

/// What a handler sees of the node being mapped
pub struct MapContext<'a> {
    /// JSON pointer of the node inside the input document
    pub path: &'a str,
    pub node: &'a Map<String, Value>,
    pub detector: &'a TemplateDetector,
}

impl<'a> MapContext<'a> {
    /// Read a string-valued extension
    pub fn string(&self, key: &str) -> Result<Option<&'a str>> {
        match self.node.get(key) {
            None => Ok(None),
            Some(Value::String(s)) => Ok(Some(s.as_str())),
            Some(_) => Err(self.invalid(key, "a string")),
        }
    }

    pub fn invalid(&self, key: &str, expected: &'static str) -> CompatError {
        CompatError::InvalidExtensionValue {
            key: key.to_string(),
            path: display_path(self.path),
            expected,
        }
    }

    pub fn unsupported(&self, keys: &[&str], reason: impl Into<String>) -> CompatError {
        CompatError::UnsupportedExtensionCombination {
            keys: keys
                .iter()
                .filter(|k| self.node.contains_key(**k))
                .map(|k| k.to_string())
                .collect(),
            path: display_path(self.path),
            reason: reason.into(),
        }
    }

    /// Whether the node describes a list
    pub fn is_array(&self) -> bool {
        match self.node.get("type") {
            Some(Value::String(t)) => t == "array",
            Some(Value::Array(types)) => types.iter().any(|t| t == "array"),
            _ => self.node.contains_key("items"),
        }
    }
}

/// One mapping rule
pub trait ExtensionHandler: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Legacy keys claimed by this rule. They are removed from the output.
    fn keys(&self) -> &'static [&'static str];

    /// Mutate `layout` for a node carrying at least one of [`Self::keys`]
    fn apply(&self, ctx: &MapContext<'_>, layout: &mut LayoutNode) -> Result<()>;
}

/// Result of mapping one node
#[derive(Debug, Default)]
pub struct Mapped {
    /// Finalized layout, if any rule produced one
    pub layout: Option<Layout>,
    /// Legacy keys consumed by the rules
    pub consumed: HashSet<String>,
}

/// Ordered set of mapping rules
pub struct ExtensionTable {
    handlers: Vec<Box<dyn ExtensionHandler>>,
}

impl Default for ExtensionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ExtensionTable {
    /// Empty table
    pub fn new() -> Self {
        Self { handlers: Vec::new() }
    }

    /// The built-in legacy rules. Order matters: `x-display` runs after the data
    /// sources so an explicit component overrides the implied `select`.
    pub fn builtin() -> Self {
        Self::new()
            .with_handler(ItemSourceHandler)
            .with_handler(DisplayHandler)
            .with_handler(ConditionHandler)
            .with_handler(PresentationHandler)
    }

    /// Process-wide built-in table, created on first use
    pub fn global() -> &'static ExtensionTable {
        static TABLE: OnceLock<ExtensionTable> = OnceLock::new();
        TABLE.get_or_init(ExtensionTable::builtin)
    }

    pub fn with_handler(mut self, handler: impl ExtensionHandler + 'static) -> Self {
        self.handlers.push(Box::new(handler));
        self
    }

    pub fn is_recognized(&self, key: &str) -> bool {
        self.handlers.iter().any(|h| h.keys().contains(&key))
    }

    /// Every key claimed by some rule
    pub fn recognized_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.handlers.iter().flat_map(|h| h.keys().iter().copied())
    }

    /// Map the legacy extensions of one node.
    ///
    /// Nodes without recognized keys map to nothing, which makes re-running the
    /// mapper on migrated output a no-op.
    pub fn map_node(
        &self,
        node: &Map<String, Value>,
        path: &str,
        detector: &TemplateDetector,
    ) -> Result<Mapped> {
        let consumed: HashSet<String> = node
            .keys()
            .filter(|k| self.is_recognized(k))
            .cloned()
            .collect();
        if consumed.is_empty() {
            return Ok(Mapped::default());
        }

        if node.contains_key("layout") {
            let mut keys: Vec<String> = consumed.into_iter().collect();
            keys.sort();
            keys.push("layout".to_string());
            return Err(CompatError::UnsupportedExtensionCombination {
                keys,
                path: display_path(path),
                reason: "node already carries a layout".to_string(),
            });
        }

        let ctx = MapContext { path, node, detector };
        let mut layout = LayoutNode::default();
        for handler in &self.handlers {
            if handler.keys().iter().any(|k| node.contains_key(*k)) {
                trace!(path, handler = handler.name(), "applying extension rule");
                handler.apply(&ctx, &mut layout)?;
            }
        }

        Ok(Mapped {
            layout: layout::finalize(layout),
            consumed,
        })
    }
}

/// Render an empty pointer as the document root
pub(crate) fn display_path(path: &str) -> String {
    if path.is_empty() {
        "#".to_string()
    } else {
        format!("#{}", path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{ExprType, ItemOrigin};
    use serde_json::json;

    fn map(value: Value) -> Result<Mapped> {
        let Value::Object(node) = value else {
            panic!("Expected object");
        };
        ExtensionTable::global().map_node(&node, "/properties/field", &TemplateDetector::default())
    }

    #[test]
    fn test_display_collapses_to_string() {
        let mapped = map(json!({ "type": "string", "x-display": "textarea" })).unwrap();
        assert_eq!(mapped.layout, Some(Layout::Comp("textarea".to_string())));
        assert!(mapped.consumed.contains("x-display"));
    }

    #[test]
    fn test_from_data_select() {
        let mapped = map(json!({
            "type": "object",
            "x-fromData": "context.objectItems",
            "x-itemKey": "val",
            "x-itemTitle": "label"
        }))
        .unwrap();
        let Some(Layout::Node(layout)) = mapped.layout else {
            panic!("Expected layout node");
        };
        assert_eq!(layout.comp.as_deref(), Some("select"));
        let items = layout.get_items.unwrap();
        assert_eq!(
            items.origin,
            ItemOrigin::Expr {
                expr: "context.objectItems".to_string()
            }
        );
        assert_eq!(items.item_key.as_deref(), Some("val"));
        assert_eq!(items.item_title.as_deref(), Some("label"));
        assert_eq!(mapped.consumed.len(), 3);
    }

    #[test]
    fn test_display_overrides_select() {
        let mapped = map(json!({
            "type": "string",
            "x-fromUrl": "{context.url}/items",
            "x-display": "autocomplete"
        }))
        .unwrap();
        let Some(Layout::Node(layout)) = mapped.layout else {
            panic!("Expected layout node");
        };
        assert_eq!(layout.comp.as_deref(), Some("autocomplete"));
        assert!(layout.get_items.is_some());
    }

    #[test]
    fn test_conflicting_sources() {
        let err = map(json!({ "x-fromData": "context.a", "x-fromUrl": "http://x" })).unwrap_err();
        assert!(matches!(err, CompatError::ConflictingSource { .. }));
        assert_eq!(err.path(), Some("#/properties/field"));
    }

    #[test]
    fn test_condition_descriptor() {
        let input = json!({ "type": "string", "x-if": "parent.value.multivalued == true" });
        let mapped = map(input).unwrap();
        let Some(Layout::Node(layout)) = mapped.layout else {
            panic!("Expected layout node");
        };
        let cond = layout.cond.unwrap();
        assert_eq!(cond.expr, "parent.value.multivalued == true");
        assert_eq!(cond.expr_type, Some(ExprType::JsExpr));
        assert!(cond.pure.is_none());
        assert!(layout.comp.is_none());
    }

    #[test]
    fn test_unknown_extensions_are_ignored() {
        let mapped = map(json!({ "type": "string", "x-custom": 1 })).unwrap();
        assert!(mapped.layout.is_none());
        assert!(mapped.consumed.is_empty());
    }

    #[test]
    fn test_legacy_keys_with_existing_layout() {
        let err = map(json!({ "x-display": "card", "layout": "tabs" })).unwrap_err();
        match err {
            CompatError::UnsupportedExtensionCombination { keys, .. } => {
                assert_eq!(keys, vec!["x-display".to_string(), "layout".to_string()]);
            }
            other => panic!("Expected UnsupportedExtensionCombination, got {:?}", other),
        }
    }

    #[test]
    fn test_custom_table() {
        let table = ExtensionTable::new().with_handler(DisplayHandler);
        assert!(table.is_recognized("x-display"));
        assert!(!table.is_recognized("x-fromData"));
        assert_eq!(table.recognized_keys().count(), 1);
    }
}
