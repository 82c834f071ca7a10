//! Layout Metadata
//!
//! Types attached under a schema node's `layout` key, plus the `oneOfLayout`
//! discriminant label. Serialization follows the layout compiler's camelCase
//! keyword names.

pub mod synthesize;

pub use synthesize::{attach_one_of_label, finalize, stamp_root_id, DEFAULT_ROOT_ID};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Template Descriptor
// =============================================================================

/// Evaluation mode of a descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExprType {
    #[serde(rename = "js-expr")]
    JsExpr,
    #[serde(rename = "js-tpl")]
    JsTpl,
}

/// Canonical `{expr, type, pure}` form of a possibly interpolated string.
/// `pure` is only asserted for templates; `type` and `pure` are absent for the
/// bare `{expr}` shorthand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateDescriptor {
    pub expr: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub expr_type: Option<ExprType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pure: Option<bool>,
}

impl TemplateDescriptor {
    /// `js-expr` descriptor. Expressions may read sibling data, so no purity is claimed.
    pub fn expression(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            expr_type: Some(ExprType::JsExpr),
            pure: None,
        }
    }

    /// `js-tpl` descriptor. Legacy markers only substitute values, so templates are pure.
    pub fn template(expr: impl Into<String>) -> Self {
        Self {
            expr: expr.into(),
            expr_type: Some(ExprType::JsTpl),
            pure: Some(true),
        }
    }
}

// =============================================================================
// Item Source
// =============================================================================

/// Where a select gets its items from. Exactly one of `expr` or `url`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ItemOrigin {
    Url {
        url: TemplateDescriptor,
        #[serde(rename = "itemsProp", default, skip_serializing_if = "Option::is_none")]
        items_prop: Option<String>,
    },
    Expr {
        expr: String,
    },
}

/// The `getItems` descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemSource {
    #[serde(flatten)]
    pub origin: ItemOrigin,
    #[serde(rename = "itemKey", default, skip_serializing_if = "Option::is_none")]
    pub item_key: Option<String>,
    #[serde(rename = "itemTitle", default, skip_serializing_if = "Option::is_none")]
    pub item_title: Option<String>,
}

// =============================================================================
// Layout Node
// =============================================================================

/// Layout metadata for one schema node
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comp: Option<String>,
    #[serde(rename = "getItems", default, skip_serializing_if = "Option::is_none")]
    pub get_items: Option<ItemSource>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cond: Option<TemplateDescriptor>,
    /// Field shown as the title of each entry in a list
    #[serde(rename = "itemTitle", default, skip_serializing_if = "Option::is_none")]
    pub item_title: Option<String>,
    #[serde(rename = "itemKey", default, skip_serializing_if = "Option::is_none")]
    pub item_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub props: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cols: Option<Value>,
}

impl LayoutNode {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// True when `comp` is the only field set
    pub fn is_comp_only(&self) -> bool {
        self.comp.is_some()
            && Self {
                comp: None,
                ..self.clone()
            }
            .is_empty()
    }
}

/// Finalized `layout` value: a bare component name or a full node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Layout {
    Comp(String),
    Node(LayoutNode),
}

// =============================================================================
// oneOf Layout
// =============================================================================

/// Discriminant label attached to the `allOf` element enclosing a `oneOf`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OneOfLayout {
    pub label: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_expr_source_serialization() {
        let source = ItemSource {
            origin: ItemOrigin::Expr {
                expr: "context.objectItems".to_string(),
            },
            item_key: Some("val".to_string()),
            item_title: Some("label".to_string()),
        };
        assert_eq!(
            serde_json::to_value(&source).unwrap(),
            json!({ "expr": "context.objectItems", "itemKey": "val", "itemTitle": "label" })
        );
    }

    #[test]
    fn test_url_source_serialization() {
        let source = ItemSource {
            origin: ItemOrigin::Url {
                url: TemplateDescriptor::template("${context.url}/items"),
                items_prop: Some("results".to_string()),
            },
            item_key: Some("id".to_string()),
            item_title: None,
        };
        assert_eq!(
            serde_json::to_value(&source).unwrap(),
            json!({
                "url": { "expr": "${context.url}/items", "type": "js-tpl", "pure": true },
                "itemsProp": "results",
                "itemKey": "id"
            })
        );
    }

    #[test]
    fn test_expression_descriptor_claims_no_purity() {
        assert_eq!(
            serde_json::to_value(TemplateDescriptor::expression("parent.value.a == 1")).unwrap(),
            json!({ "expr": "parent.value.a == 1", "type": "js-expr" })
        );
    }

    #[test]
    fn test_comp_only_detection() {
        let node = LayoutNode {
            comp: Some("card".to_string()),
            ..Default::default()
        };
        assert!(node.is_comp_only());

        let node = LayoutNode {
            comp: Some("select".to_string()),
            label: Some("Pick".to_string()),
            ..Default::default()
        };
        assert!(!node.is_comp_only());
        assert!(LayoutNode::default().is_empty());
    }
}
