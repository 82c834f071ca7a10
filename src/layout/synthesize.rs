//! Layout Synthesis
//!
//! Finalizes mapped layouts, aggregates `oneOf` discriminant labels one level up,
//! and stamps the output root with a stable `$id`.

use serde_json::{Map, Value};
use tracing::{debug, warn};

use super::{Layout, LayoutNode, OneOfLayout};
use crate::error::Result;

/// `$id` given to output roots that have none
pub const DEFAULT_ROOT_ID: &str = "_jl";

/// Turn a mapped layout into its output form.
///
/// Empty layouts disappear and a layout holding only `comp` collapses to the
/// bare component name.
pub fn finalize(layout: LayoutNode) -> Option<Layout> {
    if layout.is_empty() {
        None
    } else if layout.is_comp_only() {
        layout.comp.map(Layout::Comp)
    } else {
        Some(Layout::Node(layout))
    }
}

/// Give the root a `$id` unless it already declares one
pub fn stamp_root_id(root: &mut Map<String, Value>, root_id: &str) -> bool {
    if root.contains_key("$id") {
        return false;
    }
    root.insert("$id".to_string(), Value::String(root_id.to_string()));
    true
}

/// Attach `oneOfLayout.label` to an `allOf` element that contains a `oneOf`.
///
/// The label is the `title` of the single property of the first branch that
/// declares both `const` and `title`.
pub fn attach_one_of_label(element: &mut Map<String, Value>, path: &str) -> Result<bool> {
    if element.contains_key("oneOfLayout") {
        return Ok(false);
    }
    let Some(label) = discriminant_label(element, path) else {
        return Ok(false);
    };

    debug!(path, label = %label, "attaching oneOf discriminant label");
    let one_of_layout = serde_json::to_value(OneOfLayout { label })?;
    element.insert("oneOfLayout".to_string(), one_of_layout);
    Ok(true)
}

fn discriminant_label(element: &Map<String, Value>, path: &str) -> Option<String> {
    let properties = element
        .get("oneOf")?
        .as_array()?
        .first()?
        .get("properties")?
        .as_object()?;

    let mut candidates = properties.values().filter_map(|prop| {
        let prop = prop.as_object()?;
        if !prop.contains_key("const") {
            return None;
        }
        prop.get("title")?.as_str()
    });

    let label = candidates.next()?;
    if candidates.next().is_some() {
        warn!(path, "several const+title properties in first oneOf branch, no label attached");
        return None;
    }
    Some(label.to_string())
}
