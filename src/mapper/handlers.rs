//! Built-in legacy extension rules

use serde_json::Value;

use super::{ExtensionHandler, MapContext};
use crate::error::{CompatError, Result};
use crate::layout::{ItemOrigin, ItemSource, LayoutNode};
use crate::template::{Classification, SourceRole};

const FROM_DATA: &str = "x-fromData";
const FROM_URL: &str = "x-fromUrl";
const ITEMS_PROP: &str = "x-itemsProp";
const ITEM_KEY: &str = "x-itemKey";
const ITEM_TITLE: &str = "x-itemTitle";

/// `x-display` → `comp`
pub struct DisplayHandler;

impl ExtensionHandler for DisplayHandler {
    fn name(&self) -> &'static str {
        "display"
    }

    fn keys(&self) -> &'static [&'static str] {
        &["x-display"]
    }

    fn apply(&self, ctx: &MapContext<'_>, layout: &mut LayoutNode) -> Result<()> {
        if let Some(comp) = ctx.string("x-display")? {
            layout.comp = Some(comp.to_string());
        }
        Ok(())
    }
}

/// `x-fromData` / `x-fromUrl` and their item descriptors → `select` + `getItems`.
///
/// On arrays without a data source, `x-itemTitle` and `x-itemKey` describe how
/// list entries are displayed instead.
pub struct ItemSourceHandler;

impl ExtensionHandler for ItemSourceHandler {
    fn name(&self) -> &'static str {
        "item-source"
    }

    fn keys(&self) -> &'static [&'static str] {
        &[FROM_DATA, FROM_URL, ITEMS_PROP, ITEM_KEY, ITEM_TITLE]
    }

    fn apply(&self, ctx: &MapContext<'_>, layout: &mut LayoutNode) -> Result<()> {
        let from_data = ctx.string(FROM_DATA)?;
        let from_url = ctx.string(FROM_URL)?;
        let items_prop = ctx.string(ITEMS_PROP)?;
        let item_key = ctx.string(ITEM_KEY)?.map(String::from);
        let item_title = ctx.string(ITEM_TITLE)?.map(String::from);

        let origin = match (from_data, from_url) {
            (Some(_), Some(_)) => {
                return Err(CompatError::ConflictingSource {
                    path: super::display_path(ctx.path),
                });
            }
            (Some(expr), None) => {
                if items_prop.is_some() {
                    return Err(ctx.unsupported(
                        &[FROM_DATA, ITEMS_PROP],
                        "x-itemsProp only applies to x-fromUrl responses",
                    ));
                }
                let detected = ctx.detector.detect(expr, SourceRole::Expression);
                if detected.classification == Classification::Template {
                    return Err(ctx.invalid(FROM_DATA, "a plain expression without {...} markers"));
                }
                ItemOrigin::Expr { expr: detected.expr }
            }
            (None, Some(url)) => ItemOrigin::Url {
                url: ctx.detector.detect(url, SourceRole::Url).into_descriptor(),
                items_prop: items_prop.map(String::from),
            },
            (None, None) => {
                if items_prop.is_some() {
                    return Err(ctx.unsupported(
                        &[ITEMS_PROP, ITEM_KEY, ITEM_TITLE],
                        "x-itemsProp requires x-fromUrl",
                    ));
                }
                if !ctx.is_array() {
                    return Err(ctx.unsupported(
                        &[ITEM_KEY, ITEM_TITLE],
                        "item descriptors require x-fromData or x-fromUrl outside of arrays",
                    ));
                }
                layout.item_key = item_key;
                layout.item_title = item_title;
                return Ok(());
            }
        };

        layout.comp = Some("select".to_string());
        layout.get_items = Some(ItemSource {
            origin,
            item_key,
            item_title,
        });
        Ok(())
    }
}

/// `x-if` → `cond`
pub struct ConditionHandler;

impl ExtensionHandler for ConditionHandler {
    fn name(&self) -> &'static str {
        "condition"
    }

    fn keys(&self) -> &'static [&'static str] {
        &["x-if"]
    }

    fn apply(&self, ctx: &MapContext<'_>, layout: &mut LayoutNode) -> Result<()> {
        if let Some(cond) = ctx.string("x-if")? {
            layout.cond = Some(ctx.detector.detect(cond, SourceRole::Expression).into_descriptor());
        }
        Ok(())
    }
}

/// `x-props` → `props`, `x-cols` → `cols`
pub struct PresentationHandler;

impl ExtensionHandler for PresentationHandler {
    fn name(&self) -> &'static str {
        "presentation"
    }

    fn keys(&self) -> &'static [&'static str] {
        &["x-props", "x-cols"]
    }

    fn apply(&self, ctx: &MapContext<'_>, layout: &mut LayoutNode) -> Result<()> {
        match ctx.node.get("x-props") {
            None => {}
            Some(Value::Object(props)) => layout.props = Some(props.clone()),
            Some(_) => return Err(ctx.invalid("x-props", "an object")),
        }
        match ctx.node.get("x-cols") {
            None => {}
            // a single width or a per-breakpoint object
            Some(cols @ (Value::Number(_) | Value::Object(_))) => layout.cols = Some(cols.clone()),
            Some(_) => return Err(ctx.invalid("x-cols", "a number or an object")),
        }
        Ok(())
    }
}
