//! Template Expression Detection
//!
//! Classifies strings taken from data-source and conditional extensions as a
//! literal, a plain expression or an interpolated template, and rewrites legacy
//! `{context.path}` markers to the `${context.path}` syntax expected downstream.
//!
//! Only dotted identifier paths are promoted. Single-token placeholders such as
//! `{q}` belong to the receiving endpoint's own substitution and stay untouched.

use regex::{Captures, Regex};
use std::sync::OnceLock;

use crate::layout::TemplateDescriptor;

/// Default number of dot-separated segments a placeholder needs to be promoted
pub const DEFAULT_MIN_PATH_SEGMENTS: usize = 2;

fn marker_regex() -> &'static Regex {
    static MARKER: OnceLock<Regex> = OnceLock::new();
    MARKER.get_or_init(|| Regex::new(r"(\$?)\{([^{}]*)\}").expect("marker pattern is valid"))
}

fn path_regex() -> &'static Regex {
    static PATH: OnceLock<Regex> = OnceLock::new();
    PATH.get_or_init(|| {
        Regex::new(r"^[A-Za-z_$][A-Za-z0-9_$]*(\.[A-Za-z_$][A-Za-z0-9_$]*)*$")
            .expect("path pattern is valid")
    })
}

/// Where a raw string came from, which decides how an unmarked string is read
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceRole {
    /// Evaluated as an expression (`x-fromData`, `x-if`)
    Expression,
    /// Fetched as a URL (`x-fromUrl`)
    Url,
}

/// Classification of a raw extension string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// No promotable markers, used verbatim as a URL
    Literal,
    /// No promotable markers, evaluated as an expression
    Expression,
    /// At least one interpolation marker
    Template,
}

/// Result of running the detector over one string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detected {
    pub classification: Classification,
    /// Canonical expression text, with markers already rewritten
    pub expr: String,
}

impl Detected {
    /// Typed `{expr, type[, pure]}` descriptor
    pub fn into_descriptor(self) -> TemplateDescriptor {
        match self.classification {
            Classification::Expression => TemplateDescriptor::expression(self.expr),
            Classification::Literal | Classification::Template => {
                TemplateDescriptor::template(self.expr)
            }
        }
    }
}

/// Detects and rewrites interpolation markers
#[derive(Debug, Clone)]
pub struct TemplateDetector {
    min_path_segments: usize,
}

impl Default for TemplateDetector {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_PATH_SEGMENTS)
    }
}

impl TemplateDetector {
    pub fn new(min_path_segments: usize) -> Self {
        Self {
            min_path_segments: min_path_segments.max(1),
        }
    }

    /// Whether the inside of a `{...}` marker is a context/value reference
    pub fn is_promotable(&self, token: &str) -> bool {
        let token = token.trim();
        path_regex().is_match(token) && token.split('.').count() >= self.min_path_segments
    }

    /// Classify `raw` and rewrite its promotable markers
    pub fn detect(&self, raw: &str, role: SourceRole) -> Detected {
        let mut templated = false;
        let expr = marker_regex()
            .replace_all(raw, |caps: &Captures| {
                let whole = &caps[0];
                if !caps[1].is_empty() {
                    // already `${...}`
                    templated = true;
                    return whole.to_string();
                }
                let token = &caps[2];
                if self.is_promotable(token) {
                    templated = true;
                    format!("${{{}}}", token.trim())
                } else {
                    whole.to_string()
                }
            })
            .into_owned();

        let classification = match (templated, role) {
            (true, _) => Classification::Template,
            (false, SourceRole::Expression) => Classification::Expression,
            (false, SourceRole::Url) => Classification::Literal,
        };

        Detected { classification, expr }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::ExprType;

    #[test]
    fn test_dotted_path_is_expression() {
        let detected =
            TemplateDetector::default().detect("context.objectItems", SourceRole::Expression);
        assert_eq!(detected.classification, Classification::Expression);
        assert_eq!(detected.expr, "context.objectItems");
    }

    #[test]
    fn test_url_rewrite_keeps_single_token_placeholders() {
        let detected = TemplateDetector::default().detect(
            "{context.dataFairUrl}/api/v1/datasets?q={q}&select=id,title&{context.ownerFilter}",
            SourceRole::Url,
        );
        assert_eq!(detected.classification, Classification::Template);
        assert_eq!(
            detected.expr,
            "${context.dataFairUrl}/api/v1/datasets?q={q}&select=id,title&${context.ownerFilter}"
        );
    }

    #[test]
    fn test_rewrite_is_idempotent() {
        let detector = TemplateDetector::default();
        let once = detector.detect("{context.a}/x?q={q}", SourceRole::Url);
        let twice = detector.detect(&once.expr, SourceRole::Url);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_plain_url_is_literal() {
        let detected =
            TemplateDetector::default().detect("https://example.com/items?q={q}", SourceRole::Url);
        assert_eq!(detected.classification, Classification::Literal);
        let descriptor = detected.into_descriptor();
        assert_eq!(descriptor.expr_type, Some(ExprType::JsTpl));
        assert_eq!(descriptor.pure, Some(true));
    }

    #[test]
    fn test_min_segments_threshold() {
        let detector = TemplateDetector::new(3);
        assert!(!detector.is_promotable("context.url"));
        assert!(detector.is_promotable("context.owner.id"));
        assert!(!detector.is_promotable("not a path"));
        assert!(!detector.is_promotable(""));
    }

    #[test]
    fn test_condition_descriptor_is_not_pure() {
        let descriptor = TemplateDetector::default()
            .detect("parent.value.multivalued == true", SourceRole::Expression)
            .into_descriptor();
        assert_eq!(descriptor.expr_type, Some(ExprType::JsExpr));
        assert!(descriptor.pure.is_none());
    }
}
