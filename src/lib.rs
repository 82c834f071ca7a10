//! Layout Compat
//!
//! Migrates JSON Schemas written in the legacy dialect (plain JSON Schema plus
//! `x-*` UI hints) into schemas carrying explicit `layout` metadata for the layout
//! compiler.
//!
//! ## Pipeline
//!
//! ```text
//! legacy schema
//!   └─ walker      recursive, cycle-safe traversal ($ref targets migrated once)
//!       └─ mapper  x-* rules → layout mutations
//!           └─ template  {context.path} → ${context.path}
//!   └─ layout      collapse layouts, oneOf labels, root $id
//! migrated schema
//! ```
//!
//! ## Example
//!
//! ```
//! use serde_json::json;
//!
//! let schema = json!({ "type": "string", "x-display": "textarea" });
//! let migrated = layout_compat::transform(&schema, None).unwrap();
//! assert_eq!(migrated, json!({ "type": "string", "$id": "_jl", "layout": "textarea" }));
//! ```

pub mod config;
pub mod error;
pub mod layout;
pub mod lint;
pub mod mapper;
pub mod template;
pub mod validator;
pub mod walker;

pub use config::CompatConfig;
pub use error::{CompatError, Result};
pub use layout::{
    ExprType, ItemOrigin, ItemSource, Layout, LayoutNode, OneOfLayout, TemplateDescriptor,
};
pub use lint::{lint_output, ContractLinter, LintResult};
pub use mapper::{ExtensionHandler, ExtensionTable};
pub use template::{Classification, SourceRole, TemplateDetector};
pub use validator::{JsonSchemaValidator, SchemaValidator};

use serde_json::Value;
use std::path::Path;
use tracing::{debug, debug_span};

use crate::walker::Walker;

/// A finished migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// The migrated schema
    pub schema: Value,
    /// `$ref` pointers whose targets were migrated, each exactly once
    pub resolved_refs: Vec<String>,
}

/// Configured migration entry point
pub struct Transformer<'a> {
    table: &'a ExtensionTable,
    detector: TemplateDetector,
    root_id: String,
    validator: Option<&'a dyn SchemaValidator>,
}

impl Default for Transformer<'_> {
    fn default() -> Self {
        Self::new(&CompatConfig::default())
    }
}

impl<'a> Transformer<'a> {
    pub fn new(config: &CompatConfig) -> Self {
        Self {
            table: ExtensionTable::global(),
            detector: TemplateDetector::new(config.templates.min_path_segments),
            root_id: config.transform.root_id.clone(),
            validator: None,
        }
    }

    /// Build a transformer from the layered configuration files and environment.
    /// `config_path`, when given, must exist.
    pub fn from_config_file(config_path: Option<&Path>) -> Result<Self> {
        let config = CompatConfig::load_from(config_path)?;
        Ok(Self::new(&config))
    }

    /// Pre-check inputs with `validator` before migrating them
    pub fn with_validator(mut self, validator: &'a dyn SchemaValidator) -> Self {
        self.validator = Some(validator);
        self
    }

    /// Use a custom rule table instead of the built-in one
    pub fn with_table(mut self, table: &'a ExtensionTable) -> Self {
        self.table = table;
        self
    }

    /// Migrate `schema`. The input is never modified.
    pub fn run(&self, schema: &Value) -> Result<Migration> {
        let _span = debug_span!("transform", root_id = %self.root_id).entered();

        if let Some(validator) = self.validator {
            validator
                .validate(schema)
                .map_err(|errors| CompatError::InvalidInputSchema { errors })?;
        }

        let walked = Walker::new(schema, self.table, &self.detector).walk()?;
        let mut migrated = walked.schema;
        if let Value::Object(root) = &mut migrated {
            layout::stamp_root_id(root, &self.root_id);
        }

        debug!(resolved = walked.resolved.len(), "schema migrated");
        Ok(Migration {
            schema: migrated,
            resolved_refs: walked.resolved,
        })
    }
}

/// Migrate a legacy schema with the default configuration.
///
/// When `validator` is given it runs once against the input; a rejection fails
/// with [`CompatError::InvalidInputSchema`] and nothing is migrated.
pub fn transform(schema: &Value, validator: Option<&dyn SchemaValidator>) -> Result<Value> {
    let mut transformer = Transformer::default();
    if let Some(validator) = validator {
        transformer = transformer.with_validator(validator);
    }
    transformer.run(schema).map(|migration| migration.schema)
}
