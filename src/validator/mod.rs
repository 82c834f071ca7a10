//! Input Validation Capability
//!
//! The transform can pre-check the legacy input with any [`SchemaValidator`]. The
//! validator is injected by the caller; the transform itself never depends on it.

use jsonschema::{Draft, JSONSchema, ValidationError};
use serde_json::Value;
use std::sync::OnceLock;

/// Something able to accept or reject a legacy schema
pub trait SchemaValidator: Send + Sync {
    /// `Err` carries every message the validator produced
    fn validate(&self, schema: &Value) -> Result<(), Vec<String>>;
}

impl<F> SchemaValidator for F
where
    F: Fn(&Value) -> Result<(), Vec<String>> + Send + Sync,
{
    fn validate(&self, schema: &Value) -> Result<(), Vec<String>> {
        self(schema)
    }
}

/// Checks that the input is itself a well-formed Draft-07 JSON Schema.
///
/// The input is validated as an instance of the Draft-07 meta-schema, so every
/// violation is reported rather than only the first one.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonSchemaValidator;

fn draft7_meta_schema() -> &'static JSONSchema {
    static META: OnceLock<JSONSchema> = OnceLock::new();
    META.get_or_init(|| {
        let meta: Value = serde_json::from_str(include_str!("draft-07.schema.json"))
            .expect("bundled meta-schema is valid JSON");
        JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&meta)
            .expect("bundled meta-schema compiles")
    })
}

fn describe(error: &ValidationError<'_>) -> String {
    format!("{} (at '{}')", error, error.instance_path)
}

impl SchemaValidator for JsonSchemaValidator {
    fn validate(&self, schema: &Value) -> Result<(), Vec<String>> {
        if let Err(errors) = draft7_meta_schema().validate(schema) {
            return Err(errors.map(|error| describe(&error)).collect());
        }
        // catches what the meta-schema cannot express, such as unusable patterns
        match JSONSchema::options().with_draft(Draft::Draft7).compile(schema) {
            Ok(_) => Ok(()),
            Err(error) => Err(vec![describe(&error)]),
        }
    }
}
