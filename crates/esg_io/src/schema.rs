//! JSON Schema (2020-12) validation, used to check the rubric document and
//! output artifacts against their published schemas before they're trusted.

#[cfg(feature = "schemaval")]
use jsonschema::JSONSchema;

use crate::IoError;

#[cfg(feature = "schemaval")]
pub struct CompiledSchema {
    inner: JSONSchema,
}

#[cfg(feature = "schemaval")]
impl CompiledSchema {
    pub fn compile(schema: &serde_json::Value) -> Result<Self, IoError> {
        let inner = JSONSchema::options()
            .with_draft(jsonschema::Draft::Draft202012)
            .compile(schema)
            .map_err(|e| IoError::Schema(e.to_string()))?;
        Ok(CompiledSchema { inner })
    }

    pub fn validate(&self, instance: &serde_json::Value) -> Result<(), IoError> {
        let result = self.inner.validate(instance);
        if let Err(errors) = result {
            let msg = errors.map(|e| e.to_string()).collect::<Vec<_>>().join("; ");
            return Err(IoError::Schema(msg));
        }
        Ok(())
    }
}

#[cfg(not(feature = "schemaval"))]
pub struct CompiledSchema;

#[cfg(not(feature = "schemaval"))]
impl CompiledSchema {
    pub fn compile(_schema: &serde_json::Value) -> Result<Self, IoError> {
        Err(IoError::Schema("schemaval feature disabled".into()))
    }

    pub fn validate(&self, _instance: &serde_json::Value) -> Result<(), IoError> {
        Err(IoError::Schema("schemaval feature disabled".into()))
    }
}

#[cfg(all(test, feature = "schemaval"))]
mod tests {
    use super::*;

    #[test]
    fn compiles_and_validates() {
        let schema = serde_json::json!({
            "type": "object",
            "required": ["theme"],
            "properties": { "theme": { "type": "string" } }
        });
        let compiled = CompiledSchema::compile(&schema).unwrap();
        assert!(compiled.validate(&serde_json::json!({"theme": "TSP"})).is_ok());
        assert!(compiled.validate(&serde_json::json!({})).is_err());
    }
}
