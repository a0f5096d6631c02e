//! Loads the fixed rubric document (§4.5) from disk once at startup. The
//! rubric itself — per-theme keyword lexicons, evidence floors, version —
//! lives in `esg_core::rubric`; this module only owns the disk read.

use std::path::Path;

use esg_core::rubric::Rubric;

use crate::schema::CompiledSchema;
use crate::IoError;

/// The rubric document's published shape (§3: the rubric's canonical form is
/// a schema-validated structured document), checked before the document is
/// trusted enough to deserialize into domain types.
fn rubric_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "object",
        "required": ["version", "themes"],
        "properties": {
            "version": { "type": "string", "minLength": 1 },
            "themes": {
                "type": "array",
                "minItems": 1,
                "items": {
                    "type": "object",
                    "required": ["theme", "keywords", "evidence_min", "distinct_pages_min"],
                    "properties": {
                        "theme": { "type": "string" },
                        "keywords": { "type": "array", "items": { "type": "string" } },
                        "evidence_min": { "type": "integer", "minimum": 0 },
                        "distinct_pages_min": { "type": "integer", "minimum": 0 }
                    }
                }
            }
        }
    })
}

/// Parse and schema-validate a rubric document from `path`. The document is
/// plain JSON (not canonicalized — it is an input, not an emitted artifact).
pub fn load_rubric(path: &Path) -> Result<Rubric, IoError> {
    let bytes = std::fs::read(path).map_err(|e| IoError::Path(format!("{}: {e}", path.display())))?;
    let value: serde_json::Value = serde_json::from_slice(&bytes)?;

    let schema = CompiledSchema::compile(&rubric_schema())?;
    schema.validate(&value)?;

    let rubric: Rubric = serde_json::from_value(value)?;
    if rubric.themes.is_empty() {
        return Err(IoError::Invalid(format!("rubric document {} has no themes", path.display())));
    }
    Ok(rubric)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn loads_a_minimal_rubric() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rubric.json");
        let mut f = std::fs::File::create(&path).unwrap();
        write!(
            f,
            r#"{{"version":"v3.0","themes":[{{"theme":"Ghg","keywords":["emissions"],"evidence_min":2,"distinct_pages_min":2}}]}}"#
        )
        .unwrap();
        let rubric = load_rubric(&path).unwrap();
        assert_eq!(rubric.version.as_str(), "v3.0");
        assert_eq!(rubric.themes.len(), 1);
    }

    #[test]
    fn rejects_empty_theme_list() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("rubric.json");
        std::fs::write(&path, r#"{"version":"v3.0","themes":[]}"#).unwrap();
        assert!(load_rubric(&path).is_err());
    }
}
