//! Shared utilities for command handlers

use crate::cli::MappingInputs;
use crate::error::{Error, Result};
use crate::output::OutputWriter;
use schemamap_core::{Session, TransformerOptions};
use schemamap_schemas::loader::DocumentParser;
use serde::Serialize;
use serde_json::Value;
use std::io::Read;
use std::path::Path;
use tracing::debug;

/// Build a session from the schema and specification files
pub fn load_session(inputs: &MappingInputs, options: TransformerOptions) -> Result<Session> {
    let mut session = Session::with_options(options);
    session.load_source_schema(existing(&inputs.source_schema)?)?;
    session.load_transformer_specification(existing(&inputs.transformer_specification)?)?;
    Ok(session)
}

/// Read a YAML or JSON data document; `-` reads YAML (or JSON) from stdin
pub fn read_document(path: &Path) -> Result<Value> {
    if path == Path::new("-") {
        let mut content = String::new();
        std::io::stdin().read_to_string(&mut content)?;
        debug!(bytes = content.len(), "Read document from stdin");
        let parsed: serde_yaml::Value = serde_yaml::from_str(&content)?;
        return Ok(serde_json::to_value(parsed)?);
    }
    Ok(DocumentParser::new().parse_file(existing(path)?)?)
}

/// Write a document to `path`, or to the output writer when no path is given
pub fn write_document<T: Serialize>(output: &mut OutputWriter, path: Option<&Path>, value: &T) -> Result<()> {
    match path {
        Some(path) => {
            OutputWriter::new(output.format(), false, true)
                .to_file(path)?
                .data(value)?;
            output.success(&format!("Wrote {}", path.display()))
        }
        None => output.data(value),
    }
}

fn existing(path: &Path) -> Result<&Path> {
    if path.exists() {
        Ok(path)
    } else {
        Err(Error::FileNotFound {
            path: path.to_path_buf(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;

    #[test]
    fn test_read_yaml_and_json_documents() {
        let dir = tempfile::tempdir().unwrap();
        let yaml = dir.path().join("people.yaml");
        fs::write(&yaml, "- name: Alice\n- name: Bob\n").unwrap();
        assert_eq!(read_document(&yaml).unwrap(), json!([{"name": "Alice"}, {"name": "Bob"}]));

        let json_path = dir.path().join("person.json");
        fs::write(&json_path, r#"{"name": "Alice"}"#).unwrap();
        assert_eq!(read_document(&json_path).unwrap(), json!({"name": "Alice"}));
    }

    #[test]
    fn test_missing_document() {
        let err = read_document(Path::new("/nonexistent/people.yaml")).unwrap_err();
        assert!(matches!(err, Error::FileNotFound { .. }));
    }
}
