// Tests for document and message output
//
// Documents and messages are captured through shared buffers so the two
// streams can be checked separately.

use super::*;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Clone, Default)]
struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

impl SharedBuffer {
    fn contents(&self) -> String {
        String::from_utf8(self.0.borrow().clone()).unwrap()
    }
}

impl Write for SharedBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.borrow_mut().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

fn writer(format: OutputFormat) -> (OutputWriter, SharedBuffer, SharedBuffer) {
    let documents = SharedBuffer::default();
    let messages = SharedBuffer::default();
    let writer = OutputWriter::with_writers(format, Box::new(documents.clone()), Box::new(messages.clone()));
    (writer, documents, messages)
}

#[test]
fn test_yaml_documents() {
    let (mut output, documents, messages) = writer(OutputFormat::Yaml);
    output.data(&json!({"label": "Alice", "age": "33 years"})).unwrap();
    assert_eq!(documents.contents(), "label: Alice\nage: 33 years\n");
    assert_eq!(messages.contents(), "");
}

#[test]
fn test_json_documents_end_with_newline() {
    let (mut output, documents, _) = writer(OutputFormat::Json);
    output.data(&json!({"items_str": "a|b|c"})).unwrap();
    assert_eq!(documents.contents(), "{\"items_str\":\"a|b|c\"}\n");

    let (mut output, documents, _) = writer(OutputFormat::JsonPretty);
    output.data(&json!([1, 2])).unwrap();
    assert_eq!(documents.contents(), "[\n  1,\n  2\n]\n");
}

#[test]
fn test_messages_stay_out_of_documents() {
    let (mut output, documents, messages) = writer(OutputFormat::Yaml);
    output.info("Mapping 2 objects").unwrap();
    output.warning("Skipped 1 derivation").unwrap();
    output.success("Done").unwrap();
    assert_eq!(documents.contents(), "");
    assert_eq!(
        messages.contents(),
        "INFO: Mapping 2 objects\nWARNING: Skipped 1 derivation\nDone\n"
    );
}

#[test]
fn test_no_progress_bar_with_custom_writers() {
    let (output, _, _) = writer(OutputFormat::Yaml);
    assert!(output.progress_bar(10, "mapping").is_none());
    assert_eq!(output.format(), OutputFormat::Yaml);
}

#[test]
fn test_write_to_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out").join("agents.json");
    let mut output = OutputWriter::new(OutputFormat::Json, false, true).to_file(&path).unwrap();
    output.data(&json!({"label": "Bob"})).unwrap();
    drop(output);
    assert_eq!(std::fs::read_to_string(&path).unwrap(), "{\"label\":\"Bob\"}\n");
}
