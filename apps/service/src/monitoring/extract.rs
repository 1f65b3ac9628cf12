//! Value extraction from ENDPOINT response bodies.
//!
//! Evaluators report every outcome as an [`Extraction`] variant so the
//! probe can classify failures without inspecting error types.

use serde_json::Value;
use serde_json_path::JsonPath;
use sxd_document::parser;
use sxd_xpath::evaluate_xpath;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Selector matched; carries the rendered value
    Found(String),
    /// Selector is valid but matched nothing
    NotFound,
    /// Selector could not be parsed
    MalformedSelector(String),
    /// Body could not be parsed as the expected format
    MalformedDocument(String),
}

/// Evaluate a JSONPath query against a JSON body
///
/// A single match renders as the bare value (strings unquoted), several
/// matches render as a JSON array.
pub fn extract_json(body: &str, path: &str) -> Extraction {
    let document: Value = match serde_json::from_str(body) {
        Ok(document) => document,
        Err(e) => return Extraction::MalformedDocument(format!("invalid JSON: {e}")),
    };

    let path = match JsonPath::parse(path) {
        Ok(path) => path,
        Err(e) => return Extraction::MalformedSelector(format!("invalid JSONPath '{path}': {e}")),
    };

    let nodes = path.query(&document).all();
    match nodes.as_slice() {
        [] => Extraction::NotFound,
        [single] => Extraction::Found(render_json(single)),
        many => Extraction::Found(Value::Array(many.iter().map(|v| (*v).clone()).collect()).to_string()),
    }
}

fn render_json(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Evaluate an XPath expression against an XML body
///
/// The string value of the result is returned; an empty string counts as
/// not found.
pub fn extract_xml(body: &str, expression: &str) -> Extraction {
    let package = match parser::parse(body) {
        Ok(package) => package,
        Err(e) => return Extraction::MalformedDocument(format!("invalid XML: {e:?}")),
    };
    let document = package.as_document();

    match evaluate_xpath(&document, expression) {
        Ok(value) => {
            let text = value.string();
            if text.is_empty() { Extraction::NotFound } else { Extraction::Found(text) }
        }
        Err(e) => Extraction::MalformedSelector(format!("invalid XPath '{expression}': {e:?}")),
    }
}
