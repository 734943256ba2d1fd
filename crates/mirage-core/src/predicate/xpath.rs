//! XPath evaluation over XML bodies, with a JSON to XML bridge.

use serde_json::Value;
use sxd_document::parser;
use sxd_xpath::{evaluate_xpath, Value as XPathValue};

#[derive(Debug, thiserror::Error)]
pub enum XPathError {
    #[error("failed to parse XML body: {0}")]
    Xml(String),
    #[error("failed to evaluate xpath \"{expression}\": {message}")]
    Expression { expression: String, message: String },
}

/// Evaluate an expression and reduce the result to a boolean.
///
/// Booleans are taken as is, numbers are true when non-zero, strings when
/// non-empty and node sets when they contain at least one node.
pub fn evaluate(xml: &str, expression: &str) -> Result<bool, XPathError> {
    let package = parser::parse(xml).map_err(|e| XPathError::Xml(format!("{:?}", e)))?;
    let document = package.as_document();
    let value = evaluate_xpath(&document, expression).map_err(|e| XPathError::Expression {
        expression: expression.to_string(),
        message: e.to_string(),
    })?;
    Ok(match value {
        XPathValue::Boolean(b) => b,
        XPathValue::Number(n) => n != 0.0 && !n.is_nan(),
        XPathValue::String(s) => !s.is_empty(),
        XPathValue::Nodeset(nodes) => nodes.size() > 0,
    })
}

/// Convert a JSON document into XML under a `<root>` element.
///
/// Object keys become elements, arrays repeat their element and scalars
/// become text content.
pub fn json_to_xml(value: &Value) -> String {
    let mut xml = String::new();
    write_element(&mut xml, "root", value);
    xml
}

fn write_element(xml: &mut String, name: &str, value: &Value) {
    match value {
        Value::Array(items) => {
            for item in items {
                write_element(xml, name, item);
            }
        }
        Value::Object(fields) => {
            xml.push('<');
            xml.push_str(name);
            xml.push('>');
            for (key, field) in fields {
                write_element(xml, &element_name(key), field);
            }
            xml.push_str("</");
            xml.push_str(name);
            xml.push('>');
        }
        Value::Null => {
            xml.push('<');
            xml.push_str(name);
            xml.push_str("/>");
        }
        scalar => {
            let text = match scalar {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            xml.push('<');
            xml.push_str(name);
            xml.push('>');
            xml.push_str(&escape(&text));
            xml.push_str("</");
            xml.push_str(name);
            xml.push('>');
        }
    }
}

fn element_name(key: &str) -> String {
    let mut name: String = key
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '_' | '-' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if name.is_empty() || !name.starts_with(|c: char| c.is_alphabetic() || c == '_') {
        name.insert(0, '_');
    }
    name
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}
