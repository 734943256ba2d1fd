//! `application/x-www-form-urlencoded` decoding.

use crate::model::{MultiValueMap, NottableString};
use serde_json::{Map, Value};

/// Decode a form body into parameters. Names and values are taken literally.
pub fn parse_form(body: &str) -> MultiValueMap {
    let mut builder = MultiValueMap::builder();
    for pair in body.split('&').filter(|s| !s.is_empty()) {
        let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
        builder.add(
            NottableString::string(decode(key)),
            [NottableString::string(decode(value))],
        );
    }
    builder.build()
}

fn decode(component: &str) -> String {
    let spaced = component.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

/// JSON view of parameters: single values become strings, repeated values arrays.
pub fn form_to_json(parameters: &MultiValueMap) -> Value {
    let mut object = Map::new();
    for entry in parameters.entries() {
        let mut values: Vec<Value> = entry
            .values
            .iter()
            .map(|v| Value::String(v.value().to_string()))
            .collect();
        let value = if values.len() == 1 {
            values.remove(0)
        } else {
            Value::Array(values)
        };
        object.insert(entry.name.value().to_string(), value);
    }
    Value::Object(object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_form_decodes_and_merges() {
        let params = parse_form("name=Jane+Doe&tag=a&tag=b%26c&flag");
        assert_eq!(params.get_first("name"), Some("Jane Doe"));
        let tags: Vec<&str> = params.get("tag").unwrap().iter().map(|v| v.value()).collect();
        assert_eq!(tags, vec!["a", "b&c"]);
        assert_eq!(params.get_first("flag"), Some(""));
    }

    #[test]
    fn test_exclamation_is_literal() {
        let params = parse_form("q=!important");
        let value = &params.get("q").unwrap()[0];
        assert!(!value.is_not());
        assert_eq!(value.value(), "!important");
    }

    #[test]
    fn test_form_to_json() {
        let params = parse_form("a=1&b=2&b=3");
        assert_eq!(form_to_json(&params), json!({"a": "1", "b": ["2", "3"]}));
    }
}
