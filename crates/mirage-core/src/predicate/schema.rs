//! JSON schema validation for schema strings and schema bodies.
//!
//! Supported keywords: `type`, `enum`, `const`, `properties`, `required`,
//! `additionalProperties`, `patternProperties`, `propertyNames`,
//! `minProperties`, `maxProperties`, `dependencies`, `dependentRequired`,
//! `items` (schema or tuple), `additionalItems`, `contains`, `minItems`,
//! `maxItems`, `uniqueItems`, `minLength`, `maxLength`, `pattern`, `minimum`,
//! `maximum`, `exclusiveMinimum`, `exclusiveMaximum`, `multipleOf`, `allOf`,
//! `anyOf`, `oneOf`, `not`, `if`/`then`/`else`, local `$ref` into
//! `definitions`/`$defs`. `format` and the documentation keywords are
//! annotations only. Any other keyword fails compilation with
//! [`SchemaError::Unsupported`].

use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashMap;

const TYPES: &[&str] = &[
    "null", "boolean", "object", "array", "number", "string", "integer",
];

const VALIDATION_KEYWORDS: &[&str] = &[
    "type", "enum", "const", "properties", "required", "additionalProperties",
    "patternProperties", "propertyNames", "minProperties", "maxProperties",
    "dependencies", "dependentRequired", "items", "additionalItems", "contains",
    "minItems", "maxItems", "uniqueItems", "minLength", "maxLength", "pattern",
    "minimum", "maximum", "exclusiveMinimum", "exclusiveMaximum", "multipleOf",
    "allOf", "anyOf", "oneOf", "not", "if", "then", "else", "$ref",
];

const ANNOTATION_KEYWORDS: &[&str] = &[
    "$schema", "$id", "id", "$comment", "title", "description", "default",
    "examples", "format", "readOnly", "writeOnly", "deprecated", "definitions",
    "$defs",
];

/// Nesting bound for `$ref` chains that never descend into the instance.
const MAX_DEPTH: usize = 128;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("schema must be an object or a boolean, found: {0}")]
    NotAnObject(String),
    #[error("unsupported schema type \"{0}\"")]
    UnknownType(String),
    #[error("unsupported schema keyword \"{0}\"")]
    Unsupported(String),
    #[error("unresolvable schema reference \"{0}\"")]
    UnresolvedRef(String),
    #[error("invalid pattern \"{pattern}\" in schema: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// A validated schema document with its `pattern` keywords pre-compiled.
#[derive(Debug)]
pub struct JsonSchema {
    document: Value,
    source: String,
    patterns: HashMap<String, Regex>,
}

impl JsonSchema {
    pub fn compile(document: Value) -> Result<Self, SchemaError> {
        let mut patterns = HashMap::new();
        check_schema(&document, &document, &mut patterns)?;
        let source = document.to_string();
        Ok(Self {
            document,
            source,
            patterns,
        })
    }

    /// Parse and compile a schema from its JSON text.
    pub fn parse(text: &str) -> Result<Self, SchemaError> {
        let document = serde_json::from_str(text)
            .map_err(|_| SchemaError::NotAnObject(text.to_string()))?;
        Self::compile(document)
    }

    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Compact JSON text of the schema.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Validate an instance, returning one message per violation.
    pub fn validate(&self, instance: &Value) -> Vec<String> {
        let mut errors = Vec::new();
        self.validate_at(&self.document, instance, "", 0, &mut errors);
        errors
    }

    pub fn is_valid(&self, instance: &Value) -> bool {
        self.validate(instance).is_empty()
    }

    /// Validate text: parsed as JSON when possible, otherwise taken as a JSON string.
    pub fn matches_text(&self, text: &str) -> bool {
        let instance =
            serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()));
        self.is_valid(&instance)
    }

    fn validate_at(
        &self,
        schema: &Value,
        instance: &Value,
        path: &str,
        depth: usize,
        errors: &mut Vec<String>,
    ) {
        let schema = match schema {
            Value::Bool(true) => return,
            Value::Bool(false) => {
                errors.push(format!("{}: schema does not allow any value", display(path)));
                return;
            }
            Value::Object(schema) => schema,
            _ => return,
        };
        if depth > MAX_DEPTH {
            errors.push(format!("{}: schema references nest too deeply", display(path)));
            return;
        }

        if let Some(reference) = schema.get("$ref").and_then(Value::as_str) {
            match resolve(&self.document, reference) {
                Some(target) => self.validate_at(target, instance, path, depth + 1, errors),
                None => errors.push(format!(
                    "{}: unresolvable reference \"{}\"",
                    display(path),
                    reference
                )),
            }
        }

        if let Some(expected) = schema.get("type") {
            let allowed: Vec<&str> = match expected {
                Value::String(t) => vec![t.as_str()],
                Value::Array(ts) => ts.iter().filter_map(Value::as_str).collect(),
                _ => vec![],
            };
            if !allowed.is_empty() && !allowed.iter().any(|t| is_type(instance, t)) {
                errors.push(format!(
                    "{}: expected type {} but found {}",
                    display(path),
                    allowed.join(" or "),
                    type_name(instance)
                ));
                return;
            }
        }

        if let Some(Value::Array(options)) = schema.get("enum") {
            if !options.iter().any(|o| json_equal(o, instance)) {
                errors.push(format!(
                    "{}: value {} is not one of {}",
                    display(path),
                    instance,
                    Value::Array(options.clone())
                ));
            }
        }
        if let Some(constant) = schema.get("const") {
            if !json_equal(constant, instance) {
                errors.push(format!(
                    "{}: value {} does not equal const {}",
                    display(path),
                    instance,
                    constant
                ));
            }
        }

        match instance {
            Value::Object(object) => self.validate_object(schema, object, path, depth, errors),
            Value::Array(items) => self.validate_array(schema, items, path, depth, errors),
            Value::String(text) => self.validate_string(schema, text, path, errors),
            Value::Number(_) => validate_number(schema, instance, path, errors),
            _ => {}
        }

        if let Some(Value::Array(all)) = schema.get("allOf") {
            for sub in all {
                self.validate_at(sub, instance, path, depth + 1, errors);
            }
        }
        if let Some(Value::Array(any)) = schema.get("anyOf") {
            if !any.iter().any(|sub| self.passes(sub, instance, path, depth)) {
                errors.push(format!("{}: value does not match any schema in anyOf", display(path)));
            }
        }
        if let Some(Value::Array(one)) = schema.get("oneOf") {
            let passing = one
                .iter()
                .filter(|sub| self.passes(sub, instance, path, depth))
                .count();
            if passing != 1 {
                errors.push(format!(
                    "{}: value matches {} schemas in oneOf, expected exactly 1",
                    display(path),
                    passing
                ));
            }
        }
        if let Some(not) = schema.get("not") {
            if self.passes(not, instance, path, depth) {
                errors.push(format!("{}: value must not match schema in not", display(path)));
            }
        }
        if let Some(condition) = schema.get("if") {
            let branch = if self.passes(condition, instance, path, depth) {
                schema.get("then")
            } else {
                schema.get("else")
            };
            if let Some(branch) = branch {
                self.validate_at(branch, instance, path, depth + 1, errors);
            }
        }
    }

    fn passes(&self, schema: &Value, instance: &Value, path: &str, depth: usize) -> bool {
        let mut scratch = Vec::new();
        self.validate_at(schema, instance, path, depth + 1, &mut scratch);
        scratch.is_empty()
    }

    fn validate_object(
        &self,
        schema: &Map<String, Value>,
        object: &Map<String, Value>,
        path: &str,
        depth: usize,
        errors: &mut Vec<String>,
    ) {
        if let Some(Value::Array(required)) = schema.get("required") {
            for name in required.iter().filter_map(Value::as_str) {
                if !object.contains_key(name) {
                    errors.push(format!(
                        "{}: object has missing required property \"{}\"",
                        display(path),
                        name
                    ));
                }
            }
        }

        let count = object.len() as u64;
        if let Some(min) = schema.get("minProperties").and_then(Value::as_u64) {
            if count < min {
                errors.push(format!(
                    "{}: object has {} properties, minimum is {}",
                    display(path),
                    count,
                    min
                ));
            }
        }
        if let Some(max) = schema.get("maxProperties").and_then(Value::as_u64) {
            if count > max {
                errors.push(format!(
                    "{}: object has {} properties, maximum is {}",
                    display(path),
                    count,
                    max
                ));
            }
        }

        for key in ["dependencies", "dependentRequired"] {
            let Some(Value::Object(dependencies)) = schema.get(key) else {
                continue;
            };
            for (name, dependency) in dependencies.iter().filter(|(n, _)| object.contains_key(*n)) {
                match dependency {
                    Value::Array(names) => {
                        for needed in names.iter().filter_map(Value::as_str) {
                            if !object.contains_key(needed) {
                                errors.push(format!(
                                    "{}: property \"{}\" requires property \"{}\"",
                                    display(path),
                                    name,
                                    needed
                                ));
                            }
                        }
                    }
                    sub => self.validate_at(sub, &Value::Object(object.clone()), path, depth + 1, errors),
                }
            }
        }

        if let Some(names) = schema.get("propertyNames") {
            for name in object.keys() {
                let candidate = Value::String(name.clone());
                if !self.passes(names, &candidate, path, depth) {
                    errors.push(format!(
                        "{}: property name \"{}\" does not match propertyNames",
                        display(path),
                        name
                    ));
                }
            }
        }

        let properties = schema.get("properties").and_then(Value::as_object);
        let pattern_properties = schema.get("patternProperties").and_then(Value::as_object);
        for (name, value) in object {
            let child = format!("{}/{}", path, name);
            let mut covered = false;
            if let Some(sub) = properties.and_then(|p| p.get(name)) {
                covered = true;
                self.validate_at(sub, value, &child, depth + 1, errors);
            }
            for (pattern, sub) in pattern_properties.into_iter().flatten() {
                if self.patterns.get(pattern).is_some_and(|re| re.is_match(name)) {
                    covered = true;
                    self.validate_at(sub, value, &child, depth + 1, errors);
                }
            }
            if covered {
                continue;
            }
            match schema.get("additionalProperties") {
                Some(Value::Bool(false)) => errors.push(format!(
                    "{}: object has unexpected property \"{}\"",
                    display(path),
                    name
                )),
                Some(sub @ Value::Object(_)) => self.validate_at(sub, value, &child, depth + 1, errors),
                _ => {}
            }
        }
    }

    fn validate_array(
        &self,
        schema: &Map<String, Value>,
        items: &[Value],
        path: &str,
        depth: usize,
        errors: &mut Vec<String>,
    ) {
        if let Some(min) = schema.get("minItems").and_then(Value::as_u64) {
            if (items.len() as u64) < min {
                errors.push(format!(
                    "{}: array has {} items, minimum is {}",
                    display(path),
                    items.len(),
                    min
                ));
            }
        }
        if let Some(max) = schema.get("maxItems").and_then(Value::as_u64) {
            if (items.len() as u64) > max {
                errors.push(format!(
                    "{}: array has {} items, maximum is {}",
                    display(path),
                    items.len(),
                    max
                ));
            }
        }
        if schema.get("uniqueItems").and_then(Value::as_bool) == Some(true) {
            for (i, item) in items.iter().enumerate() {
                if items[..i].iter().any(|other| json_equal(other, item)) {
                    errors.push(format!("{}: array items are not unique", display(path)));
                    break;
                }
            }
        }
        match schema.get("items") {
            Some(Value::Array(tuple)) => {
                for (i, item) in items.iter().enumerate() {
                    let child = format!("{}/{}", path, i);
                    if let Some(sub) = tuple.get(i).or_else(|| schema.get("additionalItems")) {
                        self.validate_at(sub, item, &child, depth + 1, errors);
                    }
                }
            }
            Some(item_schema) => {
                for (i, item) in items.iter().enumerate() {
                    self.validate_at(item_schema, item, &format!("{}/{}", path, i), depth + 1, errors);
                }
            }
            None => {}
        }
        if let Some(contains) = schema.get("contains") {
            if !items.iter().any(|item| self.passes(contains, item, path, depth)) {
                errors.push(format!(
                    "{}: array does not contain an item matching contains",
                    display(path)
                ));
            }
        }
    }

    fn validate_string(
        &self,
        schema: &Map<String, Value>,
        text: &str,
        path: &str,
        errors: &mut Vec<String>,
    ) {
        let length = text.chars().count() as u64;
        if let Some(min) = schema.get("minLength").and_then(Value::as_u64) {
            if length < min {
                errors.push(format!(
                    "{}: string \"{}\" is shorter than {} characters",
                    display(path),
                    text,
                    min
                ));
            }
        }
        if let Some(max) = schema.get("maxLength").and_then(Value::as_u64) {
            if length > max {
                errors.push(format!(
                    "{}: string \"{}\" is longer than {} characters",
                    display(path),
                    text,
                    max
                ));
            }
        }
        if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
            // Patterns are compiled during `compile`, so a miss here means none was present.
            if let Some(re) = self.patterns.get(pattern) {
                if !re.is_match(text) {
                    errors.push(format!(
                        "{}: string \"{}\" does not match pattern \"{}\"",
                        display(path),
                        text,
                        pattern
                    ));
                }
            }
        }
    }
}

fn validate_number(schema: &Map<String, Value>, instance: &Value, path: &str, errors: &mut Vec<String>) {
    let Some(n) = instance.as_f64() else {
        return;
    };
    let bound = |key: &str| schema.get(key).and_then(Value::as_f64);
    if let Some(min) = bound("minimum") {
        if n < min {
            errors.push(format!("{}: {} is less than minimum {}", display(path), n, min));
        }
    }
    if let Some(max) = bound("maximum") {
        if n > max {
            errors.push(format!("{}: {} is greater than maximum {}", display(path), n, max));
        }
    }
    if let Some(min) = bound("exclusiveMinimum") {
        if n <= min {
            errors.push(format!(
                "{}: {} is not greater than exclusive minimum {}",
                display(path),
                n,
                min
            ));
        }
    }
    if let Some(max) = bound("exclusiveMaximum") {
        if n >= max {
            errors.push(format!(
                "{}: {} is not less than exclusive maximum {}",
                display(path),
                n,
                max
            ));
        }
    }
    if let Some(divisor) = bound("multipleOf") {
        if divisor > 0.0 {
            let quotient = n / divisor;
            if (quotient - quotient.round()).abs() > 1e-9 {
                errors.push(format!("{}: {} is not a multiple of {}", display(path), n, divisor));
            }
        }
    }
}

fn check_schema(
    root: &Value,
    schema: &Value,
    patterns: &mut HashMap<String, Regex>,
) -> Result<(), SchemaError> {
    let schema = match schema {
        Value::Bool(_) => return Ok(()),
        Value::Object(schema) => schema,
        other => return Err(SchemaError::NotAnObject(other.to_string())),
    };

    if let Some(keyword) = schema
        .keys()
        .find(|k| !VALIDATION_KEYWORDS.contains(&k.as_str()) && !ANNOTATION_KEYWORDS.contains(&k.as_str()))
    {
        return Err(SchemaError::Unsupported(keyword.clone()));
    }

    if let Some(t) = schema.get("type") {
        let names: Vec<&Value> = match t {
            Value::Array(ts) => ts.iter().collect(),
            other => vec![other],
        };
        for name in names {
            match name.as_str() {
                Some(n) if TYPES.contains(&n) => {}
                _ => return Err(SchemaError::UnknownType(name.to_string().trim_matches('"').to_string())),
            }
        }
    }

    if let Some(reference) = schema.get("$ref") {
        let resolved = reference.as_str().and_then(|r| resolve(root, r));
        if resolved.is_none() {
            return Err(SchemaError::UnresolvedRef(
                reference.to_string().trim_matches('"').to_string(),
            ));
        }
    }

    if let Some(pattern) = schema.get("pattern").and_then(Value::as_str) {
        compile_pattern(pattern, patterns)?;
    }
    if let Some(Value::Object(pattern_properties)) = schema.get("patternProperties") {
        for (pattern, sub) in pattern_properties {
            compile_pattern(pattern, patterns)?;
            check_schema(root, sub, patterns)?;
        }
    }

    for key in [
        "items", "additionalItems", "additionalProperties", "not", "contains",
        "propertyNames", "if", "then", "else",
    ] {
        match schema.get(key) {
            Some(sub @ (Value::Object(_) | Value::Bool(_))) => check_schema(root, sub, patterns)?,
            Some(Value::Array(subs)) if key == "items" => {
                for sub in subs {
                    check_schema(root, sub, patterns)?;
                }
            }
            _ => {}
        }
    }
    for key in ["properties", "definitions", "$defs", "dependencies"] {
        if let Some(Value::Object(subs)) = schema.get(key) {
            for sub in subs.values().filter(|s| !s.is_array()) {
                check_schema(root, sub, patterns)?;
            }
        }
    }
    for key in ["allOf", "anyOf", "oneOf"] {
        if let Some(Value::Array(subs)) = schema.get(key) {
            for sub in subs {
                check_schema(root, sub, patterns)?;
            }
        }
    }
    Ok(())
}

fn compile_pattern(pattern: &str, patterns: &mut HashMap<String, Regex>) -> Result<(), SchemaError> {
    if !patterns.contains_key(pattern) {
        let re = Regex::new(pattern).map_err(|source| SchemaError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        patterns.insert(pattern.to_string(), re);
    }
    Ok(())
}

/// Resolve a same-document reference such as `#/definitions/id`.
fn resolve<'a>(root: &'a Value, reference: &str) -> Option<&'a Value> {
    let pointer = reference.strip_prefix('#')?;
    let pointer = urlencoding::decode(pointer).ok()?;
    root.pointer(&pointer)
}

fn is_type(instance: &Value, name: &str) -> bool {
    match name {
        "null" => instance.is_null(),
        "boolean" => instance.is_boolean(),
        "object" => instance.is_object(),
        "array" => instance.is_array(),
        "string" => instance.is_string(),
        "number" => instance.is_number(),
        "integer" => match instance {
            Value::Number(n) => {
                n.is_i64() || n.is_u64() || n.as_f64().map(|f| f.fract() == 0.0).unwrap_or(false)
            }
            _ => false,
        },
        _ => false,
    }
}

fn type_name(instance: &Value) -> &'static str {
    match instance {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Object(_) => "object",
        Value::Array(_) => "array",
        Value::String(_) => "string",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
    }
}

fn display(path: &str) -> &str {
    if path.is_empty() {
        "/"
    } else {
        path
    }
}

/// JSON equality where numbers compare by value (`1` equals `1.0`).
pub(crate) fn json_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => match (x.as_f64(), y.as_f64()) {
            (Some(x), Some(y)) => x == y,
            _ => x == y,
        },
        (Value::Array(xs), Value::Array(ys)) => {
            xs.len() == ys.len() && xs.iter().zip(ys).all(|(x, y)| json_equal(x, y))
        }
        (Value::Object(xs), Value::Object(ys)) => {
            xs.len() == ys.len()
                && xs
                    .iter()
                    .all(|(k, x)| ys.get(k).map(|y| json_equal(x, y)).unwrap_or(false))
        }
        _ => a == b,
    }
}
