//! Response schema model.
//!
//! A [`Schema`] is sent to the provider as the requested response shape
//! (serialized in the OpenAPI subset Gemini accepts) and is then used to
//! validate whatever actually came back. Providers are not trusted to honor
//! the schema they were given.

use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

use coursegen_utils::error::SchemaError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SchemaType {
    Object,
    Array,
    String,
    Integer,
    Boolean,
}

/// Declared shape of a JSON value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Schema {
    #[serde(rename = "type")]
    pub kind: SchemaType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Schema>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub property_ordering: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub required: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<Schema>>,
}

impl Schema {
    fn of(kind: SchemaType) -> Self {
        Self {
            kind,
            description: None,
            properties: BTreeMap::new(),
            property_ordering: Vec::new(),
            required: Vec::new(),
            items: None,
        }
    }

    #[must_use]
    pub fn object() -> Self {
        Self::of(SchemaType::Object)
    }

    #[must_use]
    pub fn string() -> Self {
        Self::of(SchemaType::String)
    }

    #[must_use]
    pub fn integer() -> Self {
        Self::of(SchemaType::Integer)
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::of(SchemaType::Boolean)
    }

    #[must_use]
    pub fn array(items: Schema) -> Self {
        Self {
            items: Some(Box::new(items)),
            ..Self::of(SchemaType::Array)
        }
    }

    /// Attach a description that the provider sees as guidance.
    #[must_use]
    pub fn describe(mut self, text: impl Into<String>) -> Self {
        self.description = Some(text.into());
        self
    }

    /// Add a required property.
    #[must_use]
    pub fn field(mut self, name: &str, schema: Schema) -> Self {
        self.required.push(name.to_string());
        self.optional(name, schema)
    }

    /// Add a property that may be absent or null.
    #[must_use]
    pub fn optional(mut self, name: &str, schema: Schema) -> Self {
        self.property_ordering.push(name.to_string());
        self.properties.insert(name.to_string(), schema);
        self
    }

    /// Serialize to the wire form expected in `responseSchema`.
    #[must_use]
    pub fn to_json(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }

    /// Check `value` against this schema.
    ///
    /// Required properties must be present and non-null; properties not
    /// declared here are ignored.
    ///
    /// # Errors
    ///
    /// Returns the first `SchemaError` found, with a dotted path to the
    /// offending field.
    pub fn validate(&self, value: &Value) -> Result<(), SchemaError> {
        self.validate_at("", value)
    }

    fn validate_at(&self, path: &str, value: &Value) -> Result<(), SchemaError> {
        let type_ok = match self.kind {
            SchemaType::Object => value.is_object(),
            SchemaType::Array => value.is_array(),
            SchemaType::String => value.is_string(),
            SchemaType::Boolean => value.is_boolean(),
            SchemaType::Integer => is_integral(value),
        };
        if !type_ok {
            return Err(SchemaError::WrongType {
                path: display_path(path),
                expected: expected_name(self.kind).to_string(),
                found: json_type_name(value).to_string(),
            });
        }

        match (self.kind, value) {
            (SchemaType::Object, Value::Object(map)) => {
                for name in &self.required {
                    if map.get(name).is_none_or(Value::is_null) {
                        return Err(SchemaError::MissingField {
                            path: join(path, name),
                        });
                    }
                }
                for (name, schema) in &self.properties {
                    match map.get(name) {
                        Some(Value::Null) | None => {}
                        Some(child) => schema.validate_at(&join(path, name), child)?,
                    }
                }
            }
            (SchemaType::Array, Value::Array(elements)) => {
                if let Some(items) = &self.items {
                    for (i, element) in elements.iter().enumerate() {
                        items.validate_at(&format!("{}[{i}]", display_path(path)), element)?;
                    }
                }
            }
            _ => {}
        }
        Ok(())
    }
}

/// Parse raw provider text into a JSON value.
///
/// Surrounding whitespace and a Markdown code fence (```` ```json ````) are
/// tolerated. A blank payload or a bare `null` counts as empty.
///
/// # Errors
///
/// `SchemaError::EmptyPayload` or `SchemaError::InvalidJson`.
pub fn parse_payload(raw: &str) -> Result<Value, SchemaError> {
    let body = strip_code_fence(raw);
    if body.is_empty() {
        return Err(SchemaError::EmptyPayload);
    }
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Null) => Err(SchemaError::EmptyPayload),
        Ok(value) => Ok(value),
        Err(e) => Err(SchemaError::InvalidJson(e.to_string())),
    }
}

/// Remove a surrounding Markdown code fence, if any, and trim.
#[must_use]
pub fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening line.
    let rest = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest.trim_start_matches(|c: char| c.is_ascii_alphabetic()),
    };
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

fn is_integral(value: &Value) -> bool {
    match value {
        Value::Number(n) => {
            n.is_i64() || n.is_u64() || n.as_f64().is_some_and(|f| f.fract() == 0.0)
        }
        _ => false,
    }
}

fn join(path: &str, name: &str) -> String {
    if path.is_empty() {
        name.to_string()
    } else {
        format!("{path}.{name}")
    }
}

fn display_path(path: &str) -> String {
    if path.is_empty() {
        "$".to_string()
    } else {
        path.to_string()
    }
}

fn expected_name(kind: SchemaType) -> &'static str {
    match kind {
        SchemaType::Object => "an object",
        SchemaType::Array => "an array",
        SchemaType::String => "a string",
        SchemaType::Integer => "an integer",
        SchemaType::Boolean => "a boolean",
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
