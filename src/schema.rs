//! Shape checks for the JSON crossing the process boundary.
//!
//! Every check is a parse step: it either yields a typed value or a
//! [`SchemaViolation`] naming the offending field. Missing fields are never
//! filled with defaults.

use crate::models::{GenerationRequest, ImageServiceReply, TextGenPayload, TextPosition};
use serde_json::{Map, Value};
use std::fmt;

pub const MIN_DESCRIPTION_CHARS: usize = 10;
pub const MAX_DESCRIPTION_CHARS: usize = 2000;

pub const CONCEPT_FIELDS: [&str; 4] = ["imagePrompt", "negativePrompt", "caption", "textPosition"];

/// Field name used when the document itself, not one of its keys, is wrong.
pub const ROOT: &str = "$";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaViolation {
    pub field: String,
    pub reason: String,
}

impl SchemaViolation {
    pub fn invalid(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn missing(field: impl Into<String>) -> Self {
        Self::invalid(field, "is required")
    }

    pub fn unexpected(field: impl Into<String>) -> Self {
        Self::invalid(field, "is not an allowed field")
    }
}

impl fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "`{}` {}", self.field, self.reason)
    }
}

impl std::error::Error for SchemaViolation {}

pub fn parse_json(bytes: &[u8]) -> Result<Value, SchemaViolation> {
    serde_json::from_slice(bytes)
        .map_err(|e| SchemaViolation::invalid(ROOT, format!("is not valid JSON ({})", e)))
}

/// Inbound `/generate` body. Unknown keys are tolerated; only `description`
/// is read.
pub fn validate_request(value: &Value) -> Result<GenerationRequest, SchemaViolation> {
    let object = as_object(value)?;
    let description = required_str(object, "description")?.trim();
    let length = description.chars().count();

    if length == 0 {
        return Err(SchemaViolation::invalid("description", "must not be empty"));
    }
    if length < MIN_DESCRIPTION_CHARS {
        return Err(SchemaViolation::invalid(
            "description",
            format!("must be at least {} characters", MIN_DESCRIPTION_CHARS),
        ));
    }
    if length > MAX_DESCRIPTION_CHARS {
        return Err(SchemaViolation::invalid(
            "description",
            format!("must be at most {} characters", MAX_DESCRIPTION_CHARS),
        ));
    }

    Ok(GenerationRequest {
        description: description.to_string(),
    })
}

/// Text-generation output: exactly the four concept keys.
pub fn validate_concept(value: &Value) -> Result<TextGenPayload, SchemaViolation> {
    let object = as_object(value)?;
    reject_unknown_keys(object, &CONCEPT_FIELDS)?;

    let image_prompt = non_empty_str(object, "imagePrompt")?;
    let negative_prompt = required_str(object, "negativePrompt")?;
    let caption = non_empty_str(object, "caption")?;
    let text_position = required_str(object, "textPosition")?;
    let text_position = TextPosition::parse(text_position)
        .ok_or_else(|| SchemaViolation::invalid("textPosition", "must be \"top\" or \"bottom\""))?;

    Ok(TextGenPayload {
        image_prompt: image_prompt.to_string(),
        negative_prompt: negative_prompt.to_string(),
        caption: caption.to_string(),
        text_position,
    })
}

/// Accepts the concept object itself or a `{ "reply": "<json>" }` envelope
/// whose string holds the concept object verbatim.
pub fn validate_concept_reply(value: &Value) -> Result<TextGenPayload, SchemaViolation> {
    match value.as_object() {
        Some(object) if object.len() == 1 && object.contains_key("reply") => {
            let reply = required_str(object, "reply")?;
            let inner: Value = serde_json::from_str(reply.trim()).map_err(|_| {
                SchemaViolation::invalid("reply", "must contain a bare JSON object")
            })?;
            validate_concept(&inner)
        }
        _ => validate_concept(value),
    }
}

/// Image-generation output. `success` is mandatory; the image fields may be
/// absent or null. Extra keys are tolerated.
pub fn validate_image_reply(value: &Value) -> Result<ImageServiceReply, SchemaViolation> {
    let object = as_object(value)?;

    let success = match object.get("success") {
        Some(Value::Bool(flag)) => *flag,
        Some(_) => return Err(SchemaViolation::invalid("success", "must be a boolean")),
        None => return Err(SchemaViolation::missing("success")),
    };

    Ok(ImageServiceReply {
        success,
        image_url: optional_str(object, "imageUrl")?,
        image_data: optional_str(object, "imageData")?,
        error: optional_str(object, "error")?,
    })
}

fn as_object(value: &Value) -> Result<&Map<String, Value>, SchemaViolation> {
    value
        .as_object()
        .ok_or_else(|| SchemaViolation::invalid(ROOT, "must be a JSON object"))
}

fn reject_unknown_keys(object: &Map<String, Value>, allowed: &[&str]) -> Result<(), SchemaViolation> {
    match object.keys().find(|key| !allowed.contains(&key.as_str())) {
        Some(key) => Err(SchemaViolation::unexpected(key.as_str())),
        None => Ok(()),
    }
}

fn required_str<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a str, SchemaViolation> {
    match object.get(key) {
        Some(Value::String(value)) => Ok(value.as_str()),
        Some(_) => Err(SchemaViolation::invalid(key, "must be a string")),
        None => Err(SchemaViolation::missing(key)),
    }
}

fn non_empty_str<'a>(object: &'a Map<String, Value>, key: &str) -> Result<&'a str, SchemaViolation> {
    let value = required_str(object, key)?;
    if value.trim().is_empty() {
        return Err(SchemaViolation::invalid(key, "must not be empty"));
    }
    Ok(value)
}

fn optional_str(object: &Map<String, Value>, key: &str) -> Result<Option<String>, SchemaViolation> {
    match object.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.clone())),
        Some(_) => Err(SchemaViolation::invalid(key, "must be a string or null")),
    }
}
