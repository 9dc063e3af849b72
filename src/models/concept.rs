use super::TextPosition;
use serde::Serialize;

/// Meme concept produced by the text-generation service.
///
/// Only built by `schema::validate_concept`. Serialized, it is the exact body
/// forwarded to the image-generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TextGenPayload {
    pub image_prompt: String,
    pub negative_prompt: String,
    pub caption: String,
    pub text_position: TextPosition,
}

/// Outbound body sent to the text-generation service.
#[derive(Debug, Clone, Serialize)]
pub struct ConceptRequest<'a> {
    pub description: &'a str,
    pub prompt: String,
}
