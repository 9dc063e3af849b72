use serde::{Deserialize, Serialize};
use std::fmt;

/// The two external collaborators a generation request passes through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpstreamService {
    TextGeneration,
    ImageGeneration,
}

impl UpstreamService {
    pub fn as_str(&self) -> &'static str {
        match self {
            UpstreamService::TextGeneration => "text-generation",
            UpstreamService::ImageGeneration => "image-generation",
        }
    }

    /// Name of the environment variable holding this service's endpoint.
    pub fn url_variable(&self) -> &'static str {
        match self {
            UpstreamService::TextGeneration => "TEXT_GEN_API_URL",
            UpstreamService::ImageGeneration => "IMAGE_GEN_API_URL",
        }
    }
}

impl fmt::Display for UpstreamService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the caption is drawn on the meme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextPosition {
    Top,
    Bottom,
}

impl TextPosition {
    /// Exact, case-sensitive match against the wire values.
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "top" => Some(TextPosition::Top),
            "bottom" => Some(TextPosition::Bottom),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TextPosition::Top => "top",
            TextPosition::Bottom => "bottom",
        }
    }
}

impl fmt::Display for TextPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_names() {
        assert_eq!(UpstreamService::TextGeneration.as_str(), "text-generation");
        assert_eq!(
            serde_json::to_value(UpstreamService::ImageGeneration).unwrap(),
            serde_json::json!("image-generation")
        );
    }

    #[test]
    fn test_text_position_parse_is_exact() {
        assert_eq!(TextPosition::parse("top"), Some(TextPosition::Top));
        assert_eq!(TextPosition::parse("bottom"), Some(TextPosition::Bottom));
        assert_eq!(TextPosition::parse("Bottom"), None);
        assert_eq!(TextPosition::parse("middle"), None);
    }
}
