use super::{MemeResponse, TextPosition};
use serde::{Deserialize, Serialize};

/// Parsed body of an image-generation reply, before the image fields are
/// reconciled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageServiceReply {
    pub success: bool,
    pub image_url: Option<String>,
    pub image_data: Option<String>,
    pub error: Option<String>,
}

/// The image half of an [`ImageGenResult`].
///
/// Holding one variant means "both absent" cannot be represented past the
/// image client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageReference {
    Url(String),
    Data(String),
}

impl ImageReference {
    /// Picks the URL when present, otherwise the embedded data. Blank strings
    /// count as absent.
    pub fn from_parts(image_url: Option<String>, image_data: Option<String>) -> Option<Self> {
        let present = |value: Option<String>| value.filter(|v| !v.trim().is_empty());

        present(image_url)
            .map(ImageReference::Url)
            .or_else(|| present(image_data).map(ImageReference::Data))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageGenResult {
    pub image: ImageReference,
    pub caption: String,
    pub text_position: TextPosition,
}

impl From<MemeResponse> for ImageGenResult {
    fn from(response: MemeResponse) -> Self {
        Self {
            image: ImageReference::Url(response.image_url),
            caption: response.caption,
            text_position: response.text_position,
        }
    }
}
