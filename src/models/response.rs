use super::TextPosition;
use serde::{Deserialize, Serialize};

/// Body returned to the caller on success. `image_url` is either a remote
/// URL or a data URI, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemeResponse {
    pub image_url: String,
    pub caption: String,
    pub text_position: TextPosition,
}
