use crate::models::{ImageGenResult, ImageReference, MemeResponse};

/// Embedded image data without a scheme is assumed to be PNG.
pub const DEFAULT_IMAGE_MIME: &str = "image/png";

/// Collapses the image half of `result` into the single display-ready
/// reference returned to callers.
pub fn normalize(result: ImageGenResult) -> MemeResponse {
    let image_url = match result.image {
        ImageReference::Url(url) => url,
        ImageReference::Data(data) => into_data_uri(data),
    };

    MemeResponse {
        image_url,
        caption: result.caption,
        text_position: result.text_position,
    }
}

fn into_data_uri(data: String) -> String {
    if has_uri_scheme(&data) {
        return data;
    }
    format!("data:{};base64,{}", DEFAULT_IMAGE_MIME, data)
}

/// True when `value` starts with an RFC 3986 scheme followed by `:`, e.g.
/// `data:` or `https:`. Base64 text never contains `:`.
pub fn has_uri_scheme(value: &str) -> bool {
    let Some((scheme, _)) = value.split_once(':') else {
        return false;
    };
    let mut chars = scheme.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() => {
            chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}
