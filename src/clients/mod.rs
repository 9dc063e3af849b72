pub mod auth;
mod endpoint;
pub mod image_client;
pub mod text_client;
pub mod traits;

pub use auth::{AuthScheme, SigningCredentials};
pub use endpoint::{UpstreamEndpoint, UpstreamReply, JSON_CONTENT_TYPE};
pub use image_client::ImageClient;
pub use text_client::TextClient;
pub use traits::{ConceptGenerator, ImageGenerator};
