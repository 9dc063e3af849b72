use crate::{
    error::Result,
    models::{ImageGenResult, TextGenPayload},
};
use async_trait::async_trait;

/// Turns a user description into a meme concept.
#[async_trait]
pub trait ConceptGenerator: Send + Sync {
    async fn request_concept(&self, description: &str) -> Result<TextGenPayload>;
}

/// Renders a concept into an image reference. Caption and text position are
/// carried through from the concept unchanged.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn request_image(&self, payload: &TextGenPayload) -> Result<ImageGenResult>;
}
