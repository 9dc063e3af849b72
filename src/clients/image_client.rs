use crate::{
    clients::{endpoint::UpstreamEndpoint, traits::ImageGenerator},
    config::ImageGenerationConfig,
    error::{MemeError, Result},
    models::{ImageGenResult, ImageReference, TextGenPayload, UpstreamService},
    schema,
};
use async_trait::async_trait;

const SERVICE: UpstreamService = UpstreamService::ImageGeneration;

#[derive(Clone)]
pub struct ImageClient {
    endpoint: UpstreamEndpoint,
}

impl ImageClient {
    pub fn new(config: &ImageGenerationConfig) -> Result<Self> {
        let endpoint = UpstreamEndpoint::new(
            SERVICE,
            config.api_url.as_deref(),
            config.auth.clone(),
            config.timeout,
        )?;
        Ok(Self { endpoint })
    }
}

#[async_trait]
impl ImageGenerator for ImageClient {
    /// Sends the concept verbatim and reconciles `imageUrl`/`imageData`.
    async fn request_image(&self, payload: &TextGenPayload) -> Result<ImageGenResult> {
        let reply = self.endpoint.post_json(payload).await?;

        let parsed = schema::validate_image_reply(&reply.body).map_err(|violation| {
            log::error!("Image reply rejected: {}", violation);
            MemeError::schema(SERVICE, violation)
        })?;

        if !parsed.success {
            let message = parsed
                .error
                .unwrap_or_else(|| "image generation reported failure".to_string());
            log::error!("Image generation failed: {}", message);
            return Err(MemeError::upstream(SERVICE, reply.status, &message));
        }

        let image = ImageReference::from_parts(parsed.image_url, parsed.image_data)
            .ok_or(MemeError::MissingImageData { service: SERVICE })?;

        match &image {
            ImageReference::Url(url) => log::info!("Image received as URL: {}", url),
            ImageReference::Data(data) => log::info!("Image received inline ({} chars)", data.len()),
        }

        Ok(ImageGenResult {
            image,
            caption: payload.caption.clone(),
            text_position: payload.text_position,
        })
    }
}
