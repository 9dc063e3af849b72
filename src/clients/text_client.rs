use crate::{
    clients::{endpoint::UpstreamEndpoint, traits::ConceptGenerator},
    config::TextGenerationConfig,
    error::{MemeError, Result},
    models::{ConceptRequest, TextGenPayload, UpstreamService},
    schema,
};
use async_trait::async_trait;

const CONCEPT_INSTRUCTIONS: &str = r#"You are an AI meme generator. Create a marketing meme concept for the company or product described below.

Respond with ONLY a JSON object. No markdown, no code fences, no text before or after it.

The object MUST have exactly these keys:
{
  "imagePrompt": "detailed description of the meme image",
  "negativePrompt": "things to avoid in the image",
  "caption": "short, witty caption in English",
  "textPosition": "top" or "bottom"
}

Rules:
1. imagePrompt: a specific, funny, shareable image concept.
2. negativePrompt: what to keep out of the image, e.g. "text, watermarks, blurry, low quality".
3. caption: punchy and memorable.
4. textPosition: "top" or "bottom", whichever suits the image."#;

#[derive(Clone)]
pub struct TextClient {
    endpoint: UpstreamEndpoint,
}

impl TextClient {
    pub fn new(config: &TextGenerationConfig) -> Result<Self> {
        let endpoint = UpstreamEndpoint::new(
            UpstreamService::TextGeneration,
            config.api_url.as_deref(),
            config.auth.clone(),
            config.timeout,
        )?;
        Ok(Self { endpoint })
    }

    pub fn build_prompt(description: &str) -> String {
        format!(
            "{}\n\nCompany/Product Description:\n{}\n\nRespond with ONLY the JSON object:",
            CONCEPT_INSTRUCTIONS, description
        )
    }
}

#[async_trait]
impl ConceptGenerator for TextClient {
    async fn request_concept(&self, description: &str) -> Result<TextGenPayload> {
        let request = ConceptRequest {
            description,
            prompt: Self::build_prompt(description),
        };

        let reply = self.endpoint.post_json(&request).await?;

        let payload = schema::validate_concept_reply(&reply.body).map_err(|violation| {
            log::error!("Concept rejected: {}", violation);
            MemeError::schema(UpstreamService::TextGeneration, violation)
        })?;

        log::info!(
            "Concept received: caption=\"{}\", position={}",
            payload.caption,
            payload.text_position
        );
        log::debug!("Image prompt: {}", payload.image_prompt);

        Ok(payload)
    }
}
