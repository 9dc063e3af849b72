use crate::{
    clients::{ConceptGenerator, ImageClient, ImageGenerator, TextClient},
    config::Config,
    error::{MemeError, Result},
    logger,
    models::MemeResponse,
    normalize::normalize,
    schema,
};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Where a single generation request currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PipelineStage {
    Idle,
    ValidatingRequest,
    RequestingConcept,
    RequestingImage,
    Normalizing,
    Done,
    Failed,
}

impl PipelineStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Idle => "Idle",
            PipelineStage::ValidatingRequest => "ValidatingRequest",
            PipelineStage::RequestingConcept => "RequestingConcept",
            PipelineStage::RequestingImage => "RequestingImage",
            PipelineStage::Normalizing => "Normalizing",
            PipelineStage::Done => "Done",
            PipelineStage::Failed => "Failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineStage::Done | PipelineStage::Failed)
    }

    fn successor(&self) -> Option<PipelineStage> {
        match self {
            PipelineStage::Idle => Some(PipelineStage::ValidatingRequest),
            PipelineStage::ValidatingRequest => Some(PipelineStage::RequestingConcept),
            PipelineStage::RequestingConcept => Some(PipelineStage::RequestingImage),
            PipelineStage::RequestingImage => Some(PipelineStage::Normalizing),
            PipelineStage::Normalizing => Some(PipelineStage::Done),
            PipelineStage::Done | PipelineStage::Failed => None,
        }
    }

    /// Forward by exactly one stage, or into `Failed` from any non-terminal stage.
    pub fn can_advance_to(&self, next: PipelineStage) -> bool {
        if next == PipelineStage::Failed {
            return !self.is_terminal();
        }
        self.successor() == Some(next)
    }
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-request state. Stages only ever move forward.
#[derive(Debug)]
pub struct Pipeline {
    request_id: String,
    stage: PipelineStage,
    trace: Vec<PipelineStage>,
    started: Instant,
}

impl Pipeline {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            stage: PipelineStage::Idle,
            trace: vec![PipelineStage::Idle],
            started: Instant::now(),
        }
    }

    pub fn stage(&self) -> PipelineStage {
        self.stage
    }

    pub fn trace(&self) -> &[PipelineStage] {
        &self.trace
    }

    pub fn advance(&mut self, next: PipelineStage) -> Result<()> {
        if !self.stage.can_advance_to(next) {
            return Err(MemeError::Internal(format!(
                "illegal pipeline transition {} -> {}",
                self.stage, next
            )));
        }

        log::debug!("stage {} -> {}", self.stage, next);
        self.stage = next;
        self.trace.push(next);
        Ok(())
    }

    /// Records the failure. A no-op once the pipeline is terminal.
    pub fn fail(&mut self, error: &MemeError) {
        let failed_at = self.stage;
        if self.advance(PipelineStage::Failed).is_ok() {
            log::warn!(
                "Request {} failed during {} after {}ms: {}",
                self.request_id,
                failed_at,
                self.started.elapsed().as_millis(),
                error
            );
        }
    }
}

/// Runs the validate, concept, image, normalize sequence for one request at a
/// time. Cheap to clone; holds no per-request state.
#[derive(Clone)]
pub struct Orchestrator {
    concepts: Arc<dyn ConceptGenerator>,
    images: Arc<dyn ImageGenerator>,
}

impl Orchestrator {
    pub fn new(concepts: Arc<dyn ConceptGenerator>, images: Arc<dyn ImageGenerator>) -> Self {
        Self { concepts, images }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let text = TextClient::new(&config.text_generation)?;
        let image = ImageClient::new(&config.image_generation)?;
        Ok(Self::new(Arc::new(text), Arc::new(image)))
    }

    pub async fn generate(&self, request_id: &str, body: &[u8]) -> Result<MemeResponse> {
        let mut pipeline = Pipeline::new(request_id);
        match self.run(&mut pipeline, body).await {
            Ok(response) => {
                log::info!(
                    "Request {} completed in {}ms",
                    request_id,
                    pipeline.started.elapsed().as_millis()
                );
                Ok(response)
            }
            Err(error) => {
                pipeline.fail(&error);
                Err(error)
            }
        }
    }

    pub async fn run(&self, pipeline: &mut Pipeline, body: &[u8]) -> Result<MemeResponse> {
        pipeline.advance(PipelineStage::ValidatingRequest)?;
        let request = schema::parse_json(body)
            .and_then(|value| schema::validate_request(&value))
            .map_err(MemeError::Validation)?;

        pipeline.advance(PipelineStage::RequestingConcept)?;
        let concept = {
            let _timer = logger::timer("text generation");
            self.concepts.request_concept(&request.description).await?
        };

        pipeline.advance(PipelineStage::RequestingImage)?;
        let image = {
            let _timer = logger::timer("image generation");
            self.images.request_image(&concept).await?
        };

        pipeline.advance(PipelineStage::Normalizing)?;
        let response = normalize(image);

        pipeline.advance(PipelineStage::Done)?;
        Ok(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        ImageGenResult, ImageReference, TextGenPayload, TextPosition, UpstreamService,
    };
    use crate::schema::SchemaViolation;
    use async_trait::async_trait;
    use std::sync::Mutex;

    type CallLog = Arc<Mutex<Vec<&'static str>>>;

    struct FakeConcepts {
        calls: CallLog,
        fail: bool,
    }

    #[async_trait]
    impl ConceptGenerator for FakeConcepts {
        async fn request_concept(&self, description: &str) -> Result<TextGenPayload> {
            self.calls.lock().unwrap().push("concept");
            if self.fail {
                return Err(MemeError::schema(
                    UpstreamService::TextGeneration,
                    SchemaViolation::unexpected("mood"),
                ));
            }
            Ok(TextGenPayload {
                image_prompt: format!("illustrate: {}", description),
                negative_prompt: "text".into(),
                caption: "When the AI knows you need coffee before you do".into(),
                text_position: TextPosition::Top,
            })
        }
    }

    struct FakeImages {
        calls: CallLog,
        image: ImageReference,
    }

    #[async_trait]
    impl ImageGenerator for FakeImages {
        async fn request_image(&self, payload: &TextGenPayload) -> Result<ImageGenResult> {
            self.calls.lock().unwrap().push("image");
            Ok(ImageGenResult {
                image: self.image.clone(),
                caption: payload.caption.clone(),
                text_position: payload.text_position,
            })
        }
    }

    fn orchestrator(fail_concept: bool, image: ImageReference) -> (Orchestrator, CallLog) {
        let calls: CallLog = Arc::new(Mutex::new(Vec::new()));
        let orchestrator = Orchestrator::new(
            Arc::new(FakeConcepts {
                calls: calls.clone(),
                fail: fail_concept,
            }),
            Arc::new(FakeImages {
                calls: calls.clone(),
                image,
            }),
        );
        (orchestrator, calls)
    }

    const BODY: &[u8] = br#"{"description": "A coffee shop that uses AI to predict your order"}"#;

    #[tokio::test]
    async fn test_happy_path_order_and_trace() {
        let (orchestrator, calls) =
            orchestrator(false, ImageReference::Url("https://cdn.example/a.png".into()));
        let mut pipeline = Pipeline::new("req-1");

        let response = orchestrator.run(&mut pipeline, BODY).await.unwrap();
        assert_eq!(response.image_url, "https://cdn.example/a.png");
        assert_eq!(response.caption, "When the AI knows you need coffee before you do");
        assert_eq!(response.text_position, TextPosition::Top);

        assert_eq!(*calls.lock().unwrap(), vec!["concept", "image"]);
        assert_eq!(
            pipeline.trace(),
            &[
                PipelineStage::Idle,
                PipelineStage::ValidatingRequest,
                PipelineStage::RequestingConcept,
                PipelineStage::RequestingImage,
                PipelineStage::Normalizing,
                PipelineStage::Done,
            ]
        );
    }

    #[tokio::test]
    async fn test_inline_data_is_normalized() {
        let (orchestrator, _) = orchestrator(false, ImageReference::Data("iVBORw0KG...".into()));
        let response = orchestrator.generate("req-2", BODY).await.unwrap();
        assert_eq!(response.image_url, "data:image/png;base64,iVBORw0KG...");
    }

    #[tokio::test]
    async fn test_invalid_request_makes_no_calls() {
        let (orchestrator, calls) = orchestrator(false, ImageReference::Url("u".into()));
        let mut pipeline = Pipeline::new("req-3");

        let err = orchestrator
            .run(&mut pipeline, br#"{"description": "short"}"#)
            .await
            .unwrap_err();
        assert_eq!(err.code(), "validation_error");
        assert!(calls.lock().unwrap().is_empty());

        pipeline.fail(&err);
        assert_eq!(pipeline.stage(), PipelineStage::Failed);
        assert_eq!(
            pipeline.trace(),
            &[PipelineStage::Idle, PipelineStage::ValidatingRequest, PipelineStage::Failed]
        );
    }

    #[tokio::test]
    async fn test_malformed_body_is_validation_error() {
        let (orchestrator, calls) = orchestrator(false, ImageReference::Url("u".into()));
        let err = orchestrator.generate("req-4", b"{not json").await.unwrap_err();
        assert!(matches!(err, MemeError::Validation(_)));
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_concept_failure_skips_image() {
        let (orchestrator, calls) = orchestrator(true, ImageReference::Url("u".into()));
        let mut pipeline = Pipeline::new("req-5");

        let err = orchestrator.run(&mut pipeline, BODY).await.unwrap_err();
        assert_eq!(err.service(), Some(UpstreamService::TextGeneration));
        assert_eq!(*calls.lock().unwrap(), vec!["concept"]);
        assert_eq!(pipeline.stage(), PipelineStage::RequestingConcept);
    }

    #[test]
    fn test_transitions_only_move_forward() {
        let mut pipeline = Pipeline::new("req-6");
        assert!(pipeline.advance(PipelineStage::RequestingConcept).is_err());
        pipeline.advance(PipelineStage::ValidatingRequest).unwrap();
        assert!(pipeline.advance(PipelineStage::Idle).is_err());
        assert!(pipeline.advance(PipelineStage::ValidatingRequest).is_err());
        assert_eq!(pipeline.stage(), PipelineStage::ValidatingRequest);
    }

    #[test]
    fn test_terminal_stages() {
        assert!(PipelineStage::Done.is_terminal());
        assert!(PipelineStage::Failed.is_terminal());
        assert!(!PipelineStage::Done.can_advance_to(PipelineStage::Failed));
        assert!(!PipelineStage::Failed.can_advance_to(PipelineStage::Failed));
    }

    #[test]
    fn test_every_live_stage_can_fail() {
        for stage in [
            PipelineStage::Idle,
            PipelineStage::ValidatingRequest,
            PipelineStage::RequestingConcept,
            PipelineStage::RequestingImage,
            PipelineStage::Normalizing,
        ] {
            assert!(stage.can_advance_to(PipelineStage::Failed), "{} cannot fail", stage);
        }

        let mut pipeline = Pipeline::new("req-7");
        pipeline.fail(&MemeError::Internal("boom".into()));
        assert_eq!(pipeline.trace(), &[PipelineStage::Idle, PipelineStage::Failed]);

        pipeline.fail(&MemeError::Internal("again".into()));
        assert_eq!(pipeline.trace().len(), 2);
    }
}
