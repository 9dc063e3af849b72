pub mod clients;
pub mod config;
pub mod error;
pub mod logger;
pub mod models;
pub mod normalize;
pub mod orchestrator;
pub mod schema;
pub mod server;

#[cfg(test)]
pub(crate) mod test_support;

pub use clients::{ConceptGenerator, ImageClient, ImageGenerator, TextClient};
pub use config::{Config, ImageGenerationConfig, ServerConfig, TextGenerationConfig};
pub use error::{MemeError, Result};
pub use models::*;
pub use normalize::normalize;
pub use orchestrator::{Orchestrator, Pipeline, PipelineStage};
