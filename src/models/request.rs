use serde::{Deserialize, Serialize};

/// Inbound `/generate` body after validation. The description is trimmed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub description: String,
}
