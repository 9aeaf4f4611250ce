//! Narrative generation service port.
//!
//! The generation service is an external, unreliable collaborator. Callers
//! in the story-arc context treat every error from this port as recoverable
//! and substitute a deterministic fallback.

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The kind of content requested from the generator. The expected shape of
/// `GenerationResponse::content` depends on this tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationTask {
    /// A JSON array of story beat suggestion objects.
    StoryBeatSuggestions,
    /// A JSON object keyed by improvement category, each a list of strings.
    StoryImprovements,
    /// A JSON object with `issues`, `warnings` and `suggestions` lists.
    CoherenceAnalysis,
}

impl GenerationTask {
    /// Returns the wire tag for this task.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::StoryBeatSuggestions => "story_beat_suggestions",
            Self::StoryImprovements => "story_improvements",
            Self::CoherenceAnalysis => "coherence_analysis",
        }
    }
}

impl fmt::Display for GenerationTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request to the narrative generation service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    /// The full prompt text.
    pub prompt: String,
    /// What kind of content is being requested.
    pub task: GenerationTask,
    /// Sampling temperature.
    pub temperature: f32,
}

impl GenerationRequest {
    /// Creates a new request.
    #[must_use]
    pub fn new(prompt: impl Into<String>, task: GenerationTask, temperature: f32) -> Self {
        Self {
            prompt: prompt.into(),
            task,
            temperature,
        }
    }
}

/// A response from the narrative generation service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    /// Whether the service reports success.
    pub success: bool,
    /// Raw generated text, expected to contain a JSON document.
    pub content: String,
}

/// Errors from the narrative generation service or from parsing its output.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// The request could not be completed.
    #[error("generation request failed: {0}")]
    RequestFailed(String),

    /// The service answered but reported failure.
    #[error("generation service reported an unsuccessful response")]
    Unsuccessful,

    /// The caller's deadline elapsed before the service answered.
    #[error("generation request timed out after {0:?}")]
    Timeout(Duration),

    /// The response content did not have the shape the task expects.
    #[error("generated content could not be parsed: {0}")]
    Parse(String),
}

impl GenerationError {
    /// Returns `true` for parse failures, as opposed to service failures.
    #[must_use]
    pub fn is_parse_failure(&self) -> bool {
        matches!(self, Self::Parse(_))
    }
}

/// Port to the external narrative generation service.
#[async_trait]
pub trait NarrativeGenerator: Send + Sync {
    /// Send one generation request.
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError>;
}
