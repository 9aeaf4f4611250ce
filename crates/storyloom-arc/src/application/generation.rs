//! Typed access to the narrative generation service.
//!
//! Every generator task has one payload type implementing
//! [`GeneratedPayload`]. [`request_payload`] sends the request, applies the
//! optional deadline and checks the success flag. The content is parsed into
//! the [`GeneratedContent`] variant for the request's task and then unwrapped
//! into the payload, so callers only ever see a typed value or a
//! `GenerationError`.

use std::time::Duration;

use serde::de::DeserializeOwned;
use storyloom_core::generation::{
    GenerationError, GenerationRequest, GenerationTask, NarrativeGenerator,
};
use tracing::debug;

use super::suggestions::{BeatSuggestionBatch, StoryBeatSuggestion, StoryImprovements};
use super::validation::CoherenceAnalysis;

/// A payload the generator can produce for a specific task.
pub trait GeneratedPayload: Sized {
    /// The task this payload answers.
    const TASK: GenerationTask;

    /// Parses raw generator content into the payload.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::Parse` if the content has the wrong shape.
    fn parse(content: &str) -> Result<Self, GenerationError>;

    /// Takes the payload out of parsed content, or `None` if the content
    /// answers a different task.
    fn from_content(content: GeneratedContent) -> Option<Self>;
}

/// Generator output parsed according to the task it answers.
#[derive(Debug, Clone, PartialEq)]
pub enum GeneratedContent {
    BeatSuggestions(Vec<StoryBeatSuggestion>),
    Improvements(StoryImprovements),
    Coherence(CoherenceAnalysis),
}

impl GeneratedContent {
    /// Parses `content` into the variant for `task`.
    ///
    /// # Errors
    ///
    /// Returns `GenerationError::Parse` if the content does not match the
    /// shape `task` expects.
    pub fn parse(task: GenerationTask, content: &str) -> Result<Self, GenerationError> {
        match task {
            GenerationTask::StoryBeatSuggestions => {
                BeatSuggestionBatch::parse(content).map(|batch| Self::BeatSuggestions(batch.0))
            }
            GenerationTask::StoryImprovements => {
                StoryImprovements::parse(content).map(Self::Improvements)
            }
            GenerationTask::CoherenceAnalysis => {
                CoherenceAnalysis::parse(content).map(Self::Coherence)
            }
        }
    }

    /// The task this content answers.
    #[must_use]
    pub fn task(&self) -> GenerationTask {
        match self {
            Self::BeatSuggestions(_) => GenerationTask::StoryBeatSuggestions,
            Self::Improvements(_) => GenerationTask::StoryImprovements,
            Self::Coherence(_) => GenerationTask::CoherenceAnalysis,
        }
    }
}

/// Sends one request for `P` and parses the answer.
///
/// # Errors
///
/// Returns `GenerationError::Timeout` if `timeout` elapses,
/// `GenerationError::Unsuccessful` if the service reports failure,
/// `GenerationError::Parse` for malformed content, or the generator's own
/// error.
pub async fn request_payload<P: GeneratedPayload>(
    generator: &dyn NarrativeGenerator,
    prompt: String,
    temperature: f32,
    timeout: Option<Duration>,
) -> Result<P, GenerationError> {
    let request = GenerationRequest::new(prompt, P::TASK, temperature);
    debug!(task = %P::TASK, "requesting generated content");

    let response = match timeout {
        Some(limit) => tokio::time::timeout(limit, generator.generate(request))
            .await
            .map_err(|_| GenerationError::Timeout(limit))??,
        None => generator.generate(request).await?,
    };

    if !response.success {
        return Err(GenerationError::Unsuccessful);
    }
    let content = GeneratedContent::parse(P::TASK, &response.content)?;
    let answered = content.task();
    P::from_content(content).ok_or_else(|| {
        GenerationError::Parse(format!(
            "expected {} content, got {answered}",
            P::TASK
        ))
    })
}

/// Deserializes the first JSON document found in `content`.
///
/// # Errors
///
/// Returns `GenerationError::Parse` if no document matches `T`.
pub fn parse_json<T: DeserializeOwned>(content: &str) -> Result<T, GenerationError> {
    let json = extract_json(content);
    serde_json::from_str(json).map_err(|e| GenerationError::Parse(e.to_string()))
}

/// Extracts a JSON document from text that may wrap it in a Markdown code
/// fence or surround it with prose.
pub(crate) fn extract_json(content: &str) -> &str {
    let trimmed = content.trim();

    if let Some(start) = trimmed.find("```") {
        let after_fence = &trimmed[start + 3..];
        if let Some(end) = after_fence.find("```") {
            let block = after_fence[..end].trim();
            // Drop a language tag such as `json` on the fence line.
            return match block.find(['{', '[']) {
                Some(pos) => block[pos..].trim(),
                None => block,
            };
        }
    }

    let open = trimmed.find(['{', '[']);
    let close = trimmed.rfind(['}', ']']);
    match (open, close) {
        (Some(open), Some(close)) if close > open => &trimmed[open..=close],
        _ => trimmed,
    }
}
