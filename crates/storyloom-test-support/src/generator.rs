//! Test generators — mock `NarrativeGenerator` implementations for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use storyloom_core::generation::{
    GenerationError, GenerationRequest, GenerationResponse, NarrativeGenerator,
};

/// A generator that replays scripted results in order and records every
/// request it receives. Once the script is exhausted it repeats the
/// fallback content if one was given, otherwise it fails.
#[derive(Debug, Default)]
pub struct ScriptedGenerator {
    script: Mutex<VecDeque<Result<GenerationResponse, GenerationError>>>,
    repeat: Option<GenerationResponse>,
    requests: Mutex<Vec<GenerationRequest>>,
}

impl ScriptedGenerator {
    /// Create a generator that replays `script` once, in order.
    #[must_use]
    pub fn new(script: Vec<Result<GenerationResponse, GenerationError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Self::default()
        }
    }

    /// Create a generator that answers every request successfully with
    /// `content`.
    #[must_use]
    pub fn replying(content: impl Into<String>) -> Self {
        Self {
            repeat: Some(GenerationResponse {
                success: true,
                content: content.into(),
            }),
            ..Self::default()
        }
    }

    /// Create a generator whose every response reports `success: false`.
    #[must_use]
    pub fn unsuccessful() -> Self {
        Self {
            repeat: Some(GenerationResponse {
                success: false,
                content: String::new(),
            }),
            ..Self::default()
        }
    }

    /// Returns a snapshot of every request received.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<GenerationRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl NarrativeGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        self.requests.lock().unwrap().push(request);
        if let Some(next) = self.script.lock().unwrap().pop_front() {
            return next;
        }
        self.repeat
            .clone()
            .ok_or_else(|| GenerationError::RequestFailed("script exhausted".into()))
    }
}

/// A generator that always fails as if the service were unreachable.
#[derive(Debug)]
pub struct FailingGenerator;

#[async_trait]
impl NarrativeGenerator for FailingGenerator {
    async fn generate(
        &self,
        _request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        Err(GenerationError::RequestFailed("connection refused".into()))
    }
}

/// A generator that waits before answering. Used to exercise timeouts.
#[derive(Debug)]
pub struct SlowGenerator {
    /// How long to wait before replying.
    pub delay: Duration,
    /// The content eventually returned.
    pub content: String,
}

#[async_trait]
impl NarrativeGenerator for SlowGenerator {
    async fn generate(
        &self,
        _request: GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        tokio::time::sleep(self.delay).await;
        Ok(GenerationResponse {
            success: true,
            content: self.content.clone(),
        })
    }
}
