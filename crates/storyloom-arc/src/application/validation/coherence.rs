//! Generator-backed narrative coherence rule.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use storyloom_core::generation::{GenerationError, GenerationTask, NarrativeGenerator};
use tracing::warn;

use super::{ConsistencyRule, Findings, RuleError, RuleOutcome, Severity};
use crate::application::generation::{
    GeneratedContent, GeneratedPayload, parse_json, request_payload,
};
use crate::domain::aggregates::StoryArc;

/// Warning recorded when the generator answers with unusable content.
pub const PARSE_FAILURE_WARNING: &str = "AI analysis response could not be parsed";
/// Warning recorded when the generator call itself fails.
pub const SERVICE_FAILURE_WARNING: &str = "AI analysis failed — using fallback validation";

const COHERENCE_TEMPERATURE: f32 = 0.3;

/// Structured coherence analysis returned by the generator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoherenceAnalysis {
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl GeneratedPayload for CoherenceAnalysis {
    const TASK: GenerationTask = GenerationTask::CoherenceAnalysis;

    fn parse(content: &str) -> Result<Self, GenerationError> {
        parse_json(content)
    }

    fn from_content(content: GeneratedContent) -> Option<Self> {
        match content {
            GeneratedContent::Coherence(analysis) => Some(analysis),
            _ => None,
        }
    }
}

/// Asks the generator to judge narrative coherence. Generator problems are
/// downgraded to a single warning, so this rule never fails on its own.
#[derive(Clone)]
pub struct NarrativeCoherenceRule {
    generator: Arc<dyn NarrativeGenerator>,
    timeout: Option<Duration>,
}

impl std::fmt::Debug for NarrativeCoherenceRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NarrativeCoherenceRule")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl NarrativeCoherenceRule {
    #[must_use]
    pub fn new(generator: Arc<dyn NarrativeGenerator>, timeout: Option<Duration>) -> Self {
        Self { generator, timeout }
    }
}

#[async_trait]
impl ConsistencyRule for NarrativeCoherenceRule {
    fn id(&self) -> &str {
        "narrative_coherence"
    }

    fn name(&self) -> &str {
        "Narrative Coherence"
    }

    fn severity(&self) -> Severity {
        Severity::Warning
    }

    async fn evaluate(&self, arc: &StoryArc) -> Result<RuleOutcome, RuleError> {
        let analysis = request_payload::<CoherenceAnalysis>(
            self.generator.as_ref(),
            coherence_prompt(arc),
            COHERENCE_TEMPERATURE,
            self.timeout,
        )
        .await;

        let outcome = match analysis {
            Ok(analysis) => {
                RuleOutcome::from_findings(analysis.issues, analysis.warnings, analysis.suggestions)
            }
            Err(e) => {
                let mut findings = Findings::default();
                if e.is_parse_failure() {
                    warn!(error = %e, "coherence analysis could not be parsed");
                    findings.warning(PARSE_FAILURE_WARNING);
                } else {
                    warn!(error = %e, "coherence analysis request failed");
                    findings.warning(SERVICE_FAILURE_WARNING);
                }
                findings.into_outcome()
            }
        };
        Ok(outcome)
    }
}

fn coherence_prompt(arc: &StoryArc) -> String {
    let completed: Vec<&str> = arc.completed_beats().map(|b| b.title.as_str()).collect();
    let active: Vec<&str> = arc
        .beats()
        .iter()
        .filter(|b| !b.completed)
        .map(|b| b.title.as_str())
        .collect();

    format!(
        r#"Analyze the narrative coherence of this tabletop campaign story arc.

Theme: {theme}
Tone: {tone}
Progress: chapter {chapter} of {total}, act {act}, {phase} phase
Completed beats: {completed}
Active beats: {active}
Character milestones: {milestones}
World-state changes: {changes}
Linked quests: {quests}

Look for plot holes, contradictions, abandoned threads and tonal breaks.
Respond with ONLY a JSON object:
{{"issues": [string], "warnings": [string], "suggestions": [string]}}"#,
        theme = arc.theme(),
        tone = arc.tone(),
        chapter = arc.current_chapter(),
        total = arc.total_chapters(),
        act = arc.current_act(),
        phase = arc.story_phase(),
        completed = list_or_none(&completed),
        active = list_or_none(&active),
        milestones = arc.milestones().len(),
        changes = arc.world_changes().len(),
        quests = arc.quest_links().len(),
    )
}

fn list_or_none(titles: &[&str]) -> String {
    if titles.is_empty() {
        "none".to_owned()
    } else {
        titles.join("; ")
    }
}
