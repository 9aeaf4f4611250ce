//! Progression gating for story arcs.
//!
//! The eligibility checks are pure functions over an arc snapshot and never
//! mutate it; callers decide whether to advance. [`ProgressionGate`] bundles
//! them with the generator-backed suggestion requests.

use std::sync::Arc;

use serde::Serialize;
use storyloom_core::generation::NarrativeGenerator;
use tracing::{debug, instrument, warn};

use super::generation::request_payload;
use super::suggestions::{
    BeatSuggestionBatch, BeatSuggestionRequest, StoryBeatSuggestion, StoryImprovements,
    beat_suggestion_prompt, fallback_beat_suggestions, fallback_story_improvements,
    improvement_prompt,
};
use crate::config::ProgressionConfig;
use crate::domain::aggregates::StoryArc;
use crate::domain::types::{StoryBeat, StoryPhase};

/// Completed beats needed in the current act before the act can close.
pub const MIN_COMPLETED_BEATS_PER_ACT: usize = 3;

const BEAT_SUGGESTION_TEMPERATURE: f32 = 0.8;
const IMPROVEMENT_TEMPERATURE: f32 = 0.7;

/// Outcome of an advancement check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdvancementCheck {
    pub can_advance: bool,
    /// Every requirement that was checked, in check order.
    pub requirements: Vec<String>,
    /// The unmet subset of `requirements`, with current progress.
    pub missing_requirements: Vec<String>,
}

impl AdvancementCheck {
    fn new() -> Self {
        Self {
            can_advance: true,
            requirements: Vec::new(),
            missing_requirements: Vec::new(),
        }
    }

    fn require(&mut self, requirement: String, unmet: Option<String>) {
        self.requirements.push(requirement);
        if let Some(missing) = unmet {
            self.missing_requirements.push(missing);
            self.can_advance = false;
        }
    }
}

/// Snapshot of where an arc stands and what it needs next.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChapterProgressionData {
    pub current_chapter: u32,
    pub total_chapters: u32,
    pub current_act: u32,
    pub story_phase: StoryPhase,
    pub next_chapter_requirements: Vec<String>,
    pub act_transition_requirements: Vec<String>,
    pub phase_transition_requirements: Vec<String>,
    pub estimated_beats_remaining: u32,
}

/// Checks whether the arc may move on to its next chapter.
#[must_use]
pub fn can_advance_chapter(arc: &StoryArc, config: &ProgressionConfig) -> AdvancementCheck {
    let chapter = arc.current_chapter();
    let chapter_beats: Vec<&StoryBeat> = arc.beats_in_chapter(chapter).collect();
    let mut check = AdvancementCheck::new();

    let completed = chapter_beats.iter().filter(|b| b.completed).count();
    let min = config.min_beats_per_chapter;
    check.require(
        format!("Complete at least {min} story beats in chapter {chapter}"),
        (completed < min).then(|| {
            format!(
                "Complete {} more story beat(s) in chapter {chapter} ({completed}/{min})",
                min - completed
            )
        }),
    );

    check.require(
        format!("Complete all major and critical beats in chapter {chapter}"),
        pending_pivotal(&chapter_beats)
            .map(|titles| format!("Complete pivotal beats in chapter {chapter}: {titles}")),
    );

    if config.require_milestones {
        let ratio = milestone_coverage(arc);
        check.require(
            format!(
                "At least {} of completed beats have a character milestone",
                percent(config.milestone_coverage)
            ),
            (ratio < config.milestone_coverage).then(|| {
                format!(
                    "Record character milestones for completed beats ({} covered, {} required)",
                    percent(ratio),
                    percent(config.milestone_coverage)
                )
            }),
        );
    }

    if config.require_world_changes {
        let ratio = world_change_coverage(arc);
        check.require(
            format!(
                "At least {} of completed beats have a world-state change",
                percent(config.world_change_coverage)
            ),
            (ratio < config.world_change_coverage).then(|| {
                format!(
                    "Record world-state changes for completed beats ({} covered, {} required)",
                    percent(ratio),
                    percent(config.world_change_coverage)
                )
            }),
        );
    }

    check
}

/// Checks whether the arc has done enough in its current act to close it.
#[must_use]
pub fn can_advance_act(arc: &StoryArc) -> AdvancementCheck {
    let act = arc.current_act();
    let phase = arc.story_phase();
    let act_beats: Vec<&StoryBeat> = arc.beats_in_act(act).collect();
    let completed = act_beats.iter().filter(|b| b.completed).count();
    let mut check = AdvancementCheck::new();

    check.require(
        format!("Complete at least {MIN_COMPLETED_BEATS_PER_ACT} story beats in act {act}"),
        (completed < MIN_COMPLETED_BEATS_PER_ACT).then(|| {
            format!(
                "Complete more story beats in act {act} ({completed}/{MIN_COMPLETED_BEATS_PER_ACT})"
            )
        }),
    );

    if let Some(min) = phase_minimum(phase) {
        check.require(
            format!("Complete at least {min} beats of the {phase} phase in act {act}"),
            (completed < min).then(|| {
                format!(
                    "The {phase} phase needs {min} completed beats in act {act} ({completed}/{min})"
                )
            }),
        );
    }

    check.require(
        format!("Complete all major and critical beats in act {act}"),
        pending_pivotal(&act_beats)
            .map(|titles| format!("Complete pivotal beats in act {act}: {titles}")),
    );

    check
}

/// Gathers the arc's position and the requirements for its next steps.
#[must_use]
pub fn chapter_progression_data(
    arc: &StoryArc,
    config: &ProgressionConfig,
) -> ChapterProgressionData {
    let completed = u32::try_from(arc.completed_story_beats()).unwrap_or(u32::MAX);
    let estimated_total = arc
        .total_chapters()
        .saturating_mul(config.beats_per_chapter_estimate);

    ChapterProgressionData {
        current_chapter: arc.current_chapter(),
        total_chapters: arc.total_chapters(),
        current_act: arc.current_act(),
        story_phase: arc.story_phase(),
        next_chapter_requirements: next_chapter_requirements(arc, config),
        act_transition_requirements: can_advance_act(arc).missing_requirements,
        phase_transition_requirements: phase_transition_requirements(arc),
        estimated_beats_remaining: estimated_total.saturating_sub(completed),
    }
}

fn next_chapter_requirements(arc: &StoryArc, config: &ProgressionConfig) -> Vec<String> {
    if arc.is_final_chapter() {
        return vec![format!(
            "Chapter {} is the final chapter of the arc",
            arc.current_chapter()
        )];
    }
    can_advance_chapter(arc, config).missing_requirements
}

fn phase_transition_requirements(arc: &StoryArc) -> Vec<String> {
    let phase = arc.story_phase();
    let total = arc.total_chapters();
    let next = (arc.current_chapter() + 1..=total)
        .map(|chapter| (chapter, StoryPhase::from_chapter_ratio(chapter, total)))
        .find(|(_, p)| *p > phase);

    match next {
        Some((chapter, next_phase)) => vec![format!(
            "Reach chapter {chapter} to enter the {next_phase} phase"
        )],
        None => vec![format!("The arc is in its final phase ({phase})")],
    }
}

fn phase_minimum(phase: StoryPhase) -> Option<usize> {
    match phase {
        StoryPhase::Setup | StoryPhase::Climax => Some(2),
        StoryPhase::Development => Some(3),
        StoryPhase::Resolution => None,
    }
}

/// Titles of incomplete major or critical beats, or `None` if there are none.
fn pending_pivotal(beats: &[&StoryBeat]) -> Option<String> {
    let titles: Vec<&str> = beats
        .iter()
        .filter(|b| b.importance.is_pivotal() && !b.completed)
        .map(|b| b.title.as_str())
        .collect();
    (!titles.is_empty()).then(|| titles.join(", "))
}

/// Share of completed beats referenced by at least one milestone. 1.0 when
/// nothing is completed.
fn milestone_coverage(arc: &StoryArc) -> f64 {
    coverage(arc, |beat| {
        arc.milestones()
            .iter()
            .any(|m| m.story_beat_id == Some(beat.id))
    })
}

/// Share of completed beats referenced by at least one world-state change.
fn world_change_coverage(arc: &StoryArc) -> f64 {
    coverage(arc, |beat| {
        arc.world_changes()
            .iter()
            .any(|c| c.story_beat_id == Some(beat.id))
    })
}

#[allow(clippy::cast_precision_loss)]
fn coverage(arc: &StoryArc, covered: impl Fn(&StoryBeat) -> bool) -> f64 {
    let (total, hits) = arc
        .completed_beats()
        .fold((0usize, 0usize), |(total, hits), beat| {
            (total + 1, hits + usize::from(covered(beat)))
        });
    if total == 0 {
        1.0
    } else {
        hits as f64 / total as f64
    }
}

fn percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

/// Progression checks plus generator-backed suggestions.
///
/// The suggestion methods never fail. Any generator problem is logged and
/// answered with the fixed fallback content.
#[derive(Clone)]
pub struct ProgressionGate {
    generator: Arc<dyn NarrativeGenerator>,
    config: ProgressionConfig,
}

impl std::fmt::Debug for ProgressionGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProgressionGate")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl ProgressionGate {
    /// Creates a gate backed by `generator`.
    #[must_use]
    pub fn new(generator: Arc<dyn NarrativeGenerator>, config: ProgressionConfig) -> Self {
        Self { generator, config }
    }

    #[must_use]
    pub fn config(&self) -> &ProgressionConfig {
        &self.config
    }

    #[must_use]
    pub fn can_advance_chapter(&self, arc: &StoryArc) -> AdvancementCheck {
        can_advance_chapter(arc, &self.config)
    }

    #[must_use]
    pub fn can_advance_act(&self, arc: &StoryArc) -> AdvancementCheck {
        can_advance_act(arc)
    }

    #[must_use]
    pub fn chapter_progression_data(&self, arc: &StoryArc) -> ChapterProgressionData {
        chapter_progression_data(arc, &self.config)
    }

    /// Asks the generator for up to `count` beat suggestions (at least one).
    /// Any generator failure yields the full fixed fallback set.
    #[instrument(skip_all, fields(chapter = request.current_chapter, count = count))]
    pub async fn generate_story_beat_suggestions(
        &self,
        request: &BeatSuggestionRequest,
        count: usize,
    ) -> Vec<StoryBeatSuggestion> {
        let count = count.max(1);
        let prompt = beat_suggestion_prompt(request, count);

        match request_payload::<BeatSuggestionBatch>(
            self.generator.as_ref(),
            prompt,
            BEAT_SUGGESTION_TEMPERATURE,
            self.config.generation_timeout(),
        )
        .await
        {
            Ok(BeatSuggestionBatch(mut suggestions)) => {
                debug!(received = suggestions.len(), "beat suggestions generated");
                suggestions.truncate(count);
                suggestions
            }
            Err(e) => {
                warn!(error = %e, "beat suggestion generation failed, using fallback");
                fallback_beat_suggestions()
            }
        }
    }

    /// Asks the generator for categorized improvement advice.
    #[instrument(skip_all, fields(story_arc_id = %arc.id))]
    pub async fn suggest_story_improvements(&self, arc: &StoryArc) -> StoryImprovements {
        match request_payload::<StoryImprovements>(
            self.generator.as_ref(),
            improvement_prompt(arc),
            IMPROVEMENT_TEMPERATURE,
            self.config.generation_timeout(),
        )
        .await
        {
            Ok(improvements) => improvements,
            Err(e) => {
                warn!(error = %e, "story improvement generation failed, using fallback");
                fallback_story_improvements()
            }
        }
    }
}
