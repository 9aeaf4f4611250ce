//! Query handlers for the Story Arc context.
//!
//! Queries load the campaign's arc and never save it. Generator-backed
//! queries always answer, falling back to fixed content when the generator
//! is unavailable.

use chrono::{DateTime, Utc};
use serde::Serialize;
use storyloom_core::aggregate::AggregateRoot;
use storyloom_core::error::DomainError;
use storyloom_core::repository::AggregateRepository;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::application::command_handlers::load_story_arc;
use crate::application::progression::{AdvancementCheck, ChapterProgressionData, ProgressionGate};
use crate::application::suggestions::{
    BeatSuggestionRequest, StoryBeatSuggestion, StoryImprovements,
};
use crate::application::validation::{ConsistencyValidator, ValidationReport};
use crate::domain::aggregates::StoryArc;
use crate::domain::types::{
    CharacterMilestone, Pacing, QuestProgressLink, StoryBeat, StoryPhase, WorldStateChange,
};

/// Read-only view of a story arc.
#[derive(Debug, Serialize)]
pub struct StoryArcView {
    pub story_arc_id: Uuid,
    pub campaign_id: Uuid,
    pub theme: String,
    pub tone: String,
    pub pacing: Pacing,
    pub story_phase: StoryPhase,
    pub current_chapter: u32,
    pub current_act: u32,
    pub total_chapters: u32,
    pub beats: Vec<StoryBeat>,
    pub milestones: Vec<CharacterMilestone>,
    pub world_changes: Vec<WorldStateChange>,
    pub quest_links: Vec<QuestProgressLink>,
    pub completed_story_beats: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Current version (event count).
    pub version: i64,
}

impl From<&StoryArc> for StoryArcView {
    fn from(arc: &StoryArc) -> Self {
        Self {
            story_arc_id: arc.id,
            campaign_id: arc.campaign_id,
            theme: arc.theme().to_owned(),
            tone: arc.tone().to_owned(),
            pacing: arc.pacing(),
            story_phase: arc.story_phase(),
            current_chapter: arc.current_chapter(),
            current_act: arc.current_act(),
            total_chapters: arc.total_chapters(),
            beats: arc.beats().to_vec(),
            milestones: arc.milestones().to_vec(),
            world_changes: arc.world_changes().to_vec(),
            quest_links: arc.quest_links().to_vec(),
            completed_story_beats: arc.completed_story_beats(),
            created_at: arc.created_at(),
            updated_at: arc.updated_at(),
            version: arc.version(),
        }
    }
}

/// Retrieves the story arc for a campaign.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound` if the campaign has no arc, or
/// the repository's error.
pub async fn get_story_arc(
    campaign_id: Uuid,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<StoryArcView, DomainError> {
    let arc = load_story_arc(campaign_id, repo).await?;
    Ok(StoryArcView::from(&arc))
}

/// Reports where the campaign's arc stands and what it needs next.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound` or the repository's error.
pub async fn get_progression_data(
    campaign_id: Uuid,
    gate: &ProgressionGate,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<ChapterProgressionData, DomainError> {
    let arc = load_story_arc(campaign_id, repo).await?;
    Ok(gate.chapter_progression_data(&arc))
}

/// Checks whether the campaign's arc may advance to its next chapter.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound` or the repository's error.
pub async fn check_chapter_advancement(
    campaign_id: Uuid,
    gate: &ProgressionGate,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<AdvancementCheck, DomainError> {
    let arc = load_story_arc(campaign_id, repo).await?;
    Ok(gate.can_advance_chapter(&arc))
}

/// Checks whether the campaign's arc has finished its current act.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound` or the repository's error.
pub async fn check_act_advancement(
    campaign_id: Uuid,
    gate: &ProgressionGate,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<AdvancementCheck, DomainError> {
    let arc = load_story_arc(campaign_id, repo).await?;
    Ok(gate.can_advance_act(&arc))
}

/// Runs the consistency validator against the campaign's arc.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound` or the repository's error. Rule
/// failures are reported inside the report, never as an error.
#[instrument(skip(validator, repo), fields(campaign_id = %campaign_id))]
pub async fn validate_campaign_arc(
    campaign_id: Uuid,
    validator: &ConsistencyValidator,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<ValidationReport, DomainError> {
    let arc = load_story_arc(campaign_id, repo).await?;
    let report = validator.validate_story_arc(&arc).await;
    info!(
        overall_score = report.overall_score,
        valid = report.valid,
        "story arc validated"
    );
    Ok(report)
}

/// Suggests up to `count` next beats for the campaign's arc, optionally
/// steered by `focus`.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound` or the repository's error.
#[instrument(skip(gate, repo, focus), fields(campaign_id = %campaign_id))]
pub async fn suggest_story_beats(
    campaign_id: Uuid,
    count: usize,
    focus: Option<&str>,
    gate: &ProgressionGate,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<Vec<StoryBeatSuggestion>, DomainError> {
    let arc = load_story_arc(campaign_id, repo).await?;
    let mut request = BeatSuggestionRequest::from_arc(&arc);
    if let Some(focus) = focus {
        request = request.with_focus(focus);
    }
    Ok(gate.generate_story_beat_suggestions(&request, count).await)
}

/// Suggests pacing, character, world and plot improvements for the
/// campaign's arc.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound` or the repository's error.
pub async fn suggest_improvements(
    campaign_id: Uuid,
    gate: &ProgressionGate,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<StoryImprovements, DomainError> {
    let arc = load_story_arc(campaign_id, repo).await?;
    Ok(gate.suggest_story_improvements(&arc).await)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{TimeZone, Utc};
    use storyloom_core::error::DomainError;
    use storyloom_core::generation::GenerationTask;
    use uuid::Uuid;

    use super::*;
    use crate::application::suggestions::fallback_beat_suggestions;
    use crate::config::{ProgressionConfig, ValidatorConfig};
    use crate::domain::types::NewStoryArc;
    use storyloom_test_support::{
        EmptyRepository, FailingGenerator, FixedClock, InMemoryRepository, ScriptedGenerator,
    };

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn stored_arc(campaign_id: Uuid) -> InMemoryRepository<StoryArc> {
        let params = NewStoryArc::new(campaign_id, "Redemption", "grim");
        let arc = StoryArc::create(params, Uuid::new_v4(), &fixed_clock()).unwrap();
        InMemoryRepository::with(&arc)
    }

    fn failing_gate() -> ProgressionGate {
        ProgressionGate::new(Arc::new(FailingGenerator), ProgressionConfig::default())
    }

    #[tokio::test]
    async fn test_get_story_arc_returns_view_with_state() {
        // Arrange
        let campaign_id = Uuid::new_v4();
        let repo = stored_arc(campaign_id);

        // Act
        let view = get_story_arc(campaign_id, &repo).await.unwrap();

        // Assert
        assert_eq!(view.campaign_id, campaign_id);
        assert_eq!(view.theme, "Redemption");
        assert_eq!(view.current_chapter, 1);
        assert_eq!(view.story_phase, StoryPhase::Setup);
        assert_eq!(view.beats.len(), 2);
        assert_eq!(view.completed_story_beats, 0);
        assert_eq!(view.version, 1);
        assert_eq!(view.created_at, fixed_clock().0);
        assert_eq!(repo.save_count(), 0);
    }

    #[tokio::test]
    async fn test_get_story_arc_not_found() {
        let campaign_id = Uuid::new_v4();

        let result = get_story_arc(campaign_id, &EmptyRepository).await;

        match result.unwrap_err() {
            DomainError::StoryArcNotFound(id) => assert_eq!(id, campaign_id),
            other => panic!("expected StoryArcNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_progression_queries_on_fresh_arc() {
        // Arrange
        let campaign_id = Uuid::new_v4();
        let repo = stored_arc(campaign_id);
        let gate = failing_gate();

        // Act
        let data = get_progression_data(campaign_id, &gate, &repo).await.unwrap();
        let chapter = check_chapter_advancement(campaign_id, &gate, &repo).await.unwrap();
        let act = check_act_advancement(campaign_id, &gate, &repo).await.unwrap();

        // Assert
        assert_eq!(data.current_chapter, 1);
        assert_eq!(data.total_chapters, 10);
        assert_eq!(data.next_chapter_requirements, chapter.missing_requirements);
        assert_eq!(data.act_transition_requirements, act.missing_requirements);
        assert!(!chapter.can_advance);
        assert!(!act.can_advance);
    }

    #[tokio::test]
    async fn test_validate_campaign_arc_reports_for_campaign() {
        // Arrange
        let campaign_id = Uuid::new_v4();
        let repo = stored_arc(campaign_id);
        let validator = ConsistencyValidator::with_default_rules(
            Arc::new(FailingGenerator),
            ValidatorConfig::default(),
        );

        // Act
        let report = validate_campaign_arc(campaign_id, &validator, &repo).await.unwrap();

        // Assert
        assert_eq!(report.campaign_id, campaign_id);
        assert_eq!(report.results.len(), 8);
        assert_eq!(report.summary.total_rules, 8);
        assert!(report.recommendations.len() <= 5);
    }

    #[tokio::test]
    async fn test_suggest_story_beats_passes_focus_to_generator() {
        // Arrange
        let campaign_id = Uuid::new_v4();
        let repo = stored_arc(campaign_id);
        let generator = Arc::new(ScriptedGenerator::replying(
            r#"[{"title": "The Duel", "description": "Steel at dawn", "type": "climax", "importance": "critical"}]"#,
        ));
        let gate = ProgressionGate::new(generator.clone(), ProgressionConfig::default());

        // Act
        let suggestions =
            suggest_story_beats(campaign_id, 3, Some("the rival"), &gate, &repo).await.unwrap();

        // Assert
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].title, "The Duel");
        let requests = generator.requests();
        assert_eq!(requests[0].task, GenerationTask::StoryBeatSuggestions);
        assert!(requests[0].prompt.contains("the rival"));
    }

    #[tokio::test]
    async fn test_suggest_story_beats_falls_back_when_generator_fails() {
        let campaign_id = Uuid::new_v4();
        let repo = stored_arc(campaign_id);

        let suggestions = suggest_story_beats(campaign_id, 2, None, &failing_gate(), &repo)
            .await
            .unwrap();

        assert_eq!(suggestions.len(), 3);
        assert_eq!(suggestions, fallback_beat_suggestions());
    }

    #[tokio::test]
    async fn test_suggest_improvements_for_unknown_campaign() {
        let result = suggest_improvements(Uuid::new_v4(), &failing_gate(), &EmptyRepository).await;

        assert!(matches!(result, Err(DomainError::StoryArcNotFound(_))));
    }
}
