//! End-to-end tests driving a story arc through the command and query
//! handlers against an in-memory repository.

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use storyloom_arc::application::command_handlers::{
    handle_add_milestone, handle_add_world_change, handle_advance_chapter, handle_complete_beat,
    handle_create_story_arc, handle_link_quest,
};
use storyloom_arc::application::progression::ProgressionGate;
use storyloom_arc::application::query_handlers::{
    check_chapter_advancement, get_progression_data, get_story_arc, validate_campaign_arc,
};
use storyloom_arc::application::validation::ConsistencyValidator;
use storyloom_arc::application::validation::coherence::SERVICE_FAILURE_WARNING;
use storyloom_arc::config::{ProgressionConfig, ValidatorConfig};
use storyloom_arc::domain::aggregates::StoryArc;
use storyloom_arc::domain::commands::{
    AddMilestone, AddWorldChange, AdvanceChapter, CompleteBeat, CreateStoryArc, LinkQuest,
};
use storyloom_arc::domain::types::{
    MilestoneType, NewMilestone, NewStoryArc, NewWorldChange, QuestLinkType, QuestProgressLink,
    StoryPhase, WorldChangeType,
};
use storyloom_core::error::DomainError;
use storyloom_core::event::DomainEvent;
use storyloom_test_support::{
    FailingGenerator, FixedClock, InMemoryRepository, ScriptedGenerator, init_tracing,
};
use uuid::Uuid;

fn fixed_clock() -> FixedClock {
    FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
}

/// Creates an arc and completes chapter 1 with a milestone and a world
/// change for every seeded beat. Returns the sequence numbers of every
/// event produced.
async fn play_first_chapter(
    campaign_id: Uuid,
    repo: &InMemoryRepository<StoryArc>,
) -> Vec<i64> {
    let clock = fixed_clock();
    let hero = Uuid::new_v4();
    let mut sequence = Vec::new();

    let created = handle_create_story_arc(
        &CreateStoryArc {
            correlation_id: Uuid::new_v4(),
            params: NewStoryArc::new(campaign_id, "Redemption", "grim"),
        },
        &clock,
        repo,
    )
    .await
    .unwrap();
    sequence.extend(created.iter().map(|e| e.metadata.sequence_number));

    let beat_ids: Vec<Uuid> = get_story_arc(campaign_id, repo)
        .await
        .unwrap()
        .beats
        .iter()
        .map(|b| b.id)
        .collect();

    for (i, beat_id) in beat_ids.into_iter().enumerate() {
        let completed = handle_complete_beat(
            &CompleteBeat {
                correlation_id: Uuid::new_v4(),
                campaign_id,
                beat_id,
                outcome: Some(format!("Outcome {i}")),
                notes: None,
            },
            &clock,
            repo,
        )
        .await
        .unwrap();
        let milestone = handle_add_milestone(
            &AddMilestone {
                correlation_id: Uuid::new_v4(),
                campaign_id,
                milestone: NewMilestone::new(hero, MilestoneType::Story, format!("Growth {i}"))
                    .for_beat(beat_id),
            },
            &clock,
            repo,
        )
        .await
        .unwrap();
        let change = handle_add_world_change(
            &AddWorldChange {
                correlation_id: Uuid::new_v4(),
                campaign_id,
                change: NewWorldChange::new(WorldChangeType::Event, format!("Ripple {i}"))
                    .for_beat(beat_id),
            },
            &clock,
            repo,
        )
        .await
        .unwrap();
        for events in [completed, milestone, change] {
            sequence.extend(events.iter().map(|e| e.metadata.sequence_number));
        }
    }
    sequence
}

#[tokio::test]
async fn test_chapter_gate_opens_once_first_chapter_is_played() {
    init_tracing();

    // Arrange
    let campaign_id = Uuid::new_v4();
    let repo = InMemoryRepository::<StoryArc>::new();
    let gate = ProgressionGate::new(Arc::new(FailingGenerator), ProgressionConfig::default());

    // Act
    let sequence = play_first_chapter(campaign_id, &repo).await;
    let check = check_chapter_advancement(campaign_id, &gate, &repo).await.unwrap();
    let advanced = handle_advance_chapter(
        &AdvanceChapter {
            correlation_id: Uuid::new_v4(),
            campaign_id,
            enforce_gate: true,
        },
        gate.config(),
        &fixed_clock(),
        &repo,
    )
    .await
    .unwrap();

    // Assert
    assert_eq!(sequence, (1..=7).collect::<Vec<i64>>());
    assert!(check.can_advance, "missing: {:?}", check.missing_requirements);
    assert_eq!(advanced.len(), 1);
    assert_eq!(advanced[0].event_type(), "story_arc.chapter_advanced");
    assert_eq!(advanced[0].metadata.sequence_number, 8);

    let data = get_progression_data(campaign_id, &gate, &repo).await.unwrap();
    assert_eq!(data.current_chapter, 2);
    assert_eq!(data.story_phase, StoryPhase::Setup);
    assert_eq!(data.current_act, 1);
    assert_eq!(data.estimated_beats_remaining, 28);
}

#[tokio::test]
async fn test_gate_refusal_leaves_arc_untouched() {
    init_tracing();

    // Arrange
    let campaign_id = Uuid::new_v4();
    let repo = InMemoryRepository::<StoryArc>::new();
    handle_create_story_arc(
        &CreateStoryArc {
            correlation_id: Uuid::new_v4(),
            params: NewStoryArc::new(campaign_id, "Redemption", "grim"),
        },
        &fixed_clock(),
        &repo,
    )
    .await
    .unwrap();

    // Act
    let result = handle_advance_chapter(
        &AdvanceChapter {
            correlation_id: Uuid::new_v4(),
            campaign_id,
            enforce_gate: true,
        },
        &ProgressionConfig::default(),
        &fixed_clock(),
        &repo,
    )
    .await;

    // Assert
    assert!(matches!(result, Err(DomainError::Validation(_))));
    let view = get_story_arc(campaign_id, &repo).await.unwrap();
    assert_eq!(view.current_chapter, 1);
    assert_eq!(view.version, 1);
}

#[tokio::test]
async fn test_validation_report_uses_generator_analysis() {
    init_tracing();

    // Arrange
    let campaign_id = Uuid::new_v4();
    let repo = InMemoryRepository::<StoryArc>::new();
    play_first_chapter(campaign_id, &repo).await;
    handle_link_quest(
        &LinkQuest {
            correlation_id: Uuid::new_v4(),
            campaign_id,
            link: QuestProgressLink::new(Uuid::new_v4(), "Find the heir", QuestLinkType::Setup),
        },
        &fixed_clock(),
        &repo,
    )
    .await
    .unwrap();
    let generator = Arc::new(ScriptedGenerator::replying(
        r#"{"issues": [], "warnings": ["The mentor's motive is unclear"], "suggestions": []}"#,
    ));
    let validator = ConsistencyValidator::with_default_rules(generator, ValidatorConfig::default());

    // Act
    let report = validate_campaign_arc(campaign_id, &validator, &repo).await.unwrap();

    // Assert
    assert_eq!(report.campaign_id, campaign_id);
    let ids: Vec<&str> = report.results.iter().map(|r| r.rule_id.as_str()).collect();
    assert_eq!(ids, validator.rule_ids());
    let coherence = report
        .results
        .iter()
        .find(|r| r.rule_id == "narrative_coherence")
        .unwrap();
    assert!(coherence.passed);
    assert_eq!(coherence.warnings, vec!["The mentor's motive is unclear".to_owned()]);
    assert_eq!(report.valid, report.overall_score >= 70);
    assert_eq!(report.summary.total_rules, 8);
    assert_eq!(
        report.summary.passed_rules + report.summary.failed_rules,
        report.summary.total_rules
    );
}

#[tokio::test]
async fn test_validation_survives_generator_outage() {
    init_tracing();

    // Arrange
    let campaign_id = Uuid::new_v4();
    let repo = InMemoryRepository::<StoryArc>::new();
    play_first_chapter(campaign_id, &repo).await;
    let validator = ConsistencyValidator::with_default_rules(
        Arc::new(FailingGenerator),
        ValidatorConfig::default(),
    );

    // Act
    let report = validate_campaign_arc(campaign_id, &validator, &repo).await.unwrap();

    // Assert
    assert_eq!(report.results.len(), 8);
    let coherence = report.results.last().unwrap();
    assert_eq!(coherence.rule_id, "narrative_coherence");
    assert!(coherence.passed);
    assert_eq!(coherence.warnings, vec![SERVICE_FAILURE_WARNING.to_owned()]);
    assert!(report.recommendations.len() <= 5);
}
