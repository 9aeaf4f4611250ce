//! Command handlers for the Story Arc context.
//!
//! Each handler loads the campaign's arc, executes one command against it,
//! saves it, and returns the events the command produced. A command that
//! changes nothing returns no events and does not save.

use storyloom_core::aggregate::AggregateRoot;
use storyloom_core::clock::Clock;
use storyloom_core::command::Command;
use storyloom_core::error::DomainError;
use storyloom_core::repository::AggregateRepository;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::application::progression::can_advance_chapter;
use crate::config::ProgressionConfig;
use crate::domain::aggregates::StoryArc;
use crate::domain::commands::{
    AddBeat, AddMilestone, AddWorldChange, AdvanceChapter, CompleteBeat, CreateStoryArc,
    LinkQuest, UpdateQuestLink,
};
use crate::domain::events::StoryArcEvent;

/// Loads the arc for a campaign.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound` if the campaign has no arc, or
/// the repository's error.
pub(crate) async fn load_story_arc(
    campaign_id: Uuid,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<StoryArc, DomainError> {
    repo.find_by_campaign(campaign_id)
        .await?
        .ok_or(DomainError::StoryArcNotFound(campaign_id))
}

async fn save(
    arc: &StoryArc,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<Vec<StoryArcEvent>, DomainError> {
    let events = arc.uncommitted_events().to_vec();
    repo.save(arc).await?;
    debug!(
        events = events.len(),
        version = arc.version(),
        "story arc saved"
    );
    Ok(events)
}

/// Handles the `CreateStoryArc` command.
///
/// # Errors
///
/// Returns `DomainError::AlreadyExists` if the campaign already has an arc,
/// `DomainError::Validation` for a zero chapter count, or the repository's
/// error.
#[instrument(skip_all, fields(
    command = command.command_type(),
    campaign_id = %command.campaign_id(),
    correlation_id = %command.correlation_id,
))]
pub async fn handle_create_story_arc(
    command: &CreateStoryArc,
    clock: &dyn Clock,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<Vec<StoryArcEvent>, DomainError> {
    let campaign_id = command.campaign_id();
    if repo.find_by_campaign(campaign_id).await?.is_some() {
        return Err(DomainError::AlreadyExists(campaign_id));
    }

    let arc = StoryArc::create(command.params.clone(), command.correlation_id, clock)?;
    let events = save(&arc, repo).await?;
    info!(story_arc_id = %arc.id, "story arc created");
    Ok(events)
}

/// Handles the `AddBeat` command.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound` or the repository's error.
#[instrument(skip_all, fields(
    command = command.command_type(),
    campaign_id = %command.campaign_id,
    correlation_id = %command.correlation_id,
))]
pub async fn handle_add_beat(
    command: &AddBeat,
    clock: &dyn Clock,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<Vec<StoryArcEvent>, DomainError> {
    let mut arc = load_story_arc(command.campaign_id, repo).await?;
    let beat_id = arc.add_beat(command.beat.clone(), command.correlation_id, clock);
    debug!(%beat_id, "story beat added");
    save(&arc, repo).await
}

/// Handles the `CompleteBeat` command. Completing a beat that is already
/// complete is a no-op.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound`, `DomainError::BeatNotFound` if
/// the arc has no such beat, or the repository's error.
#[instrument(skip_all, fields(
    command = command.command_type(),
    campaign_id = %command.campaign_id,
    correlation_id = %command.correlation_id,
    beat_id = %command.beat_id,
))]
pub async fn handle_complete_beat(
    command: &CompleteBeat,
    clock: &dyn Clock,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<Vec<StoryArcEvent>, DomainError> {
    let mut arc = load_story_arc(command.campaign_id, repo).await?;
    if arc.beat(command.beat_id).is_none() {
        return Err(DomainError::BeatNotFound(command.beat_id));
    }

    let completed = arc.complete_beat(
        command.beat_id,
        command.outcome.clone(),
        command.notes.clone(),
        command.correlation_id,
        clock,
    );
    if !completed {
        debug!("story beat already completed");
        return Ok(Vec::new());
    }
    save(&arc, repo).await
}

/// Handles the `AddMilestone` command.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound` or the repository's error.
#[instrument(skip_all, fields(
    command = command.command_type(),
    campaign_id = %command.campaign_id,
    correlation_id = %command.correlation_id,
))]
pub async fn handle_add_milestone(
    command: &AddMilestone,
    clock: &dyn Clock,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<Vec<StoryArcEvent>, DomainError> {
    let mut arc = load_story_arc(command.campaign_id, repo).await?;
    arc.add_milestone(command.milestone.clone(), command.correlation_id, clock);
    save(&arc, repo).await
}

/// Handles the `AddWorldChange` command.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound` or the repository's error.
#[instrument(skip_all, fields(
    command = command.command_type(),
    campaign_id = %command.campaign_id,
    correlation_id = %command.correlation_id,
))]
pub async fn handle_add_world_change(
    command: &AddWorldChange,
    clock: &dyn Clock,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<Vec<StoryArcEvent>, DomainError> {
    let mut arc = load_story_arc(command.campaign_id, repo).await?;
    let change_id = arc.add_world_change(command.change.clone(), command.correlation_id, clock);
    debug!(%change_id, "world-state change recorded");
    save(&arc, repo).await
}

/// Handles the `LinkQuest` command.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound`, `DomainError::Validation` if
/// the quest is already linked, or the repository's error.
#[instrument(skip_all, fields(
    command = command.command_type(),
    campaign_id = %command.campaign_id,
    correlation_id = %command.correlation_id,
    quest_id = %command.link.quest_id,
))]
pub async fn handle_link_quest(
    command: &LinkQuest,
    clock: &dyn Clock,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<Vec<StoryArcEvent>, DomainError> {
    let mut arc = load_story_arc(command.campaign_id, repo).await?;
    if !arc.link_quest(command.link.clone(), command.correlation_id, clock) {
        return Err(DomainError::Validation(format!(
            "quest {} is already linked to the story arc",
            command.link.quest_id
        )));
    }
    save(&arc, repo).await
}

/// Handles the `UpdateQuestLink` command.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound`, `DomainError::QuestLinkNotFound`
/// if the quest is not linked, or the repository's error.
#[instrument(skip_all, fields(
    command = command.command_type(),
    campaign_id = %command.campaign_id,
    correlation_id = %command.correlation_id,
    quest_id = %command.quest_id,
))]
pub async fn handle_update_quest_link(
    command: &UpdateQuestLink,
    clock: &dyn Clock,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<Vec<StoryArcEvent>, DomainError> {
    let mut arc = load_story_arc(command.campaign_id, repo).await?;
    if command.update.is_empty() {
        return if arc.quest_link(command.quest_id).is_some() {
            Ok(Vec::new())
        } else {
            Err(DomainError::QuestLinkNotFound(command.quest_id))
        };
    }
    if !arc.update_quest_link(
        command.quest_id,
        command.update.clone(),
        command.correlation_id,
        clock,
    ) {
        return Err(DomainError::QuestLinkNotFound(command.quest_id));
    }
    save(&arc, repo).await
}

/// Handles the `AdvanceChapter` command. When `enforce_gate` is set the
/// chapter gate must pass first. Advancing from the final chapter is a
/// no-op.
///
/// # Errors
///
/// Returns `DomainError::StoryArcNotFound`, `DomainError::Validation`
/// listing the unmet requirements if the gate refuses, or the repository's
/// error.
#[instrument(skip_all, fields(
    command = command.command_type(),
    campaign_id = %command.campaign_id,
    correlation_id = %command.correlation_id,
    enforce_gate = command.enforce_gate,
))]
pub async fn handle_advance_chapter(
    command: &AdvanceChapter,
    config: &ProgressionConfig,
    clock: &dyn Clock,
    repo: &dyn AggregateRepository<StoryArc>,
) -> Result<Vec<StoryArcEvent>, DomainError> {
    let mut arc = load_story_arc(command.campaign_id, repo).await?;

    if command.enforce_gate && !arc.is_final_chapter() {
        let check = can_advance_chapter(&arc, config);
        if !check.can_advance {
            warn!(
                missing = check.missing_requirements.len(),
                "chapter advancement refused"
            );
            return Err(DomainError::Validation(format!(
                "chapter {} cannot advance: {}",
                arc.current_chapter(),
                check.missing_requirements.join("; ")
            )));
        }
    }

    if !arc.advance_chapter(command.correlation_id, clock) {
        debug!("story arc is at its final chapter");
        return Ok(Vec::new());
    }
    info!(
        chapter = arc.current_chapter(),
        phase = %arc.story_phase(),
        act = arc.current_act(),
        "chapter advanced"
    );
    save(&arc, repo).await
}
