//! Domain events for the Story Arc context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storyloom_core::event::{DomainEvent, EventMetadata};
use uuid::Uuid;

use super::types::{
    CharacterMilestone, Pacing, QuestLinkUpdate, QuestProgressLink, StoryBeat, StoryPhase,
    WorldStateChange,
};

/// Emitted once, when a campaign's story arc is created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryArcCreated {
    /// The story arc identifier.
    pub story_arc_id: Uuid,
    /// The owning campaign.
    pub campaign_id: Uuid,
    pub theme: String,
    pub tone: String,
    pub pacing: Pacing,
    pub total_chapters: u32,
    /// The beats every new arc starts with.
    pub seeded_beats: Vec<StoryBeat>,
    pub created_at: DateTime<Utc>,
}

/// Emitted when a beat is appended to the arc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatAdded {
    /// The new beat.
    pub beat: StoryBeat,
}

/// Emitted when a beat is completed for the first time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatCompleted {
    /// The completed beat.
    pub beat_id: Uuid,
    pub outcome: Option<String>,
    pub notes: Option<String>,
    pub completed_at: DateTime<Utc>,
}

/// Emitted when a character milestone is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MilestoneAdded {
    /// The recorded milestone.
    pub milestone: CharacterMilestone,
}

/// Emitted when a world-state change is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldChangeAdded {
    /// The recorded change.
    pub change: WorldStateChange,
}

/// Emitted when a quest is linked to the arc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestLinked {
    /// The new link.
    pub link: QuestProgressLink,
}

/// Emitted when a quest link is updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestLinkUpdated {
    /// The quest whose link changed.
    pub quest_id: Uuid,
    /// The fields that were merged.
    pub update: QuestLinkUpdate,
}

/// Emitted when the arc moves to the next chapter. Phase and act are derived
/// at command time and carried in the payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChapterAdvanced {
    pub from_chapter: u32,
    pub to_chapter: u32,
    pub story_phase: StoryPhase,
    pub current_act: u32,
}

/// Event payload variants for the Story Arc context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StoryArcEventKind {
    /// The arc was created.
    Created(StoryArcCreated),
    /// A beat was added.
    BeatAdded(BeatAdded),
    /// A beat was completed.
    BeatCompleted(BeatCompleted),
    /// A character milestone was recorded.
    MilestoneAdded(MilestoneAdded),
    /// A world-state change was recorded.
    WorldChangeAdded(WorldChangeAdded),
    /// A quest was linked.
    QuestLinked(QuestLinked),
    /// A quest link was updated.
    QuestLinkUpdated(QuestLinkUpdated),
    /// The arc advanced one chapter.
    ChapterAdvanced(ChapterAdvanced),
}

impl StoryArcEventKind {
    /// Returns the event type name for this payload.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Created(_) => "story_arc.created",
            Self::BeatAdded(_) => "story_arc.beat_added",
            Self::BeatCompleted(_) => "story_arc.beat_completed",
            Self::MilestoneAdded(_) => "story_arc.milestone_added",
            Self::WorldChangeAdded(_) => "story_arc.world_change_added",
            Self::QuestLinked(_) => "story_arc.quest_linked",
            Self::QuestLinkUpdated(_) => "story_arc.quest_link_updated",
            Self::ChapterAdvanced(_) => "story_arc.chapter_advanced",
        }
    }
}

/// Domain event envelope for the Story Arc context.
#[derive(Debug, Clone, PartialEq)]
pub struct StoryArcEvent {
    /// Event metadata.
    pub metadata: EventMetadata,
    /// Event-specific payload.
    pub kind: StoryArcEventKind,
}

impl DomainEvent for StoryArcEvent {
    fn event_type(&self) -> &'static str {
        self.kind.event_type()
    }

    fn to_payload(&self) -> serde_json::Value {
        // Derived Serialize on plain data never fails; Null is unreachable.
        serde_json::to_value(&self.kind).unwrap_or_default()
    }

    fn metadata(&self) -> &EventMetadata {
        &self.metadata
    }
}
