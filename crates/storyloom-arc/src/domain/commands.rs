//! Commands for the Story Arc context.

use storyloom_core::command::Command;
use uuid::Uuid;

use super::types::{
    NewMilestone, NewStoryArc, NewStoryBeat, NewWorldChange, QuestLinkUpdate, QuestProgressLink,
};

/// Command to create the story arc for a campaign.
#[derive(Debug, Clone)]
pub struct CreateStoryArc {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// Arc parameters, including the owning campaign.
    pub params: NewStoryArc,
}

/// Command to add a story beat.
#[derive(Debug, Clone)]
pub struct AddBeat {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The campaign whose arc receives the beat.
    pub campaign_id: Uuid,
    /// The beat to add.
    pub beat: NewStoryBeat,
}

/// Command to complete a story beat.
#[derive(Debug, Clone)]
pub struct CompleteBeat {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The campaign the beat belongs to.
    pub campaign_id: Uuid,
    /// The beat to complete.
    pub beat_id: Uuid,
    /// What happened.
    pub outcome: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
}

/// Command to record a character milestone.
#[derive(Debug, Clone)]
pub struct AddMilestone {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The campaign whose arc records the milestone.
    pub campaign_id: Uuid,
    /// The milestone to record.
    pub milestone: NewMilestone,
}

/// Command to record a world-state change.
#[derive(Debug, Clone)]
pub struct AddWorldChange {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The campaign whose arc records the change.
    pub campaign_id: Uuid,
    /// The change to record.
    pub change: NewWorldChange,
}

/// Command to link a quest to the arc.
#[derive(Debug, Clone)]
pub struct LinkQuest {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The campaign whose arc receives the link.
    pub campaign_id: Uuid,
    /// The link to attach.
    pub link: QuestProgressLink,
}

/// Command to update a quest link.
#[derive(Debug, Clone)]
pub struct UpdateQuestLink {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The campaign whose arc holds the link.
    pub campaign_id: Uuid,
    /// The linked quest.
    pub quest_id: Uuid,
    /// Fields to merge.
    pub update: QuestLinkUpdate,
}

/// Command to advance the arc one chapter.
#[derive(Debug, Clone)]
pub struct AdvanceChapter {
    /// The correlation ID for tracing.
    pub correlation_id: Uuid,
    /// The campaign whose arc advances.
    pub campaign_id: Uuid,
    /// Refuse to advance unless the chapter gate passes.
    pub enforce_gate: bool,
}

impl Command for CreateStoryArc {
    fn command_type(&self) -> &'static str {
        "story_arc.create"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn campaign_id(&self) -> Uuid {
        self.params.campaign_id
    }
}

impl Command for AddBeat {
    fn command_type(&self) -> &'static str {
        "story_arc.add_beat"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn campaign_id(&self) -> Uuid {
        self.campaign_id
    }
}

impl Command for CompleteBeat {
    fn command_type(&self) -> &'static str {
        "story_arc.complete_beat"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn campaign_id(&self) -> Uuid {
        self.campaign_id
    }
}

impl Command for AddMilestone {
    fn command_type(&self) -> &'static str {
        "story_arc.add_milestone"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn campaign_id(&self) -> Uuid {
        self.campaign_id
    }
}

impl Command for AddWorldChange {
    fn command_type(&self) -> &'static str {
        "story_arc.add_world_change"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn campaign_id(&self) -> Uuid {
        self.campaign_id
    }
}

impl Command for LinkQuest {
    fn command_type(&self) -> &'static str {
        "story_arc.link_quest"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn campaign_id(&self) -> Uuid {
        self.campaign_id
    }
}

impl Command for UpdateQuestLink {
    fn command_type(&self) -> &'static str {
        "story_arc.update_quest_link"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn campaign_id(&self) -> Uuid {
        self.campaign_id
    }
}

impl Command for AdvanceChapter {
    fn command_type(&self) -> &'static str {
        "story_arc.advance_chapter"
    }

    fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }

    fn campaign_id(&self) -> Uuid {
        self.campaign_id
    }
}
