//! Value types held by the story arc aggregate.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use storyloom_core::error::DomainError;
use uuid::Uuid;

/// Narrative function of a story beat.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BeatType {
    /// Establishes the premise.
    Setup,
    /// Builds on what has been established.
    #[default]
    Development,
    /// A turning point of high tension.
    Climax,
    /// Ties off a thread.
    Resolution,
    /// Upends expectations.
    Twist,
    /// Centred on a character.
    Character,
    /// Centred on the setting.
    World,
}

impl BeatType {
    /// Returns the snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Development => "development",
            Self::Climax => "climax",
            Self::Resolution => "resolution",
            Self::Twist => "twist",
            Self::Character => "character",
            Self::World => "world",
        }
    }
}

impl FromStr for BeatType {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "setup" => Ok(Self::Setup),
            "development" => Ok(Self::Development),
            "climax" => Ok(Self::Climax),
            "resolution" => Ok(Self::Resolution),
            "twist" => Ok(Self::Twist),
            "character" => Ok(Self::Character),
            "world" => Ok(Self::World),
            other => Err(DomainError::Validation(format!("unknown beat type: {other}"))),
        }
    }
}

/// How much a beat or milestone matters to the story.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    /// Flavour.
    Minor,
    /// Default weight.
    #[default]
    Moderate,
    /// Must be resolved before the chapter closes.
    Major,
    /// Must be resolved before the chapter closes.
    Critical,
}

impl Importance {
    /// Major and critical beats block chapter and act advancement until
    /// they are completed.
    #[must_use]
    pub fn is_pivotal(self) -> bool {
        matches!(self, Self::Major | Self::Critical)
    }

    /// Returns the snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Minor => "minor",
            Self::Moderate => "moderate",
            Self::Major => "major",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for Importance {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "minor" => Ok(Self::Minor),
            "moderate" => Ok(Self::Moderate),
            "major" => Ok(Self::Major),
            "critical" => Ok(Self::Critical),
            other => Err(DomainError::Validation(format!("unknown importance: {other}"))),
        }
    }
}

/// Category of a character milestone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MilestoneType {
    Level,
    Relationship,
    Story,
    Personal,
    Skill,
    Achievement,
}

/// Category of a world-state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldChangeType {
    Location,
    Faction,
    Threat,
    Event,
    Relationship,
    Discovery,
}

/// Scale of a world-state change.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorldImpact {
    Minor,
    #[default]
    Moderate,
    Major,
    Catastrophic,
}

/// Role a quest plays in the arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestLinkType {
    Setup,
    Development,
    Climax,
    Resolution,
}

/// Lifecycle state of a linked quest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestStatus {
    #[default]
    Active,
    Completed,
    Failed,
    Abandoned,
}

/// Configured tempo of the campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Pacing {
    Slow,
    #[default]
    Moderate,
    Fast,
}

impl Pacing {
    /// Returns the snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Slow => "slow",
            Self::Moderate => "moderate",
            Self::Fast => "fast",
        }
    }
}

/// Story phase, derived from how far through its chapters the arc is.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoryPhase {
    #[default]
    Setup,
    Development,
    Climax,
    Resolution,
}

impl StoryPhase {
    /// Derives the phase from `current_chapter / total_chapters`.
    ///
    /// Ratio bands: up to 0.25 is setup, up to 0.75 development, up to 0.90
    /// climax, anything above is resolution.
    #[must_use]
    pub fn from_chapter_ratio(current_chapter: u32, total_chapters: u32) -> Self {
        let ratio = f64::from(current_chapter) / f64::from(total_chapters.max(1));
        if ratio <= 0.25 {
            Self::Setup
        } else if ratio <= 0.75 {
            Self::Development
        } else if ratio <= 0.90 {
            Self::Climax
        } else {
            Self::Resolution
        }
    }

    /// The act this phase maps to. Acts are not independently steppable.
    #[must_use]
    pub fn act(self) -> u32 {
        match self {
            Self::Setup => 1,
            Self::Development => 2,
            Self::Climax => 3,
            Self::Resolution => 4,
        }
    }

    /// The phase that follows this one, if any.
    #[must_use]
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Setup => Some(Self::Development),
            Self::Development => Some(Self::Climax),
            Self::Climax => Some(Self::Resolution),
            Self::Resolution => None,
        }
    }

    /// Returns the snake-case name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Setup => "setup",
            Self::Development => "development",
            Self::Climax => "climax",
            Self::Resolution => "resolution",
        }
    }
}

impl fmt::Display for StoryPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A discrete, completable narrative event within a chapter and act.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryBeat {
    /// Beat identifier, unique within the arc.
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub beat_type: BeatType,
    pub importance: Importance,
    /// Chapter number, starting at 1.
    pub chapter: u32,
    /// Act number, starting at 1.
    pub act: u32,
    /// Characters involved in the beat.
    pub characters: Vec<Uuid>,
    pub location: Option<String>,
    /// Names of NPCs involved.
    pub npcs: Vec<String>,
    pub consequences: Vec<String>,
    /// Once set, never cleared.
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
    pub outcome: Option<String>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for a new story beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStoryBeat {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub beat_type: BeatType,
    #[serde(default)]
    pub importance: Importance,
    pub chapter: u32,
    pub act: u32,
    #[serde(default)]
    pub characters: Vec<Uuid>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub npcs: Vec<String>,
    #[serde(default)]
    pub consequences: Vec<String>,
}

impl NewStoryBeat {
    /// A beat with only the required fields set.
    #[must_use]
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        chapter: u32,
        act: u32,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            beat_type: BeatType::default(),
            importance: Importance::default(),
            chapter,
            act,
            characters: Vec::new(),
            location: None,
            npcs: Vec::new(),
            consequences: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_type(mut self, beat_type: BeatType) -> Self {
        self.beat_type = beat_type;
        self
    }

    #[must_use]
    pub fn with_importance(mut self, importance: Importance) -> Self {
        self.importance = importance;
        self
    }

    #[must_use]
    pub fn with_characters(mut self, characters: impl IntoIterator<Item = Uuid>) -> Self {
        self.characters = characters.into_iter().collect();
        self
    }

    #[must_use]
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    #[must_use]
    pub fn with_npcs(mut self, npcs: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.npcs = npcs.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_consequences(
        mut self,
        consequences: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.consequences = consequences.into_iter().map(Into::into).collect();
        self
    }

    pub(crate) fn into_beat(self, id: Uuid, now: DateTime<Utc>) -> StoryBeat {
        StoryBeat {
            id,
            title: self.title,
            description: self.description,
            beat_type: self.beat_type,
            importance: self.importance,
            chapter: self.chapter,
            act: self.act,
            characters: self.characters,
            location: self.location,
            npcs: self.npcs,
            consequences: self.consequences,
            completed: false,
            completed_at: None,
            outcome: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A recorded character-development event, optionally tied to a beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CharacterMilestone {
    pub character_id: Uuid,
    pub milestone_type: MilestoneType,
    pub title: String,
    pub description: String,
    pub impact: Importance,
    pub story_beat_id: Option<Uuid>,
    pub achieved_at: DateTime<Utc>,
    /// Opaque caller data, stored as-is.
    pub metadata: serde_json::Value,
}

/// Input for a new character milestone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewMilestone {
    pub character_id: Uuid,
    pub milestone_type: MilestoneType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub impact: Importance,
    #[serde(default)]
    pub story_beat_id: Option<Uuid>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

impl NewMilestone {
    /// A milestone with only the required fields set.
    #[must_use]
    pub fn new(
        character_id: Uuid,
        milestone_type: MilestoneType,
        title: impl Into<String>,
    ) -> Self {
        Self {
            character_id,
            milestone_type,
            title: title.into(),
            description: String::new(),
            impact: Importance::default(),
            story_beat_id: None,
            metadata: serde_json::Value::Null,
        }
    }

    #[must_use]
    pub fn for_beat(mut self, beat_id: Uuid) -> Self {
        self.story_beat_id = Some(beat_id);
        self
    }

    pub(crate) fn into_milestone(self, achieved_at: DateTime<Utc>) -> CharacterMilestone {
        CharacterMilestone {
            character_id: self.character_id,
            milestone_type: self.milestone_type,
            title: self.title,
            description: self.description,
            impact: self.impact,
            story_beat_id: self.story_beat_id,
            achieved_at,
            metadata: self.metadata,
        }
    }
}

/// A recorded alteration to the campaign's world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldStateChange {
    pub id: Uuid,
    pub change_type: WorldChangeType,
    pub title: String,
    pub description: String,
    pub impact: WorldImpact,
    /// Names of the world elements this change touches.
    pub affected_elements: Vec<String>,
    pub story_beat_id: Option<Uuid>,
    pub affected_characters: Vec<Uuid>,
    pub location: Option<String>,
    pub permanent: bool,
    pub occurred_at: DateTime<Utc>,
}

/// Input for a new world-state change. `occurred_at` defaults to the time
/// the change is recorded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewWorldChange {
    pub change_type: WorldChangeType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub impact: WorldImpact,
    #[serde(default)]
    pub affected_elements: Vec<String>,
    #[serde(default)]
    pub story_beat_id: Option<Uuid>,
    #[serde(default)]
    pub affected_characters: Vec<Uuid>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub permanent: bool,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
}

impl NewWorldChange {
    /// A change with only the required fields set.
    #[must_use]
    pub fn new(change_type: WorldChangeType, title: impl Into<String>) -> Self {
        Self {
            change_type,
            title: title.into(),
            description: String::new(),
            impact: WorldImpact::default(),
            affected_elements: Vec::new(),
            story_beat_id: None,
            affected_characters: Vec::new(),
            location: None,
            permanent: false,
            occurred_at: None,
        }
    }

    #[must_use]
    pub fn with_impact(mut self, impact: WorldImpact) -> Self {
        self.impact = impact;
        self
    }

    #[must_use]
    pub fn affecting(mut self, elements: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.affected_elements = elements.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn for_beat(mut self, beat_id: Uuid) -> Self {
        self.story_beat_id = Some(beat_id);
        self
    }

    #[must_use]
    pub fn permanent(mut self, permanent: bool) -> Self {
        self.permanent = permanent;
        self
    }

    #[must_use]
    pub fn occurred_at(mut self, at: DateTime<Utc>) -> Self {
        self.occurred_at = Some(at);
        self
    }

    pub(crate) fn into_change(self, id: Uuid, now: DateTime<Utc>) -> WorldStateChange {
        WorldStateChange {
            id,
            change_type: self.change_type,
            title: self.title,
            description: self.description,
            impact: self.impact,
            affected_elements: self.affected_elements,
            story_beat_id: self.story_beat_id,
            affected_characters: self.affected_characters,
            location: self.location,
            permanent: self.permanent,
            occurred_at: self.occurred_at.unwrap_or(now),
        }
    }
}

/// A single quest objective.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestObjective {
    pub description: String,
    pub completed: bool,
    pub completed_at: Option<DateTime<Utc>>,
}

impl QuestObjective {
    /// An open objective.
    #[must_use]
    pub fn open(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            completed: false,
            completed_at: None,
        }
    }
}

/// Association between an externally managed quest and the story arc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuestProgressLink {
    pub quest_id: Uuid,
    pub name: String,
    pub link_type: QuestLinkType,
    pub status: QuestStatus,
    pub story_beat_id: Option<Uuid>,
    pub objectives: Vec<QuestObjective>,
    pub story_impact: String,
    /// Characters whose development the quest drives.
    pub character_development: Vec<Uuid>,
    /// Descriptions of world changes the quest causes.
    pub world_changes: Vec<String>,
}

impl QuestProgressLink {
    /// An active link with no objectives.
    #[must_use]
    pub fn new(quest_id: Uuid, name: impl Into<String>, link_type: QuestLinkType) -> Self {
        Self {
            quest_id,
            name: name.into(),
            link_type,
            status: QuestStatus::Active,
            story_beat_id: None,
            objectives: Vec::new(),
            story_impact: String::new(),
            character_development: Vec::new(),
            world_changes: Vec::new(),
        }
    }
}

/// Partial update for a quest link. Only the listed fields can change;
/// `quest_id` is the lookup key and is never rewritten.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestLinkUpdate {
    pub name: Option<String>,
    pub link_type: Option<QuestLinkType>,
    pub status: Option<QuestStatus>,
    pub story_beat_id: Option<Uuid>,
    pub objectives: Option<Vec<QuestObjective>>,
    pub story_impact: Option<String>,
    pub character_development: Option<Vec<Uuid>>,
    pub world_changes: Option<Vec<String>>,
}

impl QuestLinkUpdate {
    /// Returns `true` if no field would change.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merges the set fields into `link`.
    pub(crate) fn merge_into(&self, link: &mut QuestProgressLink) {
        if let Some(name) = &self.name {
            link.name.clone_from(name);
        }
        if let Some(link_type) = self.link_type {
            link.link_type = link_type;
        }
        if let Some(status) = self.status {
            link.status = status;
        }
        if let Some(beat_id) = self.story_beat_id {
            link.story_beat_id = Some(beat_id);
        }
        if let Some(objectives) = &self.objectives {
            link.objectives.clone_from(objectives);
        }
        if let Some(impact) = &self.story_impact {
            link.story_impact.clone_from(impact);
        }
        if let Some(characters) = &self.character_development {
            link.character_development.clone_from(characters);
        }
        if let Some(changes) = &self.world_changes {
            link.world_changes.clone_from(changes);
        }
    }
}

/// Parameters for creating a story arc.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewStoryArc {
    pub campaign_id: Uuid,
    pub theme: String,
    pub tone: String,
    #[serde(default)]
    pub pacing: Pacing,
    #[serde(default = "default_total_chapters")]
    pub total_chapters: u32,
}

impl NewStoryArc {
    /// Parameters with moderate pacing and the default chapter count.
    #[must_use]
    pub fn new(campaign_id: Uuid, theme: impl Into<String>, tone: impl Into<String>) -> Self {
        Self {
            campaign_id,
            theme: theme.into(),
            tone: tone.into(),
            pacing: Pacing::default(),
            total_chapters: default_total_chapters(),
        }
    }

    #[must_use]
    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = pacing;
        self
    }

    #[must_use]
    pub fn with_total_chapters(mut self, total_chapters: u32) -> Self {
        self.total_chapters = total_chapters;
        self
    }
}

/// Chapter count used when none is given.
pub const DEFAULT_TOTAL_CHAPTERS: u32 = 10;

fn default_total_chapters() -> u32 {
    DEFAULT_TOTAL_CHAPTERS
}
