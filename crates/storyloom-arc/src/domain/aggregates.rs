//! Aggregate roots for the Story Arc context.

use chrono::{DateTime, Utc};
use storyloom_core::aggregate::{AggregateRoot, CampaignAggregate};
use storyloom_core::clock::Clock;
use storyloom_core::error::DomainError;
use storyloom_core::event::EventMetadata;
use uuid::Uuid;

use super::events::{
    BeatAdded, BeatCompleted, ChapterAdvanced, MilestoneAdded, QuestLinkUpdated, QuestLinked,
    StoryArcCreated, StoryArcEvent, StoryArcEventKind, WorldChangeAdded,
};
use super::types::{
    BeatType, CharacterMilestone, Importance, NewMilestone, NewStoryArc, NewStoryBeat,
    NewWorldChange, Pacing, QuestLinkUpdate, QuestProgressLink, StoryBeat, StoryPhase,
    WorldStateChange,
};

/// The aggregate root for a campaign's story arc.
///
/// Phase and act are never set directly: both are recomputed from the
/// chapter ratio whenever the chapter advances.
#[derive(Debug, Clone)]
pub struct StoryArc {
    /// Aggregate identifier.
    pub id: Uuid,
    pub(crate) campaign_id: Uuid,
    /// Current version (event count).
    pub(crate) version: i64,
    pub(crate) theme: String,
    pub(crate) tone: String,
    pub(crate) pacing: Pacing,
    pub(crate) story_phase: StoryPhase,
    pub(crate) current_chapter: u32,
    pub(crate) current_act: u32,
    pub(crate) total_chapters: u32,
    pub(crate) beats: Vec<StoryBeat>,
    pub(crate) milestones: Vec<CharacterMilestone>,
    pub(crate) world_changes: Vec<WorldStateChange>,
    pub(crate) quest_links: Vec<QuestProgressLink>,
    /// Always equal to the number of beats with `completed == true`.
    pub(crate) completed_story_beats: usize,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) updated_at: DateTime<Utc>,
    /// Uncommitted events pending persistence.
    uncommitted_events: Vec<StoryArcEvent>,
}

impl StoryArc {
    fn blank(id: Uuid, campaign_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            id,
            campaign_id,
            version: 0,
            theme: String::new(),
            tone: String::new(),
            pacing: Pacing::default(),
            story_phase: StoryPhase::Setup,
            current_chapter: 1,
            current_act: 1,
            total_chapters: 1,
            beats: Vec::new(),
            milestones: Vec::new(),
            world_changes: Vec::new(),
            quest_links: Vec::new(),
            completed_story_beats: 0,
            created_at: now,
            updated_at: now,
            uncommitted_events: Vec::new(),
        }
    }

    /// Creates the story arc for a campaign, seeded with an opening setup
    /// beat and a first-challenge beat in chapter 1, act 1.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if `total_chapters` is zero.
    pub fn create(
        params: NewStoryArc,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Result<Self, DomainError> {
        if params.total_chapters == 0 {
            return Err(DomainError::Validation(
                "story arc must have at least one chapter".to_owned(),
            ));
        }

        let now = clock.now();
        let id = Uuid::new_v4();
        let seeded_beats = vec![
            NewStoryBeat::new(
                "The Adventure Begins",
                "The heroes gather and the call to adventure is heard.",
                1,
                1,
            )
            .with_type(BeatType::Setup)
            .with_importance(Importance::Major)
            .into_beat(Uuid::new_v4(), now),
            NewStoryBeat::new(
                "The First Challenge",
                "An early obstacle tests the party's resolve and reveals what is at stake.",
                1,
                1,
            )
            .with_type(BeatType::Development)
            .with_importance(Importance::Moderate)
            .into_beat(Uuid::new_v4(), now),
        ];

        let mut arc = Self::blank(id, params.campaign_id, now);
        arc.record(
            StoryArcEventKind::Created(StoryArcCreated {
                story_arc_id: id,
                campaign_id: params.campaign_id,
                theme: params.theme,
                tone: params.tone,
                pacing: params.pacing,
                total_chapters: params.total_chapters,
                seeded_beats,
                created_at: now,
            }),
            correlation_id,
            now,
        );
        Ok(arc)
    }

    /// Builds the event envelope, applies it, and queues it for persistence.
    fn record(&mut self, kind: StoryArcEventKind, correlation_id: Uuid, now: DateTime<Utc>) {
        let event = StoryArcEvent {
            metadata: EventMetadata::caused_by_command(
                kind.event_type(),
                self.id,
                self.version + 1,
                correlation_id,
                now,
            ),
            kind,
        };
        self.apply(&event);
        self.uncommitted_events.push(event);
    }

    /// Appends a new, uncompleted beat and returns its id.
    ///
    /// Ids are random v4 UUIDs, so uniqueness is probabilistic. Chapter and
    /// act ordering is not checked here; the consistency validator reports
    /// out-of-order beats.
    pub fn add_beat(
        &mut self,
        data: NewStoryBeat,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Uuid {
        let now = clock.now();
        let beat_id = Uuid::new_v4();
        let beat = data.into_beat(beat_id, now);
        self.record(
            StoryArcEventKind::BeatAdded(BeatAdded { beat }),
            correlation_id,
            now,
        );
        beat_id
    }

    /// Completes a beat. Returns `false` without changing anything if the
    /// beat is unknown or already completed.
    pub fn complete_beat(
        &mut self,
        beat_id: Uuid,
        outcome: Option<String>,
        notes: Option<String>,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> bool {
        match self.beat(beat_id) {
            Some(beat) if !beat.completed => {}
            _ => return false,
        }

        let now = clock.now();
        self.record(
            StoryArcEventKind::BeatCompleted(BeatCompleted {
                beat_id,
                outcome,
                notes,
                completed_at: now,
            }),
            correlation_id,
            now,
        );
        true
    }

    /// Records a character milestone. Milestones have no uniqueness rule.
    pub fn add_milestone(&mut self, data: NewMilestone, correlation_id: Uuid, clock: &dyn Clock) {
        let now = clock.now();
        let milestone = data.into_milestone(now);
        self.record(
            StoryArcEventKind::MilestoneAdded(MilestoneAdded { milestone }),
            correlation_id,
            now,
        );
    }

    /// Records a world-state change and returns its id.
    pub fn add_world_change(
        &mut self,
        data: NewWorldChange,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> Uuid {
        let now = clock.now();
        let change_id = Uuid::new_v4();
        let change = data.into_change(change_id, now);
        self.record(
            StoryArcEventKind::WorldChangeAdded(WorldChangeAdded { change }),
            correlation_id,
            now,
        );
        change_id
    }

    /// Links a quest to the arc. Returns `false` if the quest is already
    /// linked.
    pub fn link_quest(
        &mut self,
        link: QuestProgressLink,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> bool {
        if self.quest_link(link.quest_id).is_some() {
            return false;
        }
        self.record(
            StoryArcEventKind::QuestLinked(QuestLinked { link }),
            correlation_id,
            clock.now(),
        );
        true
    }

    /// Merges `update` into the link for `quest_id`. Returns `false` if the
    /// quest is not linked.
    pub fn update_quest_link(
        &mut self,
        quest_id: Uuid,
        update: QuestLinkUpdate,
        correlation_id: Uuid,
        clock: &dyn Clock,
    ) -> bool {
        if self.quest_link(quest_id).is_none() {
            return false;
        }
        self.record(
            StoryArcEventKind::QuestLinkUpdated(QuestLinkUpdated { quest_id, update }),
            correlation_id,
            clock.now(),
        );
        true
    }

    /// Moves to the next chapter and re-derives phase and act. Returns
    /// `false` at the final chapter.
    pub fn advance_chapter(&mut self, correlation_id: Uuid, clock: &dyn Clock) -> bool {
        if self.is_final_chapter() {
            return false;
        }

        let to_chapter = self.current_chapter + 1;
        let story_phase = StoryPhase::from_chapter_ratio(to_chapter, self.total_chapters);
        self.record(
            StoryArcEventKind::ChapterAdvanced(ChapterAdvanced {
                from_chapter: self.current_chapter,
                to_chapter,
                story_phase,
                current_act: story_phase.act(),
            }),
            correlation_id,
            clock.now(),
        );
        true
    }

    // --- read access ---

    #[must_use]
    pub fn theme(&self) -> &str {
        &self.theme
    }

    #[must_use]
    pub fn tone(&self) -> &str {
        &self.tone
    }

    #[must_use]
    pub fn pacing(&self) -> Pacing {
        self.pacing
    }

    #[must_use]
    pub fn story_phase(&self) -> StoryPhase {
        self.story_phase
    }

    #[must_use]
    pub fn current_chapter(&self) -> u32 {
        self.current_chapter
    }

    #[must_use]
    pub fn current_act(&self) -> u32 {
        self.current_act
    }

    #[must_use]
    pub fn total_chapters(&self) -> u32 {
        self.total_chapters
    }

    #[must_use]
    pub fn beats(&self) -> &[StoryBeat] {
        &self.beats
    }

    #[must_use]
    pub fn milestones(&self) -> &[CharacterMilestone] {
        &self.milestones
    }

    #[must_use]
    pub fn world_changes(&self) -> &[WorldStateChange] {
        &self.world_changes
    }

    #[must_use]
    pub fn quest_links(&self) -> &[QuestProgressLink] {
        &self.quest_links
    }

    #[must_use]
    pub fn completed_story_beats(&self) -> usize {
        self.completed_story_beats
    }

    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Looks up a beat by id.
    #[must_use]
    pub fn beat(&self, beat_id: Uuid) -> Option<&StoryBeat> {
        self.beats.iter().find(|b| b.id == beat_id)
    }

    /// Looks up a quest link by quest id.
    #[must_use]
    pub fn quest_link(&self, quest_id: Uuid) -> Option<&QuestProgressLink> {
        self.quest_links.iter().find(|l| l.quest_id == quest_id)
    }

    /// Beats belonging to a chapter, in insertion order.
    pub fn beats_in_chapter(&self, chapter: u32) -> impl Iterator<Item = &StoryBeat> {
        self.beats.iter().filter(move |b| b.chapter == chapter)
    }

    /// Beats belonging to an act, in insertion order.
    pub fn beats_in_act(&self, act: u32) -> impl Iterator<Item = &StoryBeat> {
        self.beats.iter().filter(move |b| b.act == act)
    }

    /// Completed beats across the whole arc.
    pub fn completed_beats(&self) -> impl Iterator<Item = &StoryBeat> {
        self.beats.iter().filter(|b| b.completed)
    }

    /// Whether the arc has reached its last chapter.
    #[must_use]
    pub fn is_final_chapter(&self) -> bool {
        self.current_chapter >= self.total_chapters
    }
}

impl AggregateRoot for StoryArc {
    type Event = StoryArcEvent;

    fn aggregate_id(&self) -> Uuid {
        self.id
    }

    fn version(&self) -> i64 {
        self.version
    }

    fn apply(&mut self, event: &Self::Event) {
        match &event.kind {
            StoryArcEventKind::Created(payload) => {
                self.id = payload.story_arc_id;
                self.campaign_id = payload.campaign_id;
                self.theme.clone_from(&payload.theme);
                self.tone.clone_from(&payload.tone);
                self.pacing = payload.pacing;
                self.total_chapters = payload.total_chapters;
                self.current_chapter = 1;
                self.story_phase = StoryPhase::from_chapter_ratio(1, payload.total_chapters);
                self.current_act = self.story_phase.act();
                self.beats.clone_from(&payload.seeded_beats);
                self.completed_story_beats = 0;
                self.created_at = payload.created_at;
            }
            StoryArcEventKind::BeatAdded(payload) => {
                self.beats.push(payload.beat.clone());
            }
            StoryArcEventKind::BeatCompleted(payload) => {
                if let Some(beat) = self.beats.iter_mut().find(|b| b.id == payload.beat_id) {
                    beat.completed = true;
                    beat.completed_at = Some(payload.completed_at);
                    beat.updated_at = payload.completed_at;
                    if payload.outcome.is_some() {
                        beat.outcome.clone_from(&payload.outcome);
                    }
                    if payload.notes.is_some() {
                        beat.notes.clone_from(&payload.notes);
                    }
                }
                self.completed_story_beats = self.beats.iter().filter(|b| b.completed).count();
            }
            StoryArcEventKind::MilestoneAdded(payload) => {
                self.milestones.push(payload.milestone.clone());
            }
            StoryArcEventKind::WorldChangeAdded(payload) => {
                self.world_changes.push(payload.change.clone());
            }
            StoryArcEventKind::QuestLinked(payload) => {
                self.quest_links.push(payload.link.clone());
            }
            StoryArcEventKind::QuestLinkUpdated(payload) => {
                if let Some(link) = self
                    .quest_links
                    .iter_mut()
                    .find(|l| l.quest_id == payload.quest_id)
                {
                    payload.update.merge_into(link);
                }
            }
            StoryArcEventKind::ChapterAdvanced(payload) => {
                self.current_chapter = payload.to_chapter;
                self.story_phase = payload.story_phase;
                self.current_act = payload.current_act;
            }
        }
        self.updated_at = event.metadata.occurred_at;
        self.version += 1;
    }

    fn uncommitted_events(&self) -> &[Self::Event] {
        &self.uncommitted_events
    }

    fn clear_uncommitted_events(&mut self) {
        self.uncommitted_events.clear();
    }
}

impl CampaignAggregate for StoryArc {
    fn campaign_id(&self) -> Uuid {
        self.campaign_id
    }
}
