//! Story beat and improvement suggestions.
//!
//! Both suggestion kinds come from the narrative generator. Parsed output is
//! normalized field by field; anything the generator cannot deliver is
//! replaced by the fixed fallback sets defined here.

use serde::{Deserialize, Serialize};
use storyloom_core::generation::{GenerationError, GenerationTask};

use super::generation::{GeneratedContent, GeneratedPayload, parse_json};
use crate::domain::aggregates::StoryArc;
use crate::domain::types::{BeatType, Importance, StoryPhase};

/// How many recent beats and world changes are summarized in a prompt.
const RECENT_CONTEXT: usize = 5;

/// Reasoning used when the generator omits one.
pub const DEFAULT_REASONING: &str = "AI-generated suggestion";

/// A proposed story beat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoryBeatSuggestion {
    pub title: String,
    pub description: String,
    pub beat_type: BeatType,
    pub importance: Importance,
    pub consequences: Vec<String>,
    pub npcs: Vec<String>,
    pub objectives: Vec<String>,
    pub reasoning: String,
}

/// Context for a beat suggestion request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BeatSuggestionRequest {
    pub theme: String,
    pub tone: String,
    pub current_chapter: u32,
    pub current_act: u32,
    pub story_phase: StoryPhase,
    /// `title: description` of the most recent completed beats, oldest first.
    pub recent_beats: Vec<String>,
    /// Titles of the most recent world-state changes, oldest first.
    pub world_state: Vec<String>,
    /// Optional steer from the game master.
    pub focus: Option<String>,
}

impl BeatSuggestionRequest {
    /// Builds a request from the arc's current position and recent history.
    #[must_use]
    pub fn from_arc(arc: &StoryArc) -> Self {
        let completed: Vec<String> = arc
            .completed_beats()
            .map(|b| format!("{}: {}", b.title, b.description))
            .collect();
        let world_state: Vec<String> = arc
            .world_changes()
            .iter()
            .map(|c| format!("{} ({:?}, {:?} impact)", c.title, c.change_type, c.impact))
            .collect();

        Self {
            theme: arc.theme().to_owned(),
            tone: arc.tone().to_owned(),
            current_chapter: arc.current_chapter(),
            current_act: arc.current_act(),
            story_phase: arc.story_phase(),
            recent_beats: tail(completed, RECENT_CONTEXT),
            world_state: tail(world_state, RECENT_CONTEXT),
            focus: None,
        }
    }

    /// Adds a game-master steer to the request.
    #[must_use]
    pub fn with_focus(mut self, focus: impl Into<String>) -> Self {
        self.focus = Some(focus.into());
        self
    }
}

fn tail(mut items: Vec<String>, n: usize) -> Vec<String> {
    let skip = items.len().saturating_sub(n);
    items.drain(..skip);
    items
}

fn bullet_list(items: &[String], empty: &str) -> String {
    if items.is_empty() {
        empty.to_owned()
    } else {
        format!("- {}", items.join("\n- "))
    }
}

pub(crate) fn beat_suggestion_prompt(request: &BeatSuggestionRequest, count: usize) -> String {
    let focus = request
        .focus
        .as_deref()
        .map(|f| format!("\n## Game Master Focus\n{f}\n"))
        .unwrap_or_default();

    format!(
        r#"You are helping a game master plan the next story beats of a tabletop campaign.

## Story Context
Theme: {theme}
Tone: {tone}
Chapter: {chapter}
Act: {act}
Story phase: {phase}

## Recently Completed Beats
{beats}

## World State
{world}
{focus}
Suggest {count} story beats that follow naturally from this context.

Respond with ONLY a JSON array. Each element must have:
"title", "description", "type" (one of setup, development, climax, resolution, twist, character, world),
"importance" (one of minor, moderate, major, critical), "consequences" (array of strings),
"npcs" (array of strings), "objectives" (array of strings), "reasoning" (string)."#,
        theme = request.theme,
        tone = request.tone,
        chapter = request.current_chapter,
        act = request.current_act,
        phase = request.story_phase,
        beats = bullet_list(&request.recent_beats, "None yet."),
        world = bullet_list(&request.world_state, "No recorded changes."),
    )
}

/// Raw suggestion as the generator writes it. Every field is optional.
#[derive(Debug, Deserialize)]
struct RawBeatSuggestion {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "type", alias = "beat_type")]
    beat_type: Option<String>,
    importance: Option<String>,
    consequences: Option<Vec<String>>,
    npcs: Option<Vec<String>>,
    objectives: Option<Vec<String>>,
    reasoning: Option<String>,
}

impl RawBeatSuggestion {
    fn normalize(self) -> StoryBeatSuggestion {
        StoryBeatSuggestion {
            title: non_empty(self.title).unwrap_or_else(|| "Untitled Story Beat".to_owned()),
            description: self.description.unwrap_or_default(),
            beat_type: self
                .beat_type
                .and_then(|t| t.parse().ok())
                .unwrap_or(BeatType::Development),
            importance: self
                .importance
                .and_then(|i| i.parse().ok())
                .unwrap_or(Importance::Moderate),
            consequences: self.consequences.unwrap_or_default(),
            npcs: self.npcs.unwrap_or_default(),
            objectives: self.objectives.unwrap_or_default(),
            reasoning: non_empty(self.reasoning).unwrap_or_else(|| DEFAULT_REASONING.to_owned()),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Accepts either a bare array or an object wrapping it.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawBeatSuggestions {
    List(Vec<RawBeatSuggestion>),
    Wrapped { suggestions: Vec<RawBeatSuggestion> },
}

/// Parsed output of a beat suggestion request.
#[derive(Debug, Clone, PartialEq)]
pub struct BeatSuggestionBatch(pub Vec<StoryBeatSuggestion>);

impl GeneratedPayload for BeatSuggestionBatch {
    const TASK: GenerationTask = GenerationTask::StoryBeatSuggestions;

    fn from_content(content: GeneratedContent) -> Option<Self> {
        match content {
            GeneratedContent::BeatSuggestions(suggestions) => Some(Self(suggestions)),
            _ => None,
        }
    }

    fn parse(content: &str) -> Result<Self, GenerationError> {
        let raw = match parse_json::<RawBeatSuggestions>(content)? {
            RawBeatSuggestions::List(list) | RawBeatSuggestions::Wrapped { suggestions: list } => {
                list
            }
        };
        if raw.is_empty() {
            return Err(GenerationError::Parse("suggestion list is empty".to_owned()));
        }
        Ok(Self(raw.into_iter().map(RawBeatSuggestion::normalize).collect()))
    }
}

/// The three suggestions returned whenever the generator cannot deliver.
#[must_use]
pub fn fallback_beat_suggestions() -> Vec<StoryBeatSuggestion> {
    vec![
        StoryBeatSuggestion {
            title: "A Mysterious Stranger".to_owned(),
            description: "A hooded figure approaches the party with cryptic knowledge of their quest."
                .to_owned(),
            beat_type: BeatType::Development,
            importance: Importance::Moderate,
            consequences: vec!["The party learns a new lead about the main plot".to_owned()],
            npcs: vec!["Mysterious Stranger".to_owned()],
            objectives: vec!["Discover what the stranger knows".to_owned()],
            reasoning: "Introduces a fresh hook that can tie into existing threads".to_owned(),
        },
        StoryBeatSuggestion {
            title: "Rising Tensions".to_owned(),
            description: "A rival faction makes its move, raising the stakes for the party."
                .to_owned(),
            beat_type: BeatType::Development,
            importance: Importance::Major,
            consequences: vec!["A faction becomes openly hostile".to_owned()],
            npcs: vec!["Faction Leader".to_owned()],
            objectives: vec!["Counter the faction's plan".to_owned()],
            reasoning: "Escalates conflict to keep the story moving toward its climax".to_owned(),
        },
        StoryBeatSuggestion {
            title: "A Moment of Reflection".to_owned(),
            description: "The party rests and a character confronts a personal struggle."
                .to_owned(),
            beat_type: BeatType::Character,
            importance: Importance::Minor,
            consequences: vec!["A character gains insight into their motivation".to_owned()],
            npcs: Vec::new(),
            objectives: vec!["Explore a character's backstory".to_owned()],
            reasoning: "Gives room for character development between action beats".to_owned(),
        },
    ]
}

/// Categorized story improvement advice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoryImprovements {
    pub pacing: Vec<String>,
    pub character_development: Vec<String>,
    pub world_building: Vec<String>,
    pub plot_structure: Vec<String>,
}

/// Advice returned whenever the generator cannot deliver.
#[must_use]
pub fn fallback_story_improvements() -> StoryImprovements {
    StoryImprovements {
        pacing: vec![
            "Balance combat, exploration and roleplay within each session".to_owned(),
            "Consider ending sessions on a hook to keep momentum".to_owned(),
        ],
        character_development: vec![
            "Give each character a personal goal tied to the main plot".to_owned(),
            "Review character backstories for threads to weave into upcoming beats".to_owned(),
        ],
        world_building: vec![
            "Let major events leave visible marks on locations and factions".to_owned(),
            "Introduce recurring NPCs so the world feels lived-in".to_owned(),
        ],
        plot_structure: vec![
            "Foreshadow the climax in earlier chapters".to_owned(),
            "Make sure each chapter has at least one major beat that advances the main plot"
                .to_owned(),
        ],
    }
}

/// Raw improvements as the generator writes them.
#[derive(Debug, Deserialize)]
struct RawImprovements {
    pacing: Option<Vec<String>>,
    #[serde(alias = "characterDevelopment")]
    character_development: Option<Vec<String>>,
    #[serde(alias = "worldBuilding")]
    world_building: Option<Vec<String>>,
    #[serde(alias = "plotStructure")]
    plot_structure: Option<Vec<String>>,
}

impl GeneratedPayload for StoryImprovements {
    const TASK: GenerationTask = GenerationTask::StoryImprovements;

    fn from_content(content: GeneratedContent) -> Option<Self> {
        match content {
            GeneratedContent::Improvements(improvements) => Some(improvements),
            _ => None,
        }
    }

    fn parse(content: &str) -> Result<Self, GenerationError> {
        let raw: RawImprovements = parse_json(content)?;
        let fallback = fallback_story_improvements();
        let pick = |parsed: Option<Vec<String>>, default: Vec<String>| {
            parsed.filter(|v| !v.is_empty()).unwrap_or(default)
        };
        Ok(Self {
            pacing: pick(raw.pacing, fallback.pacing),
            character_development: pick(raw.character_development, fallback.character_development),
            world_building: pick(raw.world_building, fallback.world_building),
            plot_structure: pick(raw.plot_structure, fallback.plot_structure),
        })
    }
}

pub(crate) fn improvement_prompt(arc: &StoryArc) -> String {
    let completed: Vec<String> = arc.completed_beats().map(|b| b.title.clone()).collect();
    let pending: Vec<String> = arc
        .beats()
        .iter()
        .filter(|b| !b.completed)
        .map(|b| b.title.clone())
        .collect();

    format!(
        r#"You are reviewing the story arc of a tabletop campaign and advising the game master.

## Story Arc
Theme: {theme}
Tone: {tone}
Pacing: {pacing}
Chapter {chapter} of {total}, act {act}, {phase} phase
Completed beats ({completed_count}):
{completed}
Pending beats ({pending_count}):
{pending}
Character milestones: {milestones}
World-state changes: {changes}
Linked quests: {quests}

Respond with ONLY a JSON object with the keys "pacing", "characterDevelopment",
"worldBuilding" and "plotStructure", each an array of short, actionable suggestions."#,
        theme = arc.theme(),
        tone = arc.tone(),
        pacing = arc.pacing().as_str(),
        chapter = arc.current_chapter(),
        total = arc.total_chapters(),
        act = arc.current_act(),
        phase = arc.story_phase(),
        completed_count = completed.len(),
        completed = bullet_list(&tail(completed.clone(), RECENT_CONTEXT * 2), "None yet."),
        pending_count = pending.len(),
        pending = bullet_list(&pending, "None."),
        milestones = arc.milestones().len(),
        changes = arc.world_changes().len(),
        quests = arc.quest_links().len(),
    )
}
