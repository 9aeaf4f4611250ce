//! The standard heuristic rules.
//!
//! Each rule is a pure function of the arc snapshot wrapped in a unit
//! struct. Thresholds are the documented heuristics.

use std::collections::{BTreeMap, HashMap, HashSet};

use async_trait::async_trait;
use uuid::Uuid;

use super::{ConsistencyRule, Findings, RuleError, RuleOutcome, Severity};
use crate::domain::aggregates::StoryArc;
use crate::domain::types::{
    MilestoneType, Pacing, QuestLinkType, QuestStatus, StoryBeat, WorldImpact, WorldStateChange,
};

/// Minimum beat counts per act below which more beats are suggested.
const ACT_TARGETS: [(u32, usize, &str); 3] = [
    (1, 2, "setup"),
    (2, 3, "development"),
    (3, 2, "climax"),
];
const MAX_CHAPTER_GAP: u32 = 2;

const LOW_COMPLETION_RATIO: f64 = 0.2;
const HIGH_COMPLETION_RATIO: f64 = 0.8;

const MILESTONE_TARGETS: [(MilestoneType, usize, &str); 3] = [
    (MilestoneType::Level, 2, "level"),
    (MilestoneType::Relationship, 2, "relationship"),
    (MilestoneType::Story, 3, "story"),
];

const MIN_LINKED_CHANGE_RATIO: f64 = 0.7;

const QUEST_TARGETS: [(QuestLinkType, usize, &str); 3] = [
    (QuestLinkType::Setup, 1, "setup"),
    (QuestLinkType::Development, 2, "development"),
    (QuestLinkType::Climax, 1, "climax"),
];
const MIN_QUEST_COMPLETION_RATIO: f64 = 0.3;

const MAX_PROGRESS_DIVERGENCE: f64 = 0.2;
const FAST_PACING_MIN_PROGRESS: f64 = 0.3;
const SLOW_PACING_MAX_PROGRESS: f64 = 0.7;

const MIN_RELATIONSHIP_MILESTONES: usize = 2;
const MIN_DISTINCT_CHARACTERS: usize = 2;
const MAX_MILESTONE_SPREAD: usize = 3;

#[allow(clippy::cast_precision_loss)]
fn ratio(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

fn percent(ratio: f64) -> String {
    format!("{:.0}%", ratio * 100.0)
}

/// Implements `ConsistencyRule` for a unit struct backed by a sync check.
macro_rules! heuristic_rule {
    ($rule:ident, $id:literal, $name:literal, $severity:expr, $check:ident) => {
        #[async_trait]
        impl ConsistencyRule for $rule {
            fn id(&self) -> &str {
                $id
            }

            fn name(&self) -> &str {
                $name
            }

            fn severity(&self) -> Severity {
                $severity
            }

            async fn evaluate(&self, arc: &StoryArc) -> Result<RuleOutcome, RuleError> {
                Ok($check(arc).into_outcome())
            }
        }
    };
}

/// Beats must not step backwards in chapter or act, and each act should
/// carry enough beats.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureProgressionRule;

heuristic_rule!(
    StructureProgressionRule,
    "structure_progression",
    "Story Structure Progression",
    Severity::Error,
    check_structure_progression
);

fn check_structure_progression(arc: &StoryArc) -> Findings {
    let mut findings = Findings::default();
    let mut beats: Vec<&StoryBeat> = arc.beats().iter().collect();
    beats.sort_by_key(|b| (b.chapter, b.act));

    for pair in beats.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        if cur.chapter < prev.chapter {
            findings.issue(format!(
                "Beat \"{}\" (chapter {}) comes after \"{}\" (chapter {})",
                cur.title, cur.chapter, prev.title, prev.chapter
            ));
        }
        if cur.act < prev.act {
            findings.issue(format!(
                "Beat \"{}\" in chapter {} falls back to act {} after act {}",
                cur.title, cur.chapter, cur.act, prev.act
            ));
        }
        if cur.chapter - prev.chapter > MAX_CHAPTER_GAP {
            findings.warning(format!(
                "Chapters {} to {} have no story beats",
                prev.chapter + 1,
                cur.chapter - 1
            ));
        }
    }

    for (act, target, label) in ACT_TARGETS {
        let count = beats.iter().filter(|b| b.act == act).count();
        if count < target {
            findings.suggestion(format!(
                "Consider adding more {label} beats to act {act} ({count}/{target})"
            ));
        }
    }
    findings
}

/// Completed beats should record what happened, who was there and where.
#[derive(Debug, Clone, Copy, Default)]
pub struct BeatCompletionRule;

heuristic_rule!(
    BeatCompletionRule,
    "beat_completion",
    "Story Beat Completion",
    Severity::Warning,
    check_beat_completion
);

fn check_beat_completion(arc: &StoryArc) -> Findings {
    let mut findings = Findings::default();
    for beat in arc.completed_beats() {
        if beat.consequences.is_empty() {
            findings.warning(format!(
                "Completed beat \"{}\" has no recorded consequences",
                beat.title
            ));
        }
        if beat.characters.is_empty() {
            findings.warning(format!("Completed beat \"{}\" involves no characters", beat.title));
        }
        if beat.location.as_deref().is_none_or(|l| l.trim().is_empty()) {
            findings.warning(format!("Completed beat \"{}\" has no location", beat.title));
        }
    }

    let total = arc.beats().len();
    if total > 0 {
        let completion = ratio(arc.completed_story_beats(), total);
        if completion < LOW_COMPLETION_RATIO {
            findings.suggestion(format!(
                "Consider completing more story beats to keep momentum ({} complete)",
                percent(completion)
            ));
        } else if completion > HIGH_COMPLETION_RATIO {
            findings.suggestion(format!(
                "Consider planning new story beats ahead of the players ({} complete)",
                percent(completion)
            ));
        }
    }
    findings
}

/// Completed beats should leave a mark on at least one character.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharacterDevelopmentTrackingRule;

heuristic_rule!(
    CharacterDevelopmentTrackingRule,
    "character_development_tracking",
    "Character Development Tracking",
    Severity::Warning,
    check_character_development
);

fn check_character_development(arc: &StoryArc) -> Findings {
    let mut findings = Findings::default();
    let linked: HashSet<Uuid> = arc
        .milestones()
        .iter()
        .filter_map(|m| m.story_beat_id)
        .collect();

    for beat in arc.completed_beats() {
        if !linked.contains(&beat.id) {
            findings.warning(format!(
                "Completed beat \"{}\" has no character milestone",
                beat.title
            ));
        }
    }

    for (milestone_type, target, label) in MILESTONE_TARGETS {
        let count = arc
            .milestones()
            .iter()
            .filter(|m| m.milestone_type == milestone_type)
            .count();
        if count < target {
            findings.suggestion(format!(
                "Consider adding more {label} milestones ({count}/{target})"
            ));
        }
    }
    findings
}

/// World-state changes must not contradict earlier changes to the same
/// elements.
#[derive(Debug, Clone, Copy, Default)]
pub struct WorldStateConsistencyRule;

heuristic_rule!(
    WorldStateConsistencyRule,
    "world_state_consistency",
    "World State Consistency",
    Severity::Error,
    check_world_state
);

fn shared_element<'a>(prev: &'a WorldStateChange, cur: &WorldStateChange) -> Option<&'a str> {
    prev.affected_elements
        .iter()
        .find(|e| cur.affected_elements.contains(e))
        .map(String::as_str)
}

fn check_world_state(arc: &StoryArc) -> Findings {
    let mut findings = Findings::default();
    let mut changes: Vec<&WorldStateChange> = arc.world_changes().iter().collect();
    changes.sort_by_key(|c| c.occurred_at);

    for pair in changes.windows(2) {
        let (prev, cur) = (pair[0], pair[1]);
        let Some(element) = shared_element(prev, cur) else {
            continue;
        };
        if prev.impact == WorldImpact::Catastrophic && cur.impact == WorldImpact::Minor {
            findings.issue(format!(
                "\"{}\" treats {element} as minor after the catastrophic \"{}\"",
                cur.title, prev.title
            ));
        }
        if prev.permanent && !cur.permanent {
            findings.warning(format!(
                "\"{}\" is temporary but follows the permanent change \"{}\" to {element}",
                cur.title, prev.title
            ));
        }
    }

    if !changes.is_empty() {
        let linked = changes.iter().filter(|c| c.story_beat_id.is_some()).count();
        let linked_ratio = ratio(linked, changes.len());
        if linked_ratio < MIN_LINKED_CHANGE_RATIO {
            findings.suggestion(format!(
                "Consider linking more world-state changes to story beats ({} linked)",
                percent(linked_ratio)
            ));
        }
    }
    findings
}

/// Linked quests should be tied into the beat structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct QuestStoryIntegrationRule;

heuristic_rule!(
    QuestStoryIntegrationRule,
    "quest_story_integration",
    "Quest Story Integration",
    Severity::Warning,
    check_quest_integration
);

fn check_quest_integration(arc: &StoryArc) -> Findings {
    let mut findings = Findings::default();
    let quests = arc.quest_links();

    for quest in quests {
        if quest.status == QuestStatus::Active && quest.story_beat_id.is_none() {
            findings.warning(format!(
                "Active quest \"{}\" is not linked to a story beat",
                quest.name
            ));
        }
    }

    for (link_type, target, label) in QUEST_TARGETS {
        let count = quests.iter().filter(|q| q.link_type == link_type).count();
        if count < target {
            findings.suggestion(format!(
                "Consider adding {label} quests to support the arc ({count}/{target})"
            ));
        }
    }

    let completed = quests
        .iter()
        .filter(|q| q.status == QuestStatus::Completed)
        .count();
    let completion = ratio(completed, quests.len());
    if completion < MIN_QUEST_COMPLETION_RATIO {
        findings.suggestion(format!(
            "Review open quests: only {} of linked quests are completed",
            percent(completion)
        ));
    }
    findings
}

/// Beat completion should keep pace with chapter progress and the
/// configured pacing.
#[derive(Debug, Clone, Copy, Default)]
pub struct StoryPacingRule;

heuristic_rule!(
    StoryPacingRule,
    "story_pacing",
    "Story Pacing",
    Severity::Info,
    check_pacing
);

#[allow(clippy::cast_precision_loss)]
fn check_pacing(arc: &StoryArc) -> Findings {
    let mut findings = Findings::default();
    let chapter_progress =
        f64::from(arc.current_chapter()) / f64::from(arc.total_chapters().max(1));
    let beat_progress = ratio(arc.completed_story_beats(), arc.beats().len());

    if (chapter_progress - beat_progress).abs() > MAX_PROGRESS_DIVERGENCE {
        findings.warning(format!(
            "Chapter progress ({}) and beat completion ({}) are out of step",
            percent(chapter_progress),
            percent(beat_progress)
        ));
    }

    match arc.pacing() {
        Pacing::Fast if chapter_progress < FAST_PACING_MIN_PROGRESS => {
            findings
                .suggestion("Consider introducing major events sooner to match the fast pacing");
        }
        Pacing::Slow if chapter_progress > SLOW_PACING_MAX_PROGRESS => {
            findings.suggestion(
                "Consider giving the closing chapters more room to match the slow pacing",
            );
        }
        _ => {}
    }

    let mut per_chapter: BTreeMap<u32, usize> = BTreeMap::new();
    for beat in arc.beats() {
        *per_chapter.entry(beat.chapter).or_default() += 1;
    }
    if !per_chapter.is_empty() {
        let average = arc.beats().len() as f64 / per_chapter.len() as f64;
        for (chapter, count) in &per_chapter {
            let count_f = *count as f64;
            if count_f > average * 2.0 {
                findings.suggestion(format!(
                    "Review chapter {chapter}: {count} beats is well above the average of {average:.1}"
                ));
            } else if count_f < average * 0.5 {
                findings.suggestion(format!(
                    "Consider fleshing out chapter {chapter}: {count} beats against an average of {average:.1}"
                ));
            }
        }
    }
    findings
}

/// Characters should develop relationships and grow at a comparable rate.
#[derive(Debug, Clone, Copy, Default)]
pub struct CharacterRelationshipRule;

heuristic_rule!(
    CharacterRelationshipRule,
    "character_relationship_development",
    "Character Relationship Development",
    Severity::Info,
    check_relationships
);

fn check_relationships(arc: &StoryArc) -> Findings {
    let mut findings = Findings::default();

    let relationship_milestones = arc
        .milestones()
        .iter()
        .filter(|m| m.milestone_type == MilestoneType::Relationship)
        .count();
    if relationship_milestones < MIN_RELATIONSHIP_MILESTONES {
        findings.suggestion(format!(
            "Consider adding relationship milestones to deepen character bonds ({relationship_milestones}/{MIN_RELATIONSHIP_MILESTONES})"
        ));
    }

    let characters: HashSet<Uuid> = arc
        .beats()
        .iter()
        .flat_map(|b| b.characters.iter().copied())
        .collect();
    if characters.len() < MIN_DISTINCT_CHARACTERS {
        findings.warning(format!(
            "Only {} character(s) appear in story beats; relationships need at least {MIN_DISTINCT_CHARACTERS}",
            characters.len()
        ));
    }

    let mut per_character: HashMap<Uuid, usize> = HashMap::new();
    for milestone in arc.milestones() {
        *per_character.entry(milestone.character_id).or_default() += 1;
    }
    if per_character.len() >= 2 {
        let most = per_character.values().copied().max().unwrap_or_default();
        let fewest = per_character.values().copied().min().unwrap_or_default();
        if most - fewest > MAX_MILESTONE_SPREAD {
            findings.suggestion(format!(
                "Review character focus: milestone counts range from {fewest} to {most} across characters"
            ));
        }
    }
    findings
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{
        Importance, NewMilestone, NewStoryArc, NewStoryBeat, NewWorldChange, QuestProgressLink,
        WorldChangeType,
    };
    use chrono::{DateTime, TimeZone, Utc};
    use storyloom_test_support::FixedClock;

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn at_hour(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 15, hour, 0, 0).unwrap()
    }

    fn new_arc() -> StoryArc {
        let params = NewStoryArc::new(Uuid::new_v4(), "Redemption", "grim");
        StoryArc::create(params, Uuid::new_v4(), &fixed_clock()).unwrap()
    }

    async fn run(rule: &dyn ConsistencyRule, arc: &StoryArc) -> RuleOutcome {
        rule.evaluate(arc).await.unwrap()
    }

    // --- structure_progression ---

    #[tokio::test]
    async fn test_structure_flags_act_regression_and_chapter_gap() {
        // Arrange
        let clock = fixed_clock();
        let mut arc = new_arc();
        arc.add_beat(NewStoryBeat::new("Siege", "", 2, 2), Uuid::new_v4(), &clock);
        arc.add_beat(NewStoryBeat::new("Flashback", "", 3, 1), Uuid::new_v4(), &clock);
        arc.add_beat(NewStoryBeat::new("Finale", "", 7, 3), Uuid::new_v4(), &clock);

        // Act
        let outcome = run(&StructureProgressionRule, &arc).await;

        // Assert
        assert_eq!(outcome.issues.len(), 1);
        assert!(outcome.issues[0].contains("Flashback"));
        assert_eq!(outcome.warnings, vec!["Chapters 4 to 6 have no story beats".to_owned()]);
        assert!(!outcome.passed);
        assert_eq!(outcome.score, 80);
    }

    #[tokio::test]
    async fn test_structure_suggests_beats_for_thin_acts() {
        let outcome = run(&StructureProgressionRule, &new_arc()).await;

        assert!(outcome.passed);
        assert_eq!(outcome.suggestions.len(), 2);
        assert!(outcome.suggestions[0].contains("development beats to act 2 (0/3)"));
        assert!(outcome.suggestions[1].contains("climax beats to act 3 (0/2)"));
    }

    // --- beat_completion ---

    #[tokio::test]
    async fn test_bare_completed_beat_draws_three_warnings() {
        // Arrange
        let mut arc = new_arc();
        let id = arc.beats()[0].id;
        arc.complete_beat(id, None, None, Uuid::new_v4(), &fixed_clock());

        // Act
        let outcome = run(&BeatCompletionRule, &arc).await;

        // Assert
        assert_eq!(outcome.warnings.len(), 3);
        assert!(outcome.passed);
        assert_eq!(outcome.score, 85);
        assert!(outcome.suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_low_completion_ratio_suggests_momentum() {
        let outcome = run(&BeatCompletionRule, &new_arc()).await;

        assert_eq!(outcome.suggestions.len(), 1);
        assert!(outcome.suggestions[0].starts_with("Consider completing more story beats"));
    }

    // --- character_development_tracking ---

    #[tokio::test]
    async fn test_completed_beat_without_milestone_is_warned() {
        // Arrange
        let clock = fixed_clock();
        let mut arc = new_arc();
        let (first, second) = (arc.beats()[0].id, arc.beats()[1].id);
        arc.complete_beat(first, None, None, Uuid::new_v4(), &clock);
        arc.complete_beat(second, None, None, Uuid::new_v4(), &clock);
        arc.add_milestone(
            NewMilestone::new(Uuid::new_v4(), MilestoneType::Level, "Level 2").for_beat(first),
            Uuid::new_v4(),
            &clock,
        );

        // Act
        let outcome = run(&CharacterDevelopmentTrackingRule, &arc).await;

        // Assert
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("The First Challenge"));
        assert_eq!(outcome.suggestions.len(), 3);
        assert!(outcome.suggestions[0].contains("level milestones (1/2)"));
    }

    // --- world_state_consistency ---

    #[tokio::test]
    async fn test_catastrophic_then_minor_change_is_contradiction() {
        // Arrange
        let clock = fixed_clock();
        let mut arc = new_arc();
        // Added out of order; the rule sorts by occurrence.
        arc.add_world_change(
            NewWorldChange::new(WorldChangeType::Location, "Ash settles")
                .with_impact(WorldImpact::Minor)
                .affecting(["Riverford"])
                .permanent(false)
                .occurred_at(at_hour(14)),
            Uuid::new_v4(),
            &clock,
        );
        arc.add_world_change(
            NewWorldChange::new(WorldChangeType::Event, "Riverford burns")
                .with_impact(WorldImpact::Catastrophic)
                .affecting(["Riverford", "Old Mill"])
                .permanent(true)
                .occurred_at(at_hour(12)),
            Uuid::new_v4(),
            &clock,
        );

        // Act
        let outcome = run(&WorldStateConsistencyRule, &arc).await;

        // Assert
        assert_eq!(outcome.issues.len(), 1);
        assert!(outcome.issues[0].contains("Riverford"));
        assert_eq!(outcome.warnings.len(), 1);
        assert!(!outcome.passed);
        assert_eq!(outcome.score, 80);
        assert_eq!(outcome.suggestions.len(), 1);
    }

    #[tokio::test]
    async fn test_unrelated_changes_do_not_conflict() {
        // Arrange
        let clock = fixed_clock();
        let mut arc = new_arc();
        let beat = arc.beats()[0].id;
        for (title, element, impact) in [
            ("Dragon wakes", "Mountain", WorldImpact::Catastrophic),
            ("Market reopens", "Harbor", WorldImpact::Minor),
        ] {
            arc.add_world_change(
                NewWorldChange::new(WorldChangeType::Event, title)
                    .with_impact(impact)
                    .affecting([element])
                    .for_beat(beat),
                Uuid::new_v4(),
                &clock,
            );
        }

        // Act
        let outcome = run(&WorldStateConsistencyRule, &arc).await;

        // Assert
        assert!(outcome.issues.is_empty());
        assert!(outcome.warnings.is_empty());
        assert!(outcome.suggestions.is_empty());
        assert_eq!(outcome.score, 100);
    }

    // --- quest_story_integration ---

    #[tokio::test]
    async fn test_unlinked_active_quest_is_warned() {
        // Arrange
        let clock = fixed_clock();
        let mut arc = new_arc();
        let beat = arc.beats()[0].id;
        let mut linked =
            QuestProgressLink::new(Uuid::new_v4(), "Find the heir", QuestLinkType::Setup);
        linked.story_beat_id = Some(beat);
        arc.link_quest(linked, Uuid::new_v4(), &clock);
        arc.link_quest(
            QuestProgressLink::new(Uuid::new_v4(), "Clear the mine", QuestLinkType::Development),
            Uuid::new_v4(),
            &clock,
        );

        // Act
        let outcome = run(&QuestStoryIntegrationRule, &arc).await;

        // Assert
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("Clear the mine"));
        assert!(outcome.suggestions.iter().any(|s| s.contains("development quests (1/2)")));
        assert!(outcome.suggestions.iter().any(|s| s.contains("climax quests (0/1)")));
        assert!(outcome.suggestions.iter().any(|s| s.starts_with("Review open quests")));
    }

    #[tokio::test]
    async fn test_arc_without_quests_gets_every_shortfall_suggestion() {
        let outcome = run(&QuestStoryIntegrationRule, &new_arc()).await;

        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.suggestions.len(), 4);
        assert!(outcome.suggestions.iter().any(|s| s.contains("setup quests (0/1)")));
        assert!(outcome.suggestions.iter().any(|s| s.contains("development quests (0/2)")));
        assert!(outcome.suggestions.iter().any(|s| s.contains("climax quests (0/1)")));
        assert!(outcome.suggestions.iter().any(|s| s.starts_with("Review open quests")));
        assert!(outcome.passed);
        assert_eq!(outcome.score, 100);
    }

    // --- story_pacing ---

    #[tokio::test]
    async fn test_pacing_flags_divergence_and_fast_start() {
        // Arrange
        let clock = fixed_clock();
        let params = NewStoryArc::new(Uuid::new_v4(), "Heist", "tense")
            .with_pacing(Pacing::Fast)
            .with_total_chapters(10);
        let mut arc = StoryArc::create(params, Uuid::new_v4(), &clock).unwrap();
        let ids: Vec<Uuid> = arc.beats().iter().map(|b| b.id).collect();
        for id in ids {
            arc.complete_beat(id, None, None, Uuid::new_v4(), &clock);
        }

        // Act
        let outcome = run(&StoryPacingRule, &arc).await;

        // Assert
        assert_eq!(outcome.warnings.len(), 1);
        assert!(outcome.warnings[0].contains("(10%)"));
        assert!(outcome.warnings[0].contains("(100%)"));
        assert!(outcome.suggestions.iter().any(|s| s.contains("fast pacing")));
    }

    #[tokio::test]
    async fn test_slow_pacing_late_in_arc_is_suggested() {
        // Arrange
        let clock = fixed_clock();
        let params = NewStoryArc::new(Uuid::new_v4(), "Pilgrimage", "wistful")
            .with_pacing(Pacing::Slow)
            .with_total_chapters(10);
        let mut arc = StoryArc::create(params, Uuid::new_v4(), &clock).unwrap();
        for _ in 0..7 {
            arc.advance_chapter(Uuid::new_v4(), &clock);
        }

        // Act
        let outcome = run(&StoryPacingRule, &arc).await;

        // Assert
        assert_eq!(arc.current_chapter(), 8);
        assert!(outcome.suggestions.iter().any(|s| s.contains("slow pacing")));
    }

    #[tokio::test]
    async fn test_slow_pacing_at_seventy_percent_is_not_flagged() {
        // Arrange
        let clock = fixed_clock();
        let params = NewStoryArc::new(Uuid::new_v4(), "Pilgrimage", "wistful")
            .with_pacing(Pacing::Slow)
            .with_total_chapters(10);
        let mut arc = StoryArc::create(params, Uuid::new_v4(), &clock).unwrap();
        for _ in 0..6 {
            arc.advance_chapter(Uuid::new_v4(), &clock);
        }

        // Act
        let outcome = run(&StoryPacingRule, &arc).await;

        // Assert
        assert_eq!(arc.current_chapter(), 7);
        assert!(!outcome.suggestions.iter().any(|s| s.contains("slow pacing")));
    }

    #[tokio::test]
    async fn test_pacing_flags_overloaded_chapter() {
        // Arrange
        let clock = fixed_clock();
        let mut arc = new_arc();
        for i in 0..6 {
            arc.add_beat(
                NewStoryBeat::new(format!("Skirmish {i}"), "", 1, 1),
                Uuid::new_v4(),
                &clock,
            );
        }
        for chapter in 2..=4 {
            arc.add_beat(NewStoryBeat::new("Travel", "", chapter, 1), Uuid::new_v4(), &clock);
        }

        // Act
        let outcome = run(&StoryPacingRule, &arc).await;

        // Assert
        assert!(outcome.suggestions.iter().any(|s| s.starts_with("Review chapter 1")));
        assert_eq!(
            outcome.suggestions.iter().filter(|s| s.starts_with("Consider fleshing out")).count(),
            3
        );
    }

    // --- character_relationship_development ---

    #[tokio::test]
    async fn test_relationship_rule_on_fresh_arc() {
        let outcome = run(&CharacterRelationshipRule, &new_arc()).await;

        assert_eq!(outcome.warnings.len(), 1);
        assert_eq!(outcome.suggestions.len(), 1);
        assert_eq!(outcome.score, 95);
    }

    #[tokio::test]
    async fn test_relationship_rule_flags_uneven_milestones() {
        // Arrange
        let clock = fixed_clock();
        let mut arc = new_arc();
        let (hero, sidekick) = (Uuid::new_v4(), Uuid::new_v4());
        arc.add_beat(
            NewStoryBeat::new("Camp", "", 1, 1)
                .with_importance(Importance::Minor)
                .with_characters([hero, sidekick]),
            Uuid::new_v4(),
            &clock,
        );
        for i in 0..5 {
            arc.add_milestone(
                NewMilestone::new(hero, MilestoneType::Relationship, format!("Bond {i}")),
                Uuid::new_v4(),
                &clock,
            );
        }
        arc.add_milestone(
            NewMilestone::new(sidekick, MilestoneType::Skill, "Learns to swim"),
            Uuid::new_v4(),
            &clock,
        );

        // Act
        let outcome = run(&CharacterRelationshipRule, &arc).await;

        // Assert
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.suggestions.len(), 1);
        assert!(outcome.suggestions[0].contains("range from 1 to 5"));
    }

    #[tokio::test]
    async fn test_milestone_spread_of_three_is_tolerated() {
        // Arrange
        let clock = fixed_clock();
        let mut arc = new_arc();
        let (hero, sidekick) = (Uuid::new_v4(), Uuid::new_v4());
        arc.add_beat(
            NewStoryBeat::new("Camp", "", 1, 1)
                .with_importance(Importance::Minor)
                .with_characters([hero, sidekick]),
            Uuid::new_v4(),
            &clock,
        );
        for i in 0..4 {
            arc.add_milestone(
                NewMilestone::new(hero, MilestoneType::Relationship, format!("Bond {i}")),
                Uuid::new_v4(),
                &clock,
            );
        }
        arc.add_milestone(
            NewMilestone::new(sidekick, MilestoneType::Skill, "Learns to swim"),
            Uuid::new_v4(),
            &clock,
        );

        // Act
        let outcome = run(&CharacterRelationshipRule, &arc).await;

        // Assert
        assert!(outcome.warnings.is_empty());
        assert!(outcome.suggestions.is_empty());
        assert_eq!(outcome.score, 100);
    }
}
