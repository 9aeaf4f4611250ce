//! Consistency validation for story arcs.
//!
//! A [`ConsistencyValidator`] runs an ordered set of pluggable
//! [`ConsistencyRule`]s against one arc snapshot and folds their outcomes
//! into a scored [`ValidationReport`]. Rules are isolated from one another:
//! a rule that errors or panics is reported as failed with a zero score and
//! the remaining rules still run.

pub mod coherence;
pub mod rules;

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;
use serde::Serialize;
use storyloom_core::generation::{GenerationError, NarrativeGenerator};
use thiserror::Error;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::config::ValidatorConfig;
use crate::domain::aggregates::StoryArc;

pub use coherence::{CoherenceAnalysis, NarrativeCoherenceRule};
pub use rules::{
    BeatCompletionRule, CharacterDevelopmentTrackingRule, CharacterRelationshipRule,
    QuestStoryIntegrationRule, StoryPacingRule, StructureProgressionRule,
    WorldStateConsistencyRule,
};

/// Points deducted from a rule's score per issue.
pub const ISSUE_PENALTY: u32 = 15;
/// Points deducted from a rule's score per warning.
pub const WARNING_PENALTY: u32 = 5;

const MAX_SUGGESTION_RECOMMENDATIONS: usize = 3;
const MAX_WARNING_RECOMMENDATIONS: usize = 2;
const MAX_RECOMMENDATIONS: usize = 5;

/// Report score when no rules are registered.
pub const NO_RULES_SCORE: u32 = 50;
/// Sole recommendation when no rules are registered.
pub const NO_RULES_RECOMMENDATION: &str =
    "Validation rules are unavailable; consistency could not be fully assessed";

/// Severity tag carried by each rule. Informational only: it does not
/// weight scores or affect validity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// Errors a rule can raise while evaluating.
#[derive(Debug, Error)]
pub enum RuleError {
    /// The rule could not evaluate the arc.
    #[error("rule evaluation failed: {0}")]
    Evaluation(String),

    /// The rule depends on the generator and the call failed.
    #[error("generation failed: {0}")]
    Generation(#[from] GenerationError),

    /// The rule panicked while evaluating.
    #[error("rule panicked: {0}")]
    Panicked(String),
}

/// What a single rule found.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleOutcome {
    pub passed: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub score: u32,
}

impl RuleOutcome {
    /// Scores a set of findings: `100 - 15 * issues - 5 * warnings`,
    /// floored at zero. Passes when there are no issues.
    #[must_use]
    pub fn from_findings(
        issues: Vec<String>,
        warnings: Vec<String>,
        suggestions: Vec<String>,
    ) -> Self {
        let penalty = penalty(issues.len(), ISSUE_PENALTY)
            .saturating_add(penalty(warnings.len(), WARNING_PENALTY));
        Self {
            passed: issues.is_empty(),
            score: 100u32.saturating_sub(penalty),
            issues,
            warnings,
            suggestions,
        }
    }

    /// The outcome recorded for a rule that raised an error.
    #[must_use]
    pub fn errored(error: &RuleError) -> Self {
        Self {
            passed: false,
            issues: vec![format!("Validation error: {error}")],
            warnings: Vec::new(),
            suggestions: Vec::new(),
            score: 0,
        }
    }
}

fn penalty(count: usize, per_item: u32) -> u32 {
    u32::try_from(count)
        .unwrap_or(u32::MAX)
        .saturating_mul(per_item)
}

/// Accumulates findings while a rule walks the arc.
#[derive(Debug, Default)]
pub(crate) struct Findings {
    issues: Vec<String>,
    warnings: Vec<String>,
    suggestions: Vec<String>,
}

impl Findings {
    pub(crate) fn issue(&mut self, message: impl Into<String>) {
        self.issues.push(message.into());
    }

    pub(crate) fn warning(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    pub(crate) fn suggestion(&mut self, message: impl Into<String>) {
        self.suggestions.push(message.into());
    }

    pub(crate) fn into_outcome(self) -> RuleOutcome {
        RuleOutcome::from_findings(self.issues, self.warnings, self.suggestions)
    }
}

/// A pluggable consistency check.
#[async_trait]
pub trait ConsistencyRule: Send + Sync {
    /// Stable identifier, e.g. `structure_progression`.
    fn id(&self) -> &str;

    /// Human-readable name.
    fn name(&self) -> &str;

    fn severity(&self) -> Severity;

    /// Evaluates the arc.
    ///
    /// # Errors
    ///
    /// Returns `RuleError` if the rule cannot produce an outcome. The
    /// validator records this as a failed rule rather than propagating it.
    async fn evaluate(&self, arc: &StoryArc) -> Result<RuleOutcome, RuleError>;
}

/// One rule's entry in a report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RuleResult {
    pub rule_id: String,
    pub rule_name: String,
    pub severity: Severity,
    pub passed: bool,
    pub issues: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub score: u32,
}

impl RuleResult {
    fn new(rule: &dyn ConsistencyRule, outcome: RuleOutcome) -> Self {
        Self {
            rule_id: rule.id().to_owned(),
            rule_name: rule.name().to_owned(),
            severity: rule.severity(),
            passed: outcome.passed,
            issues: outcome.issues,
            warnings: outcome.warnings,
            suggestions: outcome.suggestions,
            score: outcome.score,
        }
    }
}

/// Totals across all rule results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationSummary {
    pub total_rules: usize,
    pub passed_rules: usize,
    pub failed_rules: usize,
    pub total_warnings: usize,
    pub total_suggestions: usize,
}

impl ValidationSummary {
    fn from_results(results: &[RuleResult]) -> Self {
        let passed_rules = results.iter().filter(|r| r.passed).count();
        Self {
            total_rules: results.len(),
            passed_rules,
            failed_rules: results.len() - passed_rules,
            total_warnings: results.iter().map(|r| r.warnings.len()).sum(),
            total_suggestions: results.iter().map(|r| r.suggestions.len()).sum(),
        }
    }
}

/// The result of validating one story arc.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub story_arc_id: Uuid,
    pub campaign_id: Uuid,
    pub overall_score: u32,
    pub valid: bool,
    pub results: Vec<RuleResult>,
    pub summary: ValidationSummary,
    pub recommendations: Vec<String>,
}

/// Runs consistency rules against story arcs.
pub struct ConsistencyValidator {
    rules: Vec<Box<dyn ConsistencyRule>>,
    config: ValidatorConfig,
}

impl std::fmt::Debug for ConsistencyValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsistencyValidator")
            .field("rules", &self.rule_ids())
            .field("config", &self.config)
            .finish()
    }
}

impl ConsistencyValidator {
    /// Creates a validator with an explicit rule set, which may be empty.
    #[must_use]
    pub fn with_rules(rules: Vec<Box<dyn ConsistencyRule>>, config: ValidatorConfig) -> Self {
        Self { rules, config }
    }

    /// Creates a validator with the eight standard rules, in order.
    #[must_use]
    pub fn with_default_rules(
        generator: Arc<dyn NarrativeGenerator>,
        config: ValidatorConfig,
    ) -> Self {
        let coherence = NarrativeCoherenceRule::new(generator, config.generation_timeout());
        let rules: Vec<Box<dyn ConsistencyRule>> = vec![
            Box::new(StructureProgressionRule),
            Box::new(BeatCompletionRule),
            Box::new(CharacterDevelopmentTrackingRule),
            Box::new(WorldStateConsistencyRule),
            Box::new(QuestStoryIntegrationRule),
            Box::new(StoryPacingRule),
            Box::new(CharacterRelationshipRule),
            Box::new(coherence),
        ];
        Self::with_rules(rules, config)
    }

    /// Appends a rule to the end of the rule set.
    pub fn push_rule(&mut self, rule: Box<dyn ConsistencyRule>) {
        self.rules.push(rule);
    }

    /// Identifiers of the registered rules, in evaluation order.
    #[must_use]
    pub fn rule_ids(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.id()).collect()
    }

    /// Runs every rule against `arc` and builds the report. Never fails.
    #[instrument(skip_all, fields(story_arc_id = %arc.id, rules = self.rules.len()))]
    pub async fn validate_story_arc(&self, arc: &StoryArc) -> ValidationReport {
        if self.rules.is_empty() {
            warn!("no validation rules registered, returning fallback report");
            return ValidationReport {
                story_arc_id: arc.id,
                campaign_id: arc.campaign_id,
                overall_score: NO_RULES_SCORE,
                valid: true,
                results: Vec::new(),
                summary: ValidationSummary::default(),
                recommendations: vec![NO_RULES_RECOMMENDATION.to_owned()],
            };
        }

        let mut results = Vec::with_capacity(self.rules.len());
        for rule in &self.rules {
            let evaluated = AssertUnwindSafe(rule.evaluate(arc)).catch_unwind().await;
            let outcome = match evaluated {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(e)) => {
                    warn!(rule = rule.id(), error = %e, "validation rule failed");
                    RuleOutcome::errored(&e)
                }
                Err(payload) => {
                    let e = RuleError::Panicked(panic_message(payload.as_ref()));
                    warn!(rule = rule.id(), error = %e, "validation rule panicked");
                    RuleOutcome::errored(&e)
                }
            };
            debug!(
                rule = rule.id(),
                score = outcome.score,
                passed = outcome.passed,
                "rule evaluated"
            );
            results.push(RuleResult::new(rule.as_ref(), outcome));
        }

        let overall_score = mean_score(&results);
        let valid = overall_score >= self.config.valid_threshold;
        let summary = ValidationSummary::from_results(&results);
        let recommendations = recommendations(&results, overall_score);

        info!(
            overall_score,
            valid,
            failed_rules = summary.failed_rules,
            "story arc validated"
        );

        ValidationReport {
            story_arc_id: arc.id,
            campaign_id: arc.campaign_id,
            overall_score,
            valid,
            results,
            summary,
            recommendations,
        }
    }
}

/// Mean of the rule scores, rounded half up.
fn mean_score(results: &[RuleResult]) -> u32 {
    let count = results.len() as u64;
    if count == 0 {
        return 0;
    }
    let total: u64 = results.iter().map(|r| u64::from(r.score)).sum();
    u32::try_from((2 * total + count) / (2 * count)).unwrap_or(u32::MAX)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_owned()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_owned()
    }
}

fn recommendations(results: &[RuleResult], overall_score: u32) -> Vec<String> {
    let mut recommendations: Vec<String> = results
        .iter()
        .flat_map(|r| &r.suggestions)
        .filter(|s| s.contains("Consider") || s.contains("Review"))
        .take(MAX_SUGGESTION_RECOMMENDATIONS)
        .cloned()
        .collect();
    recommendations.extend(
        results
            .iter()
            .flat_map(|r| &r.warnings)
            .take(MAX_WARNING_RECOMMENDATIONS)
            .cloned(),
    );
    recommendations.truncate(MAX_RECOMMENDATIONS - 1);
    recommendations.push(closing_remark(overall_score).to_owned());
    recommendations
}

fn closing_remark(overall_score: u32) -> &'static str {
    if overall_score < 70 {
        "Story consistency needs attention; address the reported issues before continuing"
    } else if overall_score < 85 {
        "Story consistency is good; a few refinements would strengthen the narrative"
    } else {
        "Story arc shows excellent consistency"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{
        Importance, MilestoneType, NewMilestone, NewStoryArc, NewStoryBeat, NewWorldChange,
        WorldChangeType,
    };
    use chrono::{TimeZone, Utc};
    use storyloom_test_support::{FailingGenerator, FixedClock, ScriptedGenerator};

    fn fixed_clock() -> FixedClock {
        FixedClock(Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap())
    }

    fn new_arc() -> StoryArc {
        let params = NewStoryArc::new(Uuid::new_v4(), "Redemption", "grim");
        StoryArc::create(params, Uuid::new_v4(), &fixed_clock()).unwrap()
    }

    struct FixedRule {
        id: &'static str,
        outcome: RuleOutcome,
    }

    #[async_trait]
    impl ConsistencyRule for FixedRule {
        fn id(&self) -> &str {
            self.id
        }

        fn name(&self) -> &str {
            "Fixed"
        }

        fn severity(&self) -> Severity {
            Severity::Info
        }

        async fn evaluate(&self, _arc: &StoryArc) -> Result<RuleOutcome, RuleError> {
            Ok(self.outcome.clone())
        }
    }

    struct BrokenRule;

    #[async_trait]
    impl ConsistencyRule for BrokenRule {
        fn id(&self) -> &str {
            "broken"
        }

        fn name(&self) -> &str {
            "Broken"
        }

        fn severity(&self) -> Severity {
            Severity::Error
        }

        async fn evaluate(&self, _arc: &StoryArc) -> Result<RuleOutcome, RuleError> {
            Err(RuleError::Evaluation("index out of bounds".to_owned()))
        }
    }

    struct PanickingRule;

    #[async_trait]
    impl ConsistencyRule for PanickingRule {
        fn id(&self) -> &str {
            "panicking"
        }

        fn name(&self) -> &str {
            "Panicking"
        }

        fn severity(&self) -> Severity {
            Severity::Error
        }

        async fn evaluate(&self, arc: &StoryArc) -> Result<RuleOutcome, RuleError> {
            let _fourth = &arc.milestones()[3];
            Ok(RuleOutcome::from_findings(Vec::new(), Vec::new(), Vec::new()))
        }
    }

    fn fixed(
        id: &'static str,
        issues: usize,
        warnings: usize,
        suggestions: &[&str],
    ) -> Box<dyn ConsistencyRule> {
        Box::new(FixedRule {
            id,
            outcome: RuleOutcome::from_findings(
                vec!["issue".to_owned(); issues],
                vec!["warning".to_owned(); warnings],
                suggestions.iter().map(|s| (*s).to_owned()).collect(),
            ),
        })
    }

    #[test]
    fn test_score_deducts_per_issue_and_warning() {
        let outcome = RuleOutcome::from_findings(
            vec!["a".to_owned(), "b".to_owned()],
            vec!["c".to_owned()],
            Vec::new(),
        );

        assert!(!outcome.passed);
        assert_eq!(outcome.score, 65);
    }

    #[test]
    fn test_score_is_floored_at_zero() {
        let outcome = RuleOutcome::from_findings(vec!["x".to_owned(); 8], Vec::new(), Vec::new());

        assert_eq!(outcome.score, 0);
    }

    #[tokio::test]
    async fn test_empty_rule_set_returns_fallback_report() {
        // Arrange
        let validator = ConsistencyValidator::with_rules(Vec::new(), ValidatorConfig::default());

        // Act
        let report = validator.validate_story_arc(&new_arc()).await;

        // Assert
        assert_eq!(report.overall_score, 50);
        assert!(report.valid);
        assert!(report.results.is_empty());
        assert_eq!(report.recommendations, vec![NO_RULES_RECOMMENDATION.to_owned()]);
    }

    #[tokio::test]
    async fn test_failing_rule_is_isolated() {
        // Arrange
        let validator = ConsistencyValidator::with_rules(
            vec![fixed("first", 0, 0, &[]), Box::new(BrokenRule), fixed("last", 0, 1, &[])],
            ValidatorConfig::default(),
        );

        // Act
        let report = validator.validate_story_arc(&new_arc()).await;

        // Assert
        assert_eq!(report.results.len(), 3);
        let broken = &report.results[1];
        assert_eq!(broken.rule_id, "broken");
        assert!(!broken.passed);
        assert_eq!(broken.issues.len(), 1);
        assert!(broken.issues[0].contains("index out of bounds"));
        assert_eq!(broken.score, 0);
        assert_eq!(report.results[0].score, 100);
        assert_eq!(report.results[2].score, 95);
        assert_eq!(report.overall_score, 65);
        assert!(!report.valid);
        assert_eq!(report.summary.failed_rules, 1);
        assert_eq!(report.summary.passed_rules, 2);
    }

    #[tokio::test]
    async fn test_panicking_rule_is_isolated() {
        // Arrange
        let validator = ConsistencyValidator::with_rules(
            vec![Box::new(PanickingRule), Box::new(StructureProgressionRule)],
            ValidatorConfig::default(),
        );

        // Act
        let report = validator.validate_story_arc(&new_arc()).await;

        // Assert
        assert_eq!(report.results.len(), 2);
        let panicked = &report.results[0];
        assert_eq!(panicked.rule_id, "panicking");
        assert!(!panicked.passed);
        assert_eq!(panicked.score, 0);
        assert_eq!(panicked.issues.len(), 1);
        assert!(
            panicked.issues[0]
                .starts_with("Validation error: rule panicked: index out of bounds")
        );
        assert_eq!(report.results[1].rule_id, "structure_progression");
        assert_eq!(report.summary.failed_rules, 1);
    }

    #[tokio::test]
    async fn test_overall_score_is_rounded_mean() {
        // Arrange
        let validator = ConsistencyValidator::with_rules(
            vec![fixed("a", 0, 0, &[]), fixed("b", 0, 1, &[]), fixed("c", 0, 1, &[])],
            ValidatorConfig::default(),
        );

        // Act
        let report = validator.validate_story_arc(&new_arc()).await;

        // Assert
        assert_eq!(report.overall_score, 97);
        assert!(report.valid);
    }

    #[tokio::test]
    async fn test_valid_threshold_is_configurable() {
        let config = ValidatorConfig {
            valid_threshold: 98,
            ..ValidatorConfig::default()
        };
        let validator = ConsistencyValidator::with_rules(vec![fixed("a", 0, 1, &[])], config);

        let report = validator.validate_story_arc(&new_arc()).await;

        assert_eq!(report.overall_score, 95);
        assert!(!report.valid);
    }

    #[tokio::test]
    async fn test_recommendations_pick_actionable_suggestions_and_cap_at_five() {
        // Arrange
        let validator = ConsistencyValidator::with_rules(
            vec![
                fixed(
                    "a",
                    0,
                    3,
                    &["Consider one", "Noted", "Review two", "Consider three", "Consider four"],
                ),
            ],
            ValidatorConfig::default(),
        );

        // Act
        let report = validator.validate_story_arc(&new_arc()).await;

        // Assert
        assert_eq!(report.recommendations.len(), 5);
        assert_eq!(
            report.recommendations[..4],
            ["Consider one", "Review two", "Consider three", "warning"]
        );
        assert_eq!(report.overall_score, 85);
        assert_eq!(report.recommendations[4], "Story arc shows excellent consistency");
    }

    #[test]
    fn test_closing_remark_tiers() {
        assert!(closing_remark(69).contains("needs attention"));
        assert!(closing_remark(70).contains("is good"));
        assert!(closing_remark(85).contains("excellent"));
    }

    #[tokio::test]
    async fn test_default_rules_run_in_order_with_generator_down() {
        // Arrange
        let validator = ConsistencyValidator::with_default_rules(
            Arc::new(FailingGenerator),
            ValidatorConfig::default(),
        );

        // Act
        let report = validator.validate_story_arc(&new_arc()).await;

        // Assert
        assert_eq!(
            validator.rule_ids(),
            vec![
                "structure_progression",
                "beat_completion",
                "character_development_tracking",
                "world_state_consistency",
                "quest_story_integration",
                "story_pacing",
                "character_relationship_development",
                "narrative_coherence",
            ]
        );
        assert_eq!(report.results.len(), 8);
        let coherence = &report.results[7];
        assert!(coherence.passed);
        assert_eq!(coherence.warnings.len(), 1);
        assert_eq!(report.summary.total_rules, 8);
        assert!(report.recommendations.len() <= 5);
    }

    #[tokio::test]
    async fn test_single_completed_beat_scenario() {
        // Arrange
        let clock = fixed_clock();
        let mut arc = new_arc();
        let hero = Uuid::new_v4();
        let beat_id = arc.add_beat(
            NewStoryBeat::new("The Bridge Falls", "The party cuts the ropes", 1, 1)
                .with_importance(Importance::Major)
                .with_characters([hero])
                .with_location("Gorge")
                .with_consequences(["The pursuers are cut off"]),
            Uuid::new_v4(),
            &clock,
        );
        arc.complete_beat(beat_id, None, None, Uuid::new_v4(), &clock);
        arc.add_milestone(
            NewMilestone::new(hero, MilestoneType::Story, "Made a hard call").for_beat(beat_id),
            Uuid::new_v4(),
            &clock,
        );
        arc.add_world_change(
            NewWorldChange::new(WorldChangeType::Location, "Bridge destroyed").for_beat(beat_id),
            Uuid::new_v4(),
            &clock,
        );
        let validator = ConsistencyValidator::with_default_rules(
            Arc::new(ScriptedGenerator::replying(
                r#"{"issues": [], "warnings": [], "suggestions": []}"#,
            )),
            ValidatorConfig::default(),
        );

        // Act
        let report = validator.validate_story_arc(&arc).await;

        // Assert
        let by_id = |id: &str| report.results.iter().find(|r| r.rule_id == id).unwrap();
        assert!(by_id("structure_progression").issues.is_empty());
        assert!(by_id("beat_completion").warnings.is_empty());
        assert!(by_id("character_development_tracking").warnings.is_empty());
        assert!(by_id("narrative_coherence").passed);
    }
}
