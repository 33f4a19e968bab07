//! Behavioural assessment analysis.
//!
//! Takes the assessment history of one student, keeps the latest run per
//! game, normalises game metrics to a 0-100 scale and derives a behavioural
//! profile, an additive risk estimate, per-game interpretations, progress
//! trends and recommendations.

use std::collections::{BTreeMap, HashSet};

use chrono::Months;
use serde::Serialize;
use serde_json::Value;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

// ---------------------------------------------------------------------------
// Assessment types
// ---------------------------------------------------------------------------

pub const EMOTION_MATCH: &str = "emotion-match";
pub const EYE_GAZE_TRACKER: &str = "eye-gaze-tracker";
pub const SOCIAL_ATTENTION: &str = "social-attention";
pub const IMITATION: &str = "imitation";
pub const SOUND_SENSITIVITY: &str = "sound-sensitivity";
pub const PATTERN_FIXATION: &str = "pattern-fixation";
pub const STORY_UNDERSTANDING: &str = "story-understanding";
pub const TURN_TAKING: &str = "turn-taking";

/// Every game, in report order.
pub const ASSESSMENT_TYPES: [&str; 8] = [
    EMOTION_MATCH,
    EYE_GAZE_TRACKER,
    SOCIAL_ATTENTION,
    IMITATION,
    SOUND_SENSITIVITY,
    PATTERN_FIXATION,
    STORY_UNDERSTANDING,
    TURN_TAKING,
];

pub fn validate_assessment_type(value: &str) -> Result<(), CoreError> {
    if ASSESSMENT_TYPES.contains(&value) {
        Ok(())
    } else {
        Err(CoreError::Validation(format!(
            "Unknown assessment type '{value}'"
        )))
    }
}

/// `"eye-gaze-tracker"` -> `"Eye Gaze Tracker"`.
pub fn game_display_name(game_type: &str) -> String {
    game_type
        .split('-')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn game_description(game_type: &str) -> &'static str {
    match game_type {
        EMOTION_MATCH => "Assesses emotional recognition through facial expression matching",
        EYE_GAZE_TRACKER => "Monitors visual attention and eye contact patterns",
        SOCIAL_ATTENTION => "Measures responsiveness to social versus non-social stimuli",
        IMITATION => "Evaluates motor and social imitation capabilities",
        SOUND_SENSITIVITY => "Tests auditory processing and sensory responses",
        PATTERN_FIXATION => "Analyzes repetitive visual interests and fixation behaviors",
        STORY_UNDERSTANDING => "Assesses narrative comprehension and theory of mind",
        TURN_TAKING => "Measures reciprocal interaction and social timing",
        _ => "",
    }
}

pub const DISCLAIMER: &str = "This behavioral analysis system supports early screening and \
assessment based on game-based behavioral data. It does not replace professional medical \
diagnosis. All conclusions are based on structured game performance metrics and should be \
interpreted by qualified professionals in conjunction with clinical evaluation.";

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// The slice of a stored assessment the analysis needs.
#[derive(Debug, Clone)]
pub struct AssessmentRecord {
    pub assessment_type: String,
    pub score: f64,
    pub metrics: Value,
    pub completed_at: Timestamp,
}

/// Numeric metric lookup; missing or non-numeric values read as zero.
fn metric(metrics: &Value, key: &str) -> f64 {
    metrics.get(key).and_then(Value::as_f64).unwrap_or(0.0)
}

/// First non-zero of the candidates, or zero.
fn first_nonzero(candidates: &[f64]) -> f64 {
    candidates.iter().copied().find(|v| *v != 0.0).unwrap_or(0.0)
}

/// Latest record per game type. `records` may be in any order.
pub fn latest_per_type(records: &[AssessmentRecord]) -> BTreeMap<&'static str, &AssessmentRecord> {
    let mut latest: BTreeMap<&'static str, &AssessmentRecord> = BTreeMap::new();
    for game in ASSESSMENT_TYPES {
        if let Some(newest) = records
            .iter()
            .filter(|r| r.assessment_type == game)
            .max_by_key(|r| r.completed_at)
        {
            latest.insert(game, newest);
        }
    }
    latest
}

// ---------------------------------------------------------------------------
// Normalisation
// ---------------------------------------------------------------------------

/// Game metrics on a common 0-100 scale.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedMetrics {
    pub accuracy: f64,
    pub response_time: f64,
    pub eye_contact_duration: f64,
    pub fixation_ratio: f64,
    pub imitation_success: f64,
    pub sensory_reaction_level: f64,
    pub repetitive_selection_frequency: f64,
    pub social_understanding_score: f64,
    pub turn_taking_behavior: f64,
}

pub fn normalize(latest: &BTreeMap<&'static str, &AssessmentRecord>) -> NormalizedMetrics {
    let mut n = NormalizedMetrics::default();

    if let Some(a) = latest.get(EMOTION_MATCH) {
        n.accuracy = metric(&a.metrics, "accuracy");
        let rt = metric(&a.metrics, "responseTime");
        n.response_time = if rt != 0.0 { (100.0 - rt * 10.0).max(0.0) } else { 0.0 };
    }

    if let Some(a) = latest.get(EYE_GAZE_TRACKER) {
        let eye = metric(&a.metrics, "eyeContactTime");
        let object = metric(&a.metrics, "objectFixationTime");
        let total = eye + object;
        if total > 0.0 {
            n.eye_contact_duration = eye / total * 100.0;
            n.fixation_ratio = object / total * 100.0;
        }
    }

    if let Some(a) = latest.get(SOCIAL_ATTENTION) {
        n.social_understanding_score = metric(&a.metrics, "socialResponseTime");
    }

    if let Some(a) = latest.get(IMITATION) {
        n.imitation_success = first_nonzero(&[metric(&a.metrics, "imitationScore"), a.score]);
    }

    if let Some(a) = latest.get(SOUND_SENSITIVITY) {
        n.sensory_reaction_level = metric(&a.metrics, "sensoryResponseTime");
    }

    if let Some(a) = latest.get(PATTERN_FIXATION) {
        n.repetitive_selection_frequency =
            (metric(&a.metrics, "repetitiveSelectionCount") * 10.0).min(100.0);
    }

    if let Some(a) = latest.get(STORY_UNDERSTANDING) {
        n.social_understanding_score = if n.social_understanding_score == 0.0 {
            a.score
        } else {
            (n.social_understanding_score + a.score) / 2.0
        };
    }

    if let Some(a) = latest.get(TURN_TAKING) {
        n.turn_taking_behavior =
            first_nonzero(&[metric(&a.metrics, "waitingBehaviorScore"), a.score]);
    }

    n
}

// ---------------------------------------------------------------------------
// Behavioural profile
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileDimension {
    pub score: f64,
    pub level: &'static str,
    pub traits: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BehavioralProfile {
    pub social_attention: ProfileDimension,
    pub emotional_recognition: ProfileDimension,
    pub sensory_processing: ProfileDimension,
    pub imitation_ability: ProfileDimension,
    pub repetitive_behavior: ProfileDimension,
    pub social_reciprocity: ProfileDimension,
}

/// Pick a level from a higher-is-better score.
fn band_high(score: f64, strong: f64, moderate: f64, levels: [&'static str; 3]) -> &'static str {
    if score > strong {
        levels[0]
    } else if score > moderate {
        levels[1]
    } else {
        levels[2]
    }
}

/// Pick a level from a lower-is-better score.
fn band_low(score: f64, low: f64, mid: f64, levels: [&'static str; 3]) -> &'static str {
    if score < low {
        levels[0]
    } else if score < mid {
        levels[1]
    } else {
        levels[2]
    }
}

fn dimension(score: f64, level: &'static str, trait_if: Option<&'static str>) -> ProfileDimension {
    ProfileDimension {
        score,
        level,
        traits: trait_if.into_iter().collect(),
    }
}

pub fn detect_patterns(n: &NormalizedMetrics) -> BehavioralProfile {
    let eye = n.eye_contact_duration;
    let acc = n.accuracy;
    let sensory = n.sensory_reaction_level;
    let imitation = n.imitation_success;
    let repetitive = n.repetitive_selection_frequency;
    let turn = n.turn_taking_behavior;

    BehavioralProfile {
        social_attention: dimension(
            eye,
            band_high(eye, 60.0, 40.0, ["Strong", "Moderate", "Limited"]),
            (eye < 40.0).then_some("Reduced eye contact observed"),
        ),
        emotional_recognition: dimension(
            acc,
            band_high(acc, 80.0, 50.0, ["Strong", "Moderate", "Challenging"]),
            (acc < 50.0).then_some("Difficulty recognizing emotions"),
        ),
        sensory_processing: dimension(
            100.0 - sensory,
            band_low(
                sensory,
                30.0,
                60.0,
                ["Typical", "Moderate Sensitivity", "High Sensitivity"],
            ),
            (sensory > 60.0).then_some("Elevated sensory sensitivity"),
        ),
        imitation_ability: dimension(
            imitation,
            band_high(imitation, 70.0, 40.0, ["Strong", "Moderate", "Needs Support"]),
            (imitation < 40.0).then_some("Limited imitation skills"),
        ),
        repetitive_behavior: dimension(
            repetitive,
            band_low(repetitive, 30.0, 60.0, ["Minimal", "Moderate", "Elevated"]),
            (repetitive > 60.0).then_some("Repetitive patterns observed"),
        ),
        social_reciprocity: dimension(
            turn,
            band_high(turn, 70.0, 40.0, ["Strong", "Moderate", "Limited"]),
            (turn < 40.0).then_some("Challenges with turn-taking"),
        ),
    }
}

// ---------------------------------------------------------------------------
// Risk
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

impl RiskLevel {
    pub fn from_probability(score: f64) -> Self {
        if score >= 70.0 {
            Self::High
        } else if score >= 40.0 {
            Self::Moderate
        } else {
            Self::Low
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ProbabilityBreakdown {
    pub low: i64,
    pub moderate: i64,
    pub high: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskAnalysis {
    pub risk_level: RiskLevel,
    pub probability_score: i64,
    pub probability_breakdown: ProbabilityBreakdown,
    pub contributing_factors: Vec<&'static str>,
}

pub fn calculate_risk(n: &NormalizedMetrics) -> RiskAnalysis {
    let rules: [(bool, f64, &'static str); 6] = [
        (n.eye_contact_duration < 40.0, 20.0, "Reduced social attention"),
        (n.accuracy < 50.0, 15.0, "Emotional recognition challenges"),
        (n.sensory_reaction_level > 60.0, 15.0, "Sensory hypersensitivity"),
        (n.imitation_success < 40.0, 15.0, "Limited imitation ability"),
        (n.repetitive_selection_frequency > 60.0, 20.0, "Repetitive behavior patterns"),
        (n.turn_taking_behavior < 40.0, 15.0, "Social reciprocity challenges"),
    ];

    let mut raw = 0.0;
    let mut factors = Vec::new();
    for (hit, points, factor) in rules {
        if hit {
            raw += points;
            factors.push(factor);
        }
    }

    let probability = raw.clamp(0.0, 100.0);
    let level = RiskLevel::from_probability(probability);

    let high = if level == RiskLevel::High {
        probability
    } else if probability > 50.0 {
        probability - 20.0
    } else {
        probability / 3.0
    };
    let moderate = if level == RiskLevel::Moderate {
        probability
    } else if probability >= 40.0 {
        probability - 10.0
    } else {
        probability / 2.0
    };
    let low = 100.0 - high - moderate;

    RiskAnalysis {
        risk_level: level,
        probability_score: round_half_up(probability),
        probability_breakdown: ProbabilityBreakdown {
            low: round_half_up(low.max(0.0)),
            moderate: round_half_up(moderate.max(0.0)),
            high: round_half_up(high.max(0.0)),
        },
        contributing_factors: factors,
    }
}

// ---------------------------------------------------------------------------
// Game-wise analysis
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameAnalysis {
    pub game_type: &'static str,
    pub game_name: String,
    pub description: &'static str,
    pub score: Option<f64>,
    pub interpretation: &'static str,
}

fn interpret_game(game: &str, score: f64, n: &NormalizedMetrics) -> &'static str {
    let pick = |value: f64, hi: f64, mid: f64, texts: [&'static str; 3]| {
        band_high(value, hi, mid, texts)
    };
    let pick_low = |value: f64, texts: [&'static str; 3]| band_low(value, 30.0, 60.0, texts);

    match game {
        EMOTION_MATCH => pick(
            score,
            80.0,
            50.0,
            [
                "Strong emotional recognition abilities",
                "Moderate emotional recognition",
                "Challenges with emotional recognition",
            ],
        ),
        EYE_GAZE_TRACKER => pick(
            n.eye_contact_duration,
            60.0,
            40.0,
            [
                "Good eye contact and attention patterns",
                "Variable attention patterns",
                "Limited eye contact observed",
            ],
        ),
        SOCIAL_ATTENTION => pick(
            n.social_understanding_score,
            70.0,
            40.0,
            [
                "Strong preference for social stimuli",
                "Balanced attention between social and non-social",
                "Greater interest in non-social objects",
            ],
        ),
        IMITATION => pick(
            n.imitation_success,
            70.0,
            40.0,
            [
                "Strong imitation skills demonstrated",
                "Developing imitation abilities",
                "Limited imitation observed",
            ],
        ),
        SOUND_SENSITIVITY => pick_low(
            n.sensory_reaction_level,
            [
                "Typical sensory responses",
                "Moderate sensory sensitivity",
                "Elevated sensitivity to auditory stimuli",
            ],
        ),
        PATTERN_FIXATION => pick_low(
            n.repetitive_selection_frequency,
            [
                "Flexible attention without excessive repetition",
                "Some repetitive patterns noted",
                "Elevated repetitive visual interests",
            ],
        ),
        STORY_UNDERSTANDING => pick(
            score,
            70.0,
            50.0,
            [
                "Good narrative comprehension",
                "Developing understanding",
                "Challenges with story comprehension",
            ],
        ),
        TURN_TAKING => pick(
            n.turn_taking_behavior,
            70.0,
            40.0,
            [
                "Strong turn-taking and reciprocity",
                "Developing social reciprocity",
                "Challenges with turn-taking behaviors",
            ],
        ),
        _ => "",
    }
}

pub fn game_wise_analysis(
    latest: &BTreeMap<&'static str, &AssessmentRecord>,
    n: &NormalizedMetrics,
) -> Vec<GameAnalysis> {
    ASSESSMENT_TYPES
        .iter()
        .map(|&game| {
            let (score, interpretation) = match latest.get(game) {
                Some(a) => (Some(a.score), interpret_game(game, a.score, n)),
                None => (None, "Not yet completed"),
            };
            GameAnalysis {
                game_type: game,
                game_name: game_display_name(game),
                description: game_description(game),
                score,
                interpretation,
            }
        })
        .collect()
}

// ---------------------------------------------------------------------------
// Progress tracking
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressTrend {
    pub game_type: &'static str,
    pub game_name: String,
    pub latest_score: f64,
    pub previous_score: f64,
    pub change: i64,
    pub trend: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressTracking {
    pub total_sessions: usize,
    pub sessions_completed: usize,
    pub games_completed: usize,
    pub has_historical_data: bool,
    pub trends: Vec<ProgressTrend>,
}

/// Rounds halves toward positive infinity, so `-2.5` becomes `-2`.
fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

pub fn trend_label(change: f64) -> &'static str {
    if change > 5.0 {
        "Improving"
    } else if change < -5.0 {
        "Declining"
    } else {
        "Stable"
    }
}

pub fn progress_tracking(records: &[AssessmentRecord], games_completed: usize) -> ProgressTracking {
    let mut trends = Vec::new();
    for game in ASSESSMENT_TYPES {
        let mut runs: Vec<&AssessmentRecord> = records
            .iter()
            .filter(|r| r.assessment_type == game)
            .collect();
        if runs.len() < 2 {
            continue;
        }
        runs.sort_by(|a, b| b.completed_at.cmp(&a.completed_at));
        let latest = runs[0].score;
        let previous = runs[1].score;
        let change = latest - previous;
        trends.push(ProgressTrend {
            game_type: game,
            game_name: game_display_name(game),
            latest_score: latest,
            previous_score: previous,
            change: round_half_up(change),
            trend: trend_label(change),
        });
    }

    ProgressTracking {
        total_sessions: records.len(),
        sessions_completed: games_completed,
        games_completed,
        has_historical_data: records.len() > games_completed,
        trends,
    }
}

// ---------------------------------------------------------------------------
// Recommendations
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub priority: &'static str,
    pub category: &'static str,
    pub recommendation: &'static str,
    pub action_items: [&'static str; 3],
}

const fn rec(
    priority: &'static str,
    category: &'static str,
    recommendation: &'static str,
    action_items: [&'static str; 3],
) -> Recommendation {
    Recommendation {
        priority,
        category,
        recommendation,
        action_items,
    }
}

pub fn recommendations(risk: &RiskAnalysis, profile: &BehavioralProfile) -> Vec<Recommendation> {
    let mut out = Vec::new();

    match risk.risk_level {
        RiskLevel::High => out.push(rec(
            "High",
            "Professional Referral",
            "Consider referral to a developmental pediatrician or autism specialist for \
             comprehensive evaluation. Early intervention is recommended.",
            [
                "Schedule consultation with developmental specialist",
                "Gather comprehensive developmental history",
                "Share behavioral assessment data with healthcare provider",
            ],
        )),
        RiskLevel::Moderate => out.push(rec(
            "Moderate",
            "Continued Monitoring",
            "Continue regular behavioral assessments and monitor progress. Consider \
             consultation with specialists if concerns persist.",
            [
                "Continue game-based assessments monthly",
                "Document behavioral observations",
                "Consider developmental screening tools",
            ],
        )),
        RiskLevel::Low => {}
    }

    if profile.social_attention.score < 40.0 {
        out.push(rec(
            "Medium",
            "Social Attention Support",
            "Implement strategies to support social attention and eye contact development.",
            [
                "Use visual supports and social stories",
                "Practice eye contact in natural contexts",
                "Reinforce positive social interactions",
            ],
        ));
    }
    if profile.emotional_recognition.score < 50.0 {
        out.push(rec(
            "Medium",
            "Emotional Recognition",
            "Support emotional recognition through structured activities and visual aids.",
            [
                "Use emotion cards and visual emotion charts",
                "Practice identifying emotions in stories and videos",
                "Model emotional expression and recognition",
            ],
        ));
    }
    if profile.sensory_processing.score < 40.0 {
        out.push(rec(
            "Medium",
            "Sensory Support",
            "Provide sensory accommodations and supports based on individual needs.",
            [
                "Identify specific sensory triggers",
                "Create sensory-friendly environment",
                "Provide sensory breaks and tools as needed",
            ],
        ));
    }
    if profile.imitation_ability.score < 40.0 {
        out.push(rec(
            "Medium",
            "Imitation Development",
            "Support imitation skills through modeling and structured practice.",
            [
                "Model actions and encourage imitation",
                "Break down actions into simple steps",
                "Use visual and physical prompts as needed",
            ],
        ));
    }
    if profile.repetitive_behavior.score > 60.0 {
        out.push(rec(
            "Medium",
            "Flexible Thinking",
            "Support flexible thinking and reduce repetitive patterns through structured \
             activities.",
            [
                "Introduce variety in activities and routines",
                "Use visual schedules to support transitions",
                "Gradually expand interests and activities",
            ],
        ));
    }
    if profile.social_reciprocity.score < 40.0 {
        out.push(rec(
            "Medium",
            "Social Reciprocity",
            "Support turn-taking and reciprocal interaction skills.",
            [
                "Practice turn-taking in structured games",
                "Use visual cues for turn-taking",
                "Reinforce appropriate waiting and sharing behaviors",
            ],
        ));
    }

    if out.is_empty() {
        out.push(rec(
            "Low",
            "Continued Support",
            "Continue current supports and regular monitoring. Behavioral profile indicates \
             typical development patterns.",
            [
                "Maintain regular assessment schedule",
                "Continue positive reinforcement strategies",
                "Monitor for any changes in behavioral patterns",
            ],
        ));
    }

    out
}

// ---------------------------------------------------------------------------
// Full report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RiskSummary {
    pub overall_risk_level: RiskLevel,
    pub probability_score: i64,
    pub probability_breakdown: ProbabilityBreakdown,
    pub contributing_factors: Vec<&'static str>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub student_id: DbId,
    pub generated_at: Timestamp,
    pub risk_summary: RiskSummary,
    pub normalized_metrics: NormalizedMetrics,
    pub behavioral_profile: BehavioralProfile,
    pub game_wise_analysis: Vec<GameAnalysis>,
    pub progress_tracking: ProgressTracking,
    pub recommendations: Vec<Recommendation>,
    pub disclaimer: &'static str,
}

/// Build the full report, or `None` when the student has no assessments.
pub fn analyze(
    student_id: DbId,
    records: &[AssessmentRecord],
    now: Timestamp,
) -> Option<AnalysisReport> {
    if records.is_empty() {
        return None;
    }

    let latest = latest_per_type(records);
    let normalized = normalize(&latest);
    let profile = detect_patterns(&normalized);
    let risk = calculate_risk(&normalized);
    let games = game_wise_analysis(&latest, &normalized);
    let progress = progress_tracking(records, latest.len());
    let recs = recommendations(&risk, &profile);

    Some(AnalysisReport {
        student_id,
        generated_at: now,
        risk_summary: RiskSummary {
            overall_risk_level: risk.risk_level,
            probability_score: risk.probability_score,
            probability_breakdown: risk.probability_breakdown,
            contributing_factors: risk.contributing_factors,
        },
        normalized_metrics: normalized,
        behavioral_profile: profile,
        game_wise_analysis: games,
        progress_tracking: progress,
        recommendations: recs,
        disclaimer: DISCLAIMER,
    })
}

// ---------------------------------------------------------------------------
// Teacher dashboard stats
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentStats {
    pub total_sessions: usize,
    pub active_students: usize,
    pub avg_engagement: i64,
    /// Percentage change of last month's sessions against everything older.
    pub trend: i64,
}

/// `(student_id, score, completed_at)` per assessment.
pub fn assessment_stats(rows: &[(DbId, f64, Timestamp)], now: Timestamp) -> AssessmentStats {
    let total = rows.len();
    let students: HashSet<DbId> = rows.iter().map(|(id, _, _)| *id).collect();
    let avg = if total > 0 {
        rows.iter().map(|(_, score, _)| score).sum::<f64>() / total as f64
    } else {
        0.0
    };

    let month_ago = now.checked_sub_months(Months::new(1)).unwrap_or(now);
    let recent = rows.iter().filter(|(_, _, at)| *at >= month_ago).count();
    let older = total - recent;
    let trend = if older > 0 {
        (recent as f64 - older as f64) / older as f64 * 100.0
    } else {
        0.0
    };

    AssessmentStats {
        total_sessions: total,
        active_students: students.len(),
        avg_engagement: round_half_up(avg),
        trend: round_half_up(trend),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;

    use super::*;

    fn at(day: u32) -> Timestamp {
        Utc.with_ymd_and_hms(2026, 3, day, 12, 0, 0).unwrap()
    }

    fn record(game: &str, score: f64, metrics: Value, day: u32) -> AssessmentRecord {
        AssessmentRecord {
            assessment_type: game.to_string(),
            score,
            metrics,
            completed_at: at(day),
        }
    }

    #[test]
    fn display_names() {
        assert_eq!(game_display_name("eye-gaze-tracker"), "Eye Gaze Tracker");
        assert_eq!(game_display_name("imitation"), "Imitation");
    }

    #[test]
    fn unknown_type_is_rejected() {
        assert!(validate_assessment_type("turn-taking").is_ok());
        assert!(validate_assessment_type("chess").is_err());
    }

    #[test]
    fn latest_run_wins() {
        let records = vec![
            record(IMITATION, 20.0, json!({}), 1),
            record(IMITATION, 80.0, json!({}), 5),
            record(IMITATION, 50.0, json!({}), 3),
        ];
        let latest = latest_per_type(&records);
        assert_eq!(latest.len(), 1);
        assert_eq!(latest[IMITATION].score, 80.0);
    }

    #[test]
    fn normalizes_eye_gaze_and_emotion() {
        let records = vec![
            record(
                EYE_GAZE_TRACKER,
                75.0,
                json!({"eyeContactTime": 15.0, "objectFixationTime": 5.0}),
                1,
            ),
            record(EMOTION_MATCH, 90.0, json!({"accuracy": 90, "responseTime": 2.5}), 1),
            record(PATTERN_FIXATION, 0.0, json!({"repetitiveSelectionCount": 14}), 1),
        ];
        let n = normalize(&latest_per_type(&records));
        assert_eq!(n.eye_contact_duration, 75.0);
        assert_eq!(n.fixation_ratio, 25.0);
        assert_eq!(n.accuracy, 90.0);
        assert_eq!(n.response_time, 75.0);
        assert_eq!(n.repetitive_selection_frequency, 100.0);
    }

    #[test]
    fn story_averages_with_social_attention() {
        let records = vec![
            record(SOCIAL_ATTENTION, 0.0, json!({"socialResponseTime": 60}), 1),
            record(STORY_UNDERSTANDING, 80.0, json!({}), 1),
        ];
        let n = normalize(&latest_per_type(&records));
        assert_eq!(n.social_understanding_score, 70.0);

        let records = vec![record(STORY_UNDERSTANDING, 80.0, json!({}), 1)];
        let n = normalize(&latest_per_type(&records));
        assert_eq!(n.social_understanding_score, 80.0);
    }

    #[test]
    fn turn_taking_falls_back_to_score() {
        let records = vec![record(TURN_TAKING, 65.0, json!({"waitingBehaviorScore": 0}), 1)];
        let n = normalize(&latest_per_type(&records));
        assert_eq!(n.turn_taking_behavior, 65.0);
    }

    #[test]
    fn empty_metrics_are_maximum_risk() {
        let n = NormalizedMetrics::default();
        let risk = calculate_risk(&n);
        // Everything low: eye, acc, imitation, turn = 20 + 15 + 15 + 15.
        assert_eq!(risk.probability_score, 65);
        assert_eq!(risk.risk_level, RiskLevel::Moderate);
        assert_eq!(risk.contributing_factors.len(), 4);
        assert_eq!(risk.probability_breakdown.moderate, 65);
        assert_eq!(risk.probability_breakdown.high, 45);
        assert_eq!(risk.probability_breakdown.low, 0);
    }

    #[test]
    fn strong_metrics_are_low_risk() {
        let n = NormalizedMetrics {
            accuracy: 90.0,
            eye_contact_duration: 70.0,
            imitation_success: 80.0,
            turn_taking_behavior: 80.0,
            sensory_reaction_level: 10.0,
            repetitive_selection_frequency: 10.0,
            ..Default::default()
        };
        let risk = calculate_risk(&n);
        assert_eq!(risk.risk_level, RiskLevel::Low);
        assert_eq!(risk.probability_score, 0);
        assert_eq!(
            risk.probability_breakdown,
            ProbabilityBreakdown { low: 100, moderate: 0, high: 0 }
        );

        let profile = detect_patterns(&n);
        assert_eq!(profile.social_attention.level, "Strong");
        assert_eq!(profile.sensory_processing.level, "Typical");
        assert_eq!(profile.sensory_processing.score, 90.0);
        assert!(profile.social_attention.traits.is_empty());

        let recs = recommendations(&risk, &profile);
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].category, "Continued Support");
    }

    #[test]
    fn high_risk_gets_referral_first() {
        let n = NormalizedMetrics {
            sensory_reaction_level: 80.0,
            repetitive_selection_frequency: 90.0,
            ..Default::default()
        };
        let risk = calculate_risk(&n);
        assert_eq!(risk.probability_score, 100);
        assert_eq!(risk.risk_level, RiskLevel::High);

        let profile = detect_patterns(&n);
        assert_eq!(profile.repetitive_behavior.level, "Elevated");
        assert_eq!(
            profile.repetitive_behavior.traits,
            vec!["Repetitive patterns observed"]
        );

        let recs = recommendations(&risk, &profile);
        assert_eq!(recs[0].category, "Professional Referral");
        assert!(recs.iter().any(|r| r.category == "Flexible Thinking"));
        assert!(recs.iter().any(|r| r.category == "Sensory Support"));
    }

    #[test]
    fn game_analysis_covers_all_games() {
        let records = vec![record(EMOTION_MATCH, 85.0, json!({"accuracy": 85}), 1)];
        let latest = latest_per_type(&records);
        let n = normalize(&latest);
        let games = game_wise_analysis(&latest, &n);
        assert_eq!(games.len(), 8);
        assert_eq!(games[0].interpretation, "Strong emotional recognition abilities");
        assert_eq!(games[0].score, Some(85.0));
        assert!(games[1..].iter().all(|g| g.interpretation == "Not yet completed"));
    }

    #[test]
    fn progress_compares_latest_two_runs() {
        let records = vec![
            record(IMITATION, 40.0, json!({}), 1),
            record(IMITATION, 60.0, json!({}), 2),
            record(IMITATION, 50.0, json!({}), 3),
            record(TURN_TAKING, 50.0, json!({}), 1),
        ];
        let progress = progress_tracking(&records, 2);
        assert_eq!(progress.total_sessions, 4);
        assert!(progress.has_historical_data);
        assert_eq!(progress.trends.len(), 1);
        assert_eq!(progress.trends[0].latest_score, 50.0);
        assert_eq!(progress.trends[0].previous_score, 60.0);
        assert_eq!(progress.trends[0].change, -10);
        assert_eq!(progress.trends[0].trend, "Declining");
        assert_eq!(trend_label(5.0), "Stable");
        assert_eq!(trend_label(5.1), "Improving");
    }

    #[test]
    fn negative_halves_round_toward_positive() {
        let records = vec![
            record(IMITATION, 50.0, json!({}), 1),
            record(IMITATION, 47.5, json!({}), 2),
        ];
        assert_eq!(progress_tracking(&records, 1).trends[0].change, -2);
        assert_eq!(round_half_up(2.5), 3);
        assert_eq!(round_half_up(-0.4), 0);

        let now = at(28);
        let mut rows = vec![(1, 10.0, now)];
        rows.extend((0..8).map(|_| (2, 10.0, now - Duration::days(60))));
        assert_eq!(assessment_stats(&rows, now).trend, -87);
    }

    #[test]
    fn analyze_requires_records() {
        assert!(analyze(1, &[], at(1)).is_none());
        let report = analyze(7, &[record(IMITATION, 90.0, json!({}), 1)], at(2)).unwrap();
        assert_eq!(report.student_id, 7);
        assert_eq!(report.game_wise_analysis.len(), 8);
        assert_eq!(report.disclaimer, DISCLAIMER);
    }

    #[test]
    fn stats_trend_compares_last_month() {
        let now = at(28);
        let old = now - Duration::days(60);
        let rows = vec![
            (1, 80.0, now),
            (1, 60.0, now - Duration::days(3)),
            (2, 70.0, old),
        ];
        let stats = assessment_stats(&rows, now);
        assert_eq!(stats.total_sessions, 3);
        assert_eq!(stats.active_students, 2);
        assert_eq!(stats.avg_engagement, 70);
        assert_eq!(stats.trend, 100);
    }

    #[test]
    fn stats_without_history() {
        let stats = assessment_stats(&[], at(1));
        assert_eq!(stats.total_sessions, 0);
        assert_eq!(stats.avg_engagement, 0);
        assert_eq!(stats.trend, 0);
    }
}
