//! Score summaries for the camera and audio driven assessment games.
//!
//! The browser extracts landmarks and reaction times; these functions turn
//! those raw signals into the score, metrics and indicator chips that are
//! stored with a behavioural assessment.

use serde::{Deserialize, Serialize};
use serde_json::json;

// ---------------------------------------------------------------------------
// Shared types
// ---------------------------------------------------------------------------

pub const COLOR_GOOD: &str = "#10b981";
pub const COLOR_WARN: &str = "#f59e0b";
pub const COLOR_BAD: &str = "#ef4444";

/// A labelled status chip shown next to an assessment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicator {
    pub label: String,
    pub status: String,
    pub color: String,
}

impl Indicator {
    fn new(label: &str, status: &str, color: &str) -> Self {
        Self {
            label: label.to_string(),
            status: status.to_string(),
            color: color.to_string(),
        }
    }
}

/// Computed score, metrics and indicators for one game run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSummary {
    pub score: f64,
    pub metrics: serde_json::Value,
    pub indicators: Vec<Indicator>,
}

// ---------------------------------------------------------------------------
// Sound sensitivity
// ---------------------------------------------------------------------------

/// Reaction time recorded when the child does not react within the window.
pub const NO_REACTION_SECS: f64 = 3.0;

/// Reactions faster than this count as an orienting gaze shift.
pub const GAZE_SHIFT_SECS: f64 = 1.5;

/// A loud-stimulus reaction faster than this suggests hypersensitivity.
pub const STARTLE_SECS: f64 = 0.6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StimulusKind {
    Soft,
    Loud,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SoundResponse {
    #[serde(rename = "type")]
    pub kind: StimulusKind,
    /// Seconds until the child reacted; `None` when no reaction was seen.
    pub response_time: Option<f64>,
}

impl SoundResponse {
    fn seconds(&self) -> f64 {
        self.response_time.unwrap_or(NO_REACTION_SECS)
    }
}

pub fn summarize_sound_sensitivity(responses: &[SoundResponse]) -> GameSummary {
    let avg = if responses.is_empty() {
        NO_REACTION_SECS
    } else {
        responses.iter().map(SoundResponse::seconds).sum::<f64>() / responses.len() as f64
    };
    let gaze_shifts = responses
        .iter()
        .filter(|r| r.seconds() < GAZE_SHIFT_SECS)
        .count();
    let sensitive = responses
        .iter()
        .any(|r| r.kind == StimulusKind::Loud && r.seconds() < STARTLE_SECS);

    let score = (100.0 - avg * 20.0).round().clamp(0.0, 100.0);

    let reactivity = if sensitive {
        Indicator::new("Auditory Reactivity", "High Sensitivity", COLOR_BAD)
    } else {
        Indicator::new("Auditory Reactivity", "Typical", COLOR_GOOD)
    };
    let orienting = if gaze_shifts > 2 {
        Indicator::new("Orienting Response", "Strong", COLOR_GOOD)
    } else {
        Indicator::new("Orienting Response", "Delayed", COLOR_WARN)
    };

    GameSummary {
        score,
        metrics: json!({
            "sensoryResponseTime": round_to(avg, 2),
            "gazeShiftCount": gaze_shifts,
        }),
        indicators: vec![reactivity, orienting],
    }
}

// ---------------------------------------------------------------------------
// Eye-gaze tracker
// ---------------------------------------------------------------------------

/// Frame-derived eye-gaze tracker totals.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EyeGazeSample {
    pub eye_contact_ms: f64,
    pub object_focus_ms: f64,
    pub gaze_shift_count: u32,
}

pub fn eye_contact_status(ratio: f64) -> (&'static str, &'static str) {
    if ratio > 0.6 {
        ("Optimal", COLOR_GOOD)
    } else if ratio > 0.3 {
        ("Moderate", COLOR_WARN)
    } else {
        ("Reduced", COLOR_BAD)
    }
}

pub fn gaze_stability_status(shifts: u32) -> (&'static str, &'static str) {
    if shifts < 20 {
        ("Stable", COLOR_GOOD)
    } else if shifts < 50 {
        ("Moderate", COLOR_WARN)
    } else {
        ("Frequent Shifts", COLOR_BAD)
    }
}

pub fn summarize_eye_gaze(sample: &EyeGazeSample) -> GameSummary {
    let total = sample.eye_contact_ms + sample.object_focus_ms;
    let ratio = if total > 0.0 {
        sample.eye_contact_ms / total
    } else {
        0.0
    };
    let object_ratio = if total > 0.0 { 1.0 - ratio } else { 0.0 };

    let (contact_status, contact_color) = eye_contact_status(ratio);
    let (stability_status, stability_color) = gaze_stability_status(sample.gaze_shift_count);

    GameSummary {
        score: (ratio * 100.0).round(),
        metrics: json!({
            "eyeContactTime": round_to(sample.eye_contact_ms / 1000.0, 2),
            "objectFixationTime": round_to(sample.object_focus_ms / 1000.0, 2),
            "eyeContactRatio": round_to(ratio, 3),
            "objectFocusRatio": round_to(object_ratio, 3),
            "gazeShiftCount": sample.gaze_shift_count,
        }),
        indicators: vec![
            Indicator::new("Eye Contact Ratio", contact_status, contact_color),
            Indicator::new("Gaze Stability", stability_status, stability_color),
        ],
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resp(kind: StimulusKind, secs: Option<f64>) -> SoundResponse {
        SoundResponse {
            kind,
            response_time: secs,
        }
    }

    #[test]
    fn quick_reactions_score_high() {
        let summary = summarize_sound_sensitivity(&[
            resp(StimulusKind::Soft, Some(1.0)),
            resp(StimulusKind::Loud, Some(1.0)),
        ]);
        assert_eq!(summary.score, 80.0);
        assert_eq!(summary.metrics["sensoryResponseTime"], 1.0);
        assert_eq!(summary.metrics["gazeShiftCount"], 2);
        assert_eq!(summary.indicators[0].status, "Typical");
        assert_eq!(summary.indicators[1].status, "Delayed");
    }

    #[test]
    fn missing_reactions_count_as_timeout() {
        let summary = summarize_sound_sensitivity(&[
            resp(StimulusKind::Soft, None),
            resp(StimulusKind::Loud, None),
        ]);
        assert_eq!(summary.score, 40.0);
        assert_eq!(summary.metrics["gazeShiftCount"], 0);
    }

    #[test]
    fn loud_startle_flags_sensitivity() {
        let summary = summarize_sound_sensitivity(&[
            resp(StimulusKind::Loud, Some(0.4)),
            resp(StimulusKind::Soft, Some(0.3)),
            resp(StimulusKind::Soft, Some(0.5)),
            resp(StimulusKind::Loud, Some(1.2)),
        ]);
        assert_eq!(summary.indicators[0].status, "High Sensitivity");
        assert_eq!(summary.indicators[0].color, COLOR_BAD);
        assert_eq!(summary.indicators[1].status, "Strong");
    }

    #[test]
    fn soft_startle_is_not_sensitivity() {
        let summary = summarize_sound_sensitivity(&[resp(StimulusKind::Soft, Some(0.2))]);
        assert_eq!(summary.indicators[0].status, "Typical");
    }

    #[test]
    fn score_is_clamped() {
        let summary = summarize_sound_sensitivity(&[resp(StimulusKind::Soft, Some(0.0))]);
        assert_eq!(summary.score, 100.0);
        let summary = summarize_sound_sensitivity(&[resp(StimulusKind::Soft, Some(9.0))]);
        assert_eq!(summary.score, 0.0);
    }

    #[test]
    fn eye_contact_bands() {
        assert_eq!(eye_contact_status(0.61).0, "Optimal");
        assert_eq!(eye_contact_status(0.6).0, "Moderate");
        assert_eq!(eye_contact_status(0.31).0, "Moderate");
        assert_eq!(eye_contact_status(0.3).0, "Reduced");
    }

    #[test]
    fn eye_gaze_score_is_ratio_percentage() {
        let summary = summarize_eye_gaze(&EyeGazeSample {
            eye_contact_ms: 21_000.0,
            object_focus_ms: 9_000.0,
            gaze_shift_count: 25,
        });
        assert_eq!(summary.score, 70.0);
        assert_eq!(summary.metrics["eyeContactRatio"], 0.7);
        assert_eq!(summary.metrics["eyeContactTime"], 21.0);
        assert_eq!(summary.indicators[0].status, "Optimal");
        assert_eq!(summary.indicators[1].status, "Moderate");
    }

    #[test]
    fn eye_gaze_without_frames_scores_zero() {
        let summary = summarize_eye_gaze(&EyeGazeSample {
            eye_contact_ms: 0.0,
            object_focus_ms: 0.0,
            gaze_shift_count: 0,
        });
        assert_eq!(summary.score, 0.0);
        assert_eq!(summary.indicators[0].status, "Reduced");
    }
}
