//! Preferential-looking scoring for the social-attention test.
//!
//! A social video plays on the left and an abstract pattern on the right.
//! The client samples gaze every [`FRAME_INTERVAL_MS`] and each left/right
//! sample adds that much time to the matching bucket.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Milliseconds credited per left/right frame.
pub const FRAME_INTERVAL_MS: i64 = 300;

/// Normalised iris x below which the child is looking left.
pub const LEFT_GAZE_THRESHOLD: f64 = 0.45;

/// Normalised iris x above which the child is looking right.
pub const RIGHT_GAZE_THRESHOLD: f64 = 0.55;

/// Preference below this is flagged as a strong non-social preference.
const SIGNIFICANT_THRESHOLD: f64 = 40.0;

/// Preference below this is flagged as reduced social preference.
const REDUCED_THRESHOLD: f64 = 50.0;

pub const SUMMARY_SIGNIFICANT: &str = "Significant preference for non-social stimuli detected. \
This pattern is often observed in children with social-communication challenges.";
pub const SUMMARY_REDUCED: &str = "Reduced social preference noted. \
Visual attention is split between social and non-social stimuli.";
pub const SUMMARY_TYPICAL: &str = "Typical social preference pattern. \
The child showed sustained interest in the social stimulus.";

// ---------------------------------------------------------------------------
// Gaze side
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GazeSide {
    Left,
    Right,
    Center,
}

impl GazeSide {
    /// Classify a normalised (0..1) horizontal iris position.
    pub fn from_iris_x(x: f64) -> Self {
        if x < LEFT_GAZE_THRESHOLD {
            Self::Left
        } else if x > RIGHT_GAZE_THRESHOLD {
            Self::Right
        } else {
            Self::Center
        }
    }

    pub fn parse(label: &str) -> Result<Self, CoreError> {
        match label {
            "left" => Ok(Self::Left),
            "right" => Ok(Self::Right),
            "center" => Ok(Self::Center),
            other => Err(CoreError::Validation(format!(
                "Invalid gaze '{other}', expected left, right or center"
            ))),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
            Self::Center => "center",
        }
    }
}

// ---------------------------------------------------------------------------
// Accumulator
// ---------------------------------------------------------------------------

/// Running left/right look-time totals for one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LookTimes {
    pub left_ms: i64,
    pub right_ms: i64,
}

impl LookTimes {
    /// Credit one sampled frame. Centre frames carry no time.
    pub fn record(&mut self, side: GazeSide) {
        match side {
            GazeSide::Left => self.left_ms += FRAME_INTERVAL_MS,
            GazeSide::Right => self.right_ms += FRAME_INTERVAL_MS,
            GazeSide::Center => {}
        }
    }

    pub fn total_ms(&self) -> i64 {
        self.left_ms + self.right_ms
    }

    pub fn score(&self) -> AttentionScore {
        AttentionScore::from_times(self.left_ms, self.right_ms)
    }
}

// ---------------------------------------------------------------------------
// Scoring
// ---------------------------------------------------------------------------

/// Final metrics for a completed session.
#[derive(Debug, Clone, PartialEq)]
pub struct AttentionScore {
    /// Percentage of tracked time spent on the social stimulus.
    pub social_preference: f64,
    pub left_percentage: f64,
    pub right_percentage: f64,
    pub clinical_summary: &'static str,
    pub risk_flag: bool,
}

impl AttentionScore {
    pub fn from_times(left_ms: i64, right_ms: i64) -> Self {
        let total = left_ms + right_ms;
        let pct = |part: i64| {
            if total > 0 {
                round1(part as f64 / total as f64 * 100.0)
            } else {
                0.0
            }
        };
        let social_preference = pct(left_ms);
        let (clinical_summary, risk_flag) = interpret(social_preference);

        Self {
            social_preference,
            left_percentage: social_preference,
            right_percentage: pct(right_ms),
            clinical_summary,
            risk_flag,
        }
    }
}

/// Map a social preference percentage to its clinical summary and risk flag.
pub fn interpret(social_preference: f64) -> (&'static str, bool) {
    if social_preference < SIGNIFICANT_THRESHOLD {
        (SUMMARY_SIGNIFICANT, true)
    } else if social_preference < REDUCED_THRESHOLD {
        (SUMMARY_REDUCED, true)
    } else {
        (SUMMARY_TYPICAL, false)
    }
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
