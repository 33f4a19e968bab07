//! Speech-therapy ratings and progress summaries.

use serde::Serialize;

use crate::error::CoreError;
use crate::statuses;

/// Upload extensions accepted for practice recordings.
pub const AUDIO_EXTENSIONS: &[&str] = &["webm", "mp3", "wav", "ogg", "m4a", "mp4"];

/// Evaluated sessions needed before an improvement trend is reported.
const TREND_MIN_SESSIONS: usize = 6;

/// Sessions averaged at each end of the history when computing the trend.
const TREND_WINDOW: usize = 3;

/// Difference in mean rating treated as a real change.
const TREND_DELTA: f64 = 0.3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Rating {
    Poor,
    Average,
    Good,
}

impl Rating {
    /// Parse an evaluator-supplied rating. `Not Rated` is not accepted here.
    pub fn parse(value: &str) -> Result<Self, CoreError> {
        match value {
            "Poor" => Ok(Self::Poor),
            "Average" => Ok(Self::Average),
            "Good" => Ok(Self::Good),
            _ => Err(CoreError::Validation(
                "Valid rating is required (Poor/Average/Good)".into(),
            )),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Poor => "Poor",
            Self::Average => "Average",
            Self::Good => "Good",
        }
    }

    pub fn value(self) -> f64 {
        match self {
            Self::Poor => 1.0,
            Self::Average => 2.0,
            Self::Good => 3.0,
        }
    }
}

pub fn is_audio_extension(ext: &str) -> bool {
    AUDIO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
}

/// One stored session as seen by the progress calculation, oldest first.
#[derive(Debug, Clone)]
pub struct RatedSession<'a> {
    pub status: &'a str,
    pub rating: &'a str,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RatingDistribution {
    pub poor: usize,
    pub average: usize,
    pub good: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressSummary {
    pub total_sessions: usize,
    pub evaluated_sessions: usize,
    pub pending_sessions: usize,
    pub average_rating: f64,
    pub improvement: &'static str,
    pub rating_distribution: RatingDistribution,
}

pub fn improvement_label(first_avg: f64, last_avg: f64) -> &'static str {
    let diff = last_avg - first_avg;
    if diff > TREND_DELTA {
        "Improving"
    } else if diff < -TREND_DELTA {
        "Needs attention"
    } else {
        "Stable"
    }
}

/// Summarise a child's sessions. `sessions` must be ordered oldest first.
pub fn summarize_progress(sessions: &[RatedSession<'_>]) -> ProgressSummary {
    if sessions.is_empty() {
        return ProgressSummary {
            total_sessions: 0,
            evaluated_sessions: 0,
            pending_sessions: 0,
            average_rating: 0.0,
            improvement: "No data yet",
            rating_distribution: RatingDistribution::default(),
        };
    }

    let evaluated: Vec<&RatedSession<'_>> = sessions
        .iter()
        .filter(|s| s.status == statuses::speech::EVALUATED)
        .collect();
    // Evaluated rows with an unrecognised rating count towards the mean as 0.
    let ratings: Vec<Option<Rating>> = evaluated
        .iter()
        .map(|s| Rating::parse(s.rating).ok())
        .collect();
    let known: Vec<Rating> = ratings.iter().flatten().copied().collect();

    let average_rating = if evaluated.is_empty() {
        0.0
    } else {
        let sum: f64 = known.iter().map(|r| r.value()).sum();
        (sum / evaluated.len() as f64 * 100.0).round() / 100.0
    };

    let improvement = if evaluated.len() >= TREND_MIN_SESSIONS {
        let window = |slice: &[Option<Rating>]| {
            slice.iter().map(|r| r.map_or(0.0, Rating::value)).sum::<f64>() / TREND_WINDOW as f64
        };
        let first = window(&ratings[..TREND_WINDOW]);
        let last = window(&ratings[ratings.len() - TREND_WINDOW..]);
        improvement_label(first, last)
    } else {
        "Insufficient data"
    };

    let count = |r: Rating| known.iter().filter(|k| **k == r).count();

    ProgressSummary {
        total_sessions: sessions.len(),
        evaluated_sessions: evaluated.len(),
        pending_sessions: sessions.len() - evaluated.len(),
        average_rating,
        improvement,
        rating_distribution: RatingDistribution {
            poor: count(Rating::Poor),
            average: count(Rating::Average),
            good: count(Rating::Good),
        },
    }
}
