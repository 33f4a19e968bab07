//! Status vocabularies persisted as `TEXT` columns.
//!
//! Each group mirrors a `CHECK` constraint in the migrations. Handlers and
//! repositories should use these constants rather than string literals.

// ---------------------------------------------------------------------------
// Accounts
// ---------------------------------------------------------------------------

pub mod account {
    pub const PENDING: &str = "pending";
    pub const APPROVED: &str = "approved";
    pub const REJECTED: &str = "rejected";
}

// ---------------------------------------------------------------------------
// Appointments
// ---------------------------------------------------------------------------

pub mod appointment {
    pub const PENDING: &str = "pending";
    pub const CONFIRMED: &str = "confirmed";
    pub const COMPLETED: &str = "completed";
    pub const CANCELLED: &str = "cancelled";

    /// Label shown on the therapist dashboard for a stored status.
    pub fn display_label(status: &str) -> &'static str {
        match status {
            CONFIRMED => "Scheduled",
            COMPLETED => "Completed",
            CANCELLED => "Cancelled",
            _ => "Pending",
        }
    }
}

// ---------------------------------------------------------------------------
// Patients
// ---------------------------------------------------------------------------

/// Values for `patients.screening_status` and `patients.report_status`.
pub mod progress {
    pub const PENDING: &str = "pending";
    pub const COMPLETED: &str = "completed";
}

// ---------------------------------------------------------------------------
// Gaze sessions
// ---------------------------------------------------------------------------

pub mod gaze {
    pub const ACTIVE: &str = "active";
    pub const COMPLETED: &str = "completed";
    pub const PENDING_REVIEW: &str = "pending_review";
    pub const REVIEWED: &str = "reviewed";
}

// ---------------------------------------------------------------------------
// Social attention
// ---------------------------------------------------------------------------

pub mod social_attention {
    pub const ACTIVE: &str = "ACTIVE";
    pub const COMPLETED: &str = "COMPLETED";
}

// ---------------------------------------------------------------------------
// Screenings
// ---------------------------------------------------------------------------

pub mod screening {
    pub const TYPES: &[&str] = &["facial", "voice", "mri", "gaze", "questionnaire"];
    pub const RESULTS: &[&str] = &["low_risk", "medium_risk", "high_risk"];

    /// Screening types that must carry an uploaded file.
    pub fn requires_file(screening_type: &str) -> bool {
        matches!(screening_type, "facial" | "voice" | "mri")
    }
}

// ---------------------------------------------------------------------------
// Reports
// ---------------------------------------------------------------------------

pub mod report {
    pub const DRAFT: &str = "draft";
    pub const FINAL: &str = "final";
}

// ---------------------------------------------------------------------------
// Speech therapy
// ---------------------------------------------------------------------------

pub mod speech {
    pub const PENDING: &str = "pending";
    pub const EVALUATED: &str = "evaluated";
    pub const ARCHIVED: &str = "archived";

    pub const NOT_RATED: &str = "Not Rated";
}

// ---------------------------------------------------------------------------
// Slots
// ---------------------------------------------------------------------------

pub mod slot_mode {
    pub const IN_PERSON: &str = "In-person";
    pub const ONLINE: &str = "Online";

    pub fn is_valid(mode: &str) -> bool {
        mode == IN_PERSON || mode == ONLINE
    }
}
