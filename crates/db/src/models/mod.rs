//! Row models and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` entity struct matching the database row
//! - A create DTO for inserts
//! - Where the row is exposed directly, a camelCase `Serialize` impl

pub mod appointment;
pub mod behavioral;
pub mod gaze;
pub mod patient;
pub mod password_reset;
pub mod refresh_token;
pub mod report;
pub mod screening;
pub mod slot;
pub mod social_attention;
pub mod speech;
pub mod user;

/// Serialize `TIME` columns as `HH:MM`.
pub(crate) mod hhmm {
    use chrono::NaiveTime;
    use cortexa_core::scheduling::format_time;
    use serde::Serializer;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_time(*time))
    }
}
