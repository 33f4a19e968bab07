//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod appointment_repo;
pub mod behavioral_repo;
pub mod gaze_repo;
pub mod password_reset_repo;
pub mod patient_repo;
pub mod refresh_token_repo;
pub mod report_repo;
pub mod screening_repo;
pub mod slot_repo;
pub mod social_attention_repo;
pub mod speech_repo;
pub mod user_repo;

pub use appointment_repo::AppointmentRepo;
pub use behavioral_repo::BehavioralRepo;
pub use gaze_repo::GazeRepo;
pub use password_reset_repo::PasswordResetRepo;
pub use patient_repo::PatientRepo;
pub use refresh_token_repo::RefreshTokenRepo;
pub use report_repo::ReportRepo;
pub use screening_repo::ScreeningRepo;
pub use slot_repo::SlotRepo;
pub use social_attention_repo::SocialAttentionRepo;
pub use speech_repo::SpeechRepo;
pub use user_repo::UserRepo;
