//! Domain rules for the Cortexa screening platform.
//!
//! Everything here is free of I/O (apart from the subprocess runner in
//! [`scripting`]) so the API and repository layers can share it.

pub mod behavioral;
pub mod error;
pub mod games;
pub mod hashing;
pub mod patient_code;
pub mod roles;
pub mod scheduling;
pub mod scripting;
pub mod social_attention;
pub mod speech;
pub mod statuses;
pub mod trends;
pub mod types;
