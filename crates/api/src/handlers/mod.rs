//! Request handlers, one submodule per route area.
//!
//! Handlers authenticate through the extractors in [`crate::middleware`],
//! delegate persistence to the repositories in `cortexa_db` and map errors
//! via [`AppError`](crate::error::AppError).

pub mod admin;
pub mod auth;
pub mod behavioral;
pub mod gaze;
pub mod guest;
pub mod parent;
pub mod screenings;
pub mod social_attention;
pub mod speech;
pub mod teacher;
pub mod therapist;
