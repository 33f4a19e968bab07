//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- access tokens and refresh-token helpers.
//! - [`otp`] -- one-time codes for password resets.

pub mod jwt;
pub mod otp;
pub mod password;
