//! Six-digit password-reset codes.

use chrono::Duration;
use cortexa_core::hashing::sha256_hex;
use rand::Rng;

/// How long an issued code stays valid.
pub const OTP_VALIDITY_MINS: i64 = 10;

pub fn validity() -> Duration {
    Duration::minutes(OTP_VALIDITY_MINS)
}

/// A fresh code with no leading-zero truncation (`000042` stays six digits).
pub fn generate_otp() -> String {
    format!("{:06}", rand::rng().random_range(0..1_000_000u32))
}

/// Codes are stored hashed; surrounding whitespace from copy-paste is ignored.
pub fn hash_otp(otp: &str) -> String {
    sha256_hex(otp.trim().as_bytes())
}

pub fn is_well_formed(otp: &str) -> bool {
    let otp = otp.trim();
    otp.len() == 6 && otp.bytes().all(|b| b.is_ascii_digit())
}
