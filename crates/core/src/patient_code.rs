//! Human-readable patient identifiers of the form `PAT-<millis>-<SUFFIX>`.

use rand::Rng;

/// Prefix on every generated patient code.
pub const PATIENT_CODE_PREFIX: &str = "PAT";

/// Number of random base-36 characters appended to the timestamp.
const SUFFIX_LENGTH: usize = 6;

const BASE36_UPPER: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Generate a patient code from the current wall-clock time.
pub fn generate_patient_code() -> String {
    patient_code_at(chrono::Utc::now().timestamp_millis())
}

/// Generate a patient code for a given millisecond timestamp.
pub fn patient_code_at(millis: i64) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..SUFFIX_LENGTH)
        .map(|_| BASE36_UPPER[rng.random_range(0..BASE36_UPPER.len())] as char)
        .collect();
    format!("{PATIENT_CODE_PREFIX}-{millis}-{suffix}")
}

/// Check that `code` has the `PAT-<digits>-<6 base36>` shape.
pub fn is_patient_code(code: &str) -> bool {
    let mut parts = code.split('-');
    let (Some(prefix), Some(millis), Some(suffix), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };
    prefix == PATIENT_CODE_PREFIX
        && !millis.is_empty()
        && millis.bytes().all(|b| b.is_ascii_digit())
        && suffix.len() == SUFFIX_LENGTH
        && suffix.bytes().all(|b| BASE36_UPPER.contains(&b))
}
