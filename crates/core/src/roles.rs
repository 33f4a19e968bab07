//! Well-known role name constants.
//!
//! These must match the `ck_users_role` check constraint in the initial migration.

pub const ROLE_PARENT: &str = "parent";
pub const ROLE_THERAPIST: &str = "therapist";
pub const ROLE_TEACHER: &str = "teacher";
pub const ROLE_RESEARCHER: &str = "researcher";
pub const ROLE_ADMIN: &str = "admin";

/// Every role a user may register with.
pub const ALL_ROLES: &[&str] = &[
    ROLE_PARENT,
    ROLE_THERAPIST,
    ROLE_TEACHER,
    ROLE_RESEARCHER,
    ROLE_ADMIN,
];

/// Returns `true` if `role` is one of [`ALL_ROLES`].
pub fn is_valid_role(role: &str) -> bool {
    ALL_ROLES.contains(&role)
}

/// Roles allowed to evaluate speech recordings and review clinical data.
pub fn is_clinician(role: &str) -> bool {
    role == ROLE_TEACHER || role == ROLE_THERAPIST
}
