//! Well-known role names and the flat role -> permission mapping.
//!
//! Role names must match the `role` values written by the authenticator and
//! the default in `20261001000001_create_users_table.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_USER: &str = "user";
pub const ROLE_GUEST: &str = "guest";

/// Permission names.
pub mod permissions {
    pub const PROFILE_READ: &str = "profile:read";
    pub const PROFILE_WRITE: &str = "profile:write";
    pub const SESSIONS_MANAGE: &str = "sessions:manage";
    pub const USERS_MANAGE: &str = "users:manage";
}

use permissions::*;

const ADMIN_PERMISSIONS: &[&str] = &[PROFILE_READ, PROFILE_WRITE, SESSIONS_MANAGE, USERS_MANAGE];
const USER_PERMISSIONS: &[&str] = &[PROFILE_READ, PROFILE_WRITE, SESSIONS_MANAGE];
const GUEST_PERMISSIONS: &[&str] = &[PROFILE_READ];

/// Permissions granted to `role`. Unknown roles get none.
pub fn permissions_for(role: &str) -> &'static [&'static str] {
    match role {
        ROLE_ADMIN => ADMIN_PERMISSIONS,
        ROLE_USER => USER_PERMISSIONS,
        ROLE_GUEST => GUEST_PERMISSIONS,
        _ => &[],
    }
}

/// Whether `role` grants `permission`.
pub fn has_permission(role: &str, permission: &str) -> bool {
    permissions_for(role).contains(&permission)
}
