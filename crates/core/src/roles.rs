//! Platform roles and the authenticated actor context.
//!
//! The identity provider authenticates users and hands the engine an
//! [`Actor`]; nothing in this crate re-validates sessions.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::types::DbId;

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_DONOR: &str = "donor";
pub const ROLE_VOLUNTEER: &str = "volunteer";
pub const ROLE_DONEE: &str = "donee";
/// Machine role used by payment-processor integrations.
pub const ROLE_SYSTEM: &str = "system";

/// A platform role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(type_name = "TEXT", rename_all = "snake_case")]
pub enum Role {
    Admin,
    Donor,
    Volunteer,
    Donee,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => ROLE_ADMIN,
            Self::Donor => ROLE_DONOR,
            Self::Volunteer => ROLE_VOLUNTEER,
            Self::Donee => ROLE_DONEE,
            Self::System => ROLE_SYSTEM,
        }
    }

    /// Parse a role name as carried in identity-provider claims.
    pub fn parse(name: &str) -> Result<Self, CoreError> {
        match name {
            ROLE_ADMIN => Ok(Self::Admin),
            ROLE_DONOR => Ok(Self::Donor),
            ROLE_VOLUNTEER => Ok(Self::Volunteer),
            ROLE_DONEE => Ok(Self::Donee),
            ROLE_SYSTEM => Ok(Self::System),
            other => Err(CoreError::Validation(format!("Unknown role '{other}'"))),
        }
    }
}

/// The authenticated `{userId, role}` context attached to every inbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub user_id: DbId,
    pub role: Role,
}

impl Actor {
    pub fn new(user_id: DbId, role: Role) -> Self {
        Self { user_id, role }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Fail with `Forbidden` unless the actor is an administrator.
    pub fn require_admin(&self) -> Result<(), CoreError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(CoreError::Forbidden("Admin role required".into()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_round_trips_every_role() {
        for role in [Role::Admin, Role::Donor, Role::Volunteer, Role::Donee, Role::System] {
            assert_eq!(Role::parse(role.as_str()).unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert!(Role::parse("superuser").is_err());
    }

    #[test]
    fn only_admin_passes_require_admin() {
        assert!(Actor::new(1, Role::Admin).require_admin().is_ok());
        assert!(Actor::new(1, Role::Volunteer).require_admin().is_err());
    }
}
