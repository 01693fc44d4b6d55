//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the caller identified by a bearer token.
//! - [`rbac::RequireAdmin`] -- requires the `admin` role.
//! - [`rbac::RequireVolunteer`] -- requires the `volunteer` role.
//! - [`rbac::RequireSystem`] -- requires the `system` role (payment processor).

pub mod auth;
pub mod rbac;
