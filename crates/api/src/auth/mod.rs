//! Bearer-token validation for identities issued by the external provider.

pub mod jwt;
