//! Domain model structs and DTOs.
//!
//! Each submodule contains a `FromRow` + `Serialize` entity struct matching
//! the database row, plus the `Deserialize` DTOs used to create or patch it.

pub mod audit;
pub mod campaign;
pub mod donation;
pub mod notification;
pub mod task;
