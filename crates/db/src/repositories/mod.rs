//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods that
//! accept `&PgPool` as the first argument.

pub mod audit_repo;
pub mod campaign_repo;
pub mod donation_repo;
pub mod ledger_repo;
pub mod notification_repo;
pub mod task_repo;

pub use audit_repo::AuditLogRepo;
pub use campaign_repo::CampaignRepo;
pub use donation_repo::DonationRepo;
pub use ledger_repo::LedgerRepo;
pub use notification_repo::NotificationRepo;
pub use task_repo::TaskRepo;
