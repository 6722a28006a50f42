//! Ledger services for the Textile Processing Ledger engine

mod numbering;

pub mod allocation;
pub mod billing;
pub mod catalog;
pub mod lot;
pub mod notification;
pub mod program;
pub mod rates;

pub use allocation::AllocationService;
pub use billing::BillingService;
pub use catalog::CatalogService;
pub use lot::LotService;
pub use notification::NotificationService;
pub use program::ProgramService;
pub use rates::RateService;
