//! Domain models for the Textile Processing Ledger

mod billing;
mod customer;
mod grade;
mod lot;
mod notification;
mod program;

pub use billing::*;
pub use customer::*;
pub use grade::*;
pub use lot::*;
pub use notification::*;
pub use program::*;
