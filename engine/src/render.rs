//! Document renderer seam
//!
//! The engine does not render bill documents itself. Callers inject a
//! [`DocumentRenderer`] (PDF, spreadsheet, anything) which receives the
//! bill's resolved line items and returns an opaque byte blob that the
//! engine stores on the bill.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// One billed program as it appears on the rendered document
#[derive(Debug, Clone, Serialize)]
pub struct BillLineItem {
    pub program_number: String,
    pub design_ref: Option<String>,
    pub grade_name: String,
    /// Lot numbers the program drew from, in allocation order
    pub lot_numbers: Vec<String>,
    /// Billed quantity (the program's output)
    pub quantity: Decimal,
    pub rate: Decimal,
    pub amount: Decimal,
}

/// Everything a renderer needs to produce a bill document
#[derive(Debug, Clone, Serialize)]
pub struct BillDocument {
    pub bill_number: String,
    pub bill_date: NaiveDate,
    pub customer_name: String,
    pub customer_address: Option<String>,
    pub currency_symbol: String,
    pub tax_registered: bool,
    pub line_items: Vec<BillLineItem>,
    pub subtotal: Decimal,
    pub tax_total: Decimal,
    pub grand_total: Decimal,
}

/// External document renderer
pub trait DocumentRenderer: Send + Sync {
    /// Render the bill into an opaque blob (e.g. a PDF) for storage
    fn render(&self, document: &BillDocument) -> anyhow::Result<Vec<u8>>;
}
