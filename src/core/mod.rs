//! Core invoice model, construction invariants, consistency validation,
//! and confidence scoring.
//!
//! Construction is the trust boundary: raw model output enters as an
//! [`InvoicePayload`] and leaves as a validated [`InvoiceData`] or a
//! [`ValidationError`] naming the violated invariant.

mod confidence;
mod error;
mod payload;
mod types;
mod validate;

pub use confidence::confidence_score;
pub use error::{ExtractError, ValidationError};
pub use payload::{invoice_json_schema, AddressPayload, InvoicePayload, ItemPayload};
pub use types::{
    Address, ExtractionResult, InvoiceData, InvoiceUpdate, LineItem, ValidationReport,
    LINE_TOTAL_TOLERANCE, REPORT_TOLERANCE, SUBTOTAL_TOLERANCE, TAX_TOLERANCE, TOTAL_TOLERANCE,
};
pub use validate::check_consistency;
