//! # belegscan
//!
//! AI-assisted invoice extraction: turn a scanned document image into a
//! validated, typed invoice record via a vision-capable language model,
//! cross-check the extracted numbers for internal consistency, and score
//! extraction completeness.
//!
//! All monetary values use [`rust_decimal::Decimal`] — never floating point.
//! Floats appear only at the serialization edge and in the heuristic
//! confidence score.
//!
//! ## Quick Start
//!
//! ```rust
//! use belegscan::core::*;
//! use rust_decimal_macros::dec;
//!
//! let payload = InvoicePayload::from_value(&serde_json::json!({
//!     "invoice_number": "INV-1001",
//!     "customer_name": "Northwind Traders",
//!     "items": [
//!         { "item_number": "A-100", "description": "Widget",
//!           "quantity": 3, "unit_price": 10.00, "total": 30.00 }
//!     ],
//!     "subtotal": 30.00, "tax_rate": 0.08, "tax": 2.40, "total": 32.40
//! })).unwrap();
//!
//! let invoice = InvoiceData::from_payload(payload).unwrap();
//! assert_eq!(invoice.subtotal, dec!(30.00));
//!
//! let report = check_consistency(&invoice);
//! assert!(report.is_valid);
//! assert!(confidence_score(&invoice) >= 0.8);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `core` (default) | Invoice model, construction invariants, consistency checks, confidence scoring |
//! | `tabular` | Header/detail record shapes for flat tabular storage |
//! | `extract` | Extraction pipeline: image sources, vision-model client, batch orchestration |
//! | `all` | Everything |

#[cfg(feature = "core")]
pub mod core;

#[cfg(feature = "tabular")]
pub mod tabular;

#[cfg(feature = "extract")]
pub mod extract;

// Re-export core types at crate root for convenience
#[cfg(feature = "core")]
pub use crate::core::*;
