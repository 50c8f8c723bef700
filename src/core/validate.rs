//! Advisory consistency checking.
//!
//! Runs after construction with tighter tolerances than the construction
//! gate: a record accepted leniently (tax within 1.00, total within 5.00)
//! still gets its finer discrepancies surfaced here for human review.
//! Findings are reported, never thrown.

use rust_decimal::Decimal;

use super::types::{within, InvoiceData, ValidationReport, REPORT_TOLERANCE};

/// Check an invoice for internal numeric consistency and completeness.
///
/// Pure and total: no mutation, no panics, and any arithmetic that cannot be
/// carried out (overflow) degrades to a reported error. Line, subtotal, and
/// tax discrepancies are warnings; a total mismatch and missing critical
/// fields are blocking errors.
pub fn check_consistency(invoice: &InvoiceData) -> ValidationReport {
    let mut report = ValidationReport::valid();

    for (i, item) in invoice.items.iter().enumerate() {
        match Decimal::from(item.quantity).checked_mul(item.unit_price) {
            Some(computed) if within(item.total, computed, REPORT_TOLERANCE) => {}
            Some(computed) => report.warn(format!(
                "Line {} total mismatch: {} × {} = {}, extracted {}",
                i + 1,
                item.quantity,
                item.unit_price,
                computed,
                item.total
            )),
            None => report.error(format!("Line {} arithmetic overflow", i + 1)),
        }
    }

    let computed_subtotal = invoice
        .items
        .iter()
        .try_fold(Decimal::ZERO, |acc, item| acc.checked_add(item.total));
    match computed_subtotal {
        Some(computed) if within(invoice.subtotal, computed, REPORT_TOLERANCE) => {}
        Some(computed) => report.warn(format!(
            "Subtotal mismatch: calculated {}, extracted {}",
            computed, invoice.subtotal
        )),
        None => report.error("Subtotal arithmetic overflow"),
    }

    match invoice.subtotal.checked_mul(invoice.tax_rate) {
        Some(computed) if within(invoice.tax, computed, REPORT_TOLERANCE) => {}
        Some(computed) => {
            report.warn(format!(
                "Tax calculation mismatch: calculated {}, extracted {}",
                computed.round_dp(2),
                invoice.tax
            ));
            report.suggest(format!(
                "Expected tax of {} at rate {}",
                computed.round_dp(2),
                invoice.tax_rate
            ));
        }
        None => report.error("Tax arithmetic overflow"),
    }

    // A projected-total mismatch is the one numeric finding treated as
    // blocking, even though construction accepted the record.
    match invoice.subtotal.checked_add(invoice.tax) {
        Some(computed) if within(invoice.total, computed, REPORT_TOLERANCE) => {}
        Some(computed) => report.error(format!(
            "Total mismatch: calculated {}, extracted {}",
            computed.round_dp(2),
            invoice.total
        )),
        None => report.error("Total arithmetic overflow"),
    }

    if invoice.invoice_number.trim().is_empty() {
        report.error("Missing invoice number");
    }
    if invoice.customer_name.trim().is_empty() {
        report.error("Missing customer name");
    }
    if invoice.items.is_empty() {
        report.error("No invoice items found");
    }

    report
}
