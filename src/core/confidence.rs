//! Heuristic extraction-confidence scoring.
//!
//! The score is a completeness heuristic, not a calibrated probability: a
//! fixed base for "the structured parse succeeded at all" plus fixed
//! increments per completeness signal, capped at 1.0. No calibration data
//! backs these numbers.

use rust_decimal::Decimal;

use super::types::InvoiceData;

const BASE_SCORE: f64 = 0.8;
const INCREMENT: f64 = 0.1;

/// Score a parsed invoice's completeness in `[0, 1]`.
///
/// Item presence intentionally counts twice (a `0.2` contribution for a
/// non-empty item list), matching the upstream scoring table so score values
/// stay comparable across systems.
pub fn confidence_score(invoice: &InvoiceData) -> f64 {
    let mut score = BASE_SCORE;

    if !invoice.invoice_number.is_empty() {
        score += INCREMENT;
    }
    if !invoice.customer_name.is_empty() {
        score += INCREMENT;
    }
    if !invoice.items.is_empty() {
        score += 2.0 * INCREMENT;
    }
    if !invoice.billing_address.street.is_empty() && !invoice.billing_address.city.is_empty() {
        score += INCREMENT;
    }
    if invoice.subtotal > Decimal::ZERO {
        score += INCREMENT;
    }
    if invoice.total > Decimal::ZERO {
        score += INCREMENT;
    }
    if invoice.tax_rate >= Decimal::ZERO {
        score += INCREMENT;
    }
    if invoice.invoice_date.is_some() {
        score += INCREMENT;
    }
    if !invoice.items.is_empty()
        && invoice
            .items
            .iter()
            .all(|item| !item.description.is_empty() && item.quantity > 0)
    {
        score += INCREMENT;
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Address, LineItem};
    use chrono::{NaiveDate, Utc};
    use rust_decimal_macros::dec;

    fn sparse_invoice() -> InvoiceData {
        InvoiceData {
            id: "inv-1".into(),
            invoice_number: String::new(),
            invoice_date: None,
            customer_id: None,
            customer_name: String::new(),
            billing_address: Address::default(),
            shipping_address: Address::default(),
            items: Vec::new(),
            subtotal: Decimal::ZERO,
            tax_rate: Decimal::ZERO,
            tax: Decimal::ZERO,
            total: Decimal::ZERO,
            salesperson: None,
            po_number: None,
            terms: None,
            ship_date: None,
            ship_via: None,
            fob: None,
            created_at: Utc::now(),
            updated_at: None,
            extraction_confidence: None,
        }
    }

    #[test]
    fn sparse_invoice_scores_base_plus_tax_rate_signal() {
        // tax_rate >= 0 always holds for a Decimal coming out of
        // construction, so even an otherwise empty record gets 0.9.
        let score = confidence_score(&sparse_invoice());
        assert!((score - 0.9).abs() < 1e-9);
    }

    #[test]
    fn complete_invoice_caps_at_one() {
        let mut inv = sparse_invoice();
        inv.invoice_number = "INV-1001".into();
        inv.customer_name = "Northwind Traders".into();
        inv.invoice_date = NaiveDate::from_ymd_opt(2024, 6, 15);
        inv.billing_address.street = "1 Main St".into();
        inv.billing_address.city = "Springfield".into();
        inv.subtotal = dec!(100.00);
        inv.total = dec!(108.00);
        inv.items = vec![LineItem {
            id: "l1".into(),
            item_number: "A-100".into(),
            description: "Widget".into(),
            quantity: 3,
            unit_price: dec!(10.00),
            total: dec!(30.00),
        }];
        assert_eq!(confidence_score(&inv), 1.0);
    }

    #[test]
    fn adding_signals_never_lowers_the_score() {
        let mut inv = sparse_invoice();
        let mut last = confidence_score(&inv);

        inv.invoice_number = "INV-1001".into();
        let s = confidence_score(&inv);
        assert!(s >= last);
        last = s;

        inv.customer_name = "Northwind Traders".into();
        let s = confidence_score(&inv);
        assert!(s >= last);
        last = s;

        inv.invoice_date = NaiveDate::from_ymd_opt(2024, 6, 15);
        let s = confidence_score(&inv);
        assert!(s >= last);
        last = s;

        inv.items = vec![LineItem {
            id: "l1".into(),
            item_number: String::new(),
            description: "Widget".into(),
            quantity: 1,
            unit_price: dec!(1.00),
            total: dec!(1.00),
        }];
        assert!(confidence_score(&inv) >= last);
    }

    #[test]
    fn item_without_description_skips_the_quality_increment() {
        let mut with_desc = sparse_invoice();
        with_desc.items = vec![LineItem {
            id: "l1".into(),
            item_number: String::new(),
            description: "Widget".into(),
            quantity: 1,
            unit_price: dec!(1.00),
            total: dec!(1.00),
        }];
        let mut without_desc = with_desc.clone();
        without_desc.items[0].description = String::new();

        let delta = confidence_score(&with_desc) - confidence_score(&without_desc);
        assert!((delta - 0.1).abs() < 1e-9 || confidence_score(&with_desc) == 1.0);
    }
}
