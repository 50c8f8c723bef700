//! Header/detail tabular shapes.
//!
//! Flat-file storage keeps invoices in two tables: one header row of
//! invoice-level fields and N detail rows of per-line fields keyed by the
//! invoice id. These records are the storage collaborator's wire format;
//! the read/append/update/delete mechanics themselves live outside this
//! crate.
//!
//! Monetary fields serialize as strings (`rust_decimal` serde-with-str), so
//! a record round-trip preserves amounts exactly.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::{Address, InvoiceData, LineItem, ValidationError};

/// One flat invoice-level row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeaderRecord {
    pub id: String,
    pub invoice_number: String,
    pub invoice_date: Option<NaiveDate>,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub billing_street: String,
    pub billing_city: String,
    pub billing_state: String,
    pub billing_zip: String,
    pub billing_phone: Option<String>,
    pub shipping_street: String,
    pub shipping_city: String,
    pub shipping_state: String,
    pub shipping_zip: String,
    pub shipping_phone: Option<String>,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub total_amount: Decimal,
    pub salesperson: Option<String>,
    pub po_number: Option<String>,
    pub terms: Option<String>,
    pub ship_date: Option<NaiveDate>,
    pub ship_via: Option<String>,
    pub fob: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    pub extraction_confidence: Option<f64>,
}

/// One per-line-item row, keyed back to the invoice by `invoice_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailRecord {
    pub id: String,
    pub invoice_id: String,
    pub item_number: String,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub created_at: DateTime<Utc>,
}

impl InvoiceData {
    /// Flatten into one header row plus ordered detail rows.
    pub fn to_records(&self) -> (HeaderRecord, Vec<DetailRecord>) {
        let header = HeaderRecord {
            id: self.id.clone(),
            invoice_number: self.invoice_number.clone(),
            invoice_date: self.invoice_date,
            customer_id: self.customer_id.clone(),
            customer_name: self.customer_name.clone(),
            billing_street: self.billing_address.street.clone(),
            billing_city: self.billing_address.city.clone(),
            billing_state: self.billing_address.state.clone(),
            billing_zip: self.billing_address.zip_code.clone(),
            billing_phone: self.billing_address.phone.clone(),
            shipping_street: self.shipping_address.street.clone(),
            shipping_city: self.shipping_address.city.clone(),
            shipping_state: self.shipping_address.state.clone(),
            shipping_zip: self.shipping_address.zip_code.clone(),
            shipping_phone: self.shipping_address.phone.clone(),
            subtotal: self.subtotal,
            tax_rate: self.tax_rate,
            tax_amount: self.tax,
            total_amount: self.total,
            salesperson: self.salesperson.clone(),
            po_number: self.po_number.clone(),
            terms: self.terms.clone(),
            ship_date: self.ship_date,
            ship_via: self.ship_via.clone(),
            fob: self.fob.clone(),
            created_at: self.created_at,
            updated_at: self.updated_at,
            extraction_confidence: self.extraction_confidence,
        };
        let details = self
            .items
            .iter()
            .map(|item| DetailRecord {
                id: item.id.clone(),
                invoice_id: self.id.clone(),
                item_number: item.item_number.clone(),
                description: item.description.clone(),
                quantity: item.quantity,
                unit_price: item.unit_price,
                line_total: item.total,
                created_at: self.created_at,
            })
            .collect();
        (header, details)
    }

    /// Rebuild a validated invoice from a header row and its detail rows.
    ///
    /// Detail rows keyed to a different invoice are rejected. The rebuilt
    /// record passes through [`InvoiceData::validate`], so a corrupted table
    /// cannot smuggle an inconsistent invoice back into the domain.
    pub fn from_records(
        header: HeaderRecord,
        details: Vec<DetailRecord>,
    ) -> Result<Self, ValidationError> {
        for detail in &details {
            if detail.invoice_id != header.id {
                return Err(ValidationError::new(
                    "items",
                    format!(
                        "detail row {} belongs to invoice {}, not {}",
                        detail.id, detail.invoice_id, header.id
                    ),
                ));
            }
        }

        let items = details
            .into_iter()
            .map(|d| LineItem {
                id: d.id,
                item_number: d.item_number,
                description: d.description,
                quantity: d.quantity,
                unit_price: d.unit_price,
                total: d.line_total,
            })
            .collect();

        let invoice = Self {
            id: header.id,
            invoice_number: header.invoice_number,
            invoice_date: header.invoice_date,
            customer_id: header.customer_id,
            customer_name: header.customer_name,
            billing_address: Address {
                street: header.billing_street,
                city: header.billing_city,
                state: header.billing_state,
                zip_code: header.billing_zip,
                phone: header.billing_phone,
            },
            shipping_address: Address {
                street: header.shipping_street,
                city: header.shipping_city,
                state: header.shipping_state,
                zip_code: header.shipping_zip,
                phone: header.shipping_phone,
            },
            items,
            subtotal: header.subtotal,
            tax_rate: header.tax_rate,
            tax: header.tax_amount,
            total: header.total_amount,
            salesperson: header.salesperson,
            po_number: header.po_number,
            terms: header.terms,
            ship_date: header.ship_date,
            ship_via: header.ship_via,
            fob: header.fob,
            created_at: header.created_at,
            updated_at: header.updated_at,
            extraction_confidence: header.extraction_confidence,
        };
        invoice.validate()?;
        Ok(invoice)
    }
}
