use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use super::error::ValidationError;
use super::payload::{AddressPayload, InvoicePayload, ItemPayload};

/// Absolute tolerance for `line total ≈ quantity × unit price`.
pub const LINE_TOTAL_TOLERANCE: Decimal = dec!(0.01);

/// Absolute tolerance for `subtotal ≈ Σ line totals`.
pub const SUBTOTAL_TOLERANCE: Decimal = dec!(0.01);

/// Construction-time tolerance for `tax ≈ subtotal × tax rate`.
///
/// Deliberately wide: vision extraction rounds tax amounts aggressively, and
/// a plausible invoice should not be rejected over cents. The advisory
/// consistency pass re-checks the same identity at [`REPORT_TOLERANCE`].
pub const TAX_TOLERANCE: Decimal = dec!(1.00);

/// Construction-time tolerance for `total ≈ subtotal + tax`.
///
/// Wider still — extraction noise compounds across aggregation levels.
pub const TOTAL_TOLERANCE: Decimal = dec!(5.00);

/// Tolerance used by the advisory consistency pass for every identity.
pub const REPORT_TOLERANCE: Decimal = dec!(0.01);

pub(crate) fn within(stored: Decimal, computed: Decimal, tolerance: Decimal) -> bool {
    (stored - computed).abs() <= tolerance
}

fn trimmed(s: String) -> String {
    s.trim().to_string()
}

fn non_finite_to_zero(value: Decimal) -> f64 {
    value.to_f64().filter(|v| v.is_finite()).unwrap_or(0.0)
}

/// Billing or shipping address. Billing and shipping are always distinct
/// owned values, even when their content is identical.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip_code: String,
    pub phone: Option<String>,
}

impl Address {
    /// Construct from a raw payload, normalizing whitespace and checking the
    /// phone rule: a present phone that is not a bracketed placeholder must
    /// be at least 10 characters long. Empty phones normalize to `None`.
    pub fn from_payload(payload: AddressPayload, field: &str) -> Result<Self, ValidationError> {
        let phone = match payload.phone {
            Some(raw) => {
                let p = raw.trim().to_string();
                if p.is_empty() {
                    None
                } else {
                    if !p.starts_with('[') && p.len() < 10 {
                        return Err(ValidationError::new(
                            format!("{field}.phone"),
                            format!("phone number '{p}' must be at least 10 characters"),
                        ));
                    }
                    Some(p)
                }
            }
            None => None,
        };
        Ok(Self {
            street: trimmed(payload.street),
            city: trimmed(payload.city),
            state: trimmed(payload.state),
            zip_code: trimmed(payload.zip_code),
            phone,
        })
    }
}

/// One invoice line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    /// Unique line id (uuid v4, generated when the payload carries none).
    pub id: String,
    pub item_number: String,
    pub description: String,
    /// Quantity ordered, strictly positive.
    pub quantity: i64,
    /// Price per unit, non-negative exact decimal.
    pub unit_price: Decimal,
    /// Line total, must equal quantity × unit price within
    /// [`LINE_TOTAL_TOLERANCE`].
    pub total: Decimal,
}

impl LineItem {
    pub fn from_payload(payload: ItemPayload, field: &str) -> Result<Self, ValidationError> {
        let item = Self {
            id: payload
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            item_number: trimmed(payload.item_number),
            description: trimmed(payload.description),
            quantity: payload.quantity,
            unit_price: payload.unit_price,
            total: payload.total,
        };
        item.validate(field)?;
        Ok(item)
    }

    /// Check per-line invariants; `field` prefixes error paths.
    pub fn validate(&self, field: &str) -> Result<(), ValidationError> {
        if self.quantity <= 0 {
            return Err(ValidationError::new(
                format!("{field}.quantity"),
                format!("quantity must be positive, got {}", self.quantity),
            ));
        }
        if self.unit_price < Decimal::ZERO {
            return Err(ValidationError::new(
                format!("{field}.unit_price"),
                format!("unit price must not be negative, got {}", self.unit_price),
            ));
        }
        if self.total < Decimal::ZERO {
            return Err(ValidationError::new(
                format!("{field}.total"),
                format!("line total must not be negative, got {}", self.total),
            ));
        }
        let computed = Decimal::from(self.quantity) * self.unit_price;
        if !within(self.total, computed, LINE_TOTAL_TOLERANCE) {
            return Err(ValidationError::new(
                format!("{field}.total"),
                format!(
                    "line total {} does not match computed {} ({} × {})",
                    self.total, computed, self.quantity, self.unit_price
                ),
            ));
        }
        Ok(())
    }
}

/// A fully validated invoice record.
///
/// Instances come out of [`InvoiceData::from_payload`] (or the tabular
/// header/detail reconstruction) and satisfy every construction invariant.
/// Fields are public in keeping with the rest of the crate; mutation goes
/// through [`InvoiceData::apply_update`], which re-validates the whole record
/// atomically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceData {
    /// Unique invoice id (uuid v4, generated when the payload carries none).
    pub id: String,
    pub invoice_number: String,
    pub invoice_date: Option<NaiveDate>,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub billing_address: Address,
    pub shipping_address: Address,
    /// Ordered line items, at least one.
    pub items: Vec<LineItem>,
    pub subtotal: Decimal,
    /// Tax rate as a fraction in `[0, 1]`.
    pub tax_rate: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub salesperson: Option<String>,
    pub po_number: Option<String>,
    pub terms: Option<String>,
    pub ship_date: Option<NaiveDate>,
    pub ship_via: Option<String>,
    pub fob: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
    /// Heuristic extraction confidence in `[0, 1]`, set by the extractor.
    pub extraction_confidence: Option<f64>,
}

impl InvoiceData {
    /// Validating constructor: either returns a record satisfying every
    /// invariant, or the first violated invariant with stored and recomputed
    /// values in the message.
    pub fn from_payload(payload: InvoicePayload) -> Result<Self, ValidationError> {
        let billing_address =
            Address::from_payload(payload.billing_address, "billing_address")?;
        let shipping_address =
            Address::from_payload(payload.shipping_address, "shipping_address")?;

        let mut items = Vec::with_capacity(payload.items.len());
        for (i, item) in payload.items.into_iter().enumerate() {
            items.push(LineItem::from_payload(item, &format!("items[{i}]"))?);
        }

        let invoice = Self {
            id: payload
                .id
                .filter(|id| !id.trim().is_empty())
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            invoice_number: trimmed(payload.invoice_number),
            invoice_date: payload.invoice_date,
            customer_id: normalize_opt(payload.customer_id),
            customer_name: trimmed(payload.customer_name),
            billing_address,
            shipping_address,
            items,
            subtotal: payload.subtotal,
            tax_rate: payload.tax_rate,
            tax: payload.tax,
            total: payload.total,
            salesperson: normalize_opt(payload.salesperson),
            po_number: normalize_opt(payload.po_number),
            terms: normalize_opt(payload.terms),
            ship_date: payload.ship_date,
            ship_via: normalize_opt(payload.ship_via),
            fob: normalize_opt(payload.fob),
            created_at: Utc::now(),
            updated_at: None,
            extraction_confidence: payload.extraction_confidence,
        };
        invoice.validate()?;
        Ok(invoice)
    }

    /// Re-check every construction invariant on the current field values.
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.items.is_empty() {
            return Err(ValidationError::new(
                "items",
                "invoice must have at least one line item",
            ));
        }
        for (i, item) in self.items.iter().enumerate() {
            item.validate(&format!("items[{i}]"))?;
        }

        if self.tax_rate < Decimal::ZERO || self.tax_rate > Decimal::ONE {
            return Err(ValidationError::new(
                "tax_rate",
                format!("tax rate must be between 0 and 1, got {}", self.tax_rate),
            ));
        }
        for (field, value) in [
            ("subtotal", self.subtotal),
            ("tax", self.tax),
            ("total", self.total),
        ] {
            if value < Decimal::ZERO {
                return Err(ValidationError::new(
                    field,
                    format!("{field} must not be negative, got {value}"),
                ));
            }
        }
        if let Some(score) = self.extraction_confidence {
            if !(0.0..=1.0).contains(&score) {
                return Err(ValidationError::new(
                    "extraction_confidence",
                    format!("confidence must be between 0 and 1, got {score}"),
                ));
            }
        }

        let computed_subtotal: Decimal = self.items.iter().map(|i| i.total).sum();
        if !within(self.subtotal, computed_subtotal, SUBTOTAL_TOLERANCE) {
            return Err(ValidationError::new(
                "subtotal",
                format!(
                    "subtotal {} does not match computed sum of line totals {}",
                    self.subtotal, computed_subtotal
                ),
            ));
        }

        let computed_tax = self.subtotal * self.tax_rate;
        if !within(self.tax, computed_tax, TAX_TOLERANCE) {
            return Err(ValidationError::new(
                "tax",
                format!(
                    "tax {} does not match computed {} (subtotal {} × rate {})",
                    self.tax, computed_tax, self.subtotal, self.tax_rate
                ),
            ));
        }

        let computed_total = self.subtotal + self.tax;
        if !within(self.total, computed_total, TOTAL_TOLERANCE) {
            return Err(ValidationError::new(
                "total",
                format!(
                    "total {} does not match computed {} (subtotal {} + tax {})",
                    self.total, computed_total, self.subtotal, self.tax
                ),
            ));
        }

        Ok(())
    }

    /// Field-level merge update. Applies the patch to a copy, re-validates
    /// the whole record, and only then commits, stamping `updated_at`. On
    /// failure the record is left untouched.
    pub fn apply_update(&mut self, patch: InvoiceUpdate) -> Result<(), ValidationError> {
        let mut next = self.clone();
        patch.apply_to(&mut next);
        next.validate()?;
        next.updated_at = Some(Utc::now());
        *self = next;
        Ok(())
    }

    /// Nested API-facing representation, matching the upstream JSON contract:
    /// absent optionals become empty strings, dates are ISO-8601, and
    /// monetary values pass through a finite-guard so no NaN/infinity can
    /// reach serialized output.
    pub fn to_api_json(&self) -> serde_json::Value {
        let address_json = |a: &Address| {
            json!({
                "street": a.street,
                "city": a.city,
                "state": a.state,
                "zip_code": a.zip_code,
                "phone": a.phone.as_deref().unwrap_or(""),
            })
        };
        json!({
            "id": self.id,
            "invoice_number": self.invoice_number,
            "invoice_date": self.invoice_date.map(|d| d.to_string()).unwrap_or_default(),
            "customer_id": self.customer_id.as_deref().unwrap_or(""),
            "customer_name": self.customer_name,
            "billing_address": address_json(&self.billing_address),
            "shipping_address": address_json(&self.shipping_address),
            "items": self.items.iter().map(|item| json!({
                "id": item.id,
                "item_number": item.item_number,
                "description": item.description,
                "quantity": item.quantity,
                "unit_price": non_finite_to_zero(item.unit_price),
                "total": non_finite_to_zero(item.total),
            })).collect::<Vec<_>>(),
            "subtotal": non_finite_to_zero(self.subtotal),
            "tax_rate": non_finite_to_zero(self.tax_rate),
            "tax": non_finite_to_zero(self.tax),
            "total": non_finite_to_zero(self.total),
            "salesperson": self.salesperson.as_deref().unwrap_or(""),
            "po_number": self.po_number.as_deref().unwrap_or(""),
            "terms": self.terms.as_deref().unwrap_or(""),
            "ship_date": self.ship_date.map(|d| d.to_string()).unwrap_or_default(),
            "ship_via": self.ship_via.as_deref().unwrap_or(""),
            "fob": self.fob.as_deref().unwrap_or(""),
            "created_at": self.created_at.to_rfc3339(),
            "updated_at": self.updated_at.map(|t| t.to_rfc3339()).unwrap_or_default(),
            "extraction_confidence": self.extraction_confidence.unwrap_or(0.0),
        })
    }
}

fn normalize_opt(value: Option<String>) -> Option<String> {
    value.map(trimmed).filter(|s| !s.is_empty())
}

/// Partial update for [`InvoiceData::apply_update`]. Absent fields keep
/// their current values.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InvoiceUpdate {
    pub invoice_number: Option<String>,
    pub invoice_date: Option<NaiveDate>,
    pub customer_id: Option<String>,
    pub customer_name: Option<String>,
    pub billing_address: Option<Address>,
    pub shipping_address: Option<Address>,
    pub items: Option<Vec<LineItem>>,
    pub subtotal: Option<Decimal>,
    pub tax_rate: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub total: Option<Decimal>,
    pub salesperson: Option<String>,
    pub po_number: Option<String>,
    pub terms: Option<String>,
    pub ship_date: Option<NaiveDate>,
    pub ship_via: Option<String>,
    pub fob: Option<String>,
}

impl InvoiceUpdate {
    fn apply_to(self, invoice: &mut InvoiceData) {
        macro_rules! merge {
            ($($field:ident),* $(,)?) => {
                $(if let Some(v) = self.$field { invoice.$field = v.into(); })*
            };
        }
        merge!(invoice_number, customer_name, billing_address, shipping_address, items);
        merge!(subtotal, tax_rate, tax, total);
        if self.invoice_date.is_some() {
            invoice.invoice_date = self.invoice_date;
        }
        if self.ship_date.is_some() {
            invoice.ship_date = self.ship_date;
        }
        for (src, dst) in [
            (self.customer_id, &mut invoice.customer_id),
            (self.salesperson, &mut invoice.salesperson),
            (self.po_number, &mut invoice.po_number),
            (self.terms, &mut invoice.terms),
            (self.ship_via, &mut invoice.ship_via),
            (self.fob, &mut invoice.fob),
        ] {
            if src.is_some() {
                *dst = src;
            }
        }
    }
}

/// Outcome of one extraction attempt. Immutable once produced: the service
/// builds it exactly once per document and hands it to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub document_id: String,
    pub extraction_id: String,
    pub success: bool,
    /// Parsed invoice as an untyped structured map for transport.
    pub extracted: Option<serde_json::Value>,
    pub confidence_score: Option<f64>,
    /// Elapsed wall time in seconds, reported for failures too.
    pub processing_time: Option<f64>,
    pub error_message: Option<String>,
    pub validation: Option<ValidationReport>,
    pub created_at: DateTime<Utc>,
}

impl ExtractionResult {
    pub fn succeeded(
        document_id: impl Into<String>,
        extraction_id: impl Into<String>,
        extracted: serde_json::Value,
        confidence_score: f64,
        processing_time: f64,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            extraction_id: extraction_id.into(),
            success: true,
            extracted: Some(extracted),
            confidence_score: Some(confidence_score),
            processing_time: Some(processing_time),
            error_message: None,
            validation: None,
            created_at: Utc::now(),
        }
    }

    pub fn failed(
        document_id: impl Into<String>,
        extraction_id: impl Into<String>,
        error_message: impl Into<String>,
        processing_time: f64,
    ) -> Self {
        Self {
            document_id: document_id.into(),
            extraction_id: extraction_id.into(),
            success: false,
            extracted: None,
            confidence_score: None,
            processing_time: Some(processing_time),
            error_message: Some(error_message.into()),
            validation: None,
            created_at: Utc::now(),
        }
    }

    /// Attach an advisory consistency report.
    pub fn with_validation(mut self, report: ValidationReport) -> Self {
        self.validation = Some(report);
        self
    }

    /// Successful and carrying a payload.
    pub fn is_valid(&self) -> bool {
        self.success && self.extracted.is_some()
    }
}

/// Advisory consistency findings. Errors are blocking anomalies (the report
/// as a whole is invalid), warnings and suggestions are not.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub is_valid: bool,
    pub warnings: Vec<String>,
    pub errors: Vec<String>,
    pub suggestions: Vec<String>,
}

impl ValidationReport {
    pub fn valid() -> Self {
        Self {
            is_valid: true,
            warnings: Vec::new(),
            errors: Vec::new(),
            suggestions: Vec::new(),
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }

    /// Record a blocking anomaly; downgrades `is_valid`.
    pub fn error(&mut self, message: impl Into<String>) {
        self.errors.push(message.into());
        self.is_valid = false;
    }

    pub fn suggest(&mut self, message: impl Into<String>) {
        self.suggestions.push(message.into());
    }
}
