//! Untyped extraction payloads.
//!
//! The vision model produces JSON constrained to [`invoice_json_schema`].
//! These structs deserialize that JSON leniently (numbers may arrive as
//! strings, dates in ISO-8601 with or without a time part) and are the sole
//! input to the validating constructor [`InvoiceData::from_payload`].
//!
//! [`InvoiceData::from_payload`]: super::InvoiceData::from_payload

use chrono::NaiveDate;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::json;

/// Raw address as returned by the model.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressPayload {
    #[serde(default)]
    pub street: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub zip_code: String,
    #[serde(default)]
    pub phone: Option<String>,
}

/// Raw line item as returned by the model.
#[derive(Debug, Clone, Deserialize)]
pub struct ItemPayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub item_number: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, deserialize_with = "de_int")]
    pub quantity: i64,
    #[serde(default, deserialize_with = "de_decimal")]
    pub unit_price: Decimal,
    #[serde(default, deserialize_with = "de_decimal", alias = "line_total")]
    pub total: Decimal,
}

/// Raw invoice payload as returned by the model.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoicePayload {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub invoice_number: String,
    #[serde(default, deserialize_with = "de_opt_date")]
    pub invoice_date: Option<NaiveDate>,
    #[serde(default)]
    pub customer_id: Option<String>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub billing_address: AddressPayload,
    #[serde(default)]
    pub shipping_address: AddressPayload,
    #[serde(default)]
    pub items: Vec<ItemPayload>,
    #[serde(default, deserialize_with = "de_decimal")]
    pub subtotal: Decimal,
    #[serde(default, deserialize_with = "de_decimal")]
    pub tax_rate: Decimal,
    #[serde(default, deserialize_with = "de_decimal")]
    pub tax: Decimal,
    #[serde(default, deserialize_with = "de_decimal")]
    pub total: Decimal,
    #[serde(default)]
    pub salesperson: Option<String>,
    #[serde(default)]
    pub po_number: Option<String>,
    #[serde(default)]
    pub terms: Option<String>,
    #[serde(default, deserialize_with = "de_opt_date")]
    pub ship_date: Option<NaiveDate>,
    #[serde(default)]
    pub ship_via: Option<String>,
    #[serde(default)]
    pub fob: Option<String>,
    #[serde(default)]
    pub extraction_confidence: Option<f64>,
}

impl InvoicePayload {
    /// Parse a payload from a raw model-output JSON value.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, serde_json::Error> {
        Self::deserialize(value)
    }
}

/// Accept a decimal as a JSON number or a numeric string.
///
/// Float input goes through [`Decimal::from_f64`], which rounds to the
/// nearest representable decimal instead of retaining binary noise.
fn de_decimal<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(f64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(f) => Decimal::from_f64(f)
            .ok_or_else(|| serde::de::Error::custom(format!("{f} is not a valid decimal"))),
        Raw::Str(s) => {
            let s = s.trim().trim_start_matches('$');
            if s.is_empty() {
                return Ok(Decimal::ZERO);
            }
            s.replace(',', "")
                .parse::<Decimal>()
                .map_err(serde::de::Error::custom)
        }
    }
}

/// Accept an integer as a JSON number or a numeric string.
fn de_int<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(i64),
        Float(f64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Float(f) => Ok(f as i64),
        Raw::Str(s) => s.trim().parse::<i64>().map_err(serde::de::Error::custom),
    }
}

/// Accept a date as `YYYY-MM-DD` or a full ISO-8601 timestamp.
/// Empty strings and null deserialize to `None`.
fn de_opt_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    let Some(raw) = raw else { return Ok(None) };
    let s = raw.trim();
    if s.is_empty() {
        return Ok(None);
    }
    if let Ok(d) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return Ok(Some(d));
    }
    // Timestamps like 2024-06-15T00:00:00 — keep the date part.
    let date_part = s.split('T').next().unwrap_or(s);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| serde::de::Error::custom(format!("unrecognized date format: {s}")))
}

/// JSON schema for schema-constrained model decoding.
///
/// Every property is listed as required with `additionalProperties: false`,
/// as strict structured-output modes demand; genuinely optional fields are
/// typed `["string", "null"]` instead of being dropped from `required`.
pub fn invoice_json_schema() -> serde_json::Value {
    let address = json!({
        "type": "object",
        "properties": {
            "street": { "type": "string" },
            "city": { "type": "string" },
            "state": { "type": "string" },
            "zip_code": { "type": "string" },
            "phone": { "type": ["string", "null"] }
        },
        "required": ["street", "city", "state", "zip_code", "phone"],
        "additionalProperties": false
    });

    json!({
        "type": "object",
        "properties": {
            "invoice_number": { "type": "string" },
            "invoice_date": { "type": ["string", "null"], "description": "ISO 8601 date" },
            "customer_id": { "type": ["string", "null"] },
            "customer_name": { "type": "string" },
            "billing_address": address,
            "shipping_address": address,
            "items": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "item_number": { "type": "string" },
                        "description": { "type": "string" },
                        "quantity": { "type": "integer" },
                        "unit_price": { "type": "number" },
                        "total": { "type": "number" }
                    },
                    "required": ["item_number", "description", "quantity", "unit_price", "total"],
                    "additionalProperties": false
                }
            },
            "subtotal": { "type": "number" },
            "tax_rate": { "type": "number", "description": "Tax rate as a fraction between 0 and 1" },
            "tax": { "type": "number" },
            "total": { "type": "number" },
            "salesperson": { "type": ["string", "null"] },
            "po_number": { "type": ["string", "null"] },
            "terms": { "type": ["string", "null"] },
            "ship_date": { "type": ["string", "null"], "description": "ISO 8601 date" },
            "ship_via": { "type": ["string", "null"] },
            "fob": { "type": ["string", "null"] }
        },
        "required": [
            "invoice_number", "invoice_date", "customer_id", "customer_name",
            "billing_address", "shipping_address", "items",
            "subtotal", "tax_rate", "tax", "total",
            "salesperson", "po_number", "terms", "ship_date", "ship_via", "fob"
        ],
        "additionalProperties": false
    })
}
