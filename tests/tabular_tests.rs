use belegscan::core::*;
use belegscan::tabular::{DetailRecord, HeaderRecord};
use rust_decimal_macros::dec;
use serde_json::json;

fn full_invoice() -> InvoiceData {
    let value = json!({
        "id": "inv-0001",
        "invoice_number": "INV-1001",
        "invoice_date": "2024-06-15",
        "customer_id": "CUST-42",
        "customer_name": "Northwind Traders",
        "billing_address": {
            "street": "1 Main St", "city": "Springfield",
            "state": "IL", "zip_code": "62701", "phone": "217-555-0142"
        },
        "shipping_address": {
            "street": "9 Dock Rd", "city": "Chicago",
            "state": "IL", "zip_code": "60601", "phone": null
        },
        "items": [
            { "id": "l1", "item_number": "A-100", "description": "Widget",
              "quantity": 4, "unit_price": "25.00", "total": "100.00" },
            { "id": "l2", "item_number": "B-200", "description": "Gadget",
              "quantity": 2, "unit_price": "12.34", "total": "24.68" }
        ],
        "subtotal": "124.68",
        "tax_rate": "0.08",
        "tax": "9.97",
        "total": "134.65",
        "salesperson": "J. Rivera",
        "po_number": "PO-9",
        "terms": "Net 30",
        "ship_date": "2024-06-20",
        "ship_via": "Ground",
        "fob": "Origin"
    });
    InvoiceData::from_payload(InvoicePayload::from_value(&value).unwrap()).unwrap()
}

#[test]
fn header_flattens_both_addresses() {
    let inv = full_invoice();
    let (header, details) = inv.to_records();
    assert_eq!(header.id, "inv-0001");
    assert_eq!(header.billing_city, "Springfield");
    assert_eq!(header.shipping_city, "Chicago");
    assert_eq!(header.billing_phone.as_deref(), Some("217-555-0142"));
    assert!(header.shipping_phone.is_none());
    assert_eq!(header.tax_amount, dec!(9.97));
    assert_eq!(details.len(), 2);
}

#[test]
fn details_reference_the_invoice_id() {
    let inv = full_invoice();
    let (_, details) = inv.to_records();
    assert!(details.iter().all(|d| d.invoice_id == "inv-0001"));
    assert_eq!(details[0].id, "l1");
    assert_eq!(details[1].line_total, dec!(24.68));
}

#[test]
fn records_round_trip_preserves_every_field_exactly() {
    let inv = full_invoice();
    let (header, details) = inv.to_records();
    let rebuilt = InvoiceData::from_records(header, details).unwrap();

    assert_eq!(rebuilt.id, inv.id);
    assert_eq!(rebuilt.invoice_number, inv.invoice_number);
    assert_eq!(rebuilt.invoice_date, inv.invoice_date);
    assert_eq!(rebuilt.customer_id, inv.customer_id);
    assert_eq!(rebuilt.customer_name, inv.customer_name);
    assert_eq!(rebuilt.billing_address, inv.billing_address);
    assert_eq!(rebuilt.shipping_address, inv.shipping_address);
    assert_eq!(rebuilt.items, inv.items);
    assert_eq!(rebuilt.subtotal, inv.subtotal);
    assert_eq!(rebuilt.tax_rate, inv.tax_rate);
    assert_eq!(rebuilt.tax, inv.tax);
    assert_eq!(rebuilt.total, inv.total);
    assert_eq!(rebuilt.salesperson, inv.salesperson);
    assert_eq!(rebuilt.ship_date, inv.ship_date);
    assert_eq!(rebuilt.ship_via, inv.ship_via);
    assert_eq!(rebuilt.fob, inv.fob);
    assert_eq!(rebuilt.created_at, inv.created_at);
}

#[test]
fn round_trip_survives_serde() {
    // Records travel through flat storage as serialized rows; amounts must
    // come back exactly, not as floats.
    let inv = full_invoice();
    let (header, details) = inv.to_records();

    let header_json = serde_json::to_value(&header).unwrap();
    assert_eq!(header_json["subtotal"], json!("124.68"));
    assert_eq!(header_json["tax_rate"], json!("0.08"));

    let header2: HeaderRecord = serde_json::from_value(header_json).unwrap();
    let details2: Vec<DetailRecord> = details
        .iter()
        .map(|d| serde_json::from_value(serde_json::to_value(d).unwrap()).unwrap())
        .collect();
    let rebuilt = InvoiceData::from_records(header2, details2).unwrap();
    assert_eq!(rebuilt.subtotal, dec!(124.68));
    assert_eq!(rebuilt.items[1].unit_price, dec!(12.34));
}

#[test]
fn foreign_detail_rows_are_rejected() {
    let inv = full_invoice();
    let (header, mut details) = inv.to_records();
    details[1].invoice_id = "someone-else".into();
    let err = InvoiceData::from_records(header, details).unwrap_err();
    assert_eq!(err.field, "items");
    assert!(err.message.contains("someone-else"));
}

#[test]
fn corrupted_rows_fail_revalidation() {
    let inv = full_invoice();
    let (header, mut details) = inv.to_records();
    details[0].line_total = dec!(999.00);
    assert!(InvoiceData::from_records(header, details).is_err());
}
