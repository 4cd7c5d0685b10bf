//! Duplicate detection across a batch.

use std::collections::HashSet;

use rust_decimal::Decimal;
use tracing::debug;

use crate::models::record::{InvoiceRecord, InvoiceStatus};

/// Identity of the invoice a record describes, if it can be told.
///
/// The invoice number alone decides when present; otherwise code, total and
/// date; otherwise total, date and seller.
pub fn dedupe_key(record: &InvoiceRecord) -> Option<String> {
    let fields = &record.fields;

    let number = fields.invoice_number.trim();
    if !number.is_empty() {
        return Some(number.to_string());
    }

    let has_total = fields.total_amount > Decimal::ZERO;
    let date = fields.date.trim();

    let code = fields.invoice_code.trim();
    if !code.is_empty() && has_total {
        return Some(format!("code_{}_{:.2}_{}", code, fields.total_amount, date));
    }

    let seller = fields.seller.trim();
    if has_total && !date.is_empty() && !seller.is_empty() {
        return Some(format!("amt_{:.2}_{}_{}", fields.total_amount, date, seller));
    }

    None
}

/// Recompute duplicate flags for the whole collection, in order.
///
/// Only successfully recognized records take part. The first record with a
/// key stays valid; later ones become duplicates. Returns how many were
/// marked.
pub fn check_duplicates(records: &mut [InvoiceRecord], enabled: bool) -> usize {
    for record in records.iter_mut() {
        record.is_duplicate = false;
        if record.status == InvoiceStatus::Duplicate {
            record.status = InvoiceStatus::Valid;
        }
    }

    if !enabled {
        return 0;
    }

    let mut seen = HashSet::new();
    let mut marked = 0;
    for record in records.iter_mut().filter(|r| r.is_recognized()) {
        let Some(key) = dedupe_key(record) else {
            continue;
        };
        if !seen.insert(key) {
            debug!("Duplicate invoice {} in {}", record.id, record.file_name);
            record.is_duplicate = true;
            record.status = InvoiceStatus::Duplicate;
            marked += 1;
        }
    }
    marked
}
