//! Invoice collection shared between the batch driver and recognition tasks.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, info};

use crate::dedup;
use crate::error::RecognitionError;
use crate::models::fields::{normalize_date, parse_amount, ExtractedFields};
use crate::models::record::{
    InvoiceDraft, InvoiceId, InvoiceRecord, InvoiceStatus, RecognitionMethod, RecognitionStatus,
    Recognized,
};

/// A user-editable invoice field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceField {
    InvoiceNumber,
    InvoiceCode,
    Date,
    Seller,
    Buyer,
    Amount,
    TaxAmount,
    TotalAmount,
}

impl InvoiceField {
    /// Write `value` into `fields`. Returns `false` for an unparseable amount.
    fn apply(self, fields: &mut ExtractedFields, value: &str) -> bool {
        let value = value.trim();
        match self {
            Self::InvoiceNumber => fields.invoice_number = value.to_string(),
            Self::InvoiceCode => fields.invoice_code = value.to_string(),
            Self::Date => fields.date = normalize_date(value),
            Self::Seller => fields.seller = value.to_string(),
            Self::Buyer => fields.buyer = value.to_string(),
            Self::Amount | Self::TaxAmount | Self::TotalAmount => {
                let Some(amount) = parse_amount(value) else {
                    return false;
                };
                match self {
                    Self::Amount => fields.amount = amount,
                    Self::TaxAmount => fields.tax_amount = amount,
                    _ => fields.total_amount = amount,
                }
            }
        }
        true
    }
}

/// Records ready for export, with their grand total.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalizedInvoices {
    pub invoices: Vec<InvoiceRecord>,
    pub grand_total: Decimal,
}

struct Inner {
    records: Vec<InvoiceRecord>,
    next_id: u64,
    dedup_enabled: bool,
}

impl Inner {
    fn find_mut(&mut self, id: InvoiceId) -> Option<&mut InvoiceRecord> {
        self.records.iter_mut().find(|r| r.id == id)
    }

    fn recheck(&mut self) -> usize {
        dedup::check_duplicates(&mut self.records, self.dedup_enabled)
    }
}

/// Ordered invoice collection.
///
/// Every mutation happens inside one lock, so readers always see whole
/// records and duplicate detection never interleaves with an update.
pub struct InvoiceStore {
    inner: Mutex<Inner>,
}

impl Default for InvoiceStore {
    fn default() -> Self {
        Self::new(true)
    }
}

impl InvoiceStore {
    pub fn new(dedup_enabled: bool) -> Self {
        Self {
            inner: Mutex::new(Inner {
                records: Vec::new(),
                next_id: 1,
                dedup_enabled,
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append a pending record and return its id.
    pub fn insert(&self, draft: InvoiceDraft) -> InvoiceId {
        let mut inner = self.lock();
        let id = InvoiceId(inner.next_id);
        inner.next_id += 1;
        debug!("Added record {} for {}", id, draft.file_name);
        inner.records.push(InvoiceRecord::new(id, draft));
        id
    }

    pub fn get(&self, id: InvoiceId) -> Option<InvoiceRecord> {
        self.lock().records.iter().find(|r| r.id == id).cloned()
    }

    /// Copy of every record in display order.
    pub fn snapshot(&self) -> Vec<InvoiceRecord> {
        self.lock().records.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Move a pending record to `Processing`.
    pub fn mark_processing(&self, id: InvoiceId) -> bool {
        let mut inner = self.lock();
        match inner.find_mut(id) {
            Some(record) if !record.recognition_status.is_terminal() => {
                record.recognition_status = RecognitionStatus::Processing;
                true
            }
            _ => false,
        }
    }

    /// Store the outcome of the recognition cascade for one record.
    pub fn apply_recognition(
        &self,
        id: InvoiceId,
        outcome: Result<Recognized, RecognitionError>,
    ) -> bool {
        let mut inner = self.lock();
        let Some(record) = inner.find_mut(id) else {
            return false;
        };
        record.apply_recognition(outcome);
        inner.recheck();
        true
    }

    /// Store fields produced without the cascade, e.g. a segmented invoice.
    pub fn apply_fields(
        &self,
        id: InvoiceId,
        fields: ExtractedFields,
        method: RecognitionMethod,
    ) -> bool {
        let mut inner = self.lock();
        let Some(record) = inner.find_mut(id) else {
            return false;
        };
        record.apply_fields(fields, method);
        inner.recheck();
        true
    }

    /// Remove a record. A later copy of it becomes the first-seen one.
    pub fn remove(&self, id: InvoiceId) -> Option<InvoiceRecord> {
        let mut inner = self.lock();
        let index = inner.records.iter().position(|r| r.id == id)?;
        let removed = inner.records.remove(index);
        inner.recheck();
        Some(removed)
    }

    /// Drop every record flagged as duplicate. Returns how many were removed.
    pub fn clear_duplicates(&self) -> usize {
        let mut inner = self.lock();
        let before = inner.records.len();
        inner.records.retain(|r| !r.is_duplicate);
        let removed = before - inner.records.len();
        if removed > 0 {
            info!("Removed {} duplicate invoices", removed);
        }
        removed
    }

    /// Edit one field of a record and recompute duplicates.
    ///
    /// Returns `false` when the record is unknown or the value does not parse.
    pub fn update_field(&self, id: InvoiceId, field: InvoiceField, value: &str) -> bool {
        let mut inner = self.lock();
        let Some(record) = inner.find_mut(id) else {
            return false;
        };
        if !field.apply(&mut record.fields, value) {
            return false;
        }
        inner.recheck();
        true
    }

    pub fn dedup_enabled(&self) -> bool {
        self.lock().dedup_enabled
    }

    /// Switch duplicate detection and recompute the flags.
    pub fn set_dedup_enabled(&self, enabled: bool) -> usize {
        let mut inner = self.lock();
        inner.dedup_enabled = enabled;
        inner.recheck()
    }

    /// Recompute duplicate flags over the whole collection.
    pub fn check_duplicates(&self) -> usize {
        self.lock().recheck()
    }

    /// Sum of every record's total, duplicates included.
    pub fn total_amount(&self) -> Decimal {
        self.lock().records.iter().map(|r| r.fields.total_amount).sum()
    }

    /// Sum of the totals of non-duplicate records.
    pub fn unique_total_amount(&self) -> Decimal {
        self.lock()
            .records
            .iter()
            .filter(|r| !r.is_duplicate)
            .map(|r| r.fields.total_amount)
            .sum()
    }

    /// Number of non-duplicate records.
    pub fn valid_invoice_count(&self) -> usize {
        self.lock().records.iter().filter(|r| !r.is_duplicate).count()
    }

    /// Number of distinct source files.
    pub fn file_count(&self) -> usize {
        let inner = self.lock();
        inner
            .records
            .iter()
            .map(|r| r.source_file.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    /// Non-duplicate, valid records sorted by date; undated ones come first.
    pub fn finalized(&self) -> FinalizedInvoices {
        let mut invoices: Vec<InvoiceRecord> = self
            .lock()
            .records
            .iter()
            .filter(|r| !r.is_duplicate && r.status != InvoiceStatus::Invalid)
            .cloned()
            .collect();
        invoices.sort_by(|a, b| a.fields.date.cmp(&b.fields.date));
        let grand_total = invoices.iter().map(|r| r.fields.total_amount).sum();
        FinalizedInvoices {
            invoices,
            grand_total,
        }
    }
}
