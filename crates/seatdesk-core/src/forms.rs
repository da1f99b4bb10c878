//! Create, batch-create and renew forms.
//!
//! Each form holds the user's current input, validates it before anything is
//! sent, computes the expiry, calls the gateway and refocuses the listing on
//! the touched records. A failed submit leaves the form untouched so it can be
//! resubmitted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use validator::{Validate, ValidationError};

use crate::error::SeatError;
use crate::expiry::{add_days, compute_renewal};
use crate::gateway::RecordGateway;
use crate::listing::ListingController;
use crate::record::{RecordFields, RenewalCadence, SeatRecord};

/// Upper bound of a single batch when the caller does not set one.
pub const DEFAULT_MAX_BATCH: i64 = 500;

/// Longest renewal accepted by the forms, about a century.
pub const MAX_DAYS: i64 = 36_500;

fn one() -> i64 {
    1
}

fn required(value: &str, message: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("required");
        err.message = Some(message.into());
        return Err(err);
    }
    Ok(())
}

fn name_present(value: &str) -> Result<(), ValidationError> {
    required(value, "name is required")
}

fn prefix_present(value: &str) -> Result<(), ValidationError> {
    required(value, "prefix is required")
}

/// Days to use: the explicit value, or the cadence default.
fn resolve_days(days: Option<i64>, cadence: RenewalCadence) -> i64 {
    days.unwrap_or_else(|| cadence.default_days())
}

fn limit_value(limit: Option<i64>) -> u64 {
    // Validated non-negative before use.
    limit.unwrap_or(0).max(0) as u64
}

// ── single create ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct CreateForm {
    #[validate(custom(function = "name_present"))]
    pub name: String,
    #[serde(default)]
    pub remark: String,
    #[serde(default)]
    pub cadence: RenewalCadence,
    /// Renewal length; `None` means the cadence default.
    #[validate(range(min = 1, max = 36500, message = "days must be between 1 and 36500"))]
    #[serde(default)]
    pub days: Option<i64>,
    #[validate(range(min = 0, message = "limit must not be negative"))]
    #[serde(default)]
    pub limit: Option<i64>,
}

impl CreateForm {
    pub fn days(&self) -> i64 {
        resolve_days(self.days, self.cadence)
    }

    /// Validate and produce the fields to store.
    pub fn to_fields(&self, now: DateTime<Utc>) -> Result<RecordFields, SeatError> {
        self.validate()?;
        Ok(RecordFields {
            name: self.name.trim().to_owned(),
            remark: self.remark.clone(),
            exp_time: add_days(now, self.days())?,
            limit: Some(limit_value(self.limit)),
            xufei_type: Some(self.cadence),
        })
    }

    /// Create the record in the listing's collection, then show it.
    pub async fn submit<G: RecordGateway>(
        &self,
        gateway: &G,
        listing: &mut ListingController,
        now: DateTime<Utc>,
    ) -> Result<SeatRecord, SeatError> {
        let fields = self.to_fields(now)?;
        let record = gateway.create(listing.collection(), &fields).await?;
        info!(collection = %listing.collection(), id = %record.id, name = %record.name, "record created");
        listing.focus(&record.name);
        // A failed refresh is kept in the listing state; the record exists.
        let _ = listing.refresh(gateway).await;
        Ok(record)
    }
}

// ── batch create ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct BatchCreateForm {
    #[validate(custom(function = "prefix_present"))]
    pub prefix: String,
    #[serde(default = "one")]
    #[validate(range(min = 1, message = "start number must be a positive integer"))]
    pub start_num: i64,
    #[serde(default = "one")]
    #[validate(range(min = 1, message = "count must be a positive integer"))]
    pub count: i64,
    #[serde(default)]
    pub remark: String,
    #[validate(range(min = 0, message = "limit must not be negative"))]
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub cadence: RenewalCadence,
    #[validate(range(min = 1, max = 36500, message = "days must be between 1 and 36500"))]
    #[serde(default)]
    pub days: Option<i64>,
}

impl Default for BatchCreateForm {
    fn default() -> Self {
        Self {
            prefix: String::new(),
            start_num: 1,
            count: 1,
            remark: String::new(),
            limit: None,
            cadence: RenewalCadence::Day,
            days: None,
        }
    }
}

/// A record of the batch that the store refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchFailure {
    pub name: String,
    pub reason: String,
}

/// Result of a batch submit. Creation stops at the first failure.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub created: Vec<SeatRecord>,
    pub failed: Option<BatchFailure>,
    pub not_attempted: Vec<String>,
}

impl BatchOutcome {
    pub fn is_complete(&self) -> bool {
        self.failed.is_none()
    }
}

impl BatchCreateForm {
    pub fn days(&self) -> i64 {
        resolve_days(self.days, self.cadence)
    }

    /// `"{prefix}-{start_num + i}"` for `i` in `0..count`. Numbers past
    /// `i64::MAX` are not produced; [`Self::check`] rejects such input.
    pub fn names(&self) -> Vec<String> {
        let prefix = self.prefix.trim();
        (0..self.count.max(0))
            .map_while(|i| self.start_num.checked_add(i))
            .map(|n| format!("{prefix}-{n}"))
            .collect()
    }

    /// Validate, including the batch size cap and the numbering range.
    pub fn check(&self, max_batch: i64) -> Result<(), SeatError> {
        self.validate()?;
        if self.count > max_batch {
            return Err(SeatError::Validation(format!("count must not exceed {max_batch}")));
        }
        if self.start_num.checked_add(self.count - 1).is_none() {
            return Err(SeatError::Validation("start number is too large for this count".into()));
        }
        Ok(())
    }

    /// Fields for every record of the batch; they share expiry, remark,
    /// limit and cadence.
    pub fn to_fields(&self, now: DateTime<Utc>, max_batch: i64) -> Result<Vec<RecordFields>, SeatError> {
        self.check(max_batch)?;
        let exp_time = add_days(now, self.days())?;
        Ok(self
            .names()
            .into_iter()
            .map(|name| RecordFields {
                name,
                remark: self.remark.clone(),
                exp_time,
                limit: Some(limit_value(self.limit)),
                xufei_type: Some(self.cadence),
            })
            .collect())
    }

    /// Create the records one after another, each awaited before the next
    /// is sent.
    pub async fn submit<G: RecordGateway>(
        &self,
        gateway: &G,
        listing: &mut ListingController,
        now: DateTime<Utc>,
        max_batch: i64,
    ) -> Result<BatchOutcome, SeatError> {
        let all = self.to_fields(now, max_batch)?;
        let collection = listing.collection().clone();
        let mut outcome = BatchOutcome::default();

        let mut pending = all.into_iter();
        for fields in pending.by_ref() {
            match gateway.create(&collection, &fields).await {
                Ok(record) => outcome.created.push(record),
                Err(e) => {
                    warn!(%collection, name = %fields.name, error = %e, "batch create stopped");
                    outcome.failed = Some(BatchFailure { name: fields.name, reason: e.to_string() });
                    break;
                }
            }
        }
        outcome.not_attempted = pending.map(|f| f.name).collect();
        info!(
            %collection,
            created = outcome.created.len(),
            failed = outcome.failed.is_some(),
            "batch create finished"
        );

        if !outcome.created.is_empty() {
            listing.focus(self.prefix.trim());
            let _ = listing.refresh(gateway).await;
        }
        Ok(outcome)
    }
}

// ── renew / edit ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
pub struct RenewForm {
    #[validate(custom(function = "name_present"))]
    pub name: String,
    #[serde(default)]
    pub remark: String,
    #[validate(range(min = 0, message = "limit must not be negative"))]
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub cadence: RenewalCadence,
    #[validate(range(min = 1, max = 36500, message = "days must be between 1 and 36500"))]
    #[serde(default)]
    pub days: Option<i64>,
}

impl RenewForm {
    /// Pre-fill from the record being renewed.
    pub fn prefill(record: &SeatRecord) -> Self {
        let cadence = record.cadence();
        Self {
            name: record.name.clone(),
            remark: record.remark.clone(),
            limit: Some(record.limit.min(i64::MAX as u64) as i64),
            cadence,
            days: Some(cadence.default_days()),
        }
    }

    /// Changing cadence resets the days to that cadence's default.
    pub fn set_cadence(&mut self, cadence: RenewalCadence) {
        self.cadence = cadence;
        self.days = Some(cadence.default_days());
    }

    pub fn days(&self) -> i64 {
        resolve_days(self.days, self.cadence)
    }

    /// The expiry a submit would store right now.
    pub fn preview(&self, record: &SeatRecord, now: DateTime<Utc>) -> Result<DateTime<Utc>, SeatError> {
        self.validate()?;
        compute_renewal(record.exp_time, self.days(), now)
    }

    /// All editable fields, overwritten together.
    pub fn to_fields(&self, record: &SeatRecord, now: DateTime<Utc>) -> Result<RecordFields, SeatError> {
        let exp_time = self.preview(record, now)?;
        Ok(RecordFields {
            name: self.name.trim().to_owned(),
            remark: self.remark.clone(),
            exp_time,
            limit: Some(limit_value(self.limit)),
            xufei_type: Some(self.cadence),
        })
    }

    pub async fn submit<G: RecordGateway>(
        &self,
        gateway: &G,
        listing: &mut ListingController,
        record: &SeatRecord,
        now: DateTime<Utc>,
    ) -> Result<SeatRecord, SeatError> {
        let fields = self.to_fields(record, now)?;
        let updated = gateway.update(listing.collection(), &record.id, &fields).await?;
        info!(
            collection = %listing.collection(),
            id = %updated.id,
            exp_time = %updated.exp_time,
            "record renewed"
        );
        listing.focus(&fields.name);
        let _ = listing.refresh(gateway).await;
        Ok(updated)
    }
}
