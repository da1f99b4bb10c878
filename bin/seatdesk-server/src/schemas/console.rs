use chrono::{DateTime, Utc};
use reqwest::Url;
use seatdesk_core::forms::BatchFailure;
use seatdesk_core::{
    BatchCreateForm, BulkDeleteReport, CreateForm, DeleteFailure, ListingController, ListingState, RenewForm,
    RenewalCadence, SeatRecord,
};
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;
use utoipa::{IntoParams, ToSchema};

// ── listing ───────────────────────────────────────────────────────────────────

/// Listing transitions, applied in order: collection, query, page.
#[derive(Debug, Default, Deserialize, ToSchema, IntoParams)]
pub struct ListingParams {
    /// Collection to show; switching clears the selection.
    pub collection: Option<String>,
    /// Search text matched against id, name and remark.
    pub q: Option<String>,
    /// 1-based page; out-of-range values are ignored.
    pub page: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordRow {
    pub id: String,
    pub name: String,
    pub remark: String,
    pub exp_time: String,
    pub limit: u64,
    /// `day`, `week` or `month`.
    pub cadence: String,
    pub remaining_days: i64,
    /// `expired`, `critical`, `warning` or `healthy`.
    pub tier: String,
    pub selected: bool,
    pub created: Option<String>,
    pub updated: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ListingView {
    pub collection: String,
    pub query: String,
    pub page: u32,
    pub per_page: u32,
    /// Matches for the active query.
    pub total_items: u64,
    pub total_pages: u32,
    pub has_prev: bool,
    pub has_next: bool,
    /// `idle`, `loading`, `loaded` or `errored`.
    pub state: String,
    pub error: Option<String>,
    pub rows: Vec<RecordRow>,
    pub selected_count: usize,
    /// Selected ids not on this page.
    pub offscreen_selected: Vec<String>,
    /// Relative URL reproducing this view.
    pub url: String,
}

impl RecordRow {
    pub fn from_record(record: &SeatRecord, selected: bool, now: DateTime<Utc>) -> Self {
        RecordRow {
            id: record.id.clone(),
            name: record.name.clone(),
            remark: record.remark.clone(),
            exp_time: record.exp_time.to_rfc3339(),
            limit: record.limit,
            cadence: record.cadence().to_string(),
            remaining_days: record.remaining_days(now),
            tier: record.tier(now).to_string(),
            selected,
            created: record.created.map(|t| t.to_rfc3339()),
            updated: record.updated.map(|t| t.to_rfc3339()),
        }
    }
}

impl ListingView {
    pub fn from_listing(listing: &ListingController, now: DateTime<Utc>) -> Self {
        let (state, error) = match listing.state() {
            ListingState::Idle => ("idle", None),
            ListingState::Loading => ("loading", None),
            ListingState::Loaded => ("loaded", None),
            ListingState::Errored(e) => ("errored", Some(e.clone())),
        };
        let (rows, total_items, total_pages) = match listing.current() {
            Some(page) => (
                page.items.iter().map(|r| RecordRow::from_record(r, listing.is_selected(&r.id), now)).collect(),
                page.total_items,
                page.total_pages,
            ),
            None => (Vec::new(), 0, 0),
        };
        ListingView {
            collection: listing.collection().to_string(),
            query: listing.query().to_owned(),
            page: listing.page(),
            per_page: listing.per_page(),
            total_items,
            total_pages,
            has_prev: listing.can_go_prev(),
            has_next: listing.can_go_next(),
            state: state.to_owned(),
            error,
            rows,
            selected_count: listing.selected_count(),
            offscreen_selected: listing.offscreen_selected(),
            url: view_url(listing),
        }
    }
}

/// `/console/records?collection=..&q=..&page=..` for the listing's position.
pub fn view_url(listing: &ListingController) -> String {
    let Ok(mut url) = Url::parse("http://localhost/console/records") else {
        return "/console/records".to_owned();
    };
    {
        let mut pairs = url.query_pairs_mut();
        pairs.append_pair("collection", listing.collection().as_str());
        if !listing.query().is_empty() {
            pairs.append_pair("q", listing.query());
        }
        if listing.page() > 1 {
            pairs.append_pair("page", &listing.page().to_string());
        }
    }
    match url.query() {
        Some(q) => format!("{}?{q}", url.path()),
        None => url.path().to_owned(),
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CadenceOption {
    pub name: String,
    pub default_days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CollectionsView {
    pub collections: Vec<String>,
    pub active: String,
    pub cadences: Vec<CadenceOption>,
}

impl CadenceOption {
    pub fn all() -> Vec<CadenceOption> {
        RenewalCadence::iter()
            .map(|c| CadenceOption { name: c.to_string(), default_days: c.default_days() })
            .collect()
    }
}

// ── mutations ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateRecordRequest {
    pub name: String,
    #[serde(default)]
    pub remark: String,
    #[schema(value_type = Option<String>, example = "day")]
    pub cadence: Option<RenewalCadence>,
    /// Defaults to the cadence's day count.
    pub days: Option<i64>,
    pub limit: Option<i64>,
}

impl From<CreateRecordRequest> for CreateForm {
    fn from(r: CreateRecordRequest) -> Self {
        CreateForm { name: r.name, remark: r.remark, cadence: r.cadence.unwrap_or_default(), days: r.days, limit: r.limit }
    }
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BatchCreateRequest {
    pub prefix: String,
    /// First number appended to the prefix; defaults to 1.
    pub start_num: Option<i64>,
    /// Defaults to 1.
    pub count: Option<i64>,
    #[serde(default)]
    pub remark: String,
    pub limit: Option<i64>,
    #[schema(value_type = Option<String>, example = "week")]
    pub cadence: Option<RenewalCadence>,
    pub days: Option<i64>,
}

impl From<BatchCreateRequest> for BatchCreateForm {
    fn from(r: BatchCreateRequest) -> Self {
        let defaults = BatchCreateForm::default();
        BatchCreateForm {
            prefix: r.prefix,
            start_num: r.start_num.unwrap_or(defaults.start_num),
            count: r.count.unwrap_or(defaults.count),
            remark: r.remark,
            limit: r.limit,
            cadence: r.cadence.unwrap_or(defaults.cadence),
            days: r.days,
        }
    }
}

/// Overrides for the renew form; omitted fields keep the record's values.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RenewRequest {
    pub name: Option<String>,
    pub remark: Option<String>,
    pub limit: Option<i64>,
    /// Changing the cadence resets `days` to its default unless `days` is given.
    #[schema(value_type = Option<String>, example = "month")]
    pub cadence: Option<RenewalCadence>,
    pub days: Option<i64>,
}

impl RenewRequest {
    /// Pre-fill from `record`, then apply the overrides.
    pub fn into_form(self, record: &SeatRecord) -> RenewForm {
        let mut form = RenewForm::prefill(record);
        if let Some(name) = self.name {
            form.name = name;
        }
        if let Some(remark) = self.remark {
            form.remark = remark;
        }
        if self.limit.is_some() {
            form.limit = self.limit;
        }
        if let Some(cadence) = self.cadence {
            form.set_cadence(cadence);
        }
        if self.days.is_some() {
            form.days = self.days;
        }
        form
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RenewPreview {
    pub id: String,
    pub current_exp_time: String,
    pub new_exp_time: String,
    pub cadence: String,
    pub days: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecordMutationResponse {
    pub record: RecordRow,
    /// The listing, refocused on the touched record.
    pub listing: ListingView,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FailureView {
    /// Record name (batch create) or id (bulk delete).
    pub key: String,
    pub reason: String,
}

impl From<&BatchFailure> for FailureView {
    fn from(f: &BatchFailure) -> Self {
        FailureView { key: f.name.clone(), reason: f.reason.clone() }
    }
}

impl From<&DeleteFailure> for FailureView {
    fn from(f: &DeleteFailure) -> Self {
        FailureView { key: f.id.clone(), reason: f.reason.clone() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BatchCreateResponse {
    pub created: Vec<RecordRow>,
    pub failed: Option<FailureView>,
    pub not_attempted: Vec<String>,
    pub listing: ListingView,
}

// ── selection ─────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct SelectionUpdate {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default = "yes")]
    pub selected: bool,
    /// Select (`true`) or deselect (`false`) every row of the visible page.
    pub all_on_page: Option<bool>,
}

fn yes() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SelectionView {
    pub collection: String,
    /// Sorted.
    pub ids: Vec<String>,
    pub count: usize,
    pub offscreen: Vec<String>,
    /// Ids joined by newlines, ready to copy.
    pub text: String,
}

impl SelectionView {
    pub fn from_listing(listing: &ListingController) -> Self {
        let ids = listing.selected();
        SelectionView {
            collection: listing.collection().to_string(),
            count: ids.len(),
            offscreen: listing.offscreen_selected(),
            text: ids.join("\n"),
            ids,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct BulkDeleteResponse {
    pub requested: usize,
    pub deleted: Vec<String>,
    pub failed: Vec<FailureView>,
    /// Failed ids stay selected.
    pub selection: SelectionView,
    pub listing: ListingView,
}

impl BulkDeleteResponse {
    pub fn new(report: &BulkDeleteReport, listing: &ListingController, now: DateTime<Utc>) -> Self {
        BulkDeleteResponse {
            requested: report.requested(),
            deleted: report.deleted.clone(),
            failed: report.failed.iter().map(FailureView::from).collect(),
            selection: SelectionView::from_listing(listing),
            listing: ListingView::from_listing(listing, now),
        }
    }
}
