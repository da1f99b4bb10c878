//! Listing controller: pagination, search, selection and the in-memory copy
//! of the visible page.
//!
//! State moves `Idle -> Loading -> Loaded | Errored` on every
//! [`ListingController::refresh`]. The visible page is always replaced
//! wholesale, never patched.
//!
//! Selection is kept per collection across page navigation. Ids that are
//! selected but not on the visible page are reported by
//! [`ListingController::offscreen_selected`] so the console can show them.

use std::collections::BTreeSet;

use serde::Serialize;
use tracing::{debug, warn};

use crate::bulk::{BulkDeleteReport, delete_many};
use crate::collection::CollectionName;
use crate::error::SeatError;
use crate::gateway::RecordGateway;
use crate::query::{ListQuery, PAGE_SIZE, Page, SearchFilter, SortSpec};
use crate::record::SeatRecord;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "error", rename_all = "snake_case")]
pub enum ListingState {
    Idle,
    Loading,
    Loaded,
    Errored(String),
}

#[derive(Debug, Clone)]
pub struct ListingController {
    collection: CollectionName,
    page: u32,
    per_page: u32,
    query: String,
    selection: BTreeSet<String>,
    state: ListingState,
    current: Option<Page<SeatRecord>>,
}

impl ListingController {
    pub fn new(collection: CollectionName) -> Self {
        Self {
            collection,
            page: 1,
            per_page: PAGE_SIZE,
            query: String::new(),
            selection: BTreeSet::new(),
            state: ListingState::Idle,
            current: None,
        }
    }

    pub fn collection(&self) -> &CollectionName {
        &self.collection
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    pub fn per_page(&self) -> u32 {
        self.per_page
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn state(&self) -> &ListingState {
        &self.state
    }

    /// The last successfully loaded page.
    pub fn current(&self) -> Option<&Page<SeatRecord>> {
        self.current.as_ref()
    }

    /// Known page count, `None` before the first load.
    pub fn total_pages(&self) -> Option<u32> {
        self.current.as_ref().map(|p| p.total_pages)
    }

    /// Switch collection. Returns `true` if it changed; a change starts over
    /// at page 1 with an empty selection.
    pub fn set_collection(&mut self, collection: CollectionName) -> bool {
        if collection == self.collection {
            return false;
        }
        debug!(from = %self.collection, to = %collection, "switching collection");
        self.collection = collection;
        self.page = 1;
        self.selection.clear();
        self.current = None;
        self.state = ListingState::Idle;
        true
    }

    /// Update the search text. A changed query restarts at page 1.
    pub fn set_query(&mut self, query: &str) -> bool {
        if query == self.query {
            return false;
        }
        self.query = query.to_owned();
        self.page = 1;
        true
    }

    /// Navigate to `page`. Out-of-range pages are ignored and `false` is
    /// returned; before the first load any page >= 1 is accepted.
    pub fn set_page(&mut self, page: u32) -> bool {
        if page < 1 || page == self.page {
            return false;
        }
        if let Some(total) = self.total_pages() {
            if page > total.max(1) {
                return false;
            }
        }
        self.page = page;
        true
    }

    pub fn can_go_next(&self) -> bool {
        self.total_pages().is_some_and(|total| self.page < total)
    }

    pub fn can_go_prev(&self) -> bool {
        self.page > 1
    }

    /// Jump to page 1 filtered by `query`, as done after every mutation.
    pub fn focus(&mut self, query: &str) {
        self.query = query.to_owned();
        self.page = 1;
    }

    pub fn list_query(&self) -> ListQuery {
        ListQuery {
            page: self.page,
            per_page: self.per_page,
            sort: SortSpec::by_expiry(),
            filter: SearchFilter::new(&self.query),
        }
    }

    /// Re-fetch the visible page.
    ///
    /// When the store reports fewer pages than the current page number (rows
    /// were deleted, or a page was requested before the first load), the
    /// listing moves to the last page and fetches again.
    ///
    /// On failure the previous page stays available through
    /// [`Self::current`] and the state carries the error message.
    pub async fn refresh<G: RecordGateway>(&mut self, gateway: &G) -> Result<&Page<SeatRecord>, SeatError> {
        self.state = ListingState::Loading;
        let mut page = self.fetch(gateway).await?;
        let last = page.total_pages.max(1);
        if self.page > last {
            debug!(collection = %self.collection, from = self.page, to = last, "page past the end, moving back");
            self.page = last;
            page = self.fetch(gateway).await?;
        }
        self.state = ListingState::Loaded;
        Ok(&*self.current.insert(page))
    }

    async fn fetch<G: RecordGateway>(&mut self, gateway: &G) -> Result<Page<SeatRecord>, SeatError> {
        let query = self.list_query();
        match gateway.list(&self.collection, &query).await {
            Ok(page) => {
                debug!(
                    collection = %self.collection,
                    page = page.page,
                    items = page.items.len(),
                    total = page.total_items,
                    "listing refreshed"
                );
                Ok(page)
            }
            Err(e) => {
                warn!(collection = %self.collection, error = %e, "listing refresh failed");
                self.state = ListingState::Errored(e.to_string());
                Err(e)
            }
        }
    }

    // ── selection ─────────────────────────────────────────────────────────────

    pub fn set_selected(&mut self, id: &str, selected: bool) {
        if selected {
            self.selection.insert(id.to_owned());
        } else {
            self.selection.remove(id);
        }
    }

    /// Select or deselect every row of the visible page.
    pub fn set_page_selected(&mut self, selected: bool) {
        let ids: Vec<String> = self
            .current
            .as_ref()
            .map(|p| p.items.iter().map(|r| r.id.clone()).collect())
            .unwrap_or_default();
        for id in ids {
            self.set_selected(&id, selected);
        }
    }

    pub fn is_selected(&self, id: &str) -> bool {
        self.selection.contains(id)
    }

    /// Selected ids in sorted order.
    pub fn selected(&self) -> Vec<String> {
        self.selection.iter().cloned().collect()
    }

    pub fn selected_count(&self) -> usize {
        self.selection.len()
    }

    /// Selected ids that are not rows of the visible page.
    pub fn offscreen_selected(&self) -> Vec<String> {
        let visible: BTreeSet<&str> = self
            .current
            .as_ref()
            .map(|p| p.items.iter().map(|r| r.id.as_str()).collect())
            .unwrap_or_default();
        self.selection.iter().filter(|id| !visible.contains(id.as_str())).cloned().collect()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    /// Drop the successfully deleted ids from the selection; failed ones stay
    /// selected so they can be retried.
    pub fn apply_deletions(&mut self, report: &BulkDeleteReport) {
        for id in &report.deleted {
            self.selection.remove(id);
        }
    }

    /// Delete every selected record, update the selection from the outcome
    /// and re-fetch the page.
    pub async fn delete_selected<G: RecordGateway>(&mut self, gateway: &G) -> BulkDeleteReport {
        let ids = self.selected();
        let report = delete_many(gateway, &self.collection, &ids).await;
        self.apply_deletions(&report);
        // The error is kept in `state`.
        let _ = self.refresh(gateway).await;
        report
    }
}
