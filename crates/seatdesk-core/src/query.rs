//! Paged listing requests and the server-side search filter.

use serde::{Deserialize, Serialize};

/// Fixed page size of the console listing.
pub const PAGE_SIZE: u32 = 50;

/// Fields matched by the free-text search, OR-combined.
pub const SEARCH_FIELDS: [&str; 3] = ["name", "id", "remark"];

/// Sort on a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortSpec {
    pub field: String,
    pub descending: bool,
}

impl SortSpec {
    pub fn descending(field: impl Into<String>) -> Self {
        Self { field: field.into(), descending: true }
    }

    /// Latest expiry first; the only order the console offers.
    pub fn by_expiry() -> Self {
        Self::descending("exp_time")
    }

    /// The store's notation: field name, `-` prefix for descending.
    pub fn to_expr(&self) -> String {
        if self.descending {
            format!("-{}", self.field)
        } else {
            self.field.clone()
        }
    }
}

/// Case-insensitive substring match of one term against [`SEARCH_FIELDS`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilter {
    term: String,
}

impl SearchFilter {
    /// `None` for a blank term: a blank search lists everything.
    pub fn new(term: &str) -> Option<Self> {
        let term = term.trim();
        if term.is_empty() { None } else { Some(Self { term: term.to_owned() }) }
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    /// Render as a store filter expression, e.g.
    /// `name ~ 'edu' || id ~ 'edu' || remark ~ 'edu'`.
    pub fn to_expr(&self) -> String {
        let quoted = quote(&self.term);
        SEARCH_FIELDS
            .iter()
            .map(|field| format!("{field} ~ {quoted}"))
            .collect::<Vec<_>>()
            .join(" || ")
    }

    /// Client-side evaluation with the same semantics as the store's `~`.
    pub fn matches(&self, id: &str, name: &str, remark: &str) -> bool {
        let needle = self.term.to_lowercase();
        [name, id, remark].iter().any(|v| v.to_lowercase().contains(&needle))
    }
}

fn quote(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len() + 2);
    out.push('\'');
    for c in raw.chars() {
        if c == '\'' || c == '\\' {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('\'');
    out
}

/// One page request against a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    /// 1-based.
    pub page: u32,
    pub per_page: u32,
    pub sort: SortSpec,
    pub filter: Option<SearchFilter>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self { page: 1, per_page: PAGE_SIZE, sort: SortSpec::by_expiry(), filter: None }
    }
}

/// One page of results.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub page: u32,
    pub per_page: u32,
    pub total_items: u64,
    pub total_pages: u32,
}

impl<T> Page<T> {
    pub fn empty(per_page: u32) -> Self {
        Self { items: Vec::new(), page: 1, per_page, total_items: 0, total_pages: 0 }
    }
}

/// `ceil(total_items / per_page)`.
pub fn total_pages(total_items: u64, per_page: u32) -> u32 {
    if per_page == 0 {
        return 0;
    }
    total_items.div_ceil(u64::from(per_page)) as u32
}
