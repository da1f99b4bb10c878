//! In-process [`RecordGateway`].
//!
//! Behaves like the remote store for listing, filtering and pagination, keeps
//! a journal of every call and can be told to fail specific ids or names.
//! Each operation yields to the executor once between its `Started` and
//! `Finished` journal entries, so overlapping calls show up interleaved.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use chrono::Utc;

use crate::collection::CollectionName;
use crate::error::SeatError;
use crate::gateway::RecordGateway;
use crate::query::{ListQuery, Page, total_pages};
use crate::record::{RecordFields, SeatRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    List,
    Create,
    Update,
    Delete,
    Get,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Started(Op, String),
    Finished(Op, String),
}

#[derive(Debug, Default)]
struct Inner {
    collections: HashMap<CollectionName, Vec<SeatRecord>>,
    journal: Vec<Event>,
    failing: HashSet<String>,
    unique_names: bool,
    next_id: u64,
}

#[derive(Debug, Default)]
pub struct MemoryGateway {
    inner: Mutex<Inner>,
}

impl MemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject creates and updates that would duplicate a name in a collection.
    pub fn with_unique_names(self) -> Self {
        self.lock().unique_names = true;
        self
    }

    /// Make every operation that targets `key` (a record id, or a name on
    /// create) fail with a store error.
    pub fn fail_on(&self, key: impl Into<String>) {
        self.lock().failing.insert(key.into());
    }

    /// Put a record in place as-is, bypassing the journal.
    pub fn seed(&self, collection: &CollectionName, record: SeatRecord) {
        self.lock().collections.entry(collection.clone()).or_default().push(record);
    }

    pub fn records(&self, collection: &CollectionName) -> Vec<SeatRecord> {
        self.lock().collections.get(collection).cloned().unwrap_or_default()
    }

    pub fn journal(&self) -> Vec<Event> {
        self.lock().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.lock().journal.clear();
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock only means a test panicked mid-call; the data is still usable.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn start(&self, op: Op, key: &str) -> Result<(), SeatError> {
        let mut inner = self.lock();
        inner.journal.push(Event::Started(op, key.to_owned()));
        if inner.failing.contains(key) {
            inner.journal.push(Event::Finished(op, key.to_owned()));
            return Err(SeatError::Store { status: 500, message: format!("injected failure for '{key}'") });
        }
        Ok(())
    }

    fn finish(&self, op: Op, key: &str) {
        self.lock().journal.push(Event::Finished(op, key.to_owned()));
    }

    fn list_now(&self, collection: &CollectionName, query: &ListQuery) -> Page<SeatRecord> {
        let inner = self.lock();
        let mut rows: Vec<SeatRecord> = inner
            .collections
            .get(collection)
            .map(|rows| {
                rows.iter()
                    .filter(|r| query.filter.as_ref().is_none_or(|f| f.matches(&r.id, &r.name, &r.remark)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        rows.sort_by(|a, b| {
            let ord = match query.sort.field.as_str() {
                "name" => a.name.cmp(&b.name),
                "created" => a.created.cmp(&b.created),
                _ => a.exp_time.cmp(&b.exp_time),
            };
            if query.sort.descending { ord.reverse() } else { ord }
        });

        let per_page = query.per_page.max(1);
        let total_items = rows.len() as u64;
        let skip = (query.page.max(1) as usize - 1) * per_page as usize;
        Page {
            items: rows.into_iter().skip(skip).take(per_page as usize).collect(),
            page: query.page.max(1),
            per_page,
            total_items,
            total_pages: total_pages(total_items, per_page),
        }
    }

    fn create_now(&self, collection: &CollectionName, fields: &RecordFields) -> Result<SeatRecord, SeatError> {
        let mut inner = self.lock();
        let unique = inner.unique_names;
        inner.next_id += 1;
        let id = format!("rec{:012}", inner.next_id);
        let rows = inner.collections.entry(collection.clone()).or_default();
        if unique && rows.iter().any(|r| r.name == fields.name) {
            return Err(duplicate_name());
        }
        let now = Utc::now();
        let record = SeatRecord {
            id,
            name: fields.name.clone(),
            remark: fields.remark.clone(),
            exp_time: fields.exp_time,
            limit: fields.limit.unwrap_or(0),
            xufei_type: fields.xufei_type,
            created: Some(now),
            updated: Some(now),
        };
        rows.push(record.clone());
        Ok(record)
    }

    fn update_now(&self, collection: &CollectionName, id: &str, fields: &RecordFields) -> Result<SeatRecord, SeatError> {
        let mut inner = self.lock();
        let unique = inner.unique_names;
        let rows = inner.collections.entry(collection.clone()).or_default();
        if unique && rows.iter().any(|r| r.id != id && r.name == fields.name) {
            return Err(duplicate_name());
        }
        let record = rows.iter_mut().find(|r| r.id == id).ok_or_else(|| SeatError::NotFound(id.to_owned()))?;
        record.name = fields.name.clone();
        record.remark = fields.remark.clone();
        record.exp_time = fields.exp_time;
        if let Some(limit) = fields.limit {
            record.limit = limit;
        }
        if fields.xufei_type.is_some() {
            record.xufei_type = fields.xufei_type;
        }
        record.updated = Some(Utc::now());
        Ok(record.clone())
    }

    fn delete_now(&self, collection: &CollectionName, id: &str) -> Result<(), SeatError> {
        let mut inner = self.lock();
        let rows = inner.collections.entry(collection.clone()).or_default();
        let before = rows.len();
        rows.retain(|r| r.id != id);
        if rows.len() == before {
            return Err(SeatError::NotFound(id.to_owned()));
        }
        Ok(())
    }

    fn get_now(&self, collection: &CollectionName, id: &str) -> Result<SeatRecord, SeatError> {
        self.lock()
            .collections
            .get(collection)
            .and_then(|rows| rows.iter().find(|r| r.id == id).cloned())
            .ok_or_else(|| SeatError::NotFound(id.to_owned()))
    }
}

fn duplicate_name() -> SeatError {
    SeatError::Store { status: 400, message: "Failed to save record. name: Value must be unique.".into() }
}

impl RecordGateway for MemoryGateway {
    async fn list(&self, collection: &CollectionName, query: &ListQuery) -> Result<Page<SeatRecord>, SeatError> {
        let key = collection.to_string();
        self.start(Op::List, &key)?;
        tokio::task::yield_now().await;
        let page = self.list_now(collection, query);
        self.finish(Op::List, &key);
        Ok(page)
    }

    async fn create(&self, collection: &CollectionName, fields: &RecordFields) -> Result<SeatRecord, SeatError> {
        self.start(Op::Create, &fields.name)?;
        tokio::task::yield_now().await;
        let result = self.create_now(collection, fields);
        self.finish(Op::Create, &fields.name);
        result
    }

    async fn update(&self, collection: &CollectionName, id: &str, fields: &RecordFields) -> Result<SeatRecord, SeatError> {
        self.start(Op::Update, id)?;
        tokio::task::yield_now().await;
        let result = self.update_now(collection, id, fields);
        self.finish(Op::Update, id);
        result
    }

    async fn delete(&self, collection: &CollectionName, id: &str) -> Result<(), SeatError> {
        self.start(Op::Delete, id)?;
        tokio::task::yield_now().await;
        let result = self.delete_now(collection, id);
        self.finish(Op::Delete, id);
        result
    }

    async fn get(&self, collection: &CollectionName, id: &str) -> Result<SeatRecord, SeatError> {
        self.start(Op::Get, id)?;
        tokio::task::yield_now().await;
        let result = self.get_now(collection, id);
        self.finish(Op::Get, id);
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::add_days;
    use crate::query::SearchFilter;

    fn users() -> CollectionName {
        CollectionName::new("baidu_edu_users").unwrap()
    }

    fn fields(name: &str, days: i64) -> RecordFields {
        RecordFields {
            name: name.into(),
            remark: format!("remark of {name}"),
            exp_time: add_days(Utc::now(), days).unwrap(),
            limit: None,
            xufei_type: None,
        }
    }

    #[tokio::test]
    async fn list_pages_and_sorts_by_expiry_desc() {
        let gw = MemoryGateway::new();
        for i in 0..120 {
            gw.create(&users(), &fields(&format!("u-{i}"), i)).await.unwrap();
        }
        let page = gw.list(&users(), &ListQuery::default()).await.unwrap();
        assert_eq!(page.total_items, 120);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items.len(), 50);
        assert_eq!(page.items[0].name, "u-119");

        let last = gw.list(&users(), &ListQuery { page: 3, ..ListQuery::default() }).await.unwrap();
        assert_eq!(last.items.len(), 20);
        assert_eq!(last.items.last().unwrap().name, "u-0");
    }

    #[tokio::test]
    async fn list_filters_across_whole_collection() {
        let gw = MemoryGateway::new();
        for i in 0..60 {
            gw.create(&users(), &fields(&format!("edu-{i}"), 1)).await.unwrap();
        }
        gw.create(&users(), &fields("other", 1)).await.unwrap();
        let q = ListQuery { filter: SearchFilter::new("edu"), ..ListQuery::default() };
        let page = gw.list(&users(), &q).await.unwrap();
        assert_eq!(page.total_items, 60);
    }

    #[tokio::test]
    async fn unique_names_are_enforced_when_asked() {
        let gw = MemoryGateway::new().with_unique_names();
        gw.create(&users(), &fields("a", 1)).await.unwrap();
        let err = gw.create(&users(), &fields("a", 1)).await.unwrap_err();
        assert!(err.is_validation());
    }

    #[tokio::test]
    async fn injected_failures_are_reported() {
        let gw = MemoryGateway::new();
        let rec = gw.create(&users(), &fields("a", 1)).await.unwrap();
        gw.fail_on(rec.id.clone());
        assert!(gw.delete(&users(), &rec.id).await.is_err());
        assert_eq!(gw.records(&users()).len(), 1);
    }

    #[tokio::test]
    async fn update_and_delete_unknown_ids_are_not_found() {
        let gw = MemoryGateway::new();
        assert!(matches!(gw.delete(&users(), "nope").await, Err(SeatError::NotFound(_))));
        assert!(matches!(gw.update(&users(), "nope", &fields("a", 1)).await, Err(SeatError::NotFound(_))));
    }
}
