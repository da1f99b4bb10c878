//! Record gateway abstraction.
//!
//! [`RecordGateway`] is the only path from the console to stored records.
//! [`crate::pocketbase::PocketBaseClient`] talks to a PocketBase server;
//! `MemoryGateway` (feature `testing`) keeps records in process.
//!
//! All trait methods use `impl Future` in their signatures so no extra
//! `async-trait` crate is required.

use std::future::Future;

use crate::collection::CollectionName;
use crate::error::SeatError;
use crate::query::{ListQuery, Page};
use crate::record::{RecordFields, SeatRecord};

pub trait RecordGateway: Send + Sync {
    /// Fetch one page, sorted and optionally filtered by the store.
    fn list(
        &self,
        collection: &CollectionName,
        query: &ListQuery,
    ) -> impl Future<Output = Result<Page<SeatRecord>, SeatError>> + Send;

    /// Create a record. Uniqueness of `name` is left to the store.
    fn create(
        &self,
        collection: &CollectionName,
        fields: &RecordFields,
    ) -> impl Future<Output = Result<SeatRecord, SeatError>> + Send;

    /// Overwrite the editable fields of record `id`.
    fn update(
        &self,
        collection: &CollectionName,
        id: &str,
        fields: &RecordFields,
    ) -> impl Future<Output = Result<SeatRecord, SeatError>> + Send;

    fn delete(
        &self,
        collection: &CollectionName,
        id: &str,
    ) -> impl Future<Output = Result<(), SeatError>> + Send;

    /// Fetch a single record by id.
    fn get(
        &self,
        collection: &CollectionName,
        id: &str,
    ) -> impl Future<Output = Result<SeatRecord, SeatError>> + Send;
}
