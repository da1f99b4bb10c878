//! Renewable-seat records kept in a remote PocketBase collection.
//!
//! - [`expiry`]: day arithmetic, renewal rule, urgency tiers.
//! - [`gateway`]: the [`RecordGateway`] trait, with [`pocketbase`] and
//!   `memory` (behind the `testing` feature) implementations.
//! - [`listing`]: paging, search and selection over one collection.
//! - [`forms`]: create, batch-create and renew flows.
//! - [`bulk`]: concurrent deletes with per-id outcomes.

pub mod bulk;
pub mod collection;
pub mod error;
pub mod expiry;
pub mod forms;
pub mod gateway;
pub mod listing;
#[cfg(any(test, feature = "testing"))]
pub mod memory;
pub mod pocketbase;
pub mod query;
pub mod record;

pub use bulk::{BulkDeleteReport, DeleteFailure};
pub use collection::CollectionName;
pub use error::SeatError;
pub use expiry::{ExpiryTier, add_days, compute_renewal, remaining_days};
pub use forms::{BatchCreateForm, BatchOutcome, CreateForm, RenewForm};
pub use gateway::RecordGateway;
pub use listing::{ListingController, ListingState};
#[cfg(any(test, feature = "testing"))]
pub use memory::MemoryGateway;
pub use pocketbase::{AuthRecord, AuthResponse, PocketBaseClient};
pub use query::{ListQuery, PAGE_SIZE, Page, SearchFilter, SortSpec};
pub use record::{RecordFields, RenewalCadence, SeatRecord};
