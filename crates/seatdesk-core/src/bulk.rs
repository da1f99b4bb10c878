//! Bulk deletion with per-record outcomes.

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::collection::CollectionName;
use crate::gateway::RecordGateway;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteFailure {
    pub id: String,
    pub reason: String,
}

/// What happened to each requested id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BulkDeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<DeleteFailure>,
}

impl BulkDeleteReport {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn requested(&self) -> usize {
        self.deleted.len() + self.failed.len()
    }
}

/// Delete every id in `ids`, all requests in flight at once.
///
/// A failing id never aborts the others; the report lists both sides in the
/// order of `ids`.
pub async fn delete_many<G: RecordGateway>(gateway: &G, collection: &CollectionName, ids: &[String]) -> BulkDeleteReport {
    let outcomes = join_all(ids.iter().map(|id| async move { (id, gateway.delete(collection, id).await) })).await;

    let mut report = BulkDeleteReport::default();
    for (id, outcome) in outcomes {
        match outcome {
            Ok(()) => report.deleted.push(id.clone()),
            Err(e) => {
                warn!(%collection, id = %id, error = %e, "delete failed");
                report.failed.push(DeleteFailure { id: id.clone(), reason: e.to_string() });
            }
        }
    }
    info!(%collection, deleted = report.deleted.len(), failed = report.failed.len(), "bulk delete finished");
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expiry::add_days;
    use crate::memory::{Event, MemoryGateway, Op};
    use crate::record::RecordFields;
    use chrono::Utc;
    use tracing_test::traced_test;

    async fn seed(gw: &MemoryGateway, c: &CollectionName, n: usize) -> Vec<String> {
        let mut ids = Vec::new();
        for i in 0..n {
            let fields = RecordFields {
                name: format!("u-{i}"),
                remark: String::new(),
                exp_time: add_days(Utc::now(), 1).unwrap(),
                limit: None,
                xufei_type: None,
            };
            ids.push(gw.create(c, &fields).await.unwrap().id);
        }
        ids
    }

    #[tokio::test]
    #[traced_test]
    async fn partial_failure_is_reported_per_id() {
        let c = CollectionName::new("users").unwrap();
        let gw = MemoryGateway::new();
        let ids = seed(&gw, &c, 3).await;
        gw.fail_on(ids[1].clone());

        let report = delete_many(&gw, &c, &ids).await;
        assert_eq!(report.deleted, vec![ids[0].clone(), ids[2].clone()]);
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].id, ids[1]);
        assert!(!report.is_complete());
        assert_eq!(report.requested(), 3);
        assert_eq!(gw.records(&c).len(), 1);
        assert!(logs_contain("delete failed"));
    }

    #[tokio::test]
    async fn deletes_are_dispatched_concurrently() {
        let c = CollectionName::new("users").unwrap();
        let gw = MemoryGateway::new();
        let ids = seed(&gw, &c, 2).await;
        gw.clear_journal();

        delete_many(&gw, &c, &ids).await;
        let journal = gw.journal();
        assert_eq!(journal[0], Event::Started(Op::Delete, ids[0].clone()));
        assert_eq!(journal[1], Event::Started(Op::Delete, ids[1].clone()));
    }

    #[tokio::test]
    async fn empty_request_is_a_complete_noop() {
        let c = CollectionName::new("users").unwrap();
        let report = delete_many(&MemoryGateway::new(), &c, &[]).await;
        assert!(report.is_complete());
        assert_eq!(report.requested(), 0);
    }
}
