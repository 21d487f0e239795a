//! Integration tests for the assignment service
//!
//! These tests run the full plan -> batched write -> invalidate -> audit
//! flow against the in-memory store, including injected store failures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use docdesk_api::cache::ResponseCache;
use docdesk_api::config::AssignmentSettings;
use docdesk_api::domain::agent::{Agent, WorkloadSnapshot};
use docdesk_api::domain::assignment::{plan_assignments, AssignmentError};
use docdesk_api::domain::file::{FileAssignmentUpdate, FileRecord, FileStatus};
use docdesk_api::domain::repositories::{FileFilter, FilePage, FileRepository};
use docdesk_api::infrastructure::repositories::InMemoryStore;
use docdesk_api::services::assignment_service::{stats_cache_key, AssignmentService};

const ADMIN: &str = "admin-1";

fn settings(batch_size: usize) -> AssignmentSettings {
    AssignmentSettings {
        batch_size,
        ..AssignmentSettings::default()
    }
}

fn service_with(store: &InMemoryStore, batch_size: usize) -> (AssignmentService, Arc<ResponseCache>) {
    let cache = Arc::new(ResponseCache::new(50));
    let service = AssignmentService::new(
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        cache.clone(),
        settings(batch_size),
    );
    (service, cache)
}

/// File repository whose write batches stall from the `stall_from`th on
struct StallingFiles {
    inner: InMemoryStore,
    stall_from: usize,
    batches: AtomicUsize,
}

impl StallingFiles {
    fn new(inner: &InMemoryStore, stall_from: usize) -> Self {
        Self {
            inner: inner.clone(),
            stall_from,
            batches: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl FileRepository for StallingFiles {
    async fn find_all(&self) -> Result<Vec<FileRecord>, String> {
        self.inner.find_all().await
    }

    async fn find_unassigned(&self, limit: Option<usize>) -> Result<Vec<FileRecord>, String> {
        self.inner.find_unassigned(limit).await
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<FileRecord>, String> {
        self.inner.find_by_ids(ids).await
    }

    async fn list(&self, filter: &FileFilter) -> Result<FilePage, String> {
        self.inner.list(filter).await
    }

    async fn apply_assignments(&self, batch: &[FileAssignmentUpdate]) -> Result<(), String> {
        if self.batches.fetch_add(1, Ordering::SeqCst) >= self.stall_from {
            tokio::time::sleep(Duration::from_secs(5)).await;
        }
        self.inner.apply_assignments(batch).await
    }
}

fn paid_files(n: usize) -> Vec<FileRecord> {
    (1..=n)
        .map(|i| FileRecord::new(format!("f{}", i), FileStatus::Paid).with_owner(format!("u{}", i % 2)))
        .collect()
}

fn ids(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("f{}", i)).collect()
}

#[tokio::test]
async fn assigns_files_and_persists_status() {
    let store = InMemoryStore::with_data(
        vec![Agent::active("a", "Ann"), Agent::active("b", "Bob")],
        paid_files(4),
    );
    let (service, _) = service_with(&store, 500);

    let report = service.assign_files(ADMIN, ids(4)).await.expect("assignment succeeds");

    assert!(report.is_complete());
    assert_eq!(report.summary(), "assigned 4 of 4 files");
    assert_eq!(report.distribution.get("a"), Some(&2));
    assert_eq!(report.distribution.get("b"), Some(&2));
    for id in ids(4) {
        let file = store.file(&id).unwrap();
        assert_eq!(file.status, FileStatus::Assigned);
        assert!(file.assigned_at.is_some());
    }
}

#[tokio::test]
async fn snapshot_counts_existing_workload() {
    let mut files = paid_files(5);
    files.push(FileRecord::new("old1", FileStatus::Processing).with_agent("b"));
    files.push(FileRecord::new("old2", FileStatus::Assigned).with_agent("b"));
    files.push(FileRecord::new("old3", FileStatus::Assigned).with_agent("b"));
    let store = InMemoryStore::with_data(vec![Agent::active("a", "A"), Agent::active("b", "B")], files);
    let (service, _) = service_with(&store, 500);

    let report = service.assign_files(ADMIN, ids(5)).await.unwrap();

    // A catches up to B's three pending files, ties go to A, then B
    assert_eq!(report.distribution.get("a"), Some(&4));
    assert_eq!(report.distribution.get("b"), Some(&1));
    assert_eq!(store.file("f5").unwrap().assigned_agent_id.as_deref(), Some("b"));
}

#[tokio::test]
async fn writes_in_bounded_batches() {
    let store = InMemoryStore::with_data(vec![Agent::active("a", "A")], paid_files(7));
    let (service, _) = service_with(&store, 3);

    service.assign_files(ADMIN, ids(7)).await.unwrap();

    assert_eq!(store.batch_sizes(), vec![3, 3, 1]);
}

#[tokio::test]
async fn empty_request_is_rejected_before_reads() {
    let store = InMemoryStore::new();
    store.set_reads_unavailable(true);
    let (service, _) = service_with(&store, 500);

    let result = service.assign_files(ADMIN, vec![]).await;

    assert!(matches!(result, Err(AssignmentError::InvalidArgument(_))));
}

#[tokio::test]
async fn no_active_agents_writes_nothing() {
    let store = InMemoryStore::with_data(vec![Agent::inactive("a", "A")], paid_files(2));
    let (service, _) = service_with(&store, 500);

    let err = service.assign_files(ADMIN, ids(2)).await.unwrap_err();

    assert!(matches!(err, AssignmentError::NoEligibleAgents));
    assert!(err.is_planning_error());
    assert!(store.batch_sizes().is_empty());
    assert!(store.file("f1").unwrap().is_unassigned());
}

#[tokio::test]
async fn unknown_or_unassignable_files_are_rejected() {
    let mut files = paid_files(1);
    files.push(FileRecord::new("done", FileStatus::Completed).with_agent("a"));
    let store = InMemoryStore::with_data(vec![Agent::active("a", "A")], files);
    let (service, _) = service_with(&store, 500);

    let unknown = service
        .assign_files(ADMIN, vec!["f1".to_string(), "ghost".to_string()])
        .await;
    assert!(matches!(unknown, Err(AssignmentError::InvalidArgument(_))));

    let completed = service.assign_files(ADMIN, vec!["done".to_string()]).await;
    assert!(matches!(completed, Err(AssignmentError::InvalidArgument(_))));

    assert!(store.batch_sizes().is_empty());
}

#[tokio::test]
async fn unreachable_store_is_reported_as_unavailable() {
    let store = InMemoryStore::with_data(vec![Agent::active("a", "A")], paid_files(1));
    store.set_reads_unavailable(true);
    let (service, _) = service_with(&store, 500);

    let result = service.assign_files(ADMIN, ids(1)).await;

    assert!(matches!(result, Err(AssignmentError::StoreUnavailable(_))));
}

#[tokio::test]
async fn partial_write_failure_reports_exact_split() {
    let store = InMemoryStore::with_data(
        vec![Agent::active("a", "A"), Agent::active("b", "B")],
        paid_files(5),
    );
    store.fail_writes_from_batch(1);
    let (service, cache) = service_with(&store, 2);
    cache.set("files:page=1:size=20", serde_json::json!({}), Duration::from_secs(60));

    let err = service.assign_files(ADMIN, ids(5)).await.unwrap_err();

    let report = err.partial_report().expect("partial result");
    assert_eq!(report.summary(), "assigned 2 of 5 files");
    assert_eq!(report.succeeded, vec!["f1", "f2"]);
    assert_eq!(report.failed, vec!["f3", "f4", "f5"]);
    assert!(!err.is_planning_error());

    // Committed batch stays in effect, later files untouched
    assert_eq!(store.file("f1").unwrap().status, FileStatus::Assigned);
    assert!(store.file("f3").unwrap().is_unassigned());

    // Partial success still invalidates and audits
    assert!(!cache.contains_key("files:page=1:size=20"));
    assert_eq!(store.audit_entries().len(), 1);
}

#[tokio::test]
async fn retrying_the_remainder_completes_the_batch() {
    let store = InMemoryStore::with_data(vec![Agent::active("a", "A")], paid_files(4));
    store.fail_writes_from_batch(1);
    let (service, _) = service_with(&store, 2);

    let err = service.assign_files(ADMIN, ids(4)).await.unwrap_err();
    let failed = err.partial_report().unwrap().failed.clone();

    store.fail_writes_from_batch(usize::MAX);
    let report = service.assign_files(ADMIN, failed).await.unwrap();

    assert_eq!(report.summary(), "assigned 2 of 2 files");
    assert!(ids(4)
        .iter()
        .all(|id| store.file(id).unwrap().status == FileStatus::Assigned));
}

#[tokio::test]
async fn invalidates_assignment_listing_agent_and_user_views() {
    let store = InMemoryStore::with_data(vec![Agent::active("a", "A")], paid_files(2));
    let (service, cache) = service_with(&store, 500);
    let ttl = Duration::from_secs(60);
    for key in [
        "assign:stats",
        "files:status=paid:page=1:size=20",
        "agent:a",
        "agent:a:files",
        "agent:ab",
        "user:u1:files",
        "user:u9",
        "assignee:a",
        "files_archive:1",
    ] {
        cache.set(key, serde_json::json!(1), ttl);
    }

    service.assign_files(ADMIN, ids(2)).await.unwrap();

    assert!(!cache.contains_key("assign:stats"));
    assert!(!cache.contains_key("files:status=paid:page=1:size=20"));
    assert!(!cache.contains_key("agent:a"));
    assert!(!cache.contains_key("agent:a:files"));
    assert!(!cache.contains_key("user:u1:files"));
    // Unrelated entities keep their views
    assert!(cache.contains_key("agent:ab"));
    assert!(cache.contains_key("user:u9"));
    // Namespaces sharing a leading word are distinct
    assert!(cache.contains_key("assignee:a"));
    assert!(cache.contains_key("files_archive:1"));
}

#[tokio::test]
async fn audit_failure_does_not_fail_assignment() {
    let store = InMemoryStore::with_data(vec![Agent::active("a", "A")], paid_files(1));
    store.set_audit_unavailable(true);
    let (service, _) = service_with(&store, 500);

    let report = service.assign_files(ADMIN, ids(1)).await.unwrap();

    assert!(report.is_complete());
    assert!(store.audit_entries().is_empty());
}

#[tokio::test]
async fn audit_entry_describes_the_run() {
    let store = InMemoryStore::with_data(vec![Agent::active("a", "A")], paid_files(2));
    let (service, _) = service_with(&store, 500);

    service.assign_files(ADMIN, ids(2)).await.unwrap();

    let entries = store.audit_entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].actor, ADMIN);
    assert_eq!(entries[0].action, "files_assigned");
    assert_eq!(entries[0].details["assigned"], 2);
    assert_eq!(entries[0].details["distribution"]["a"], 2);
}

#[tokio::test]
async fn auto_assign_picks_up_only_unassigned_paid_files() {
    let mut files = paid_files(3);
    files.push(FileRecord::new("unpaid", FileStatus::PendingPayment));
    files.push(FileRecord::new("taken", FileStatus::Assigned).with_agent("a"));
    let store = InMemoryStore::with_data(vec![Agent::active("a", "A"), Agent::active("b", "B")], files);
    let (service, _) = service_with(&store, 500);

    let report = service.assign_unassigned(ADMIN, None).await.unwrap();

    assert_eq!(report.planned, 3);
    assert!(store.file("unpaid").unwrap().assigned_agent_id.is_none());
    assert_eq!(store.file("taken").unwrap().assigned_agent_id.as_deref(), Some("a"));
    assert_eq!(report.distribution.get("b"), Some(&2));
}

#[tokio::test]
async fn auto_assign_with_nothing_pending_is_empty_report() {
    let store = InMemoryStore::with_data(vec![Agent::active("a", "A")], vec![]);
    let (service, _) = service_with(&store, 500);

    let report = service.assign_unassigned(ADMIN, Some(10)).await.unwrap();

    assert_eq!(report.summary(), "assigned 0 of 0 files");
    assert_eq!(report.workloads.len(), 1);
    assert_eq!(report.workloads[0].agent_id, "a");
}

#[tokio::test]
async fn auto_assign_respects_limit() {
    let store = InMemoryStore::with_data(vec![Agent::active("a", "A")], paid_files(5));
    let (service, _) = service_with(&store, 500);

    let report = service.assign_unassigned(ADMIN, Some(2)).await.unwrap();

    assert_eq!(report.assigned, 2);
    assert!(store.file("f3").unwrap().is_unassigned());
}

#[tokio::test]
async fn reassign_overwrites_previous_agent() {
    let store = InMemoryStore::with_data(
        vec![Agent::active("a", "A"), Agent::active("b", "B")],
        vec![FileRecord::new("f1", FileStatus::Assigned).with_agent("a").with_owner("u1")],
    );
    let (service, cache) = service_with(&store, 500);
    cache.set("agent:a", serde_json::json!(1), Duration::from_secs(60));

    let file = service.reassign_file(ADMIN, "f1", "b").await.unwrap();

    assert_eq!(file.assigned_agent_id.as_deref(), Some("b"));
    assert_eq!(store.file("f1").unwrap().assigned_agent_id.as_deref(), Some("b"));
    assert!(!cache.contains_key("agent:a"));
    let entries = store.audit_entries();
    assert_eq!(entries[0].action, "file_reassigned");
    assert_eq!(entries[0].details["previous_agent_id"], "a");
}

#[tokio::test]
async fn reassign_rejects_inactive_and_unknown_targets() {
    let store = InMemoryStore::with_data(
        vec![Agent::active("a", "A"), Agent::inactive("off", "Off")],
        vec![
            FileRecord::new("f1", FileStatus::Paid),
            FileRecord::new("done", FileStatus::Completed),
        ],
    );
    let (service, _) = service_with(&store, 500);

    assert!(matches!(
        service.reassign_file(ADMIN, "f1", "off").await,
        Err(AssignmentError::NoEligibleAgents)
    ));
    assert!(matches!(
        service.reassign_file(ADMIN, "f1", "ghost").await,
        Err(AssignmentError::InvalidArgument(_))
    ));
    assert!(matches!(
        service.reassign_file(ADMIN, "missing", "a").await,
        Err(AssignmentError::InvalidArgument(_))
    ));
    assert!(matches!(
        service.reassign_file(ADMIN, "done", "a").await,
        Err(AssignmentError::InvalidArgument(_))
    ));
}

#[tokio::test]
async fn bulk_reassignment_releases_old_assignee_load() {
    let store = InMemoryStore::with_data(
        vec![Agent::active("a", "A"), Agent::active("b", "B")],
        vec![
            FileRecord::new("f1", FileStatus::Assigned).with_agent("a"),
            FileRecord::new("f2", FileStatus::Assigned).with_agent("a"),
        ],
    );
    let (service, _) = service_with(&store, 500);

    let report = service
        .assign_files(ADMIN, vec!["f1".to_string(), "f2".to_string()])
        .await
        .unwrap();

    // Both start from zero once their current assignments are released
    assert_eq!(report.distribution.get("a"), Some(&1));
    assert_eq!(report.distribution.get("b"), Some(&1));
}

#[tokio::test]
async fn failed_bulk_move_keeps_load_on_previous_assignee() {
    let store = InMemoryStore::with_data(
        vec![Agent::active("a", "A"), Agent::active("b", "B")],
        vec![
            FileRecord::new("f1", FileStatus::Paid),
            FileRecord::new("f2", FileStatus::Assigned).with_agent("a"),
        ],
    );
    store.fail_writes_from_batch(1);
    let (service, _) = service_with(&store, 1);

    let err = service
        .assign_files(ADMIN, vec!["f1".to_string(), "f2".to_string()])
        .await
        .unwrap_err();
    let report = err.partial_report().expect("partial result");

    assert_eq!(report.succeeded, vec!["f1"]);
    assert_eq!(report.failed, vec!["f2"]);
    assert_eq!(store.file("f2").unwrap().assigned_agent_id.as_deref(), Some("a"));

    // The reported workloads match what the store now holds
    let stored = WorkloadSnapshot::build(
        &[Agent::active("a", "A"), Agent::active("b", "B")],
        &[store.file("f1").unwrap(), store.file("f2").unwrap()],
    );
    assert_eq!(report.workloads, stored.into_inner());
    assert_eq!(report.workloads[0].pending_files, 2);
    assert_eq!(report.workloads[1].pending_files, 0);
}

#[tokio::test]
async fn slow_write_batch_becomes_partial_failure() {
    let store = InMemoryStore::with_data(
        vec![Agent::active("a", "A"), Agent::active("b", "B")],
        paid_files(4),
    );
    let cache = Arc::new(ResponseCache::new(50));
    let service = AssignmentService::new(
        Arc::new(store.clone()),
        Arc::new(StallingFiles::new(&store, 2)),
        Arc::new(store.clone()),
        cache.clone(),
        AssignmentSettings {
            batch_size: 1,
            store_timeout: Duration::from_millis(100),
            ..AssignmentSettings::default()
        },
    );

    // Warm the stats view before the write
    let before = service.assignment_stats().await.unwrap();
    assert_eq!(before.unassigned_files, 4);
    assert!(cache.contains_key(&stats_cache_key()));

    let err = service.assign_files(ADMIN, ids(4)).await.unwrap_err();

    let report = err.partial_report().expect("partial result");
    assert_eq!(report.succeeded, vec!["f1", "f2"]);
    assert_eq!(report.failed, vec!["f3", "f4"]);
    assert!(err.to_string().contains("timed out"));
    assert!(store.file("f3").unwrap().is_unassigned());

    // Committed batches still invalidate and audit
    assert!(!cache.contains_key(&stats_cache_key()));
    assert_eq!(store.audit_entries().len(), 1);
    let after = service.assignment_stats().await.unwrap();
    assert_eq!(after.unassigned_files, 2);
}

#[tokio::test]
async fn stats_are_cached_until_a_write() {
    let store = InMemoryStore::with_data(vec![Agent::active("a", "A")], paid_files(2));
    let (service, cache) = service_with(&store, 500);

    let before = service.assignment_stats().await.unwrap();
    assert_eq!(before.unassigned_files, 2);
    assert!(cache.contains_key(&stats_cache_key()));

    // Served from cache even though the store changed underneath
    store.upsert_file(FileRecord::new("f3", FileStatus::Paid));
    assert_eq!(service.assignment_stats().await.unwrap().unassigned_files, 2);

    service.assign_files(ADMIN, ids(2)).await.unwrap();
    let after = service.assignment_stats().await.unwrap();
    assert_eq!(after.unassigned_files, 1);
    assert_eq!(after.agent_workloads[0].pending_files, 2);
}

#[tokio::test]
async fn stats_survive_store_outage_while_cached() {
    let store = InMemoryStore::with_data(vec![Agent::active("a", "A")], paid_files(1));
    let (service, _) = service_with(&store, 500);

    service.assignment_stats().await.unwrap();
    store.set_reads_unavailable(true);

    assert!(service.assignment_stats().await.is_ok());
}

#[tokio::test]
async fn file_listing_is_cached_per_filter() {
    let store = InMemoryStore::with_data(vec![Agent::active("a", "A")], paid_files(3));
    let (service, cache) = service_with(&store, 500);
    let filter = FileFilter {
        status: Some(FileStatus::Paid),
        ..Default::default()
    };

    let page = service.list_files(&filter).await.unwrap();
    assert_eq!(page.total, 3);
    assert!(cache.contains_key(&filter.cache_key()));

    service.assign_files(ADMIN, ids(1)).await.unwrap();
    assert!(!cache.contains_key(&filter.cache_key()));
    assert_eq!(service.list_files(&filter).await.unwrap().total, 2);
}

#[tokio::test]
async fn concurrent_runs_may_plan_against_the_same_snapshot() {
    // No cross-request lock: two runs that both read before either writes
    // see the same least-loaded agent.
    let agents = vec![Agent::active("a", "A"), Agent::active("b", "B")];
    let existing = vec![FileRecord::new("x", FileStatus::Assigned).with_agent("b")];
    let snapshot = WorkloadSnapshot::build(&agents, &existing);

    let first = plan_assignments(&["f1".to_string()], snapshot.clone().into_inner()).unwrap();
    let second = plan_assignments(&["f2".to_string()], snapshot.into_inner()).unwrap();
    assert_eq!(first.agent_for("f1"), Some("a"));
    assert_eq!(second.agent_for("f2"), Some("a"));

    // Both writes land on "a"; the next run reads fresh state and corrects
    let store = InMemoryStore::with_data(
        agents,
        vec![
            FileRecord::new("x", FileStatus::Assigned).with_agent("b"),
            FileRecord::new("f1", FileStatus::Assigned).with_agent("a"),
            FileRecord::new("f2", FileStatus::Assigned).with_agent("a"),
            FileRecord::new("f3", FileStatus::Paid),
        ],
    );
    let (service, _) = service_with(&store, 500);

    let report = service.assign_files(ADMIN, vec!["f3".to_string()]).await.unwrap();

    assert_eq!(report.distribution.get("b"), Some(&1));
    let stats = service.assignment_stats().await.unwrap();
    assert_eq!(stats.workload_spread, 0);
}
