// Assignment orchestration
//
// Loads the workload snapshot, runs the engine, writes the plan back in
// bounded batches, then invalidates stale cache namespaces and appends an
// audit entry. Concurrent runs are not serialized: two admins triggering a
// bulk assignment at once may both plan against the same snapshot. The
// resulting imbalance is corrected by the next run.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::cache::{cache_key, ResponseCache, KEY_SEPARATOR};
use crate::config::AssignmentSettings;
use crate::domain::agent::WorkloadSnapshot;
use crate::domain::assignment::engine::validate_file_ids;
use crate::domain::assignment::{
    plan_assignments, AssignmentError, AssignmentEvent, AssignmentPlan, AssignmentReport,
    AssignmentResult,
};
use crate::domain::file::{FileAssignmentUpdate, FileRecord};
use crate::domain::repositories::file_repository::FILES_CACHE_PREFIX;
use crate::domain::repositories::{
    AgentRepository, AuditEntry, AuditLogRepository, FileFilter, FilePage, FileRepository,
};
use crate::domain::stats::AssignmentStats;

/// Cache namespace for assignment statistics
pub const ASSIGN_CACHE_PREFIX: &str = "assign";
/// Cache namespace for per-agent views
pub const AGENT_CACHE_PREFIX: &str = "agent";
/// Cache namespace for per-user views
pub const USER_CACHE_PREFIX: &str = "user";

/// Cache key of the assignment statistics view
pub fn stats_cache_key() -> String {
    cache_key(ASSIGN_CACHE_PREFIX, &[Some("stats")])
}

/// Key of a per-entity view, e.g. `agent:a1`
pub fn entity_cache_key(namespace: &str, id: &str) -> String {
    cache_key(namespace, &[Some(id)])
}

fn store_unavailable(e: String) -> AssignmentError {
    AssignmentError::StoreUnavailable(e)
}

pub struct AssignmentService {
    agents: Arc<dyn AgentRepository>,
    files: Arc<dyn FileRepository>,
    audit: Arc<dyn AuditLogRepository>,
    cache: Arc<ResponseCache>,
    settings: AssignmentSettings,
}

impl AssignmentService {
    pub fn new(
        agents: Arc<dyn AgentRepository>,
        files: Arc<dyn FileRepository>,
        audit: Arc<dyn AuditLogRepository>,
        cache: Arc<ResponseCache>,
        settings: AssignmentSettings,
    ) -> Self {
        Self {
            agents,
            files,
            audit,
            cache,
            settings: AssignmentSettings {
                batch_size: settings.batch_size.max(1),
                ..settings
            },
        }
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn settings(&self) -> &AssignmentSettings {
        &self.settings
    }

    /// Assigns the given files across the active agents
    ///
    /// Every requested file must exist and be paid or already assigned
    /// (reassignment overwrites the previous assignee). Validation errors
    /// short-circuit before any write.
    ///
    /// # Errors
    /// * `InvalidArgument` - empty, blank, duplicate, unknown or non-assignable ids
    /// * `NoEligibleAgents` - no active agent
    /// * `StoreUnavailable` - snapshot could not be read
    /// * `PartialWriteFailure` - a write batch failed; carries the split of
    ///   committed and failed ids
    pub async fn assign_files(
        &self,
        actor: &str,
        file_ids: Vec<String>,
    ) -> AssignmentResult<AssignmentReport> {
        validate_file_ids(&file_ids)?;

        let roster = self
            .bounded(self.agents.find_all())
            .await
            .map_err(store_unavailable)?;
        if !roster.iter().any(|a| a.is_active) {
            return Err(AssignmentError::NoEligibleAgents);
        }

        let all_files = self
            .bounded(self.files.find_all())
            .await
            .map_err(store_unavailable)?;
        let by_id: HashMap<&str, &FileRecord> =
            all_files.iter().map(|f| (f.id.as_str(), f)).collect();

        for file_id in &file_ids {
            match by_id.get(file_id.as_str()) {
                None => {
                    return Err(AssignmentError::InvalidArgument(format!(
                        "File not found: {}",
                        file_id
                    )))
                }
                Some(file) if !file.is_assignable() => {
                    return Err(AssignmentError::InvalidArgument(format!(
                        "File {} cannot be assigned from status {}",
                        file_id, file.status
                    )))
                }
                Some(_) => {}
            }
        }

        // Files being (re)assigned no longer count against their old assignee
        let requested: HashSet<&str> = file_ids.iter().map(String::as_str).collect();
        let remaining: Vec<FileRecord> = all_files
            .iter()
            .filter(|f| !requested.contains(f.id.as_str()))
            .cloned()
            .collect();
        let snapshot = WorkloadSnapshot::build(&roster, &remaining);

        let plan = plan_assignments(&file_ids, snapshot.into_inner())?;
        let (committed, failure) = self.persist(&plan).await;

        if committed > 0 {
            let mut agents: BTreeSet<&str> = plan.assignments[..committed]
                .iter()
                .map(|a| a.agent_id.as_str())
                .collect();
            let mut owners = BTreeSet::new();
            for assignment in &plan.assignments[..committed] {
                if let Some(file) = by_id.get(assignment.file_id.as_str()) {
                    if let Some(previous) = file.assigned_agent_id.as_deref() {
                        agents.insert(previous);
                    }
                    if let Some(owner) = file.owner_id.as_deref() {
                        owners.insert(owner);
                    }
                }
            }
            self.invalidate_after_write(agents, owners);
        }

        let mut report = AssignmentReport::from_plan(&plan, committed);
        report.restore_unwritten(|file_id| {
            by_id
                .get(file_id)
                .and_then(|file| file.assigned_agent_id.clone())
        });
        if committed > 0 {
            self.record(AssignmentEvent::FilesAssigned {
                actor: actor.to_string(),
                planned: report.planned,
                assigned: report.assigned,
                file_ids: report.succeeded.clone(),
                distribution: report.distribution.clone(),
            })
            .await;
        }

        match failure {
            None => {
                tracing::info!(
                    actor,
                    planned = report.planned,
                    assigned = report.assigned,
                    "Files assigned"
                );
                Ok(report)
            }
            Some(reason) => {
                tracing::warn!(
                    actor,
                    planned = report.planned,
                    assigned = report.assigned,
                    reason = %reason,
                    "Assignment write-back incomplete"
                );
                Err(AssignmentError::PartialWriteFailure {
                    report: Box::new(report),
                    reason,
                })
            }
        }
    }

    /// Assigns every paid file that has no agent yet, oldest first
    ///
    /// Nothing to assign yields a report with no planned files, carrying
    /// the current workload of every rostered agent, rather than an error.
    pub async fn assign_unassigned(
        &self,
        actor: &str,
        limit: Option<usize>,
    ) -> AssignmentResult<AssignmentReport> {
        let pending = self
            .bounded(self.files.find_unassigned(limit))
            .await
            .map_err(store_unavailable)?;

        if pending.is_empty() {
            tracing::info!(actor, "No unassigned files to distribute");
            let agents = self
                .bounded(self.agents.find_all())
                .await
                .map_err(store_unavailable)?;
            let files = self
                .bounded(self.files.find_all())
                .await
                .map_err(store_unavailable)?;
            let snapshot = WorkloadSnapshot::build(&agents, &files);
            return Ok(AssignmentReport::empty(snapshot.into_inner()));
        }

        let file_ids = pending.into_iter().map(|f| f.id).collect();
        self.assign_files(actor, file_ids).await
    }

    /// Manually points a single file at a specific agent
    ///
    /// Overwrites any previous assignee. Returns the updated record.
    pub async fn reassign_file(
        &self,
        actor: &str,
        file_id: &str,
        agent_id: &str,
    ) -> AssignmentResult<FileRecord> {
        if file_id.trim().is_empty() || agent_id.trim().is_empty() {
            return Err(AssignmentError::InvalidArgument(
                "file_id and agent_id are required".to_string(),
            ));
        }

        let agent = self
            .bounded(self.agents.find_by_id(agent_id))
            .await
            .map_err(store_unavailable)?
            .ok_or_else(|| AssignmentError::InvalidArgument(format!("Agent not found: {}", agent_id)))?;
        if !agent.is_active {
            return Err(AssignmentError::NoEligibleAgents);
        }

        let requested = [file_id.to_string()];
        let mut file = self
            .bounded(self.files.find_by_ids(&requested))
            .await
            .map_err(store_unavailable)?
            .into_iter()
            .next()
            .ok_or_else(|| AssignmentError::InvalidArgument(format!("File not found: {}", file_id)))?;
        if !file.is_assignable() {
            return Err(AssignmentError::InvalidArgument(format!(
                "File {} cannot be assigned from status {}",
                file_id, file.status
            )));
        }

        let update = FileAssignmentUpdate::assigned(file_id, agent_id, Utc::now());
        let written = self
            .bounded(self.files.apply_assignments(std::slice::from_ref(&update)))
            .await;
        if let Err(reason) = written {
            tracing::warn!(actor, file_id, agent_id, reason = %reason, "Reassignment write failed");
            return Err(AssignmentError::PartialWriteFailure {
                report: Box::new(AssignmentReport {
                    planned: 1,
                    failed: vec![file_id.to_string()],
                    ..AssignmentReport::default()
                }),
                reason,
            });
        }

        let previous_agent_id = file.assigned_agent_id.clone();
        file.apply(&update);

        let mut agents = BTreeSet::from([agent_id]);
        if let Some(previous) = previous_agent_id.as_deref() {
            agents.insert(previous);
        }
        self.invalidate_after_write(agents, file.owner_id.as_deref().into_iter().collect());

        self.record(AssignmentEvent::FileReassigned {
            actor: actor.to_string(),
            file_id: file_id.to_string(),
            previous_agent_id,
            agent_id: agent_id.to_string(),
        })
        .await;

        tracing::info!(actor, file_id, agent_id, "File reassigned");
        Ok(file)
    }

    /// Dashboard statistics, served from cache when fresh
    pub async fn assignment_stats(&self) -> AssignmentResult<AssignmentStats> {
        let key = stats_cache_key();
        if let Some(stats) = self.cached::<AssignmentStats>(&key) {
            return Ok(stats);
        }

        let agents = self
            .bounded(self.agents.find_all())
            .await
            .map_err(store_unavailable)?;
        let files = self
            .bounded(self.files.find_all())
            .await
            .map_err(store_unavailable)?;
        let stats = AssignmentStats::compute(&agents, &files);

        self.store_cached(key, &stats, self.settings.stats_ttl);
        Ok(stats)
    }

    /// Filtered file listing page, served from cache when fresh
    pub async fn list_files(&self, filter: &FileFilter) -> AssignmentResult<FilePage> {
        let key = filter.cache_key();
        if let Some(page) = self.cached::<FilePage>(&key) {
            return Ok(page);
        }

        let page = self
            .bounded(self.files.list(filter))
            .await
            .map_err(store_unavailable)?;
        self.store_cached(key, &page, self.settings.listing_ttl);
        Ok(page)
    }

    /// Writes the plan in batches, stopping at the first failed batch
    ///
    /// Returns how many plan entries were committed and the failure, if any.
    /// Committed batches are never rolled back. A batch that overruns the
    /// store timeout is treated as failed, and so are all batches after it.
    async fn persist(&self, plan: &AssignmentPlan) -> (usize, Option<String>) {
        let updates = plan.updates(Utc::now());
        let mut committed = 0;

        for (batch_number, batch) in updates.chunks(self.settings.batch_size).enumerate() {
            match self.bounded(self.files.apply_assignments(batch)).await {
                Ok(()) => {
                    committed += batch.len();
                    tracing::debug!(batch_number, size = batch.len(), "Assignment batch committed");
                }
                Err(e) => {
                    return (
                        committed,
                        Some(format!("batch {} failed: {}", batch_number, e)),
                    )
                }
            }
        }

        (committed, None)
    }

    fn invalidate_after_write<'a>(
        &self,
        agents: BTreeSet<&'a str>,
        owners: BTreeSet<&'a str>,
    ) {
        let mut removed = self.invalidate_key(ASSIGN_CACHE_PREFIX);
        removed += self.invalidate_key(FILES_CACHE_PREFIX);
        for agent_id in agents {
            removed += self.invalidate_key(&entity_cache_key(AGENT_CACHE_PREFIX, agent_id));
        }
        for owner_id in owners {
            removed += self.invalidate_key(&entity_cache_key(USER_CACHE_PREFIX, owner_id));
        }
        tracing::debug!(removed, "Cache entries invalidated");
    }

    /// Drops `key` and everything under `key:`, leaving siblings such as
    /// `key2` or `key_archive:*` alone
    fn invalidate_key(&self, key: &str) -> usize {
        let mut removed = usize::from(self.cache.delete(key));
        removed += self
            .cache
            .delete_by_prefix(&format!("{}{}", key, KEY_SEPARATOR));
        removed
    }

    async fn record(&self, event: AssignmentEvent) {
        let entry = AuditEntry::from_event(&event);
        if let Err(e) = self.bounded(self.audit.append(entry)).await {
            tracing::warn!(action = event.action(), error = %e, "Failed to append audit entry");
        }
    }

    /// Runs one store call under the store timeout
    async fn bounded<T, F>(&self, call: F) -> Result<T, String>
    where
        F: Future<Output = Result<T, String>>,
    {
        let limit = self.settings.store_timeout;
        tokio::time::timeout(limit, call)
            .await
            .unwrap_or_else(|_| Err(format!("store call timed out after {:?}", limit)))
    }

    fn cached<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.cache.get(key)?;
        match serde_json::from_value(value) {
            Ok(parsed) => Some(parsed),
            Err(e) => {
                tracing::warn!(key, error = %e, "Dropping unreadable cache entry");
                self.cache.delete(key);
                None
            }
        }
    }

    fn store_cached<T: Serialize>(&self, key: String, value: &T, ttl: Duration) {
        match serde_json::to_value(value) {
            Ok(json) => self.cache.set(key, json, ttl),
            Err(e) => tracing::warn!(key = %key, error = %e, "Failed to cache response"),
        }
    }
}
