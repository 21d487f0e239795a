use std::sync::Arc;

use async_trait::async_trait;
use indexmap::IndexMap;
use parking_lot::RwLock;

use crate::domain::agent::Agent;
use crate::domain::file::{FileAssignmentUpdate, FileRecord};
use crate::domain::repositories::{
    AgentRepository, AuditEntry, AuditLogRepository, FileFilter, FilePage, FileRepository,
};

#[derive(Default)]
struct StoreState {
    agents: Vec<Agent>,
    files: IndexMap<String, FileRecord>,
    audit: Vec<AuditEntry>,
    batch_sizes: Vec<usize>,
    fail_writes_from_batch: Option<usize>,
    reads_unavailable: bool,
    audit_unavailable: bool,
}

/// In-memory document store
///
/// Implements the agent, file and audit log repositories over shared
/// in-process state. Used when no `DATABASE_URL` is configured and by the
/// test suites, which can inject read, write and audit failures.
///
/// This type is Clone-able - clones share the same underlying storage.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<StoreState>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with an agent roster and files
    pub fn with_data(agents: Vec<Agent>, files: Vec<FileRecord>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write();
            state.agents = agents;
            state.files = files.into_iter().map(|f| (f.id.clone(), f)).collect();
        }
        store
    }

    /// Adds or replaces an agent
    pub fn upsert_agent(&self, agent: Agent) {
        let mut state = self.state.write();
        match state.agents.iter_mut().find(|a| a.id == agent.id) {
            Some(existing) => *existing = agent,
            None => state.agents.push(agent),
        }
    }

    /// Adds or replaces a file
    pub fn upsert_file(&self, file: FileRecord) {
        self.state.write().files.insert(file.id.clone(), file);
    }

    /// Current copy of a file
    pub fn file(&self, id: &str) -> Option<FileRecord> {
        self.state.read().files.get(id).cloned()
    }

    /// Audit entries in append order
    pub fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.read().audit.clone()
    }

    /// Sizes of every batch accepted or rejected by `apply_assignments`
    pub fn batch_sizes(&self) -> Vec<usize> {
        self.state.read().batch_sizes.clone()
    }

    /// Makes the `n`th write batch (0-based) and every later one fail
    pub fn fail_writes_from_batch(&self, n: usize) {
        self.state.write().fail_writes_from_batch = Some(n);
    }

    /// Makes every read fail, as if the store were unreachable
    pub fn set_reads_unavailable(&self, unavailable: bool) {
        self.state.write().reads_unavailable = unavailable;
    }

    /// Makes audit appends fail
    pub fn set_audit_unavailable(&self, unavailable: bool) {
        self.state.write().audit_unavailable = unavailable;
    }

    fn check_reads(state: &StoreState) -> Result<(), String> {
        if state.reads_unavailable {
            Err("connection refused".to_string())
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl AgentRepository for InMemoryStore {
    async fn find_all(&self) -> Result<Vec<Agent>, String> {
        let state = self.state.read();
        Self::check_reads(&state)?;
        Ok(state.agents.clone())
    }

    async fn find_active(&self) -> Result<Vec<Agent>, String> {
        let state = self.state.read();
        Self::check_reads(&state)?;
        Ok(state.agents.iter().filter(|a| a.is_active).cloned().collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Agent>, String> {
        let state = self.state.read();
        Self::check_reads(&state)?;
        Ok(state.agents.iter().find(|a| a.id == id).cloned())
    }
}

#[async_trait]
impl FileRepository for InMemoryStore {
    async fn find_all(&self) -> Result<Vec<FileRecord>, String> {
        let state = self.state.read();
        Self::check_reads(&state)?;
        Ok(state.files.values().cloned().collect())
    }

    async fn find_unassigned(&self, limit: Option<usize>) -> Result<Vec<FileRecord>, String> {
        let state = self.state.read();
        Self::check_reads(&state)?;
        Ok(state
            .files
            .values()
            .filter(|f| f.is_unassigned())
            .take(limit.unwrap_or(usize::MAX))
            .cloned()
            .collect())
    }

    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<FileRecord>, String> {
        let state = self.state.read();
        Self::check_reads(&state)?;
        Ok(ids.iter().filter_map(|id| state.files.get(id).cloned()).collect())
    }

    async fn list(&self, filter: &FileFilter) -> Result<FilePage, String> {
        let state = self.state.read();
        Self::check_reads(&state)?;

        let matching: Vec<&FileRecord> = state.files.values().filter(|f| filter.matches(f)).collect();
        let items = matching
            .iter()
            .skip(filter.offset() as usize)
            .take(filter.page_size() as usize)
            .map(|f| (*f).clone())
            .collect();

        Ok(FilePage {
            items,
            page: filter.page(),
            page_size: filter.page_size(),
            total: matching.len() as u64,
        })
    }

    async fn apply_assignments(&self, batch: &[FileAssignmentUpdate]) -> Result<(), String> {
        let mut state = self.state.write();
        let batch_number = state.batch_sizes.len();
        state.batch_sizes.push(batch.len());

        if state
            .fail_writes_from_batch
            .is_some_and(|n| batch_number >= n)
        {
            return Err(format!("batch {} rejected by store", batch_number));
        }

        // All-or-nothing per batch
        if let Some(missing) = batch.iter().find(|u| !state.files.contains_key(&u.file_id)) {
            return Err(format!("File not found: {}", missing.file_id));
        }
        for update in batch {
            if let Some(file) = state.files.get_mut(&update.file_id) {
                file.apply(update);
            }
        }

        Ok(())
    }
}

#[async_trait]
impl AuditLogRepository for InMemoryStore {
    async fn append(&self, entry: AuditEntry) -> Result<(), String> {
        let mut state = self.state.write();
        if state.audit_unavailable {
            return Err("audit log unavailable".to_string());
        }
        state.audit.push(entry);
        Ok(())
    }
}
