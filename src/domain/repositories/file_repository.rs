use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::cache::cache_key;
use crate::domain::file::{FileAssignmentUpdate, FileRecord, FileStatus};

/// Cache namespace for file listing pages
pub const FILES_CACHE_PREFIX: &str = "files";

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

/// Filters for the admin file listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct FileFilter {
    pub status: Option<FileStatus>,
    pub agent_id: Option<String>,
    pub owner_id: Option<String>,
    pub page: Option<u32>,
    pub page_size: Option<u32>,
}

impl FileFilter {
    /// 1-based page number
    pub fn page(&self) -> u32 {
        self.page.unwrap_or(1).max(1)
    }

    /// Page size clamped to `1..=MAX_PAGE_SIZE`
    pub fn page_size(&self) -> u32 {
        self.page_size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE)
    }

    /// Rows to skip for the current page
    pub fn offset(&self) -> u64 {
        u64::from(self.page() - 1) * u64::from(self.page_size())
    }

    /// True if a record passes the status/agent/owner filters
    pub fn matches(&self, file: &FileRecord) -> bool {
        self.status.map_or(true, |s| file.status == s)
            && self
                .agent_id
                .as_deref()
                .map_or(true, |a| file.assigned_agent_id.as_deref() == Some(a))
            && self
                .owner_id
                .as_deref()
                .map_or(true, |o| file.owner_id.as_deref() == Some(o))
    }

    /// Cache key for this listing, tagged so that filter positions never collide
    pub fn cache_key(&self) -> String {
        let status = self.status.map(|s| format!("status={}", s));
        let agent = self.agent_id.as_ref().map(|a| format!("agent={}", a));
        let owner = self.owner_id.as_ref().map(|o| format!("owner={}", o));
        let page = format!("page={}", self.page());
        let size = format!("size={}", self.page_size());

        cache_key(
            FILES_CACHE_PREFIX,
            &[
                status.as_deref(),
                agent.as_deref(),
                owner.as_deref(),
                Some(page.as_str()),
                Some(size.as_str()),
            ],
        )
    }
}

/// One page of the file listing
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilePage {
    pub items: Vec<FileRecord>,
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
}

/// Repository trait for the file collection
#[async_trait]
pub trait FileRepository: Send + Sync {
    /// Find every file; used to rebuild workload snapshots
    async fn find_all(&self) -> Result<Vec<FileRecord>, String>;

    /// Find paid files with no assignee, oldest first
    async fn find_unassigned(&self, limit: Option<usize>) -> Result<Vec<FileRecord>, String>;

    /// Find files by ID; unknown ids are simply absent from the result
    async fn find_by_ids(&self, ids: &[String]) -> Result<Vec<FileRecord>, String>;

    /// Filtered, paginated listing
    async fn list(&self, filter: &FileFilter) -> Result<FilePage, String>;

    /// Apply one batch of assignment updates atomically
    ///
    /// Callers keep batches within the store's per-batch write limit.
    async fn apply_assignments(&self, batch: &[FileAssignmentUpdate]) -> Result<(), String>;
}
