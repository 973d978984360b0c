//! The `Job` boundary record (§3) and its storage abstraction (§4.11).
//!
//! Grounded in the corpus's generation-plan state machine: a tagged phase enum, a content
//! hash recorded on every transition (useful for idempotent resume/debugging), and
//! timestamped transitions. The store itself follows the corpus's on-disk `.rpg/` convention,
//! generalized into a key-value document collection behind a trait so the HTTP façade never
//! knows which backend is live.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Queued,
    Proposal,
    Implementation,
    Codegen,
    Done,
}

/// The final outcome object described in §7: always present once a job reaches a terminal
/// status, partial on recoverable failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JobResult {
    pub generated_files: Vec<String>,
    pub failed_files: Vec<String>,
    pub test_results: TestSummary,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TestSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub success_rate: f64,
    pub generated_lines: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub status: JobStatus,
    pub progress: u8,
    pub current_stage: Stage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub project_goal: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// SHA-256 of the job's own serialized state at the last transition, not the RPG
    /// content; lets a caller detect whether a polled row actually changed.
    pub revision: String,
}

impl Job {
    #[must_use]
    pub fn new(id: impl Into<String>, project_goal: impl Into<String>) -> Self {
        let now = Utc::now();
        let mut job = Self {
            id: id.into(),
            status: JobStatus::Pending,
            progress: 0,
            current_stage: Stage::Queued,
            result: None,
            error: None,
            project_goal: project_goal.into(),
            created_at: now,
            updated_at: now,
            revision: String::new(),
        };
        job.touch();
        job
    }

    pub fn start_stage(&mut self, stage: Stage, progress: u8) {
        self.status = JobStatus::Running;
        self.current_stage = stage;
        self.progress = progress;
        self.touch();
    }

    pub fn complete(&mut self, result: JobResult) {
        self.status = JobStatus::Completed;
        self.current_stage = Stage::Done;
        self.progress = 100;
        self.result = Some(result);
        self.touch();
    }

    pub fn fail(&mut self, error: impl Into<String>) {
        self.status = JobStatus::Failed;
        self.error = Some(error.into());
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
        self.revision = self.compute_revision();
    }

    fn compute_revision(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        hasher.update(format!("{:?}", self.status).as_bytes());
        hasher.update([self.progress]);
        hasher.update(format!("{:?}", self.current_stage).as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

/// Key-value document collection over jobs, satisfying the four operations in §6.
pub trait JobStore: Send + Sync {
    fn insert_one(&self, job: Job);
    fn find_one(&self, id: &str) -> Option<Job>;
    fn update_one(&self, job: Job);
    /// Most recently created first, then skip/limit applied.
    fn find_sorted(&self, limit: usize, skip: usize) -> Vec<Job>;
}

/// In-process fallback store: a mutex-guarded map ordered by creation time.
#[derive(Default)]
pub struct InProcessJobStore {
    jobs: Mutex<BTreeMap<String, Job>>,
}

impl InProcessJobStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl JobStore for InProcessJobStore {
    fn insert_one(&self, job: Job) {
        self.jobs.lock().expect("lock poisoned").insert(job.id.clone(), job);
    }

    fn find_one(&self, id: &str) -> Option<Job> {
        self.jobs.lock().expect("lock poisoned").get(id).cloned()
    }

    fn update_one(&self, job: Job) {
        self.jobs.lock().expect("lock poisoned").insert(job.id.clone(), job);
    }

    fn find_sorted(&self, limit: usize, skip: usize) -> Vec<Job> {
        let jobs = self.jobs.lock().expect("lock poisoned");
        let mut all: Vec<Job> = jobs.values().cloned().collect();
        all.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        all.into_iter().skip(skip).take(limit).collect()
    }
}

/// File-backed store: one JSON file per job under a configured directory, matching the
/// `.rpg/` on-disk convention used for the graph itself.
pub struct FileJobStore {
    directory: std::path::PathBuf,
}

impl FileJobStore {
    pub fn new(directory: impl Into<std::path::PathBuf>) -> std::io::Result<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self { directory })
    }

    fn path_for(&self, id: &str) -> std::path::PathBuf {
        self.directory.join(format!("{id}.json"))
    }
}

impl JobStore for FileJobStore {
    fn insert_one(&self, job: Job) {
        self.update_one(job);
    }

    fn find_one(&self, id: &str) -> Option<Job> {
        let content = std::fs::read_to_string(self.path_for(id)).ok()?;
        serde_json::from_str(&content).ok()
    }

    fn update_one(&self, job: Job) {
        if let Ok(content) = serde_json::to_string_pretty(&job) {
            let _ = std::fs::write(self.path_for(&job.id), content);
        }
    }

    fn find_sorted(&self, limit: usize, skip: usize) -> Vec<Job> {
        let Ok(entries) = std::fs::read_dir(&self.directory) else {
            return Vec::new();
        };
        let mut all: Vec<Job> = entries
            .filter_map(Result::ok)
            .filter_map(|e| std::fs::read_to_string(e.path()).ok())
            .filter_map(|content| serde_json::from_str(&content).ok())
            .collect();
        all.sort_by(|a: &Job, b: &Job| b.created_at.cmp(&a.created_at));
        all.into_iter().skip(skip).take(limit).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_process_store_round_trips() {
        let store = InProcessJobStore::new();
        let job = Job::new("job-1", "build a calculator");
        store.insert_one(job.clone());
        let found = store.find_one("job-1").unwrap();
        assert_eq!(found.status, JobStatus::Pending);
    }

    #[test]
    fn file_store_round_trips_with_sorted_listing() {
        let tmp = tempfile::tempdir().unwrap();
        let store = FileJobStore::new(tmp.path()).unwrap();
        let mut job1 = Job::new("job-1", "goal one");
        store.insert_one(job1.clone());
        let job2 = Job::new("job-2", "goal two");
        store.insert_one(job2.clone());

        job1.complete(JobResult::default());
        store.update_one(job1);

        let found = store.find_one("job-1").unwrap();
        assert_eq!(found.status, JobStatus::Completed);

        let listed = store.find_sorted(10, 0);
        assert_eq!(listed.len(), 2);
    }

    #[test]
    fn revision_changes_on_transition() {
        let mut job = Job::new("job-1", "goal");
        let rev1 = job.revision.clone();
        job.start_stage(Stage::Proposal, 10);
        assert_ne!(rev1, job.revision);
    }
}
