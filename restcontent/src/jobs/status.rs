use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Pending,
    Done,
    Error,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, JobStatus::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "pending",
            JobStatus::Done => "done",
            JobStatus::Error => "error",
        }
    }
}

/// What a poller sees of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub status: JobStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_link: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub download_size: Option<u64>,
}

impl JobResult {
    pub fn pending() -> Self {
        Self {
            reason: None,
            status: JobStatus::Pending,
            download_link: None,
            download_size: None,
        }
    }

    pub fn done() -> Self {
        Self {
            status: JobStatus::Done,
            ..Self::pending()
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            status: JobStatus::Error,
            ..Self::pending()
        }
    }
}

/// Status written by the job's own task and read by pollers.
#[derive(Debug)]
pub struct StatusCell(Mutex<JobResult>);

impl StatusCell {
    pub fn new() -> Self {
        Self(Mutex::new(JobResult::pending()))
    }

    pub fn snapshot(&self) -> JobResult {
        self.0.lock().clone()
    }

    pub fn set(&self, result: JobResult) {
        *self.0.lock() = result;
    }

    pub fn fail(&self, reason: impl Into<String>) {
        self.set(JobResult::failed(reason));
    }

    pub fn is_terminal(&self) -> bool {
        self.0.lock().status.is_terminal()
    }
}

impl Default for StatusCell {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let pending = serde_json::to_value(JobResult::pending()).unwrap();
        assert_eq!(pending, serde_json::json!({"status": "pending"}));

        let done = JobResult {
            download_link: Some("http://h/media/restcontent_export_k.zip".into()),
            download_size: Some(42),
            ..JobResult::done()
        };
        let value = serde_json::to_value(&done).unwrap();
        assert_eq!(value["status"], "done");
        assert_eq!(value["downloadLink"], "http://h/media/restcontent_export_k.zip");
        assert_eq!(value["downloadSize"], 42);
        assert!(value.get("reason").is_none());

        let failed = serde_json::to_value(JobResult::failed("[pages] import boom")).unwrap();
        assert_eq!(failed["status"], "error");
        assert_eq!(failed["reason"], "[pages] import boom");
    }

    #[test]
    fn test_status_cell() {
        let cell = StatusCell::new();
        assert!(!cell.is_terminal());
        cell.fail("upload archive: disk full");
        let snap = cell.snapshot();
        assert_eq!(snap.status, JobStatus::Error);
        assert!(cell.is_terminal());
    }
}
