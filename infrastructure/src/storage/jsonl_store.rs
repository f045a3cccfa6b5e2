//! JSONL file writer for finished ensemble runs.
//!
//! Each [`RunResult`] is serialized as a single JSON line carrying a
//! `timestamp`, appended to the file via a buffered writer. Existing content
//! is preserved across restarts.

use ensemble_application::ResultStore;
use ensemble_domain::RunResult;
use serde::Serialize;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// One stored line.
#[derive(Serialize)]
struct StoredRun<'a> {
    timestamp: String,
    #[serde(flatten)]
    result: &'a RunResult,
}

/// JSONL result store that writes one JSON object per finished run.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes after every record and
/// on `Drop`.
pub struct JsonlResultStore {
    writer: Mutex<BufWriter<File>>,
    path: PathBuf,
}

impl JsonlResultStore {
    /// Open (or create) the store at `path`.
    ///
    /// Creates parent directories as needed. Returns `None` if the file
    /// cannot be opened.
    pub fn open(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create results directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open results file {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the results file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl ResultStore for JsonlResultStore {
    fn store(&self, result: &RunResult) {
        let record = StoredRun {
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            result,
        };

        let line = match serde_json::to_string(&record) {
            Ok(line) => line,
            Err(e) => {
                warn!("Could not serialize run result: {}", e);
                return;
            }
        };

        if let Ok(mut writer) = self.writer.lock() {
            if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
                warn!("Could not write to {}: {}", self.path.display(), e);
            }
        }
    }
}

impl Drop for JsonlResultStore {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ensemble_domain::{AgreementScore, BranchTexts, ModelConfiguration, ProviderKind};

    fn sample(consensus: &str) -> RunResult {
        let mut texts = BranchTexts::new();
        texts.insert("a", "Paris.");
        texts.insert("b", "Error: timed out");
        RunResult {
            consensus_response: consensus.to_string(),
            agreement_scores: vec![AgreementScore {
                id_a: "a".to_string(),
                id_b: "b".to_string(),
                score: 0.5,
            }],
            individual_responses: texts,
            configurations: vec![ModelConfiguration::new(
                "a",
                "GPT",
                ProviderKind::OpenAi,
                "gpt-4o",
            )],
        }
    }

    #[test]
    fn test_writes_one_line_per_run() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("runs").join("results.jsonl");
        let store = JsonlResultStore::open(&path).unwrap();

        store.store(&sample("first"));
        store.store(&sample("second"));
        drop(store);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.trim().lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert!(first.get("timestamp").is_some());
        assert_eq!(first["consensusResponse"], "first");
        assert_eq!(first["individualResponses"]["a"], "Paris.");
        assert_eq!(first["agreementScores"][0]["idA"], "a");
    }

    #[test]
    fn test_reopen_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.jsonl");

        JsonlResultStore::open(&path).unwrap().store(&sample("one"));
        JsonlResultStore::open(&path).unwrap().store(&sample("two"));

        let content = std::fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }

    #[test]
    fn test_open_fails_for_directory_path() {
        let dir = tempfile::tempdir().unwrap();
        assert!(JsonlResultStore::open(dir.path()).is_none());
    }
}
