//! Run storage API.
//!
//! Layout per run: `manifest.json`, `snapshots.jsonl` (one line per report
//! step), `checkpoint.json` (latest report step only) and `summary.json`.

use crate::types::{CheckpointRecord, RunManifest, RunSummary, SnapshotRecord};
use crate::{ResultsError, ResultsResult};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};

pub const MANIFEST_FILE: &str = "manifest.json";
pub const SNAPSHOTS_FILE: &str = "snapshots.jsonl";
pub const CHECKPOINT_FILE: &str = "checkpoint.json";
pub const SUMMARY_FILE: &str = "summary.json";

#[derive(Clone, Debug)]
pub struct RunStore {
    root_dir: PathBuf,
}

impl RunStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store next to a case file, under `.resflow/runs`.
    pub fn for_case(case_path: &Path) -> ResultsResult<Self> {
        let case_dir = case_path
            .parent()
            .ok_or_else(|| ResultsError::InvalidPath {
                message: "case path has no parent directory".to_string(),
            })?;
        Self::new(case_dir.join(".resflow").join("runs"))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn run_dir(&self, run_id: &str) -> PathBuf {
        self.root_dir.join(run_id)
    }

    /// A run counts as stored once it has both a manifest and a summary.
    pub fn has_run(&self, run_id: &str) -> bool {
        let dir = self.run_dir(run_id);
        dir.join(MANIFEST_FILE).exists() && dir.join(SUMMARY_FILE).exists()
    }

    /// Create (or reset) the run directory and write its manifest.
    pub fn begin_run(&self, manifest: &RunManifest) -> ResultsResult<PathBuf> {
        let run_dir = self.run_dir(&manifest.run_id);
        if run_dir.exists() {
            fs::remove_dir_all(&run_dir)?;
        }
        fs::create_dir_all(&run_dir)?;
        write_json(&run_dir.join(MANIFEST_FILE), manifest)?;
        Ok(run_dir)
    }

    pub fn save_summary(&self, run_id: &str, summary: &RunSummary) -> ResultsResult<()> {
        write_json(&self.existing_run_dir(run_id)?.join(SUMMARY_FILE), summary)
    }

    pub fn load_manifest(&self, run_id: &str) -> ResultsResult<RunManifest> {
        read_json(&self.existing_run_dir(run_id)?.join(MANIFEST_FILE), run_id)
    }

    pub fn load_summary(&self, run_id: &str) -> ResultsResult<RunSummary> {
        read_json(&self.existing_run_dir(run_id)?.join(SUMMARY_FILE), run_id)
    }

    pub fn load_checkpoint<S: DeserializeOwned>(
        &self,
        run_id: &str,
    ) -> ResultsResult<CheckpointRecord<S>> {
        read_json(&self.existing_run_dir(run_id)?.join(CHECKPOINT_FILE), run_id)
    }

    pub fn load_snapshots<S: DeserializeOwned>(
        &self,
        run_id: &str,
    ) -> ResultsResult<Vec<SnapshotRecord<S>>> {
        let path = self.existing_run_dir(run_id)?.join(SNAPSHOTS_FILE);
        if !path.exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }

        let content = fs::read_to_string(path)?;
        let mut records = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                records.push(serde_json::from_str(line)?);
            }
        }
        Ok(records)
    }

    /// Manifests of all stored runs, optionally restricted to one case name.
    pub fn list_runs(&self, case_name: Option<&str>) -> ResultsResult<Vec<RunManifest>> {
        let mut runs = Vec::new();

        if !self.root_dir.exists() {
            return Ok(runs);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let run_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&run_id)
                    && case_name.is_none_or(|name| manifest.case_name == name)
                {
                    runs.push(manifest);
                }
            }
        }

        runs.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));
        Ok(runs)
    }

    pub fn delete_run(&self, run_id: &str) -> ResultsResult<()> {
        let run_dir = self.run_dir(run_id);
        if run_dir.exists() {
            fs::remove_dir_all(run_dir)?;
        }
        Ok(())
    }

    fn existing_run_dir(&self, run_id: &str) -> ResultsResult<PathBuf> {
        let dir = self.run_dir(run_id);
        if !dir.join(MANIFEST_FILE).exists() {
            return Err(ResultsError::RunNotFound {
                run_id: run_id.to_string(),
            });
        }
        Ok(dir)
    }
}

/// Read a checkpoint written by any run, e.g. one passed on the command line.
pub fn load_checkpoint_file<S: DeserializeOwned>(path: &Path) -> ResultsResult<CheckpointRecord<S>> {
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// Write through a temporary file so readers never see a partial document.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> ResultsResult<()> {
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, serde_json::to_string_pretty(value)?)?;
    fs::rename(tmp, path)?;
    Ok(())
}

fn read_json<T: DeserializeOwned>(path: &Path, run_id: &str) -> ResultsResult<T> {
    if !path.exists() {
        return Err(ResultsError::RunNotFound {
            run_id: run_id.to_string(),
        });
    }
    let content = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}
