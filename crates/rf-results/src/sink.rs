//! Output sink that persists snapshots and checkpoints into a run directory.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use rf_sim::{OutputSink, SimError, SimResult, SnapshotInfo};
use serde::Serialize;

use crate::ResultsResult;
use crate::store::{CHECKPOINT_FILE, SNAPSHOTS_FILE, write_json};
use crate::types::{CheckpointRecord, SnapshotRecord};

/// Appends each snapshot to `snapshots.jsonl` and replaces `checkpoint.json`.
pub struct StoreSink<S> {
    run_dir: PathBuf,
    snapshots: BufWriter<File>,
    written: usize,
    _state: PhantomData<fn(&S)>,
}

impl<S> StoreSink<S> {
    pub fn open(run_dir: &Path) -> ResultsResult<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(run_dir.join(SNAPSHOTS_FILE))?;
        Ok(Self {
            run_dir: run_dir.to_path_buf(),
            snapshots: BufWriter::new(file),
            written: 0,
            _state: PhantomData,
        })
    }

    pub fn snapshots_written(&self) -> usize {
        self.written
    }

    pub fn checkpoint_path(&self) -> PathBuf {
        self.run_dir.join(CHECKPOINT_FILE)
    }
}

fn output_error(e: impl std::fmt::Display) -> SimError {
    SimError::Output {
        message: e.to_string(),
    }
}

impl<S: Serialize + Clone> OutputSink<S> for StoreSink<S> {
    fn write_snapshot(&mut self, state: &S, info: &SnapshotInfo) -> SimResult<()> {
        let record = SnapshotRecord::new(state, info);
        serde_json::to_writer(&mut self.snapshots, &record).map_err(output_error)?;
        self.snapshots.write_all(b"\n")?;
        self.snapshots.flush()?;

        let checkpoint = CheckpointRecord::new(state, info);
        write_json(&self.checkpoint_path(), &checkpoint).map_err(output_error)?;

        self.written += 1;
        tracing::trace!(report_step = info.report_step, "snapshot written");
        Ok(())
    }
}
