// ============================================================
// Layer 6 - Local Experiment Run Tracker
// ============================================================
// Implements ExperimentTracker by writing a self-contained run
// directory. Nothing is sent over the network.
//
//   <save_dir>/<project>/run-<YYYYmmdd_HHMMSS>-<id>/
//     hparams.json     ← hyperparameters and run config
//     scalars.jsonl    ← one JSON object per log_scalars call
//     watch.jsonl      ← parameter / gradient summaries
//     artifacts/       ← copies of logged checkpoints
//     artifacts.json   ← what was logged, at which step
//     code/<name>      ← program source snapshot
//     summary.json     ← last value of every scalar, on finish()
//
// The directory is created when the tracker is built and stays
// for the lifetime of the run.

use anyhow::{Context, Result};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::{
    collections::BTreeMap,
    fs::{self, File, OpenOptions},
    io::{BufWriter, Write},
    path::{Path, PathBuf},
};

use crate::domain::{traits::ExperimentTracker, watch::ParamSummary};

#[derive(Debug, Clone, Serialize)]
struct ArtifactEntry {
    name:   String,
    kind:   &'static str,
    path:   PathBuf,
    source: PathBuf,
    step:   usize,
}

pub struct LocalRunTracker {
    run_id:    String,
    run_dir:   PathBuf,
    scalars:   BufWriter<File>,
    watch:     BufWriter<File>,
    summary:   BTreeMap<String, f64>,
    artifacts: Vec<ArtifactEntry>,
}

fn open_append(path: &Path) -> Result<BufWriter<File>> {
    let f = OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("Cannot open '{}'", path.display()))?;
    Ok(BufWriter::new(f))
}

impl LocalRunTracker {
    /// Start a new run under `<save_dir>/<project>/`
    pub fn create(save_dir: impl AsRef<Path>, project: &str) -> Result<Self> {
        let stamp  = chrono::Local::now().format("%Y%m%d_%H%M%S");
        let short  = uuid::Uuid::new_v4().simple().to_string();
        let run_id = format!("run-{stamp}-{}", &short[..8]);
        let run_dir = save_dir.as_ref().join(project).join(&run_id);

        fs::create_dir_all(&run_dir)
            .with_context(|| format!("Cannot create run directory '{}'", run_dir.display()))?;

        let scalars = open_append(&run_dir.join("scalars.jsonl"))?;
        let watch   = open_append(&run_dir.join("watch.jsonl"))?;

        tracing::info!("Tracking run {} in '{}'", run_id, run_dir.display());
        Ok(Self {
            run_id,
            run_dir,
            scalars,
            watch,
            summary:   BTreeMap::new(),
            artifacts: Vec::new(),
        })
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    fn write_json(&self, name: &str, value: &impl Serialize) -> Result<()> {
        let path = self.run_dir.join(name);
        fs::write(&path, serde_json::to_string_pretty(value)?)
            .with_context(|| format!("Cannot write '{}'", path.display()))
    }
}

impl ExperimentTracker for LocalRunTracker {
    fn log_hyperparams(&mut self, params: &Value) -> Result<()> {
        self.write_json("hparams.json", params)
    }

    fn log_scalars(&mut self, step: usize, scalars: &[(&str, f64)]) -> Result<()> {
        let mut row = Map::new();
        row.insert("step".into(), json!(step));
        row.insert("timestamp".into(), json!(chrono::Utc::now().to_rfc3339()));
        for &(key, value) in scalars {
            row.insert(key.to_string(), json!(value));
            self.summary.insert(key.to_string(), value);
        }
        writeln!(self.scalars, "{}", Value::Object(row))?;
        Ok(())
    }

    fn log_watch(&mut self, step: usize, summaries: &[ParamSummary]) -> Result<()> {
        let row = json!({ "step": step, "tensors": summaries });
        writeln!(self.watch, "{row}")?;
        Ok(())
    }

    fn log_artifact(&mut self, name: &str, path: &Path, step: usize) -> Result<()> {
        let artifact_dir = self.run_dir.join("artifacts");
        fs::create_dir_all(&artifact_dir)?;

        let file_name = path
            .file_name()
            .with_context(|| format!("Artifact path '{}' has no file name", path.display()))?;
        let stored = artifact_dir.join(file_name);
        fs::copy(path, &stored)
            .with_context(|| format!("Cannot copy artifact '{}'", path.display()))?;

        self.artifacts.push(ArtifactEntry {
            name:   name.to_string(),
            kind:   "model",
            path:   stored,
            source: path.to_path_buf(),
            step,
        });
        self.write_json("artifacts.json", &self.artifacts)
    }

    fn save_code(&mut self, name: &str, contents: &str) -> Result<()> {
        let code_dir = self.run_dir.join("code");
        fs::create_dir_all(&code_dir)?;
        fs::write(code_dir.join(name), contents)
            .with_context(|| format!("Cannot save source '{name}'"))
    }

    fn finish(&mut self) -> Result<()> {
        self.scalars.flush()?;
        self.watch.flush()?;
        self.write_json("summary.json", &self.summary)?;
        tracing::info!("Run {} finished", self.run_id);
        Ok(())
    }
}

// ─── In-memory tracker for tests ──────────────────────────────────────────────
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct MemoryTracker {
    pub hparams:   Option<Value>,
    pub scalars:   Vec<(usize, String, f64)>,
    pub watches:   Vec<(usize, Vec<ParamSummary>)>,
    /// Name, contents at log time, step
    pub artifacts: Vec<(String, Vec<u8>, usize)>,
    pub finished:  bool,
}

#[cfg(test)]
impl MemoryTracker {
    pub fn values_of(&self, key: &str) -> Vec<(usize, f64)> {
        self.scalars
            .iter()
            .filter(|(_, k, _)| k == key)
            .map(|(step, _, v)| (*step, *v))
            .collect()
    }
}

#[cfg(test)]
impl ExperimentTracker for MemoryTracker {
    fn log_hyperparams(&mut self, params: &Value) -> Result<()> {
        self.hparams = Some(params.clone());
        Ok(())
    }

    fn log_scalars(&mut self, step: usize, scalars: &[(&str, f64)]) -> Result<()> {
        self.scalars.extend(scalars.iter().map(|&(k, v)| (step, k.to_string(), v)));
        Ok(())
    }

    fn log_watch(&mut self, step: usize, summaries: &[ParamSummary]) -> Result<()> {
        self.watches.push((step, summaries.to_vec()));
        Ok(())
    }

    fn log_artifact(&mut self, name: &str, path: &Path, step: usize) -> Result<()> {
        self.artifacts.push((name.to_string(), fs::read(path)?, step));
        Ok(())
    }

    fn save_code(&mut self, _name: &str, _contents: &str) -> Result<()> {
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished = true;
        Ok(())
    }
}
