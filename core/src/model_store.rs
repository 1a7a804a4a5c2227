//! File-based persistence for trained models and their scalers.
//!
//! RULE: only model_store.rs touches the models directory.
//!
//! Layout (one file per artifact, independently addressable):
//!   churn_model.json   churn_scaler.json
//!   cltv_model.json    cltv_scaler.json
//!
//! A missing file leaves its slot empty, and so does one that fails to
//! parse or validate. A kind counts as trained only when both its model
//! and its scaler are present and the scaler carries the model's id.
//! A model/scaler pair is staged as two `.tmp` files and renamed into
//! place only once both are written.
//!
//! Single-writer: callers serialize training per kind (see service.rs).

use crate::{
    error::{AnalyticsError, AnalyticsResult},
    forest::{ForestTask, RandomForest},
    scaler::StandardScaler,
    types::ModelKind,
};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::{
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationMetric {
    Accuracy(f64),
    Mse(f64),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub artifact_id:      Uuid,
    pub kind:             ModelKind,
    pub trained_at:       DateTime<Utc>,
    pub feature_names:    Vec<String>,
    pub label_strategy:   String,
    pub training_samples: usize,
    pub test_samples:     usize,
    pub metric:           EvaluationMetric,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub metadata: ArtifactMetadata,
    pub forest:   RandomForest,
}

#[derive(Debug, Clone, Default)]
pub struct ModelSlot {
    pub model:  Option<Arc<ModelArtifact>>,
    pub scaler: Option<Arc<StandardScaler>>,
}

impl ModelSlot {
    /// Both halves, or None if either is missing or they were not fit together.
    pub fn trained(&self) -> Option<(Arc<ModelArtifact>, Arc<StandardScaler>)> {
        match (&self.model, &self.scaler) {
            (Some(m), Some(s)) if s.model_id == Some(m.metadata.artifact_id) => {
                Some((Arc::clone(m), Arc::clone(s)))
            }
            (Some(m), Some(s)) => {
                log::warn!(
                    "{} scaler belongs to model {:?}, not {}",
                    m.metadata.kind.name(),
                    s.model_id,
                    m.metadata.artifact_id
                );
                None
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelStore {
    dir:   PathBuf,
    churn: ModelSlot,
    cltv:  ModelSlot,
}

impl ModelStore {
    /// A store with no artifacts loaded. Nothing is read or created.
    pub fn empty(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir:   dir.into(),
            churn: ModelSlot::default(),
            cltv:  ModelSlot::default(),
        }
    }

    /// Create the directory if needed and restore whatever artifacts exist.
    /// An unreadable artifact is logged and left empty.
    pub fn load(dir: impl Into<PathBuf>) -> AnalyticsResult<Self> {
        let mut store = Self::empty(dir);
        fs::create_dir_all(&store.dir)?;
        for kind in ModelKind::ALL {
            let slot = ModelSlot {
                model:  store
                    .restore(&kind.model_file(), |m: &ModelArtifact| m.validate(kind))
                    .map(Arc::new),
                scaler: store
                    .restore(&kind.scaler_file(), StandardScaler::validate)
                    .map(Arc::new),
            };
            *store.slot_mut(kind) = slot;
        }
        Ok(store)
    }

    /// Persist whichever artifacts are present. Partial saves are fine.
    pub fn save(&self) -> AnalyticsResult<()> {
        fs::create_dir_all(&self.dir)?;
        for kind in ModelKind::ALL {
            let slot = self.slot(kind);
            match (&slot.model, &slot.scaler) {
                (Some(model), Some(scaler)) => self.commit_pair(kind, model, scaler)?,
                (Some(model), None) => self.commit(&[self.stage(&kind.model_file(), model.as_ref())?])?,
                (None, Some(scaler)) => self.commit(&[self.stage(&kind.scaler_file(), scaler.as_ref())?])?,
                (None, None) => {}
            }
        }
        log::info!("model store saved to {}", self.dir.display());
        Ok(())
    }

    /// Write one kind's artifacts to disk without touching the loaded slots.
    pub fn persist(
        &self,
        kind: ModelKind,
        artifact: &ModelArtifact,
        scaler: &StandardScaler,
    ) -> AnalyticsResult<()> {
        fs::create_dir_all(&self.dir)?;
        self.commit_pair(kind, artifact, scaler)?;
        log::info!(
            "{} model {} saved to {}",
            kind.name(),
            artifact.metadata.artifact_id,
            self.dir.display()
        );
        Ok(())
    }

    /// Replace one kind's in-memory artifacts wholesale.
    pub fn install(&mut self, kind: ModelKind, artifact: ModelArtifact, scaler: StandardScaler) {
        *self.slot_mut(kind) = ModelSlot {
            model:  Some(Arc::new(artifact)),
            scaler: Some(Arc::new(scaler)),
        };
    }

    pub fn slot(&self, kind: ModelKind) -> &ModelSlot {
        match kind {
            ModelKind::Churn => &self.churn,
            ModelKind::Cltv  => &self.cltv,
        }
    }

    fn slot_mut(&mut self, kind: ModelKind) -> &mut ModelSlot {
        match kind {
            ModelKind::Churn => &mut self.churn,
            ModelKind::Cltv  => &mut self.cltv,
        }
    }

    pub fn trained(&self, kind: ModelKind) -> Option<(Arc<ModelArtifact>, Arc<StandardScaler>)> {
        self.slot(kind).trained()
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn restore<T, V>(&self, file: &str, validate: V) -> Option<T>
    where
        T: DeserializeOwned,
        V: FnOnce(&T) -> AnalyticsResult<()>,
    {
        let path = self.dir.join(file);
        match read_json::<T>(&path).and_then(|v| match v {
            Some(value) => validate(&value).map(|_| Some(value)),
            None => Ok(None),
        }) {
            Ok(Some(value)) => {
                log::info!("restored {}", path.display());
                Some(value)
            }
            Ok(None) => {
                log::debug!("no artifact at {}", path.display());
                None
            }
            Err(e) => {
                log::error!("cannot restore {}: {e}", path.display());
                None
            }
        }
    }

    // ── Staged writes ──────────────────────────────────────────

    /// Write both halves of a kind, renaming only after both temp files exist.
    fn commit_pair(
        &self,
        kind: ModelKind,
        artifact: &ModelArtifact,
        scaler: &StandardScaler,
    ) -> AnalyticsResult<()> {
        let scaler_tmp = self.stage(&kind.scaler_file(), scaler)?;
        let model_tmp = match self.stage(&kind.model_file(), artifact) {
            Ok(staged) => staged,
            Err(e) => {
                discard(&[scaler_tmp]);
                return Err(e);
            }
        };
        self.commit(&[scaler_tmp, model_tmp])
    }

    /// Serialize `value` to `<file>.tmp`. Returns (tmp, final) paths.
    fn stage<T: Serialize>(&self, file: &str, value: &T) -> AnalyticsResult<(PathBuf, PathBuf)> {
        let path = self.dir.join(file);
        let tmp = self.dir.join(format!("{file}.tmp"));
        let bytes = serde_json::to_vec(value)?;
        if let Err(e) = fs::write(&tmp, bytes) {
            if tmp.is_file() {
                let _ = fs::remove_file(&tmp);
            }
            return Err(e.into());
        }
        Ok((tmp, path))
    }

    fn commit(&self, staged: &[(PathBuf, PathBuf)]) -> AnalyticsResult<()> {
        for (i, (tmp, path)) in staged.iter().enumerate() {
            if let Err(e) = fs::rename(tmp, path) {
                discard(&staged[i..]);
                return Err(e.into());
            }
            log::debug!("wrote {}", path.display());
        }
        Ok(())
    }
}

impl ModelArtifact {
    /// The artifact must be a well-formed forest of the task `kind` expects.
    pub fn validate(&self, kind: ModelKind) -> AnalyticsResult<()> {
        let expected = match kind {
            ModelKind::Churn => ForestTask::Classification,
            ModelKind::Cltv  => ForestTask::Regression,
        };
        if self.metadata.kind != kind || self.forest.task != expected {
            return Err(AnalyticsError::Fit(format!(
                "artifact {} is a {} {:?} model, expected {}",
                self.metadata.artifact_id,
                self.metadata.kind.name(),
                self.forest.task,
                kind.name()
            )));
        }
        self.forest.validate()
    }
}

fn discard(staged: &[(PathBuf, PathBuf)]) {
    for (tmp, _) in staged {
        if tmp.is_file() {
            if let Err(e) = fs::remove_file(tmp) {
                log::warn!("cannot remove {}: {e}", tmp.display());
            }
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> AnalyticsResult<Option<T>> {
    match fs::read(path) {
        Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}
