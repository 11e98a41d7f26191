//! Artifact slots shared by the fitter and the presenter
//!
//! Each slot is a JSON document wrapping its payload in a small envelope
//! (`format_version`, `kind`, `trained_at`) so a reader can tell a missing
//! file from a damaged one or from one written by an incompatible build.

use crate::data::StandardScaler;
use crate::model::ClusterModel;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Envelope version written by this build
pub const FORMAT_VERSION: u32 = 1;

/// The two persistent slots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Scaler,
    Model,
}

impl Slot {
    pub fn kind(&self) -> &'static str {
        match self {
            Slot::Scaler => "scaler",
            Slot::Model => "model",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            Slot::Scaler => "scaler.json",
            Slot::Model => "model.json",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// Why an artifact slot could not be loaded
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("{slot} artifact not found at {}", .path.display())]
    Missing { slot: Slot, path: PathBuf },

    #[error("{slot} artifact at {} is corrupt: {reason}", .path.display())]
    Corrupt {
        slot: Slot,
        path: PathBuf,
        reason: String,
    },

    #[error("{slot} artifact has format version {found}, expected {expected}")]
    VersionMismatch {
        slot: Slot,
        found: u32,
        expected: u32,
    },

    #[error("{slot} slot holds a `{found}` artifact")]
    WrongKind { slot: Slot, found: String },
}

impl AssetError {
    pub fn slot(&self) -> Slot {
        match self {
            AssetError::Missing { slot, .. }
            | AssetError::Corrupt { slot, .. }
            | AssetError::VersionMismatch { slot, .. }
            | AssetError::WrongKind { slot, .. } => *slot,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    format_version: u32,
    kind: String,
    trained_at: DateTime<Utc>,
    payload: T,
}

/// Only the fields needed to validate a document before decoding its payload
#[derive(Debug, Deserialize)]
struct EnvelopeHeader {
    format_version: u32,
    kind: String,
}

/// Both artifacts as read back from disk
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedArtifacts {
    pub scaler: StandardScaler,
    pub model: ClusterModel,
    pub trained_at: DateTime<Utc>,
}

/// Directory holding the two slot files
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, slot: Slot) -> PathBuf {
        self.dir.join(slot.file_name())
    }

    /// Write both slots, replacing whatever they held before
    pub fn save(
        &self,
        scaler: &StandardScaler,
        model: &ClusterModel,
        trained_at: DateTime<Utc>,
    ) -> crate::Result<()> {
        fs::create_dir_all(&self.dir)?;
        self.write_slot(Slot::Scaler, scaler, trained_at)?;
        self.write_slot(Slot::Model, model, trained_at)?;
        Ok(())
    }

    fn write_slot<T: Serialize>(
        &self,
        slot: Slot,
        payload: &T,
        trained_at: DateTime<Utc>,
    ) -> crate::Result<()> {
        let envelope = Envelope {
            format_version: FORMAT_VERSION,
            kind: slot.kind().to_string(),
            trained_at,
            payload,
        };
        let path = self.path(slot);
        let json = serde_json::to_string_pretty(&envelope)?;
        fs::write(&path, json)
            .map_err(|e| anyhow::anyhow!("Failed to write {}: {}", path.display(), e))?;
        log::debug!("Wrote {} artifact to {}", slot, path.display());
        Ok(())
    }

    pub fn load_scaler(&self) -> Result<StandardScaler, AssetError> {
        self.read_slot(Slot::Scaler).map(|(scaler, _)| scaler)
    }

    pub fn load_model(&self) -> Result<ClusterModel, AssetError> {
        self.read_slot(Slot::Model).map(|(model, _)| model)
    }

    /// Load both slots; the first failing slot decides the error
    pub fn load(&self) -> Result<LoadedArtifacts, AssetError> {
        let (scaler, trained_at) = self.read_slot::<StandardScaler>(Slot::Scaler)?;
        let (model, _) = self.read_slot::<ClusterModel>(Slot::Model)?;
        Ok(LoadedArtifacts {
            scaler,
            model,
            trained_at,
        })
    }

    fn read_slot<T: DeserializeOwned>(
        &self,
        slot: Slot,
    ) -> Result<(T, DateTime<Utc>), AssetError> {
        let path = self.path(slot);
        let corrupt = |reason: String| AssetError::Corrupt {
            slot,
            path: path.clone(),
            reason,
        };

        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(AssetError::Missing {
                    slot,
                    path: path.clone(),
                })
            }
            Err(e) => return Err(corrupt(e.to_string())),
        };

        let header: EnvelopeHeader =
            serde_json::from_str(&text).map_err(|e| corrupt(e.to_string()))?;
        if header.format_version != FORMAT_VERSION {
            return Err(AssetError::VersionMismatch {
                slot,
                found: header.format_version,
                expected: FORMAT_VERSION,
            });
        }
        if header.kind != slot.kind() {
            return Err(AssetError::WrongKind {
                slot,
                found: header.kind,
            });
        }

        let envelope: Envelope<T> =
            serde_json::from_str(&text).map_err(|e| corrupt(e.to_string()))?;
        log::debug!("Loaded {} artifact from {}", slot, path.display());
        Ok((envelope.payload, envelope.trained_at))
    }
}
