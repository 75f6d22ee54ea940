use std::io::ErrorKind;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum JournalError {
    #[error("score journal io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("score journal at {path} is not a JSON array of numbers: {source}")]
    Format {
        path: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Raw score history checkpoint: a JSON array of numbers, rewritten in
/// full on every save.
#[derive(Debug, Clone)]
pub struct ScoreJournal {
    path: PathBuf,
}

impl ScoreJournal {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the saved history, or an empty one if nothing was saved yet.
    pub fn load(&self) -> Result<Vec<f64>, JournalError> {
        let raw = match std::fs::read(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(self.io_error(source)),
        };
        serde_json::from_slice(&raw).map_err(|source| JournalError::Format {
            path: self.path.display().to_string(),
            source,
        })
    }

    pub fn save(&self, history: &[f64]) -> Result<(), JournalError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
        }
        let body = serde_json::to_vec(history).map_err(|source| JournalError::Format {
            path: self.path.display().to_string(),
            source,
        })?;
        std::fs::write(&self.path, body).map_err(|e| self.io_error(e))?;
        tracing::debug!(path = %self.path.display(), scores = history.len(), "Score journal saved");
        Ok(())
    }

    fn io_error(&self, source: std::io::Error) -> JournalError {
        JournalError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}
