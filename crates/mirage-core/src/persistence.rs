//! Expectation file persistence and initialization loading.

use crate::expectation::{
    Expectation, ExpectationDefinition, ExpectationListener, MutationCause, StoreSnapshot,
};
use anyhow::Context;
use parking_lot::Mutex;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

/// Rewrites a JSON file with the active expectations after every store mutation.
///
/// Snapshots older than the last one written are skipped, so the file always
/// ends up holding the newest store state.
pub struct ExpectationFileSystemPersistence {
    path: PathBuf,
    last_revision: Mutex<Option<u64>>,
}

impl ExpectationFileSystemPersistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            last_revision: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the number of expectations written, `None` when the snapshot was stale.
    fn write(&self, snapshot: &StoreSnapshot) -> anyhow::Result<Option<usize>> {
        let mut last_revision = self.last_revision.lock();
        if last_revision.is_some_and(|last| last >= snapshot.revision) {
            return Ok(None);
        }
        let active: Vec<&Expectation> = snapshot.active().map(|e| e.as_ref()).collect();
        let json = serde_json::to_string_pretty(&active).context("failed to serialize expectations")?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        *last_revision = Some(snapshot.revision);
        Ok(Some(active.len()))
    }
}

impl ExpectationListener for ExpectationFileSystemPersistence {
    fn updated(&self, snapshot: &StoreSnapshot, cause: MutationCause) {
        match self.write(snapshot) {
            Ok(Some(count)) => debug!(
                "Persisted {} expectations to {:?} after {} update",
                count, self.path, cause
            ),
            Ok(None) => debug!(
                "Skipped stale snapshot {} for {:?}",
                snapshot.revision, self.path
            ),
            Err(e) => error!("Failed to persist expectations: {:#}", e),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Definitions {
    Many(Vec<ExpectationDefinition>),
    One(Box<ExpectationDefinition>),
}

/// Parse a JSON array, or a single object, of expectation definitions.
pub fn parse_expectations(json: &str) -> anyhow::Result<Vec<Expectation>> {
    let definitions = match serde_json::from_str::<Definitions>(json)
        .context("invalid expectation initialization JSON")?
    {
        Definitions::Many(definitions) => definitions,
        Definitions::One(definition) => vec![*definition],
    };
    definitions
        .into_iter()
        .enumerate()
        .map(|(index, definition)| {
            Expectation::from_definition(definition)
                .with_context(|| format!("invalid expectation at index {}", index))
        })
        .collect()
}

pub fn load_initialization_file(path: &Path) -> anyhow::Result<Vec<Expectation>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read initialization file {}", path.display()))?;
    let expectations = parse_expectations(&json)?;
    info!("Loaded {} expectations from {:?}", expectations.len(), path);
    Ok(expectations)
}
