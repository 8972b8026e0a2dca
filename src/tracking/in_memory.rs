//! In-memory sink for testing and single-process scenarios.

use std::sync::{Arc, Mutex};

use super::{Interaction, InteractionKind, TrackError, TrackingSink};

/// Records every interaction in an append-only log.
///
/// Clone-friendly: clones share the same log.
#[derive(Clone)]
pub struct InMemorySink {
    name: String,
    log: Arc<Mutex<Vec<Interaction>>>,
}

impl InMemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn interactions(&self) -> Vec<Interaction> {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Kinds in the order they were recorded.
    pub fn kinds(&self) -> Vec<InteractionKind> {
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|i| i.kind)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&self) {
        self.log.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl TrackingSink for InMemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    fn record(&self, interaction: &Interaction) -> Result<(), TrackError> {
        self.log
            .lock()
            .map_err(|_| TrackError::BufferPoisoned)?
            .push(interaction.clone());
        Ok(())
    }
}
