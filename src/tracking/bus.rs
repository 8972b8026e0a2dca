use std::sync::{Arc, RwLock};

use tracing::warn;

use super::{Interaction, TrackingSink};
use crate::error::ReconcileError;

/// Fan-out bus for interactions. Clone-friendly via `Arc`.
#[derive(Clone, Default)]
pub struct InteractionBus {
    sinks: Arc<RwLock<Vec<Arc<dyn TrackingSink>>>>,
}

impl InteractionBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink. A sink with the same name is replaced.
    pub fn add_sink(&self, sink: Arc<dyn TrackingSink>) {
        let mut sinks = self.sinks.write().unwrap_or_else(|e| e.into_inner());
        sinks.retain(|existing| existing.name() != sink.name());
        sinks.push(sink);
    }

    /// Remove a sink by name. Returns true if it was registered.
    pub fn remove_sink(&self, name: &str) -> bool {
        let mut sinks = self.sinks.write().unwrap_or_else(|e| e.into_inner());
        let before = sinks.len();
        sinks.retain(|sink| sink.name() != name);
        sinks.len() != before
    }

    pub fn sink_names(&self) -> Vec<String> {
        self.sinks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .map(|sink| sink.name().to_string())
            .collect()
    }

    /// Deliver to every sink. A failing sink does not stop delivery to the
    /// others; failures are logged and summarized in `TrackingFailed`.
    pub fn record(&self, interaction: &Interaction) -> Result<(), ReconcileError> {
        let sinks: Vec<Arc<dyn TrackingSink>> = self
            .sinks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone();

        let mut failed = Vec::new();
        for sink in sinks {
            if let Err(error) = sink.record(interaction) {
                warn!(
                    sink = sink.name(),
                    entity_id = %interaction.entity_id,
                    kind = ?interaction.kind,
                    %error,
                    "tracking sink failed"
                );
                failed.push(format!("{}: {}", sink.name(), error));
            }
        }

        if failed.is_empty() {
            Ok(())
        } else {
            Err(ReconcileError::TrackingFailed(failed.join("; ")))
        }
    }
}
