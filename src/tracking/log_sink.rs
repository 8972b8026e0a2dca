use std::sync::{Arc, Mutex};

use tracing::info;

use super::{Interaction, TrackError, TrackingSink};

/// A sink that logs interactions through `tracing`, or into a buffer.
pub struct LogSink {
    buffer: Option<Arc<Mutex<Vec<String>>>>,
}

impl Default for LogSink {
    fn default() -> Self {
        Self::new()
    }
}

impl LogSink {
    pub fn new() -> Self {
        LogSink { buffer: None }
    }

    pub fn with_buffer(buffer: Arc<Mutex<Vec<String>>>) -> Self {
        LogSink {
            buffer: Some(buffer),
        }
    }
}

impl TrackingSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn record(&self, interaction: &Interaction) -> Result<(), TrackError> {
        let payload =
            serde_json::to_string(interaction).map_err(|e| TrackError::Rejected(e.to_string()))?;
        if let Some(buffer) = &self.buffer {
            buffer
                .lock()
                .map_err(|_| TrackError::BufferPoisoned)?
                .push(format!("[INTERACTION] {}", payload));
        } else {
            info!(target: "feed_reconciler::interaction", %payload, "interaction");
        }
        Ok(())
    }
}
