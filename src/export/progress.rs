//! One-way progress notifications from a render to its caller.

use std::fmt;
use std::sync::Arc;

use tokio::sync::mpsc;

use crate::models::ExportProgress;

type ProgressCallback = Arc<dyn Fn(&ExportProgress) + Send + Sync>;

/// Optional progress sink. Without a callback every report is a no-op;
/// nothing is buffered.
#[derive(Clone, Default)]
pub struct ProgressReporter {
    callback: Option<ProgressCallback>,
}

impl ProgressReporter {
    /// Reporter that drops every snapshot.
    pub fn none() -> Self {
        Self::default()
    }

    /// Reporter invoking `callback` synchronously for each snapshot.
    pub fn new<F>(callback: F) -> Self
    where
        F: Fn(&ExportProgress) + Send + Sync + 'static,
    {
        Self {
            callback: Some(Arc::new(callback)),
        }
    }

    /// Reporter feeding an unbounded channel, for callers that prefer to
    /// consume progress as a stream.
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ExportProgress>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = Self::new(move |progress| {
            // Receiver gone means nobody is listening any more
            let _ = tx.send(progress.clone());
        });
        (reporter, rx)
    }

    pub fn is_active(&self) -> bool {
        self.callback.is_some()
    }

    pub fn report(&self, progress: &ExportProgress) {
        if let Some(callback) = &self.callback {
            callback(progress);
        }
    }
}

impl fmt::Debug for ProgressReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProgressReporter")
            .field("active", &self.is_active())
            .finish()
    }
}
