use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, Weak};

/// Receives progress notifications from a [`Scheduler`](crate::Scheduler).
///
/// Both methods run synchronously on the thread that called `advance`.
pub trait ProgressListener: Send + Sync {
    /// A unit finished; `completed_index` counts from zero
    fn on_unit_loaded(&self, completed_index: usize, total: usize);

    /// The last unit finished. Called exactly once per run.
    fn on_all_loaded(&self);
}

/// A single progress notification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProgressEvent {
    UnitLoaded { completed_index: usize, total: usize },
    AllLoaded,
}

impl ProgressEvent {
    /// Fraction of the queue done after this event
    pub fn fraction(&self) -> f32 {
        match *self {
            ProgressEvent::UnitLoaded {
                completed_index,
                total,
            } => (completed_index + 1) as f32 / total.max(1) as f32,
            ProgressEvent::AllLoaded => 1.0,
        }
    }
}

/// Listener that records every event until drained.
///
/// A log built with [`forwarding_to`](ProgressLog::forwarding_to) also hands
/// every event to another listener for as long as that listener is alive.
#[derive(Debug, Default)]
pub struct ProgressLog {
    events: Mutex<Vec<ProgressEvent>>,
    forward: Option<Weak<dyn ProgressListener>>,
}

impl ProgressLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record events and pass them on to `listener`
    pub fn forwarding_to(listener: Weak<dyn ProgressListener>) -> Self {
        Self {
            events: Mutex::default(),
            forward: Some(listener),
        }
    }

    fn downstream(&self) -> Option<Arc<dyn ProgressListener>> {
        self.forward.as_ref().and_then(Weak::upgrade)
    }

    /// Copy of all recorded events
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.lock().clone()
    }

    /// Take all recorded events, leaving the log empty
    pub fn drain(&self) -> Vec<ProgressEvent> {
        std::mem::take(&mut *self.lock())
    }

    /// Number of `AllLoaded` events seen
    pub fn completions(&self) -> usize {
        self.lock()
            .iter()
            .filter(|e| matches!(e, ProgressEvent::AllLoaded))
            .count()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<ProgressEvent>> {
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl ProgressListener for ProgressLog {
    fn on_unit_loaded(&self, completed_index: usize, total: usize) {
        self.lock().push(ProgressEvent::UnitLoaded {
            completed_index,
            total,
        });
        if let Some(next) = self.downstream() {
            next.on_unit_loaded(completed_index, total);
        }
    }

    fn on_all_loaded(&self) {
        self.lock().push(ProgressEvent::AllLoaded);
        if let Some(next) = self.downstream() {
            next.on_all_loaded();
        }
    }
}
