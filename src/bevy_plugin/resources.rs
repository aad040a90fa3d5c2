use crate::{FrameClock, LoaderId, ProgressLog, Result, Scheduler};
use bevy::prelude::*;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Resource owning every running loader
#[derive(Resource, Default)]
pub struct LoaderClock {
    clock: Mutex<FrameClock>,
    bridges: HashMap<LoaderId, Arc<ProgressLog>>,
}

impl LoaderClock {
    /// Start a scheduler and hand it to the clock.
    ///
    /// The scheduler's listener is swapped for a bridge that feeds the
    /// plugin's messages and still forwards every event to the listener the
    /// scheduler had before.
    pub fn spawn(&mut self, mut scheduler: Scheduler) -> Result<LoaderId> {
        let log = Arc::new(match scheduler.listener() {
            Some(previous) => ProgressLog::forwarding_to(previous),
            None => ProgressLog::new(),
        });
        scheduler.set_listener(&log);

        let id = self.clock_mut().spawn(scheduler)?;
        self.bridges.insert(id, log);
        Ok(id)
    }

    /// Drop a loader before it finishes
    pub fn cancel(&mut self, id: LoaderId) -> bool {
        self.bridges.remove(&id);
        self.clock_mut().cancel(id)
    }

    /// Number of loaders still running
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, FrameClock> {
        self.clock.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn clock_mut(&mut self) -> &mut FrameClock {
        self.clock
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn bridges(&self) -> &HashMap<LoaderId, Arc<ProgressLog>> {
        &self.bridges
    }

    /// Forget bridges of loaders the clock no longer owns
    pub(crate) fn prune_bridges(&mut self) {
        let clock = self
            .clock
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        self.bridges.retain(|id, _| clock.contains(*id));
    }
}
