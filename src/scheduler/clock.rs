use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{Scheduler, SchedulerState};
use crate::{LoaderError, Result};

/// Something the [`FrameClock`] can drive every frame
pub trait Tickable: Send {
    /// Called once when the clock takes ownership
    fn start(&mut self) -> Result<()>;

    /// Advance by one frame
    fn tick(&mut self, delta: Duration) -> Result<()>;

    /// The clock drops finished tickables after the tick that finished them
    fn is_finished(&self) -> bool;
}

impl Tickable for Scheduler {
    fn start(&mut self) -> Result<()> {
        if self.state() == SchedulerState::Idle {
            self.run()?;
        }
        Ok(())
    }

    fn tick(&mut self, delta: Duration) -> Result<()> {
        self.advance(delta)
    }

    fn is_finished(&self) -> bool {
        Scheduler::is_finished(self)
    }
}

/// Identifier of a tickable owned by a [`FrameClock`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LoaderId(pub u64);

/// Owns running loaders and ticks them once per frame.
///
/// Dropping a loader, either because it finished or through
/// [`cancel`](FrameClock::cancel), is the only way to stop it.
#[derive(Default)]
pub struct FrameClock {
    next_id: u64,
    entries: Vec<(LoaderId, Box<dyn Tickable>)>,
}

impl FrameClock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a loader and take ownership of it
    pub fn spawn<T: Tickable + 'static>(&mut self, mut tickable: T) -> Result<LoaderId> {
        tickable.start()?;

        let id = LoaderId(self.next_id);
        self.next_id += 1;
        let boxed: Box<dyn Tickable> = Box::new(tickable);
        self.entries.push((id, boxed));

        tracing::debug!("Registered loader {:?}", id);
        Ok(id)
    }

    /// Advance every loader by `delta` and drop the ones that finished.
    ///
    /// Errors do not stop the other loaders; they are returned with the id
    /// of the loader that raised them.
    pub fn tick(&mut self, delta: Duration) -> Vec<(LoaderId, LoaderError)> {
        let mut errors = Vec::new();
        for (id, tickable) in &mut self.entries {
            if let Err(e) = tickable.tick(delta) {
                errors.push((*id, e));
            }
        }

        self.entries.retain(|(id, tickable)| {
            let finished = tickable.is_finished();
            if finished {
                tracing::debug!("Loader {:?} finished, deregistering", id);
            }
            !finished
        });
        errors
    }

    /// Drop a loader before it finishes
    pub fn cancel(&mut self, id: LoaderId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry, _)| *entry != id);
        let removed = self.entries.len() != before;
        if removed {
            tracing::info!("Cancelled loader {:?}", id);
        }
        removed
    }

    pub fn contains(&self, id: LoaderId) -> bool {
        self.entries.iter().any(|(entry, _)| *entry == id)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl std::fmt::Debug for FrameClock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let ids: Vec<LoaderId> = self.entries.iter().map(|(id, _)| *id).collect();
        f.debug_struct("FrameClock").field("loaders", &ids).finish()
    }
}
