mod clock;
mod integration_tests;
mod queue;

pub use clock::*;
pub use queue::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Weak};
use std::time::Duration;

use crate::backend::Backends;
use crate::config::{FailurePolicy, LoaderConfig};
use crate::decrypt::{DecryptHook, DecryptRegistry};
use crate::listener::ProgressListener;
use crate::unit::{FramePattern, LoadManifest, LoadUnit, UnitFactory};
use crate::{LoaderError, Result};

/// Lifecycle of a [`Scheduler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchedulerState {
    /// Accepting units, not yet running
    Idle,
    /// Running, waiting out the startup delay
    Starting,
    /// At least one unit has completed
    Active,
    /// Every unit has completed
    Finished,
}

/// Summary of a load run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadReport {
    /// Units in the queue when the run started
    pub total: usize,
    /// Units whose backend call succeeded
    pub loaded: usize,
    /// Units that failed and were skipped
    pub skipped: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl LoadReport {
    /// Wall-clock time between `run()` and the last unit
    pub fn elapsed(&self) -> Option<chrono::Duration> {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }
}

/// Drains a queue of load units, one unit per tick.
///
/// Units are appended while the scheduler is [`Idle`](SchedulerState::Idle).
/// After [`run`](Scheduler::run), every [`advance`](Scheduler::advance)
/// counts down the pending idle time and, once it is used up, executes at
/// most one unit in the same call, regardless of how large `delta` is. Each
/// unit's idle time is waited out between the previous unit and itself; the
/// startup delay comes on top of the first unit's. Overshoot is discarded,
/// so with startup delay `s` and idle times `d_0..d_n` the last unit runs
/// after `s + d_0 + ... + d_n` of ticks that divide those budgets evenly.
///
/// ```
/// use std::sync::Arc;
/// use std::time::Duration;
/// use bevy_frame_loader::{MemoryBackends, ProgressLog, Scheduler};
///
/// let memory = MemoryBackends::new();
/// let log = Arc::new(ProgressLog::new());
/// let mut scheduler = Scheduler::new(memory.backends()).with_listener(&log);
///
/// scheduler.run().unwrap();
/// scheduler.advance(Duration::from_millis(16)).unwrap();
///
/// assert!(scheduler.is_finished());
/// assert_eq!(log.completions(), 1);
/// ```
pub struct Scheduler {
    config: LoaderConfig,
    factory: UnitFactory,
    queue: LoadQueue,
    state: SchedulerState,
    next_index: usize,
    remaining_idle: Duration,
    listener: Option<Weak<dyn ProgressListener>>,
    report: LoadReport,
}

impl Scheduler {
    /// Create a scheduler with the default configuration
    pub fn new(backends: Backends) -> Self {
        Self::with_config(backends, LoaderConfig::default())
    }

    /// Create a scheduler with a custom configuration
    pub fn with_config(backends: Backends, config: LoaderConfig) -> Self {
        let factory = UnitFactory::new(backends).with_default_idle(config.default_idle);
        Self {
            factory,
            queue: LoadQueue::new(),
            state: SchedulerState::Idle,
            next_index: 0,
            remaining_idle: Duration::ZERO,
            listener: None,
            report: LoadReport::default(),
            config,
        }
    }

    /// Attach a progress listener (builder style).
    ///
    /// Only a weak reference is kept; notifications stop once the caller
    /// drops its `Arc`.
    pub fn with_listener<L: ProgressListener + 'static>(mut self, listener: &Arc<L>) -> Self {
        self.set_listener(listener);
        self
    }

    /// Attach or replace the progress listener
    pub fn set_listener<L: ProgressListener + 'static>(&mut self, listener: &Arc<L>) {
        let weak: Weak<L> = Arc::downgrade(listener);
        self.listener = Some(weak as Weak<dyn ProgressListener>);
    }

    /// Weak handle to the current listener, if one was attached
    pub fn listener(&self) -> Option<Weak<dyn ProgressListener>> {
        self.listener.clone()
    }

    pub fn config(&self) -> &LoaderConfig {
        &self.config
    }

    pub fn factory(&self) -> &UnitFactory {
        &self.factory
    }

    pub fn queue(&self) -> &LoadQueue {
        &self.queue
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Index of the next unit to execute
    pub fn next_index(&self) -> usize {
        self.next_index
    }

    /// Idle time left before the next unit may execute
    pub fn remaining_idle(&self) -> Duration {
        self.remaining_idle
    }

    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Fraction of completed units, in `[0, 1]`
    pub fn progress(&self) -> f32 {
        if self.queue.is_empty() {
            return if self.is_finished() { 1.0 } else { 0.0 };
        }
        self.next_index as f32 / self.queue.len() as f32
    }

    pub fn is_finished(&self) -> bool {
        self.state == SchedulerState::Finished
    }

    pub fn report(&self) -> &LoadReport {
        &self.report
    }

    /// Idle time waited out before the unit at `index`; zero past the end
    fn idle_before(&self, index: usize) -> Duration {
        self.queue
            .get(index)
            .map(|unit| unit.idle_after())
            .unwrap_or(Duration::ZERO)
    }

    fn ensure_idle(&self, action: &str) -> Result<()> {
        if self.state == SchedulerState::Idle {
            Ok(())
        } else {
            Err(LoaderError::QueueState(format!(
                "Cannot {} while scheduler is {:?}",
                action, self.state
            )))
        }
    }

    /// Set the pause before the first unit executes
    pub fn set_startup_delay(&mut self, delay: Duration) -> Result<()> {
        self.ensure_idle("change the startup delay")?;
        self.config.startup_delay = delay;
        Ok(())
    }

    /// Append a unit to the queue
    pub fn add_load_task(&mut self, unit: Box<dyn LoadUnit>) -> Result<()> {
        self.ensure_idle("append a unit")?;
        tracing::debug!(
            "Queued {} unit #{}: {}",
            unit.kind(),
            self.queue.len(),
            unit.label()
        );
        self.queue.append(unit);
        Ok(())
    }

    fn add_with(
        &mut self,
        build: impl FnOnce(&UnitFactory) -> Result<Box<dyn LoadUnit>>,
    ) -> Result<()> {
        self.ensure_idle("append a unit")?;
        let unit = build(&self.factory)?;
        self.add_load_task(unit)
    }

    pub fn add_string_table_task(
        &mut self,
        language: &str,
        path: &str,
        merge: bool,
        idle: Option<Duration>,
    ) -> Result<()> {
        self.add_with(|f| Ok(f.string_table(language, path, merge, idle)))
    }

    pub fn add_image_task(&mut self, name: &str, idle: Option<Duration>) -> Result<()> {
        self.add_with(|f| Ok(f.image(name, idle)))
    }

    pub fn add_encrypted_image_task(
        &mut self,
        name: &str,
        hook: Option<DecryptHook>,
        idle: Option<Duration>,
    ) -> Result<()> {
        self.add_with(|f| Ok(f.encrypted_image(name, hook, idle)))
    }

    pub fn add_atlas_task(&mut self, descriptor: &str, idle: Option<Duration>) -> Result<()> {
        self.add_with(|f| Ok(f.atlas(descriptor, idle)))
    }

    pub fn add_encrypted_atlas_task(
        &mut self,
        descriptor: &str,
        texture_name: &str,
        hook: Option<DecryptHook>,
        idle: Option<Duration>,
    ) -> Result<()> {
        self.add_with(|f| Ok(f.encrypted_atlas(descriptor, texture_name, hook, idle)))
    }

    pub fn add_music_task(&mut self, name: &str, idle: Option<Duration>) -> Result<()> {
        self.add_with(|f| Ok(f.music(name, idle)))
    }

    pub fn add_effect_task(&mut self, name: &str, idle: Option<Duration>) -> Result<()> {
        self.add_with(|f| Ok(f.effect(name, idle)))
    }

    pub fn add_animation_task(
        &mut self,
        name: &str,
        frames: Vec<String>,
        unit_delay: Duration,
        restore_original_frame: bool,
        idle: Option<Duration>,
    ) -> Result<()> {
        self.add_with(|f| f.animation(name, frames, unit_delay, restore_original_frame, idle))
    }

    pub fn add_timed_animation_task(
        &mut self,
        name: &str,
        frames: Vec<String>,
        delays: Vec<Duration>,
        restore_original_frame: bool,
        idle: Option<Duration>,
    ) -> Result<()> {
        self.add_with(|f| f.timed_animation(name, frames, delays, restore_original_frame, idle))
    }

    pub fn add_pattern_animation_task(
        &mut self,
        name: &str,
        pattern: &FramePattern,
        unit_delay: Duration,
        restore_original_frame: bool,
        idle: Option<Duration>,
    ) -> Result<()> {
        self.add_with(|f| {
            f.pattern_animation(name, pattern, unit_delay, restore_original_frame, idle)
        })
    }

    pub fn add_timed_pattern_animation_task(
        &mut self,
        name: &str,
        pattern: &FramePattern,
        delays: Vec<Duration>,
        restore_original_frame: bool,
        idle: Option<Duration>,
    ) -> Result<()> {
        self.add_with(|f| {
            f.timed_pattern_animation(name, pattern, delays, restore_original_frame, idle)
        })
    }

    /// Append every unit of a manifest.
    ///
    /// All units are built before any is queued, so a bad entry leaves the
    /// queue untouched. Returns the number of units added.
    pub fn load_manifest(
        &mut self,
        manifest: &LoadManifest,
        registry: &DecryptRegistry,
    ) -> Result<usize> {
        self.ensure_idle("load a manifest")?;

        let units = manifest
            .units
            .iter()
            .enumerate()
            .map(|(i, spec)| {
                self.factory.create(spec, registry).map_err(|e| match e {
                    LoaderError::Configuration(msg) => {
                        LoaderError::Configuration(format!("Manifest unit #{}: {}", i, msg))
                    }
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        let count = units.len();
        for unit in units {
            self.queue.append(unit);
        }
        tracing::debug!("Queued {} units from manifest", count);
        Ok(count)
    }

    /// Start draining the queue on the following ticks
    pub fn run(&mut self) -> Result<()> {
        self.ensure_idle("run")?;

        self.state = SchedulerState::Starting;
        self.remaining_idle = self.config.startup_delay.saturating_add(self.idle_before(0));
        self.report = LoadReport {
            total: self.queue.len(),
            started_at: Some(Utc::now()),
            ..LoadReport::default()
        };

        tracing::info!(
            "Starting load run: {} units, startup delay {:?}",
            self.queue.len(),
            self.config.startup_delay
        );
        Ok(())
    }

    /// Advance the scheduler by one tick of `delta`.
    ///
    /// The tick that uses up the idle time also executes the next unit.
    /// With [`FailurePolicy::Halt`] a failing unit's error is returned and
    /// the same unit is retried on the next call.
    pub fn advance(&mut self, delta: Duration) -> Result<()> {
        match self.state {
            SchedulerState::Idle | SchedulerState::Finished => return Ok(()),
            SchedulerState::Starting | SchedulerState::Active => {}
        }

        if !self.remaining_idle.is_zero() {
            self.remaining_idle = self.remaining_idle.saturating_sub(delta);
            if !self.remaining_idle.is_zero() {
                tracing::trace!("Idle, {:?} remaining", self.remaining_idle);
                return Ok(());
            }
        }

        let total = self.queue.len();
        if self.next_index >= total {
            self.finish();
            return Ok(());
        }

        let index = self.next_index;
        let (label, outcome) = {
            let unit = self.queue.get_mut(index)?;
            tracing::debug!(
                "Executing unit {}/{} ({}): {}",
                index + 1,
                total,
                unit.kind(),
                unit.label()
            );
            let outcome = unit.execute();
            (unit.label(), outcome)
        };

        match outcome {
            Ok(()) => self.report.loaded += 1,
            Err(e) => match self.config.failure_policy {
                FailurePolicy::Halt => {
                    tracing::debug!("Unit {} failed, will retry: {}", label, e);
                    return Err(e);
                }
                FailurePolicy::SkipAndContinue => {
                    tracing::warn!("Skipping unit {} after failure: {}", label, e);
                    self.report.skipped += 1;
                }
            },
        }

        self.next_index += 1;
        self.remaining_idle = self.idle_before(self.next_index);
        self.state = SchedulerState::Active;
        self.notify(|listener| listener.on_unit_loaded(index, total));

        if self.next_index == total {
            self.finish();
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.state = SchedulerState::Finished;
        self.remaining_idle = Duration::ZERO;
        self.report.finished_at = Some(Utc::now());

        tracing::info!(
            "Load run finished: {} loaded, {} skipped",
            self.report.loaded,
            self.report.skipped
        );
        self.notify(|listener| listener.on_all_loaded());
    }

    fn notify(&self, f: impl FnOnce(&dyn ProgressListener)) {
        let Some(listener) = &self.listener else {
            return;
        };
        match listener.upgrade() {
            Some(listener) => f(listener.as_ref()),
            None => tracing::warn!("Progress listener was dropped, skipping notification"),
        }
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("state", &self.state)
            .field("next_index", &self.next_index)
            .field("len", &self.queue.len())
            .field("remaining_idle", &self.remaining_idle)
            .field("config", &self.config)
            .finish()
    }
}
