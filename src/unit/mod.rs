mod factory;
mod manifest;
mod pattern;
mod variants;

pub use factory::*;
pub use manifest::*;
pub use pattern::*;
pub use variants::*;

use std::fmt;
use std::time::Duration;

use crate::Result;

/// One indivisible, synchronous piece of loading work.
///
/// `execute` must not call back into the scheduler that owns the unit.
/// After a successful `execute` the scheduler never runs the unit again;
/// after a failed one it may, so backends should tolerate a retry.
pub trait LoadUnit: Send {
    /// Short identifier of the unit family (e.g., "image", "animation")
    fn kind(&self) -> &'static str;

    /// Human readable label used in logs
    fn label(&self) -> String;

    /// Pause waited out between the previous unit (or the startup delay) and this one
    fn idle_after(&self) -> Duration;

    /// Perform the backend call
    fn execute(&mut self) -> Result<()>;
}

impl fmt::Debug for dyn LoadUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadUnit")
            .field("kind", &self.kind())
            .field("label", &self.label())
            .field("idle_after", &self.idle_after())
            .finish()
    }
}

/// A unit wrapping an arbitrary closure
pub struct FnUnit<F> {
    label: String,
    idle: Duration,
    f: F,
}

impl<F> FnUnit<F>
where
    F: FnMut() -> Result<()> + Send,
{
    /// Create a closure unit with the default idle time
    pub fn new(label: impl Into<String>, f: F) -> Self {
        Self {
            label: label.into(),
            idle: crate::DEFAULT_IDLE,
            f,
        }
    }

    /// Set the idle time waited out before this unit
    pub fn with_idle(mut self, idle: Duration) -> Self {
        self.idle = idle;
        self
    }
}

impl<F> LoadUnit for FnUnit<F>
where
    F: FnMut() -> Result<()> + Send,
{
    fn kind(&self) -> &'static str {
        "fn"
    }

    fn label(&self) -> String {
        self.label.clone()
    }

    fn idle_after(&self) -> Duration {
        self.idle
    }

    fn execute(&mut self) -> Result<()> {
        (self.f)()
    }
}
