use crate::{LoaderId, ProgressEvent};
use bevy::prelude::*;

/// Sent after each unit of a loader completes
#[derive(Message, Clone, Debug)]
pub struct UnitLoadedMessage {
    pub loader: LoaderId,
    pub completed_index: usize,
    pub total: usize,
}

impl UnitLoadedMessage {
    /// Fraction of the loader's queue done
    pub fn fraction(&self) -> f32 {
        ProgressEvent::UnitLoaded {
            completed_index: self.completed_index,
            total: self.total,
        }
        .fraction()
    }
}

/// Sent once when a loader's last unit completes
#[derive(Message, Clone, Debug)]
pub struct AllLoadedMessage {
    pub loader: LoaderId,
}

/// Sent when a unit fails. With the halt policy the unit is retried next frame.
#[derive(Message, Clone, Debug)]
pub struct LoadFailedMessage {
    pub loader: LoaderId,
    pub error: String,
}
