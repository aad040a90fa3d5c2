use crate::LoaderId;
use bevy::prelude::*;

/// Tracks the progress of one loader, e.g. for a loading bar entity
#[derive(Component, Debug, Clone, PartialEq)]
pub struct LoadProgress {
    pub loader: LoaderId,
    /// 0.0 to 1.0
    pub fraction: f32,
    pub finished: bool,
}

impl LoadProgress {
    pub fn new(loader: LoaderId) -> Self {
        Self {
            loader,
            fraction: 0.0,
            finished: false,
        }
    }
}
