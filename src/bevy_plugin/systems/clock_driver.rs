use super::super::resources::LoaderClock;
use super::super::{AllLoadedMessage, LoadFailedMessage, UnitLoadedMessage};
use crate::ProgressEvent;
use bevy::prelude::*;

/// System advancing every loader by the frame delta and forwarding progress
pub fn drive_loaders(
    time: Res<Time>,
    mut loaders: ResMut<LoaderClock>,
    mut unit_loaded: MessageWriter<UnitLoadedMessage>,
    mut all_loaded: MessageWriter<AllLoadedMessage>,
    mut failed: MessageWriter<LoadFailedMessage>,
) {
    let errors = loaders.clock_mut().tick(time.delta());

    for (loader, error) in errors {
        tracing::warn!("Loader {:?} failed: {}", loader, error);
        failed.write(LoadFailedMessage {
            loader,
            error: error.to_string(),
        });
    }

    for (loader, log) in loaders.bridges() {
        for event in log.drain() {
            match event {
                ProgressEvent::UnitLoaded {
                    completed_index,
                    total,
                } => {
                    unit_loaded.write(UnitLoadedMessage {
                        loader: *loader,
                        completed_index,
                        total,
                    });
                }
                ProgressEvent::AllLoaded => {
                    all_loaded.write(AllLoadedMessage { loader: *loader });
                }
            }
        }
    }

    // Finished loaders were dropped by the tick above
    loaders.prune_bridges();
}
