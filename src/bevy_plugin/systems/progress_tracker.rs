use super::super::{AllLoadedMessage, LoadProgress, UnitLoadedMessage};
use bevy::prelude::*;

/// System to keep `LoadProgress` components in sync with loader messages
pub fn track_load_progress(
    mut unit_loaded: MessageReader<UnitLoadedMessage>,
    mut all_loaded: MessageReader<AllLoadedMessage>,
    mut progress_query: Query<&mut LoadProgress>,
) {
    for message in unit_loaded.read() {
        for mut progress in &mut progress_query {
            if progress.loader == message.loader {
                progress.fraction = message.fraction();
            }
        }
    }

    for message in all_loaded.read() {
        for mut progress in &mut progress_query {
            if progress.loader == message.loader {
                progress.fraction = 1.0;
                progress.finished = true;
            }
        }
    }
}
