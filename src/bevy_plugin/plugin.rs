use bevy::prelude::*;

use super::{
    AllLoadedMessage, LoadFailedMessage, UnitLoadedMessage, resources::*, systems::*,
};

/// Bevy plugin that drives frame-sliced loaders from the frame clock.
///
/// Spawn a [`Scheduler`](crate::Scheduler) into the [`LoaderClock`] resource,
/// or queue it with [`SpawnLoaderExt::spawn_loader`], and the plugin advances
/// it by `Time::delta()` every `Update`.
#[derive(Default)]
pub struct FrameLoaderPlugin;

impl FrameLoaderPlugin {
    pub fn new() -> Self {
        Self
    }
}

impl Plugin for FrameLoaderPlugin {
    fn build(&self, app: &mut App) {
        app
            // Resources
            .init_resource::<LoaderClock>()
            // Messages (buffered events)
            .add_message::<UnitLoadedMessage>()
            .add_message::<AllLoadedMessage>()
            .add_message::<LoadFailedMessage>()
            // Systems
            .add_systems(Update, (drive_loaders, track_load_progress).chain());
    }
}

/// Helper trait for starting loaders from systems
pub trait SpawnLoaderExt {
    /// Hand a scheduler to the [`LoaderClock`] once commands are applied.
    ///
    /// A listener already attached to the scheduler keeps receiving progress
    /// alongside the plugin's messages.
    fn spawn_loader(&mut self, scheduler: crate::Scheduler);
}

impl SpawnLoaderExt for Commands<'_, '_> {
    fn spawn_loader(&mut self, scheduler: crate::Scheduler) {
        self.queue(move |world: &mut World| {
            let Some(mut clock) = world.get_resource_mut::<LoaderClock>() else {
                tracing::error!("LoaderClock resource missing, is FrameLoaderPlugin added?");
                return;
            };
            match clock.spawn(scheduler) {
                Ok(id) => tracing::debug!("Spawned loader {:?} from commands", id),
                Err(e) => tracing::error!("Failed to start loader: {}", e),
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bevy_plugin::LoadProgress;
    use crate::{FnUnit, MemoryBackends, ProgressLog, Scheduler};
    use std::sync::Arc;
    use std::time::Duration;

    fn app() -> App {
        let mut app = App::new();
        app.init_resource::<Time>().add_plugins(FrameLoaderPlugin::new());
        app
    }

    fn scheduler(units: usize) -> Scheduler {
        let mut scheduler = Scheduler::new(MemoryBackends::new().backends());
        for i in 0..units {
            scheduler
                .add_load_task(Box::new(
                    FnUnit::new(format!("unit {}", i), || Ok(())).with_idle(Duration::ZERO),
                ))
                .unwrap();
        }
        scheduler
    }

    #[test]
    fn test_plugin_drives_loader_to_completion() {
        let mut app = app();
        let id = app
            .world_mut()
            .resource_mut::<LoaderClock>()
            .spawn(scheduler(2))
            .unwrap();
        let entity = app.world_mut().spawn(LoadProgress::new(id)).id();

        app.update();
        let progress = app.world().get::<LoadProgress>(entity).unwrap();
        assert_eq!(progress.fraction, 0.5);
        assert!(!progress.finished);

        app.update();
        let progress = app.world().get::<LoadProgress>(entity).unwrap();
        assert!(progress.finished);
        assert!(app.world().resource::<LoaderClock>().is_empty());
    }

    #[test]
    fn test_spawn_loader_command() {
        let mut app = app();
        app.world_mut().commands().spawn_loader(scheduler(1));
        app.world_mut().flush();
        assert_eq!(app.world().resource::<LoaderClock>().len(), 1);

        app.update();
        assert!(app.world().resource::<LoaderClock>().is_empty());
    }

    #[test]
    fn test_caller_listener_still_notified() {
        let mut app = app();
        let caller = Arc::new(ProgressLog::new());
        app.world_mut()
            .commands()
            .spawn_loader(scheduler(2).with_listener(&caller));
        app.world_mut().flush();

        app.update();
        assert_eq!(caller.events().len(), 1);

        app.update();
        assert_eq!(caller.events().len(), 3);
        assert_eq!(caller.completions(), 1);
        assert!(app.world().resource::<LoaderClock>().is_empty());
    }
}
