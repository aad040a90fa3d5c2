#[cfg(test)]
mod integration_tests {
    use super::super::*;
    use crate::backend::{AnimationStore, AudioKind, MemoryAssetSource, MemoryBackends};
    use crate::listener::{ProgressEvent, ProgressLog};
    use crate::unit::FnUnit;
    use crate::{BackendError, LoaderConfigBuilder};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_unit(label: &str, idle: Duration, runs: &Arc<AtomicUsize>) -> Box<dyn LoadUnit> {
        let runs = runs.clone();
        Box::new(
            FnUnit::new(label, move || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
            .with_idle(idle),
        )
    }

    fn game_assets() -> Arc<MemoryAssetSource> {
        Arc::new(
            MemoryAssetSource::new()
                .with_asset("strings/en.txt", "# menu\nplay=Play\nquit=Quit\n")
                .with_asset("hero.atlas", "hero_1.png\nhero_2.png\nhero_3.png\n")
                .with_asset("gems.atlas", "ruby.png\nemerald.png\n")
                .with_asset("gems.png", vec![0x10 ^ 0x42, 0x20 ^ 0x42])
                .with_asset("title.png", vec![9, 9, 9])
                .with_asset("theme.ogg", vec![1, 2])
                .with_asset("click.wav", vec![3]),
        )
    }

    #[test]
    fn test_two_unit_scenario() {
        let memory = MemoryBackends::new();
        let log = Arc::new(ProgressLog::new());
        let runs_a = Arc::new(AtomicUsize::new(0));
        let runs_b = Arc::new(AtomicUsize::new(0));

        let mut scheduler = Scheduler::new(memory.backends()).with_listener(&log);
        scheduler
            .add_load_task(counting_unit("A", Duration::from_millis(100), &runs_a))
            .unwrap();
        scheduler
            .add_load_task(counting_unit("B", Duration::ZERO, &runs_b))
            .unwrap();
        scheduler.run().unwrap();

        scheduler.advance(Duration::from_millis(50)).unwrap();
        assert_eq!(runs_a.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.state(), SchedulerState::Starting);
        assert_eq!(scheduler.remaining_idle(), Duration::from_millis(50));
        assert!(log.events().is_empty());

        scheduler.advance(Duration::from_millis(50)).unwrap();
        assert_eq!(runs_a.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.state(), SchedulerState::Active);
        assert_eq!(scheduler.remaining_idle(), Duration::ZERO);
        assert_eq!(
            log.drain(),
            vec![ProgressEvent::UnitLoaded {
                completed_index: 0,
                total: 2
            }]
        );

        scheduler.advance(Duration::ZERO).unwrap();
        assert_eq!(runs_b.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.state(), SchedulerState::Finished);
        assert_eq!(
            log.drain(),
            vec![
                ProgressEvent::UnitLoaded {
                    completed_index: 1,
                    total: 2
                },
                ProgressEvent::AllLoaded,
            ]
        );
    }

    #[test]
    fn test_elapsed_time_is_startup_plus_every_idle() {
        let idles = [20u64, 40, 10];

        for step_ms in [5u64, 10] {
            let memory = MemoryBackends::new();
            let log = Arc::new(ProgressLog::new());
            let runs = Arc::new(AtomicUsize::new(0));
            let step = Duration::from_millis(step_ms);

            let mut scheduler = Scheduler::new(memory.backends()).with_listener(&log);
            scheduler.set_startup_delay(Duration::from_millis(30)).unwrap();
            for (i, idle) in idles.iter().enumerate() {
                scheduler
                    .add_load_task(counting_unit(
                        &format!("unit {}", i),
                        Duration::from_millis(*idle),
                        &runs,
                    ))
                    .unwrap();
            }
            scheduler.run().unwrap();

            let mut elapsed = Duration::ZERO;
            while log.completions() == 0 {
                scheduler.advance(step).unwrap();
                elapsed += step;
                assert!(elapsed < Duration::from_secs(1), "scheduler never finished");
            }

            assert_eq!(elapsed, Duration::from_millis(30 + 20 + 40 + 10));
            assert_eq!(runs.load(Ordering::SeqCst), 3);
            assert!(scheduler.is_finished());
        }
    }

    #[test]
    fn test_one_unit_per_advance_regardless_of_delta() {
        let memory = MemoryBackends::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let mut scheduler = Scheduler::new(memory.backends());
        for label in ["a", "b", "c"] {
            scheduler
                .add_load_task(counting_unit(label, Duration::ZERO, &runs))
                .unwrap();
        }
        scheduler.run().unwrap();

        for expected in 1..=3 {
            scheduler.advance(Duration::from_secs(1000)).unwrap();
            assert_eq!(runs.load(Ordering::SeqCst), expected);
            assert_eq!(scheduler.next_index(), expected);
        }
        assert!(scheduler.is_finished());
    }

    #[test]
    fn test_listener_sees_each_unit_once_in_order() {
        let memory = MemoryBackends::new();
        let log = Arc::new(ProgressLog::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut scheduler = Scheduler::new(memory.backends()).with_listener(&log);
        for i in 0..4 {
            scheduler
                .add_load_task(counting_unit(&i.to_string(), Duration::from_millis(5), &runs))
                .unwrap();
        }
        scheduler.run().unwrap();
        while !scheduler.is_finished() {
            scheduler.advance(Duration::from_millis(16)).unwrap();
        }

        let events = log.events();
        assert_eq!(events.len(), 5);
        for (i, event) in events[..4].iter().enumerate() {
            assert_eq!(
                *event,
                ProgressEvent::UnitLoaded {
                    completed_index: i,
                    total: 4
                }
            );
        }
        assert_eq!(events[4], ProgressEvent::AllLoaded);
        assert_eq!(scheduler.progress(), 1.0);
    }

    #[test]
    fn test_advance_after_finish_changes_nothing() {
        let memory = MemoryBackends::new();
        let log = Arc::new(ProgressLog::new());
        let runs = Arc::new(AtomicUsize::new(0));

        let mut scheduler = Scheduler::new(memory.backends()).with_listener(&log);
        scheduler
            .add_load_task(counting_unit("only", Duration::from_millis(100), &runs))
            .unwrap();
        scheduler.run().unwrap();
        scheduler.advance(Duration::from_millis(100)).unwrap();
        assert!(scheduler.is_finished());

        let events = log.events().len();
        let report = scheduler.report().clone();
        for _ in 0..5 {
            scheduler.advance(Duration::from_secs(1)).unwrap();
        }

        assert_eq!(scheduler.state(), SchedulerState::Finished);
        assert_eq!(scheduler.next_index(), 1);
        assert_eq!(scheduler.remaining_idle(), Duration::ZERO);
        assert_eq!(log.events().len(), events);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.report(), &report);
    }

    #[test]
    fn test_append_after_run_rejected() {
        let memory = MemoryBackends::new();
        let runs = Arc::new(AtomicUsize::new(0));

        let mut scheduler = Scheduler::new(memory.backends());
        scheduler
            .add_load_task(counting_unit("first", Duration::ZERO, &runs))
            .unwrap();
        scheduler.run().unwrap();

        let late = scheduler.add_load_task(counting_unit("late", Duration::ZERO, &runs));
        assert!(matches!(late, Err(LoaderError::QueueState(_))));
        assert!(matches!(
            scheduler.add_image_task("late.png", None),
            Err(LoaderError::QueueState(_))
        ));

        let manifest = LoadManifest::from_json(
            r#"{ "units": [ { "kind": "music", "name": "late.ogg" } ] }"#,
        )
        .unwrap();
        assert!(matches!(
            scheduler.load_manifest(&manifest, &DecryptRegistry::new()),
            Err(LoaderError::QueueState(_))
        ));

        assert_eq!(scheduler.len(), 1);
        assert_eq!(scheduler.queue().labels(), vec!["first"]);
    }

    #[test]
    fn test_failed_unit_is_retried() {
        let source = Arc::new(MemoryAssetSource::new());
        let memory = MemoryBackends::with_source(source.clone());
        let log = Arc::new(ProgressLog::new());

        let mut scheduler = Scheduler::new(memory.backends()).with_listener(&log);
        scheduler.add_image_task("late.png", Some(Duration::ZERO)).unwrap();
        scheduler.run().unwrap();

        for _ in 0..2 {
            let result = scheduler.advance(Duration::from_millis(16));
            assert!(matches!(
                result,
                Err(LoaderError::Backend(BackendError::NotFound { .. }))
            ));
            assert_eq!(scheduler.next_index(), 0);
            assert_eq!(scheduler.state(), SchedulerState::Starting);
        }
        assert!(log.events().is_empty());

        source.insert("late.png", vec![4, 2]);
        scheduler.advance(Duration::from_millis(16)).unwrap();

        assert!(scheduler.is_finished());
        assert_eq!(memory.textures.data("late.png"), Some(vec![4, 2]));
        assert_eq!(scheduler.report().loaded, 1);
        assert_eq!(scheduler.report().skipped, 0);
    }

    #[test]
    fn test_skip_policy_keeps_draining() {
        let memory = MemoryBackends::new();
        let log = Arc::new(ProgressLog::new());
        let runs = Arc::new(AtomicUsize::new(0));
        let config = LoaderConfigBuilder::for_tests().skip_failed_units().build();

        let mut scheduler = Scheduler::with_config(memory.backends(), config).with_listener(&log);
        scheduler.add_image_task("missing.png", None).unwrap();
        scheduler
            .add_load_task(counting_unit("after", Duration::ZERO, &runs))
            .unwrap();
        scheduler.run().unwrap();

        scheduler.advance(Duration::from_millis(16)).unwrap();
        assert_eq!(scheduler.next_index(), 1);
        scheduler.advance(Duration::from_millis(16)).unwrap();

        assert!(scheduler.is_finished());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.report().loaded, 1);
        assert_eq!(scheduler.report().skipped, 1);
        assert_eq!(log.events().len(), 3);
    }

    #[test]
    fn test_dropped_listener_is_ignored() {
        let memory = MemoryBackends::new();
        let runs = Arc::new(AtomicUsize::new(0));
        let log = Arc::new(ProgressLog::new());

        let mut scheduler = Scheduler::new(memory.backends()).with_listener(&log);
        scheduler
            .add_load_task(counting_unit("a", Duration::ZERO, &runs))
            .unwrap();
        scheduler.run().unwrap();
        drop(log);

        scheduler.advance(Duration::from_millis(16)).unwrap();
        assert!(scheduler.is_finished());
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_full_load_over_memory_backends() {
        let memory = MemoryBackends::with_source(game_assets());
        let log = Arc::new(ProgressLog::new());
        let config = LoaderConfigBuilder::for_tests().build();

        let mut scheduler = Scheduler::with_config(memory.backends(), config).with_listener(&log);
        scheduler
            .add_string_table_task("en", "strings/en.txt", false, None)
            .unwrap();
        scheduler.add_image_task("title.png", None).unwrap();
        scheduler.add_atlas_task("hero.atlas", None).unwrap();
        scheduler
            .add_encrypted_atlas_task(
                "gems.atlas",
                "gems.png",
                Some(DecryptHook::xor(vec![0x42])),
                None,
            )
            .unwrap();
        scheduler
            .add_pattern_animation_task(
                "hero_walk",
                &FramePattern::new("hero_%d.png", 1, 3).then(2, 2),
                Duration::from_millis(80),
                true,
                None,
            )
            .unwrap();
        scheduler
            .add_animation_task(
                "gem_shine",
                vec!["ruby.png".to_string(), "emerald.png".to_string()],
                Duration::from_millis(50),
                false,
                None,
            )
            .unwrap();
        scheduler.add_music_task("theme.ogg", None).unwrap();
        scheduler.add_effect_task("click.wav", None).unwrap();
        assert_eq!(scheduler.len(), 8);

        scheduler.run().unwrap();
        let mut ticks = 0;
        while !scheduler.is_finished() {
            scheduler.advance(Duration::from_millis(16)).unwrap();
            ticks += 1;
        }
        assert_eq!(ticks, 8);

        assert_eq!(memory.strings.get("en", "quit"), Some("Quit".to_string()));
        assert_eq!(memory.textures.data("title.png"), Some(vec![9, 9, 9]));
        assert_eq!(memory.textures.data("gems.png"), Some(vec![0x10, 0x20]));
        assert!(memory.sprite_frames.frame_texture("ruby.png").is_some());

        let walk = memory.animations.get("hero_walk").unwrap();
        assert_eq!(walk.frames.len(), 4);
        assert!(walk.restore_original_frame);
        assert!(memory.animations.contains("gem_shine"));

        assert_eq!(memory.audio.preloaded("theme.ogg"), Some(AudioKind::Music));
        assert_eq!(memory.audio.preloaded("click.wav"), Some(AudioKind::Effect));

        assert_eq!(scheduler.report().total, 8);
        assert_eq!(scheduler.report().loaded, 8);
        assert_eq!(log.completions(), 1);
    }

    #[test]
    fn test_manifest_run_through_frame_clock() {
        let memory = MemoryBackends::with_source(game_assets());
        let registry = DecryptRegistry::new().with_hook("gems", DecryptHook::xor(vec![0x42]));
        let manifest = LoadManifest::from_json(
            r#"{
                "settings": { "startup_delay": 0.03, "default_idle": 0 },
                "units": [
                    { "kind": "atlas", "descriptor": "gems.atlas", "texture": "gems.png", "decrypt": "gems" },
                    { "kind": "pattern_animation", "name": "walk", "pattern": "hero_%d.png",
                      "start": 1, "end": 3, "delay": 0.1 },
                    { "kind": "atlas", "descriptor": "hero.atlas" }
                ]
            }"#,
        )
        .unwrap();

        let log = Arc::new(ProgressLog::new());
        let mut scheduler =
            Scheduler::with_config(memory.backends(), manifest.config()).with_listener(&log);
        assert_eq!(scheduler.load_manifest(&manifest, &registry).unwrap(), 3);

        let mut clock = FrameClock::new();
        let id = clock.spawn(scheduler).unwrap();

        // The second tick ends the startup delay and loads the gems atlas,
        // then the animation fails: hero frames come later
        assert!(clock.tick(Duration::from_millis(16)).is_empty());
        assert_eq!(log.events().len(), 0);
        assert!(clock.tick(Duration::from_millis(16)).is_empty());
        assert_eq!(log.events().len(), 1);
        let errors = clock.tick(Duration::from_millis(16));
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].0, id);
        assert!(matches!(
            errors[0].1,
            LoaderError::Backend(BackendError::MissingFrame { .. })
        ));
        assert!(clock.contains(id));
        assert_eq!(log.events().len(), 1);
        assert!(memory.sprite_frames.frame_texture("emerald.png").is_some());

        clock.cancel(id);
        assert!(clock.is_empty());
    }

    #[test]
    fn test_bad_manifest_entry_leaves_queue_untouched() {
        let memory = MemoryBackends::new();
        let manifest = LoadManifest::from_json(
            r#"{ "units": [
                { "kind": "image", "name": "a.png" },
                { "kind": "image", "name": "b.png", "decrypt": "missing" }
            ] }"#,
        )
        .unwrap();

        let mut scheduler = Scheduler::new(memory.backends());
        let result = scheduler.load_manifest(&manifest, &DecryptRegistry::new());

        if let Err(LoaderError::Configuration(msg)) = result {
            assert!(msg.contains("Manifest unit #1"));
            assert!(msg.contains("missing"));
        } else {
            panic!("Expected Configuration error");
        }
        assert!(scheduler.is_empty());
    }

    #[test]
    fn test_manifest_with_huge_idle_loads() {
        let memory = MemoryBackends::with_source(game_assets());
        let manifest = LoadManifest::from_json(
            r#"{
                "settings": { "startup_delay": 1e30 },
                "units": [ { "kind": "image", "name": "title.png", "idle": 1e30 } ]
            }"#,
        )
        .unwrap();

        let mut scheduler = Scheduler::with_config(memory.backends(), manifest.config());
        assert_eq!(
            scheduler
                .load_manifest(&manifest, &DecryptRegistry::new())
                .unwrap(),
            1
        );
        assert_eq!(scheduler.config().startup_delay, Duration::MAX);
        assert_eq!(scheduler.queue().get(0).unwrap().idle_after(), Duration::MAX);

        scheduler.run().unwrap();
        scheduler.advance(Duration::from_secs(60)).unwrap();
        assert_eq!(scheduler.next_index(), 0);
        assert_eq!(scheduler.remaining_idle(), Duration::MAX - Duration::from_secs(60));
    }

    fn counting_hook(calls: &Arc<AtomicUsize>) -> DecryptHook {
        let calls = calls.clone();
        let xor = DecryptHook::xor(vec![0x42]);
        DecryptHook::new(move |data| {
            calls.fetch_add(1, Ordering::SeqCst);
            xor.decrypt(data)
        })
    }

    #[test]
    fn test_encrypted_units_decrypt_once_per_execution() {
        let memory = MemoryBackends::with_source(game_assets());
        let factory = UnitFactory::new(memory.backends());
        let calls = Arc::new(AtomicUsize::new(0));

        let mut image = factory.encrypted_image("gems.png", Some(counting_hook(&calls)), None);
        image.execute().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let mut atlas = factory.encrypted_atlas(
            "gems.atlas",
            "gems.png",
            Some(counting_hook(&calls)),
            None,
        );
        atlas.execute().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        image.execute().unwrap();
        atlas.execute().unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(memory.textures.data("gems.png"), Some(vec![0x10, 0x20]));
    }

    #[test]
    fn test_scheduled_encrypted_units_decrypt_once_per_tick() {
        let memory = MemoryBackends::with_source(game_assets());
        let calls = Arc::new(AtomicUsize::new(0));
        let config = LoaderConfigBuilder::for_tests().build();

        let mut scheduler = Scheduler::with_config(memory.backends(), config);
        scheduler
            .add_encrypted_image_task("gems.png", Some(counting_hook(&calls)), None)
            .unwrap();
        scheduler
            .add_encrypted_atlas_task("gems.atlas", "gems.png", Some(counting_hook(&calls)), None)
            .unwrap();
        scheduler.run().unwrap();

        scheduler.advance(Duration::from_millis(16)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        scheduler.advance(Duration::from_millis(16)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        assert!(scheduler.is_finished());
        scheduler.advance(Duration::from_millis(16)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(memory.sprite_frames.frame_texture("ruby.png").is_some());
    }
}
