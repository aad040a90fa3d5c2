use serde::{Deserialize, Serialize};

use super::{FrameDelays, FramePattern, LoadUnit, UnitFactory};
use crate::config::{FailurePolicy, LoaderConfig, idle_from_secs};
use crate::decrypt::DecryptRegistry;
use crate::{LoaderError, Result};

/// A load unit described as data.
///
/// Times are given in seconds. `idle` falls back to the configured default
/// idle when absent. Decrypt hooks are referenced by the name they were
/// registered under in a [`DecryptRegistry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum UnitSpec {
    StringTable {
        language: String,
        path: String,
        #[serde(default)]
        merge: bool,
        idle: Option<f32>,
    },
    Image {
        name: String,
        decrypt: Option<String>,
        idle: Option<f32>,
    },
    Atlas {
        descriptor: String,
        /// Texture loaded separately from the descriptor, required with `decrypt`
        texture: Option<String>,
        decrypt: Option<String>,
        idle: Option<f32>,
    },
    Music {
        name: String,
        idle: Option<f32>,
    },
    Effect {
        name: String,
        idle: Option<f32>,
    },
    Animation {
        name: String,
        frames: Vec<String>,
        /// Uniform frame delay; exclusive with `delays`
        delay: Option<f32>,
        delays: Option<Vec<f32>>,
        #[serde(default)]
        restore_original_frame: bool,
        idle: Option<f32>,
    },
    PatternAnimation {
        name: String,
        pattern: String,
        start: i32,
        end: i32,
        second_range: Option<(i32, i32)>,
        delay: Option<f32>,
        delays: Option<Vec<f32>>,
        #[serde(default)]
        restore_original_frame: bool,
        idle: Option<f32>,
    },
}

impl UnitSpec {
    /// Unit family this spec produces
    pub fn kind(&self) -> &'static str {
        match self {
            UnitSpec::StringTable { .. } => "string_table",
            UnitSpec::Image { decrypt: None, .. } => "image",
            UnitSpec::Image { .. } => "encrypted_image",
            UnitSpec::Atlas { texture: None, .. } => "atlas",
            UnitSpec::Atlas { .. } => "encrypted_atlas",
            UnitSpec::Music { .. } => "music",
            UnitSpec::Effect { .. } => "effect",
            UnitSpec::Animation { .. } | UnitSpec::PatternAnimation { .. } => "animation",
        }
    }
}

fn frame_delays(name: &str, delay: Option<f32>, delays: &Option<Vec<f32>>) -> Result<FrameDelays> {
    match (delay, delays) {
        (Some(delay), None) => Ok(FrameDelays::Uniform(idle_from_secs(delay))),
        (None, Some(delays)) => Ok(FrameDelays::PerFrame(
            delays.iter().copied().map(idle_from_secs).collect(),
        )),
        _ => Err(LoaderError::Configuration(format!(
            "Animation '{}' needs exactly one of 'delay' or 'delays'",
            name
        ))),
    }
}

impl UnitFactory {
    /// Build the unit a spec describes, resolving decrypt hooks by name
    pub fn create(&self, spec: &UnitSpec, registry: &DecryptRegistry) -> Result<Box<dyn LoadUnit>> {
        let idle = |secs: &Option<f32>| secs.map(idle_from_secs);

        match spec {
            UnitSpec::StringTable {
                language,
                path,
                merge,
                idle: secs,
            } => Ok(self.string_table(language, path, *merge, idle(secs))),
            UnitSpec::Image {
                name,
                decrypt: None,
                idle: secs,
            } => Ok(self.image(name, idle(secs))),
            UnitSpec::Image {
                name,
                decrypt: Some(hook),
                idle: secs,
            } => {
                let hook = registry.resolve(Some(hook.as_str()))?;
                Ok(self.encrypted_image(name, hook, idle(secs)))
            }
            UnitSpec::Atlas {
                descriptor,
                texture: None,
                decrypt: Some(_),
                ..
            } => Err(LoaderError::Configuration(format!(
                "Atlas '{}' has a decrypt hook but no texture name",
                descriptor
            ))),
            UnitSpec::Atlas {
                descriptor,
                texture: None,
                decrypt: None,
                idle: secs,
            } => Ok(self.atlas(descriptor, idle(secs))),
            UnitSpec::Atlas {
                descriptor,
                texture: Some(texture),
                decrypt,
                idle: secs,
            } => {
                let hook = registry.resolve(decrypt.as_deref())?;
                Ok(self.encrypted_atlas(descriptor, texture, hook, idle(secs)))
            }
            UnitSpec::Music { name, idle: secs } => Ok(self.music(name, idle(secs))),
            UnitSpec::Effect { name, idle: secs } => Ok(self.effect(name, idle(secs))),
            UnitSpec::Animation {
                name,
                frames,
                delay,
                delays: per_frame,
                restore_original_frame,
                idle: secs,
            } => match frame_delays(name, *delay, per_frame)? {
                FrameDelays::Uniform(delay) => self.animation(
                    name,
                    frames.clone(),
                    delay,
                    *restore_original_frame,
                    idle(secs),
                ),
                FrameDelays::PerFrame(delays) => self.timed_animation(
                    name,
                    frames.clone(),
                    delays,
                    *restore_original_frame,
                    idle(secs),
                ),
            },
            UnitSpec::PatternAnimation {
                name,
                pattern,
                start,
                end,
                second_range,
                delay,
                delays: per_frame,
                restore_original_frame,
                idle: secs,
            } => {
                let mut frames = FramePattern::new(pattern, *start, *end);
                if let Some((start, end)) = second_range {
                    frames = frames.then(*start, *end);
                }
                match frame_delays(name, *delay, per_frame)? {
                    FrameDelays::Uniform(delay) => self.pattern_animation(
                        name,
                        &frames,
                        delay,
                        *restore_original_frame,
                        idle(secs),
                    ),
                    FrameDelays::PerFrame(delays) => self.timed_pattern_animation(
                        name,
                        &frames,
                        delays,
                        *restore_original_frame,
                        idle(secs),
                    ),
                }
            }
        }
    }
}

/// Run-level settings of a manifest, in seconds
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestSettings {
    pub startup_delay: Option<f32>,
    pub default_idle: Option<f32>,
    pub failure_policy: Option<FailurePolicy>,
}

/// A JSON document listing the units of one load run.
///
/// ```json
/// {
///   "settings": { "startup_delay": 0.3 },
///   "units": [
///     { "kind": "string_table", "language": "en", "path": "strings/en.txt" },
///     { "kind": "atlas", "descriptor": "hero.atlas", "idle": 0.05 },
///     { "kind": "pattern_animation", "name": "walk", "pattern": "hero_%d.png",
///       "start": 1, "end": 4, "delay": 0.1 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadManifest {
    #[serde(default)]
    pub settings: ManifestSettings,
    pub units: Vec<UnitSpec>,
}

impl LoadManifest {
    /// Parse a manifest from JSON
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| LoaderError::Configuration(format!("Invalid load manifest: {}", e)))
    }

    /// Loader configuration with the manifest settings applied over the defaults
    pub fn config(&self) -> LoaderConfig {
        let mut config = LoaderConfig::default();
        if let Some(secs) = self.settings.startup_delay {
            config.startup_delay = idle_from_secs(secs);
        }
        if let Some(secs) = self.settings.default_idle {
            config.default_idle = idle_from_secs(secs);
        }
        if let Some(policy) = self.settings.failure_policy {
            config.failure_policy = policy;
        }
        config
    }
}
