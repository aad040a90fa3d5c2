use std::time::Duration;

use super::{
    AnimationUnit, AtlasUnit, AudioUnit, EncryptedAtlasUnit, EncryptedImageUnit, FrameDelays,
    FramePattern, ImageUnit, LoadUnit, StringTableUnit,
};
use crate::backend::{AudioKind, Backends};
use crate::decrypt::DecryptHook;
use crate::{DEFAULT_IDLE, Result};

/// Builds load units for each supported resource family.
///
/// Every method captures exactly the backend handle and parameters its unit
/// needs. `idle` falls back to the factory's default when `None`.
#[derive(Debug, Clone)]
pub struct UnitFactory {
    backends: Backends,
    default_idle: Duration,
}

impl UnitFactory {
    /// Create a factory over the given backends
    pub fn new(backends: Backends) -> Self {
        Self {
            backends,
            default_idle: DEFAULT_IDLE,
        }
    }

    /// Set the idle time used when a call passes none
    pub fn with_default_idle(mut self, idle: Duration) -> Self {
        self.default_idle = idle;
        self
    }

    pub fn backends(&self) -> &Backends {
        &self.backends
    }

    pub fn default_idle(&self) -> Duration {
        self.default_idle
    }

    fn idle(&self, idle: Option<Duration>) -> Duration {
        idle.unwrap_or(self.default_idle)
    }

    /// Localized string table; `merge` keeps the current entries
    pub fn string_table(
        &self,
        language: impl Into<String>,
        path: impl Into<String>,
        merge: bool,
        idle: Option<Duration>,
    ) -> Box<dyn LoadUnit> {
        Box::new(StringTableUnit {
            store: self.backends.strings.clone(),
            language: language.into(),
            path: path.into(),
            merge,
            idle: self.idle(idle),
        })
    }

    /// Plain image
    pub fn image(&self, name: impl Into<String>, idle: Option<Duration>) -> Box<dyn LoadUnit> {
        Box::new(ImageUnit {
            store: self.backends.textures.clone(),
            name: name.into(),
            idle: self.idle(idle),
        })
    }

    /// Image that is decrypted before decoding; without a hook the raw bytes are used
    pub fn encrypted_image(
        &self,
        name: impl Into<String>,
        hook: Option<DecryptHook>,
        idle: Option<Duration>,
    ) -> Box<dyn LoadUnit> {
        Box::new(EncryptedImageUnit {
            backends: self.backends.clone(),
            name: name.into(),
            hook,
            idle: self.idle(idle),
        })
    }

    /// Atlas whose descriptor names its own texture
    pub fn atlas(&self, descriptor: impl Into<String>, idle: Option<Duration>) -> Box<dyn LoadUnit> {
        Box::new(AtlasUnit {
            store: self.backends.sprite_frames.clone(),
            descriptor: descriptor.into(),
            idle: self.idle(idle),
        })
    }

    /// Atlas with a plain descriptor and an encrypted texture
    pub fn encrypted_atlas(
        &self,
        descriptor: impl Into<String>,
        texture_name: impl Into<String>,
        hook: Option<DecryptHook>,
        idle: Option<Duration>,
    ) -> Box<dyn LoadUnit> {
        Box::new(EncryptedAtlasUnit {
            backends: self.backends.clone(),
            descriptor: descriptor.into(),
            texture_name: texture_name.into(),
            hook,
            idle: self.idle(idle),
        })
    }

    /// Background music preload
    pub fn music(&self, name: impl Into<String>, idle: Option<Duration>) -> Box<dyn LoadUnit> {
        self.audio(name, AudioKind::Music, idle)
    }

    /// Sound effect preload
    pub fn effect(&self, name: impl Into<String>, idle: Option<Duration>) -> Box<dyn LoadUnit> {
        self.audio(name, AudioKind::Effect, idle)
    }

    fn audio(
        &self,
        name: impl Into<String>,
        audio_kind: AudioKind,
        idle: Option<Duration>,
    ) -> Box<dyn LoadUnit> {
        Box::new(AudioUnit {
            store: self.backends.audio.clone(),
            name: name.into(),
            audio_kind,
            idle: self.idle(idle),
        })
    }

    /// Animation over explicit frame names, every frame shown for `unit_delay`
    pub fn animation(
        &self,
        name: impl Into<String>,
        frames: Vec<String>,
        unit_delay: Duration,
        restore_original_frame: bool,
        idle: Option<Duration>,
    ) -> Result<Box<dyn LoadUnit>> {
        self.build_animation(
            name.into(),
            frames,
            FrameDelays::Uniform(unit_delay),
            restore_original_frame,
            idle,
        )
    }

    /// Animation over explicit frame names with one delay per frame
    pub fn timed_animation(
        &self,
        name: impl Into<String>,
        frames: Vec<String>,
        delays: Vec<Duration>,
        restore_original_frame: bool,
        idle: Option<Duration>,
    ) -> Result<Box<dyn LoadUnit>> {
        self.build_animation(
            name.into(),
            frames,
            FrameDelays::PerFrame(delays),
            restore_original_frame,
            idle,
        )
    }

    /// Animation over frames generated from a name pattern, uniform delay
    pub fn pattern_animation(
        &self,
        name: impl Into<String>,
        pattern: &FramePattern,
        unit_delay: Duration,
        restore_original_frame: bool,
        idle: Option<Duration>,
    ) -> Result<Box<dyn LoadUnit>> {
        self.animation(
            name,
            pattern.frame_names()?,
            unit_delay,
            restore_original_frame,
            idle,
        )
    }

    /// Animation over frames generated from a name pattern with one delay per frame
    pub fn timed_pattern_animation(
        &self,
        name: impl Into<String>,
        pattern: &FramePattern,
        delays: Vec<Duration>,
        restore_original_frame: bool,
        idle: Option<Duration>,
    ) -> Result<Box<dyn LoadUnit>> {
        self.timed_animation(
            name,
            pattern.frame_names()?,
            delays,
            restore_original_frame,
            idle,
        )
    }

    fn build_animation(
        &self,
        name: String,
        frames: Vec<String>,
        delays: FrameDelays,
        restore_original_frame: bool,
        idle: Option<Duration>,
    ) -> Result<Box<dyn LoadUnit>> {
        let unit = AnimationUnit {
            sprite_frames: self.backends.sprite_frames.clone(),
            animations: self.backends.animations.clone(),
            name,
            frames,
            delays,
            restore_original_frame,
            idle: self.idle(idle),
        };
        unit.validate()?;
        Ok(Box::new(unit))
    }
}
