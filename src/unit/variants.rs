use std::sync::Arc;
use std::time::Duration;

use super::LoadUnit;
use crate::backend::{
    AnimationClip, AnimationFrame, AnimationStore, AudioKind, AudioStore, Backends,
    SpriteFrameStore, StringTableStore, TextureStore,
};
use crate::decrypt::{self, DecryptHook};
use crate::{BackendError, LoaderError, Result};

/// Merges or replaces a localized string table
pub struct StringTableUnit {
    pub(crate) store: Arc<dyn StringTableStore>,
    pub(crate) language: String,
    pub(crate) path: String,
    pub(crate) merge: bool,
    pub(crate) idle: Duration,
}

impl LoadUnit for StringTableUnit {
    fn kind(&self) -> &'static str {
        "string_table"
    }

    fn label(&self) -> String {
        format!("{} ({})", self.path, self.language)
    }

    fn idle_after(&self) -> Duration {
        self.idle
    }

    fn execute(&mut self) -> Result<()> {
        self.store
            .add_strings(&self.language, &self.path, self.merge)?;
        Ok(())
    }
}

/// Decodes a plain image into the texture store
pub struct ImageUnit {
    pub(crate) store: Arc<dyn TextureStore>,
    pub(crate) name: String,
    pub(crate) idle: Duration,
}

impl LoadUnit for ImageUnit {
    fn kind(&self) -> &'static str {
        "image"
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn idle_after(&self) -> Duration {
        self.idle
    }

    fn execute(&mut self) -> Result<()> {
        self.store.add_image(&self.name)?;
        Ok(())
    }
}

/// Reads an image, runs the decrypt hook over it, then decodes it
pub struct EncryptedImageUnit {
    pub(crate) backends: Backends,
    pub(crate) name: String,
    pub(crate) hook: Option<DecryptHook>,
    pub(crate) idle: Duration,
}

impl LoadUnit for EncryptedImageUnit {
    fn kind(&self) -> &'static str {
        "encrypted_image"
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn idle_after(&self) -> Duration {
        self.idle
    }

    fn execute(&mut self) -> Result<()> {
        decrypt::load_image(&self.backends, &self.name, self.hook.as_ref())?;
        Ok(())
    }
}

/// Registers the sprite frames of an atlas
pub struct AtlasUnit {
    pub(crate) store: Arc<dyn SpriteFrameStore>,
    pub(crate) descriptor: String,
    pub(crate) idle: Duration,
}

impl LoadUnit for AtlasUnit {
    fn kind(&self) -> &'static str {
        "atlas"
    }

    fn label(&self) -> String {
        self.descriptor.clone()
    }

    fn idle_after(&self) -> Duration {
        self.idle
    }

    fn execute(&mut self) -> Result<()> {
        self.store.add_atlas(&self.descriptor, None)?;
        Ok(())
    }
}

/// Decrypts an atlas texture, then registers the atlas frames against it
pub struct EncryptedAtlasUnit {
    pub(crate) backends: Backends,
    pub(crate) descriptor: String,
    pub(crate) texture_name: String,
    pub(crate) hook: Option<DecryptHook>,
    pub(crate) idle: Duration,
}

impl LoadUnit for EncryptedAtlasUnit {
    fn kind(&self) -> &'static str {
        "encrypted_atlas"
    }

    fn label(&self) -> String {
        format!("{} + {}", self.descriptor, self.texture_name)
    }

    fn idle_after(&self) -> Duration {
        self.idle
    }

    fn execute(&mut self) -> Result<()> {
        decrypt::load_atlas(
            &self.backends,
            &self.descriptor,
            &self.texture_name,
            self.hook.as_ref(),
        )?;
        Ok(())
    }
}

/// Preloads background music or a sound effect
pub struct AudioUnit {
    pub(crate) store: Arc<dyn AudioStore>,
    pub(crate) name: String,
    pub(crate) audio_kind: AudioKind,
    pub(crate) idle: Duration,
}

impl LoadUnit for AudioUnit {
    fn kind(&self) -> &'static str {
        match self.audio_kind {
            AudioKind::Music => "music",
            AudioKind::Effect => "effect",
        }
    }

    fn label(&self) -> String {
        self.name.clone()
    }

    fn idle_after(&self) -> Duration {
        self.idle
    }

    fn execute(&mut self) -> Result<()> {
        self.store.preload(&self.name, self.audio_kind)?;
        Ok(())
    }
}

/// How long each frame of an animation is shown
#[derive(Debug, Clone, PartialEq)]
pub enum FrameDelays {
    /// Same delay for every frame
    Uniform(Duration),
    /// One delay per frame, in frame order
    PerFrame(Vec<Duration>),
}

/// Assembles an animation clip from sprite frames that are already registered.
///
/// Nothing happens if the animation store already has a clip under the name.
pub struct AnimationUnit {
    pub(crate) sprite_frames: Arc<dyn SpriteFrameStore>,
    pub(crate) animations: Arc<dyn AnimationStore>,
    pub(crate) name: String,
    pub(crate) frames: Vec<String>,
    pub(crate) delays: FrameDelays,
    pub(crate) restore_original_frame: bool,
    pub(crate) idle: Duration,
}

impl AnimationUnit {
    /// Check that the frame list and delays fit together
    pub fn validate(&self) -> Result<()> {
        if self.frames.is_empty() {
            return Err(LoaderError::Configuration(format!(
                "Animation '{}' has no frames",
                self.name
            )));
        }
        if let FrameDelays::PerFrame(delays) = &self.delays {
            if delays.len() != self.frames.len() {
                return Err(LoaderError::Configuration(format!(
                    "Animation '{}' has {} frames but {} delays",
                    self.name,
                    self.frames.len(),
                    delays.len()
                )));
            }
        }
        Ok(())
    }

    fn delay_at(&self, index: usize) -> Duration {
        match &self.delays {
            FrameDelays::Uniform(delay) => *delay,
            FrameDelays::PerFrame(delays) => delays[index],
        }
    }
}

impl LoadUnit for AnimationUnit {
    fn kind(&self) -> &'static str {
        "animation"
    }

    fn label(&self) -> String {
        format!("{} ({} frames)", self.name, self.frames.len())
    }

    fn idle_after(&self) -> Duration {
        self.idle
    }

    fn execute(&mut self) -> Result<()> {
        self.validate()?;

        if self.animations.contains(&self.name) {
            tracing::debug!("Animation {} already registered, skipping", self.name);
            return Ok(());
        }

        let mut frames = Vec::with_capacity(self.frames.len());
        for (index, frame_name) in self.frames.iter().enumerate() {
            let sprite_frame = self.sprite_frames.sprite_frame(frame_name).ok_or_else(|| {
                BackendError::MissingFrame {
                    animation: self.name.clone(),
                    frame: frame_name.clone(),
                }
            })?;
            frames.push(AnimationFrame {
                sprite_frame,
                delay: self.delay_at(index),
            });
        }

        self.animations.add_animation(
            &self.name,
            AnimationClip {
                frames,
                restore_original_frame: self.restore_original_frame,
            },
        )?;
        Ok(())
    }
}
