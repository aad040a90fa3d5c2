mod file;
mod memory;

pub use file::*;
pub use memory::*;

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

use crate::BackendError;

/// Result type for backend registry operations
pub type BackendResult<T> = std::result::Result<T, BackendError>;

/// Handle to a texture registered in a [`TextureStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TextureId(pub u32);

/// Handle to a sprite frame registered in a [`SpriteFrameStore`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SpriteFrameId(pub u32);

/// One frame of an assembled animation
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationFrame {
    pub sprite_frame: SpriteFrameId,
    pub delay: Duration,
}

/// An animation assembled from already registered sprite frames
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    pub frames: Vec<AnimationFrame>,
    /// Show the sprite's original frame again when playback ends
    pub restore_original_frame: bool,
}

impl AnimationClip {
    /// Total playback time of one loop
    pub fn duration(&self) -> Duration {
        self.frames.iter().map(|f| f.delay).sum()
    }
}

/// Kind of audio asset to preload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AudioKind {
    /// Streamed background music
    Music,
    /// Short sound effect kept fully in memory
    Effect,
}

/// Source of raw asset bytes
pub trait AssetSource: Send + Sync {
    /// Get the source type identifier (e.g., "memory", "file")
    fn source_type(&self) -> &'static str;

    /// Read the full contents of an asset
    fn read(&self, name: &str) -> BackendResult<Vec<u8>>;

    /// Whether an asset with this name exists
    fn exists(&self, name: &str) -> bool;
}

/// Localized string tables, keyed by language code
pub trait StringTableStore: Send + Sync {
    /// Load the table at `path` for `language`.
    ///
    /// With `merge` the new entries are added on top of the current table,
    /// otherwise they replace it.
    fn add_strings(&self, language: &str, path: &str, merge: bool) -> BackendResult<()>;
}

/// Decoded textures, keyed by asset name
pub trait TextureStore: Send + Sync {
    /// Load and decode the image `name` through the store's own source
    fn add_image(&self, name: &str) -> BackendResult<TextureId>;

    /// Decode already loaded image bytes and register them under `name`
    fn add_image_data(&self, name: &str, data: &[u8]) -> BackendResult<TextureId>;

    /// Look up a registered texture
    fn texture(&self, name: &str) -> Option<TextureId>;
}

/// Sprite frames registered from atlas descriptors
pub trait SpriteFrameStore: Send + Sync {
    /// Register every frame listed in `descriptor`.
    ///
    /// With `texture` the frames are bound to that texture instead of the one
    /// the descriptor names.
    fn add_atlas(&self, descriptor: &str, texture: Option<TextureId>) -> BackendResult<()>;

    /// Look up a registered sprite frame
    fn sprite_frame(&self, name: &str) -> Option<SpriteFrameId>;
}

/// Named animation clips
pub trait AnimationStore: Send + Sync {
    /// Whether a clip is registered under `name`
    fn contains(&self, name: &str) -> bool;

    /// Register a clip, replacing any previous one with the same name
    fn add_animation(&self, name: &str, clip: AnimationClip) -> BackendResult<()>;
}

/// Preloaded music and sound effects
pub trait AudioStore: Send + Sync {
    /// Preload the audio asset `name`
    fn preload(&self, name: &str, kind: AudioKind) -> BackendResult<()>;
}

/// The set of backend registries load units write into
#[derive(Clone)]
pub struct Backends {
    pub source: Arc<dyn AssetSource>,
    pub strings: Arc<dyn StringTableStore>,
    pub textures: Arc<dyn TextureStore>,
    pub sprite_frames: Arc<dyn SpriteFrameStore>,
    pub animations: Arc<dyn AnimationStore>,
    pub audio: Arc<dyn AudioStore>,
}

impl Backends {
    /// Bundle backend registries
    pub fn new(
        source: Arc<dyn AssetSource>,
        strings: Arc<dyn StringTableStore>,
        textures: Arc<dyn TextureStore>,
        sprite_frames: Arc<dyn SpriteFrameStore>,
        animations: Arc<dyn AnimationStore>,
        audio: Arc<dyn AudioStore>,
    ) -> Self {
        Self {
            source,
            strings,
            textures,
            sprite_frames,
            animations,
            audio,
        }
    }
}

impl std::fmt::Debug for Backends {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Backends")
            .field("source", &self.source.source_type())
            .finish_non_exhaustive()
    }
}
