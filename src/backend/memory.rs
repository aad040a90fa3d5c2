use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use super::{
    AnimationClip, AnimationStore, AssetSource, AudioKind, AudioStore, BackendResult, Backends,
    SpriteFrameId, SpriteFrameStore, StringTableStore, TextureId, TextureStore,
};
use crate::BackendError;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // Poisoned maps are still structurally valid.
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn read_text(source: &dyn AssetSource, name: &str) -> BackendResult<String> {
    let bytes = source.read(name)?;
    String::from_utf8(bytes).map_err(|e| BackendError::Decode {
        name: name.to_string(),
        message: e.to_string(),
    })
}

/// In-memory asset source for tests and embedded assets
#[derive(Default)]
pub struct MemoryAssetSource {
    assets: Mutex<HashMap<String, Vec<u8>>>,
    reads: AtomicUsize,
}

impl MemoryAssetSource {
    /// Create an empty source
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an asset (builder style)
    pub fn with_asset(self, name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        self.insert(name, data);
        self
    }

    /// Add or replace an asset
    pub fn insert(&self, name: impl Into<String>, data: impl Into<Vec<u8>>) {
        lock(&self.assets).insert(name.into(), data.into());
    }

    /// Number of successful reads so far
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::Relaxed)
    }
}

impl AssetSource for MemoryAssetSource {
    fn source_type(&self) -> &'static str {
        "memory"
    }

    fn read(&self, name: &str) -> BackendResult<Vec<u8>> {
        let data = lock(&self.assets)
            .get(name)
            .cloned()
            .ok_or_else(|| BackendError::NotFound {
                name: name.to_string(),
            })?;
        self.reads.fetch_add(1, Ordering::Relaxed);
        Ok(data)
    }

    fn exists(&self, name: &str) -> bool {
        lock(&self.assets).contains_key(name)
    }
}

/// String tables read from `key=value` lines.
///
/// Blank lines and lines starting with `#` are ignored.
pub struct MemoryStringStore {
    source: Arc<dyn AssetSource>,
    tables: Mutex<HashMap<String, HashMap<String, String>>>,
}

impl MemoryStringStore {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            tables: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a localized string
    pub fn get(&self, language: &str, key: &str) -> Option<String> {
        lock(&self.tables)
            .get(language)
            .and_then(|table| table.get(key))
            .cloned()
    }

    /// Number of entries loaded for a language
    pub fn len(&self, language: &str) -> usize {
        lock(&self.tables).get(language).map_or(0, HashMap::len)
    }

    fn parse(path: &str, text: &str) -> BackendResult<Vec<(String, String)>> {
        let mut entries = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| BackendError::Decode {
                name: path.to_string(),
                message: format!("line {} has no '='", line_no + 1),
            })?;
            entries.push((key.trim().to_string(), value.trim().to_string()));
        }
        Ok(entries)
    }
}

impl StringTableStore for MemoryStringStore {
    fn add_strings(&self, language: &str, path: &str, merge: bool) -> BackendResult<()> {
        let text = read_text(self.source.as_ref(), path)?;
        let entries = Self::parse(path, &text)?;

        let mut tables = lock(&self.tables);
        let table = tables.entry(language.to_string()).or_default();
        if !merge {
            table.clear();
        }
        tracing::debug!(
            "Loaded {} strings for '{}' from {} (merge: {})",
            entries.len(),
            language,
            path,
            merge
        );
        table.extend(entries);
        Ok(())
    }
}

/// Texture cache that keeps the encoded bytes of each image
pub struct MemoryTextureCache {
    source: Arc<dyn AssetSource>,
    textures: Mutex<HashMap<String, (TextureId, Vec<u8>)>>,
    next_id: AtomicU32,
}

impl MemoryTextureCache {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            textures: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(0),
        }
    }

    /// Bytes registered for a texture
    pub fn data(&self, name: &str) -> Option<Vec<u8>> {
        lock(&self.textures).get(name).map(|(_, data)| data.clone())
    }

    /// Number of registered textures
    pub fn len(&self) -> usize {
        lock(&self.textures).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TextureStore for MemoryTextureCache {
    fn add_image(&self, name: &str) -> BackendResult<TextureId> {
        if let Some(id) = self.texture(name) {
            return Ok(id);
        }
        let data = self.source.read(name)?;
        self.add_image_data(name, &data)
    }

    fn add_image_data(&self, name: &str, data: &[u8]) -> BackendResult<TextureId> {
        if data.is_empty() {
            return Err(BackendError::Decode {
                name: name.to_string(),
                message: "empty image data".to_string(),
            });
        }

        let mut textures = lock(&self.textures);
        let id = match textures.get(name) {
            Some((id, _)) => *id,
            None => TextureId(self.next_id.fetch_add(1, Ordering::Relaxed)),
        };
        textures.insert(name.to_string(), (id, data.to_vec()));
        Ok(id)
    }

    fn texture(&self, name: &str) -> Option<TextureId> {
        lock(&self.textures).get(name).map(|(id, _)| *id)
    }
}

/// Sprite frame cache fed by atlas descriptors listing one frame name per line
pub struct MemorySpriteFrameCache {
    source: Arc<dyn AssetSource>,
    frames: Mutex<HashMap<String, (SpriteFrameId, Option<TextureId>)>>,
    next_id: AtomicU32,
}

impl MemorySpriteFrameCache {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            frames: Mutex::new(HashMap::new()),
            next_id: AtomicU32::new(0),
        }
    }

    /// Register a single frame without an atlas
    pub fn register_frame(&self, name: impl Into<String>) -> SpriteFrameId {
        let id = SpriteFrameId(self.next_id.fetch_add(1, Ordering::Relaxed));
        lock(&self.frames).insert(name.into(), (id, None));
        id
    }

    /// Texture a frame is bound to, if any
    pub fn frame_texture(&self, name: &str) -> Option<TextureId> {
        lock(&self.frames).get(name).and_then(|(_, texture)| *texture)
    }

    /// Number of registered frames
    pub fn len(&self) -> usize {
        lock(&self.frames).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SpriteFrameStore for MemorySpriteFrameCache {
    fn add_atlas(&self, descriptor: &str, texture: Option<TextureId>) -> BackendResult<()> {
        let text = read_text(self.source.as_ref(), descriptor)?;

        let mut frames = lock(&self.frames);
        let mut added = 0usize;
        for name in text.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let id = match frames.get(name) {
                Some((id, _)) => *id,
                None => SpriteFrameId(self.next_id.fetch_add(1, Ordering::Relaxed)),
            };
            frames.insert(name.to_string(), (id, texture));
            added += 1;
        }
        tracing::debug!("Atlas {} registered {} sprite frames", descriptor, added);
        Ok(())
    }

    fn sprite_frame(&self, name: &str) -> Option<SpriteFrameId> {
        lock(&self.frames).get(name).map(|(id, _)| *id)
    }
}

/// Animation cache
#[derive(Default)]
pub struct MemoryAnimationCache {
    clips: Mutex<HashMap<String, AnimationClip>>,
    adds: AtomicUsize,
}

impl MemoryAnimationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a copy of a registered clip
    pub fn get(&self, name: &str) -> Option<AnimationClip> {
        lock(&self.clips).get(name).cloned()
    }

    /// How many times a clip has been registered, duplicates included
    pub fn add_count(&self) -> usize {
        self.adds.load(Ordering::Relaxed)
    }
}

impl AnimationStore for MemoryAnimationCache {
    fn contains(&self, name: &str) -> bool {
        lock(&self.clips).contains_key(name)
    }

    fn add_animation(&self, name: &str, clip: AnimationClip) -> BackendResult<()> {
        lock(&self.clips).insert(name.to_string(), clip);
        self.adds.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// Audio store that records which assets were preloaded
pub struct MemoryAudioStore {
    source: Arc<dyn AssetSource>,
    preloaded: Mutex<HashMap<String, AudioKind>>,
}

impl MemoryAudioStore {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self {
            source,
            preloaded: Mutex::new(HashMap::new()),
        }
    }

    /// Kind an asset was preloaded as
    pub fn preloaded(&self, name: &str) -> Option<AudioKind> {
        lock(&self.preloaded).get(name).copied()
    }
}

impl AudioStore for MemoryAudioStore {
    fn preload(&self, name: &str, kind: AudioKind) -> BackendResult<()> {
        if !self.source.exists(name) {
            return Err(BackendError::NotFound {
                name: name.to_string(),
            });
        }
        lock(&self.preloaded).insert(name.to_string(), kind);
        Ok(())
    }
}

/// All in-memory registries sharing one asset source
pub struct MemoryBackends {
    pub source: Arc<dyn AssetSource>,
    pub strings: Arc<MemoryStringStore>,
    pub textures: Arc<MemoryTextureCache>,
    pub sprite_frames: Arc<MemorySpriteFrameCache>,
    pub animations: Arc<MemoryAnimationCache>,
    pub audio: Arc<MemoryAudioStore>,
}

impl MemoryBackends {
    /// Create registries over an empty in-memory source
    pub fn new() -> Self {
        Self::with_source(Arc::new(MemoryAssetSource::new()))
    }

    /// Create registries reading from `source`
    pub fn with_source(source: Arc<dyn AssetSource>) -> Self {
        Self {
            strings: Arc::new(MemoryStringStore::new(source.clone())),
            textures: Arc::new(MemoryTextureCache::new(source.clone())),
            sprite_frames: Arc::new(MemorySpriteFrameCache::new(source.clone())),
            animations: Arc::new(MemoryAnimationCache::new()),
            audio: Arc::new(MemoryAudioStore::new(source.clone())),
            source,
        }
    }

    /// Type-erased handles for load units
    pub fn backends(&self) -> Backends {
        Backends::new(
            self.source.clone(),
            self.strings.clone(),
            self.textures.clone(),
            self.sprite_frames.clone(),
            self.animations.clone(),
            self.audio.clone(),
        )
    }
}

impl Default for MemoryBackends {
    fn default() -> Self {
        Self::new()
    }
}
