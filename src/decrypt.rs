//! Decrypt hooks for encrypted image and atlas assets.
//!
//! The loader never knows the cipher. A hook receives the raw bytes read from
//! the asset source and returns the plain bytes handed to the texture store.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::backend::{Backends, TextureId};
use crate::{BackendError, LoaderError, Result};

/// Error message type returned by decrypt hooks
pub type DecryptError = String;

/// A decrypt routine: raw bytes in, plain bytes out
pub type DecryptFn = dyn Fn(&[u8]) -> std::result::Result<Vec<u8>, DecryptError> + Send + Sync;

/// Shared handle to a decrypt routine
#[derive(Clone)]
pub struct DecryptHook(Arc<DecryptFn>);

impl DecryptHook {
    /// Wrap a decrypt function
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&[u8]) -> std::result::Result<Vec<u8>, DecryptError> + Send + Sync + 'static,
    {
        Self(Arc::new(f))
    }

    /// XOR every byte with a repeating key.
    ///
    /// Not a cipher worth trusting, but enough to keep assets from being
    /// opened directly and handy in tests.
    pub fn xor(key: impl Into<Vec<u8>>) -> Self {
        let key = key.into();
        Self::new(move |data| {
            if key.is_empty() {
                return Err("empty xor key".to_string());
            }
            Ok(data
                .iter()
                .zip(key.iter().cycle())
                .map(|(b, k)| b ^ k)
                .collect())
        })
    }

    /// Run the hook over `data`
    pub fn decrypt(&self, data: &[u8]) -> std::result::Result<Vec<u8>, DecryptError> {
        (self.0)(data)
    }
}

impl fmt::Debug for DecryptHook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("DecryptHook")
    }
}

/// Read `name` from the asset source and decrypt it with `hook`.
///
/// Without a hook the raw bytes are returned unchanged. The raw buffer is
/// dropped before returning in both cases.
pub fn read_decrypted(
    backends: &Backends,
    name: &str,
    hook: Option<&DecryptHook>,
) -> std::result::Result<Vec<u8>, BackendError> {
    let raw = backends.source.read(name)?;
    match hook {
        Some(hook) => {
            let plain = hook.decrypt(&raw).map_err(|message| BackendError::Decrypt {
                name: name.to_string(),
                message,
            })?;
            tracing::debug!(
                "Decrypted {} ({} -> {} bytes)",
                name,
                raw.len(),
                plain.len()
            );
            Ok(plain)
        }
        None => Ok(raw),
    }
}

/// Load an encrypted image into the texture store right away
pub fn load_image(backends: &Backends, name: &str, hook: Option<&DecryptHook>) -> Result<TextureId> {
    let data = read_decrypted(backends, name, hook)?;
    Ok(backends.textures.add_image_data(name, &data)?)
}

/// Load an atlas whose texture is encrypted right away.
///
/// The descriptor itself is read in plain form by the sprite frame store.
pub fn load_atlas(
    backends: &Backends,
    descriptor: &str,
    texture_name: &str,
    hook: Option<&DecryptHook>,
) -> Result<TextureId> {
    let texture = load_image(backends, texture_name, hook)?;
    backends.sprite_frames.add_atlas(descriptor, Some(texture))?;
    Ok(texture)
}

/// Named decrypt hooks that manifests can refer to
#[derive(Debug, Clone, Default)]
pub struct DecryptRegistry {
    hooks: HashMap<String, DecryptHook>,
}

impl DecryptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a hook (builder style)
    pub fn with_hook(mut self, name: impl Into<String>, hook: DecryptHook) -> Self {
        self.hooks.insert(name.into(), hook);
        self
    }

    /// Register a hook
    pub fn insert(&mut self, name: impl Into<String>, hook: DecryptHook) {
        self.hooks.insert(name.into(), hook);
    }

    /// Resolve an optional hook name
    pub fn resolve(&self, name: Option<&str>) -> Result<Option<DecryptHook>> {
        match name {
            None => Ok(None),
            Some(name) => self.hooks.get(name).cloned().map(Some).ok_or_else(|| {
                let mut known: Vec<&str> = self.hooks.keys().map(String::as_str).collect();
                known.sort_unstable();
                LoaderError::Configuration(format!(
                    "Unknown decrypt hook: '{}'. Registered hooks: {:?}",
                    name, known
                ))
            }),
        }
    }
}
