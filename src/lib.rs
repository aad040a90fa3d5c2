//! A cooperative, frame-sliced asset loader.
//!
//! Loading work is split into small synchronous units (a string table, an
//! image, an atlas, an animation, an audio preload) that a [`Scheduler`]
//! executes one per frame, with an idle pause between units so the frame
//! loop never stalls. Backends are injected as trait objects; in-memory and
//! filesystem implementations are included, and the optional `bevy` feature
//! drives schedulers from Bevy's frame time.

#[cfg(feature = "bevy")]
pub mod bevy_plugin;
pub mod backend;
pub mod config;
pub mod decrypt;
pub mod error;
pub mod listener;
pub mod scheduler;
pub mod unit;

pub use backend::*;
pub use config::*;
pub use decrypt::{DecryptHook, DecryptRegistry};
pub use error::*;
pub use listener::*;
pub use scheduler::*;
pub use unit::*;
