mod components;
mod messages;
mod plugin;
mod resources;
mod systems;

pub use components::*;
pub use messages::*;
pub use plugin::*;
pub use resources::*;
pub use systems::*;
