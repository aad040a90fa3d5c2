use thiserror::Error;

/// Errors that can occur while building or draining a load queue
#[derive(Error, Debug)]
pub enum LoaderError {
    /// The queue was modified, or the scheduler started, in a state that forbids it
    #[error("Queue state error: {0}")]
    QueueState(String),

    /// A unit's backend operation failed
    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    /// Malformed unit parameters or manifest entries
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Unit index outside the queue
    #[error("Unit index {index} out of bounds for queue of length {len}")]
    IndexOutOfBounds { index: usize, len: usize },
}

/// Failures raised by backend registries while a unit executes
#[derive(Error, Debug)]
pub enum BackendError {
    /// The asset source has nothing under this name
    #[error("Asset not found: {name}")]
    NotFound { name: String },

    /// Reading the raw asset failed
    #[error("Failed to read '{name}': {message}")]
    Io { name: String, message: String },

    /// The decrypt hook rejected the data
    #[error("Decrypt failed for '{name}': {message}")]
    Decrypt { name: String, message: String },

    /// The backend could not decode the data
    #[error("Decode failed for '{name}': {message}")]
    Decode { name: String, message: String },

    /// An animation references a sprite frame that is not registered
    #[error("Sprite frame '{frame}' not found for animation '{animation}'")]
    MissingFrame { animation: String, frame: String },
}

pub type Result<T> = std::result::Result<T, LoaderError>;
