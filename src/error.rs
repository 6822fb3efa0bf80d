use thiserror::Error;

use crate::session::SessionState;

/// Library error type for kiosk operations.
#[derive(Debug, Error)]
pub enum Error {
    /// The configured photo library is missing or not a directory.
    #[error("invalid photo directory: {0}")]
    BadDir(String),

    /// Discovery completed but found no images; nothing can be preloaded.
    #[error("no images found in the photo library")]
    EmptyCatalog,

    /// Preload tuning values that would break the frame window.
    #[error("invalid preload options: {0}")]
    InvalidOptions(String),

    /// A session lifecycle call was made from a state that does not allow it.
    #[error("cannot {action} a session that is {from:?}")]
    Lifecycle {
        from: SessionState,
        action: &'static str,
    },

    /// Underlying IO error.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
