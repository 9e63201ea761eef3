/// Errors that can occur during media operations
#[derive(thiserror::Error, Debug)]
pub enum MediaError {
    /// D-Bus communication error
    #[error("D-Bus operation failed: {0}")]
    DbusError(#[from] zbus::Error),

    /// A property read from the player faulted
    #[error("failed to fetch {property}: {source}")]
    PropertyFetchFailed {
        /// Property (or property set) that could not be read
        property: String,
        /// Underlying D-Bus fault
        source: zbus::Error,
    },

    /// Failed to initialize the registry or a player
    #[error("initialization failed: {0}")]
    InitializationFailed(String),
}
