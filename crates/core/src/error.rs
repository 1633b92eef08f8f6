/// Result alias that carries the custom [`SyncError`] type.
pub type Result<T> = std::result::Result<T, SyncError>;

/// Common error type for the core crate.
///
/// None of these are recovered locally. Whatever fails first ends the run and
/// is handed back to the caller.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// The timeline payload was malformed or carried out-of-range values.
    #[error("invalid update ({reason}): {payload}")]
    Decode { reason: String, payload: String },
    /// The lighting provider could not enumerate its lights.
    #[error("lighting provider failed: {0}")]
    Provider(String),
    /// A single light rejected or failed a state change.
    #[error("light `{light}` failed: {message}")]
    Device { light: String, message: String },
    /// The timeline data could not be fetched.
    #[error("could not retrieve timeline data: {0}")]
    Retrieval(String),
    /// The configuration store is missing entries or holds the wrong shape.
    #[error("configuration error: {0}")]
    Config(String),
    /// Free-form message for the command line layer.
    #[error("{0}")]
    Message(String),
    /// Wrapper around standard IO errors.
    #[error("{0}")]
    Io(#[from] std::io::Error),
}

impl SyncError {
    /// Creates a new error that simply wraps the provided message.
    pub fn msg<T: Into<String>>(msg: T) -> Self {
        Self::Message(msg.into())
    }

    pub(crate) fn decode(reason: impl Into<String>, payload: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
            payload: payload.into(),
        }
    }

    pub(crate) fn device(light: impl Into<String>, message: impl ToString) -> Self {
        Self::Device {
            light: light.into(),
            message: message.to_string(),
        }
    }
}

impl From<&str> for SyncError {
    fn from(value: &str) -> Self {
        Self::msg(value)
    }
}

impl From<String> for SyncError {
    fn from(value: String) -> Self {
        Self::Message(value)
    }
}
