use thiserror::Error;

#[derive(Debug, Error)]
pub enum MdfError {
    #[error("Buffer too small at {file}:{line}: need at least {expected} bytes, got {actual}")]
    TooShortBuffer {
        actual:   usize,
        expected: usize,
        file:     &'static str,
        line:     u32,
    },

    #[error(r#"Invalid file identifier: Expected "MDF     ", found {0}"#)]
    FileIdentifierError(String),

    #[error("File version not handled: Expected 3.00 to 3.33, found {0}")]
    FileVersioningError(u16),

    #[error("Invalid block identifier: Expected {expected:?}, got {actual:?}")]
    BlockIDError {
        actual: String,
        expected: String,
    },

    #[error("Invalid file handling")]
    IOError(#[from] std::io::Error),

    #[error("Invalid record layout for channel {channel:?}: {reason}")]
    SchemaError {
        channel: String,
        reason: String,
    },

    #[error("Failed to decode record {record_index} for channel {channel:?}: {reason}")]
    DecodeError {
        record_index: usize,
        channel: String,
        reason: String,
    },

    #[error("Record ID {0} has no registered channel group")]
    UnknownRecordID(u8),

    #[error("Conversion parameters for channel {0:?} satisfy no formula branch")]
    InvalidConversion(String),

    #[error("Formula conversion for channel {channel:?} cannot be evaluated: {reason}")]
    FeatureUnavailable {
        channel: String,
        reason: String,
    },

    #[error("Channel {channel:?} has a sample type the writer cannot emit: {dtype}")]
    UnsupportedDtype {
        channel: String,
        dtype: String,
    },

    #[error("Block serialization error: {0}")]
    BlockSerializationError(String),
}

impl MdfError {
    /// Attach a channel name to a layout error raised below the channel level.
    pub(crate) fn for_channel(self, name: &str) -> Self {
        match self {
            MdfError::SchemaError { reason, .. } => MdfError::SchemaError {
                channel: name.to_string(),
                reason,
            },
            other => other,
        }
    }
}
