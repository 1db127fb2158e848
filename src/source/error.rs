use thiserror::Error;

/// Error raised while scanning or releasing an ordered source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// Reading the underlying file or stream failed.
    #[error("source io error: {0}")]
    Io(#[from] std::io::Error),
    /// A record could not be decoded.
    #[error("malformed record at byte {offset}: {error}")]
    Decode {
        /// Byte offset of the start of the malformed record.
        offset: u64,
        /// Decoder error.
        #[source]
        error: serde_json::Error,
    },
}
