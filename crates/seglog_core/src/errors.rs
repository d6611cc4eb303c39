use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegError {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    SerdeJson(#[from] serde_json::Error),

    /// Nothing left to read, or no room left to write. Returned both for the
    /// last-entry lookup on an empty index and for a write into a full one.
    #[error("EOF")]
    Eof,

    #[error("offset {0} out of range")]
    OffsetOutOfRange(u64),

    #[error("index entry {0} out of range")]
    IndexOutOfRange(i64),

    #[error("store position {0} out of range")]
    PositionOutOfRange(u64),

    #[error("record too large: {0} bytes")]
    RecordTooLarge(usize),

    #[error("Unsupported record version {0}")]
    BadVersion(u8),

    #[error("Corrupt record")]
    Corrupt,

    #[error("Invalid config: {0}")]
    InvalidConfig(String),
}

impl SegError {
    pub fn is_eof(&self) -> bool {
        matches!(self, SegError::Eof)
    }
}

pub type Result<T> = std::result::Result<T, SegError>;
