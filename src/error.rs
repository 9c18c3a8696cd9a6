use thiserror::Error;

#[derive(Error, Debug)]
pub enum BootError {
    #[error("Communication error: {0}")]
    Communication(String),

    #[error("Short response: expected {expected} bytes, received {received}")]
    ShortResponse { expected: usize, received: usize },

    #[error("Timed out waiting for {expected:?} from target")]
    HandshakeTimeout { expected: char },

    #[error("Wait for target cancelled")]
    Cancelled,

    #[error("Loader error: {0}")]
    LoaderError(String),

    #[error("Checksum mismatch: host computed {expected:#04x}, target reported {received:#04x}")]
    ChecksumMismatch { expected: u8, received: u8 },

    #[error("Unexpected response: {0}")]
    UnexpectedResponse(String),
}

pub type BootResult<T> = std::result::Result<T, BootError>;
