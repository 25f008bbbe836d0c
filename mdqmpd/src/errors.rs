use thiserror::Error;

/// MPD ACK code for "no such object" (`ACK_ERROR_NO_EXIST`).
pub const ACK_ERROR_NO_EXIST: u32 = 50;
/// MPD ACK code for "object already exists" (`ACK_ERROR_EXIST`).
pub const ACK_ERROR_EXIST: u32 = 56;

#[derive(Error, Debug)]
pub enum MpdError {
    #[error("I/O error talking to MPD: {0}")]
    Io(#[from] std::io::Error),
    /// An `ACK` response from the server.
    #[error("MPD rejected `{command}`: {message} (error {code})")]
    Server {
        code: u32,
        command: String,
        message: String,
    },
    #[error("malformed MPD response: {0}")]
    Protocol(String),
}

impl MpdError {
    /// True when the server reported that the addressed object (playlist,
    /// partition, ...) does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, MpdError::Server { code, .. } if *code == ACK_ERROR_NO_EXIST)
    }

    /// True when the server reported that the object already exists.
    pub fn is_exists(&self) -> bool {
        matches!(self, MpdError::Server { code, .. } if *code == ACK_ERROR_EXIST)
    }
}
