use thiserror::Error;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Attachment hash mismatch: ciphertext does not match its sha256")]
    HashMismatch,

    #[error("Invalid attachment key: {0}")]
    InvalidKey(String),

    #[error("Invalid attachment iv: {0}")]
    InvalidIv(String),

    #[error("Invalid attachment hash: {0}")]
    InvalidHash(String),
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ContentUriError {
    #[error("Content URI must start with mxc://: {0}")]
    WrongScheme(String),

    #[error("Content URI is missing its server name: {0}")]
    MissingServer(String),

    #[error("Content URI is missing its media id: {0}")]
    MissingMediaId(String),
}
