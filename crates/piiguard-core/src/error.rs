use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Unsupported file type: {0}")]
    UnsupportedFile(String),

    #[error("File is empty: {0}")]
    EmptyFile(String),

    #[error("File too large: {name} ({size} bytes, limit {limit})")]
    FileTooLarge {
        name: String,
        size: usize,
        limit: usize,
    },

    #[error("Malformed analysis response: {0}")]
    MalformedResponse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
