use thiserror::Error;

#[derive(Error, Debug)]
pub enum FactoryError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Backend failed to produce the base concept image")]
    MissingBaseImage,

    #[error("Invalid image payload: {0}")]
    InvalidPayload(String),

    #[error("Unknown production line: {0}")]
    UnknownRow(usize),

    #[error("Line {row} has no scene {scene}")]
    UnknownScene { row: usize, scene: usize },

    #[error("No line has all three input images")]
    NoEligibleRows,

    #[error("A batch run is already in progress")]
    BatchAlreadyRunning,

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Host capability error: {0}")]
    Host(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Base64 decoding error: {0}")]
    Decode(#[from] base64::DecodeError),

    #[error("Archive error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

pub type Result<T> = std::result::Result<T, FactoryError>;
