use thiserror::Error;

#[derive(Debug, Error)]
pub enum SpritePackError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    #[error("Invalid bin dimensions: {width}x{height}")]
    InvalidDimensions { width: u32, height: u32 },
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Unknown export format: {0}")]
    UnknownExportFormat(String),
    #[error("Nothing to pack")]
    Empty,
    #[error("Encoding error: {0}")]
    Encode(String),
}

pub type Result<T> = std::result::Result<T, SpritePackError>;
