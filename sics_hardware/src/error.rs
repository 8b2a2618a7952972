use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("serial port error: {0}")]
    Serial(String),
    #[error("transport not open")]
    NotOpen,
    #[error("transport already open")]
    AlreadyOpen,
    #[error("device not responding")]
    Unplugged,
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, HwError>;
