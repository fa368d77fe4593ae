use thiserror::Error;

#[derive(Debug, Error)]
pub enum HwError {
    #[error("gpio error: {0}")]
    Gpio(String),
    #[error("invalid simulation: {0}")]
    InvalidSim(&'static str),
}

pub type Result<T> = std::result::Result<T, HwError>;
