use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecoderError {
    #[error("ignition channel {0} out of range (1..={1})")]
    ChannelOutOfRange(u8, u8),
    #[error("{given} end angles supplied for {channels} ignition channels")]
    TooManyEndAngles { given: usize, channels: u8 },
    #[error("edge pump disconnected")]
    Disconnected,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing wheel pattern")]
    MissingWheel,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
