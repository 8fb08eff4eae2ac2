//! Primitive parsing errors

use thiserror::Error;

/// Error parsing a fixed-size primitive from text
#[derive(Error, Debug, Clone)]
pub enum ParseError {
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),

    #[error("expected 32 bytes, got {0}")]
    WrongLength(usize),
}
