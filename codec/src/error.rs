use std::{error::Error, fmt};

/// The codec module's result type.
pub type Result<T> = std::result::Result<T, CodecErr>;

/// Byte-level decoding failures. Both variants are length violations of the
/// exact-length wire contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecErr {
    PayloadTooShort {
        got: usize,
        expected: usize,
    },
    TrailingBytes {
        got: usize,
        expected: usize,
    },
    ShapeMismatch {
        got: usize,
        expected: usize,
    },
}

impl fmt::Display for CodecErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CodecErr::PayloadTooShort { got, expected } => {
                write!(f, "payload too short: got {got} bytes, expected {expected}")
            }
            CodecErr::TrailingBytes { got, expected } => {
                write!(
                    f,
                    "payload too long: got {got} bytes, expected exactly {expected}"
                )
            }
            CodecErr::ShapeMismatch { got, expected } => {
                write!(f, "data length {got} does not fill the shape of {expected}")
            }
        }
    }
}

impl Error for CodecErr {}
