//! Byte-level codec for model parameters and statistic vectors.
//!
//! The wire format is the raw concatenation of every tensor's values in
//! parameter order, each element cast to a fixed external float width.
//! There is no header and no length prefix: the expected parameter shapes
//! on the receiving side are the entire schema. Tensor order must therefore
//! match exactly between sender and receiver.

mod dtype;
mod error;
mod params;

pub use dtype::FloatDtype;
pub use error::{CodecErr, Result};
pub use params::{Parameters, Tensor, decode_vector, encode_vector};
