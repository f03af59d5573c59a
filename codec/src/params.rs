use crate::{CodecErr, FloatDtype, Result};

/// A fixed-shape tensor of model parameters, stored flat in row-major order.
///
/// Shapes never change over the system's lifetime; they are part of the
/// implicit wire schema.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f32>,
}

impl Tensor {
    /// Creates a zero-filled tensor of the given shape.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            data: vec![0.0; len],
        }
    }

    /// Creates a tensor from existing values.
    ///
    /// # Returns
    /// `ShapeMismatch` if `data` does not exactly fill `shape`.
    pub fn from_data(shape: Vec<usize>, data: Vec<f32>) -> Result<Self> {
        let expected = shape.iter().product();
        if data.len() != expected {
            return Err(CodecErr::ShapeMismatch {
                got: data.len(),
                expected,
            });
        }
        Ok(Self { shape, data })
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }
}

/// The ordered parameter set of a model.
///
/// Tensor order is invariant and is the only schema of the encoded byte
/// form: two programs interoperate exactly when they agree on the order,
/// shapes and external dtype.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameters(Vec<Tensor>);

impl Parameters {
    pub fn new(tensors: Vec<Tensor>) -> Self {
        Self(tensors)
    }

    pub fn tensors(&self) -> &[Tensor] {
        &self.0
    }

    pub fn tensors_mut(&mut self) -> &mut [Tensor] {
        &mut self.0
    }

    /// Total number of scalar values across all tensors.
    pub fn num_values(&self) -> usize {
        self.0.iter().map(Tensor::len).sum()
    }

    /// Encoded length in bytes for a given wire dtype. Constant for the
    /// lifetime of the parameter set.
    pub fn byte_len(&self, dtype: FloatDtype) -> usize {
        self.num_values() * dtype.width()
    }

    /// Sets every parameter element to zero, keeping shapes intact.
    pub fn zero(&mut self) {
        for tensor in &mut self.0 {
            tensor.data.fill(0.0);
        }
    }

    /// Encodes all tensors into a single byte buffer, in order, no padding.
    pub fn encode(&self, dtype: FloatDtype) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.byte_len(dtype));
        for tensor in &self.0 {
            for &value in &tensor.data {
                dtype.write(value, &mut buf);
            }
        }
        buf
    }

    /// Overwrites every parameter element from the encoded buffer.
    ///
    /// # Arguments
    /// * `bytes` - Must hold exactly `byte_len(dtype)` bytes.
    /// * `dtype` - The external wire dtype.
    ///
    /// # Returns
    /// `PayloadTooShort` or `TrailingBytes` if the buffer length does not
    /// match the parameter set exactly.
    pub fn decode_from(&mut self, bytes: &[u8], dtype: FloatDtype) -> Result<()> {
        self.consume(bytes, dtype, |dst, value| *dst = value)
    }

    /// Adds `weight * value` into every parameter element in place.
    ///
    /// This is the building block of weighted global averaging: the caller
    /// zeroes the destination once, then folds each contribution in without
    /// allocating per-sender tensors. Same exact-length contract as
    /// [`Parameters::decode_from`].
    pub fn accumulate_weighted(
        &mut self,
        bytes: &[u8],
        dtype: FloatDtype,
        weight: f32,
    ) -> Result<()> {
        self.consume(bytes, dtype, |dst, value| *dst += weight * value)
    }

    fn consume(
        &mut self,
        bytes: &[u8],
        dtype: FloatDtype,
        mut fold: impl FnMut(&mut f32, f32),
    ) -> Result<()> {
        let expected = self.byte_len(dtype);
        if bytes.len() < expected {
            return Err(CodecErr::PayloadTooShort {
                got: bytes.len(),
                expected,
            });
        }
        if bytes.len() > expected {
            return Err(CodecErr::TrailingBytes {
                got: bytes.len(),
                expected,
            });
        }

        let width = dtype.width();
        let mut chunks = bytes.chunks_exact(width);
        for tensor in &mut self.0 {
            for dst in &mut tensor.data {
                // Cannot run dry: the length check above is exact.
                if let Some(chunk) = chunks.next() {
                    fold(dst, dtype.read(chunk));
                }
            }
        }
        Ok(())
    }
}

/// Encodes a flat statistic vector (shape `(1, len)`).
pub fn encode_vector(values: &[f32], dtype: FloatDtype) -> Vec<u8> {
    let mut buf = Vec::with_capacity(values.len() * dtype.width());
    for &value in values {
        dtype.write(value, &mut buf);
    }
    buf
}

/// Decodes a flat statistic vector of a known length.
///
/// # Returns
/// `PayloadTooShort` or `TrailingBytes` if `bytes` is not exactly
/// `expected_len * dtype.width()` bytes long.
pub fn decode_vector(bytes: &[u8], dtype: FloatDtype, expected_len: usize) -> Result<Vec<f32>> {
    let expected = expected_len * dtype.width();
    if bytes.len() < expected {
        return Err(CodecErr::PayloadTooShort {
            got: bytes.len(),
            expected,
        });
    }
    if bytes.len() > expected {
        return Err(CodecErr::TrailingBytes {
            got: bytes.len(),
            expected,
        });
    }
    Ok(bytes.chunks_exact(dtype.width()).map(|c| dtype.read(c)).collect())
}
