use half::f16;

/// External wire width of a single floating point element.
///
/// Values are computed internally as `f32` and cast to this dtype at the
/// byte boundary, host-endian. Both sides of a transfer must agree on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FloatDtype {
    F16,
    F32,
    F64,
}

impl FloatDtype {
    /// Builds a dtype from a bit width.
    ///
    /// # Arguments
    /// * `bits` - One of 16, 32 or 64.
    ///
    /// # Returns
    /// `None` if the bit width maps to no supported float type.
    pub fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            16 => Some(Self::F16),
            32 => Some(Self::F32),
            64 => Some(Self::F64),
            _ => None,
        }
    }

    /// Returns the width of one encoded element in bytes.
    pub fn width(self) -> usize {
        match self {
            Self::F16 => 2,
            Self::F32 => 4,
            Self::F64 => 8,
        }
    }

    /// Appends one element to `buf` in this dtype's encoding.
    pub(crate) fn write(self, value: f32, buf: &mut Vec<u8>) {
        match self {
            Self::F16 => buf.extend_from_slice(bytemuck::bytes_of(&f16::from_f32(value))),
            Self::F32 => buf.extend_from_slice(bytemuck::bytes_of(&value)),
            Self::F64 => buf.extend_from_slice(bytemuck::bytes_of(&(value as f64))),
        }
    }

    /// Reads one element from a chunk of exactly `self.width()` bytes.
    pub(crate) fn read(self, chunk: &[u8]) -> f32 {
        match self {
            Self::F16 => bytemuck::pod_read_unaligned::<f16>(chunk).to_f32(),
            Self::F32 => bytemuck::pod_read_unaligned::<f32>(chunk),
            Self::F64 => bytemuck::pod_read_unaligned::<f64>(chunk) as f32,
        }
    }
}
