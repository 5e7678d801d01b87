//! Codec error types.

use thiserror::Error;
use typepack_buffers::BufferError;

/// Encoding error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// The caller's output buffer is exhausted.
    #[error("no space left in output buffer")]
    NoSpaceLeft,
    /// A sequence is too long for any MessagePack length prefix.
    #[error("sequence length exceeds the 32-bit wire limit")]
    SliceLenTooLarge,
}

/// Decoding error.
///
/// Every structural fault — unknown tag, wrong wire family for the requested
/// host type, length mismatch, narrowing loss, unknown or duplicate field
/// name, premature end of input, trailing bytes — is reported as
/// [`DecodeError::Invalid`]. The codec is schema-strict and does not attempt
/// partial success or repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// The input does not encode a value of the requested type.
    #[error("malformed or mismatched input")]
    Invalid,
    /// Arena allocation failed during [`crate::decode_alloc`].
    #[error("arena allocation failed")]
    OutOfMemory,
}

impl From<BufferError> for EncodeError {
    fn from(_: BufferError) -> Self {
        EncodeError::NoSpaceLeft
    }
}

impl From<BufferError> for DecodeError {
    fn from(_: BufferError) -> Self {
        DecodeError::Invalid
    }
}
