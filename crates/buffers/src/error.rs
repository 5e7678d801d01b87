//! Buffer access errors.

use thiserror::Error;

/// Error raised by [`crate::Reader`] and [`crate::Writer`] on out-of-bounds
/// access.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum BufferError {
    /// A read ran past the end of the input slice.
    #[error("unexpected end of input")]
    EndOfStream,
    /// A write ran past the end of the output buffer.
    #[error("no space left in output buffer")]
    NoSpaceLeft,
}
