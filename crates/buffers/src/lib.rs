//! Bounds-checked binary buffer primitives.
//!
//! [`Writer`] appends big-endian values to a caller-provided byte buffer and
//! reports exhaustion instead of growing. [`Reader`] consumes big-endian
//! values from a byte slice through a seekable cursor.

mod error;
mod reader;
mod writer;

pub use error::BufferError;
pub use reader::Reader;
pub use writer::Writer;
