//! Arena ownership for decoded dynamic data.

use core::alloc::Layout;

use crate::error::DecodeError;

/// Region allocator backing [`crate::decode_alloc`].
///
/// Every pointer, slice, and str produced by one `decode_alloc` call borrows
/// the arena passed to it; dropping the arena releases them all as a unit.
/// Sharing decoded sub-values across arenas is not supported.
///
/// # Example
///
/// ```
/// use typepack::Arena;
///
/// let arena = Arena::new();
/// let bytes: &[u8] = typepack::decode_alloc(
///     &arena,
///     &[0xc4, 0x02, 0xab, 0xcd],
///     &typepack::SeqOptions {
///         repr: typepack::SeqRepr::Bin,
///         ..Default::default()
///     },
/// )
/// .unwrap();
/// assert_eq!(bytes, &[0xab, 0xcd]);
/// ```
pub struct Arena {
    bump: bumpalo::Bump,
}

impl Default for Arena {
    fn default() -> Self {
        Self::new()
    }
}

impl Arena {
    /// Creates an empty arena. No memory is reserved until the first
    /// allocation.
    pub fn new() -> Self {
        Self {
            bump: bumpalo::Bump::new(),
        }
    }

    /// Creates an arena with an initial reservation.
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            bump: bumpalo::Bump::with_capacity(bytes),
        }
    }

    /// Bytes currently reserved by the arena.
    pub fn allocated_bytes(&self) -> usize {
        self.bump.allocated_bytes()
    }

    pub(crate) fn bump(&self) -> &bumpalo::Bump {
        &self.bump
    }

    /// Moves a value into the arena.
    pub fn alloc<T>(&self, value: T) -> Result<&mut T, DecodeError> {
        self.bump
            .try_alloc(value)
            .map_err(|_| DecodeError::OutOfMemory)
    }

    /// Copies a byte slice into the arena.
    pub fn alloc_bytes(&self, bytes: &[u8]) -> Result<&[u8], DecodeError> {
        if bytes.is_empty() {
            return Ok(&[]);
        }
        let layout = Layout::for_value(bytes);
        let dst = self
            .bump
            .try_alloc_layout(layout)
            .map_err(|_| DecodeError::OutOfMemory)?;
        // SAFETY: `dst` is a fresh arena allocation of exactly `bytes.len()`
        // bytes, disjoint from `bytes`.
        unsafe {
            core::ptr::copy_nonoverlapping(bytes.as_ptr(), dst.as_ptr(), bytes.len());
            Ok(core::slice::from_raw_parts(dst.as_ptr(), bytes.len()))
        }
    }

    /// Copies a string into the arena.
    pub fn alloc_str(&self, s: &str) -> Result<&str, DecodeError> {
        let bytes = self.alloc_bytes(s.as_bytes())?;
        core::str::from_utf8(bytes).map_err(|_| DecodeError::Invalid)
    }
}
