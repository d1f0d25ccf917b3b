//! Growable text sink that decoders print formatted instructions into.

use crate::DisasmError;

/// Output stream buffer for one decode session.
///
/// One formatted instruction line is appended per decode step, snapshotted
/// into the emitted [`DecodedInstruction`](crate::DecodedInstruction), and
/// the buffer is reset without releasing its allocation. The default
/// capacity comfortably holds any single printed line, so steady-state
/// decoding never reallocates.
#[derive(Debug)]
pub struct StreamBuffer {
    buf: String,
}

impl StreamBuffer {
    /// Default initial capacity (100 KiB).
    pub const DEFAULT_CAPACITY: usize = 100 * 1024;

    /// Create a buffer with the default capacity.
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a buffer with a caller-chosen initial capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: String::with_capacity(capacity),
        }
    }

    /// Append text, growing the buffer if the remaining capacity is short.
    ///
    /// Growth reserves at least `2 * (capacity + needed)` bytes so repeated
    /// appends stay amortized. Allocation failure surfaces as
    /// [`DisasmError::Resource`]; already-written bytes are never truncated
    /// or corrupted.
    pub fn append(&mut self, text: &str) -> Result<(), DisasmError> {
        let needed = text.len();
        if self.buf.capacity() - self.buf.len() < needed {
            let grown = 2 * (self.buf.capacity() + needed);
            self.buf.try_reserve_exact(grown - self.buf.len())?;
        }
        self.buf.push_str(text);
        Ok(())
    }

    /// Set the length back to 0 without releasing the allocation.
    pub fn reset(&mut self) {
        self.buf.clear();
    }

    /// Owned copy of the current contents, independent of later resets.
    pub fn snapshot(&self) -> String {
        self.buf.clone()
    }

    /// Current contents as a borrowed slice.
    pub fn as_str(&self) -> &str {
        &self.buf
    }

    /// Number of bytes currently written.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Whether nothing has been written since the last reset.
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Current allocated capacity.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }
}

impl Default for StreamBuffer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacity() {
        let buf = StreamBuffer::new();
        assert!(buf.capacity() >= StreamBuffer::DEFAULT_CAPACITY);
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn test_append_and_snapshot() {
        let mut buf = StreamBuffer::with_capacity(64);
        buf.append("mov eax, 1").unwrap();
        assert_eq!(buf.as_str(), "mov eax, 1");

        let snap = buf.snapshot();
        buf.reset();
        // Snapshot is an independent copy
        assert_eq!(snap, "mov eax, 1");
        assert!(buf.is_empty());
    }

    #[test]
    fn test_growth_preserves_content() {
        let mut buf = StreamBuffer::with_capacity(4);
        buf.append("abcd").unwrap();

        // Forces a growth; earlier bytes must survive and nothing may truncate
        buf.append("efghijklmnop").unwrap();
        assert_eq!(buf.as_str(), "abcdefghijklmnop");
        assert!(buf.capacity() >= 2 * (4 + 12));
    }

    #[test]
    fn test_reset_keeps_allocation() {
        let mut buf = StreamBuffer::with_capacity(8);
        buf.append("0123456789abcdef").unwrap();
        let grown = buf.capacity();

        buf.reset();
        assert_eq!(buf.len(), 0);
        assert_eq!(buf.capacity(), grown);
    }

    #[test]
    fn test_repeated_reuse_is_stable() {
        let mut buf = StreamBuffer::with_capacity(32);
        for _ in 0..3 {
            buf.append("bl 0x1000").unwrap();
            assert_eq!(buf.snapshot(), "bl 0x1000");
            buf.reset();
        }
    }
}
