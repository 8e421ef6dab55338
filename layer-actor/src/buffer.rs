//! Shared message buffers with global memory accounting.
//!
//! Every live chunk adds its capacity to one process-wide atomic counter.
//! Small chunks come from and return to a per-thread free list; a frozen
//! buffer is shared across threads through an `Arc`.

use std::cell::RefCell;
use std::fmt;
use std::ops::{Deref, Range};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Capacity of pooled chunks.
pub const CHUNK_SIZE: usize = 16 << 10;

const MAX_POOLED_CHUNKS: usize = 32;

static BUFFER_MEM: AtomicUsize = AtomicUsize::new(0);

thread_local! {
    static POOL: RefCell<Vec<Vec<u8>>> = const { RefCell::new(Vec::new()) };
}

/// Global view of buffer memory.
#[derive(Clone, Copy, Debug, Default)]
pub struct BufferAllocator;

impl BufferAllocator {
    /// Bytes held by live buffers on all threads.
    pub fn buffer_mem() -> usize {
        BUFFER_MEM.load(Ordering::Relaxed)
    }

    /// Free chunks cached by the current thread.
    pub fn pooled_chunks() -> usize {
        POOL.try_with(|pool| pool.borrow().len()).unwrap_or(0)
    }

    /// Releases the current thread's free list.
    pub fn clear_thread_local() {
        let _ = POOL.try_with(|pool| pool.borrow_mut().clear());
    }
}

// ─── Chunk ────────────────────────────────────────────────────────────────────

struct Chunk {
    data:      Vec<u8>,
    accounted: usize,
}

impl Chunk {
    fn with_capacity(capacity: usize) -> Self {
        let data = if capacity <= CHUNK_SIZE {
            POOL.try_with(|pool| pool.borrow_mut().pop())
                .ok()
                .flatten()
                .unwrap_or_else(|| Vec::with_capacity(CHUNK_SIZE))
        } else {
            Vec::with_capacity(capacity)
        };
        let mut chunk = Self { data, accounted: 0 };
        chunk.account();
        chunk
    }

    /// Brings the counter in line with the current capacity.
    fn account(&mut self) {
        let capacity = self.data.capacity();
        if capacity > self.accounted {
            BUFFER_MEM.fetch_add(capacity - self.accounted, Ordering::Relaxed);
        } else {
            BUFFER_MEM.fetch_sub(self.accounted - capacity, Ordering::Relaxed);
        }
        self.accounted = capacity;
    }
}

impl Drop for Chunk {
    fn drop(&mut self) {
        BUFFER_MEM.fetch_sub(self.accounted, Ordering::Relaxed);
        if self.data.capacity() != CHUNK_SIZE {
            return;
        }
        let mut data = std::mem::take(&mut self.data);
        data.clear();
        let _ = POOL.try_with(|pool| {
            let mut pool = pool.borrow_mut();
            if pool.len() < MAX_POOLED_CHUNKS {
                pool.push(data);
            }
        });
    }
}

// ─── BufferWriter ─────────────────────────────────────────────────────────────

/// Exclusive, growable buffer; [`freeze`](Self::freeze) makes it shareable.
pub struct BufferWriter {
    chunk: Chunk,
}

impl BufferWriter {
    pub fn new() -> Self {
        Self::with_capacity(CHUNK_SIZE)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self { chunk: Chunk::with_capacity(capacity) }
    }

    pub fn append(&mut self, bytes: &[u8]) {
        self.chunk.data.extend_from_slice(bytes);
        self.chunk.account();
    }

    pub fn len(&self) -> usize {
        self.chunk.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunk.data.is_empty()
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.chunk.data
    }

    pub fn freeze(self) -> BufferSlice {
        let end = self.chunk.data.len();
        BufferSlice { chunk: Arc::new(self.chunk), range: 0..end }
    }
}

impl Default for BufferWriter {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BufferWriter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferWriter").field("len", &self.len()).finish()
    }
}

impl std::io::Write for BufferWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.append(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

// ─── BufferSlice ──────────────────────────────────────────────────────────────

/// Immutable view into a shared chunk. Cloning shares the chunk.
#[derive(Clone)]
pub struct BufferSlice {
    chunk: Arc<Chunk>,
    range: Range<usize>,
}

impl BufferSlice {
    /// A sub-view; `range` is relative to this slice.
    pub fn slice(&self, range: Range<usize>) -> Option<BufferSlice> {
        if range.start > range.end || range.end > self.range.len() {
            return None;
        }
        let start = self.range.start + range.start;
        Some(Self { chunk: self.chunk.clone(), range: start..start + range.len() })
    }

    /// Number of slices sharing the underlying chunk.
    pub fn ref_count(&self) -> usize {
        Arc::strong_count(&self.chunk)
    }
}

impl Deref for BufferSlice {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.chunk.data[self.range.clone()]
    }
}

impl fmt::Debug for BufferSlice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BufferSlice").field("range", &self.range).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slices_share_a_chunk() {
        let mut writer = BufferWriter::new();
        writer.append(b"hello, ");
        writer.append(b"world");
        let all = writer.freeze();
        assert_eq!(&all[..], b"hello, world");

        let world = all.slice(7..12).unwrap();
        assert_eq!(&world[..], b"world");
        assert_eq!(&world.slice(1..3).unwrap()[..], b"or");
        assert_eq!(all.ref_count(), 2);
        assert!(world.slice(3..6).is_none());
        drop(world);
        assert_eq!(all.ref_count(), 1);
    }

    #[test]
    fn large_writes_grow() {
        let mut writer = BufferWriter::with_capacity(4);
        writer.append(&vec![7; CHUNK_SIZE * 2]);
        assert_eq!(writer.len(), CHUNK_SIZE * 2);
        assert!(writer.freeze().iter().all(|&b| b == 7));
    }
}
