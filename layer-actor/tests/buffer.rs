use std::io::Write;

use layer_actor::buffer::CHUNK_SIZE;
use layer_actor::{BufferAllocator, BufferWriter};

// The counter is process-wide, so this binary holds a single test.
#[test]
fn buffer_memory_is_accounted() {
    BufferAllocator::clear_thread_local();
    let base = BufferAllocator::buffer_mem();

    let mut writer = BufferWriter::new();
    write!(writer, "header:{}", 42).unwrap();
    assert_eq!(BufferAllocator::buffer_mem(), base + CHUNK_SIZE);

    let frozen = writer.freeze();
    let tail = frozen.slice(7..9).unwrap();
    assert_eq!(&tail[..], b"42");
    drop(frozen);
    assert_eq!(BufferAllocator::buffer_mem(), base + CHUNK_SIZE);

    drop(tail);
    assert_eq!(BufferAllocator::buffer_mem(), base);
    assert_eq!(BufferAllocator::pooled_chunks(), 1);

    let reused = BufferWriter::with_capacity(100);
    assert_eq!(BufferAllocator::pooled_chunks(), 0);
    assert_eq!(BufferAllocator::buffer_mem(), base + CHUNK_SIZE);

    let big = BufferWriter::with_capacity(CHUNK_SIZE * 4);
    assert!(BufferAllocator::buffer_mem() >= base + CHUNK_SIZE * 5);
    drop((reused, big));
    assert_eq!(BufferAllocator::buffer_mem(), base);
    assert_eq!(BufferAllocator::pooled_chunks(), 1);

    let from_thread = std::thread::spawn(|| {
        let mut writer = BufferWriter::new();
        writer.append(b"moved");
        writer.freeze()
    })
    .join()
    .unwrap();
    assert_eq!(&from_thread[..], b"moved");
    assert_eq!(BufferAllocator::buffer_mem(), base + CHUNK_SIZE);
    drop(from_thread);
    assert_eq!(BufferAllocator::buffer_mem(), base);
    assert_eq!(BufferAllocator::pooled_chunks(), 2);

    BufferAllocator::clear_thread_local();
    assert_eq!(BufferAllocator::pooled_chunks(), 0);
}
