//! Tests for the memory-backed input stream

use crate::io::{ClientIo, MemoryReader, Whence};

#[test]
fn test_read_is_truncated_at_end() {
    let data = [1u8, 2, 3, 4, 5];
    let mut reader = MemoryReader::new(&data);

    let mut buf = [0u8; 3];
    assert_eq!(reader.read(&mut buf), 3);
    assert_eq!(buf, [1, 2, 3]);

    let mut buf = [0u8; 8];
    assert_eq!(reader.read(&mut buf), 2);
    assert_eq!(&buf[..2], &[4, 5]);
    assert_eq!(reader.read(&mut buf), 0);
    assert_eq!(reader.position(), 5);
}

#[test]
fn test_reads_never_exceed_remaining_bytes() {
    let data: Vec<u8> = (0..32).collect();

    for start in 0..=data.len() {
        for wanted in [0usize, 1, 7, 32, 100] {
            let mut reader = MemoryReader::new(&data);
            assert_eq!(reader.seek(start as i64, Whence::Set), Some(start as u64));

            let mut buf = vec![0u8; wanted];
            let count = reader.read(&mut buf);
            assert_eq!(count, wanted.min(data.len() - start));
            assert_eq!(&buf[..count], &data[start..start + count]);
        }
    }
}

#[test]
fn test_seek_whence() {
    let data = [0u8; 10];
    let mut reader = MemoryReader::new(&data);

    assert_eq!(reader.seek(4, Whence::Set), Some(4));
    assert_eq!(reader.seek(3, Whence::Cur), Some(7));
    assert_eq!(reader.seek(-2, Whence::Cur), Some(5));
    assert_eq!(reader.seek(-1, Whence::End), Some(9));
    assert_eq!(reader.seek(0, Whence::End), Some(10));
    assert_eq!(reader.remaining(), 0);
}

#[test]
fn test_failed_seek_leaves_cursor_unchanged() {
    let data = [0u8; 10];
    let mut reader = MemoryReader::new(&data);
    reader.seek(6, Whence::Set).unwrap();

    assert_eq!(reader.seek(11, Whence::Set), None);
    assert_eq!(reader.seek(-1, Whence::Set), None);
    assert_eq!(reader.seek(5, Whence::Cur), None);
    assert_eq!(reader.seek(-7, Whence::Cur), None);
    assert_eq!(reader.seek(1, Whence::End), None);
    assert_eq!(reader.seek(i64::MIN, Whence::End), None);
    assert_eq!(reader.seek(i64::MAX, Whence::Cur), None);
    assert_eq!(reader.position(), 6);
}

#[test]
fn test_size_write_and_close() {
    let data = [7u8; 12];
    let mut reader = MemoryReader::new(&data);

    assert_eq!(reader.size(), 12);
    assert_eq!(reader.write(b"abc").unwrap(), 0);
    assert!(reader.close().is_ok());
    assert_eq!(reader.size(), 12);
}

#[test]
fn test_empty_span() {
    let mut reader = MemoryReader::new(&[]);
    let mut buf = [0u8; 4];

    assert_eq!(reader.read(&mut buf), 0);
    assert_eq!(reader.seek(0, Whence::End), Some(0));
    assert_eq!(reader.seek(1, Whence::Set), None);
}
