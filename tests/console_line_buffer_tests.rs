//! Line buffer tests

use rust_tally_light::console::line_buffer::{LineBuffer, LINE_SIZE};

#[test]
fn test_line_buffer_push() {
    let mut buf = LineBuffer::new();

    buf.push(b'h');
    buf.push(b'e');
    buf.push(b'l');
    buf.push(b'p');

    assert_eq!(buf.as_str(), "help");
}

#[test]
fn test_line_buffer_backspace() {
    let mut buf = LineBuffer::new();

    buf.push(b'h');
    buf.push(b'e');
    buf.push(b'l');
    buf.push(b'p');
    buf.backspace();
    buf.backspace();

    assert_eq!(buf.as_str(), "he");
}

#[test]
fn test_line_buffer_backspace_empty() {
    let mut buf = LineBuffer::new();

    assert!(!buf.backspace()); // should not panic
    assert_eq!(buf.as_str(), "");
}

#[test]
fn test_line_buffer_clear() {
    let mut buf = LineBuffer::new();

    buf.push(b'h');
    buf.push(b'e');
    buf.push(b'l');
    buf.push(b'p');
    buf.clear();

    assert_eq!(buf.as_str(), "");
    assert!(buf.is_empty());
}

#[test]
fn test_line_buffer_rejects_control_bytes() {
    let mut buf = LineBuffer::new();

    assert!(!buf.push(0x07));
    assert!(!buf.push(0xC3));
    assert!(buf.push(b' '));
    assert_eq!(buf.len(), 1);
}

#[test]
fn test_line_buffer_overflow() {
    let mut buf = LineBuffer::new();

    for i in 0..(LINE_SIZE + 10) {
        buf.push(b'a' + (i % 26) as u8);
    }

    // Should be truncated to capacity
    assert_eq!(buf.len(), LINE_SIZE);
    assert!(buf.is_full());
}
