//! Tests for the stream message body.

use super::*;

/// Values read back in order with conversions applied.
#[test]
fn test_read_in_order() {
    let mut body = StreamBody::default();
    body.write(true).unwrap();
    body.write(7_i16).unwrap();
    body.write("12").unwrap();
    body.write_char(u16::from(b'z')).unwrap();
    body.reset();

    assert!(body.read_bool().unwrap());
    assert_eq!(body.read_long().unwrap(), 7);
    assert_eq!(body.read_int().unwrap(), 12);
    assert_eq!(body.read_char().unwrap(), u16::from(b'z'));
    assert!(matches!(body.read_bool(), Err(Error::MessageEof)));
}

/// A failed conversion leaves the cursor on the same value.
#[test]
fn test_failed_conversion_keeps_cursor() {
    let mut body = StreamBody::default();
    body.write(1.5_f64).unwrap();
    body.reset();
    assert!(matches!(body.read_int(), Err(Error::MessageFormat(_))));
    assert_eq!(body.read_double().unwrap(), 1.5);
}

/// Byte arrays are read in chunks and terminated by `None`.
#[test]
fn test_chunked_bytes() {
    let mut body = StreamBody::default();
    body.write(vec![1_u8, 2, 3, 4, 5]).unwrap();
    body.write(9_i32).unwrap();
    body.reset();

    let mut buf = [0_u8; 2];
    assert_eq!(body.read_bytes(&mut buf).unwrap(), Some(2));
    assert!(matches!(body.read_int(), Err(Error::MessageFormat(_))));
    assert_eq!(body.read_bytes(&mut buf).unwrap(), Some(2));
    assert_eq!(body.read_bytes(&mut buf).unwrap(), Some(1));
    assert_eq!(buf[0], 5);
    assert_eq!(body.read_bytes(&mut buf).unwrap(), None);
    assert_eq!(body.read_int().unwrap(), 9);
}

/// Mode checks mirror the bytes body.
#[test]
fn test_modes() {
    let mut body = StreamBody::default();
    assert!(matches!(body.read_bool(), Err(Error::MessageNotReadable)));
    body.reset();
    assert!(matches!(body.write(1_i32), Err(Error::MessageNotWriteable)));
    body.clear();
    assert!(body.is_empty());
    body.write(1_i32).unwrap();
    assert_eq!(body.len(), 1);
}
