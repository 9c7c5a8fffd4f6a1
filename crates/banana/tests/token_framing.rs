//! Bit-exact framing checks: header encoding, the 64-digit cap, and the
//! chunk-boundary independence of the b128 header decoder.

use banana::token::{decode_b128, encode_b128, RawToken, TokenKind};
use bytes::{BufMut, BytesMut};

#[test]
fn open_close_pair_round_trips_through_the_wire() {
    let open = RawToken::header_only(7, TokenKind::Open);
    let close = RawToken::header_only(7, TokenKind::Close);
    let mut buf = BytesMut::new();
    open.encode_into(&mut buf);
    close.encode_into(&mut buf);

    let (header, consumed) = decode_b128(&buf).unwrap().unwrap();
    assert_eq!(header, 7);
    assert_eq!(buf[consumed], TokenKind::Open.as_u8());
}

#[test]
fn header_decoding_does_not_depend_on_chunk_boundaries() {
    let mut whole = BytesMut::new();
    encode_b128(70_000, &mut whole);
    let header_len = whole.len();
    whole.put_u8(TokenKind::Int.as_u8()); // the type byte terminates the header
    let whole = whole.freeze();

    // Feed the header one byte at a time, simulating arbitrary TCP
    // segmentation, and confirm the final decode matches a feed-it-all-
    // at-once decode.
    let mut partial = Vec::new();
    let mut last = None;
    for &byte in &whole {
        partial.push(byte);
        last = decode_b128(&partial).unwrap();
    }
    let (value, consumed) = last.unwrap();
    assert_eq!(value, 70_000);
    assert_eq!(consumed, header_len);

    let (direct_value, direct_consumed) = decode_b128(&whole).unwrap().unwrap();
    assert_eq!(value, direct_value);
    assert_eq!(consumed, direct_consumed);
}

#[test]
fn header_over_the_digit_cap_is_a_fatal_error() {
    let oversized = vec![0x01u8; banana::MAX_HEADER_DIGITS + 1];
    assert!(decode_b128(&oversized).is_err());
}

#[test]
fn invalid_type_byte_is_rejected() {
    assert!(TokenKind::from_u8(0x7f).is_err());
}
