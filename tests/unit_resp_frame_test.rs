use bytes::{Bytes, BytesMut};
use redis_trib::core::protocol::{RespFrame, RespFrameCodec};
use tokio_util::codec::{Decoder, Encoder};

fn decode_all(input: &[u8]) -> Option<RespFrame> {
    let mut codec = RespFrameCodec;
    let mut buf = BytesMut::from(input);
    codec.decode(&mut buf).unwrap()
}

#[tokio::test]
async fn test_decode_simple_string() {
    assert_eq!(
        decode_all(b"+OK\r\n"),
        Some(RespFrame::SimpleString("OK".to_string()))
    );
}

#[tokio::test]
async fn test_decode_error() {
    assert_eq!(
        decode_all(b"-ERR unknown command\r\n"),
        Some(RespFrame::Error("ERR unknown command".to_string()))
    );
}

#[tokio::test]
async fn test_decode_integer() {
    assert_eq!(decode_all(b":1000\r\n"), Some(RespFrame::Integer(1000)));
    assert_eq!(decode_all(b":-1\r\n"), Some(RespFrame::Integer(-1)));
}

#[tokio::test]
async fn test_decode_bulk_string_and_null() {
    assert_eq!(
        decode_all(b"$5\r\nhello\r\n"),
        Some(RespFrame::BulkString(Bytes::from_static(b"hello")))
    );
    assert_eq!(decode_all(b"$-1\r\n"), Some(RespFrame::Null));
}

#[tokio::test]
async fn test_decode_nested_array() {
    let input = b"*2\r\n*2\r\n$3\r\nfoo\r\n:1\r\n$3\r\nbar\r\n";
    let expected = RespFrame::Array(vec![
        RespFrame::Array(vec![
            RespFrame::BulkString(Bytes::from_static(b"foo")),
            RespFrame::Integer(1),
        ]),
        RespFrame::BulkString(Bytes::from_static(b"bar")),
    ]);
    assert_eq!(decode_all(input), Some(expected));
}

#[tokio::test]
async fn test_decode_incomplete_frame_returns_none() {
    // A partial bulk string must not error; the codec waits for more data.
    assert_eq!(decode_all(b"$10\r\nhel"), None);
    assert_eq!(decode_all(b"*3\r\n$3\r\nfoo\r\n"), None);
    assert_eq!(decode_all(b""), None);
}

#[tokio::test]
async fn test_decode_consumes_exactly_one_frame() {
    let mut codec = RespFrameCodec;
    let mut buf = BytesMut::from(&b"+OK\r\n:42\r\n"[..]);
    assert_eq!(
        codec.decode(&mut buf).unwrap(),
        Some(RespFrame::SimpleString("OK".to_string()))
    );
    assert_eq!(codec.decode(&mut buf).unwrap(), Some(RespFrame::Integer(42)));
    assert_eq!(codec.decode(&mut buf).unwrap(), None);
}

#[tokio::test]
async fn test_decode_unknown_prefix_is_error() {
    let mut codec = RespFrameCodec;
    let mut buf = BytesMut::from(&b"!boom\r\n"[..]);
    assert!(codec.decode(&mut buf).is_err());
}

#[tokio::test]
async fn test_encode_command() {
    let mut codec = RespFrameCodec;
    let mut buf = BytesMut::new();
    let frame = RespFrame::command(vec![
        Bytes::from_static(b"CLUSTER"),
        Bytes::from_static(b"MEET"),
        Bytes::from_static(b"127.0.0.1"),
        Bytes::from_static(b"7000"),
    ]);
    codec.encode(frame, &mut buf).unwrap();
    assert_eq!(
        &buf[..],
        b"*4\r\n$7\r\nCLUSTER\r\n$4\r\nMEET\r\n$9\r\n127.0.0.1\r\n$4\r\n7000\r\n"
    );
}

#[tokio::test]
async fn test_reply_accessors() {
    assert_eq!(RespFrame::Integer(7).as_integer(), Some(7));
    // COUNTKEYSINSLOT-style numeric bulk replies also read as integers.
    assert_eq!(
        RespFrame::BulkString(Bytes::from_static(b"42")).as_integer(),
        Some(42)
    );
    assert!(RespFrame::SimpleString("OK".to_string()).is_ok());
    assert!(RespFrame::SimpleString("ok".to_string()).is_ok());
    assert!(!RespFrame::Integer(1).is_ok());

    let keys = RespFrame::Array(vec![
        RespFrame::BulkString(Bytes::from_static(b"a")),
        RespFrame::BulkString(Bytes::from_static(b"b")),
    ]);
    assert_eq!(
        keys.into_bulk_vec(),
        Some(vec![Bytes::from_static(b"a"), Bytes::from_static(b"b")])
    );
    assert_eq!(RespFrame::NullArray.into_bulk_vec(), Some(vec![]));
    assert_eq!(RespFrame::Integer(3).into_bulk_vec(), None);
}
