//! Tests for Protocol Codec
//!
//! These tests verify:
//! - Multi-bulk and inline request parsing
//! - Incremental parsing of partial frames
//! - Protocol error detection
//! - Reply encoding and client-side decoding

use std::io::Cursor;

use bytes::BytesMut;
use kvbench::error::KvError;
use kvbench::protocol::{
    encode_command, encode_reply, parse_command, read_reply, Command, CommandKind, Reply,
};

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_all(input: &[u8]) -> (Vec<Command>, BytesMut) {
    let mut buf = BytesMut::from(input);
    let mut commands = Vec::new();
    while let Some(command) = parse_command(&mut buf).unwrap() {
        commands.push(command);
    }
    (commands, buf)
}

fn args_of(command: &Command) -> Vec<Vec<u8>> {
    command.args().iter().map(|a| a.to_vec()).collect()
}

fn encoded(reply: &Reply) -> Vec<u8> {
    let mut out = Vec::new();
    encode_reply(reply, &mut out);
    out
}

fn assert_protocol_error(input: &[u8]) {
    let mut buf = BytesMut::from(input);
    match parse_command(&mut buf) {
        Err(KvError::Protocol(_)) => {}
        other => panic!("expected protocol error for {:?}, got {:?}", input, other),
    }
}

// =============================================================================
// Request Parsing Tests
// =============================================================================

#[test]
fn test_parse_multibulk() {
    let (commands, rest) = parse_all(b"*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n");

    assert_eq!(commands.len(), 1);
    assert_eq!(
        args_of(&commands[0]),
        vec![b"SET".to_vec(), b"key".to_vec(), b"value".to_vec()]
    );
    assert_eq!(commands[0].kind(), CommandKind::Set);
    assert!(rest.is_empty());
}

#[test]
fn test_parse_inline() {
    let (commands, _) = parse_all(b"get  mykey\r\nPING\n");

    assert_eq!(commands.len(), 2);
    assert_eq!(args_of(&commands[0]), vec![b"get".to_vec(), b"mykey".to_vec()]);
    assert_eq!(commands[0].kind(), CommandKind::Get);
    assert_eq!(commands[1].kind(), CommandKind::Ping);
}

#[test]
fn test_parse_pipelined_frames() {
    let mut input = Vec::new();
    for key in ["k1", "k2", "k3"] {
        encode_command(&Command::from_args(&["GET", key]), &mut input);
    }

    let (commands, rest) = parse_all(&input);
    assert_eq!(commands.len(), 3);
    assert_eq!(commands[2].arg(1).unwrap()[..], b"k3"[..]);
    assert!(rest.is_empty());
}

#[test]
fn test_empty_requests_are_skipped() {
    let (commands, _) = parse_all(b"\r\n*0\r\n   \r\nPING\r\n");
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].kind(), CommandKind::Ping);
}

#[test]
fn test_binary_safe_arguments() {
    let (commands, _) = parse_all(b"*2\r\n$3\r\nGET\r\n$4\r\na\r\nb\r\n");
    assert_eq!(commands[0].arg(1).unwrap()[..], b"a\r\nb"[..]);
}

#[test]
fn test_partial_frame_waits_for_more() {
    let full = b"*2\r\n$3\r\nGET\r\n$5\r\nhello\r\n";

    for cut in 0..full.len() {
        let mut buf = BytesMut::from(&full[..cut]);
        assert!(parse_command(&mut buf).unwrap().is_none(), "cut at {}", cut);
        assert_eq!(buf.len(), cut, "partial frame must not be consumed");

        buf.extend_from_slice(&full[cut..]);
        let command = parse_command(&mut buf).unwrap().unwrap();
        assert_eq!(command.arg(1).unwrap()[..], b"hello"[..]);
        assert!(buf.is_empty());
    }
}

#[test]
fn test_command_names_are_case_insensitive() {
    for name in ["flushdb", "FLUSHDB", "FlushDb"] {
        assert_eq!(Command::from_args(&[name]).kind(), CommandKind::FlushDb);
    }
    assert_eq!(Command::from_args(&["kEyS", "*"]).kind(), CommandKind::Keys);
    assert_eq!(Command::from_args(&["pset"]).kind(), CommandKind::Unknown);
}

// =============================================================================
// Protocol Error Tests
// =============================================================================

#[test]
fn test_bad_bulk_marker() {
    assert_protocol_error(b"*1\r\n:3\r\nGET\r\n");
}

#[test]
fn test_bad_lengths() {
    assert_protocol_error(b"*x\r\n");
    assert_protocol_error(b"*1\r\n$-5\r\n");
    assert_protocol_error(b"*1\r\n$abc\r\n");
}

#[test]
fn test_bulk_without_crlf() {
    assert_protocol_error(b"*1\r\n$3\r\nGETxx");
}

#[test]
fn test_oversized_lengths() {
    assert_protocol_error(b"*99999999\r\n");
    assert_protocol_error(b"*1\r\n$99999999999\r\n");
}

#[test]
fn test_oversized_inline_request() {
    let line = vec![b'a'; 70 * 1024];
    assert_protocol_error(&line);
}

// =============================================================================
// Reply Encoding Tests
// =============================================================================

#[test]
fn test_encode_simple_replies() {
    assert_eq!(encoded(&Reply::ok()), b"+OK\r\n");
    assert_eq!(encoded(&Reply::pong()), b"+PONG\r\n");
    assert_eq!(encoded(&Reply::Integer(-7)), b":-7\r\n");
    assert_eq!(encoded(&Reply::Null), b"$-1\r\n");
    assert_eq!(encoded(&Reply::Bulk(b"hi".to_vec())), b"$2\r\nhi\r\n");
}

#[test]
fn test_encode_errors() {
    assert_eq!(
        encoded(&Reply::wrong_args("get")),
        b"-ERR wrong number of arguments for 'get' command\r\n".to_vec()
    );
    assert_eq!(encoded(&Reply::syntax_error()), b"-ERR syntax error\r\n");
    // Line breaks cannot appear inside an error line
    assert_eq!(encoded(&Reply::error("ERR a\r\nb")), b"-ERR a  b\r\n");
}

#[test]
fn test_encode_nested_array() {
    let reply = Reply::Array(vec![
        Reply::Bulk(b"k".to_vec()),
        Reply::Null,
        Reply::Array(vec![]),
    ]);
    assert_eq!(encoded(&reply), b"*3\r\n$1\r\nk\r\n$-1\r\n*0\r\n".to_vec());
}

// =============================================================================
// Reply Decoding Tests
// =============================================================================

#[test]
fn test_read_reply_sequence() {
    let replies = vec![
        Reply::ok(),
        Reply::error("ERR boom"),
        Reply::Integer(42),
        Reply::Bulk(b"a\r\nb".to_vec()),
        Reply::Null,
        Reply::Array(vec![Reply::Bulk(b"x".to_vec()), Reply::Integer(1)]),
    ];
    let mut wire = Vec::new();
    for reply in &replies {
        encode_reply(reply, &mut wire);
    }

    let mut cursor = Cursor::new(wire);
    for expected in replies {
        assert_eq!(read_reply(&mut cursor).unwrap(), expected);
    }
    assert!(matches!(read_reply(&mut cursor), Err(KvError::Io(_))));
}

#[test]
fn test_read_reply_rejects_unknown_marker() {
    let mut cursor = Cursor::new(b"!oops\r\n".to_vec());
    assert!(matches!(read_reply(&mut cursor), Err(KvError::Protocol(_))));
}
