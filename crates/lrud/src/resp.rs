//! RESP (REdis Serialization Protocol) codec
//!
//! RESP2 only. Parsing is incremental: an incomplete frame yields `Ok(None)`
//! and leaves the buffer untouched until more bytes arrive.

use bytes::{Buf, BufMut, BytesMut};
use std::io::Cursor;
use thiserror::Error;

/// Maximum bulk string size (512MB)
const MAX_BULK_STRING_SIZE: usize = 512 * 1024 * 1024;

/// Maximum array size (1M elements)
const MAX_ARRAY_SIZE: usize = 1024 * 1024;

/// Maximum array nesting; commands are flat arrays
const MAX_NESTING_DEPTH: usize = 32;

/// Protocol errors; any of these poisons the rest of the connection buffer
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RespError {
    #[error("unknown RESP type byte '{0}'")]
    UnknownType(char),

    #[error("invalid length or integer: {0}")]
    InvalidInteger(String),

    #[error("invalid UTF-8 in line")]
    InvalidUtf8,

    #[error("expected \\r\\n after bulk string")]
    MissingCrlf,

    #[error("bulk string too large: {0} bytes (max: {max} bytes)", max = MAX_BULK_STRING_SIZE)]
    BulkTooLarge(usize),

    #[error("array too large: {0} elements (max: {max} elements)", max = MAX_ARRAY_SIZE)]
    ArrayTooLarge(usize),

    #[error("arrays nested deeper than {max} levels", max = MAX_NESTING_DEPTH)]
    NestingTooDeep,
}

type ParseResult<T> = Result<Option<T>, RespError>;

/// RESP data types
#[derive(Debug, Clone, PartialEq)]
pub enum RespValue {
    /// Simple string: +OK\r\n
    SimpleString(String),
    /// Error: -Error message\r\n
    Error(String),
    /// Integer: :1000\r\n
    Integer(i64),
    /// Bulk string: $6\r\nfoobar\r\n
    BulkString(Option<Vec<u8>>),
    /// Array: *2\r\n$3\r\nfoo\r\n$3\r\nbar\r\n
    Array(Option<Vec<RespValue>>),
}

impl RespValue {
    pub fn ok() -> Self {
        RespValue::SimpleString("OK".to_string())
    }

    pub fn error(msg: impl Into<String>) -> Self {
        RespValue::Error(msg.into())
    }

    pub fn bulk(data: impl Into<Vec<u8>>) -> Self {
        RespValue::BulkString(Some(data.into()))
    }

    pub fn null() -> Self {
        RespValue::BulkString(None)
    }

    /// Borrow the payload of a non-null bulk string
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            RespValue::BulkString(Some(data)) => Some(data.as_slice()),
            _ => None,
        }
    }

    /// Append the wire encoding to `out`
    pub fn encode(&self, out: &mut BytesMut) {
        match self {
            RespValue::SimpleString(s) => write_line(out, b'+', s.as_bytes()),
            RespValue::Error(e) => write_line(out, b'-', e.as_bytes()),
            RespValue::Integer(i) => write_line(out, b':', i.to_string().as_bytes()),
            RespValue::BulkString(None) => out.put_slice(b"$-1\r\n"),
            RespValue::BulkString(Some(data)) => {
                write_line(out, b'$', data.len().to_string().as_bytes());
                out.put_slice(data);
                out.put_slice(b"\r\n");
            }
            RespValue::Array(None) => out.put_slice(b"*-1\r\n"),
            RespValue::Array(Some(items)) => {
                write_line(out, b'*', items.len().to_string().as_bytes());
                for item in items {
                    item.encode(out);
                }
            }
        }
    }

    /// Decode one value from the front of `buf`, consuming it on success
    pub fn parse(buf: &mut BytesMut) -> ParseResult<RespValue> {
        if buf.is_empty() {
            return Ok(None);
        }

        let mut cursor = Cursor::new(&buf[..]);
        let value = parse_value(&mut cursor, 0)?;
        if value.is_some() {
            let consumed = cursor.position() as usize;
            buf.advance(consumed);
        }
        Ok(value)
    }
}

fn write_line(out: &mut BytesMut, prefix: u8, body: &[u8]) {
    out.reserve(body.len() + 3);
    out.put_u8(prefix);
    out.put_slice(body);
    out.put_slice(b"\r\n");
}

fn parse_value(cursor: &mut Cursor<&[u8]>, depth: usize) -> ParseResult<RespValue> {
    if !cursor.has_remaining() {
        return Ok(None);
    }

    match cursor.get_u8() {
        b'+' => Ok(read_text(cursor)?.map(RespValue::SimpleString)),
        b'-' => Ok(read_text(cursor)?.map(RespValue::Error)),
        b':' => Ok(read_int(cursor)?.map(RespValue::Integer)),
        b'$' => parse_bulk_string(cursor),
        b'*' => parse_array(cursor, depth + 1),
        other => Err(RespError::UnknownType(other as char)),
    }
}

fn parse_bulk_string(cursor: &mut Cursor<&[u8]>) -> ParseResult<RespValue> {
    let len = match read_length(cursor)? {
        Some(Some(len)) => len,
        Some(None) => return Ok(Some(RespValue::BulkString(None))),
        None => return Ok(None),
    };

    if len > MAX_BULK_STRING_SIZE {
        return Err(RespError::BulkTooLarge(len));
    }

    if cursor.remaining() < len + 2 {
        return Ok(None);
    }

    let mut data = vec![0u8; len];
    cursor.copy_to_slice(&mut data);

    if cursor.get_u8() != b'\r' || cursor.get_u8() != b'\n' {
        return Err(RespError::MissingCrlf);
    }

    Ok(Some(RespValue::BulkString(Some(data))))
}

fn parse_array(cursor: &mut Cursor<&[u8]>, depth: usize) -> ParseResult<RespValue> {
    if depth > MAX_NESTING_DEPTH {
        return Err(RespError::NestingTooDeep);
    }

    let len = match read_length(cursor)? {
        Some(Some(len)) => len,
        Some(None) => return Ok(Some(RespValue::Array(None))),
        None => return Ok(None),
    };

    if len > MAX_ARRAY_SIZE {
        return Err(RespError::ArrayTooLarge(len));
    }

    let mut items = Vec::with_capacity(len.min(64));
    for _ in 0..len {
        match parse_value(cursor, depth)? {
            Some(item) => items.push(item),
            None => return Ok(None),
        }
    }

    Ok(Some(RespValue::Array(Some(items))))
}

/// Length header; `Some(None)` is the `-1` null marker
fn read_length(cursor: &mut Cursor<&[u8]>) -> ParseResult<Option<usize>> {
    match read_int(cursor)? {
        None => Ok(None),
        Some(-1) => Ok(Some(None)),
        Some(n) => usize::try_from(n)
            .map(|len| Some(Some(len)))
            .map_err(|_| RespError::InvalidInteger(n.to_string())),
    }
}

fn read_int(cursor: &mut Cursor<&[u8]>) -> ParseResult<i64> {
    match read_text(cursor)? {
        Some(text) => text
            .parse::<i64>()
            .map(Some)
            .map_err(|_| RespError::InvalidInteger(text)),
        None => Ok(None),
    }
}

fn read_text(cursor: &mut Cursor<&[u8]>) -> ParseResult<String> {
    match read_line(cursor) {
        Some(line) => String::from_utf8(line.to_vec())
            .map(Some)
            .map_err(|_| RespError::InvalidUtf8),
        None => Ok(None),
    }
}

fn read_line<'a>(cursor: &mut Cursor<&'a [u8]>) -> Option<&'a [u8]> {
    let start = cursor.position() as usize;
    let data: &'a [u8] = *cursor.get_ref();
    let offset = data[start..].windows(2).position(|w| w == b"\r\n")?;
    let end = start + offset;
    cursor.set_position((end + 2) as u64);
    Some(&data[start..end])
}
