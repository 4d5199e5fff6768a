//! Tag-prefixed binary encoding of single datums.

use bytes::{Buf, BufMut};
use thiserror::Error;

use crate::types::Datum;

const TAG_NULL: u8 = 0;
const TAG_BOOL: u8 = 1;
const TAG_INT: u8 = 2;
const TAG_UINT: u8 = 3;
const TAG_DOUBLE: u8 = 4;
const TAG_BYTES: u8 = 5;
const TAG_STRING: u8 = 6;

/// Errors produced while decoding datums from raw bytes.
#[derive(Debug, Error)]
pub enum DatumDecodeError {
    /// The input ended in the middle of a datum.
    #[error("unexpected end of input while decoding a datum")]
    UnexpectedEof,
    /// The tag byte does not name a known datum variant.
    #[error("unknown datum tag {0:#04x}")]
    UnknownTag(u8),
    /// A string datum's payload is not valid UTF-8.
    #[error("datum payload is not valid UTF-8")]
    InvalidUtf8(#[from] std::str::Utf8Error),
}

/// Appends the encoded form of `datum` to `buf`.
///
/// The encoding is a tag byte followed by a fixed-width or length-prefixed
/// payload; it is self-delimiting, so datums can be concatenated (as index
/// keys do) and decoded back without separators.
pub fn encode_datum(buf: &mut Vec<u8>, datum: &Datum) {
    match datum {
        Datum::Null => buf.put_u8(TAG_NULL),
        Datum::Bool(value) => {
            buf.put_u8(TAG_BOOL);
            buf.put_u8(u8::from(*value));
        }
        Datum::Int(value) => {
            buf.put_u8(TAG_INT);
            buf.put_i64(*value);
        }
        Datum::Uint(value) => {
            buf.put_u8(TAG_UINT);
            buf.put_u64(*value);
        }
        Datum::Double(value) => {
            buf.put_u8(TAG_DOUBLE);
            buf.put_f64(*value);
        }
        Datum::Bytes(value) => {
            buf.put_u8(TAG_BYTES);
            buf.put_u32(value.len() as u32);
            buf.put_slice(value);
        }
        Datum::String(value) => {
            buf.put_u8(TAG_STRING);
            buf.put_u32(value.len() as u32);
            buf.put_slice(value.as_bytes());
        }
    }
}

/// Decodes one datum from the front of `buf`, consuming exactly its bytes.
pub fn decode_datum(buf: &mut &[u8]) -> Result<Datum, DatumDecodeError> {
    if buf.remaining() < 1 {
        return Err(DatumDecodeError::UnexpectedEof);
    }

    let tag = buf.get_u8();
    let datum = match tag {
        TAG_NULL => Datum::Null,
        TAG_BOOL => {
            if buf.remaining() < 1 {
                return Err(DatumDecodeError::UnexpectedEof);
            }
            Datum::Bool(buf.get_u8() != 0)
        }
        TAG_INT => {
            if buf.remaining() < 8 {
                return Err(DatumDecodeError::UnexpectedEof);
            }
            Datum::Int(buf.get_i64())
        }
        TAG_UINT => {
            if buf.remaining() < 8 {
                return Err(DatumDecodeError::UnexpectedEof);
            }
            Datum::Uint(buf.get_u64())
        }
        TAG_DOUBLE => {
            if buf.remaining() < 8 {
                return Err(DatumDecodeError::UnexpectedEof);
            }
            Datum::Double(buf.get_f64())
        }
        TAG_BYTES => Datum::Bytes(decode_length_prefixed(buf)?),
        TAG_STRING => {
            let raw = decode_length_prefixed(buf)?;
            let text = std::str::from_utf8(&raw)?;
            Datum::String(text.to_string())
        }
        other => return Err(DatumDecodeError::UnknownTag(other)),
    };

    Ok(datum)
}

/// Decodes a `u32`-length-prefixed byte payload.
fn decode_length_prefixed(buf: &mut &[u8]) -> Result<Vec<u8>, DatumDecodeError> {
    if buf.remaining() < 4 {
        return Err(DatumDecodeError::UnexpectedEof);
    }

    let len = buf.get_u32() as usize;
    if buf.remaining() < len {
        return Err(DatumDecodeError::UnexpectedEof);
    }

    let mut payload = vec![0u8; len];
    buf.copy_to_slice(&mut payload);

    Ok(payload)
}
