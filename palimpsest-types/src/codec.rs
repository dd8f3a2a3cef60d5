//! Binary record codec shared by entity records and logged commands.
//!
//! Layout rules: integers and floats are fixed-width little-endian, ids are
//! 32 raw bytes, text is a `u32` byte length followed by UTF-8, sequences are
//! a `u32` element count followed by the elements.

use std::io::{Cursor, Read};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};

use crate::WideId;

/// Upper bound on any single length prefix accepted while decoding.
pub const MAX_FIELD_LEN: usize = 16 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("record truncated")]
    Truncated,

    #[error("unknown {what} tag {tag}")]
    UnknownTag { what: &'static str, tag: u8 },

    #[error("field length {0} exceeds limit")]
    Oversized(usize),

    #[error("invalid UTF-8 in text field")]
    InvalidUtf8,

    #[error("invalid value for {0}")]
    InvalidValue(&'static str),

    #[error("{0} trailing bytes after record")]
    TrailingBytes(usize),
}

impl From<std::io::Error> for DecodeError {
    fn from(_: std::io::Error) -> Self {
        // Reads come from an in-memory cursor; the only failure is running out.
        DecodeError::Truncated
    }
}

/// Infallible little-endian writer over a growable buffer.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn u32(&mut self, v: u32) {
        let mut b = [0; 4];
        LittleEndian::write_u32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn u64(&mut self, v: u64) {
        let mut b = [0; 8];
        LittleEndian::write_u64(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn i64(&mut self, v: i64) {
        let mut b = [0; 8];
        LittleEndian::write_i64(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn f32(&mut self, v: f32) {
        let mut b = [0; 4];
        LittleEndian::write_f32(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn f64(&mut self, v: f64) {
        let mut b = [0; 8];
        LittleEndian::write_f64(&mut b, v);
        self.buf.extend_from_slice(&b);
    }

    pub fn id(&mut self, id: &WideId) {
        self.buf.extend_from_slice(id.as_bytes());
    }

    pub fn raw(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    pub fn str(&mut self, s: &str) {
        self.u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
    }

    /// Count prefix for a sequence of `len` elements.
    pub fn seq_len(&mut self, len: usize) {
        self.u32(len as u32);
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buf
    }
}

/// Cursor over an encoded record.
pub struct Reader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> Reader<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    pub fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.cursor.read_u8()?)
    }

    pub fn bool(&mut self) -> Result<bool, DecodeError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            _ => Err(DecodeError::InvalidValue("bool")),
        }
    }

    pub fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(self.cursor.read_u32::<LittleEndian>()?)
    }

    pub fn u64(&mut self) -> Result<u64, DecodeError> {
        Ok(self.cursor.read_u64::<LittleEndian>()?)
    }

    pub fn i64(&mut self) -> Result<i64, DecodeError> {
        Ok(self.cursor.read_i64::<LittleEndian>()?)
    }

    pub fn f32(&mut self) -> Result<f32, DecodeError> {
        Ok(self.cursor.read_f32::<LittleEndian>()?)
    }

    pub fn f64(&mut self) -> Result<f64, DecodeError> {
        Ok(self.cursor.read_f64::<LittleEndian>()?)
    }

    pub fn id(&mut self) -> Result<WideId, DecodeError> {
        let mut bytes = [0u8; WideId::LEN];
        self.cursor.read_exact(&mut bytes)?;
        Ok(WideId::from_bytes(bytes))
    }

    pub fn raw(&mut self, len: usize) -> Result<Vec<u8>, DecodeError> {
        if len > MAX_FIELD_LEN {
            return Err(DecodeError::Oversized(len));
        }
        if len > self.remaining() {
            return Err(DecodeError::Truncated);
        }
        let mut bytes = vec![0u8; len];
        self.cursor.read_exact(&mut bytes)?;
        Ok(bytes)
    }

    pub fn string(&mut self) -> Result<String, DecodeError> {
        let len = self.u32()? as usize;
        let bytes = self.raw(len)?;
        String::from_utf8(bytes).map_err(|_| DecodeError::InvalidUtf8)
    }

    pub fn seq_len(&mut self) -> Result<usize, DecodeError> {
        let len = self.u32()? as usize;
        // Every element takes at least one byte.
        if len > self.remaining() {
            return Err(DecodeError::Truncated);
        }
        Ok(len)
    }

    pub fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len() as u64;
        len.saturating_sub(self.cursor.position()) as usize
    }

    /// Fails if bytes are left over after a complete record.
    pub fn finish(self) -> Result<(), DecodeError> {
        match self.remaining() {
            0 => Ok(()),
            n => Err(DecodeError::TrailingBytes(n)),
        }
    }
}

pub trait Encode {
    fn encode(&self, w: &mut Writer);

    /// Exact number of bytes `encode` writes; used to preallocate buffers.
    fn encoded_len(&self) -> usize;

    fn to_bytes(&self) -> Vec<u8> {
        let mut w = Writer::with_capacity(self.encoded_len());
        self.encode(&mut w);
        w.into_inner()
    }
}

pub trait Decode: Sized {
    fn decode(r: &mut Reader<'_>) -> Result<Self, DecodeError>;

    fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(bytes);
        let value = Self::decode(&mut r)?;
        r.finish()?;
        Ok(value)
    }
}

/// Encoded size of a length-prefixed text field.
pub fn str_len(s: &str) -> usize {
    4 + s.len()
}

pub fn encode_seq<T: Encode>(w: &mut Writer, items: &[T]) {
    w.seq_len(items.len());
    for item in items {
        item.encode(w);
    }
}

pub fn decode_seq<T: Decode>(r: &mut Reader<'_>) -> Result<Vec<T>, DecodeError> {
    let len = r.seq_len()?;
    let mut items = Vec::with_capacity(len);
    for _ in 0..len {
        items.push(T::decode(r)?);
    }
    Ok(items)
}

pub fn seq_len<T: Encode>(items: &[T]) -> usize {
    4 + items.iter().map(Encode::encoded_len).sum::<usize>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reader_reports_truncation() {
        let mut w = Writer::new();
        w.u32(7);
        let bytes = w.into_inner();
        let mut r = Reader::new(&bytes[..3]);
        assert_eq!(r.u32(), Err(DecodeError::Truncated));
    }

    #[test]
    fn string_length_past_end_is_truncated_not_allocated() {
        let mut w = Writer::new();
        w.u32(1_000);
        w.raw(b"abc");
        let bytes = w.into_inner();
        let mut r = Reader::new(&bytes);
        assert_eq!(r.string(), Err(DecodeError::Truncated));
    }

    #[test]
    fn oversized_length_is_rejected() {
        let mut r = Reader::new(&[]);
        assert_eq!(
            r.raw(MAX_FIELD_LEN + 1),
            Err(DecodeError::Oversized(MAX_FIELD_LEN + 1))
        );
    }

    #[test]
    fn invalid_utf8_is_rejected() {
        let mut w = Writer::new();
        w.u32(2);
        w.raw(&[0xff, 0xfe]);
        let bytes = w.into_inner();
        assert_eq!(Reader::new(&bytes).string(), Err(DecodeError::InvalidUtf8));
    }

    #[test]
    fn finish_flags_trailing_bytes() {
        let bytes = [1u8, 0, 9];
        let mut r = Reader::new(&bytes);
        assert!(r.bool().unwrap());
        assert_eq!(r.finish(), Err(DecodeError::TrailingBytes(2)));
    }

    #[test]
    fn bool_rejects_other_values() {
        assert_eq!(
            Reader::new(&[2]).bool(),
            Err(DecodeError::InvalidValue("bool"))
        );
    }
}
