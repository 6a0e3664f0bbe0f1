//! Binary reading and writing utilities for the Snapback protocol.
//!
//! All values are little-endian. Reads never panic: a short buffer yields
//! `ProtocolError::UnexpectedEof` (or `None` from the `try_` variants).

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::ProtocolError;

/// A reader for parsing binary protocol messages.
#[derive(Debug)]
pub struct BinaryReader {
    buf: Bytes,
}

impl BinaryReader {
    /// Create a new reader from raw bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { buf: data.into() }
    }

    /// Returns remaining bytes.
    #[inline]
    pub fn remaining(&self) -> usize {
        self.buf.remaining()
    }

    #[inline]
    fn need(&self, n: usize) -> Result<(), ProtocolError> {
        if self.buf.remaining() >= n {
            Ok(())
        } else {
            Err(ProtocolError::UnexpectedEof)
        }
    }

    #[inline]
    pub fn get_u8(&mut self) -> Result<u8, ProtocolError> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    /// Returns None if not enough data.
    #[inline]
    pub fn try_get_u8(&mut self) -> Option<u8> {
        self.get_u8().ok()
    }

    #[inline]
    pub fn get_u16(&mut self) -> Result<u16, ProtocolError> {
        self.need(2)?;
        Ok(self.buf.get_u16_le())
    }

    #[inline]
    pub fn get_u32(&mut self) -> Result<u32, ProtocolError> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    /// Returns None if not enough data.
    #[inline]
    pub fn try_get_u32(&mut self) -> Option<u32> {
        self.get_u32().ok()
    }

    #[inline]
    pub fn get_f32(&mut self) -> Result<f32, ProtocolError> {
        self.need(4)?;
        Ok(self.buf.get_f32_le())
    }

    /// Returns None if not enough data.
    #[inline]
    pub fn try_get_f32(&mut self) -> Option<f32> {
        self.get_f32().ok()
    }

    #[inline]
    pub fn get_f64(&mut self) -> Result<f64, ProtocolError> {
        self.need(8)?;
        Ok(self.buf.get_f64_le())
    }

    /// Read a null-terminated UTF-8 string of at most `max_len` bytes.
    ///
    /// A missing terminator at the end of the buffer is accepted.
    pub fn get_string_utf8(&mut self, max_len: usize) -> Result<String, ProtocolError> {
        let mut bytes = Vec::new();
        while self.buf.has_remaining() {
            let b = self.buf.get_u8();
            if b == 0 {
                break;
            }
            if bytes.len() == max_len {
                return Err(ProtocolError::StringTooLong(max_len));
            }
            bytes.push(b);
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }
}

/// A writer for building binary protocol messages.
#[derive(Debug, Default)]
pub struct BinaryWriter {
    buf: BytesMut,
}

impl BinaryWriter {
    /// Create a new writer with default capacity.
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create a new writer with the specified capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Returns the current length.
    #[inline]
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Returns true if empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    #[inline]
    pub fn put_u8(&mut self, v: u8) {
        self.buf.put_u8(v);
    }

    #[inline]
    pub fn put_bool(&mut self, v: bool) {
        self.buf.put_u8(v as u8);
    }

    #[inline]
    pub fn put_u16(&mut self, v: u16) {
        self.buf.put_u16_le(v);
    }

    #[inline]
    pub fn put_u32(&mut self, v: u32) {
        self.buf.put_u32_le(v);
    }

    #[inline]
    pub fn put_u64(&mut self, v: u64) {
        self.buf.put_u64_le(v);
    }

    #[inline]
    pub fn put_f32(&mut self, v: f32) {
        self.buf.put_f32_le(v);
    }

    #[inline]
    pub fn put_f64(&mut self, v: f64) {
        self.buf.put_f64_le(v);
    }

    /// Write a null-terminated UTF-8 string.
    pub fn put_string_utf8(&mut self, s: &str) {
        self.buf.put_slice(s.as_bytes());
        self.buf.put_u8(0);
    }

    /// Write raw bytes.
    pub fn put_slice(&mut self, data: &[u8]) {
        self.buf.put_slice(data);
    }

    /// Consume the writer and return the built buffer.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }

    /// Get current buffer as a slice.
    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_read_is_error() {
        let mut r = BinaryReader::new(vec![1u8, 2]);
        assert_eq!(r.get_u32(), Err(ProtocolError::UnexpectedEof));
        // Nothing was consumed by the failed read.
        assert_eq!(r.remaining(), 2);
        assert_eq!(r.try_get_u8(), Some(1));
    }

    #[test]
    fn test_string_length_cap() {
        let mut w = BinaryWriter::new();
        w.put_string_utf8("abcdef");
        let mut r = BinaryReader::new(w.finish());
        assert_eq!(r.get_string_utf8(4), Err(ProtocolError::StringTooLong(4)));

        let mut w = BinaryWriter::new();
        w.put_string_utf8("hello");
        w.put_u8(7);
        let mut r = BinaryReader::new(w.finish());
        assert_eq!(r.get_string_utf8(16).as_deref(), Ok("hello"));
        assert_eq!(r.get_u8(), Ok(7));
    }
}
