//! XDR-style codec used for every record exchanged with the master.
//!
//! Big-endian, 4-byte aligned. Variable-length arrays carry a `u32` length
//! prefix on the wire and are additionally governed by a count field that
//! the record decodes earlier; [`XdrDecoder::array`] rejects the record when
//! the two disagree.

use chrono::{DateTime, Utc};
use std::time::Duration;
use thiserror::Error;

/// Result type for marshalling.
pub type MarshalResult<T> = Result<T, MarshalError>;

/// Errors produced while decoding a record.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarshalError {
    /// Input ended before the field was complete.
    #[error("truncated {field}: needed {needed} bytes, {remaining} left")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// Array length prefix disagrees with the record's count field.
    #[error("{field}: count field says {declared}, array holds {encoded}")]
    CountMismatch {
        field: &'static str,
        declared: usize,
        encoded: usize,
    },

    /// Count field is negative.
    #[error("{field}: negative count {value}")]
    NegativeCount { field: &'static str, value: i32 },

    /// Integer outside the range allowed for the field.
    #[error("{field}: value {value} out of range")]
    OutOfRange { field: &'static str, value: String },

    /// Enumerated field holds a code outside its symbolic set.
    #[error("{field}: unknown symbolic value {value}")]
    UnknownSymbol { field: &'static str, value: i32 },

    /// A field that must be non-empty was empty.
    #[error("{field}: must not be empty")]
    EmptyString { field: &'static str },

    /// String bytes are not UTF-8.
    #[error("{field}: invalid UTF-8")]
    InvalidUtf8 { field: &'static str },

    /// Timestamp not representable.
    #[error("{field}: invalid timestamp {value}")]
    InvalidTime { field: &'static str, value: i64 },

    /// Bytes left after the record was fully decoded.
    #[error("{remaining} trailing bytes after record")]
    TrailingBytes { remaining: usize },
}

/// Types that can be written to the wire.
pub trait XdrEncode {
    fn encode(&self, enc: &mut XdrEncoder);
}

/// Types that can be read from the wire.
pub trait XdrDecode: Sized {
    fn decode(dec: &mut XdrDecoder<'_>) -> MarshalResult<Self>;
}

/// Encode a single value into a fresh buffer.
pub fn to_bytes<T: XdrEncode + ?Sized>(value: &T) -> Vec<u8> {
    let mut enc = XdrEncoder::new();
    value.encode(&mut enc);
    enc.into_bytes()
}

/// Decode a single value, requiring that it consumes the whole buffer.
pub fn from_bytes<T: XdrDecode>(bytes: &[u8]) -> MarshalResult<T> {
    let mut dec = XdrDecoder::new(bytes);
    let value = T::decode(&mut dec)?;
    dec.finish()?;
    Ok(value)
}

fn padding(len: usize) -> usize {
    (4 - len % 4) % 4
}

/// Append-only XDR writer.
#[derive(Debug, Default)]
pub struct XdrEncoder {
    buf: Vec<u8>,
}

impl XdrEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_f32(&mut self, v: f32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_f64(&mut self, v: f64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    pub fn put_bool(&mut self, v: bool) {
        self.put_i32(i32::from(v));
    }

    pub fn put_str(&mut self, s: &str) {
        let bytes = s.as_bytes();
        self.put_len(bytes.len());
        self.buf.extend_from_slice(bytes);
        self.buf.extend(std::iter::repeat_n(0u8, padding(bytes.len())));
    }

    /// Write a count field. Lengths beyond `i32::MAX` cannot be represented
    /// and are clamped; the decoder then rejects the mismatching array.
    pub fn put_count(&mut self, len: usize) {
        self.put_i32(i32::try_from(len).unwrap_or(i32::MAX));
    }

    /// Seconds since the Unix epoch.
    pub fn put_time(&mut self, t: &DateTime<Utc>) {
        self.put_i64(t.timestamp());
    }

    /// `None` is written as 0.
    pub fn put_opt_time(&mut self, t: Option<&DateTime<Utc>>) {
        self.put_i64(t.map_or(0, DateTime::timestamp));
    }

    pub fn put_duration(&mut self, d: Duration) {
        self.put_f64(d.as_secs_f64());
    }

    /// Write an array: `u32` length prefix, then each item.
    pub fn put_array<T>(&mut self, items: &[T], mut f: impl FnMut(&mut Self, &T)) {
        self.put_len(items.len());
        for item in items {
            f(self, item);
        }
    }

    pub fn put_records<T: XdrEncode>(&mut self, items: &[T]) {
        self.put_array(items, |enc, item| item.encode(enc));
    }

    pub fn put_strs<S: AsRef<str>>(&mut self, items: &[S]) {
        self.put_array(items, |enc, s| enc.put_str(s.as_ref()));
    }

    fn put_len(&mut self, len: usize) {
        self.put_u32(u32::try_from(len).unwrap_or(u32::MAX));
    }
}

/// Cursor over a received buffer.
#[derive(Debug)]
pub struct XdrDecoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> XdrDecoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    /// Fail if any bytes are left.
    pub fn finish(&self) -> MarshalResult<()> {
        match self.remaining() {
            0 => Ok(()),
            remaining => Err(MarshalError::TrailingBytes { remaining }),
        }
    }

    fn take(&mut self, field: &'static str, n: usize) -> MarshalResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(MarshalError::Truncated {
                field,
                needed: n,
                remaining: self.remaining(),
            });
        }
        let slice = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn take_array<const N: usize>(&mut self, field: &'static str) -> MarshalResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(field, N)?);
        Ok(out)
    }

    pub fn i32(&mut self, field: &'static str) -> MarshalResult<i32> {
        Ok(i32::from_be_bytes(self.take_array(field)?))
    }

    pub fn u32(&mut self, field: &'static str) -> MarshalResult<u32> {
        Ok(u32::from_be_bytes(self.take_array(field)?))
    }

    pub fn i64(&mut self, field: &'static str) -> MarshalResult<i64> {
        Ok(i64::from_be_bytes(self.take_array(field)?))
    }

    pub fn f32(&mut self, field: &'static str) -> MarshalResult<f32> {
        Ok(f32::from_be_bytes(self.take_array(field)?))
    }

    pub fn f64(&mut self, field: &'static str) -> MarshalResult<f64> {
        Ok(f64::from_be_bytes(self.take_array(field)?))
    }

    pub fn bool(&mut self, field: &'static str) -> MarshalResult<bool> {
        match self.i32(field)? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(MarshalError::OutOfRange {
                field,
                value: other.to_string(),
            }),
        }
    }

    pub fn string(&mut self, field: &'static str) -> MarshalResult<String> {
        let len = self.u32(field)? as usize;
        let bytes = self.take(field, len)?;
        self.take(field, padding(len))?;
        String::from_utf8(bytes.to_vec()).map_err(|_| MarshalError::InvalidUtf8 { field })
    }

    /// A string that must not be empty.
    pub fn name(&mut self, field: &'static str) -> MarshalResult<String> {
        let s = self.string(field)?;
        if s.is_empty() {
            return Err(MarshalError::EmptyString { field });
        }
        Ok(s)
    }

    /// An integer that must be `>= min`.
    pub fn i32_min(&mut self, field: &'static str, min: i32) -> MarshalResult<i32> {
        let v = self.i32(field)?;
        if v < min {
            return Err(MarshalError::OutOfRange {
                field,
                value: v.to_string(),
            });
        }
        Ok(v)
    }

    /// Resource limits and rusage values: `-1` means unlimited/unavailable.
    pub fn limit(&mut self, field: &'static str) -> MarshalResult<i32> {
        self.i32_min(field, -1)
    }

    /// A float that must be finite and non-negative.
    pub fn factor(&mut self, field: &'static str) -> MarshalResult<f32> {
        let v = self.f32(field)?;
        if !v.is_finite() || v < 0.0 {
            return Err(MarshalError::OutOfRange {
                field,
                value: v.to_string(),
            });
        }
        Ok(v)
    }

    /// A count field: non-negative `i32`.
    pub fn count(&mut self, field: &'static str) -> MarshalResult<usize> {
        let value = self.i32(field)?;
        usize::try_from(value).map_err(|_| MarshalError::NegativeCount { field, value })
    }

    pub fn time(&mut self, field: &'static str) -> MarshalResult<DateTime<Utc>> {
        let secs = self.i64(field)?;
        DateTime::from_timestamp(secs, 0).ok_or(MarshalError::InvalidTime { field, value: secs })
    }

    /// Zero decodes to `None`.
    pub fn opt_time(&mut self, field: &'static str) -> MarshalResult<Option<DateTime<Utc>>> {
        let secs = self.i64(field)?;
        if secs == 0 {
            return Ok(None);
        }
        DateTime::from_timestamp(secs, 0)
            .map(Some)
            .ok_or(MarshalError::InvalidTime { field, value: secs })
    }

    pub fn duration(&mut self, field: &'static str) -> MarshalResult<Duration> {
        let secs = self.f64(field)?;
        Duration::try_from_secs_f64(secs).map_err(|_| MarshalError::OutOfRange {
            field,
            value: secs.to_string(),
        })
    }

    /// Decode an array whose length was declared by an earlier count field.
    ///
    /// The wire length prefix must equal `declared`. Every item takes at
    /// least four bytes, so a prefix larger than the remaining input is
    /// rejected before anything is allocated.
    pub fn array<T>(
        &mut self,
        field: &'static str,
        declared: usize,
        mut item: impl FnMut(&mut Self) -> MarshalResult<T>,
    ) -> MarshalResult<Vec<T>> {
        let encoded = self.u32(field)? as usize;
        if encoded != declared {
            return Err(MarshalError::CountMismatch {
                field,
                declared,
                encoded,
            });
        }
        if encoded > self.remaining() / 4 {
            return Err(MarshalError::Truncated {
                field,
                needed: encoded * 4,
                remaining: self.remaining(),
            });
        }
        let mut out = Vec::with_capacity(encoded);
        for _ in 0..encoded {
            out.push(item(self)?);
        }
        Ok(out)
    }

    pub fn records<T: XdrDecode>(
        &mut self,
        field: &'static str,
        declared: usize,
    ) -> MarshalResult<Vec<T>> {
        self.array(field, declared, T::decode)
    }

    pub fn strings(&mut self, field: &'static str, declared: usize) -> MarshalResult<Vec<String>> {
        self.array(field, declared, |dec| dec.string(field))
    }

    /// Array of non-empty strings.
    pub fn names(&mut self, field: &'static str, declared: usize) -> MarshalResult<Vec<String>> {
        self.array(field, declared, |dec| dec.name(field))
    }

    pub fn floats(&mut self, field: &'static str, declared: usize) -> MarshalResult<Vec<f32>> {
        self.array(field, declared, |dec| dec.f32(field))
    }

    /// Fixed-size array of limits, each `>= -1`.
    pub fn limits<const N: usize>(&mut self, field: &'static str) -> MarshalResult<[i32; N]> {
        let mut out = [0i32; N];
        for slot in &mut out {
            *slot = self.limit(field)?;
        }
        Ok(out)
    }
}
