//! Bytes message body: a big-endian primitive stream with a read cursor.

use crate::error::{Error, Result};

/// Body of a bytes message.
///
/// A fresh body is write-only. [`reset`](Self::reset) freezes the content and
/// rewinds the cursor for reading; [`clear`](Self::clear) returns to writing.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BytesBody {
    data: Vec<u8>,
    pos: usize,
    reading: bool,
}

impl BytesBody {
    /// Write-mode body pre-filled with `initial`.
    #[must_use]
    pub fn new(initial: &[u8]) -> Self {
        Self {
            data: initial.to_vec(),
            pos: 0,
            reading: false,
        }
    }

    /// Switch to read mode and rewind.
    pub fn reset(&mut self) {
        self.reading = true;
        self.pos = 0;
    }

    /// Drop the content and return to write mode.
    pub fn clear(&mut self) {
        self.data.clear();
        self.pos = 0;
        self.reading = false;
    }

    /// Whether the body is in read mode.
    #[must_use]
    pub const fn is_readable(&self) -> bool {
        self.reading
    }

    /// Total body length in bytes.
    ///
    /// # Errors
    ///
    /// [`Error::MessageNotReadable`] before [`reset`](Self::reset).
    pub fn body_length(&self) -> Result<usize> {
        self.ensure_readable()?;
        Ok(self.data.len())
    }

    /// Content without regard to mode.
    #[must_use]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    const fn ensure_readable(&self) -> Result<()> {
        if self.reading {
            Ok(())
        } else {
            Err(Error::MessageNotReadable)
        }
    }

    const fn ensure_writable(&self) -> Result<()> {
        if self.reading {
            Err(Error::MessageNotWriteable)
        } else {
            Ok(())
        }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N]> {
        self.ensure_readable()?;
        let end = self.pos + N;
        let chunk: [u8; N] = self
            .data
            .get(self.pos..end)
            .and_then(|s| s.try_into().ok())
            .ok_or(Error::MessageEof)?;
        self.pos = end;
        Ok(chunk)
    }

    fn put(&mut self, bytes: &[u8]) -> Result<()> {
        self.ensure_writable()?;
        self.data.extend_from_slice(bytes);
        Ok(())
    }

    // ---------------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------------

    /// # Errors
    ///
    /// [`Error::MessageNotReadable`] in write mode, [`Error::MessageEof`] at the end.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.take::<1>()?[0] != 0)
    }

    /// # Errors
    ///
    /// [`Error::MessageNotReadable`] in write mode, [`Error::MessageEof`] at the end.
    pub fn read_byte(&mut self) -> Result<i8> {
        Ok(i8::from_be_bytes(self.take()?))
    }

    /// # Errors
    ///
    /// [`Error::MessageNotReadable`] in write mode, [`Error::MessageEof`] at the end.
    pub fn read_char(&mut self) -> Result<u16> {
        Ok(u16::from_be_bytes(self.take()?))
    }

    /// # Errors
    ///
    /// [`Error::MessageNotReadable`] in write mode, [`Error::MessageEof`] at the end.
    pub fn read_short(&mut self) -> Result<i16> {
        Ok(i16::from_be_bytes(self.take()?))
    }

    /// # Errors
    ///
    /// [`Error::MessageNotReadable`] in write mode, [`Error::MessageEof`] at the end.
    pub fn read_int(&mut self) -> Result<i32> {
        Ok(i32::from_be_bytes(self.take()?))
    }

    /// # Errors
    ///
    /// [`Error::MessageNotReadable`] in write mode, [`Error::MessageEof`] at the end.
    pub fn read_long(&mut self) -> Result<i64> {
        Ok(i64::from_be_bytes(self.take()?))
    }

    /// # Errors
    ///
    /// [`Error::MessageNotReadable`] in write mode, [`Error::MessageEof`] at the end.
    pub fn read_float(&mut self) -> Result<f32> {
        Ok(f32::from_be_bytes(self.take()?))
    }

    /// # Errors
    ///
    /// [`Error::MessageNotReadable`] in write mode, [`Error::MessageEof`] at the end.
    pub fn read_double(&mut self) -> Result<f64> {
        Ok(f64::from_be_bytes(self.take()?))
    }

    /// Copy up to `buf.len()` bytes. Returns `None` once nothing remains.
    ///
    /// # Errors
    ///
    /// [`Error::MessageNotReadable`] in write mode.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        self.ensure_readable()?;
        let remaining = &self.data[self.pos..];
        if remaining.is_empty() {
            return Ok(None);
        }
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.pos += n;
        Ok(Some(n))
    }

    /// Read a NUL-terminated string.
    ///
    /// # Errors
    ///
    /// [`Error::MessageEof`] when no terminator remains,
    /// [`Error::MessageFormat`] when the bytes are not UTF-8.
    pub fn read_string(&mut self) -> Result<String> {
        self.ensure_readable()?;
        let remaining = &self.data[self.pos..];
        let len = remaining
            .iter()
            .position(|&b| b == 0)
            .ok_or(Error::MessageEof)?;
        let s = std::str::from_utf8(&remaining[..len])
            .map_err(|e| Error::MessageFormat(e.to_string()))?
            .to_owned();
        self.pos += len + 1;
        Ok(s)
    }

    /// Read a length-prefixed modified UTF-8 string.
    ///
    /// # Errors
    ///
    /// [`Error::MessageEof`] on a short body, [`Error::MessageFormat`] on a bad encoding.
    pub fn read_utf(&mut self) -> Result<String> {
        let start = self.pos;
        let len = usize::from(u16::from_be_bytes(self.take()?));
        let Some(encoded) = self.data.get(self.pos..self.pos + len) else {
            self.pos = start;
            return Err(Error::MessageEof);
        };
        match decode_modified_utf8(encoded) {
            Ok(s) => {
                self.pos += len;
                Ok(s)
            }
            Err(e) => {
                self.pos = start;
                Err(e)
            }
        }
    }

    // ---------------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------------

    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] in read mode.
    pub fn write_bool(&mut self, v: bool) -> Result<()> {
        self.put(&[u8::from(v)])
    }

    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] in read mode.
    pub fn write_byte(&mut self, v: i8) -> Result<()> {
        self.put(&v.to_be_bytes())
    }

    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] in read mode.
    pub fn write_char(&mut self, v: u16) -> Result<()> {
        self.put(&v.to_be_bytes())
    }

    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] in read mode.
    pub fn write_short(&mut self, v: i16) -> Result<()> {
        self.put(&v.to_be_bytes())
    }

    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] in read mode.
    pub fn write_int(&mut self, v: i32) -> Result<()> {
        self.put(&v.to_be_bytes())
    }

    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] in read mode.
    pub fn write_long(&mut self, v: i64) -> Result<()> {
        self.put(&v.to_be_bytes())
    }

    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] in read mode.
    pub fn write_float(&mut self, v: f32) -> Result<()> {
        self.put(&v.to_be_bytes())
    }

    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] in read mode.
    pub fn write_double(&mut self, v: f64) -> Result<()> {
        self.put(&v.to_be_bytes())
    }

    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] in read mode.
    pub fn write_bytes(&mut self, v: &[u8]) -> Result<()> {
        self.put(v)
    }

    /// Write `v` followed by a NUL terminator.
    ///
    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] in read mode,
    /// [`Error::MessageFormat`] if `v` contains a NUL.
    pub fn write_string(&mut self, v: &str) -> Result<()> {
        self.ensure_writable()?;
        if v.as_bytes().contains(&0) {
            return Err(Error::MessageFormat("string contains a NUL byte".into()));
        }
        self.data.extend_from_slice(v.as_bytes());
        self.data.push(0);
        Ok(())
    }

    /// Write `v` as a `u16` length followed by modified UTF-8.
    ///
    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] in read mode,
    /// [`Error::MessageFormat`] if the encoding exceeds 65535 bytes.
    pub fn write_utf(&mut self, v: &str) -> Result<()> {
        self.ensure_writable()?;
        let encoded = encode_modified_utf8(v);
        let len = u16::try_from(encoded.len())
            .map_err(|_| Error::MessageFormat("encoded string exceeds 65535 bytes".into()))?;
        self.data.extend_from_slice(&len.to_be_bytes());
        self.data.extend_from_slice(&encoded);
        Ok(())
    }
}

/// Encode as modified UTF-8: NUL takes two bytes and supplementary
/// characters are written as surrogate pairs.
#[must_use]
pub fn encode_modified_utf8(s: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(s.len());
    for unit in s.encode_utf16() {
        match unit {
            0x0001..=0x007F => out.push(unit as u8),
            0x0000 | 0x0080..=0x07FF => {
                out.push(0xC0 | (unit >> 6) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
            _ => {
                out.push(0xE0 | (unit >> 12) as u8);
                out.push(0x80 | ((unit >> 6) & 0x3F) as u8);
                out.push(0x80 | (unit & 0x3F) as u8);
            }
        }
    }
    out
}

/// Decode modified UTF-8 produced by [`encode_modified_utf8`].
///
/// # Errors
///
/// [`Error::MessageFormat`] on a malformed sequence or unpaired surrogate.
pub fn decode_modified_utf8(bytes: &[u8]) -> Result<String> {
    let malformed = || Error::MessageFormat("malformed modified UTF-8".into());
    let mut units = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b0 = u16::from(bytes[i]);
        let unit = match b0 {
            0x01..=0x7F => {
                i += 1;
                b0
            }
            0xC0..=0xDF => {
                let b1 = continuation(bytes.get(i + 1)).ok_or_else(malformed)?;
                i += 2;
                ((b0 & 0x1F) << 6) | b1
            }
            0xE0..=0xEF => {
                let b1 = continuation(bytes.get(i + 1)).ok_or_else(malformed)?;
                let b2 = continuation(bytes.get(i + 2)).ok_or_else(malformed)?;
                i += 3;
                ((b0 & 0x0F) << 12) | (b1 << 6) | b2
            }
            _ => return Err(malformed()),
        };
        units.push(unit);
    }
    String::from_utf16(&units).map_err(|_| malformed())
}

fn continuation(b: Option<&u8>) -> Option<u16> {
    b.filter(|&&b| b & 0xC0 == 0x80).map(|&b| u16::from(b & 0x3F))
}

#[cfg(test)]
#[path = "bytes_tests.rs"]
mod tests;
