//! Stream message body: a sequence of typed values read back in order.

use crate::error::{Error, Result};
use crate::value::Value;

/// Body of a stream message.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamBody {
    values: Vec<Value>,
    cursor: usize,
    /// Offset into a `bytes` value that is being read in pieces.
    bytes_offset: Option<usize>,
    reading: bool,
}

impl StreamBody {
    /// Switch to read mode and rewind.
    pub fn reset(&mut self) {
        self.reading = true;
        self.cursor = 0;
        self.bytes_offset = None;
    }

    /// Drop all values and return to write mode.
    pub fn clear(&mut self) {
        self.values.clear();
        self.cursor = 0;
        self.bytes_offset = None;
        self.reading = false;
    }

    /// Number of values written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether nothing has been written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Append a value.
    ///
    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] in read mode.
    pub fn write(&mut self, value: impl Into<Value>) -> Result<()> {
        if self.reading {
            return Err(Error::MessageNotWriteable);
        }
        self.values.push(value.into());
        Ok(())
    }

    /// Append a `char` value.
    ///
    /// # Errors
    ///
    /// [`Error::MessageNotWriteable`] in read mode.
    pub fn write_char(&mut self, value: u16) -> Result<()> {
        self.write(Value::Char(value))
    }

    /// Convert the value under the cursor and advance only on success.
    fn read_with<T>(&mut self, convert: impl FnOnce(&Value) -> Result<T>) -> Result<T> {
        if !self.reading {
            return Err(Error::MessageNotReadable);
        }
        if self.bytes_offset.is_some() {
            return Err(Error::MessageFormat(
                "a byte array field is partially read".into(),
            ));
        }
        let value = self.values.get(self.cursor).ok_or(Error::MessageEof)?;
        let out = convert(value)?;
        self.cursor += 1;
        Ok(out)
    }

    /// # Errors
    ///
    /// [`Error::MessageEof`] at the end, [`Error::MessageFormat`] on a type mismatch.
    pub fn read_bool(&mut self) -> Result<bool> {
        self.read_with(Value::as_bool)
    }

    /// # Errors
    ///
    /// [`Error::MessageEof`] at the end, [`Error::MessageFormat`] on a type mismatch.
    pub fn read_byte(&mut self) -> Result<i8> {
        self.read_with(Value::as_byte)
    }

    /// # Errors
    ///
    /// [`Error::MessageEof`] at the end, [`Error::MessageFormat`] on a type mismatch.
    pub fn read_char(&mut self) -> Result<u16> {
        self.read_with(Value::as_char)
    }

    /// # Errors
    ///
    /// [`Error::MessageEof`] at the end, [`Error::MessageFormat`] on a type mismatch.
    pub fn read_short(&mut self) -> Result<i16> {
        self.read_with(Value::as_short)
    }

    /// # Errors
    ///
    /// [`Error::MessageEof`] at the end, [`Error::MessageFormat`] on a type mismatch.
    pub fn read_int(&mut self) -> Result<i32> {
        self.read_with(Value::as_int)
    }

    /// # Errors
    ///
    /// [`Error::MessageEof`] at the end, [`Error::MessageFormat`] on a type mismatch.
    pub fn read_long(&mut self) -> Result<i64> {
        self.read_with(Value::as_long)
    }

    /// # Errors
    ///
    /// [`Error::MessageEof`] at the end, [`Error::MessageFormat`] on a type mismatch.
    pub fn read_float(&mut self) -> Result<f32> {
        self.read_with(Value::as_float)
    }

    /// # Errors
    ///
    /// [`Error::MessageEof`] at the end, [`Error::MessageFormat`] on a type mismatch.
    pub fn read_double(&mut self) -> Result<f64> {
        self.read_with(Value::as_double)
    }

    /// # Errors
    ///
    /// [`Error::MessageEof`] at the end, [`Error::MessageFormat`] on a byte array.
    pub fn read_string(&mut self) -> Result<String> {
        self.read_with(Value::as_string)
    }

    /// Read the byte array under the cursor in pieces of at most `buf.len()`.
    ///
    /// Returns the number of bytes copied, or `None` once the whole array has
    /// been consumed; that `None` also advances past the field.
    ///
    /// # Errors
    ///
    /// [`Error::MessageEof`] at the end, [`Error::MessageFormat`] when the
    /// value under the cursor is not a byte array.
    pub fn read_bytes(&mut self, buf: &mut [u8]) -> Result<Option<usize>> {
        if !self.reading {
            return Err(Error::MessageNotReadable);
        }
        let value = self.values.get(self.cursor).ok_or(Error::MessageEof)?;
        let data = value.as_bytes()?;
        let offset = self.bytes_offset.unwrap_or(0);
        if offset >= data.len() {
            self.bytes_offset = None;
            self.cursor += 1;
            return Ok(None);
        }
        let n = (data.len() - offset).min(buf.len());
        buf[..n].copy_from_slice(&data[offset..offset + n]);
        self.bytes_offset = Some(offset + n);
        Ok(Some(n))
    }
}

#[cfg(test)]
#[path = "stream_tests.rs"]
mod tests;
