//! Little-endian field encoding shared by all record types.
//!
//! Variable-length fields are written as a `u32` element count followed by
//! the elements.

use std::io::{self, Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use super::{CodecError, ScalarValue};

fn eof_as_truncated(e: io::Error) -> CodecError {
    if e.kind() == io::ErrorKind::UnexpectedEof {
        CodecError::Truncated("unexpected end of input".to_string())
    } else {
        CodecError::IoError(e)
    }
}

fn var_len(len: usize, field: &'static str) -> Result<u32, CodecError> {
    u32::try_from(len).map_err(|_| CodecError::InvalidValue {
        field,
        value: format!("length {} exceeds u32", len),
    })
}

/// Appends fields to a record buffer
pub(crate) struct FieldWriter<'a> {
    out: &'a mut Vec<u8>,
}

impl<'a> FieldWriter<'a> {
    pub(crate) fn new(out: &'a mut Vec<u8>) -> Self {
        Self { out }
    }

    pub(crate) fn u16(&mut self, value: u16) -> Result<(), CodecError> {
        Ok(self.out.write_u16::<LittleEndian>(value)?)
    }

    pub(crate) fn u32(&mut self, value: u32) -> Result<(), CodecError> {
        Ok(self.out.write_u32::<LittleEndian>(value)?)
    }

    pub(crate) fn u64(&mut self, value: u64) -> Result<(), CodecError> {
        Ok(self.out.write_u64::<LittleEndian>(value)?)
    }

    pub(crate) fn f32(&mut self, value: f32) -> Result<(), CodecError> {
        Ok(self.out.write_f32::<LittleEndian>(value)?)
    }

    /// Fixed-length run of values (no length prefix)
    pub(crate) fn fixed<T: ScalarValue>(&mut self, values: &[T]) -> Result<(), CodecError> {
        for value in values {
            value.write_le(self.out)?;
        }
        Ok(())
    }

    pub(crate) fn i32s(&mut self, values: &[i32]) -> Result<(), CodecError> {
        self.fixed(values)
    }

    pub(crate) fn f32s(&mut self, values: &[f32]) -> Result<(), CodecError> {
        self.fixed(values)
    }

    /// Length-prefixed run of values
    pub(crate) fn var<T: ScalarValue>(
        &mut self,
        field: &'static str,
        values: &[T],
    ) -> Result<(), CodecError> {
        self.u32(var_len(values.len(), field)?)?;
        self.fixed(values)
    }

    /// Length-prefixed UTF-8 text
    pub(crate) fn string(&mut self, field: &'static str, value: &str) -> Result<(), CodecError> {
        self.u32(var_len(value.len(), field)?)?;
        self.out.extend_from_slice(value.as_bytes());
        Ok(())
    }
}

/// Reads fields back out of a record buffer
pub(crate) struct FieldReader<'a> {
    cursor: Cursor<&'a [u8]>,
}

impl<'a> FieldReader<'a> {
    pub(crate) fn new(bytes: &'a [u8]) -> Self {
        Self {
            cursor: Cursor::new(bytes),
        }
    }

    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len();
        len.saturating_sub(self.cursor.position() as usize)
    }

    pub(crate) fn u16(&mut self) -> Result<u16, CodecError> {
        self.cursor.read_u16::<LittleEndian>().map_err(eof_as_truncated)
    }

    pub(crate) fn u32(&mut self) -> Result<u32, CodecError> {
        self.cursor.read_u32::<LittleEndian>().map_err(eof_as_truncated)
    }

    pub(crate) fn u64(&mut self) -> Result<u64, CodecError> {
        self.cursor.read_u64::<LittleEndian>().map_err(eof_as_truncated)
    }

    pub(crate) fn f32(&mut self) -> Result<f32, CodecError> {
        self.cursor.read_f32::<LittleEndian>().map_err(eof_as_truncated)
    }

    /// Fixed-length run of `N` values
    pub(crate) fn array<T: ScalarValue, const N: usize>(&mut self) -> Result<[T; N], CodecError> {
        let mut values = [T::default(); N];
        for value in values.iter_mut() {
            *value = T::read_le(&mut self.cursor).map_err(eof_as_truncated)?;
        }
        Ok(values)
    }

    /// Length-prefixed run of values
    pub(crate) fn var<T: ScalarValue>(&mut self, field: &'static str) -> Result<Vec<T>, CodecError> {
        let count = self.u32()? as usize;
        let needed = count.saturating_mul(T::SCALAR.size());
        if needed > self.remaining() {
            return Err(CodecError::Truncated(format!(
                "{} declares {} values but only {} bytes remain",
                field,
                count,
                self.remaining()
            )));
        }
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(T::read_le(&mut self.cursor).map_err(eof_as_truncated)?);
        }
        Ok(values)
    }

    /// Length-prefixed UTF-8 text
    pub(crate) fn string(&mut self, field: &'static str) -> Result<String, CodecError> {
        let len = self.u32()? as usize;
        if len > self.remaining() {
            return Err(CodecError::Truncated(format!(
                "{} declares {} bytes but only {} remain",
                field,
                len,
                self.remaining()
            )));
        }
        let mut bytes = vec![0u8; len];
        self.cursor.read_exact(&mut bytes).map_err(eof_as_truncated)?;
        Ok(std::str::from_utf8(&bytes)?.to_string())
    }

    /// Fail if any input is left over
    pub(crate) fn finish(self) -> Result<(), CodecError> {
        match self.remaining() {
            0 => Ok(()),
            extra => Err(CodecError::TrailingBytes(extra)),
        }
    }
}
