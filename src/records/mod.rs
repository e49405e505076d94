//! # Record Types
//!
//! Records are the elements of a series. Each record type declares its
//! [`ElementLayout`] and knows how to encode itself into, and decode itself
//! from, the bytes of one element:
//!
//! - [`Acquisition`]: one readout of raw k-space data with its header
//! - [`Image`]: a reconstructed image with its header and attributes
//! - [`NdArray`]: a generic N-dimensional array
//!
//! Images and arrays are generic over their pixel type. The pixel type is
//! part of the layout, so a series created with `Image<f32>` rejects an
//! `Image<u16>`.
//!
//! All multi-byte values are little-endian.

mod acquisition;
mod codec;
mod error;
mod image;
mod ndarray;

#[cfg(test)]
mod tests;

use std::fmt::Debug;
use std::io::{self, Cursor};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

pub use acquisition::{flags as acquisition_flags, Acquisition, AcquisitionHeader, EncodingCounters};
pub use error::CodecError;
pub use image::{Image, ImageHeader};
pub use ndarray::{NdArray, NDARRAY_MAX_DIMS};

use crate::container::{ElementLayout, ScalarType};

/// Current version written into record headers
pub const RECORD_VERSION: u16 = 1;

/// A fixed-layout element that can be stored in a series
pub trait Record: Sized {
    /// Layout of one encoded element
    fn layout() -> ElementLayout;

    /// Append the encoded record to `out`
    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError>;

    /// Decode one record from exactly `bytes`
    fn decode(bytes: &[u8]) -> Result<Self, CodecError>;

    /// Encode into a fresh buffer
    fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        let mut out = Vec::new();
        self.encode(&mut out)?;
        Ok(out)
    }
}

/// A primitive value with a known little-endian encoding
pub trait ScalarValue: Copy + Default + PartialEq + Debug + 'static {
    /// Matching layout scalar type
    const SCALAR: ScalarType;

    /// Append the value to `out`
    fn write_le(&self, out: &mut Vec<u8>) -> io::Result<()>;

    /// Read one value
    fn read_le(cursor: &mut Cursor<&[u8]>) -> io::Result<Self>;
}

/// A value type usable as image or array data
pub trait PixelType: ScalarValue {
    /// Data type code stored in image and array headers
    const DATA_TYPE: u16;
}

macro_rules! scalar_value {
    ($ty:ty, $scalar:ident, $write:ident, $read:ident) => {
        impl ScalarValue for $ty {
            const SCALAR: ScalarType = ScalarType::$scalar;

            fn write_le(&self, out: &mut Vec<u8>) -> io::Result<()> {
                out.$write::<LittleEndian>(*self)
            }

            fn read_le(cursor: &mut Cursor<&[u8]>) -> io::Result<Self> {
                cursor.$read::<LittleEndian>()
            }
        }
    };
}

scalar_value!(u16, U16, write_u16, read_u16);
scalar_value!(i16, I16, write_i16, read_i16);
scalar_value!(u32, U32, write_u32, read_u32);
scalar_value!(i32, I32, write_i32, read_i32);
scalar_value!(u64, U64, write_u64, read_u64);
scalar_value!(f32, F32, write_f32, read_f32);
scalar_value!(f64, F64, write_f64, read_f64);

impl ScalarValue for [f32; 2] {
    const SCALAR: ScalarType = ScalarType::Complex32;

    fn write_le(&self, out: &mut Vec<u8>) -> io::Result<()> {
        out.write_f32::<LittleEndian>(self[0])?;
        out.write_f32::<LittleEndian>(self[1])
    }

    fn read_le(cursor: &mut Cursor<&[u8]>) -> io::Result<Self> {
        Ok([
            cursor.read_f32::<LittleEndian>()?,
            cursor.read_f32::<LittleEndian>()?,
        ])
    }
}

impl ScalarValue for [f64; 2] {
    const SCALAR: ScalarType = ScalarType::Complex64;

    fn write_le(&self, out: &mut Vec<u8>) -> io::Result<()> {
        out.write_f64::<LittleEndian>(self[0])?;
        out.write_f64::<LittleEndian>(self[1])
    }

    fn read_le(cursor: &mut Cursor<&[u8]>) -> io::Result<Self> {
        Ok([
            cursor.read_f64::<LittleEndian>()?,
            cursor.read_f64::<LittleEndian>()?,
        ])
    }
}

impl PixelType for u16 {
    const DATA_TYPE: u16 = 1;
}
impl PixelType for i16 {
    const DATA_TYPE: u16 = 2;
}
impl PixelType for u32 {
    const DATA_TYPE: u16 = 3;
}
impl PixelType for i32 {
    const DATA_TYPE: u16 = 4;
}
impl PixelType for f32 {
    const DATA_TYPE: u16 = 5;
}
impl PixelType for f64 {
    const DATA_TYPE: u16 = 6;
}
/// Complex float as `[re, im]`
impl PixelType for [f32; 2] {
    const DATA_TYPE: u16 = 7;
}
/// Complex double as `[re, im]`
impl PixelType for [f64; 2] {
    const DATA_TYPE: u16 = 8;
}

/// Check that a buffer length matches the header's description.
pub(crate) fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<(), CodecError> {
    if expected == actual {
        Ok(())
    } else {
        Err(CodecError::SizeMismatch {
            field,
            expected,
            actual,
        })
    }
}
