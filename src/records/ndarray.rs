use crate::container::{ElementLayout, ScalarType};

use super::codec::{FieldReader, FieldWriter};
use super::{check_len, CodecError, PixelType, Record, RECORD_VERSION};

/// Maximum number of dimensions of an [`NdArray`]
pub const NDARRAY_MAX_DIMS: usize = 7;

/// A generic N-dimensional array of `T`, stored in first-axis-fastest order
#[derive(Debug, Clone, PartialEq)]
pub struct NdArray<T: PixelType> {
    dims: Vec<u64>,
    data: Vec<T>,
}

impl<T: PixelType> NdArray<T> {
    /// Create a zero-filled array with the given dimensions
    pub fn zeros(dims: &[u64]) -> Result<Self, CodecError> {
        let len = element_count(dims)?;
        Ok(Self {
            dims: dims.to_vec(),
            data: vec![T::default(); len],
        })
    }

    /// Wrap existing data; its length must match the dimensions
    pub fn from_vec(dims: &[u64], data: Vec<T>) -> Result<Self, CodecError> {
        check_len("data", element_count(dims)?, data.len())?;
        Ok(Self {
            dims: dims.to_vec(),
            data,
        })
    }

    /// Array dimensions
    pub fn dims(&self) -> &[u64] {
        &self.dims
    }

    /// Array values
    pub fn data(&self) -> &[T] {
        &self.data
    }

    /// Mutable array values
    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Consume the array, returning its values
    pub fn into_data(self) -> Vec<T> {
        self.data
    }
}

fn element_count(dims: &[u64]) -> Result<usize, CodecError> {
    if dims.is_empty() || dims.len() > NDARRAY_MAX_DIMS {
        return Err(CodecError::InvalidValue {
            field: "ndim",
            value: format!("{} (expected 1..={})", dims.len(), NDARRAY_MAX_DIMS),
        });
    }
    dims.iter()
        .try_fold(1u64, |acc, &d| acc.checked_mul(d))
        .and_then(|n| usize::try_from(n).ok())
        .ok_or_else(|| CodecError::InvalidValue {
            field: "dims",
            value: format!("{:?} overflows", dims),
        })
}

impl<T: PixelType> Record for NdArray<T> {
    fn layout() -> ElementLayout {
        ElementLayout::new(format!("NDArray<{:?}>", T::SCALAR))
            .scalar("version", ScalarType::U16)
            .scalar("data_type", ScalarType::U16)
            .scalar("ndim", ScalarType::U16)
            .var_array("dims", ScalarType::U64)
            .var_array("data", T::SCALAR)
    }

    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        let mut w = FieldWriter::new(out);
        w.u16(RECORD_VERSION)?;
        w.u16(T::DATA_TYPE)?;
        w.u16(self.dims.len() as u16)?;
        w.var("dims", &self.dims)?;
        w.var("data", &self.data)
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = FieldReader::new(bytes);
        let _version = r.u16()?;
        let data_type = r.u16()?;
        if data_type != T::DATA_TYPE {
            return Err(CodecError::InvalidValue {
                field: "data_type",
                value: format!("{} (expected {})", data_type, T::DATA_TYPE),
            });
        }
        let ndim = r.u16()? as usize;
        let dims: Vec<u64> = r.var("dims")?;
        check_len("dims", ndim, dims.len())?;
        let data = r.var("data")?;
        r.finish()?;

        Self::from_vec(&dims, data)
    }
}
