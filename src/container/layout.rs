//! Element layouts and dataspaces.
//!
//! An [`ElementLayout`] describes the byte layout of one element of a
//! dataset, in the spirit of a compound datatype: an ordered list of named
//! fields, each a scalar, a fixed-length array, a variable-length array or a
//! variable-length string. Layouts are stored alongside each dataset and
//! compared for equality when a record is appended, so a series keeps one
//! element type for its whole lifetime.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Primitive element types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    /// Unsigned 8-bit integer
    U8,
    /// Unsigned 16-bit integer
    U16,
    /// Unsigned 32-bit integer
    U32,
    /// Unsigned 64-bit integer
    U64,
    /// Signed 8-bit integer
    I8,
    /// Signed 16-bit integer
    I16,
    /// Signed 32-bit integer
    I32,
    /// Signed 64-bit integer
    I64,
    /// IEEE 754 single precision
    F32,
    /// IEEE 754 double precision
    F64,
    /// Complex number as two `f32` (real, imaginary)
    Complex32,
    /// Complex number as two `f64` (real, imaginary)
    Complex64,
}

impl ScalarType {
    /// Size of one value in bytes
    pub fn size(&self) -> usize {
        match self {
            ScalarType::U8 | ScalarType::I8 => 1,
            ScalarType::U16 | ScalarType::I16 => 2,
            ScalarType::U32 | ScalarType::I32 | ScalarType::F32 => 4,
            ScalarType::U64 | ScalarType::I64 | ScalarType::F64 | ScalarType::Complex32 => 8,
            ScalarType::Complex64 => 16,
        }
    }
}

/// Type of a single field within an element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum FieldType {
    /// One scalar value
    Scalar {
        /// Value type
        scalar: ScalarType,
    },
    /// A fixed number of scalar values
    FixedArray {
        /// Value type
        scalar: ScalarType,
        /// Number of values
        len: usize,
    },
    /// A variable number of scalar values
    VarArray {
        /// Value type
        scalar: ScalarType,
    },
    /// Variable-length UTF-8 text
    VarString,
}

impl FieldType {
    /// Encoded size in bytes, or `None` for variable-length fields
    pub fn fixed_size(&self) -> Option<usize> {
        match self {
            FieldType::Scalar { scalar } => Some(scalar.size()),
            FieldType::FixedArray { scalar, len } => Some(scalar.size() * len),
            FieldType::VarArray { .. } | FieldType::VarString => None,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Scalar { scalar } => write!(f, "{:?}", scalar),
            FieldType::FixedArray { scalar, len } => write!(f, "{:?}[{}]", scalar, len),
            FieldType::VarArray { scalar } => write!(f, "{:?}[]", scalar),
            FieldType::VarString => write!(f, "string"),
        }
    }
}

/// A named field of an element layout
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Field {
    /// Field name
    pub name: String,
    /// Field type
    #[serde(flatten)]
    pub ty: FieldType,
}

/// Ordered description of the fields making up one dataset element
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ElementLayout {
    /// Layout name (e.g. "AcquisitionHeader_with_data")
    pub name: String,
    /// Fields in encoding order
    pub fields: Vec<Field>,
}

impl ElementLayout {
    /// Start an empty layout with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Layout of a single variable-length string (used for text values)
    pub fn var_string() -> Self {
        Self::new("string").var_string_field("value")
    }

    /// Append a scalar field
    pub fn scalar(mut self, name: &str, scalar: ScalarType) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            ty: FieldType::Scalar { scalar },
        });
        self
    }

    /// Append a fixed-length array field
    pub fn fixed_array(mut self, name: &str, scalar: ScalarType, len: usize) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            ty: FieldType::FixedArray { scalar, len },
        });
        self
    }

    /// Append a variable-length array field
    pub fn var_array(mut self, name: &str, scalar: ScalarType) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            ty: FieldType::VarArray { scalar },
        });
        self
    }

    /// Append a variable-length string field
    pub fn var_string_field(mut self, name: &str) -> Self {
        self.fields.push(Field {
            name: name.to_string(),
            ty: FieldType::VarString,
        });
        self
    }

    /// Append every field of another layout, prefixing nothing.
    ///
    /// Used to inline nested structures such as encoding counters.
    pub fn extend(mut self, other: &ElementLayout) -> Self {
        self.fields.extend(other.fields.iter().cloned());
        self
    }

    /// Encoded element size in bytes, or `None` if any field is variable-length
    pub fn fixed_size(&self) -> Option<usize> {
        self.fields
            .iter()
            .map(|field| field.ty.fixed_size())
            .sum::<Option<usize>>()
    }
}

impl fmt::Display for ElementLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {{", self.name)?;
        for (i, field) in self.fields.iter().enumerate() {
            if i > 0 {
                write!(f, ",")?;
            }
            write!(f, " {}: {}", field.name, field.ty)?;
        }
        write!(f, " }}")
    }
}

/// Shape of a dataset.
///
/// Only axis 0 may change after creation, and only if its maximum extent is
/// unlimited (`None`). Whether an axis may grow has to be declared when the
/// dataset is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dataspace {
    /// Current extent of every axis
    pub dims: Vec<u64>,
    /// Maximum extent of every axis (`None` = unlimited)
    pub max_dims: Vec<Option<u64>>,
}

impl Dataspace {
    /// A single-element scalar dataspace
    pub fn scalar() -> Self {
        Self::fixed(vec![1])
    }

    /// A dataspace whose extent can never change
    pub fn fixed(dims: Vec<u64>) -> Self {
        let max_dims = dims.iter().map(|d| Some(*d)).collect();
        Self { dims, max_dims }
    }

    /// A one-dimensional dataspace that may grow without bound along axis 0
    pub fn extendible(len: u64) -> Self {
        Self {
            dims: vec![len],
            max_dims: vec![None],
        }
    }

    /// Number of elements described by this dataspace (saturating)
    pub fn element_count(&self) -> u64 {
        self.dims.iter().fold(1u64, |acc, &d| acc.saturating_mul(d))
    }

    /// Current extent along axis 0
    pub fn len(&self) -> u64 {
        self.dims.first().copied().unwrap_or(0)
    }

    /// True when axis 0 has zero extent
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when axis 0 may grow past its current extent
    pub fn is_extendible(&self) -> bool {
        matches!(self.max_dims.first(), Some(None))
    }

    /// Check that dims and max dims agree in rank and bounds
    pub fn is_valid(&self) -> bool {
        !self.dims.is_empty()
            && self.dims.len() == self.max_dims.len()
            && self
                .dims
                .iter()
                .zip(&self.max_dims)
                .all(|(dim, max)| max.map_or(true, |max| *dim <= max))
    }
}
