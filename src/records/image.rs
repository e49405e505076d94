use crate::container::{ElementLayout, ScalarType};

use super::acquisition::{DIRECTION_LENGTH, PHYS_STAMPS, POSITION_LENGTH, USER_FLOATS, USER_INTS};
use super::codec::{FieldReader, FieldWriter};
use super::{check_len, CodecError, PixelType, Record, RECORD_VERSION};

/// Header of a reconstructed image
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ImageHeader {
    /// Record version
    pub version: u16,
    /// Pixel type code, see [`PixelType::DATA_TYPE`]
    pub data_type: u16,
    /// Bit field of image flags
    pub flags: u64,
    /// Unique measurement identifier
    pub measurement_uid: u32,
    /// Pixels along x, y and z
    pub matrix_size: [u16; 3],
    /// Field of view in mm along x, y and z
    pub field_of_view: [f32; 3],
    /// Number of receive channels
    pub channels: u16,
    /// Centre position in patient coordinates
    pub position: [f32; POSITION_LENGTH],
    /// Readout direction
    pub read_dir: [f32; DIRECTION_LENGTH],
    /// Phase direction
    pub phase_dir: [f32; DIRECTION_LENGTH],
    /// Slice direction
    pub slice_dir: [f32; DIRECTION_LENGTH],
    /// Table position
    pub patient_table_position: [f32; POSITION_LENGTH],
    /// Signal average
    pub average: u16,
    /// Slice
    pub slice: u16,
    /// Echo / contrast
    pub contrast: u16,
    /// Cardiac phase
    pub phase: u16,
    /// Repetition
    pub repetition: u16,
    /// Set
    pub set: u16,
    /// Acquisition clock time stamp
    pub acquisition_time_stamp: u32,
    /// Physiology time stamps
    pub physiology_time_stamp: [u32; PHYS_STAMPS],
    /// Magnitude, phase, real, imaginary or complex
    pub image_type: u16,
    /// Image index within the series
    pub image_index: u16,
    /// Series index
    pub image_series_index: u16,
    /// Free user integers
    pub user_int: [i32; USER_INTS],
    /// Free user floats
    pub user_float: [f32; USER_FLOATS],
    /// Length in bytes of the attribute string
    pub attribute_string_len: u32,
}

impl Default for ImageHeader {
    fn default() -> Self {
        Self {
            version: RECORD_VERSION,
            data_type: 0,
            flags: 0,
            measurement_uid: 0,
            matrix_size: [0; 3],
            field_of_view: [0.0; 3],
            channels: 0,
            position: [0.0; POSITION_LENGTH],
            read_dir: [0.0; DIRECTION_LENGTH],
            phase_dir: [0.0; DIRECTION_LENGTH],
            slice_dir: [0.0; DIRECTION_LENGTH],
            patient_table_position: [0.0; POSITION_LENGTH],
            average: 0,
            slice: 0,
            contrast: 0,
            phase: 0,
            repetition: 0,
            set: 0,
            acquisition_time_stamp: 0,
            physiology_time_stamp: [0; PHYS_STAMPS],
            image_type: 0,
            image_index: 0,
            image_series_index: 0,
            user_int: [0; USER_INTS],
            user_float: [0.0; USER_FLOATS],
            attribute_string_len: 0,
        }
    }
}

impl ImageHeader {
    /// Number of pixels implied by the header (matrix size times channels)
    pub fn pixel_count(&self) -> usize {
        self.matrix_size
            .iter()
            .map(|&n| n as usize)
            .product::<usize>()
            * self.channels as usize
    }

    fn layout() -> ElementLayout {
        ElementLayout::new("ImageHeader")
            .scalar("version", ScalarType::U16)
            .scalar("data_type", ScalarType::U16)
            .scalar("flags", ScalarType::U64)
            .scalar("measurement_uid", ScalarType::U32)
            .fixed_array("matrix_size", ScalarType::U16, 3)
            .fixed_array("field_of_view", ScalarType::F32, 3)
            .scalar("channels", ScalarType::U16)
            .fixed_array("position", ScalarType::F32, POSITION_LENGTH)
            .fixed_array("read_dir", ScalarType::F32, DIRECTION_LENGTH)
            .fixed_array("phase_dir", ScalarType::F32, DIRECTION_LENGTH)
            .fixed_array("slice_dir", ScalarType::F32, DIRECTION_LENGTH)
            .fixed_array("patient_table_position", ScalarType::F32, POSITION_LENGTH)
            .scalar("average", ScalarType::U16)
            .scalar("slice", ScalarType::U16)
            .scalar("contrast", ScalarType::U16)
            .scalar("phase", ScalarType::U16)
            .scalar("repetition", ScalarType::U16)
            .scalar("set", ScalarType::U16)
            .scalar("acquisition_time_stamp", ScalarType::U32)
            .fixed_array("physiology_time_stamp", ScalarType::U32, PHYS_STAMPS)
            .scalar("image_type", ScalarType::U16)
            .scalar("image_index", ScalarType::U16)
            .scalar("image_series_index", ScalarType::U16)
            .fixed_array("user_int", ScalarType::I32, USER_INTS)
            .fixed_array("user_float", ScalarType::F32, USER_FLOATS)
            .scalar("attribute_string_len", ScalarType::U32)
    }

    fn encode(&self, w: &mut FieldWriter<'_>) -> Result<(), CodecError> {
        w.u16(self.version)?;
        w.u16(self.data_type)?;
        w.u64(self.flags)?;
        w.u32(self.measurement_uid)?;
        w.fixed(&self.matrix_size)?;
        w.f32s(&self.field_of_view)?;
        w.u16(self.channels)?;
        w.f32s(&self.position)?;
        w.f32s(&self.read_dir)?;
        w.f32s(&self.phase_dir)?;
        w.f32s(&self.slice_dir)?;
        w.f32s(&self.patient_table_position)?;
        for value in [
            self.average,
            self.slice,
            self.contrast,
            self.phase,
            self.repetition,
            self.set,
        ] {
            w.u16(value)?;
        }
        w.u32(self.acquisition_time_stamp)?;
        w.fixed(&self.physiology_time_stamp)?;
        w.u16(self.image_type)?;
        w.u16(self.image_index)?;
        w.u16(self.image_series_index)?;
        w.i32s(&self.user_int)?;
        w.f32s(&self.user_float)?;
        w.u32(self.attribute_string_len)
    }

    fn decode(r: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            version: r.u16()?,
            data_type: r.u16()?,
            flags: r.u64()?,
            measurement_uid: r.u32()?,
            matrix_size: r.array()?,
            field_of_view: r.array()?,
            channels: r.u16()?,
            position: r.array()?,
            read_dir: r.array()?,
            phase_dir: r.array()?,
            slice_dir: r.array()?,
            patient_table_position: r.array()?,
            average: r.u16()?,
            slice: r.u16()?,
            contrast: r.u16()?,
            phase: r.u16()?,
            repetition: r.u16()?,
            set: r.u16()?,
            acquisition_time_stamp: r.u32()?,
            physiology_time_stamp: r.array()?,
            image_type: r.u16()?,
            image_index: r.u16()?,
            image_series_index: r.u16()?,
            user_int: r.array()?,
            user_float: r.array()?,
            attribute_string_len: r.u32()?,
        })
    }
}

/// A reconstructed image with pixel type `T`.
///
/// `data` holds `matrix_size[0] * matrix_size[1] * matrix_size[2] *
/// channels` pixels. `attribute_string` carries free-form (usually XML)
/// metadata; its byte length is mirrored in the header.
#[derive(Debug, Clone, PartialEq)]
pub struct Image<T: PixelType> {
    /// Image header
    pub head: ImageHeader,
    /// Free-form attributes
    pub attribute_string: String,
    /// Pixel values
    pub data: Vec<T>,
}

impl<T: PixelType> Image<T> {
    /// Create a zero-filled image of the given size
    pub fn new(matrix_size: [u16; 3], channels: u16) -> Self {
        let head = ImageHeader {
            data_type: T::DATA_TYPE,
            matrix_size,
            channels,
            ..ImageHeader::default()
        };
        Self {
            data: vec![T::default(); head.pixel_count()],
            head,
            attribute_string: String::new(),
        }
    }

    /// Replace the attribute string, keeping the header length in sync
    pub fn set_attribute_string(&mut self, attributes: impl Into<String>) {
        self.attribute_string = attributes.into();
        self.head.attribute_string_len = self.attribute_string.len() as u32;
    }

    /// Pixel at (x, y, z) of channel `channel`
    pub fn pixel(&self, x: u16, y: u16, z: u16, channel: u16) -> Option<T> {
        let [nx, ny, nz] = self.head.matrix_size;
        if x >= nx || y >= ny || z >= nz || channel >= self.head.channels {
            return None;
        }
        let (nx, ny, nz) = (nx as usize, ny as usize, nz as usize);
        let index = x as usize + nx * (y as usize + ny * (z as usize + nz * channel as usize));
        self.data.get(index).copied()
    }

    fn check(&self) -> Result<(), CodecError> {
        if self.head.data_type != T::DATA_TYPE {
            return Err(CodecError::InvalidValue {
                field: "data_type",
                value: format!("{} (expected {})", self.head.data_type, T::DATA_TYPE),
            });
        }
        check_len(
            "attribute_string",
            self.head.attribute_string_len as usize,
            self.attribute_string.len(),
        )?;
        check_len("data", self.head.pixel_count(), self.data.len())
    }
}

impl<T: PixelType> Record for Image<T> {
    fn layout() -> ElementLayout {
        ElementLayout::new(format!("ImageHeader_with_data<{:?}>", T::SCALAR))
            .extend(&ImageHeader::layout())
            .var_string_field("attribute_string")
            .var_array("data", T::SCALAR)
    }

    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        self.check()?;
        let mut w = FieldWriter::new(out);
        self.head.encode(&mut w)?;
        w.string("attribute_string", &self.attribute_string)?;
        w.var("data", &self.data)
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = FieldReader::new(bytes);
        let head = ImageHeader::decode(&mut r)?;
        let attribute_string = r.string("attribute_string")?;
        let data = r.var("data")?;
        r.finish()?;

        let image = Self {
            head,
            attribute_string,
            data,
        };
        image.check()?;
        Ok(image)
    }
}
