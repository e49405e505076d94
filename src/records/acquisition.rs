use crate::container::{ElementLayout, ScalarType};

use super::codec::{FieldReader, FieldWriter};
use super::{check_len, CodecError, Record, RECORD_VERSION};

/// Acquisition flag bit positions (1-based, as used by [`AcquisitionHeader::is_flag_set`])
pub mod flags {
    /// First readout of an encode step along the first phase-encoding axis
    pub const FIRST_IN_ENCODE_STEP1: u64 = 1;
    /// Last readout of an encode step along the first phase-encoding axis
    pub const LAST_IN_ENCODE_STEP1: u64 = 2;
    /// First readout of a slice
    pub const FIRST_IN_SLICE: u64 = 7;
    /// Last readout of a slice
    pub const LAST_IN_SLICE: u64 = 8;
    /// Last readout of the measurement
    pub const LAST_IN_MEASUREMENT: u64 = 25;
    /// Noise calibration readout
    pub const IS_NOISE_MEASUREMENT: u64 = 19;
    /// Parallel imaging calibration readout
    pub const IS_PARALLEL_CALIBRATION: u64 = 20;
    /// Navigator readout
    pub const IS_NAVIGATION_DATA: u64 = 23;
}

/// Number of 64-bit words in the channel mask
pub const CHANNEL_MASKS: usize = 16;
/// Number of user integer slots
pub const USER_INTS: usize = 8;
/// Number of user float slots
pub const USER_FLOATS: usize = 8;
/// Number of physiology time stamps
pub const PHYS_STAMPS: usize = 3;
/// Number of user encoding counters
pub const USER_COUNTERS: usize = 8;
/// Components of a position or direction vector
pub const POSITION_LENGTH: usize = 3;
/// Components of a direction vector
pub const DIRECTION_LENGTH: usize = 3;

/// Position of a readout within the encoding space
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncodingCounters {
    /// Phase encoding line
    pub kspace_encode_step_1: u16,
    /// Partition encoding
    pub kspace_encode_step_2: u16,
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
    /// Set (e.g. flow encoding direction)
    pub set: u16,
    /// Segment (e.g. for turbo spin echo)
    pub segment: u16,
    /// Free user counters
    pub user: [u16; USER_COUNTERS],
}

impl EncodingCounters {
    pub(crate) fn layout() -> ElementLayout {
        ElementLayout::new("EncodingCounters")
            .scalar("kspace_encode_step_1", ScalarType::U16)
            .scalar("kspace_encode_step_2", ScalarType::U16)
            .scalar("average", ScalarType::U16)
            .scalar("slice", ScalarType::U16)
            .scalar("contrast", ScalarType::U16)
            .scalar("phase", ScalarType::U16)
            .scalar("repetition", ScalarType::U16)
            .scalar("set", ScalarType::U16)
            .scalar("segment", ScalarType::U16)
            .fixed_array("user", ScalarType::U16, USER_COUNTERS)
    }

    fn encode(&self, w: &mut FieldWriter<'_>) -> Result<(), CodecError> {
        for value in [
            self.kspace_encode_step_1,
            self.kspace_encode_step_2,
            self.average,
            self.slice,
            self.contrast,
            self.phase,
            self.repetition,
            self.set,
            self.segment,
        ] {
            w.u16(value)?;
        }
        w.fixed(&self.user)
    }

    fn decode(r: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            kspace_encode_step_1: r.u16()?,
            kspace_encode_step_2: r.u16()?,
            average: r.u16()?,
            slice: r.u16()?,
            contrast: r.u16()?,
            phase: r.u16()?,
            repetition: r.u16()?,
            set: r.u16()?,
            segment: r.u16()?,
            user: r.array()?,
        })
    }
}

/// Header of one raw data readout
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AcquisitionHeader {
    /// Record version
    pub version: u16,
    /// Bit field of acquisition flags, see [`flags`]
    pub flags: u64,
    /// Unique measurement identifier
    pub measurement_uid: u32,
    /// Running readout counter
    pub scan_counter: u32,
    /// Acquisition clock time stamp
    pub acquisition_time_stamp: u32,
    /// Physiology time stamps (e.g. ECG, breathing)
    pub physiology_time_stamp: [u32; PHYS_STAMPS],
    /// Samples per channel
    pub number_of_samples: u16,
    /// Channels available in the coil
    pub available_channels: u16,
    /// Channels present in this readout
    pub active_channels: u16,
    /// Mask of active channels
    pub channel_mask: [u64; CHANNEL_MASKS],
    /// Samples to discard at the start
    pub discard_pre: u16,
    /// Samples to discard at the end
    pub discard_post: u16,
    /// Sample at the k-space centre
    pub center_sample: u16,
    /// Index of the encoding space this readout belongs to
    pub encoding_space_ref: u16,
    /// Dimensions of each trajectory point (0 = Cartesian)
    pub trajectory_dimensions: u16,
    /// Dwell time in microseconds
    pub sample_time_us: f32,
    /// Slice position in patient coordinates
    pub position: [f32; POSITION_LENGTH],
    /// Readout direction
    pub read_dir: [f32; DIRECTION_LENGTH],
    /// Phase direction
    pub phase_dir: [f32; DIRECTION_LENGTH],
    /// Slice direction
    pub slice_dir: [f32; DIRECTION_LENGTH],
    /// Table position
    pub patient_table_position: [f32; POSITION_LENGTH],
    /// Encoding counters
    pub idx: EncodingCounters,
    /// Free user integers
    pub user_int: [i32; USER_INTS],
    /// Free user floats
    pub user_float: [f32; USER_FLOATS],
}

impl Default for AcquisitionHeader {
    fn default() -> Self {
        Self {
            version: RECORD_VERSION,
            flags: 0,
            measurement_uid: 0,
            scan_counter: 0,
            acquisition_time_stamp: 0,
            physiology_time_stamp: [0; PHYS_STAMPS],
            number_of_samples: 0,
            available_channels: 0,
            active_channels: 0,
            channel_mask: [0; CHANNEL_MASKS],
            discard_pre: 0,
            discard_post: 0,
            center_sample: 0,
            encoding_space_ref: 0,
            trajectory_dimensions: 0,
            sample_time_us: 0.0,
            position: [0.0; POSITION_LENGTH],
            read_dir: [0.0; DIRECTION_LENGTH],
            phase_dir: [0.0; DIRECTION_LENGTH],
            slice_dir: [0.0; DIRECTION_LENGTH],
            patient_table_position: [0.0; POSITION_LENGTH],
            idx: EncodingCounters::default(),
            user_int: [0; USER_INTS],
            user_float: [0.0; USER_FLOATS],
        }
    }
}

impl AcquisitionHeader {
    /// Whether flag bit `flag` (1-based) is set
    pub fn is_flag_set(&self, flag: u64) -> bool {
        flag > 0 && flag <= 64 && self.flags & (1u64 << (flag - 1)) != 0
    }

    /// Set flag bit `flag` (1-based)
    pub fn set_flag(&mut self, flag: u64) {
        if flag > 0 && flag <= 64 {
            self.flags |= 1u64 << (flag - 1);
        }
    }

    /// Clear flag bit `flag` (1-based)
    pub fn clear_flag(&mut self, flag: u64) {
        if flag > 0 && flag <= 64 {
            self.flags &= !(1u64 << (flag - 1));
        }
    }

    /// Number of complex samples implied by the header
    pub fn data_len(&self) -> usize {
        self.number_of_samples as usize * self.active_channels as usize
    }

    /// Number of trajectory values implied by the header
    pub fn traj_len(&self) -> usize {
        self.number_of_samples as usize * self.trajectory_dimensions as usize
    }

    fn layout() -> ElementLayout {
        ElementLayout::new("AcquisitionHeader")
            .scalar("version", ScalarType::U16)
            .scalar("flags", ScalarType::U64)
            .scalar("measurement_uid", ScalarType::U32)
            .scalar("scan_counter", ScalarType::U32)
            .scalar("acquisition_time_stamp", ScalarType::U32)
            .fixed_array("physiology_time_stamp", ScalarType::U32, PHYS_STAMPS)
            .scalar("number_of_samples", ScalarType::U16)
            .scalar("available_channels", ScalarType::U16)
            .scalar("active_channels", ScalarType::U16)
            .fixed_array("channel_mask", ScalarType::U64, CHANNEL_MASKS)
            .scalar("discard_pre", ScalarType::U16)
            .scalar("discard_post", ScalarType::U16)
            .scalar("center_sample", ScalarType::U16)
            .scalar("encoding_space_ref", ScalarType::U16)
            .scalar("trajectory_dimensions", ScalarType::U16)
            .scalar("sample_time_us", ScalarType::F32)
            .fixed_array("position", ScalarType::F32, POSITION_LENGTH)
            .fixed_array("read_dir", ScalarType::F32, DIRECTION_LENGTH)
            .fixed_array("phase_dir", ScalarType::F32, DIRECTION_LENGTH)
            .fixed_array("slice_dir", ScalarType::F32, DIRECTION_LENGTH)
            .fixed_array("patient_table_position", ScalarType::F32, POSITION_LENGTH)
            .extend(&EncodingCounters::layout())
            .fixed_array("user_int", ScalarType::I32, USER_INTS)
            .fixed_array("user_float", ScalarType::F32, USER_FLOATS)
    }

    fn encode(&self, w: &mut FieldWriter<'_>) -> Result<(), CodecError> {
        w.u16(self.version)?;
        w.u64(self.flags)?;
        w.u32(self.measurement_uid)?;
        w.u32(self.scan_counter)?;
        w.u32(self.acquisition_time_stamp)?;
        w.fixed(&self.physiology_time_stamp)?;
        w.u16(self.number_of_samples)?;
        w.u16(self.available_channels)?;
        w.u16(self.active_channels)?;
        w.fixed(&self.channel_mask)?;
        w.u16(self.discard_pre)?;
        w.u16(self.discard_post)?;
        w.u16(self.center_sample)?;
        w.u16(self.encoding_space_ref)?;
        w.u16(self.trajectory_dimensions)?;
        w.f32(self.sample_time_us)?;
        w.f32s(&self.position)?;
        w.f32s(&self.read_dir)?;
        w.f32s(&self.phase_dir)?;
        w.f32s(&self.slice_dir)?;
        w.f32s(&self.patient_table_position)?;
        self.idx.encode(w)?;
        w.i32s(&self.user_int)?;
        w.f32s(&self.user_float)
    }

    fn decode(r: &mut FieldReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            version: r.u16()?,
            flags: r.u64()?,
            measurement_uid: r.u32()?,
            scan_counter: r.u32()?,
            acquisition_time_stamp: r.u32()?,
            physiology_time_stamp: r.array()?,
            number_of_samples: r.u16()?,
            available_channels: r.u16()?,
            active_channels: r.u16()?,
            channel_mask: r.array()?,
            discard_pre: r.u16()?,
            discard_post: r.u16()?,
            center_sample: r.u16()?,
            encoding_space_ref: r.u16()?,
            trajectory_dimensions: r.u16()?,
            sample_time_us: r.f32()?,
            position: r.array()?,
            read_dir: r.array()?,
            phase_dir: r.array()?,
            slice_dir: r.array()?,
            patient_table_position: r.array()?,
            idx: EncodingCounters::decode(r)?,
            user_int: r.array()?,
            user_float: r.array()?,
        })
    }
}

/// One readout: header, optional trajectory and complex samples.
///
/// `data` holds `active_channels * number_of_samples` complex values as
/// `[re, im]`, channel-major. `traj` holds `trajectory_dimensions *
/// number_of_samples` values.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Acquisition {
    /// Readout header
    pub head: AcquisitionHeader,
    /// Trajectory values
    pub traj: Vec<f32>,
    /// Complex samples
    pub data: Vec<[f32; 2]>,
}

impl Acquisition {
    /// Create an acquisition with zeroed buffers sized from the header
    pub fn new(number_of_samples: u16, active_channels: u16, trajectory_dimensions: u16) -> Self {
        let head = AcquisitionHeader {
            number_of_samples,
            active_channels,
            available_channels: active_channels,
            trajectory_dimensions,
            ..AcquisitionHeader::default()
        };
        Self {
            traj: vec![0.0; head.traj_len()],
            data: vec![[0.0, 0.0]; head.data_len()],
            head,
        }
    }

    /// Complex sample `sample` of channel `channel`
    pub fn sample(&self, channel: u16, sample: u16) -> Option<[f32; 2]> {
        if channel >= self.head.active_channels || sample >= self.head.number_of_samples {
            return None;
        }
        let index = channel as usize * self.head.number_of_samples as usize + sample as usize;
        self.data.get(index).copied()
    }

    fn check(&self) -> Result<(), CodecError> {
        check_len("traj", self.head.traj_len(), self.traj.len())?;
        check_len("data", self.head.data_len(), self.data.len())
    }
}

impl Record for Acquisition {
    fn layout() -> ElementLayout {
        ElementLayout::new("AcquisitionHeader_with_data")
            .extend(&AcquisitionHeader::layout())
            .var_array("traj", ScalarType::F32)
            .var_array("data", ScalarType::Complex32)
    }

    fn encode(&self, out: &mut Vec<u8>) -> Result<(), CodecError> {
        self.check()?;
        let mut w = FieldWriter::new(out);
        self.head.encode(&mut w)?;
        w.var("traj", &self.traj)?;
        w.var("data", &self.data)
    }

    fn decode(bytes: &[u8]) -> Result<Self, CodecError> {
        let mut r = FieldReader::new(bytes);
        let head = AcquisitionHeader::decode(&mut r)?;
        let traj = r.var("traj")?;
        let data = r.var("data")?;
        r.finish()?;

        let acquisition = Self { head, traj, data };
        acquisition.check()?;
        Ok(acquisition)
    }
}
