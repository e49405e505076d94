use super::*;
use crate::container::FieldType;

fn sample_acquisition() -> Acquisition {
    let mut acq = Acquisition::new(4, 2, 2);
    acq.head.scan_counter = 17;
    acq.head.idx.kspace_encode_step_1 = 3;
    acq.head.idx.user[7] = 9;
    acq.head.channel_mask[0] = 0b11;
    acq.head.user_int[2] = -5;
    acq.head.read_dir = [1.0, 0.0, 0.0];
    acq.head.set_flag(acquisition_flags::LAST_IN_SLICE);
    for (i, value) in acq.data.iter_mut().enumerate() {
        *value = [i as f32, -(i as f32)];
    }
    for (i, value) in acq.traj.iter_mut().enumerate() {
        *value = i as f32 * 0.5;
    }
    acq
}

#[test]
fn test_acquisition_roundtrip() {
    let acq = sample_acquisition();
    let bytes = acq.to_bytes().unwrap();
    let back = Acquisition::decode(&bytes).unwrap();
    assert_eq!(acq, back);
    assert!(back.head.is_flag_set(acquisition_flags::LAST_IN_SLICE));
    assert!(!back.head.is_flag_set(acquisition_flags::FIRST_IN_SLICE));
    assert_eq!(back.sample(1, 0), Some([4.0, -4.0]));
    assert_eq!(back.sample(2, 0), None);
}

#[test]
fn test_acquisition_flags() {
    let mut head = AcquisitionHeader::default();
    head.set_flag(1);
    head.set_flag(64);
    assert_eq!(head.flags, 1 | (1 << 63));
    head.clear_flag(1);
    assert!(!head.is_flag_set(1));
    assert!(head.is_flag_set(64));
    head.set_flag(0);
    head.set_flag(65);
    assert_eq!(head.flags, 1 << 63);
}

#[test]
fn test_acquisition_rejects_inconsistent_sizes() {
    let mut acq = Acquisition::new(4, 2, 0);
    acq.data.pop();
    assert!(matches!(
        acq.to_bytes(),
        Err(CodecError::SizeMismatch { field: "data", expected: 8, actual: 7 })
    ));
}

#[test]
fn test_acquisition_decode_rejects_truncation_and_trailing_bytes() {
    let bytes = sample_acquisition().to_bytes().unwrap();
    assert!(matches!(
        Acquisition::decode(&bytes[..bytes.len() - 1]),
        Err(CodecError::Truncated(_))
    ));

    let mut padded = bytes.clone();
    padded.push(0);
    assert!(matches!(
        Acquisition::decode(&padded),
        Err(CodecError::TrailingBytes(1))
    ));
}

#[test]
fn test_acquisition_layout() {
    let layout = Acquisition::layout();
    assert_eq!(layout.name, "AcquisitionHeader_with_data");
    assert_eq!(layout.fixed_size(), None);

    let names: Vec<&str> = layout.fields.iter().map(|f| f.name.as_str()).collect();
    assert_eq!(names.first(), Some(&"version"));
    assert_eq!(names[names.len() - 2..], ["traj", "data"]);
    assert!(names.contains(&"kspace_encode_step_1"));

    let data = layout.fields.last().unwrap();
    assert_eq!(
        data.ty,
        FieldType::VarArray {
            scalar: ScalarType::Complex32
        }
    );
}

#[test]
fn test_acquisition_header_prefix_size() {
    // Everything ahead of the two length-prefixed arrays is fixed
    let layout = Acquisition::layout();
    let fixed: usize = layout
        .fields
        .iter()
        .filter_map(|f| f.ty.fixed_size())
        .sum();
    let acq = Acquisition::new(0, 0, 0);
    assert_eq!(acq.to_bytes().unwrap().len(), fixed + 8);
}

#[test]
fn test_image_roundtrip() {
    let mut image = Image::<f32>::new([3, 2, 1], 2);
    image.head.image_index = 4;
    image.head.field_of_view = [200.0, 200.0, 5.0];
    image.set_attribute_string("<ismrmrdMeta/>");
    for (i, value) in image.data.iter_mut().enumerate() {
        *value = i as f32;
    }

    let back = Image::<f32>::decode(&image.to_bytes().unwrap()).unwrap();
    assert_eq!(image, back);
    assert_eq!(back.head.data_type, 5);
    assert_eq!(back.pixel(2, 1, 0, 1), Some(11.0));
    assert_eq!(back.pixel(3, 0, 0, 0), None);
}

#[test]
fn test_image_complex_pixels() {
    let mut image = Image::<[f32; 2]>::new([2, 1, 1], 1);
    image.data[1] = [1.0, -1.0];
    let back = Image::<[f32; 2]>::decode(&image.to_bytes().unwrap()).unwrap();
    assert_eq!(back.data, vec![[0.0, 0.0], [1.0, -1.0]]);
}

#[test]
fn test_image_pixel_type_is_part_of_layout() {
    assert_ne!(Image::<f32>::layout(), Image::<u16>::layout());
    assert_eq!(Image::<f32>::layout(), Image::<f32>::layout());
}

#[test]
fn test_image_rejects_wrong_data_type() {
    let image = Image::<u16>::new([1, 1, 1], 1);
    let bytes = image.to_bytes().unwrap();
    assert!(matches!(
        Image::<i16>::decode(&bytes),
        Err(CodecError::InvalidValue { field: "data_type", .. })
    ));

    let mut bad = Image::<f32>::new([1, 1, 1], 1);
    bad.head.data_type = 1;
    assert!(matches!(
        bad.to_bytes(),
        Err(CodecError::InvalidValue { field: "data_type", .. })
    ));
}

#[test]
fn test_image_attribute_length_must_match() {
    let mut image = Image::<f64>::new([1, 1, 1], 1);
    image.attribute_string = "abc".to_string();
    assert!(matches!(
        image.to_bytes(),
        Err(CodecError::SizeMismatch { field: "attribute_string", .. })
    ));
}

#[test]
fn test_ndarray_roundtrip() {
    let array = NdArray::from_vec(&[2, 3], vec![1i32, 2, 3, 4, 5, 6]).unwrap();
    let back = NdArray::<i32>::decode(&array.to_bytes().unwrap()).unwrap();
    assert_eq!(back.dims(), &[2, 3]);
    assert_eq!(back.data(), &[1, 2, 3, 4, 5, 6]);
}

#[test]
fn test_ndarray_dimension_limits() {
    assert!(NdArray::<f32>::zeros(&[]).is_err());
    assert!(NdArray::<f32>::zeros(&[1; NDARRAY_MAX_DIMS]).is_ok());
    assert!(NdArray::<f32>::zeros(&[1; NDARRAY_MAX_DIMS + 1]).is_err());
    assert!(NdArray::<f32>::from_vec(&[2, 2], vec![0.0; 3]).is_err());
    assert!(NdArray::<u16>::zeros(&[u64::MAX, 2]).is_err());
}

#[test]
fn test_ndarray_rejects_other_pixel_type() {
    let bytes = NdArray::<f64>::zeros(&[2]).unwrap().to_bytes().unwrap();
    assert!(matches!(
        NdArray::<f32>::decode(&bytes),
        Err(CodecError::InvalidValue { field: "data_type", .. })
    ));
}
