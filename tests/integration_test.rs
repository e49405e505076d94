//! End-to-end tests of the dataset record store
//!
//! These tests drive the public `Dataset` API against real container files
//! and check the behaviour a caller relies on:
//! 1. Open/close lifecycle and file-level failures
//! 2. Header round-trips and replacement
//! 3. Series append/read/count and type checking
//! 4. Persistence across close and re-open

use ismrmrd_dataset::prelude::*;
use ismrmrd_dataset::container::Probe;
use std::fs;
use tempfile::tempdir;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn make_acquisition(scan_counter: u32, samples: u16, channels: u16) -> Acquisition {
    let mut acq = Acquisition::new(samples, channels, 0);
    acq.head.scan_counter = scan_counter;
    acq.head.measurement_uid = 42;
    acq.head.idx.kspace_encode_step_1 = scan_counter as u16;
    for (i, sample) in acq.data.iter_mut().enumerate() {
        *sample = [i as f32, scan_counter as f32];
    }
    acq
}

// ==================== Lifecycle ====================

#[test]
fn test_open_close_leaves_valid_container() {
    init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("scan.h5z");

    let mut dataset = Dataset::init(&path, "/dataset").unwrap();
    dataset.open(true).unwrap();
    dataset.close().unwrap();

    assert_eq!(ZipContainer::probe(&path).unwrap(), Probe::Container);
    let container = ZipContainer::open(&path, &DatasetConfig::default()).unwrap();
    assert!(container.link_exists("/dataset").unwrap());
}

#[test]
fn test_nested_root_group() {
    init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("study").join("scan.h5z");

    let mut dataset = Dataset::init(&path, "/study/session/dataset").unwrap();
    dataset.open(true).unwrap();
    dataset.append_acquisition(&make_acquisition(0, 8, 1)).unwrap();
    dataset.close().unwrap();

    let container = ZipContainer::open(&path, &DatasetConfig::default()).unwrap();
    assert!(container.link_exists("/study/session").unwrap());
    assert!(container.link_exists("/study/session/dataset/data").unwrap());
}

#[test]
fn test_open_failures_are_file_errors() {
    init_logging();
    let dir = tempdir().unwrap();

    let missing = dir.path().join("missing.h5z");
    let mut dataset = Dataset::init(&missing, "/dataset").unwrap();
    assert!(matches!(
        dataset.open(false),
        Err(DatasetError::FileError { .. })
    ));
    assert!(!dataset.is_open());

    let foreign = dir.path().join("foreign.bin");
    fs::write(&foreign, [0u8, 1, 2, 3, 4, 5, 6, 7]).unwrap();
    let mut dataset = Dataset::init(&foreign, "/dataset").unwrap();
    assert!(matches!(
        dataset.open(true),
        Err(DatasetError::FileError { .. })
    ));
    assert!(!dataset.is_open());
}

#[test]
fn test_two_datasets_share_one_file() {
    init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("shared.h5z");

    let mut first = Dataset::init(&path, "/first").unwrap();
    first.open(true).unwrap();
    first.write_header("<first/>").unwrap();
    first.close().unwrap();

    let mut second = Dataset::init(&path, "/second").unwrap();
    second.open(false).unwrap();
    assert_eq!(second.read_header().unwrap(), None);
    second.write_header("<second/>").unwrap();
    second.close().unwrap();

    first.open(false).unwrap();
    assert_eq!(first.read_header().unwrap().as_deref(), Some("<first/>"));
}

// ==================== Header ====================

#[test]
fn test_header_absent_then_roundtrip() {
    init_logging();
    let dir = tempdir().unwrap();
    let mut dataset = Dataset::init(dir.path().join("scan.h5z"), "/dataset").unwrap();
    dataset.open(true).unwrap();

    assert_eq!(dataset.read_header().unwrap(), None);
    dataset.write_header("foo").unwrap();
    assert_eq!(dataset.read_header().unwrap().as_deref(), Some("foo"));
}

#[test]
fn test_header_replace_leaves_no_residue() {
    init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("scan.h5z");
    let long = "<ismrmrdHeader>".to_string() + &"x".repeat(4096) + "</ismrmrdHeader>";

    let mut dataset = Dataset::init(&path, "/dataset").unwrap();
    dataset.open(true).unwrap();
    dataset.write_header(&long).unwrap();
    dataset.write_header("B").unwrap();
    dataset.close().unwrap();

    dataset.open(false).unwrap();
    assert_eq!(dataset.read_header().unwrap().as_deref(), Some("B"));

    let container = ZipContainer::open(&path, &DatasetConfig::default()).unwrap();
    assert_eq!(container.children("/dataset").unwrap(), vec!["xml".to_string()]);
}

#[test]
fn test_header_with_nul_is_rejected() {
    init_logging();
    let dir = tempdir().unwrap();
    let mut dataset = Dataset::init(dir.path().join("scan.h5z"), "/dataset").unwrap();
    dataset.open(true).unwrap();
    dataset.write_header("kept").unwrap();

    assert!(matches!(
        dataset.write_header("bad\0header"),
        Err(DatasetError::StorageError { .. })
    ));
    assert_eq!(dataset.read_header().unwrap().as_deref(), Some("kept"));
}

// ==================== Series ====================

#[test]
fn test_series_roundtrip_and_count() {
    init_logging();
    let dir = tempdir().unwrap();
    let mut dataset = Dataset::init(dir.path().join("scan.h5z"), "/dataset").unwrap();
    dataset.open(true).unwrap();

    let records: Vec<Acquisition> = (0..10).map(|i| make_acquisition(i, 32, 2)).collect();
    for record in &records {
        dataset.append("data", record).unwrap();
    }

    assert_eq!(dataset.count("data").unwrap(), records.len() as u64);
    for (i, record) in records.iter().enumerate() {
        let back: Acquisition = dataset.read("data", i as u64).unwrap();
        assert_eq!(&back, record);
    }
}

#[test]
fn test_series_read_errors() {
    init_logging();
    let dir = tempdir().unwrap();
    let mut dataset = Dataset::init(dir.path().join("scan.h5z"), "/dataset").unwrap();
    dataset.open(true).unwrap();

    assert_eq!(dataset.count("never").unwrap(), 0);
    assert!(matches!(
        dataset.read::<Acquisition>("never", 0),
        Err(DatasetError::NotFound(_))
    ));

    dataset.append_acquisition(&make_acquisition(0, 4, 1)).unwrap();
    assert!(matches!(
        dataset.read_acquisition(1),
        Err(DatasetError::IndexOutOfRange { index: 1, count: 1, .. })
    ));
    assert!(matches!(
        dataset.read_acquisition(u64::MAX),
        Err(DatasetError::IndexOutOfRange { .. })
    ));
}

#[test]
fn test_type_mismatch_does_not_change_count() {
    init_logging();
    let dir = tempdir().unwrap();
    let mut dataset = Dataset::init(dir.path().join("scan.h5z"), "/dataset").unwrap();
    dataset.open(true).unwrap();

    dataset.append_acquisition(&make_acquisition(0, 4, 1)).unwrap();
    let array = NdArray::<f32>::zeros(&[2, 2]).unwrap();
    assert!(matches!(
        dataset.append("data", &array),
        Err(DatasetError::TypeMismatch { .. })
    ));
    assert_eq!(dataset.number_of_acquisitions().unwrap(), 1);
}

#[test]
fn test_acquisitions_of_different_sizes_share_a_series() {
    init_logging();
    let dir = tempdir().unwrap();
    let mut dataset = Dataset::init(dir.path().join("scan.h5z"), "/dataset").unwrap();
    dataset.open(true).unwrap();

    let noise = make_acquisition(0, 256, 32);
    let mut imaging = make_acquisition(1, 128, 8);
    imaging.head.set_flag(acquisition_flags::LAST_IN_MEASUREMENT);

    dataset.append_acquisition(&noise).unwrap();
    dataset.append_acquisition(&imaging).unwrap();
    dataset.close().unwrap();

    dataset.open(false).unwrap();
    assert_eq!(dataset.read_acquisition(0).unwrap(), noise);
    let back = dataset.read_acquisition(1).unwrap();
    assert_eq!(back, imaging);
    assert!(back
        .head
        .is_flag_set(acquisition_flags::LAST_IN_MEASUREMENT));
}

// ==================== Persistence ====================

#[test]
fn test_reopen_preserves_everything() {
    init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("scan.h5z");

    let mut image = Image::<f32>::new([8, 8, 1], 2);
    image.head.image_index = 3;
    for (i, px) in image.data.iter_mut().enumerate() {
        *px = i as f32 * 0.25;
    }
    let array = NdArray::from_vec(&[2, 3], vec![1i16, -2, 3, -4, 5, -6]).unwrap();

    {
        let mut dataset = Dataset::init(&path, "/dataset").unwrap();
        dataset.open(true).unwrap();
        dataset.write_header("<ismrmrdHeader/>").unwrap();
        dataset.append_acquisition(&make_acquisition(0, 16, 2)).unwrap();
        dataset.append_image("image_0", &image).unwrap();
        dataset.append_array("calibration", &array).unwrap();
        dataset.close().unwrap();
    }

    let mut dataset = Dataset::init(&path, "/dataset").unwrap();
    dataset.open(false).unwrap();
    assert_eq!(
        dataset.series_names().unwrap(),
        vec![
            "calibration".to_string(),
            "data".to_string(),
            "image_0".to_string()
        ]
    );
    assert_eq!(dataset.read_header().unwrap().as_deref(), Some("<ismrmrdHeader/>"));
    assert_eq!(dataset.read_acquisition(0).unwrap(), make_acquisition(0, 16, 2));
    assert_eq!(dataset.read_image::<f32>("image_0", 0).unwrap(), image);
    assert_eq!(dataset.read_array::<i16>("calibration", 0).unwrap(), array);

    // Appending after re-open continues the series
    dataset.append_acquisition(&make_acquisition(1, 16, 2)).unwrap();
    assert_eq!(dataset.number_of_acquisitions().unwrap(), 2);
}

#[test]
fn test_drop_without_close_persists() {
    init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("scan.h5z");

    {
        let mut dataset = Dataset::init(&path, "/dataset").unwrap();
        dataset.open(true).unwrap();
        dataset.append_acquisition(&make_acquisition(5, 4, 1)).unwrap();
    }

    let mut dataset = Dataset::init(&path, "/dataset").unwrap();
    dataset.open(false).unwrap();
    assert_eq!(dataset.number_of_acquisitions().unwrap(), 1);
}

#[test]
fn test_example_scenario() {
    init_logging();
    let dir = tempdir().unwrap();
    let path = dir.path().join("scan.dat");
    let rec0 = make_acquisition(0, 64, 4);
    let rec1 = make_acquisition(1, 64, 4);

    let mut dataset = Dataset::init(&path, "/dataset").unwrap();
    dataset.open(true).unwrap();
    dataset.write_header("<ismrmrdHeader/>").unwrap();
    dataset.append("data", &rec0).unwrap();
    dataset.append("data", &rec1).unwrap();
    dataset.close().unwrap();

    dataset.open(false).unwrap();
    assert_eq!(dataset.count("data").unwrap(), 2);
    assert_eq!(
        dataset.read_header().unwrap().as_deref(),
        Some("<ismrmrdHeader/>")
    );
    let back: Acquisition = dataset.read("data", 1).unwrap();
    assert_eq!(back, rec1);
    dataset.close().unwrap();
}

#[test]
fn test_config_file_drives_compression() {
    init_logging();
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("ismrmrd.toml");
    fs::write(
        &config_path,
        "[storage]\ncompression = \"stored\"\nsync = \"every-write\"\n",
    )
    .unwrap();
    let config = DatasetConfig::from_file(&config_path).unwrap();
    assert_eq!(config.storage.compression, EntryCompression::Stored);

    let path = dir.path().join("scan.h5z");
    let mut dataset = Dataset::with_config(&path, "/dataset", config).unwrap();
    dataset.open(true).unwrap();
    dataset.append_acquisition(&make_acquisition(0, 4, 1)).unwrap();

    let file = fs::File::open(&path).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let entry = archive.by_name("nodes/dataset/data").unwrap();
    assert_eq!(entry.compression(), zip::CompressionMethod::Stored);
}
