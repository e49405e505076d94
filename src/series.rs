//! Append-only record series.
//!
//! A series is a one-dimensional dataset at `<root_group>/<name>` whose
//! axis 0 is declared unlimited when it is created. Every element has the
//! layout of one [`Record`] type and the layout is fixed for the lifetime of
//! the series.
//!
//! Appending extends the extent by one and then writes the new element. If
//! the write fails the extent is set back, so the count never covers a slot
//! that was not written.

use crate::container::{
    BackendError, ContainerBackend, DatasetInfo, Dataspace, ElementLayout, NodeKind,
};
use crate::dataset::DatasetError;
use crate::links;
use crate::records::Record;

/// Dataset info of the series at `path`.
///
/// `None` when nothing is linked there or the link is a group: a group under
/// the root (such as the root of a nested dataset) is not a record series.
fn lookup<B: ContainerBackend + ?Sized>(
    backend: &B,
    path: &str,
) -> Result<Option<DatasetInfo>, DatasetError> {
    if !links::exists(backend, path)? {
        return Ok(None);
    }
    if backend.node_kind(path).map_err(|e| DatasetError::storage(path, e))?
        != Some(NodeKind::Dataset)
    {
        return Ok(None);
    }
    backend
        .dataset_info(path)
        .map(Some)
        .map_err(|e| DatasetError::storage(path, e))
}

/// Number of records in the series at `path`; `0` if it does not exist.
pub fn count<B: ContainerBackend + ?Sized>(backend: &B, path: &str) -> Result<u64, DatasetError> {
    Ok(lookup(backend, path)?.map_or(0, |info| info.space.len()))
}

/// Layout the series at `path` was created with, if it exists.
pub fn layout<B: ContainerBackend + ?Sized>(
    backend: &B,
    path: &str,
) -> Result<Option<ElementLayout>, DatasetError> {
    Ok(lookup(backend, path)?.map(|info| info.layout))
}

/// Append `record` to the series at `path`, creating the series on first use.
///
/// Returns the index the record was written at. A group already linked at
/// `path` is a `StorageError`.
pub fn append<B, R>(backend: &mut B, path: &str, record: &R) -> Result<u64, DatasetError>
where
    B: ContainerBackend + ?Sized,
    R: Record,
{
    let expected = R::layout();
    let bytes = record.to_bytes()?;

    let index = match lookup(backend, path)? {
        Some(info) => {
            if !info.space.is_extendible() {
                return Err(DatasetError::storage(
                    path,
                    BackendError::NotExtendible {
                        path: path.to_string(),
                        max: info.space.max_dims.first().copied().flatten().unwrap_or(0),
                    },
                ));
            }
            if info.layout != expected {
                return Err(DatasetError::TypeMismatch {
                    path: path.to_string(),
                    stored: info.layout.name,
                    found: expected.name,
                });
            }
            info.space.len()
        }
        None if links::exists(backend, path)? => {
            return Err(DatasetError::storage(
                path,
                BackendError::NotADataset(path.to_string()),
            ));
        }
        None => {
            backend
                .create_dataset(path, &expected, &Dataspace::extendible(0))
                .map_err(|e| DatasetError::storage(path, e))?;
            log::debug!("Created series {} ({})", path, expected.name);
            0
        }
    };

    backend
        .set_extent(path, index + 1)
        .map_err(|e| DatasetError::storage(path, e))?;

    if let Err(e) = backend.write_element(path, index, &bytes) {
        if let Err(rollback) = backend.set_extent(path, index) {
            log::warn!(
                "Failed to roll back {} to {} records after a failed append: {}",
                path,
                index,
                rollback
            );
        }
        return Err(DatasetError::storage(path, e));
    }

    Ok(index)
}

/// Read the record at `index` of the series at `path`.
pub fn read<B, R>(backend: &B, path: &str, index: u64) -> Result<R, DatasetError>
where
    B: ContainerBackend + ?Sized,
    R: Record,
{
    let Some(info) = lookup(backend, path)? else {
        return Err(DatasetError::NotFound(path.to_string()));
    };
    let count = info.space.len();
    if index >= count {
        return Err(DatasetError::IndexOutOfRange {
            path: path.to_string(),
            index,
            count,
        });
    }

    let expected = R::layout();
    if info.layout != expected {
        return Err(DatasetError::TypeMismatch {
            path: path.to_string(),
            stored: info.layout.name,
            found: expected.name,
        });
    }

    let bytes = backend
        .read_element(path, index)
        .map_err(|e| DatasetError::storage(path, e))?;
    Ok(R::decode(&bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::faulty::FaultyContainer;
    use crate::container::MemoryContainer;
    use crate::records::{Acquisition, Image, NdArray};

    const PATH: &str = "/dataset/data";

    fn container() -> MemoryContainer {
        let mut tree = MemoryContainer::new();
        links::ensure(&mut tree, "/dataset").unwrap();
        tree
    }

    fn acquisition(scan_counter: u32) -> Acquisition {
        let mut acq = Acquisition::new(8, 2, 0);
        acq.head.scan_counter = scan_counter;
        acq.data[3] = [scan_counter as f32, 1.0];
        acq
    }

    #[test]
    fn test_count_of_missing_series() {
        let tree = container();
        assert_eq!(count(&tree, PATH).unwrap(), 0);
        assert_eq!(layout(&tree, PATH).unwrap(), None);
    }

    #[test]
    fn test_append_and_read() {
        let mut tree = container();
        for i in 0..5 {
            assert_eq!(append(&mut tree, PATH, &acquisition(i)).unwrap(), i as u64);
        }
        assert_eq!(count(&tree, PATH).unwrap(), 5);

        for i in 0..5 {
            let acq: Acquisition = read(&tree, PATH, i as u64).unwrap();
            assert_eq!(acq, acquisition(i));
        }
        assert_eq!(layout(&tree, PATH).unwrap(), Some(Acquisition::layout()));
    }

    #[test]
    fn test_read_errors() {
        let mut tree = container();
        assert!(matches!(
            read::<_, Acquisition>(&tree, PATH, 0),
            Err(DatasetError::NotFound(_))
        ));

        append(&mut tree, PATH, &acquisition(0)).unwrap();
        assert!(matches!(
            read::<_, Acquisition>(&tree, PATH, 1),
            Err(DatasetError::IndexOutOfRange { index: 1, count: 1, .. })
        ));
    }

    #[test]
    fn test_type_mismatch_keeps_count() {
        let mut tree = container();
        append(&mut tree, PATH, &acquisition(0)).unwrap();

        let image = Image::<f32>::new([2, 2, 1], 1);
        assert!(matches!(
            append(&mut tree, PATH, &image),
            Err(DatasetError::TypeMismatch { .. })
        ));
        assert_eq!(count(&tree, PATH).unwrap(), 1);

        assert!(matches!(
            read::<_, Image<f32>>(&tree, PATH, 0),
            Err(DatasetError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_pixel_type_mismatch() {
        let mut tree = container();
        let path = "/dataset/image_0";
        append(&mut tree, path, &Image::<f32>::new([1, 1, 1], 1)).unwrap();
        assert!(matches!(
            append(&mut tree, path, &Image::<u16>::new([1, 1, 1], 1)),
            Err(DatasetError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_fixed_dataset_is_not_extendible() {
        let mut tree = container();
        tree.create_dataset(PATH, &Acquisition::layout(), &Dataspace::fixed(vec![1]))
            .unwrap();
        let err = append(&mut tree, PATH, &acquisition(0)).unwrap_err();
        assert!(matches!(
            err,
            DatasetError::StorageError {
                source: BackendError::NotExtendible { .. },
                ..
            }
        ));
    }

    #[test]
    fn test_invalid_record_is_rejected_before_any_change() {
        let mut tree = container();
        let mut acq = acquisition(0);
        acq.data.pop();
        assert!(matches!(
            append(&mut tree, PATH, &acq),
            Err(DatasetError::CodecError(_))
        ));
        assert!(!links::exists(&tree, PATH).unwrap());
    }

    #[test]
    fn test_failed_write_rolls_back_extent() {
        let mut tree = container();
        append(&mut tree, PATH, &acquisition(0)).unwrap();

        let mut faulty = FaultyContainer::new(tree);
        faulty.fail_writes = true;
        assert!(append(&mut faulty, PATH, &acquisition(1)).is_err());
        assert_eq!(count(&faulty, PATH).unwrap(), 1);

        faulty.fail_writes = false;
        assert_eq!(append(&mut faulty, PATH, &acquisition(1)).unwrap(), 1);
        let acq: Acquisition = read(&faulty, PATH, 1).unwrap();
        assert_eq!(acq.head.scan_counter, 1);
    }

    #[test]
    fn test_failed_rollback_still_reports_write_error() {
        let mut faulty = FaultyContainer::new(container());
        faulty.fail_writes = true;
        faulty.fail_shrink = true;

        let err = append(&mut faulty, PATH, &acquisition(0)).unwrap_err();
        assert!(matches!(err, DatasetError::StorageError { .. }));
        // The tail slot stays allocated but unwritten
        assert_eq!(count(&faulty, PATH).unwrap(), 1);
        assert!(read::<_, Acquisition>(&faulty, PATH, 0).is_err());
    }

    #[test]
    fn test_probe_failure_is_reported() {
        let mut faulty = FaultyContainer::new(container());
        faulty.fail_probes = true;
        assert!(matches!(
            count(&faulty, PATH),
            Err(DatasetError::StorageError { .. })
        ));
    }

    #[test]
    fn test_group_is_not_a_series() {
        let mut tree = container();
        let nested = "/dataset/nested";
        links::ensure(&mut tree, nested).unwrap();

        assert_eq!(count(&tree, nested).unwrap(), 0);
        assert_eq!(layout(&tree, nested).unwrap(), None);
        assert!(matches!(
            read::<_, Acquisition>(&tree, nested, 0),
            Err(DatasetError::NotFound(_))
        ));
        assert!(matches!(
            append(&mut tree, nested, &acquisition(0)),
            Err(DatasetError::StorageError {
                source: BackendError::NotADataset(_),
                ..
            })
        ));
        assert_eq!(tree.node_kind(nested).unwrap(), Some(NodeKind::Group));
    }

    #[test]
    fn test_ndarray_series() {
        let mut tree = container();
        let path = "/dataset/array_0";
        let array = NdArray::from_vec(&[2, 2], vec![1.0f64, 2.0, 3.0, 4.0]).unwrap();
        append(&mut tree, path, &array).unwrap();
        let back: NdArray<f64> = read(&tree, path, 0).unwrap();
        assert_eq!(back, array);
    }
}
