use std::path::{Path, PathBuf};

use crate::config::{DatasetConfig, SyncPolicy};
use crate::container::{ContainerFile, ElementLayout, NodeKind, Probe, ZipContainer};
use crate::path::{self, ACQUISITION_SERIES, HEADER_NAME, INTERNAL_PREFIX};
use crate::records::{Acquisition, Image, NdArray, PixelType, Record};
use crate::{header, links, series};

use super::DatasetError;

/// A dataset stored under one root group of a container file.
///
/// A dataset starts closed. [`open`](Self::open) acquires the file and
/// creates the root group if needed; [`close`](Self::close) persists and
/// releases it. A closed dataset can be opened again.
pub struct Dataset<F: ContainerFile = ZipContainer> {
    filename: PathBuf,
    root_group: String,
    config: DatasetConfig,
    file: Option<F>,
}

impl Dataset<ZipContainer> {
    /// Describe a dataset in `filename` below `root_group`.
    ///
    /// No I/O happens until [`open`](Self::open).
    pub fn init<P: AsRef<Path>>(filename: P, root_group: &str) -> Result<Self, DatasetError> {
        Self::new(filename, root_group, DatasetConfig::default())
    }

    /// Like [`init`](Self::init), with explicit configuration
    pub fn with_config<P: AsRef<Path>>(
        filename: P,
        root_group: &str,
        config: DatasetConfig,
    ) -> Result<Self, DatasetError> {
        Self::new(filename, root_group, config)
    }
}

impl<F: ContainerFile> Dataset<F> {
    /// Describe a dataset stored through the container backend `F`.
    ///
    /// Fails with [`DatasetError::InvalidName`] if `root_group` is empty or
    /// malformed.
    pub fn new<P: AsRef<Path>>(
        filename: P,
        root_group: &str,
        config: DatasetConfig,
    ) -> Result<Self, DatasetError> {
        let root_group = path::normalize_root(root_group)?;
        Ok(Self {
            filename: filename.as_ref().to_path_buf(),
            root_group,
            config,
            file: None,
        })
    }

    /// Acquire the container file and make sure the root group exists.
    ///
    /// An existing container is opened read-write. A file that exists but is
    /// not a container is an error. A missing file is created only when
    /// `create_if_missing` is set. On any failure the dataset stays closed.
    pub fn open(&mut self, create_if_missing: bool) -> Result<(), DatasetError> {
        if self.file.is_some() {
            return Err(DatasetError::file(&self.filename, "dataset is already open"));
        }

        let probe = F::probe(&self.filename).map_err(|e| DatasetError::file(&self.filename, e))?;
        let mut file = match probe {
            Probe::Container => {
                let file = F::open(&self.filename, &self.config)
                    .map_err(|e| DatasetError::file(&self.filename, e))?;
                log::info!("Opened dataset {}", self.filename.display());
                file
            }
            Probe::NotContainer => {
                return Err(DatasetError::file(
                    &self.filename,
                    "file exists but is not a valid container",
                ));
            }
            Probe::Missing if create_if_missing => F::create(&self.filename, &self.config)
                .map_err(|e| DatasetError::file(&self.filename, e))?,
            Probe::Missing => {
                return Err(DatasetError::file(&self.filename, "file does not exist"));
            }
        };

        links::ensure(&mut file, &self.root_group)
            .map_err(|e| DatasetError::file(&self.filename, e))?;
        if self.config.storage.sync == SyncPolicy::EveryWrite {
            file.flush()
                .map_err(|e| DatasetError::file(&self.filename, e))?;
        }

        self.file = Some(file);
        Ok(())
    }

    /// Persist pending changes and release the file. Closing a closed
    /// dataset does nothing.
    pub fn close(&mut self) -> Result<(), DatasetError> {
        if let Some(file) = self.file.take() {
            file.close()
                .map_err(|e| DatasetError::file(&self.filename, e))?;
            log::info!("Closed dataset {}", self.filename.display());
        }
        Ok(())
    }

    /// Persist pending changes without closing
    pub fn flush(&mut self) -> Result<(), DatasetError> {
        let file = self.file.as_mut().ok_or(DatasetError::NotOpen)?;
        file.flush()
            .map_err(|e| DatasetError::file(&self.filename, e))
    }

    /// Whether the container file is currently held
    pub fn is_open(&self) -> bool {
        self.file.is_some()
    }

    /// Path of the container file
    pub fn filename(&self) -> &Path {
        &self.filename
    }

    /// Normalized root group
    pub fn root_group(&self) -> &str {
        &self.root_group
    }

    /// Active configuration
    pub fn config(&self) -> &DatasetConfig {
        &self.config
    }

    fn file(&self) -> Result<&F, DatasetError> {
        self.file.as_ref().ok_or(DatasetError::NotOpen)
    }

    fn file_mut(&mut self) -> Result<&mut F, DatasetError> {
        self.file.as_mut().ok_or(DatasetError::NotOpen)
    }

    fn sync(&mut self) -> Result<(), DatasetError> {
        match self.config.storage.sync {
            SyncPolicy::EveryWrite => self.flush(),
            SyncPolicy::OnClose => Ok(()),
        }
    }

    // ==================== Header ====================

    /// Replace the XML header
    pub fn write_header(&mut self, text: &str) -> Result<(), DatasetError> {
        let file = self.file.as_mut().ok_or(DatasetError::NotOpen)?;
        header::write(file, &self.root_group, text)?;
        self.sync()
    }

    /// Read the XML header, or `None` if none has been written
    pub fn read_header(&self) -> Result<Option<String>, DatasetError> {
        header::read(self.file()?, &self.root_group)
    }

    // ==================== Record series ====================

    /// Number of records in series `name` (`0` if it does not exist)
    pub fn count(&self, name: &str) -> Result<u64, DatasetError> {
        let path = path::resolve(&self.root_group, name)?;
        series::count(self.file()?, &path)
    }

    /// Append a record to series `name`, creating the series on first use.
    ///
    /// Returns the index of the new record. Fails with
    /// [`DatasetError::TypeMismatch`] if the series holds another record type.
    pub fn append<R: Record>(&mut self, name: &str, record: &R) -> Result<u64, DatasetError> {
        let path = path::resolve(&self.root_group, name)?;
        let index = series::append(self.file_mut()?, &path, record)?;
        self.sync()?;
        Ok(index)
    }

    /// Read record `index` of series `name`
    pub fn read<R: Record>(&self, name: &str, index: u64) -> Result<R, DatasetError> {
        let path = path::resolve(&self.root_group, name)?;
        series::read(self.file()?, &path, index)
    }

    /// Names of all record series below the root group, sorted
    pub fn series_names(&self) -> Result<Vec<String>, DatasetError> {
        let file = self.file()?;
        let names = file
            .children(&self.root_group)
            .map_err(|e| DatasetError::storage(&self.root_group, e))?;

        let mut series = Vec::with_capacity(names.len());
        for name in names {
            if name == HEADER_NAME || name.starts_with(INTERNAL_PREFIX) {
                continue;
            }
            let child = path::join(&self.root_group, &name);
            let kind = file
                .node_kind(&child)
                .map_err(|e| DatasetError::storage(&child, e))?;
            if kind == Some(NodeKind::Dataset) {
                series.push(name);
            }
        }
        Ok(series)
    }

    /// Layout series `name` was created with, if it exists
    pub fn series_layout(&self, name: &str) -> Result<Option<ElementLayout>, DatasetError> {
        let path = path::resolve(&self.root_group, name)?;
        series::layout(self.file()?, &path)
    }

    // ==================== Acquisitions ====================

    /// Append a readout to the acquisition series
    pub fn append_acquisition(&mut self, acquisition: &Acquisition) -> Result<u64, DatasetError> {
        self.append(ACQUISITION_SERIES, acquisition)
    }

    /// Read readout `index` of the acquisition series
    pub fn read_acquisition(&self, index: u64) -> Result<Acquisition, DatasetError> {
        self.read(ACQUISITION_SERIES, index)
    }

    /// Number of readouts in the acquisition series
    pub fn number_of_acquisitions(&self) -> Result<u64, DatasetError> {
        self.count(ACQUISITION_SERIES)
    }

    // ==================== Images and arrays ====================

    /// Append an image to series `name`
    pub fn append_image<T: PixelType>(
        &mut self,
        name: &str,
        image: &Image<T>,
    ) -> Result<u64, DatasetError> {
        self.append(name, image)
    }

    /// Read image `index` of series `name`
    pub fn read_image<T: PixelType>(&self, name: &str, index: u64) -> Result<Image<T>, DatasetError> {
        self.read(name, index)
    }

    /// Number of images in series `name`
    pub fn number_of_images(&self, name: &str) -> Result<u64, DatasetError> {
        self.count(name)
    }

    /// Append an array to series `name`
    pub fn append_array<T: PixelType>(
        &mut self,
        name: &str,
        array: &NdArray<T>,
    ) -> Result<u64, DatasetError> {
        self.append(name, array)
    }

    /// Read array `index` of series `name`
    pub fn read_array<T: PixelType>(&self, name: &str, index: u64) -> Result<NdArray<T>, DatasetError> {
        self.read(name, index)
    }

    /// Number of arrays in series `name`
    pub fn number_of_arrays(&self, name: &str) -> Result<u64, DatasetError> {
        self.count(name)
    }
}

impl<F: ContainerFile> std::fmt::Debug for Dataset<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dataset")
            .field("filename", &self.filename)
            .field("root_group", &self.root_group)
            .field("open", &self.file.is_some())
            .finish()
    }
}
