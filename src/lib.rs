//! # ismrmrd-dataset - Record Store for Streamed MR Acquisitions
//!
//! `ismrmrd_dataset` persists magnetic resonance acquisition data: one XML
//! metadata header plus any number of growing, indexed series of typed
//! records (raw acquisitions, images, N-dimensional arrays). A dataset lives
//! under a root group of a hierarchical container file and is addressed by
//! `/`-separated paths.
//!
//! ## Key Features
//!
//! - **Append-only series**: records are appended one at a time and read back
//!   by index. Existing records are never rewritten or reordered.
//!
//! - **Lazy structure**: the root group, the header slot and every series are
//!   created on first use. Re-opening a dataset resumes where it left off.
//!
//! - **Typed layouts**: every series stores the element layout it was created
//!   with, and appending a record of another type fails instead of corrupting
//!   the series.
//!
//! - **Single-file container**: a ZIP archive with a JSON manifest, rewritten
//!   atomically on flush.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use ismrmrd_dataset::prelude::*;
//!
//! let mut dataset = Dataset::init("scan.h5z", "/dataset")?;
//! dataset.open(true)?;
//! dataset.write_header("<ismrmrdHeader/>")?;
//!
//! let mut acq = Acquisition::new(128, 4, 0);
//! acq.head.scan_counter = 1;
//! dataset.append_acquisition(&acq)?;
//!
//! let image = Image::<f32>::new([128, 128, 1], 1);
//! dataset.append_image("image_0", &image)?;
//! dataset.close()?;
//!
//! dataset.open(false)?;
//! assert_eq!(dataset.number_of_acquisitions()?, 1);
//! assert_eq!(dataset.read_acquisition(0)?, acq);
//! # Ok::<(), ismrmrd_dataset::dataset::DatasetError>(())
//! ```
//!
//! ## Architecture
//!
//! - [`path`]: builds variable paths below the root group and validates names
//! - [`links`]: existence checks and idempotent group creation
//! - [`header`]: the XML header slot
//! - [`series`]: the append-only series engine, generic over [`records::Record`]
//! - [`dataset`]: the [`dataset::Dataset`] handle composing all of the above
//! - [`container`]: the hierarchical container surface and its backends
//! - [`records`]: acquisition, image and array record types
//! - [`config`]: TOML-loadable settings

// Documentation lints - enforce complete documentation for publication
#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]

pub mod config;
pub mod container;
pub mod dataset;
pub mod header;
pub mod links;
pub mod path;
pub mod records;
pub mod series;

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{DatasetConfig, EntryCompression, StorageConfig, SyncPolicy};
    pub use crate::container::{ContainerBackend, ContainerFile, MemoryContainer, ZipContainer};
    pub use crate::dataset::{Dataset, DatasetError};
    pub use crate::records::{
        acquisition_flags, Acquisition, AcquisitionHeader, EncodingCounters, Image, ImageHeader,
        NdArray, PixelType, Record,
    };
}
