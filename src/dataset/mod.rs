//! # Dataset
//!
//! [`Dataset`] is the entry point of the crate. It owns the container file
//! of one dataset together with the name of its root group, and exposes the
//! record store on top of it:
//!
//! ```text
//! scan.h5z (container file)
//! └── /dataset            # root group, created on open
//!     ├── xml             # XML header (one text value)
//!     ├── data            # acquisition series
//!     ├── image_0         # image series (any name)
//!     └── ...             # array series (any name)
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use ismrmrd_dataset::dataset::Dataset;
//! use ismrmrd_dataset::records::Acquisition;
//!
//! let mut dataset = Dataset::init("scan.h5z", "/dataset")?;
//! dataset.open(true)?;
//! dataset.write_header("<ismrmrdHeader/>")?;
//!
//! let acq = Acquisition::new(256, 8, 0);
//! dataset.append_acquisition(&acq)?;
//!
//! assert_eq!(dataset.number_of_acquisitions()?, 1);
//! dataset.close()?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod error;
mod handle;


pub use error::DatasetError;
pub use handle::Dataset;
