//! `incident-report` - A local incident reporting form engine
//!
//! This library holds the state behind a multi-section incident report: the
//! report document and its schema, conditional field visibility, the image
//! upload and multi-select widgets, and the body diagram marker. The report
//! is saved to a local key-value store after every change.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod diagram;
pub mod document;
pub mod error;
pub mod form;
pub mod logging;
pub mod multiselect;
pub mod pages;
pub mod schema;
pub mod storage;
pub mod upload;
pub mod visibility;

pub use config::Config;
pub use diagram::{BodyDiagram, BoundingRect, ImageSize, NormalizedMarker};
pub use document::{MarkerPosition, ReportDocument};
pub use error::{Error, Result};
pub use form::{FormState, SubmitReceipt};
pub use logging::init_logging;
pub use storage::{MemoryStore, SqliteStore, StateStore};
pub use upload::{FileSource, FileUploadWidget, PathFileSource, UploadError};
