//! # formfill Common Library
//!
//! Shared code for the formfill service and CLI including:
//! - Roster ingestion and attendee record normalization
//! - Per-form-type slot tables and the built-in form catalog
//! - Batch planning and field mapping
//! - PDF form materialization and zip packaging
//! - Configuration loading

pub mod batch;
pub mod catalog;
pub mod config;
pub mod error;
pub mod mapper;
pub mod materialize;
pub mod package;
pub mod pipeline;
pub mod roster;
pub mod slots;

pub use batch::{plan_batches, plan_layout, Batch};
pub use catalog::{FormCatalog, FormKind, FormTypeSpec};
pub use error::{Error, Result};
pub use mapper::{build_field_mapping, FieldMapping};
pub use package::{package_archive, GeneratedFile, ARCHIVE_NAME};
pub use pipeline::FormRunner;
pub use roster::{normalize, AttendeeRecord, RosterRow, YearWidth};
