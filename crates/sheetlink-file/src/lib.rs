//! # sheetlink-file
//!
//! File-format backend for sheetlink: parses a spreadsheet container into
//! an in-memory model, applies mutations there, and serializes the whole
//! container back to disk on save. No host application is involved, so
//! macro execution and range capture report themselves unsupported instead
//! of failing opaquely.

pub mod backend;
pub mod codec;
pub mod error;
pub mod model;
pub mod read;
pub mod write;

mod styles;

pub use backend::FileWorkbook;
pub use error::{FileError, FileResult};
pub use model::WorkbookModel;
pub use read::ContainerReader;
pub use write::ContainerWriter;
