// File domain module
// Contains the uploaded file record and its status lifecycle

#![allow(clippy::module_inception)]

pub mod file;
pub mod value_objects;

// Re-export main types for convenience
pub use file::{FileAssignmentUpdate, FileRecord};
pub use value_objects::FileStatus;
