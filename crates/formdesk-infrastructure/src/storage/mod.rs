//! File storage primitives shared by the file-backed services.

pub mod atomic_file;

pub use atomic_file::{AtomicFile, AtomicFileError, FileFormat};
