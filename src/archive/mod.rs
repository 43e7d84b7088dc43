pub mod zip_ops;

pub use zip_ops::{compress_directory, extract_archive};
