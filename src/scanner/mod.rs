pub mod job_scanner;
pub mod name_filter;

pub use job_scanner::{JobArchive, JobScanner, MatchedFile};
pub use name_filter::NameFilter;
