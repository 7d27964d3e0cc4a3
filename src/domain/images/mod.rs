mod assignment;
mod file;
mod storage_key;
mod tag;

pub use assignment::AssignmentMap;
pub use file::ImageFile;
pub use storage_key::storage_key;
pub use tag::{Tag, extract_tags};
