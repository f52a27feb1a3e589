/// Data model shared by every stage of a run.
///
/// Records are produced by the scanner or the extract normalizer and are
/// read back by classification; nothing in here performs I/O.
pub mod classification;
pub mod keywords;
pub mod permission;
pub mod record;

pub use classification::{ClassificationResult, TiePolicy};
pub use keywords::KeywordMap;
pub use permission::{AccessControlType, AccessLevel, PermissionEntry};
pub use record::{ItemType, ScanRecord};
